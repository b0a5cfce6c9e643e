use crate::error::{Result, SplitError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Owner name given to lines whose phone number is not in the directory.
pub const UNKNOWN_OWNER: &str = "Unknown";

/// Reduces a phone number to its digits. An 11-digit number with a leading
/// North-American country code is trimmed to the 10-digit subscriber number.
pub fn canonicalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 11 && digits.starts_with('1') {
        digits[1..].to_string()
    } else {
        digits
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub phone_number: String,
    pub owner: String,
}

/// Static phone number → owner name table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerDirectory {
    by_phone: BTreeMap<String, String>,
    order: Vec<String>,
}

impl OwnerDirectory {
    pub fn from_pairs<I, P, O>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, O)>,
        P: AsRef<str>,
        O: Into<String>,
    {
        let mut directory = Self::default();
        for (phone, owner) in pairs {
            directory.insert(phone.as_ref(), owner.into());
        }
        directory
    }

    /// Parses the `<phone> - <Owner Name>` line format. Blank lines, `#`
    /// comments and lines without a separator are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut directory = Self::default();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((phone, owner)) = line.split_once(" - ") else {
                log::debug!("Skipping owner directory line {}: no separator", idx + 1);
                continue;
            };

            let owner = owner.trim();
            if canonicalize_phone(phone).is_empty() || owner.is_empty() {
                return Err(SplitError::Config(format!(
                    "Owner directory line {} is malformed: '{}'",
                    idx + 1,
                    line
                )));
            }

            directory.insert(phone, owner.to_string());
        }

        Ok(directory)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SplitError::Config(format!(
                "Cannot read owner directory {}: {}",
                path.display(),
                e
            ))
        })?;
        let directory = Self::parse(&text)?;
        log::debug!(
            "Loaded {} phone owners from {}",
            directory.len(),
            path.display()
        );
        Ok(directory)
    }

    fn insert(&mut self, phone: &str, owner: String) {
        if !self.order.contains(&owner) {
            self.order.push(owner.clone());
        }
        self.by_phone.insert(canonicalize_phone(phone), owner);
    }

    pub fn lookup(&self, phone: &str) -> Option<&str> {
        self.by_phone
            .get(&canonicalize_phone(phone))
            .map(String::as_str)
    }

    /// Distinct owner names in the order they were first listed.
    pub fn owners(&self) -> &[String] {
        &self.order
    }

    pub fn entries(&self) -> Vec<DirectoryEntry> {
        self.by_phone
            .iter()
            .map(|(phone_number, owner)| DirectoryEntry {
                phone_number: phone_number.clone(),
                owner: owner.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_phone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_phone.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_and_bare_numbers_resolve_alike() {
        let directory = OwnerDirectory::from_pairs([("123-456-7890", "Alice")]);
        assert_eq!(directory.lookup("(123) 456-7890"), Some("Alice"));
        assert_eq!(directory.lookup("1234567890"), Some("Alice"));
        assert_eq!(directory.lookup("+1 123.456.7890"), Some("Alice"));
        assert_eq!(directory.lookup("999-999-9999"), None);
    }

    #[test]
    fn test_parse_owner_file() {
        let text = "\
# family plan
123-456-7890 - Alice
(555) 010-2000 - Bob

garbage line
555.010.3000 - Alice
";
        let directory = OwnerDirectory::parse(text).unwrap();
        assert_eq!(directory.len(), 3);
        assert_eq!(directory.owners(), &["Alice".to_string(), "Bob".to_string()]);
        assert_eq!(directory.lookup("5550103000"), Some("Alice"));
    }

    #[test]
    fn test_parse_rejects_entry_without_digits() {
        let err = OwnerDirectory::parse("n/a - Carol").unwrap_err();
        assert!(matches!(err, SplitError::Config(_)));
    }
}
