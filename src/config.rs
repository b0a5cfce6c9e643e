use crate::error::{Result, SplitError};
use crate::model::BillPeriod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_DESCRIPTION_TEMPLATE: &str = "T-Mobile Bill - {month}/{year}";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SPLITWISE_URL: &str = "https://secure.splitwise.com/api/v3.0";

/// Run settings, read once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub group_id: u64,
    #[serde(default)]
    pub group_name: String,
    pub payer_name: String,
    /// Owner name → ledger user id.
    pub user_mappings: BTreeMap<String, u64>,
    #[serde(default = "default_description_template")]
    pub description_template: String,
}

fn default_description_template() -> String {
    DEFAULT_DESCRIPTION_TEMPLATE.to_string()
}

/// The setup helper nests group and payer under a `splitwise` key.
#[derive(Debug, Deserialize)]
struct NestedConfig {
    splitwise: GroupSection,
    #[serde(default)]
    user_mappings: BTreeMap<String, u64>,
    #[serde(default = "default_description_template")]
    description_template: String,
}

#[derive(Debug, Deserialize)]
struct GroupSection {
    #[serde(default)]
    group_id: u64,
    #[serde(default)]
    group_name: String,
    #[serde(default)]
    payer_name: String,
}

impl From<NestedConfig> for Config {
    fn from(nested: NestedConfig) -> Self {
        Config {
            group_id: nested.splitwise.group_id,
            group_name: nested.splitwise.group_name,
            payer_name: nested.splitwise.payer_name,
            user_mappings: nested.user_mappings,
            description_template: nested.description_template,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let config: Config = if value.get("splitwise").is_some() {
            serde_json::from_value::<NestedConfig>(value)?.into()
        } else {
            serde_json::from_value::<Config>(value)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SplitError::Config(format!(
                "Cannot read configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.group_id == 0 {
            return Err(SplitError::Config("group_id is not set".to_string()));
        }
        if self.user_mappings.is_empty() {
            return Err(SplitError::Config("user_mappings is empty".to_string()));
        }
        if !self.user_mappings.contains_key(&self.payer_name) {
            return Err(SplitError::Config(format!(
                "payer '{}' is not in user_mappings",
                self.payer_name
            )));
        }
        for placeholder in ["{month}", "{year}"] {
            if !self.description_template.contains(placeholder) {
                return Err(SplitError::Config(format!(
                    "description_template '{}' lacks {}",
                    self.description_template, placeholder
                )));
            }
        }
        Ok(())
    }

    pub fn payer_id(&self) -> Option<u64> {
        self.user_mappings.get(&self.payer_name).copied()
    }

    pub fn describe(&self, period: BillPeriod) -> String {
        self.description_template
            .replace("{month}", &period.month.to_string())
            .replace("{year}", &period.year.to_string())
    }
}

/// Secrets for the remote collaborators, taken from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub openai_api_version: Option<String>,
    pub model: String,
    pub splitwise_token: String,
    pub splitwise_base_url: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            openai_base_url: required_var("OPENAI_BASE_URL")?,
            openai_api_key: required_var("OPENAI_API_KEY")?,
            openai_api_version: optional_var("OPENAI_API_VERSION"),
            model: optional_var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            splitwise_token: required_var("SW_OAUTH2_ACCESS_TOKEN")?,
            splitwise_base_url: optional_var("SPLITWISE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SPLITWISE_URL.to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    optional_var(name).ok_or_else(|| SplitError::Config(format!("{} must be set", name)))
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
