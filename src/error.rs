use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Invalid bill field '{field}': {details}")]
    Validation { field: String, details: String },

    #[error("Allocation failed: {0}")]
    Allocation(String),

    #[error("Expense '{description}' already exists (id {expense_id})")]
    DuplicateFound {
        description: String,
        expense_id: u64,
    },

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SplitError {
    pub fn validation(field: impl Into<String>, details: impl Into<String>) -> Self {
        SplitError::Validation {
            field: field.into(),
            details: details.into(),
        }
    }

    /// Process exit status for this error. A duplicate is an expected
    /// outcome and exits cleanly.
    pub fn exit_code(&self) -> i32 {
        match self {
            SplitError::DuplicateFound { .. } => 0,
            SplitError::Config(_) => 2,
            SplitError::Validation { .. } => 3,
            SplitError::Allocation(_) => 4,
            SplitError::Ledger(_) => 5,
            SplitError::Extraction(_) => 6,
            SplitError::Serialization(_) | SplitError::Io(_) => 1,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, SplitError::DuplicateFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;
