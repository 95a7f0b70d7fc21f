use thiserror::Error;

/// Failures while turning CSV text into records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("CSV has no valid headers")]
    NoHeaders,

    #[error("Failed to parse CSV: {0}")]
    ParseFailure(String),
}

/// Rejections of a staging operation before anything is applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please provide a value for the key column '{0}'")]
    MissingKey(String),

    #[error("Inventory CSV is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Search query is empty")]
    EmptyQuery,

    #[error("Please upload and configure the main inventory CSV first")]
    NotConfigured,

    #[error("No staged item with key '{0}'")]
    KeyNotFound(String),

    #[error("Another staged item already uses key '{0}'")]
    DuplicateKey(String),

    #[error("The key column '{0}' must stay in the saved columns")]
    KeyColumnRequired(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("List name is empty")]
    EmptyListName,

    #[error("No items in new inventory to download")]
    NothingToExport,
}

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, InventoryError>;
