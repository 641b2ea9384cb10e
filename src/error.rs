use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetcherError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed for {source_code} is missing column '{column}'")]
    MissingColumn { source_code: String, column: String },

    #[error("Line {line}: date '{value}' does not match format {expected}")]
    DateFormat {
        line: usize,
        value: String,
        expected: &'static str,
    },

    #[error("Line {line}: column '{column}' holds non-numeric value '{value}'")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },

    #[error("Running {column} total for {countrycode} overflows")]
    TotalOverflow { countrycode: String, column: &'static str },

    #[error("Count {value} for '{column}' is too large to store")]
    CountOutOfRange { column: &'static str, value: u64 },

    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

pub type Result<T> = std::result::Result<T, FetcherError>;
