use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("No valid timestamps in input, cannot build a time grid")]
    EmptyInput,

    #[error("Field '{field}' has no known value anywhere in the series, interpolation impossible")]
    InsufficientData { field: String },

    #[error("Solar position error: {0}")]
    SolarPosition(#[from] solar_positioning::Error),

    #[error("Invalid site: {message}")]
    InvalidSite { message: String },

    #[error("Malformed timestamp '{value}' (expected format '{format}')")]
    MalformedTimestamp { value: String, format: String },

    #[error("Cannot localize {timestamp} in timezone {timezone}")]
    Localization { timestamp: String, timezone: String },

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
