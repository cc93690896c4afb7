use crate::driver::DriverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Indicator name is not present in the catalog
    #[error("Unknown indicator: '{0}'")]
    UnknownIndicator(String),
    /// Region code is not part of the region code sequence
    #[error("Region '{region}' is not available. Available regions: {available}")]
    UnknownRegion { region: String, available: String },
    /// Catalog file is malformed or inconsistent
    #[error("Catalog error: {0}")]
    CatalogError(String),
    /// Page driver could not complete a command outside of a protocol step
    #[error("Page driver error: {0}")]
    DriverError(#[from] DriverError),
    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    UrlError(String),
    /// Invalid input format
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// IO operation failed
    #[error("IO error: {0}")]
    IoError(String),
}

// Conversion implementations for common errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::UrlError(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::InvalidInput(format!("Failed to parse TOML: {err}"))
    }
}

// Custom type alias for Results in this application
pub type AppResult<T> = Result<T, AppError>;
