//! Error types for the cost-of-living advisor

use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {

    // =============================
    // Local Assets
    // =============================

    #[error("Missing asset: {0}")]
    MissingAsset(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Model error: {0}")]
    Model(String),

    // =============================
    // Request Validation
    // =============================

    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Invalid horizon: target year {target_year} is before base year {base_year}")]
    InvalidHorizon { target_year: i32, base_year: i32 },

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Services
    // =============================

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Document store error: {0}")]
    Store(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
