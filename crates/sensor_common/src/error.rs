//! Error types for the sensor core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SensorError>;

#[derive(Error, Debug)]
pub enum SensorError {
    /// Records and probe results disagree in length. The source table changed
    /// shape between load and probe; never merged blindly.
    #[error("Shape mismatch: {records} records but {results} probe results")]
    ShapeMismatch { records: usize, results: usize },

    #[error("Source error: {0}")]
    Source(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid site: {0}")]
    InvalidSite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SensorError {
    /// Stable machine-readable code, used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            SensorError::ShapeMismatch { .. } => "shape_mismatch",
            SensorError::Source(_) => "source",
            SensorError::Config(_) => "config",
            SensorError::InvalidSite(_) => "invalid_site",
            SensorError::Io(_) => "io",
            SensorError::Toml(_) => "toml",
            SensorError::Json(_) => "json",
            SensorError::Csv(_) => "csv",
        }
    }
}
