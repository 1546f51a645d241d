// crates/oeecal-core/src/error.rs

use chrono::NaiveDate;
use thiserror::Error;

/// Settings rejected at the boundary, before any record is touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("hour window [{min}, {max}] must satisfy 0 <= min <= max <= 23")]
    InvalidHourWindow { min: u8, max: u8 },

    #[error("period starts {from} after it ends {to}")]
    InvertedPeriod { from: NaiveDate, to: NaiveDate },

    #[error("calibration grid dimension '{0}' has no values")]
    EmptyGridDimension(&'static str),

    #[error("tolerance must be a finite, non-negative number of percentage points, got {0}")]
    InvalidTolerance(f64),

    #[error("scheduled stoppage threshold must be finite and non-negative, got {0} s")]
    InvalidThreshold(f64),

    #[error("invalid reference '{input}': {reason}")]
    InvalidReference { input: String, reason: String },

    #[error("settings file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
