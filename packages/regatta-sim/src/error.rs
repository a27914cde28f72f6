//! error.rs — Construction and configuration failures
//!
//! Only setup can fail. A running tick never returns an error: bad control
//! input is dropped and logged, geometry edge cases resolve deterministically.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown venue '{0}'")]
    UnknownVenue(String),
    #[error("boat count must be between 1 and {max} (got {count})")]
    InvalidBoatCount { count: usize, max: usize },
    #[error("{field} must not be negative (got {value:.2})")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be greater than zero (got {value:.2})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}
