use thiserror::Error;

use crate::domain::SeriesError;

/// Statistical failures. Every variant means "skip this tick", never fatal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("Insufficient data: requires {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Series lengths differ: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("Degenerate input: {0}")]
    Degenerate(String),

    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("Invalid series: {0}")]
    Series(#[from] SeriesError),
}

impl StatsError {
    pub fn insufficient(required: usize, actual: usize) -> Self {
        StatsError::InsufficientData { required, actual }
    }
}
