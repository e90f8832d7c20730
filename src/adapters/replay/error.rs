//! Replay Error Types

use thiserror::Error;

use crate::domain::SeriesError;

/// Errors that can occur while loading a bar file
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Bar file could not be read
    #[error("Failed to read bar file: {0}")]
    Io(#[from] std::io::Error),

    /// Bar file is not `{instrument: [bar, ...]}` JSON
    #[error("Failed to parse bar file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Bars for one instrument are out of order or duplicated
    #[error("Instrument {instrument}: {source}")]
    Unordered {
        instrument: String,
        #[source]
        source: SeriesError,
    },

    /// No bars at all
    #[error("Bar file contains no bars")]
    Empty,
}
