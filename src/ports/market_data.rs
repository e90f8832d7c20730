use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::Ohlcv;

use super::error::CollaboratorError;

/// Market data port trait
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// At most `len` most recent bars for `instrument`, oldest first.
    /// May return fewer when the history is short.
    async fn history(&self, instrument: &str, len: usize) -> Result<Vec<Ohlcv>, CollaboratorError>;

    /// Current time as seen by the data source (bar time in replay)
    fn now(&self) -> DateTime<Utc>;
}
