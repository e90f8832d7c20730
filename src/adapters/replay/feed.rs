//! Replay Feed
//!
//! Serves recorded bars as if they were arriving live. The cursor marks the
//! current bar time: `history` only returns bars at or before it and `now`
//! reports it.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Ohlcv, Series};
use crate::ports::{CollaboratorError, MarketDataPort};

use super::error::ReplayError;

#[derive(Debug)]
pub struct ReplayFeed {
    bars: HashMap<String, Vec<Ohlcv>>,
    cursor: RwLock<DateTime<Utc>>,
}

impl ReplayFeed {
    /// Build a feed, checking each instrument's bars are strictly increasing
    pub fn new(bars: HashMap<String, Vec<Ohlcv>>) -> Result<Self, ReplayError> {
        for (instrument, series) in &bars {
            Series::closes(series).map_err(|source| ReplayError::Unordered {
                instrument: instrument.clone(),
                source,
            })?;
        }

        let first = bars
            .values()
            .filter_map(|series| series.first())
            .map(|bar| bar.timestamp)
            .min()
            .ok_or(ReplayError::Empty)?;

        Ok(Self {
            bars,
            cursor: RwLock::new(first),
        })
    }

    /// Parse `{"instrument": [bar, ...], ...}`
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let bars: HashMap<String, Vec<Ohlcv>> = serde_json::from_str(json)?;
        Self::new(bars)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn instruments(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bars.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Every distinct bar time across all instruments, in order
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars
            .values()
            .flatten()
            .map(|bar| bar.timestamp)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn advance_to(&self, timestamp: DateTime<Utc>) {
        let mut cursor = self.cursor.write().unwrap_or_else(|e| e.into_inner());
        *cursor = timestamp;
    }

    pub fn cursor(&self) -> DateTime<Utc> {
        *self.cursor.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Bars of `instrument` visible at the cursor
    pub fn visible(&self, instrument: &str) -> Option<&[Ohlcv]> {
        let series = self.bars.get(instrument)?;
        let cursor = self.cursor();
        let end = series.partition_point(|bar| bar.timestamp <= cursor);
        Some(&series[..end])
    }

    /// Close of the latest visible bar
    pub fn last_close(&self, instrument: &str) -> Option<f64> {
        self.visible(instrument)?.last().map(|bar| bar.close)
    }
}

#[async_trait]
impl MarketDataPort for ReplayFeed {
    async fn history(&self, instrument: &str, len: usize) -> Result<Vec<Ohlcv>, CollaboratorError> {
        let visible = self
            .visible(instrument)
            .ok_or_else(|| CollaboratorError::InvalidData(format!("no bars for {}", instrument)))?;
        let start = visible.len().saturating_sub(len);
        Ok(visible[start..].to_vec())
    }

    fn now(&self) -> DateTime<Utc> {
        self.cursor()
    }
}
