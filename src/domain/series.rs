//! Time-indexed price series
//!
//! Bars arrive from the market-data collaborator newest-last. Consumers
//! assume strictly increasing timestamps, so construction rejects anything
//! else instead of silently sorting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ohlcv {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Timestamps not strictly increasing at index {0}")]
    Unordered(usize),
    #[error("Timestamp and value counts differ: {0} vs {1}")]
    LengthMismatch(usize, usize),
}

/// Ordered sequence of observations with strictly increasing timestamps
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl Series {
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self, SeriesError> {
        if timestamps.len() != values.len() {
            return Err(SeriesError::LengthMismatch(timestamps.len(), values.len()));
        }
        if let Some(i) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SeriesError::Unordered(i + 1));
        }
        Ok(Self { timestamps, values })
    }

    /// Closing prices of the given bars
    pub fn closes(bars: &[Ohlcv]) -> Result<Self, SeriesError> {
        Self::new(
            bars.iter().map(|b| b.timestamp).collect(),
            bars.iter().map(|b| b.close).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Keep only the `n` most recent observations
    pub fn trailing(&self, n: usize) -> Series {
        let start = self.len().saturating_sub(n);
        Series {
            timestamps: self.timestamps[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    /// Inner join of two series on timestamp.
    ///
    /// Two legs of a pair can miss different bars (suspensions, illiquid
    /// minutes); only timestamps present in both are paired.
    pub fn align(a: &Series, b: &Series) -> (Series, Series) {
        let (mut i, mut j) = (0, 0);
        let mut left = Series::default();
        let mut right = Series::default();

        while i < a.len() && j < b.len() {
            match a.timestamps[i].cmp(&b.timestamps[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    left.timestamps.push(a.timestamps[i]);
                    left.values.push(a.values[i]);
                    right.timestamps.push(b.timestamps[j]);
                    right.values.push(b.values[j]);
                    i += 1;
                    j += 1;
                }
            }
        }

        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 9, 25, 9, minute, 0).unwrap()
    }

    #[test]
    fn test_series_rejects_unordered() {
        let result = Series::new(vec![ts(1), ts(3), ts(2)], vec![1.0, 2.0, 3.0]);
        assert_eq!(result, Err(SeriesError::Unordered(2)));

        let result = Series::new(vec![ts(1), ts(1)], vec![1.0, 2.0]);
        assert_eq!(result, Err(SeriesError::Unordered(1)));
    }

    #[test]
    fn test_series_length_mismatch() {
        let result = Series::new(vec![ts(1)], vec![1.0, 2.0]);
        assert!(matches!(result, Err(SeriesError::LengthMismatch(1, 2))));
    }

    #[test]
    fn test_trailing() {
        let series = Series::new(vec![ts(1), ts(2), ts(3)], vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(series.trailing(2).values(), &[2.0, 3.0]);
        assert_eq!(series.trailing(10).len(), 3);
        assert_eq!(series.last(), Some(3.0));
    }

    #[test]
    fn test_align_drops_unmatched_bars() {
        let a = Series::new(vec![ts(1), ts(2), ts(3), ts(5)], vec![10.0, 11.0, 12.0, 13.0]).unwrap();
        let b = Series::new(vec![ts(2), ts(3), ts(4), ts(5)], vec![20.0, 21.0, 22.0, 23.0]).unwrap();

        let (left, right) = Series::align(&a, &b);
        assert_eq!(left.values(), &[11.0, 12.0, 13.0]);
        assert_eq!(right.values(), &[20.0, 21.0, 23.0]);
        assert_eq!(left.timestamps(), right.timestamps());
    }

    #[test]
    fn test_closes_from_bars() {
        let bars: Vec<Ohlcv> = (1..=3)
            .map(|m| Ohlcv {
                timestamp: ts(m),
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: m as f64,
                volume: 100.0,
            })
            .collect();
        let series = Series::closes(&bars).unwrap();
        assert_eq!(series.values(), &[1.0, 2.0, 3.0]);
    }
}
