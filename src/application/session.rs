//! Session Tracker
//!
//! Exchange-local trading day bookkeeping: the close-time cutoff and the
//! per-day round-trip counter. Counters roll over when the local date
//! changes.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::strategy::{ConfigError, FlattenReason, SessionConfig, Transition};

#[derive(Debug, Clone)]
pub struct SessionTracker {
    close_time: Option<NaiveTime>,
    offset: FixedOffset,
    max_trades_per_day: Option<u32>,
    trading_day: Option<NaiveDate>,
    round_trips: u32,
}

impl SessionTracker {
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60)
            .ok_or(ConfigError::InvalidUtcOffset(config.utc_offset_minutes))?;

        Ok(Self {
            close_time: config.close_time,
            offset,
            max_trades_per_day: config.max_trades_per_day,
            trading_day: None,
            round_trips: 0,
        })
    }

    /// Reset the counters if `now` falls on a new local day
    pub fn roll(&mut self, now: DateTime<Utc>) {
        let today = now.with_timezone(&self.offset).date_naive();
        if self.trading_day != Some(today) {
            if self.trading_day.is_some() {
                tracing::info!("New trading day {} - daily counters reset", today);
            }
            self.trading_day = Some(today);
            self.round_trips = 0;
        }
    }

    /// Reason to force the book flat right now, if any
    pub fn gate(&self, now: DateTime<Utc>) -> Option<FlattenReason> {
        if let Some(close) = self.close_time {
            if now.with_timezone(&self.offset).time() >= close {
                return Some(FlattenReason::SessionClose);
            }
        }
        if self.limit_reached() {
            return Some(FlattenReason::TradeLimitReached);
        }
        None
    }

    /// False once the next closed position would use up the daily limit,
    /// so a reversal would open a position that could never be traded out of
    pub fn allows_reversal(&self) -> bool {
        self.max_trades_per_day
            .map_or(true, |max| self.round_trips + 1 < max)
    }

    /// Count a completed round trip
    pub fn record(&mut self, transition: &Transition) {
        if transition.closes_position() {
            self.round_trips += 1;
        }
    }

    pub fn round_trips(&self) -> u32 {
        self.round_trips
    }

    fn limit_reached(&self) -> bool {
        self.max_trades_per_day
            .is_some_and(|max| self.round_trips >= max)
    }
}
