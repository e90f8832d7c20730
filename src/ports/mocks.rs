use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::{HeldPosition, Ohlcv, Side, TargetPositionCommand};

use super::error::CollaboratorError;
use super::execution::ExecutionPort;
use super::market_data::MarketDataPort;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One-minute bars ending at `end`, one per close, oldest first
pub fn bars_from_closes(end: DateTime<Utc>, closes: &[f64]) -> Vec<Ohlcv> {
    let n = closes.len() as i64;
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Ohlcv {
            timestamp: end - Duration::minutes(n - 1 - i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        })
        .collect()
}

/// Mock market data port that records calls and allows controlled responses
#[derive(Debug)]
pub struct MockMarketData {
    calls: Arc<Mutex<Vec<(String, usize)>>>,
    bars: Arc<Mutex<HashMap<String, Vec<Ohlcv>>>>,
    now: Arc<Mutex<DateTime<Utc>>>,
    failure: Arc<Mutex<Option<CollaboratorError>>>,
}

impl Default for MockMarketData {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            bars: Arc::default(),
            now: Arc::new(Mutex::new(DateTime::<Utc>::default())),
            failure: Arc::default(),
        }
    }
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the bar history for an instrument
    pub fn with_bars(self, instrument: &str, bars: Vec<Ohlcv>) -> Self {
        self.set_bars(instrument, bars);
        self
    }

    pub fn with_now(self, now: DateTime<Utc>) -> Self {
        self.set_now(now);
        self
    }

    pub fn set_bars(&self, instrument: &str, bars: Vec<Ohlcv>) {
        lock(&self.bars).insert(instrument.to_string(), bars);
    }

    /// Replace the history with one-minute bars ending at the current clock
    pub fn set_closes(&self, instrument: &str, closes: &[f64]) {
        let now = *lock(&self.now);
        self.set_bars(instrument, bars_from_closes(now, closes));
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        *lock(&self.now) = now;
    }

    /// Every following `history` call fails with `error`
    pub fn fail_with(&self, error: CollaboratorError) {
        *lock(&self.failure) = Some(error);
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    /// Get all recorded calls
    pub fn get_calls(&self) -> Vec<(String, usize)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl MarketDataPort for MockMarketData {
    async fn history(&self, instrument: &str, len: usize) -> Result<Vec<Ohlcv>, CollaboratorError> {
        lock(&self.calls).push((instrument.to_string(), len));
        if let Some(error) = lock(&self.failure).clone() {
            return Err(error);
        }

        let bars = lock(&self.bars);
        let history = bars.get(instrument).map(Vec::as_slice).unwrap_or(&[]);
        let start = history.len().saturating_sub(len);
        Ok(history[start..].to_vec())
    }

    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

/// Mock execution port holding an in-memory book.
///
/// Every target is applied immediately, so the next `current_positions`
/// sees the effect, and recorded for inspection.
#[derive(Debug, Default)]
pub struct MockExecution {
    calls: Arc<Mutex<Vec<TargetPositionCommand>>>,
    book: Arc<Mutex<HashMap<(String, Side), u64>>>,
    failure: Arc<Mutex<Option<CollaboratorError>>>,
}

impl MockExecution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to seed an existing holding
    pub fn with_position(self, instrument: &str, side: Side, quantity: u64) -> Self {
        lock(&self.book).insert((instrument.to_string(), side), quantity);
        self
    }

    pub fn holding(&self, instrument: &str, side: Side) -> u64 {
        lock(&self.book)
            .get(&(instrument.to_string(), side))
            .copied()
            .unwrap_or(0)
    }

    /// Every following call fails with `error`
    pub fn fail_with(&self, error: CollaboratorError) {
        *lock(&self.failure) = Some(error);
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    /// Get all recorded target commands
    pub fn get_calls(&self) -> Vec<TargetPositionCommand> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }
}

#[async_trait]
impl ExecutionPort for MockExecution {
    async fn current_positions(&self, instrument: &str) -> Result<Vec<HeldPosition>, CollaboratorError> {
        if let Some(error) = lock(&self.failure).clone() {
            return Err(error);
        }

        let book = lock(&self.book);
        Ok([Side::Long, Side::Short]
            .into_iter()
            .filter_map(|side| {
                book.get(&(instrument.to_string(), side))
                    .filter(|&&quantity| quantity > 0)
                    .map(|&quantity| HeldPosition::new(instrument, side, quantity, 0.0))
            })
            .collect())
    }

    async fn set_target_position(&self, command: &TargetPositionCommand) -> Result<(), CollaboratorError> {
        if let Some(error) = lock(&self.failure).clone() {
            return Err(error);
        }

        lock(&self.calls).push(command.clone());
        lock(&self.book).insert((command.instrument.clone(), command.side), command.quantity);
        Ok(())
    }
}
