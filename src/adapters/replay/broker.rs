//! Paper Broker
//!
//! Fills every absolute target immediately at the feed's current close.
//! Tracks average entry price per side and realized P&L on reductions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{HeldPosition, Side, TargetPositionCommand};
use crate::ports::{CollaboratorError, ExecutionPort};

use super::feed::ReplayFeed;

#[derive(Debug, Default)]
struct Book {
    positions: HashMap<(String, Side), HeldPosition>,
    realized_pnl: f64,
    commands: usize,
}

pub struct PaperBroker {
    feed: Arc<ReplayFeed>,
    book: Mutex<Book>,
    /// Contract multiplier applied to P&L
    multiplier: f64,
}

impl PaperBroker {
    pub fn new(feed: Arc<ReplayFeed>) -> Self {
        Self {
            feed,
            book: Mutex::new(Book::default()),
            multiplier: 1.0,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Every non-empty side, sorted by instrument then side
    pub async fn holdings(&self) -> Vec<HeldPosition> {
        let book = self.book.lock().await;
        let mut held: Vec<HeldPosition> = book
            .positions
            .values()
            .filter(|p| p.quantity > 0)
            .cloned()
            .collect();
        held.sort_by(|a, b| {
            a.instrument
                .cmp(&b.instrument)
                .then((a.side == Side::Short).cmp(&(b.side == Side::Short)))
        });
        held
    }

    pub async fn realized_pnl(&self) -> f64 {
        self.book.lock().await.realized_pnl
    }

    /// Number of targets that changed the book
    pub async fn command_count(&self) -> usize {
        self.book.lock().await.commands
    }
}

#[async_trait]
impl ExecutionPort for PaperBroker {
    async fn current_positions(&self, instrument: &str) -> Result<Vec<HeldPosition>, CollaboratorError> {
        let book = self.book.lock().await;
        Ok([Side::Long, Side::Short]
            .into_iter()
            .filter_map(|side| book.positions.get(&(instrument.to_string(), side)))
            .filter(|p| p.quantity > 0)
            .cloned()
            .collect())
    }

    async fn set_target_position(&self, command: &TargetPositionCommand) -> Result<(), CollaboratorError> {
        let price = self.feed.last_close(&command.instrument).ok_or_else(|| {
            CollaboratorError::Rejected(format!("no price for {} at {}", command.instrument, self.feed.cursor()))
        })?;

        let mut book = self.book.lock().await;
        let key = (command.instrument.clone(), command.side);
        let current = book
            .positions
            .get(&key)
            .cloned()
            .unwrap_or_else(|| HeldPosition::new(&command.instrument, command.side, 0, 0.0));

        if command.quantity == current.quantity {
            return Ok(());
        }

        let updated = if command.quantity > current.quantity {
            let added = (command.quantity - current.quantity) as f64;
            let cost = current.avg_price * current.quantity as f64 + price * added;
            HeldPosition::new(&command.instrument, command.side, command.quantity, cost / command.quantity as f64)
        } else {
            let closed = (current.quantity - command.quantity) as f64;
            let per_lot = match command.side {
                Side::Long => price - current.avg_price,
                Side::Short => current.avg_price - price,
            };
            book.realized_pnl += per_lot * closed * self.multiplier;
            let avg_price = if command.quantity == 0 { 0.0 } else { current.avg_price };
            HeldPosition::new(&command.instrument, command.side, command.quantity, avg_price)
        };

        tracing::debug!(
            "Paper fill {} {} {} -> {} @ {:.2}",
            command.instrument,
            command.side,
            current.quantity,
            command.quantity,
            price
        );

        book.positions.insert(key, updated);
        book.commands += 1;
        Ok(())
    }
}
