//! Adapters Layer - External System Implementations
//!
//! - Replay: recorded bars served as a market data port, plus a paper broker
//! - CLI: Command-line interface handlers

pub mod cli;
pub mod replay;

pub use cli::CliApp;
pub use replay::{PaperBroker, ReplayError, ReplayFeed};
