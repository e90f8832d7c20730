//! Ports Layer - Trait definitions for external dependencies
//!
//! The engine only talks to the outside world through these traits:
//! - Market data (trailing bar history, clock)
//! - Execution (held positions, absolute position targets)
//!
//! Both are `Send + Sync` so several pair engines can share one adapter.

pub mod error;
pub mod market_data;
pub mod execution;
pub mod mocks;

pub use error::CollaboratorError;
pub use market_data::MarketDataPort;
pub use execution::ExecutionPort;
