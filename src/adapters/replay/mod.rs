//! Replay Adapter
//!
//! Offline collaborators for backtesting a config against recorded bars:
//! a bar-by-bar market data feed and a paper broker that fills every target
//! at the current close.

mod broker;
mod error;
mod feed;

pub use broker::PaperBroker;
pub use error::ReplayError;
pub use feed::ReplayFeed;
