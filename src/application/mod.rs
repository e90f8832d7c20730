//! Application Layer - Pair engines and their bookkeeping
//!
//! - `PairEngine`: one evaluation of the band automaton per tick
//! - `PositionReconciler`: desired legs to minimal absolute targets
//! - `SessionTracker`: close-time cutoff and daily round-trip limit

pub mod engine;
pub mod reconciler;
pub mod session;

pub use engine::{EngineError, PairEngine, TickContext, TickOutcome};
pub use reconciler::PositionReconciler;
pub use session::SessionTracker;
