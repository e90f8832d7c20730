//! Strategy Layer - Band Automaton and Statistical Gates
//!
//! Pure computation, no I/O:
//! - ADF unit-root test with MacKinnon p-values
//! - Engle-Granger cointegration gate and OLS hedge ratios
//! - Rolling mean/std bands with a recompute cadence
//! - Decision statistics (spread, residual, z-score, price)
//! - The FLAT / LONG_SPREAD / SHORT_SPREAD automaton and position sizing

pub mod error;
pub mod regression;
pub mod stationarity;
pub mod cointegration;
pub mod bands;
pub mod statistic;
pub mod sizing;
pub mod automaton;
pub mod params;

pub use error::StatsError;
pub use regression::{HedgeFit, HedgeRatioEstimator};
pub use stationarity::{AdfResult, StationarityTester};
pub use cointegration::{CointegrationValidator, Rejection, ValidityGate};
pub use bands::{Band, BandCalculator, BandSchedule, BandSource};
pub use statistic::{DecisionPoint, DecisionStatistic, StatisticKind};
pub use sizing::{SizingPolicy, SizingTier};
pub use automaton::{EntryMode, FlattenReason, PositionAutomaton, Transition};
pub use params::{AutomatonConfig, BandConfig, ConfigError, SessionConfig, ValidityConfig, ValidityPolicy};
