//! Automaton Parameters
//!
//! Configuration structs for one pair engine: band window and multipliers,
//! statistic kind, validity policy, sizing and session limits.
//! Defaults follow the spread scripts: 20-bar window, 2 std bands, fixed
//! one-lot legs, cointegration checked at 10%.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::InstrumentPair;

use super::automaton::EntryMode;
use super::bands::BandSource;
use super::cointegration::DEFAULT_SIGNIFICANCE;
use super::sizing::SizingPolicy;
use super::stationarity::StationarityTester;
use super::statistic::StatisticKind;

/// Main automaton configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AutomatonConfig {
    pub bands: BandConfig,
    pub statistic: StatisticKind,
    pub entry_mode: EntryMode,
    pub validity: ValidityConfig,
    pub sizing: SizingPolicy,
    pub session: SessionConfig,
}

impl AutomatonConfig {
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.bands.lookback = lookback;
        self
    }

    pub fn with_multipliers(mut self, up: f64, down: f64) -> Self {
        self.bands.multiplier_up = up;
        self.bands.multiplier_down = down;
        self
    }

    pub fn with_band_source(mut self, source: BandSource) -> Self {
        self.bands.source = source;
        self
    }

    pub fn with_recompute_every(mut self, ticks: usize) -> Self {
        self.bands.recompute_every_ticks = ticks;
        self
    }

    pub fn with_statistic(mut self, kind: StatisticKind) -> Self {
        self.statistic = kind;
        self
    }

    pub fn with_entry_mode(mut self, mode: EntryMode) -> Self {
        self.entry_mode = mode;
        self
    }

    pub fn with_validity(mut self, policy: ValidityPolicy) -> Self {
        self.validity.policy = policy;
        self
    }

    pub fn with_sizing(mut self, sizing: SizingPolicy) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Bars to request from market data each tick
    pub fn history_len(&self) -> usize {
        self.statistic.history_len(self.bands.lookback)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bands.validate()?;
        self.validity.validate()?;
        validate_sizing(&self.sizing)?;
        self.session.validate()?;

        if self.bands.source == BandSource::Channel && self.statistic == StatisticKind::ZScore {
            return Err(ConfigError::ChannelNotStandardizable);
        }

        if self.validity.policy == ValidityPolicy::Cointegration {
            // the difference test runs on one bar fewer than the levels
            let min_len = StationarityTester::new(self.validity.adf_lag).min_len() + 1;
            if self.history_len() < min_len {
                return Err(ConfigError::InvalidLookback(self.bands.lookback));
            }
        }
        Ok(())
    }

    /// Check that the statistic and validity policy fit the pair's legs
    pub fn validate_for(&self, pair: &InstrumentPair) -> Result<(), ConfigError> {
        self.validate()?;
        if self.statistic.needs_hedge() != pair.is_spread() {
            return Err(ConfigError::LegMismatch {
                pair: pair.name.clone(),
                statistic: self.statistic,
            });
        }
        if self.validity.policy == ValidityPolicy::Cointegration && !pair.is_spread() {
            return Err(ConfigError::CointegrationNeedsHedge(pair.name.clone()));
        }
        Ok(())
    }
}

/// Rolling band settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    /// Bars in the band window
    pub lookback: usize,
    pub multiplier_up: f64,
    pub multiplier_down: f64,
    /// Hold the band for this many ticks (1 = every tick)
    pub recompute_every_ticks: usize,
    /// `stddev` (mean +/- k std) or `channel` (window high/low)
    pub source: BandSource,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            multiplier_up: 2.0,
            multiplier_down: 2.0,
            recompute_every_ticks: 1,
            source: BandSource::StdDev,
        }
    }
}

impl BandConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback < 2 {
            return Err(ConfigError::InvalidLookback(self.lookback));
        }
        for m in [self.multiplier_up, self.multiplier_down] {
            if !m.is_finite() || m < 0.0 {
                return Err(ConfigError::InvalidMultiplier(m));
            }
        }
        if self.recompute_every_ticks == 0 {
            return Err(ConfigError::InvalidCadence);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidityPolicy {
    /// Always trade
    None,
    /// Engle-Granger gate before every evaluation
    #[default]
    Cointegration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidityConfig {
    pub policy: ValidityPolicy,
    pub significance: f64,
    /// Lagged differences in every ADF regression
    pub adf_lag: usize,
}

impl Default for ValidityConfig {
    fn default() -> Self {
        Self {
            policy: ValidityPolicy::default(),
            significance: DEFAULT_SIGNIFICANCE,
            adf_lag: 1,
        }
    }
}

impl ValidityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(ConfigError::InvalidSignificance(self.significance));
        }
        Ok(())
    }
}

/// End-of-day controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Exchange-local time at which everything is flattened
    pub close_time: Option<NaiveTime>,
    /// Exchange offset from UTC
    pub utc_offset_minutes: i32,
    /// Completed round trips allowed per local day
    pub max_trades_per_day: Option<u32>,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::InvalidUtcOffset(self.utc_offset_minutes));
        }
        if self.max_trades_per_day == Some(0) {
            return Err(ConfigError::InvalidTradeLimit);
        }
        Ok(())
    }
}

fn validate_sizing(sizing: &SizingPolicy) -> Result<(), ConfigError> {
    match sizing {
        SizingPolicy::Fixed { quantity } => {
            if *quantity == 0 {
                return Err(ConfigError::InvalidQuantity);
            }
        }
        SizingPolicy::Tiered { tiers } => {
            if tiers.is_empty() {
                return Err(ConfigError::InvalidTiers("no tiers".to_string()));
            }
            for tier in tiers {
                if tier.quantity == 0 {
                    return Err(ConfigError::InvalidQuantity);
                }
                if !tier.min_deviation.is_finite() || tier.min_deviation < 0.0 {
                    return Err(ConfigError::InvalidTiers(format!(
                        "min_deviation {} must be finite and non-negative",
                        tier.min_deviation
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid lookback: {0} (too short for the band or the unit-root test)")]
    InvalidLookback(usize),
    #[error("Invalid band multiplier: {0} (must be finite and >= 0)")]
    InvalidMultiplier(f64),
    #[error("Band recompute cadence must be at least 1 tick")]
    InvalidCadence,
    #[error("Invalid significance: {0} (must be 0 < p < 1)")]
    InvalidSignificance(f64),
    #[error("Position quantity must be at least 1 lot")]
    InvalidQuantity,
    #[error("Invalid sizing tiers: {0}")]
    InvalidTiers(String),
    #[error("Invalid UTC offset: {0} minutes")]
    InvalidUtcOffset(i32),
    #[error("Max trades per day must be at least 1")]
    InvalidTradeLimit,
    #[error("Pair {pair}: statistic '{statistic}' does not match its legs")]
    LegMismatch { pair: String, statistic: StatisticKind },
    #[error("Channel bands have no standardized form; use them with spread, residual or price")]
    ChannelNotStandardizable,
    #[error("Pair {0}: cointegration requires a hedge instrument")]
    CointegrationNeedsHedge(String),
}
