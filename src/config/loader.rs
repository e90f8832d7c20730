//! Configuration Loader
//!
//! Loads and validates the pair-trading configuration from a TOML file.
//! One `[[pairs]]` entry per automaton; every pair shares the band,
//! statistic, validity, sizing and session sections.

use chrono::NaiveTime;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::InstrumentPair;
use crate::strategy::{
    AutomatonConfig, BandConfig, EntryMode, SessionConfig, SizingPolicy, StatisticKind,
    ValidityConfig,
};

/// Environment variable overriding `[replay] bars_path`
pub const BARS_PATH_ENV: &str = "BAND_TRADER_BARS";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bands: BandConfig,
    #[serde(default)]
    pub statistic: StatisticSection,
    #[serde(default)]
    pub validity: ValidityConfig,
    #[serde(default)]
    pub sizing: SizingPolicy,
    #[serde(default)]
    pub session: SessionSection,
    pub pairs: Vec<InstrumentPair>,
    #[serde(default)]
    pub replay: ReplaySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Decision statistic section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatisticSection {
    /// "spread", "residual", "zscore" or "price"
    pub kind: StatisticKind,
    /// "reversion" or "breakout"
    pub entry_mode: EntryMode,
}

/// Session section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Exchange-local "HH:MM" after which positions are flattened
    pub close_time: Option<String>,
    /// Exchange offset from UTC (480 for UTC+8)
    pub utc_offset_minutes: i32,
    pub max_trades_per_day: Option<u32>,
}

impl SessionSection {
    pub fn parse_close_time(&self) -> Result<Option<NaiveTime>, ConfigError> {
        self.close_time
            .as_deref()
            .map(|raw| {
                NaiveTime::parse_from_str(raw, "%H:%M").map_err(|e| {
                    ConfigError::ValidationError(format!("close_time '{}' is not HH:MM: {}", raw, e))
                })
            })
            .transpose()
    }
}

/// Replay section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplaySection {
    /// JSON file of bars keyed by instrument
    #[serde(default)]
    pub bars_path: Option<String>,
}

impl ReplaySection {
    /// Get bars path with environment variable override
    /// Checks BAND_TRADER_BARS env var first, falls back to config value
    pub fn get_bars_path(&self) -> Option<PathBuf> {
        let raw = std::env::var(BARS_PATH_ENV).ok().or_else(|| self.bars_path.clone())?;
        Some(PathBuf::from(shellexpand::tilde(&raw).into_owned()))
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let expanded = shellexpand::tilde(&path.as_ref().to_string_lossy()).into_owned();
    let content = std::fs::read_to_string(expanded)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pairs.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one [[pairs]] entry is required".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for pair in &self.pairs {
            if pair.name.is_empty() || pair.lead.is_empty() {
                return Err(ConfigError::ValidationError(
                    "pair name and lead cannot be empty".to_string(),
                ));
            }
            if !names.insert(pair.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate pair name '{}'",
                    pair.name
                )));
            }
            if pair.hedge.as_deref() == Some(pair.lead.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "pair '{}' uses {} as both lead and hedge",
                    pair.name, pair.lead
                )));
            }
        }

        let automaton = self.automaton_config()?;
        for pair in &self.pairs {
            automaton
                .validate_for(pair)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }

        Ok(())
    }

    /// Engine configuration shared by every pair
    pub fn automaton_config(&self) -> Result<AutomatonConfig, ConfigError> {
        AutomatonConfig::try_from(self)
    }
}

// Conversion from Config to AutomatonConfig
impl TryFrom<&Config> for AutomatonConfig {
    type Error = ConfigError;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        Ok(AutomatonConfig {
            bands: config.bands.clone(),
            statistic: config.statistic.kind,
            entry_mode: config.statistic.entry_mode,
            validity: config.validity.clone(),
            sizing: config.sizing.clone(),
            session: SessionConfig {
                close_time: config.session.parse_close_time()?,
                utc_offset_minutes: config.session.utc_offset_minutes,
                max_trades_per_day: config.session.max_trades_per_day,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{BandSource, SizingTier, ValidityPolicy};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[bands]
lookback = 30
multiplier_up = 1.5
multiplier_down = 1.0
recompute_every_ticks = 60

[statistic]
kind = "residual"
entry_mode = "reversion"

[validity]
policy = "cointegration"
significance = 0.05
adf_lag = 1

[sizing]
policy = "tiered"
tiers = [
    { min_deviation = 1.0, quantity = 1 },
    { min_deviation = 2.0, quantity = 3 },
]

[session]
close_time = "14:55"
utc_offset_minutes = 480
max_trades_per_day = 3

[[pairs]]
name = "rb-hc"
lead = "rb1801"
hedge = "hc1801"

[[pairs]]
name = "rb-calendar"
lead = "rb1801"
hedge = "rb1805"

[replay]
bars_path = "data/bars.json"

[logging]
level = "info"
"#
        .to_string()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.bands.lookback, 30);
        assert_eq!(config.bands.recompute_every_ticks, 60);
        assert_eq!(config.statistic.kind, StatisticKind::Residual);
        assert_eq!(config.validity.significance, 0.05);
        assert_eq!(config.pairs.len(), 2);
        assert_eq!(config.pairs[1].hedge.as_deref(), Some("rb1805"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_automaton_config_conversion() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();
        let automaton = config.automaton_config().unwrap();

        assert_eq!(automaton.bands.multiplier_down, 1.0);
        assert_eq!(automaton.validity.policy, ValidityPolicy::Cointegration);
        assert_eq!(automaton.session.close_time, NaiveTime::from_hms_opt(14, 55, 0));
        assert_eq!(automaton.session.max_trades_per_day, Some(3));
        assert_eq!(
            automaton.sizing,
            SizingPolicy::tiered(vec![SizingTier::new(1.0, 1), SizingTier::new(2.0, 3)])
        );
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = write_config(
            r#"
[[pairs]]
name = "rb-hc"
lead = "rb1801"
hedge = "hc1801"
"#,
        );
        let config = load_config(file.path()).unwrap();
        let automaton = config.automaton_config().unwrap();

        assert_eq!(automaton, AutomatonConfig::default());
        assert_eq!(config.logging.level, "warn");
        assert!(config.replay.bars_path.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_parse_error() {
        let file = write_config("[bands\nlookback = ");
        assert!(matches!(load_config(file.path()), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_no_pairs_rejected() {
        let file = write_config("pairs = []\n");
        assert!(matches!(load_config(file.path()), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_bad_close_time_rejected() {
        let content = create_valid_config().replace("\"14:55\"", "\"2:55pm\"");
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("close_time"));
    }

    #[test]
    fn test_negative_multiplier_rejected() {
        let content = create_valid_config().replace("multiplier_down = 1.0", "multiplier_down = -1.0");
        let file = write_config(&content);
        assert!(matches!(load_config(file.path()), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_single_instrument_needs_price_statistic() {
        let file = write_config(
            r#"
[validity]
policy = "none"

[[pairs]]
name = "rb-grid"
lead = "rb1801"
"#,
        );
        assert!(matches!(load_config(file.path()), Err(ConfigError::ValidationError(_))));

        let file = write_config(
            r#"
[statistic]
kind = "price"
entry_mode = "breakout"

[validity]
policy = "none"

[[pairs]]
name = "rb-grid"
lead = "rb1801"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.statistic.entry_mode, EntryMode::Breakout);
    }

    #[test]
    fn test_channel_breakout_section() {
        let file = write_config(
            r#"
[bands]
lookback = 55
source = "channel"

[statistic]
kind = "price"
entry_mode = "breakout"

[validity]
policy = "none"

[[pairs]]
name = "rb-turtle"
lead = "rb1801"
"#,
        );
        let automaton = load_config(file.path()).unwrap().automaton_config().unwrap();
        assert_eq!(automaton.bands.source, BandSource::Channel);
        assert_eq!(automaton.bands.lookback, 55);
        assert_eq!(automaton.history_len(), 56);

        let content = create_valid_config()
            .replace("kind = \"residual\"", "kind = \"zscore\"")
            .replace("recompute_every_ticks = 60", "recompute_every_ticks = 60\nsource = \"channel\"");
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Channel"));
    }

    #[test]
    fn test_duplicate_pair_names_rejected() {
        let content = create_valid_config().replace("name = \"rb-calendar\"", "name = \"rb-hc\"");
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_lead_equal_to_hedge_rejected() {
        let content = create_valid_config().replace("hedge = \"rb1805\"", "hedge = \"rb1801\"");
        let file = write_config(&content);
        assert!(matches!(load_config(file.path()), Err(ConfigError::ValidationError(_))));
    }
}
