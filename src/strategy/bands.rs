//! Rolling Decision Bands
//!
//! center = mean(window)
//! upper  = center + multiplier_up   * std(window)
//! lower  = center - multiplier_down * std(window)
//!
//! Population standard deviation over the trailing window. A channel band
//! (Donchian) uses the highest and lowest value of the window instead:
//!
//! upper  = max(window), lower = min(window), center = midpoint
//!
//! Either band can be held between recomputations through [`BandSchedule`].

use serde::{Deserialize, Serialize};

use super::error::StatsError;

/// Dispersion below which z-scores are undefined
const MIN_STD_DEV: f64 = 1e-10;

/// Entry/exit thresholds derived from one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub center: f64,
    pub upper: f64,
    pub lower: f64,
    /// Dispersion the band was derived from
    pub std_dev: f64,
    /// Number of observations used
    pub window: usize,
    pub multiplier_up: f64,
    pub multiplier_down: f64,
}

impl Band {
    /// Build a band from its center and dispersion
    pub fn from_moments(
        center: f64,
        std_dev: f64,
        window: usize,
        multiplier_up: f64,
        multiplier_down: f64,
    ) -> Self {
        Self {
            center,
            upper: center + multiplier_up * std_dev,
            lower: center - multiplier_down * std_dev,
            std_dev,
            window,
            multiplier_up,
            multiplier_down,
        }
    }

    /// Donchian channel: the window's extremes, midpoint center.
    ///
    /// Multipliers are zero since the edges are not scaled dispersion.
    pub fn channel(high: f64, low: f64, std_dev: f64, window: usize) -> Self {
        Self {
            center: (high + low) / 2.0,
            upper: high,
            lower: low,
            std_dev,
            window,
            multiplier_up: 0.0,
            multiplier_down: 0.0,
        }
    }

    /// Distance of `value` from the center in units of dispersion
    pub fn z_score(&self, value: f64) -> Option<f64> {
        if self.std_dev < MIN_STD_DEV {
            return None;
        }
        Some((value - self.center) / self.std_dev)
    }

    /// The same band in dispersion units: center 0, upper +mu, lower -md
    pub fn standardized(&self) -> Band {
        Band::from_moments(0.0, 1.0, self.window, self.multiplier_up, self.multiplier_down)
    }

    /// |value - center| / std, or 0 for a flat window
    pub fn deviation(&self, value: f64) -> f64 {
        self.z_score(value).map(f64::abs).unwrap_or(0.0)
    }

    pub fn is_ordered(&self) -> bool {
        self.lower <= self.center && self.center <= self.upper
    }
}

/// How the band edges are derived from the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandSource {
    /// Mean plus/minus multiples of the standard deviation
    #[default]
    StdDev,
    /// Highest and lowest value of the window (turtle breakout)
    Channel,
}

/// Computes bands over a trailing lookback window
#[derive(Debug, Clone, Copy)]
pub struct BandCalculator {
    window: usize,
    multiplier_up: f64,
    multiplier_down: f64,
    source: BandSource,
}

impl BandCalculator {
    pub fn new(window: usize, multiplier_up: f64, multiplier_down: f64) -> Self {
        Self {
            window,
            multiplier_up,
            multiplier_down,
            source: BandSource::StdDev,
        }
    }

    /// Donchian channel over `window` values
    pub fn channel(window: usize) -> Self {
        Self::new(window, 0.0, 0.0).with_source(BandSource::Channel)
    }

    pub fn with_source(mut self, source: BandSource) -> Self {
        self.source = source;
        self
    }

    pub fn source(&self) -> BandSource {
        self.source
    }

    /// Symmetric band, as in the Bollinger-style grid
    pub fn symmetric(window: usize, multiplier: f64) -> Self {
        Self::new(window, multiplier, multiplier)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Band over the last `window` values (all of them if fewer)
    pub fn compute(&self, values: &[f64]) -> Result<Band, StatsError> {
        let start = values.len().saturating_sub(self.window);
        let window = &values[start..];
        if window.len() < 2 {
            return Err(StatsError::insufficient(2, window.len()));
        }
        if window.iter().any(|v| !v.is_finite()) {
            return Err(StatsError::NonFinite("band window"));
        }

        let mean = rolling_mean(window);
        let std_dev = rolling_std(window, mean);

        match self.source {
            BandSource::StdDev => Ok(Band::from_moments(
                mean,
                std_dev,
                window.len(),
                self.multiplier_up,
                self.multiplier_down,
            )),
            BandSource::Channel => {
                let high = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let low = window.iter().copied().fold(f64::INFINITY, f64::min);
                Ok(Band::channel(high, low, std_dev, window.len()))
            }
        }
    }
}

fn rolling_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn rolling_std(values: &[f64], mean: f64) -> f64 {
    let variance = values
        .iter()
        .map(|&v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;

    variance.sqrt()
}

/// Holds a band for `every` ticks before recomputing it.
///
/// Ticks are counted per call to `band_with`; the engine works on a copy and
/// only keeps it when the evaluation commits, so skipped or failed ticks do
/// not use up the cadence.
#[derive(Debug, Clone)]
pub struct BandSchedule {
    every: usize,
    held: Option<Band>,
    ticks_held: usize,
}

impl BandSchedule {
    /// `every = 1` recomputes on each tick; 0 is treated as 1
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            held: None,
            ticks_held: 0,
        }
    }

    pub fn held(&self) -> Option<&Band> {
        self.held.as_ref()
    }

    /// Return the held band, or run `compute` when it is due.
    ///
    /// A failed recomputation drops the held band, so the next tick
    /// recomputes as well.
    pub fn band_with<F>(&mut self, compute: F) -> Result<Band, StatsError>
    where
        F: FnOnce() -> Result<Band, StatsError>,
    {
        if let Some(band) = self.held {
            if self.ticks_held < self.every {
                self.ticks_held += 1;
                return Ok(band);
            }
        }

        match compute() {
            Ok(band) => {
                self.held = Some(band);
                self.ticks_held = 1;
                Ok(band)
            }
            Err(e) => {
                self.invalidate();
                Err(e)
            }
        }
    }

    pub fn invalidate(&mut self) {
        self.held = None;
        self.ticks_held = 0;
    }
}
