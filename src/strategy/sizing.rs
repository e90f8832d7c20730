//! Position Sizing
//!
//! Per-leg lot count for a non-flat state. `Fixed` is the constant lot size
//! the spread scripts use; `Tiered` scales the position with the distance
//! of the statistic from the band center, like the grid weights.

use serde::{Deserialize, Serialize};

use super::bands::Band;

/// Quantity used once a deviation reaches `min_deviation` (in std units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingTier {
    pub min_deviation: f64,
    pub quantity: u64,
}

impl SizingTier {
    pub fn new(min_deviation: f64, quantity: u64) -> Self {
        Self { min_deviation, quantity }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum SizingPolicy {
    Fixed { quantity: u64 },
    Tiered { tiers: Vec<SizingTier> },
}

impl Default for SizingPolicy {
    fn default() -> Self {
        SizingPolicy::Fixed { quantity: 1 }
    }
}

impl SizingPolicy {
    pub fn fixed(quantity: u64) -> Self {
        SizingPolicy::Fixed { quantity }
    }

    pub fn tiered(mut tiers: Vec<SizingTier>) -> Self {
        tiers.sort_by(|a, b| a.min_deviation.total_cmp(&b.min_deviation));
        SizingPolicy::Tiered { tiers }
    }

    /// Lots per leg for a position held while the statistic is at `statistic`.
    ///
    /// Tiered sizing picks the deepest tier reached. Below every tier the
    /// shallowest tier applies, so a held position never sizes to zero.
    pub fn quantity(&self, statistic: f64, band: &Band) -> u64 {
        match self {
            SizingPolicy::Fixed { quantity } => *quantity,
            SizingPolicy::Tiered { tiers } => {
                let deviation = band.deviation(statistic);
                let reached = tiers
                    .iter()
                    .filter(|t| deviation >= t.min_deviation)
                    .max_by(|a, b| a.min_deviation.total_cmp(&b.min_deviation));
                let shallowest = tiers
                    .iter()
                    .min_by(|a, b| a.min_deviation.total_cmp(&b.min_deviation));

                reached.or(shallowest).map(|t| t.quantity).unwrap_or(0)
            }
        }
    }
}
