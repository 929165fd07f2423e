/// Algorithm settings and per-side selection weights.
///
/// Everything here is plain data with documented defaults. `validate()`
/// rejects out-of-range values up front so the engine never has to.
use crate::constants::{
    DEFAULT_BOUNDS_MULTIPLIER, DEFAULT_MAX_REDRAW_ATTEMPTS, DEFAULT_MIN_CONFIDENCE_TO_EXCEED,
    DEFAULT_MIN_OVERFLOW_ITEMS, DEFAULT_MIN_SELECTION_WEIGHT, DEFAULT_MIN_VOTES_TO_EXCEED,
    DEFAULT_OVERFLOW_FOCUS, DEFAULT_OVERFLOW_NEIGHBOR_RADIUS, DEFAULT_OVERFLOW_THRESHOLD,
    DEFAULT_TIER_SPREAD, DEFAULT_VOTE_SATURATION,
};
use crate::error::RankError;

/// How an uncertain item and a confident anchor are picked from an
/// overflowing tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AnchorPolicy {
    /// Sort candidates by confidence; left samples the lower half, right the upper half.
    #[default]
    SplitHalves,
    /// Left takes the least confident candidate, right the most confident.
    Extremes,
}

impl AnchorPolicy {
    pub fn parse(value: &str) -> Option<AnchorPolicy> {
        match value {
            "split-halves" | "split_halves" => Some(AnchorPolicy::SplitHalves),
            "extremes" => Some(AnchorPolicy::Extremes),
            _ => None,
        }
    }
}

/// Soft tier bounds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BoundsConfig {
    pub enabled: bool,
    /// Bound distance in multiples of the (possibly scaled) tier spread.
    pub multiplier: f64,
    pub min_confidence_to_exceed: f64,
    pub min_votes_to_exceed: u32,
    /// Widen the bound as the collection grows.
    pub adaptive: bool,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        BoundsConfig {
            enabled: true,
            multiplier: DEFAULT_BOUNDS_MULTIPLIER,
            min_confidence_to_exceed: DEFAULT_MIN_CONFIDENCE_TO_EXCEED,
            min_votes_to_exceed: DEFAULT_MIN_VOTES_TO_EXCEED,
            adaptive: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlgorithmConfig {
    /// σ of the target tier distribution.
    pub tier_spread: f64,
    pub vote_saturation: f64,
    pub overflow_threshold: f64,
    pub min_overflow_items: usize,
    pub bounds: BoundsConfig,
    /// Probability of spending a round inside the most overflowing tier.
    pub overflow_focus: f64,
    pub overflow_neighbor_radius: u32,
    pub anchor_policy: AnchorPolicy,
    pub min_selection_weight: f64,
    pub max_redraw_attempts: usize,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        AlgorithmConfig {
            tier_spread: DEFAULT_TIER_SPREAD,
            vote_saturation: DEFAULT_VOTE_SATURATION,
            overflow_threshold: DEFAULT_OVERFLOW_THRESHOLD,
            min_overflow_items: DEFAULT_MIN_OVERFLOW_ITEMS,
            bounds: BoundsConfig::default(),
            overflow_focus: DEFAULT_OVERFLOW_FOCUS,
            overflow_neighbor_radius: DEFAULT_OVERFLOW_NEIGHBOR_RADIUS,
            anchor_policy: AnchorPolicy::default(),
            min_selection_weight: DEFAULT_MIN_SELECTION_WEIGHT,
            max_redraw_attempts: DEFAULT_MAX_REDRAW_ATTEMPTS,
        }
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), RankError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(RankError::InvalidConfig(format!(
            "{name} must be within [{min}, {max}], got {value}"
        )))
    }
}

impl AlgorithmConfig {
    pub fn validate(&self) -> Result<(), RankError> {
        check_range("tier_spread", self.tier_spread, 0.5, 5.0)?;
        check_range("vote_saturation", self.vote_saturation, 1.0, 100.0)?;
        check_range("overflow_threshold", self.overflow_threshold, 0.5, 3.0)?;
        if !(1..=20).contains(&self.min_overflow_items) {
            return Err(RankError::InvalidConfig(format!(
                "min_overflow_items must be within [1, 20], got {}",
                self.min_overflow_items
            )));
        }
        check_range("bounds.multiplier", self.bounds.multiplier, 1.0, 10.0)?;
        check_range(
            "bounds.min_confidence_to_exceed",
            self.bounds.min_confidence_to_exceed,
            0.0,
            1.0,
        )?;
        check_range("overflow_focus", self.overflow_focus, 0.0, 1.0)?;
        check_range("min_selection_weight", self.min_selection_weight, 0.0, 1.0)?;
        if self.max_redraw_attempts == 0 {
            return Err(RankError::InvalidConfig(
                "max_redraw_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scoring factors combined into a candidate's priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    Recency,
    LowVotes,
    Instability,
    TierSize,
}

impl Factor {
    pub const ALL: [Factor; 4] = [
        Factor::Recency,
        Factor::LowVotes,
        Factor::Instability,
        Factor::TierSize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Factor::Recency => "recency",
            Factor::LowVotes => "low_votes",
            Factor::Instability => "instability",
            Factor::TierSize => "tier_size",
        }
    }
}

/// Factor weights and preferences for one presentation side.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WeightSet {
    pub recency: f64,
    pub low_votes: f64,
    pub instability: f64,
    pub tier_size: f64,
    /// Score stable items higher instead of unstable ones.
    pub prefer_stable: bool,
    /// Score well-voted items higher instead of sparsely voted ones.
    pub prefer_high_votes: bool,
}

impl Default for WeightSet {
    fn default() -> Self {
        WeightSet::balanced()
    }
}

impl WeightSet {
    /// Equal weight on every factor.
    pub fn balanced() -> Self {
        WeightSet {
            recency: 0.25,
            low_votes: 0.25,
            instability: 0.25,
            tier_size: 0.25,
            prefer_stable: false,
            prefer_high_votes: false,
        }
    }

    /// Default left side: items that need data (few votes, unstable).
    pub fn default_left() -> Self {
        WeightSet {
            recency: 0.2,
            low_votes: 0.35,
            instability: 0.3,
            tier_size: 0.15,
            ..WeightSet::balanced()
        }
    }

    /// Default right side: crowded tiers and items not seen for a while.
    pub fn default_right() -> Self {
        WeightSet {
            recency: 0.3,
            low_votes: 0.15,
            instability: 0.15,
            tier_size: 0.4,
            ..WeightSet::balanced()
        }
    }

    pub fn weight(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Recency => self.recency,
            Factor::LowVotes => self.low_votes,
            Factor::Instability => self.instability,
            Factor::TierSize => self.tier_size,
        }
    }

    pub fn total(&self) -> f64 {
        Factor::ALL.iter().map(|&f| self.weight(f)).sum()
    }

    /// Weights scaled to sum to 1.0. All-zero weights become equal weights.
    pub fn normalized(&self) -> WeightSet {
        let total = self.total();
        if total <= 0.0 {
            return WeightSet {
                prefer_stable: self.prefer_stable,
                prefer_high_votes: self.prefer_high_votes,
                ..WeightSet::balanced()
            };
        }
        WeightSet {
            recency: self.recency / total,
            low_votes: self.low_votes / total,
            instability: self.instability / total,
            tier_size: self.tier_size / total,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), RankError> {
        for factor in Factor::ALL {
            let w = self.weight(factor);
            if !w.is_finite() || w < 0.0 {
                return Err(RankError::InvalidConfig(format!(
                    "weight {} must be a finite non-negative number, got {w}",
                    factor.name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AlgorithmConfig::default().validate().is_ok());
        assert!(WeightSet::default_left().validate().is_ok());
        assert!(WeightSet::default_right().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_spread() {
        let config = AlgorithmConfig { tier_spread: 0.1, ..AlgorithmConfig::default() };
        match config.validate() {
            Err(RankError::InvalidConfig(msg)) => assert!(msg.contains("tier_spread")),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_nan() {
        let config = AlgorithmConfig { overflow_focus: f64::NAN, ..AlgorithmConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalized_sums_to_one() {
        let weights = WeightSet { recency: 2.0, low_votes: 1.0, instability: 1.0, tier_size: 0.0, ..WeightSet::balanced() };
        let n = weights.normalized();
        assert!((n.total() - 1.0).abs() < 1e-12);
        assert!((n.recency - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_all_zero_becomes_equal() {
        let weights = WeightSet {
            recency: 0.0,
            low_votes: 0.0,
            instability: 0.0,
            tier_size: 0.0,
            prefer_stable: true,
            prefer_high_votes: false,
        };
        let n = weights.normalized();
        assert_eq!(n.recency, 0.25);
        assert!(n.prefer_stable);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let weights = WeightSet { tier_size: -0.1, ..WeightSet::balanced() };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_anchor_policy_parse() {
        assert_eq!(AnchorPolicy::parse("extremes"), Some(AnchorPolicy::Extremes));
        assert_eq!(AnchorPolicy::parse("split-halves"), Some(AnchorPolicy::SplitHalves));
        assert_eq!(AnchorPolicy::parse("median"), None);
    }
}
