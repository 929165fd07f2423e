/// Tier distribution analysis and adaptive tier bounds.
///
/// The target shape is a normal curve centred on tier 0:
///
///   expected(t) = N * φ(t / σ) / Z,   Z = Σ φ(t' / σ) over the observed range
///
/// where the observed range is every integer tier from the lowest to the
/// highest occupied one. Normalising over that range makes the expectations
/// sum to N exactly, however far the collection has spread.
use std::collections::BTreeMap;

use statrs::distribution::{Continuous, Normal};

use crate::confidence::confidence;
use crate::config::AlgorithmConfig;
use crate::constants::{ADAPTIVE_BOUNDS_BASE_SIZE, TIER_SIZE_RATIO_CAP};
use crate::error::RankError;
use crate::store::ItemStore;
use crate::types::ItemStats;

/// Actual vs. expected population of one tier.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierRow {
    pub tier: i32,
    pub actual: usize,
    pub expected: f64,
    /// actual / expected, 0.0 when nothing is expected.
    pub ratio: f64,
    /// actual - expected.
    pub deviation: f64,
    pub overflowing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierDistribution {
    normal: Normal,
    total_items: usize,
    tier_spread: f64,
    density_total: f64,
    /// One row per tier of the observed range, ascending.
    rows: Vec<TierRow>,
    /// Overflowing tiers, largest excess first, ties by ascending tier.
    overflowing: Vec<i32>,
}

fn standard_normal() -> Result<Normal, RankError> {
    Normal::new(0.0, 1.0)
        .map_err(|e| RankError::Internal(format!("standard normal distribution: {e}")))
}

impl TierDistribution {
    pub fn analyze(store: &ItemStore, config: &AlgorithmConfig) -> Result<Self, RankError> {
        Self::from_population(&store.tier_population(), config)
    }

    pub fn from_population(
        population: &BTreeMap<i32, usize>,
        config: &AlgorithmConfig,
    ) -> Result<Self, RankError> {
        let total_items: usize = population.values().sum();
        let sigma = config.tier_spread;
        let normal = standard_normal()?;

        let (lo, hi) = match (population.keys().next(), population.keys().next_back()) {
            (Some(&lo), Some(&hi)) if total_items > 0 => (lo, hi),
            _ => {
                return Ok(TierDistribution {
                    normal,
                    total_items: 0,
                    tier_spread: sigma,
                    density_total: 0.0,
                    rows: Vec::new(),
                    overflowing: Vec::new(),
                });
            }
        };

        let density_total: f64 = (lo..=hi).map(|t| normal.pdf(f64::from(t) / sigma)).sum();

        let mut rows = Vec::with_capacity(hi.abs_diff(lo) as usize + 1);
        for tier in lo..=hi {
            let actual = population.get(&tier).copied().unwrap_or(0);
            let expected = if density_total > 0.0 {
                total_items as f64 * normal.pdf(f64::from(tier) / sigma) / density_total
            } else {
                0.0
            };
            let ratio = if expected > 0.0 { actual as f64 / expected } else { 0.0 };
            let overflowing = actual >= config.min_overflow_items
                && actual as f64 >= config.overflow_threshold * expected;
            rows.push(TierRow {
                tier,
                actual,
                expected,
                ratio,
                deviation: actual as f64 - expected,
                overflowing,
            });
        }

        let mut flagged: Vec<&TierRow> = rows.iter().filter(|r| r.overflowing).collect();
        flagged.sort_by(|a, b| b.deviation.total_cmp(&a.deviation).then(a.tier.cmp(&b.tier)));
        let overflowing = flagged.into_iter().map(|r| r.tier).collect();

        Ok(TierDistribution {
            normal,
            total_items,
            tier_spread: sigma,
            density_total,
            rows,
            overflowing,
        })
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn rows(&self) -> &[TierRow] {
        &self.rows
    }

    pub fn row(&self, tier: i32) -> Option<&TierRow> {
        let first = self.rows.first()?.tier;
        let idx = usize::try_from(tier.checked_sub(first)?).ok()?;
        self.rows.get(idx)
    }

    /// Expected population of any tier. Zero for an empty collection.
    pub fn expected(&self, tier: i32) -> f64 {
        if self.density_total <= 0.0 {
            return 0.0;
        }
        let density = self.normal.pdf(f64::from(tier) / self.tier_spread);
        self.total_items as f64 * density / self.density_total
    }

    pub fn actual(&self, tier: i32) -> usize {
        self.row(tier).map_or(0, |r| r.actual)
    }

    /// Overflowing tiers, most overflowing first.
    pub fn overflowing(&self) -> &[i32] {
        &self.overflowing
    }

    pub fn is_overflowing(&self, tier: i32) -> bool {
        self.row(tier).is_some_and(|r| r.overflowing)
    }

    pub fn most_overflowing(&self) -> Option<&TierRow> {
        self.overflowing.first().and_then(|&t| self.row(t))
    }

    /// min(actual / expected, cap) / cap for overflowing tiers, else 0.
    pub fn tier_size_score(&self, tier: i32) -> f64 {
        match self.row(tier) {
            Some(row) if row.overflowing && row.expected > 0.0 => {
                row.ratio.min(TIER_SIZE_RATIO_CAP) / TIER_SIZE_RATIO_CAP
            }
            Some(row) if row.overflowing => 1.0,
            _ => 0.0,
        }
    }
}

/// Soft tier limits. Items inside `lower..=upper` move freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierBounds {
    pub lower: i32,
    pub upper: i32,
}

impl TierBounds {
    pub fn contains(&self, tier: i32) -> bool {
        (self.lower..=self.upper).contains(&tier)
    }
}

/// Spread used for the bounds. With adaptive scaling it grows by
/// log10(N) / log10(100) once the collection passes 100 items.
pub fn bound_spread(total_items: usize, tier_spread: f64, adaptive: bool) -> f64 {
    if !adaptive || total_items <= ADAPTIVE_BOUNDS_BASE_SIZE {
        return tier_spread;
    }
    let scale = (total_items as f64).log10() / (ADAPTIVE_BOUNDS_BASE_SIZE as f64).log10();
    tier_spread * scale.max(1.0)
}

/// Current soft bounds for a collection of `total_items`; `None` when disabled.
pub fn tier_bounds(total_items: usize, config: &AlgorithmConfig) -> Option<TierBounds> {
    if !config.bounds.enabled {
        return None;
    }
    let spread = bound_spread(total_items, config.tier_spread, config.bounds.adaptive);
    let limit = ((spread * config.bounds.multiplier).floor() as i32).max(1);
    Some(TierBounds { lower: -limit, upper: limit })
}

/// Whether an item has earned the right to move past the soft bound.
pub fn can_exceed_bound(stats: &ItemStats, config: &AlgorithmConfig) -> bool {
    stats.votes() >= config.bounds.min_votes_to_exceed
        && confidence(stats, config.vote_saturation) >= config.bounds.min_confidence_to_exceed
}

/// Whether `stats` may move to `target` under `bounds`.
pub fn move_allowed(
    stats: &ItemStats,
    target: i32,
    bounds: Option<TierBounds>,
    config: &AlgorithmConfig,
) -> bool {
    match bounds {
        None => true,
        Some(b) if b.contains(target) => true,
        Some(_) => can_exceed_bound(stats, config),
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundsReport {
    pub bounds: Option<TierBounds>,
    pub total_items: usize,
    pub at_lower_bound: usize,
    pub at_upper_bound: usize,
    pub qualified_to_exceed: usize,
    pub multiplier: f64,
    pub min_confidence_to_exceed: f64,
    pub min_votes_to_exceed: u32,
    pub adaptive: bool,
}

pub fn bounds_report(store: &ItemStore, config: &AlgorithmConfig) -> BoundsReport {
    let bounds = tier_bounds(store.len(), config);
    let (mut at_lower_bound, mut at_upper_bound, mut qualified_to_exceed) = (0, 0, 0);
    for (_, stats) in store.iter() {
        if let Some(b) = bounds {
            if stats.current_tier() <= b.lower {
                at_lower_bound += 1;
            }
            if stats.current_tier() >= b.upper {
                at_upper_bound += 1;
            }
        }
        if can_exceed_bound(stats, config) {
            qualified_to_exceed += 1;
        }
    }
    BoundsReport {
        bounds,
        total_items: store.len(),
        at_lower_bound,
        at_upper_bound,
        qualified_to_exceed,
        multiplier: config.bounds.multiplier,
        min_confidence_to_exceed: config.bounds.min_confidence_to_exceed,
        min_votes_to_exceed: config.bounds.min_votes_to_exceed,
        adaptive: config.bounds.adaptive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population(entries: &[(i32, usize)]) -> BTreeMap<i32, usize> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_empty_collection_expects_nothing() {
        let dist = TierDistribution::from_population(&BTreeMap::new(), &AlgorithmConfig::default()).unwrap();
        assert_eq!(dist.total_items(), 0);
        assert_eq!(dist.expected(0), 0.0);
        assert!(dist.overflowing().is_empty());
        assert_eq!(dist.tier_size_score(0), 0.0);
    }

    #[test]
    fn test_expected_sums_to_total() {
        let config = AlgorithmConfig::default();
        for pop in [
            population(&[(0, 1)]),
            population(&[(0, 7), (1, 3), (-2, 4)]),
            population(&[(-5, 2), (0, 40), (6, 1)]),
            population(&[(3, 9)]),
        ] {
            let dist = TierDistribution::from_population(&pop, &config).unwrap();
            let sum: f64 = dist.rows().iter().map(|r| r.expected).sum();
            let total: usize = pop.values().sum();
            assert!((sum - total as f64).abs() < 1e-9, "sum {sum} != {total}");
        }
    }

    #[test]
    fn test_observed_range_includes_empty_tiers() {
        let dist = TierDistribution::from_population(&population(&[(-2, 1), (2, 1)]), &AlgorithmConfig::default()).unwrap();
        let tiers: Vec<i32> = dist.rows().iter().map(|r| r.tier).collect();
        assert_eq!(tiers, vec![-2, -1, 0, 1, 2]);
        assert_eq!(dist.actual(0), 0);
        assert!(dist.expected(0) > dist.expected(2));
    }

    #[test]
    fn test_extreme_tier_has_one_row() {
        let dist = TierDistribution::from_population(&population(&[(i32::MAX, 2)]), &AlgorithmConfig::default()).unwrap();
        assert_eq!(dist.rows().len(), 1);
        assert_eq!(dist.row(i32::MAX).map(|r| r.actual), Some(2));
        assert_eq!(dist.expected(i32::MAX), 0.0);
    }

    #[test]
    fn test_expected_matches_rows() {
        let dist = TierDistribution::from_population(&population(&[(-1, 3), (0, 5), (2, 2)]), &AlgorithmConfig::default()).unwrap();
        for row in dist.rows() {
            assert!((dist.expected(row.tier) - row.expected).abs() < 1e-9);
        }
    }

    /// Tier +3 holding 6 of 55 items, against an expectation of about 2.
    fn crowded_top() -> BTreeMap<i32, usize> {
        population(&[(-3, 1), (-2, 6), (-1, 11), (0, 14), (1, 11), (2, 6), (3, 6)])
    }

    #[test]
    fn test_crowded_tier_is_flagged() {
        let dist = TierDistribution::from_population(&crowded_top(), &AlgorithmConfig::default()).unwrap();
        let row = dist.row(3).unwrap();
        assert!((row.expected - 2.0).abs() < 0.1, "expected ~2, got {}", row.expected);
        assert_eq!(dist.overflowing(), &[3]);
        assert_eq!(dist.most_overflowing().map(|r| r.tier), Some(3));
        assert!(dist.tier_size_score(3) > 0.9);
        assert_eq!(dist.tier_size_score(0), 0.0);
    }

    #[test]
    fn test_min_overflow_items_guards_tails() {
        // One item at +4 is far above its tiny expectation but below the minimum count.
        let dist = TierDistribution::from_population(&population(&[(0, 10), (4, 1)]), &AlgorithmConfig::default()).unwrap();
        assert!(!dist.is_overflowing(4));
    }

    #[test]
    fn test_overflow_order_by_excess_then_tier() {
        // Symmetric populations give equal excess on +2 and -2; the lower tier wins the tie.
        let dist = TierDistribution::from_population(&population(&[(-2, 5), (0, 1), (2, 5)]), &AlgorithmConfig::default()).unwrap();
        assert_eq!(dist.overflowing(), &[-2, 2]);
    }

    #[test]
    fn test_bounds_default_and_adaptive_growth() {
        let config = AlgorithmConfig::default();
        assert_eq!(tier_bounds(50, &config), Some(TierBounds { lower: -4, upper: 4 }));
        assert_eq!(tier_bounds(1_000, &config), Some(TierBounds { lower: -6, upper: 6 }));
        assert_eq!(tier_bounds(10_000, &config), Some(TierBounds { lower: -9, upper: 9 }));

        let mut fixed = config.clone();
        fixed.bounds.adaptive = false;
        assert_eq!(tier_bounds(10_000, &fixed), Some(TierBounds { lower: -4, upper: 4 }));

        let mut off = config;
        off.bounds.enabled = false;
        assert_eq!(tier_bounds(10, &off), None);
    }

    #[test]
    fn test_bound_spread_is_monotone() {
        let mut previous = 0.0;
        for n in [0, 10, 100, 101, 500, 5_000, 50_000] {
            let spread = bound_spread(n, 1.5, true);
            assert!(spread >= previous);
            previous = spread;
        }
    }

    #[test]
    fn test_can_exceed_requires_votes_and_confidence() {
        let config = AlgorithmConfig::default();
        // 24 votes spent at tier 1: deviation 0.2, confidence ~0.83.
        let steady: Vec<i32> = std::iter::once(0).chain(std::iter::repeat(1).take(24)).collect();
        assert!(can_exceed_bound(&ItemStats::with_history(&steady), &config));

        // Same steadiness, too few votes.
        assert!(!can_exceed_bound(&ItemStats::with_history(&[0, 1, 1, 1]), &config));

        // Plenty of votes, but the tier keeps swinging.
        let swinging: Vec<i32> = (0..24).map(|i| if i % 2 == 0 { 0 } else { 4 }).collect();
        assert!(!can_exceed_bound(&ItemStats::with_history(&swinging), &config));
    }

    #[test]
    fn test_move_allowed() {
        let config = AlgorithmConfig::default();
        let bounds = Some(TierBounds { lower: -4, upper: 4 });
        let fresh = ItemStats::with_history(&[0, 1, 2, 3, 4]);
        assert!(move_allowed(&fresh, 4, bounds, &config));
        assert!(!move_allowed(&fresh, 5, bounds, &config));
        assert!(move_allowed(&fresh, 5, None, &config));
    }

    #[test]
    fn test_bounds_report_counts() {
        let mut store = ItemStore::new();
        store.insert("top".into(), ItemStats::with_history(&[0, 1, 2, 3, 4]));
        store.insert("bottom".into(), ItemStats::with_history(&[0, -1, -2, -3, -4]));
        store.insert_if_absent("new");
        let report = bounds_report(&store, &AlgorithmConfig::default());
        assert_eq!(report.bounds, Some(TierBounds { lower: -4, upper: 4 }));
        assert_eq!(report.at_upper_bound, 1);
        assert_eq!(report.at_lower_bound, 1);
        assert_eq!(report.qualified_to_exceed, 0);
        assert_eq!(report.total_items, 3);
    }
}
