/// Confidence estimation.
///
/// confidence = stability * vote_factor, where
///   stability   = 1 / (1 + stddev(tier_history))
///   vote_factor = min(1, sqrt(votes) / sqrt(saturation))
///
/// Both factors lie in [0, 1]. A never-voted item has vote_factor 0 and thus
/// confidence 0, which is what lets the selector treat new items as the
/// least certain ones in the collection.
use statrs::statistics::Statistics;

use crate::types::ItemStats;

/// Sample standard deviation of a tier history. 0.0 for fewer than two entries.
pub fn tier_deviation(tier_history: &[i32]) -> f64 {
    if tier_history.len() < 2 {
        return 0.0;
    }
    let deviation = tier_history.iter().map(|&t| f64::from(t)).std_dev();
    if deviation.is_finite() { deviation } else { 0.0 }
}

pub fn stability_from_deviation(deviation: f64) -> f64 {
    1.0 / (1.0 + deviation)
}

pub fn stability(tier_history: &[i32]) -> f64 {
    stability_from_deviation(tier_deviation(tier_history))
}

pub fn vote_factor(votes: u32, vote_saturation: f64) -> f64 {
    if votes == 0 {
        return 0.0;
    }
    (f64::from(votes).sqrt() / vote_saturation.sqrt()).min(1.0)
}

pub fn confidence(stats: &ItemStats, vote_saturation: f64) -> f64 {
    stability(stats.tier_history()) * vote_factor(stats.votes(), vote_saturation)
}

/// All intermediate values of a confidence calculation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfidenceBreakdown {
    pub votes: u32,
    pub tier_deviation: f64,
    pub stability: f64,
    pub vote_factor: f64,
    pub confidence: f64,
}

impl ConfidenceBreakdown {
    pub fn of(stats: &ItemStats, vote_saturation: f64) -> Self {
        let tier_deviation = tier_deviation(stats.tier_history());
        let stability = stability_from_deviation(tier_deviation);
        let vote_factor = vote_factor(stats.votes(), vote_saturation);
        ConfidenceBreakdown {
            votes: stats.votes(),
            tier_deviation,
            stability,
            vote_factor,
            confidence: stability * vote_factor,
        }
    }

    /// One-line rendering of the formula with the numbers filled in.
    pub fn formula(&self, vote_saturation: f64) -> String {
        if self.votes == 0 {
            return "no votes: confidence 0.000".to_string();
        }
        format!(
            "1 / (1 + {:.3}) * min(1, sqrt({}) / sqrt({})) = {:.3} * {:.3} = {:.3}",
            self.tier_deviation,
            self.votes,
            vote_saturation,
            self.stability,
            self.vote_factor,
            self.confidence,
        )
    }
}

/// Summary statistics over a set of confidence values.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfidenceSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

impl ConfidenceSummary {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return ConfidenceSummary::default();
        }
        let std_dev = if values.len() > 1 { values.iter().std_dev() } else { 0.0 };
        ConfidenceSummary {
            count: values.len(),
            mean: values.iter().mean(),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std_dev,
        }
    }
}

/// The `count` entries with the lowest confidence, lowest first.
/// Ties keep input order.
pub fn lowest_confidence<'a>(
    items: impl IntoIterator<Item = (&'a str, &'a ItemStats)>,
    count: usize,
    vote_saturation: f64,
) -> Vec<(&'a str, f64)> {
    let mut scored: Vec<(&str, f64)> = items
        .into_iter()
        .map(|(id, stats)| (id, confidence(stats, vote_saturation)))
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.truncate(count);
    scored
}

/// The `count` entries with the highest confidence, highest first.
/// Ties keep input order.
pub fn highest_confidence<'a>(
    items: impl IntoIterator<Item = (&'a str, &'a ItemStats)>,
    count: usize,
    vote_saturation: f64,
) -> Vec<(&'a str, f64)> {
    let mut scored: Vec<(&str, f64)> = items
        .into_iter()
        .map(|(id, stats)| (id, confidence(stats, vote_saturation)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(count);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    const SATURATION: f64 = 20.0;

    #[test]
    fn test_never_voted_has_zero_confidence() {
        let stats = ItemStats::default();
        assert_eq!(stability(stats.tier_history()), 1.0);
        assert_eq!(confidence(&stats, SATURATION), 0.0);
    }

    #[test]
    fn test_zero_variance_stability_is_one() {
        assert_eq!(stability(&[2, 2, 2, 2]), 1.0);
        assert_eq!(tier_deviation(&[5]), 0.0);
    }

    #[test]
    fn test_sample_deviation() {
        // Sample (n-1) standard deviation of [0, 2] is sqrt(2).
        assert!((tier_deviation(&[0, 2]) - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_vote_factor_saturates() {
        assert_eq!(vote_factor(0, SATURATION), 0.0);
        assert!((vote_factor(5, SATURATION) - 0.5).abs() < 1e-12);
        assert_eq!(vote_factor(20, SATURATION), 1.0);
        assert_eq!(vote_factor(500, SATURATION), 1.0);
    }

    #[test]
    fn test_unsteady_history_is_less_confident() {
        let unsteady = ItemStats::with_history(&[0, 1, 2, 1, 2, 1]);
        let steady = ItemStats::with_history(&[0, 1, 1, 1, 1, 1]);
        assert_eq!(unsteady.votes(), steady.votes());
        assert!(stability(unsteady.tier_history()) < stability(steady.tier_history()));
        assert!(confidence(&unsteady, SATURATION) < confidence(&steady, SATURATION));
    }

    #[test]
    fn test_confidence_non_decreasing_in_votes() {
        let history = [0, 1, 0, 1];
        let mut previous = 0.0;
        for votes in 0..40 {
            let c = stability(&history) * vote_factor(votes, SATURATION);
            assert!(c >= previous, "confidence dropped at {votes} votes");
            previous = c;
        }
    }

    #[test]
    fn test_confidence_non_increasing_in_variance() {
        let histories: [&[i32]; 4] = [&[0, 0, 0, 0], &[0, 1, 0, 1], &[0, 2, 0, 2], &[0, 4, 0, 4]];
        let values: Vec<f64> = histories.iter().map(|h| stability(h) * vote_factor(3, SATURATION)).collect();
        for w in values.windows(2) {
            assert!(w[1] <= w[0]);
        }
    }

    #[test]
    fn test_breakdown_matches_confidence() {
        let stats = ItemStats::with_history(&[0, 1, 2, 1]);
        let breakdown = ConfidenceBreakdown::of(&stats, SATURATION);
        assert!((breakdown.confidence - confidence(&stats, SATURATION)).abs() < 1e-12);
        assert!(breakdown.formula(SATURATION).ends_with(&format!("{:.3}", breakdown.confidence)));
        assert!(ConfidenceBreakdown::of(&ItemStats::default(), SATURATION)
            .formula(SATURATION)
            .starts_with("no votes"));
    }

    #[test]
    fn test_lowest_and_highest_confidence() {
        let items = vec![
            ("new".to_string(), ItemStats::default()),
            ("steady".to_string(), ItemStats::with_history(&[0, 1, 1, 1, 1, 1, 1, 1])),
            ("wobbly".to_string(), ItemStats::with_history(&[0, 1, 0, 1, 0])),
        ];
        let view = || items.iter().map(|(id, s)| (id.as_str(), s));

        let lowest = lowest_confidence(view(), 2, SATURATION);
        assert_eq!(lowest[0].0, "new");
        assert_eq!(lowest.len(), 2);

        let highest = highest_confidence(view(), 1, SATURATION);
        assert_eq!(highest[0].0, "steady");
    }

    #[test]
    fn test_summary_statistics() {
        let summary = ConfidenceSummary::from_values(&[0.2, 0.4, 0.6]);
        assert_eq!(summary.count, 3);
        assert!((summary.mean - 0.4).abs() < 1e-12);
        assert_eq!(summary.min, 0.2);
        assert_eq!(summary.max, 0.6);
        assert!((summary.std_dev - 0.2).abs() < 1e-12);
        assert_eq!(ConfidenceSummary::from_values(&[]).count, 0);
    }
}
