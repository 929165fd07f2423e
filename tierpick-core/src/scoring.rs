/// Per-side priority scoring.
///
/// Every factor score lies in [0, 1]; a candidate's priority is the weighted
/// sum under one side's normalised weights. The per-item statistics are
/// computed once per round into a `RoundContext` and shared by both sides,
/// each of which passes its own `WeightSet` in explicitly.
use crate::confidence::{confidence, stability};
use crate::config::WeightSet;
use crate::distribution::TierDistribution;
use crate::store::ItemStore;

/// Per-item inputs to scoring, computed once per round.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Store index.
    pub idx: usize,
    pub tier: i32,
    pub votes: u32,
    pub stability: f64,
    pub confidence: f64,
    pub recency_score: f64,
    pub tier_size_score: f64,
}

impl Candidate {
    pub fn is_new(&self) -> bool {
        self.votes == 0
    }
}

/// Read-only view of the collection for one selection round.
#[derive(Debug, Clone)]
pub struct RoundContext {
    pub round_index: u64,
    pub candidates: Vec<Candidate>,
}

impl RoundContext {
    pub fn build(
        store: &ItemStore,
        distribution: &TierDistribution,
        round_index: u64,
        vote_saturation: f64,
    ) -> Self {
        let candidates = store
            .iter()
            .enumerate()
            .map(|(idx, (_, stats))| Candidate {
                idx,
                tier: stats.current_tier(),
                votes: stats.votes(),
                stability: stability(stats.tier_history()),
                confidence: confidence(stats, vote_saturation),
                recency_score: recency_score(stats.last_voted(), round_index),
                tier_size_score: distribution.tier_size_score(stats.current_tier()),
            })
            .collect();
        RoundContext { round_index, candidates }
    }
}

/// Rounds since the last vote relative to the clock; never-voted scores 1.0.
pub fn recency_score(last_voted: Option<u64>, round_index: u64) -> f64 {
    match last_voted {
        None => 1.0,
        Some(last) => round_index.saturating_sub(last) as f64 / (round_index as f64 + 1.0),
    }
}

pub fn low_votes_score(votes: u32, prefer_high_votes: bool) -> f64 {
    let inverse = 1.0 / (1.0 + f64::from(votes));
    if prefer_high_votes { 1.0 - inverse } else { inverse }
}

pub fn instability_score(stability: f64, prefer_stable: bool) -> f64 {
    if prefer_stable { stability } else { 1.0 - stability }
}

/// Factor scores of one candidate under one side's preferences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorScores {
    pub recency: f64,
    pub low_votes: f64,
    pub instability: f64,
    pub tier_size: f64,
}

impl FactorScores {
    pub fn of(candidate: &Candidate, weights: &WeightSet) -> Self {
        FactorScores {
            recency: candidate.recency_score,
            low_votes: low_votes_score(candidate.votes, weights.prefer_high_votes),
            instability: instability_score(candidate.stability, weights.prefer_stable),
            tier_size: candidate.tier_size_score,
        }
    }

    /// Weighted sum. `weights` should already be normalised.
    pub fn priority(&self, weights: &WeightSet) -> f64 {
        weights.recency * self.recency
            + weights.low_votes * self.low_votes
            + weights.instability * self.instability
            + weights.tier_size * self.tier_size
    }
}

/// Sampling weight of every candidate for one side: priority plus `floor`.
pub fn side_priorities(context: &RoundContext, weights: &WeightSet, floor: f64) -> Vec<f64> {
    let normalized = weights.normalized();
    context
        .candidates
        .iter()
        .map(|c| {
            let p = FactorScores::of(c, &normalized).priority(&normalized);
            log::trace!("candidate {} tier {:+} priority {:.4}", c.idx, c.tier, p);
            p + floor
        })
        .collect()
}
