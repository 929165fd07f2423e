/// Ranking engine orchestrator.
///
/// Pure computation: no IO, no clocks. The caller shows the selected pair to
/// a human, then feeds the verdict back through `record_vote` or
/// `record_choice`. State crosses the process boundary as `EngineState`.
///
/// Items are identified by caller-provided string ids (typically file paths).
use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::confidence::{
    self, stability_from_deviation, tier_deviation, ConfidenceBreakdown, ConfidenceSummary,
};
use crate::config::{AlgorithmConfig, WeightSet};
use crate::distribution::{bounds_report, BoundsReport, TierDistribution};
use crate::error::RankError;
use crate::pairing::{select_pair, SelectorInput};
use crate::state::EngineState;
use crate::store::ItemStore;
use crate::types::{ItemSnapshot, ItemStats, RankingMetric, SelectedPair, Selection, Side};
use crate::vote::{apply_vote, VoteOutcome};

/// Collection-wide counters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectionSummary {
    pub total_items: usize,
    /// Votes cast so far (the round clock).
    pub total_votes: u64,
    /// Mean participations per item; every vote counts for two items.
    pub average_votes_per_item: f64,
    pub voted_items: usize,
    pub never_voted_items: usize,
    pub tier_population: BTreeMap<i32, usize>,
    pub confidence: ConfidenceSummary,
}

pub struct RankingEngine {
    store: ItemStore,

    /// Votes cast so far. Recency is measured against it.
    round_index: u64,

    config: AlgorithmConfig,
    left_weights: WeightSet,
    right_weights: WeightSet,

    rng: StdRng,

    /// Last pair handed out by `select_pair`.
    last_pair: Option<(String, String)>,
}

impl RankingEngine {
    /// Engine with an OS-seeded RNG. Config and weights are validated up front.
    pub fn new(
        config: AlgorithmConfig,
        left_weights: WeightSet,
        right_weights: WeightSet,
    ) -> Result<Self, RankError> {
        Self::build(config, left_weights, right_weights, StdRng::from_os_rng())
    }

    /// Engine whose pair selection is reproducible for a given seed.
    pub fn with_seed(
        config: AlgorithmConfig,
        left_weights: WeightSet,
        right_weights: WeightSet,
        seed: u64,
    ) -> Result<Self, RankError> {
        Self::build(config, left_weights, right_weights, StdRng::seed_from_u64(seed))
    }

    fn build(
        config: AlgorithmConfig,
        left_weights: WeightSet,
        right_weights: WeightSet,
        rng: StdRng,
    ) -> Result<Self, RankError> {
        config.validate()?;
        left_weights.validate()?;
        right_weights.validate()?;
        Ok(RankingEngine {
            store: ItemStore::new(),
            round_index: 0,
            config,
            left_weights,
            right_weights,
            rng,
            last_pair: None,
        })
    }

    /// Restores an engine from persisted state. The RNG is OS-seeded; call
    /// `reseed` for reproducible selection afterwards.
    pub fn from_state(state: EngineState) -> Result<Self, RankError> {
        state.check_version()?;
        let (left, right) = state.resolve_weights();
        let mut engine = Self::new(state.config.clone(), left, right)?;
        engine.store = state.restore_store()?;
        engine.round_index = state.round_index;
        log::info!(
            "restored {} items at round {} (state version {})",
            engine.store.len(),
            engine.round_index,
            state.version
        );
        Ok(engine)
    }

    pub fn to_state(&self) -> EngineState {
        EngineState::capture(
            &self.store,
            self.round_index,
            &self.left_weights,
            &self.right_weights,
            &self.config,
        )
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Adds every id not seen before at tier 0. Returns how many were new.
    pub fn seed_items<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added = ids
            .into_iter()
            .filter(|id| self.store.insert_if_absent(id.as_ref()))
            .count();
        if added > 0 {
            log::info!("seeded {added} new items ({} total)", self.store.len());
        }
        added
    }

    /// Picks the next pair to present.
    pub fn select_pair(&mut self) -> Result<Selection, RankError> {
        self.select_with(None)
    }

    /// Like `select_pair`, but only items in `available` may be shown.
    /// Ids the engine does not know are ignored, and `NotEnoughItems`
    /// counts the known available items only.
    pub fn select_pair_among<I, S>(&mut self, available: I) -> Result<Selection, RankError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mask = vec![false; self.store.len()];
        for id in available {
            if let Some(idx) = self.store.index_of(id.as_ref()) {
                mask[idx] = true;
            }
        }
        self.select_with(Some(&mask))
    }

    fn select_with(&mut self, available: Option<&[bool]>) -> Result<Selection, RankError> {
        let input = SelectorInput {
            store: &self.store,
            config: &self.config,
            left_weights: &self.left_weights,
            right_weights: &self.right_weights,
            round_index: self.round_index,
            previous_pair: self.last_pair.as_ref().map(|(a, b)| (a.as_str(), b.as_str())),
            available,
        };
        let selection = select_pair(&input, &mut self.rng)?;
        if let Selection::Pair(pair) = &selection {
            self.last_pair = Some((pair.left.clone(), pair.right.clone()));
        }
        Ok(selection)
    }

    pub fn record_vote(&mut self, winner: &str, loser: &str) -> Result<VoteOutcome, RankError> {
        apply_vote(&mut self.store, &mut self.round_index, winner, loser, &self.config)
    }

    /// Records a vote for the item shown on `winning_side` of `pair`.
    pub fn record_choice(
        &mut self,
        pair: &SelectedPair,
        winning_side: Side,
    ) -> Result<VoteOutcome, RankError> {
        self.record_vote(pair.id(winning_side), pair.id(winning_side.other()))
    }

    pub fn round_index(&self) -> u64 {
        self.round_index
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    pub fn weights(&self, side: Side) -> &WeightSet {
        match side {
            Side::Left => &self.left_weights,
            Side::Right => &self.right_weights,
        }
    }

    pub fn set_weights(&mut self, side: Side, weights: WeightSet) -> Result<(), RankError> {
        weights.validate()?;
        match side {
            Side::Left => self.left_weights = weights,
            Side::Right => self.right_weights = weights,
        }
        Ok(())
    }

    pub fn snapshot(&self, id: &str) -> Option<ItemSnapshot> {
        self.store
            .get(id)
            .map(|stats| make_snapshot(id, stats, self.config.vote_saturation))
    }

    /// Every item, in discovery order.
    pub fn snapshots(&self) -> Vec<ItemSnapshot> {
        self.store
            .iter()
            .map(|(id, stats)| make_snapshot(id, stats, self.config.vote_saturation))
            .collect()
    }

    pub fn tier_population(&self) -> BTreeMap<i32, usize> {
        self.store.tier_population()
    }

    pub fn distribution(&self) -> Result<TierDistribution, RankError> {
        TierDistribution::analyze(&self.store, &self.config)
    }

    pub fn bounds_report(&self) -> BoundsReport {
        bounds_report(&self.store, &self.config)
    }

    pub fn confidence_breakdown(&self, id: &str) -> Option<ConfidenceBreakdown> {
        self.store
            .get(id)
            .map(|stats| ConfidenceBreakdown::of(stats, self.config.vote_saturation))
    }

    /// The `count` least confident items, least confident first.
    pub fn lowest_confidence(&self, count: usize) -> Vec<(String, f64)> {
        confidence::lowest_confidence(self.store.iter(), count, self.config.vote_saturation)
            .into_iter()
            .map(|(id, c)| (id.to_string(), c))
            .collect()
    }

    /// The `count` most confident items, most confident first.
    pub fn highest_confidence(&self, count: usize) -> Vec<(String, f64)> {
        confidence::highest_confidence(self.store.iter(), count, self.config.vote_saturation)
            .into_iter()
            .map(|(id, c)| (id.to_string(), c))
            .collect()
    }

    /// Snapshots sorted by `metric`, best first. Ties keep discovery order.
    pub fn rankings(&self, metric: RankingMetric) -> Vec<ItemSnapshot> {
        let mut snapshots = self.snapshots();
        match metric {
            RankingMetric::Tier => snapshots.sort_by(|a, b| {
                b.tier.cmp(&a.tier).then(b.confidence.total_cmp(&a.confidence))
            }),
            RankingMetric::TotalVotes => snapshots.sort_by(|a, b| b.votes.cmp(&a.votes)),
            RankingMetric::WinRate => snapshots.sort_by(|a, b| {
                b.win_rate.total_cmp(&a.win_rate).then(b.votes.cmp(&a.votes))
            }),
            RankingMetric::Stability => {
                snapshots.sort_by(|a, b| b.stability.total_cmp(&a.stability))
            }
            // None sorts before Some, so never-voted items lead.
            RankingMetric::Recency => snapshots.sort_by(|a, b| a.last_voted.cmp(&b.last_voted)),
            RankingMetric::Confidence => {
                snapshots.sort_by(|a, b| b.confidence.total_cmp(&a.confidence))
            }
        }
        snapshots
    }

    pub fn summary(&self) -> CollectionSummary {
        let total_items = self.store.len();
        let participations: u64 = self.store.iter().map(|(_, s)| u64::from(s.votes())).sum();
        let voted_items = self.store.iter().filter(|(_, s)| !s.is_new()).count();
        let confidences: Vec<f64> = self
            .store
            .iter()
            .map(|(_, s)| confidence::confidence(s, self.config.vote_saturation))
            .collect();
        CollectionSummary {
            total_items,
            total_votes: self.round_index,
            average_votes_per_item: if total_items == 0 {
                0.0
            } else {
                participations as f64 / total_items as f64
            },
            voted_items,
            never_voted_items: total_items - voted_items,
            tier_population: self.store.tier_population(),
            confidence: ConfidenceSummary::from_values(&confidences),
        }
    }

    /// Checks every item invariant and the round clock.
    pub fn validate(&self) -> Result<(), RankError> {
        self.store.validate_against(self.round_index)
    }
}

fn make_snapshot(id: &str, stats: &ItemStats, vote_saturation: f64) -> ItemSnapshot {
    let deviation = tier_deviation(stats.tier_history());
    ItemSnapshot {
        id: id.to_string(),
        tier: stats.current_tier(),
        votes: stats.votes(),
        wins: stats.wins(),
        losses: stats.losses(),
        win_rate: stats.win_rate(),
        tier_deviation: deviation,
        stability: stability_from_deviation(deviation),
        confidence: confidence::confidence(stats, vote_saturation),
        last_voted: stats.last_voted(),
        tier_history: stats.tier_history().to_vec(),
        matchup_history: stats.matchup_history().to_vec(),
    }
}
