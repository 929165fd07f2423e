/// Persistence boundary.
///
/// `EngineState` is a flat, versioned record of everything the engine needs
/// to resume: items, the round clock, both weight sets and the algorithm
/// settings. Every field is optional on input. Version 1 files carry a single
/// shared `weights` set, which is applied to both sides when the per-side sets
/// are missing.
///
/// Saves written before per-item histories existed are filled in on restore:
/// a missing tier history is replayed from the win/loss record, a missing
/// matchup history becomes one `UNRECORDED_OPPONENT` entry per vote, and a
/// missing `last_voted` is taken from the round clock. Fields that are present
/// must agree with each other.
use std::collections::HashSet;

use crate::config::{AlgorithmConfig, WeightSet};
use crate::constants::{INITIAL_TIER, STATE_VERSION, UNRECORDED_OPPONENT};
use crate::error::RankError;
use crate::store::ItemStore;
use crate::types::{ItemStats, MatchupRecord, Outcome};

/// One item as stored on disk.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PersistedItem {
    pub id: String,
    pub current_tier: i32,
    /// `None` only when read from a save that predates it.
    pub tier_history: Option<Vec<i32>>,
    pub votes: u32,
    pub wins: u32,
    pub losses: u32,
    pub last_voted: Option<u64>,
    /// `None` only when read from a save that predates it.
    pub matchup_history: Option<Vec<MatchupRecord>>,
}

impl PersistedItem {
    pub fn from_stats(id: &str, stats: &ItemStats) -> Self {
        PersistedItem {
            id: id.to_string(),
            current_tier: stats.current_tier(),
            tier_history: Some(stats.tier_history().to_vec()),
            votes: stats.votes(),
            wins: stats.wins(),
            losses: stats.losses(),
            last_voted: stats.last_voted(),
            matchup_history: Some(stats.matchup_history().to_vec()),
        }
    }

    /// Converts back into store form, filling fields an older save lacks.
    /// `round_index` is the saved round clock. Fails on a broken item invariant.
    pub fn into_stats(self, round_index: u64) -> Result<(String, ItemStats), RankError> {
        let PersistedItem {
            id,
            current_tier,
            tier_history,
            votes,
            wins,
            losses,
            last_voted,
            matchup_history,
        } = self;
        let last_voted = match last_voted {
            None if votes > 0 => Some(round_index),
            other => other,
        };
        let stats = ItemStats {
            current_tier,
            tier_history: tier_history.unwrap_or_else(|| replay_tiers(wins, losses, current_tier)),
            votes,
            wins,
            losses,
            last_voted,
            matchup_history: matchup_history
                .unwrap_or_else(|| unrecorded_matchups(wins, losses, last_voted.unwrap_or(round_index))),
        };
        match stats.check_invariants() {
            Ok(()) => Ok((id, stats)),
            Err(reason) => Err(RankError::InvalidState { item: id, reason }),
        }
    }
}

/// Tier walk from the initial tier: every win, then every loss, with the
/// final entry pinned to the saved tier.
fn replay_tiers(wins: u32, losses: u32, current_tier: i32) -> Vec<i32> {
    let mut history = Vec::with_capacity(wins as usize + losses as usize + 1);
    let mut tier = INITIAL_TIER;
    history.push(tier);
    let steps = std::iter::repeat(1)
        .take(wins as usize)
        .chain(std::iter::repeat(-1).take(losses as usize));
    for step in steps {
        tier = tier.saturating_add(step);
        history.push(tier);
    }
    if let Some(last) = history.last_mut() {
        *last = current_tier;
    }
    history
}

fn unrecorded_matchups(wins: u32, losses: u32, round: u64) -> Vec<MatchupRecord> {
    let record = |outcome| MatchupRecord { opponent: UNRECORDED_OPPONENT.to_string(), outcome, round };
    std::iter::repeat(Outcome::Win)
        .take(wins as usize)
        .chain(std::iter::repeat(Outcome::Loss).take(losses as usize))
        .map(record)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineState {
    pub version: u32,
    /// Total votes cast.
    pub round_index: u64,
    pub items: Vec<PersistedItem>,
    pub left_weights: Option<WeightSet>,
    pub right_weights: Option<WeightSet>,
    /// Version 1 shared weights.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub weights: Option<WeightSet>,
    pub config: AlgorithmConfig,
}

impl Default for EngineState {
    fn default() -> Self {
        EngineState {
            version: STATE_VERSION,
            round_index: 0,
            items: Vec::new(),
            left_weights: None,
            right_weights: None,
            weights: None,
            config: AlgorithmConfig::default(),
        }
    }
}

impl EngineState {
    pub fn check_version(&self) -> Result<(), RankError> {
        if self.version > STATE_VERSION {
            return Err(RankError::UnsupportedVersion {
                found: self.version,
                supported: STATE_VERSION,
            });
        }
        Ok(())
    }

    /// Effective `(left, right)` weights: per-side sets, else the legacy
    /// shared set, else the side defaults.
    pub fn resolve_weights(&self) -> (WeightSet, WeightSet) {
        let left = self
            .left_weights
            .clone()
            .or_else(|| self.weights.clone())
            .unwrap_or_else(WeightSet::default_left);
        let right = self
            .right_weights
            .clone()
            .or_else(|| self.weights.clone())
            .unwrap_or_else(WeightSet::default_right);
        (left, right)
    }

    /// Rebuilds the item store, rejecting duplicates, broken invariants and
    /// vote counts that disagree with the saved round clock.
    pub fn restore_store(&self) -> Result<ItemStore, RankError> {
        let mut store = ItemStore::new();
        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.insert(item.id.as_str()) {
                return Err(RankError::InvalidState {
                    item: item.id.clone(),
                    reason: "duplicate id".to_string(),
                });
            }
            let (id, stats) = item.clone().into_stats(self.round_index)?;
            store.insert(id, stats);
        }
        store.validate_against(self.round_index)?;
        Ok(store)
    }

    pub fn capture(
        store: &ItemStore,
        round_index: u64,
        left_weights: &WeightSet,
        right_weights: &WeightSet,
        config: &AlgorithmConfig,
    ) -> Self {
        EngineState {
            version: STATE_VERSION,
            round_index,
            items: store.iter().map(|(id, stats)| PersistedItem::from_stats(id, stats)).collect(),
            left_weights: Some(left_weights.clone()),
            right_weights: Some(right_weights.clone()),
            weights: None,
            config: config.clone(),
        }
    }
}
