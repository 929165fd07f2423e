/// In-memory table of per-item state.
///
/// Ids live in a dense vector with a hash index beside it, so lookups and
/// inserts are O(1) and iteration follows discovery order. Iteration order
/// matters: seeded selection is only reproducible if candidates are visited
/// in the same order every run.
use std::collections::{BTreeMap, HashMap};

use crate::error::RankError;
use crate::types::ItemStats;

#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    ids: Vec<String>,
    id_to_idx: HashMap<String, usize>,
    items: Vec<ItemStats>,
}

impl ItemStore {
    pub fn new() -> Self {
        ItemStore::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_idx.contains_key(id)
    }

    /// Adds a default item for a never-seen id. Returns `false` if the id exists.
    pub fn insert_if_absent(&mut self, id: &str) -> bool {
        if self.id_to_idx.contains_key(id) {
            return false;
        }
        self.push(id.to_string(), ItemStats::default());
        true
    }

    /// Inserts or replaces an item wholesale. Used when restoring state.
    pub(crate) fn insert(&mut self, id: String, stats: ItemStats) {
        match self.id_to_idx.get(&id) {
            Some(&idx) => self.items[idx] = stats,
            None => self.push(id, stats),
        }
    }

    fn push(&mut self, id: String, stats: ItemStats) {
        self.id_to_idx.insert(id.clone(), self.ids.len());
        self.ids.push(id);
        self.items.push(stats);
    }

    pub fn get(&self, id: &str) -> Option<&ItemStats> {
        self.id_to_idx.get(id).map(|&idx| &self.items[idx])
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut ItemStats> {
        match self.id_to_idx.get(id) {
            Some(&idx) => Some(&mut self.items[idx]),
            None => None,
        }
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.id_to_idx.get(id).copied()
    }

    pub fn id_at(&self, idx: usize) -> &str {
        &self.ids[idx]
    }

    pub fn stats_at(&self, idx: usize) -> &ItemStats {
        &self.items[idx]
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Items in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ItemStats)> {
        self.ids.iter().map(String::as_str).zip(self.items.iter())
    }

    /// Count of items per occupied tier.
    pub fn tier_population(&self) -> BTreeMap<i32, usize> {
        let mut population = BTreeMap::new();
        for stats in &self.items {
            *population.entry(stats.current_tier).or_insert(0) += 1;
        }
        population
    }

    /// Lowest and highest occupied tier, `None` when empty.
    pub fn tier_range(&self) -> Option<(i32, i32)> {
        let mut tiers = self.items.iter().map(|s| s.current_tier);
        let first = tiers.next()?;
        Some(tiers.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }

    /// First item that breaks an invariant, as `(id, reason)`.
    pub fn validate(&self) -> Result<(), (String, String)> {
        for (id, stats) in self.iter() {
            stats.check_invariants().map_err(|reason| (id.to_string(), reason))?;
        }
        Ok(())
    }

    /// Item invariants plus their agreement with a round clock of
    /// `round_index` votes: no vote after it, two participations per vote.
    pub fn validate_against(&self, round_index: u64) -> Result<(), RankError> {
        self.validate()
            .map_err(|(item, reason)| RankError::InvalidState { item, reason })?;
        if let Some((id, last)) = self
            .iter()
            .find_map(|(id, s)| s.last_voted().filter(|&r| r > round_index).map(|r| (id, r)))
        {
            return Err(RankError::InvalidState {
                item: id.to_string(),
                reason: format!("last voted in round {last}, after round index {round_index}"),
            });
        }
        let recorded: u64 = self.items.iter().map(|s| u64::from(s.votes())).sum();
        let expected = round_index.saturating_mul(2);
        if recorded != expected {
            return Err(RankError::VoteCountMismatch { recorded, expected });
        }
        Ok(())
    }
}
