use std::fmt;

use crate::constants::INITIAL_TIER;

/// Result of a single matchup from one participant's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Outcome {
    Win,
    Loss,
}

/// One entry of an item's matchup history.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchupRecord {
    pub opponent: String,
    pub outcome: Outcome,
    /// Global round index at which the vote was cast (1-based).
    pub round: u64,
}

/// Presentation slot. Each side is scored with its own weight set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Per-item ranking state.
///
/// Fields are read-only outside the crate: the vote processor is the only
/// writer, which keeps `current_tier == tier_history.last()` and
/// `votes == wins + losses == matchup_history.len()` true by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStats {
    pub(crate) current_tier: i32,
    pub(crate) tier_history: Vec<i32>,
    pub(crate) votes: u32,
    pub(crate) wins: u32,
    pub(crate) losses: u32,
    pub(crate) last_voted: Option<u64>,
    pub(crate) matchup_history: Vec<MatchupRecord>,
}

impl Default for ItemStats {
    fn default() -> Self {
        ItemStats {
            current_tier: INITIAL_TIER,
            tier_history: vec![INITIAL_TIER],
            votes: 0,
            wins: 0,
            losses: 0,
            last_voted: None,
            matchup_history: Vec::new(),
        }
    }
}

impl ItemStats {
    pub fn current_tier(&self) -> i32 {
        self.current_tier
    }

    pub fn tier_history(&self) -> &[i32] {
        &self.tier_history
    }

    pub fn votes(&self) -> u32 {
        self.votes
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    /// Round of the most recent vote, `None` if never voted.
    pub fn last_voted(&self) -> Option<u64> {
        self.last_voted
    }

    pub fn matchup_history(&self) -> &[MatchupRecord] {
        &self.matchup_history
    }

    pub fn is_new(&self) -> bool {
        self.votes == 0
    }

    /// Fraction of votes won; 0.0 for a never-voted item.
    pub fn win_rate(&self) -> f64 {
        if self.votes == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(self.votes)
        }
    }

    /// Checks the item invariants, returning the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        match self.tier_history.last() {
            None => return Err("tier history is empty".to_string()),
            Some(&last) if last != self.current_tier => {
                return Err(format!(
                    "current tier {} does not match last history entry {}",
                    self.current_tier, last
                ));
            }
            Some(_) => {}
        }
        if self.wins.checked_add(self.losses) != Some(self.votes) {
            return Err(format!(
                "votes {} != wins {} + losses {}",
                self.votes, self.wins, self.losses
            ));
        }
        if self.matchup_history.len() != self.votes as usize {
            return Err(format!(
                "votes {} != matchup history length {}",
                self.votes,
                self.matchup_history.len()
            ));
        }
        if self.tier_history.len() != self.votes as usize + 1 {
            return Err(format!(
                "tier history has {} entries, expected votes + 1 = {}",
                self.tier_history.len(),
                u64::from(self.votes) + 1
            ));
        }
        if self.votes > 0 && self.last_voted.is_none() {
            return Err("voted item has no last_voted round".to_string());
        }
        Ok(())
    }

    /// Builds an item whose tier walked through `history` (first entry is the
    /// starting tier). Each step up counts as a win, anything else as a loss.
    #[cfg(test)]
    pub(crate) fn with_history(history: &[i32]) -> Self {
        assert!(!history.is_empty(), "history needs at least the starting tier");
        let mut stats = ItemStats {
            current_tier: history[history.len() - 1],
            tier_history: history.to_vec(),
            ..ItemStats::default()
        };
        for (round, pair) in history.windows(2).enumerate() {
            let outcome = if pair[1] > pair[0] { Outcome::Win } else { Outcome::Loss };
            match outcome {
                Outcome::Win => stats.wins += 1,
                Outcome::Loss => stats.losses += 1,
            }
            stats.votes += 1;
            stats.last_voted = Some(round as u64 + 1);
            stats.matchup_history.push(MatchupRecord {
                opponent: "fixture".to_string(),
                outcome,
                round: round as u64 + 1,
            });
        }
        stats
    }
}

/// Owned, export-friendly view of one item with its derived statistics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemSnapshot {
    pub id: String,
    pub tier: i32,
    pub votes: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    /// Sample standard deviation of the tier history.
    pub tier_deviation: f64,
    pub stability: f64,
    pub confidence: f64,
    pub last_voted: Option<u64>,
    pub tier_history: Vec<i32>,
    pub matchup_history: Vec<MatchupRecord>,
}

/// Why a pair was chosen.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectionReason {
    /// Left item has never been voted on. `opponent_tier` is `None` when the
    /// right item is new as well.
    Introduction { opponent_tier: Option<i32> },
    /// Both items come from the neighbourhood of an overflowing tier; the left
    /// item is the less confident one.
    OverflowAnchor { tier: i32, actual: usize, expected: f64 },
    /// Unconstrained weighted sampling.
    Weighted,
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionReason::Introduction { opponent_tier: None } => {
                f.write_str("both items are new, establishing initial placement")
            }
            SelectionReason::Introduction { opponent_tier: Some(tier) } => {
                write!(f, "introducing a new item against tier {tier:+}")
            }
            SelectionReason::OverflowAnchor { tier, actual, expected } => write!(
                f,
                "resolving over-populated tier {tier:+} ({actual} items, expected ~{expected:.1}), \
                 uncertain item on the left, confident anchor on the right"
            ),
            SelectionReason::Weighted => f.write_str("weighted selection across the collection"),
        }
    }
}

/// A pair ready for presentation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectedPair {
    pub left: String,
    pub right: String,
    pub reason: SelectionReason,
}

impl SelectedPair {
    pub fn id(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// Outcome of a selection round.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Pair(SelectedPair),
    /// Fewer than two items in the collection.
    NotEnoughItems { available: usize },
}

/// Sort keys for `RankingEngine::rankings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RankingMetric {
    /// Highest tier first.
    Tier,
    /// Most votes first.
    TotalVotes,
    /// Highest win rate first.
    WinRate,
    /// Most stable (lowest tier deviation) first.
    Stability,
    /// Longest since last vote first; never-voted items lead.
    Recency,
    /// Highest confidence first.
    Confidence,
}

impl RankingMetric {
    pub fn parse(value: &str) -> Option<RankingMetric> {
        match value {
            "tier" => Some(RankingMetric::Tier),
            "votes" | "total_votes" => Some(RankingMetric::TotalVotes),
            "win_rate" | "winrate" => Some(RankingMetric::WinRate),
            "stability" => Some(RankingMetric::Stability),
            "recency" => Some(RankingMetric::Recency),
            "confidence" => Some(RankingMetric::Confidence),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_item_is_new_at_tier_zero() {
        let stats = ItemStats::default();
        assert!(stats.is_new());
        assert_eq!(stats.current_tier(), 0);
        assert_eq!(stats.tier_history(), &[0]);
        assert_eq!(stats.last_voted(), None);
        assert!(stats.check_invariants().is_ok());
    }

    #[test]
    fn test_with_history_keeps_invariants() {
        let stats = ItemStats::with_history(&[0, 1, 2, 1, 2, 1]);
        assert_eq!(stats.current_tier(), 1);
        assert_eq!(stats.votes(), 5);
        assert_eq!(stats.wins(), 3);
        assert_eq!(stats.losses(), 2);
        assert!(stats.check_invariants().is_ok());
    }

    #[test]
    fn test_check_invariants_reports_tier_mismatch() {
        let mut stats = ItemStats::with_history(&[0, 1]);
        stats.current_tier = 4;
        let err = stats.check_invariants().unwrap_err();
        assert!(err.contains("does not match"), "{err}");
    }

    #[test]
    fn test_check_invariants_reports_short_tier_history() {
        let mut stats = ItemStats::with_history(&[0, 1, 2]);
        stats.tier_history = vec![2];
        let err = stats.check_invariants().unwrap_err();
        assert!(err.contains("tier history has 1 entries"), "{err}");
    }

    #[test]
    fn test_win_rate_never_voted_is_zero() {
        assert_eq!(ItemStats::default().win_rate(), 0.0);
        assert!((ItemStats::with_history(&[0, 1, 0, 1]).win_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ranking_metric_parse() {
        assert_eq!(RankingMetric::parse("votes"), Some(RankingMetric::TotalVotes));
        assert_eq!(RankingMetric::parse("stability"), Some(RankingMetric::Stability));
        assert_eq!(RankingMetric::parse("elo"), None);
    }
}
