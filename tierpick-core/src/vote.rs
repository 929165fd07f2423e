/// Vote processing.
///
/// A vote moves the winner up one tier and the loser down one, unless the
/// move would leave the soft bound and the item has not earned the right to
/// exceed it. Both checks use the statistics as they stood before the vote.
use crate::config::AlgorithmConfig;
use crate::distribution::{move_allowed, tier_bounds};
use crate::error::RankError;
use crate::store::ItemStore;
use crate::types::{ItemStats, MatchupRecord, Outcome};

/// Tier change of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierMove {
    pub from: i32,
    pub to: i32,
    /// The move was refused by the tier bound; `to == from`.
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoteOutcome {
    /// Round index assigned to this vote.
    pub round: u64,
    pub winner: TierMove,
    pub loser: TierMove,
}

fn plan_move(stats: &ItemStats, step: i32, allowed: impl Fn(&ItemStats, i32) -> bool) -> TierMove {
    let from = stats.current_tier();
    match from.checked_add(step) {
        Some(target) if allowed(stats, target) => TierMove { from, to: target, blocked: false },
        _ => TierMove { from, to: from, blocked: true },
    }
}

fn apply(stats: &mut ItemStats, tier_move: TierMove, opponent: &str, outcome: Outcome, round: u64) {
    stats.votes += 1;
    match outcome {
        Outcome::Win => stats.wins += 1,
        Outcome::Loss => stats.losses += 1,
    }
    stats.last_voted = Some(round);
    stats.matchup_history.push(MatchupRecord {
        opponent: opponent.to_string(),
        outcome,
        round,
    });
    stats.current_tier = tier_move.to;
    stats.tier_history.push(tier_move.to);
}

/// Records `winner` beating `loser` and advances `round_index`.
///
/// Nothing is written when an error is returned.
pub fn apply_vote(
    store: &mut ItemStore,
    round_index: &mut u64,
    winner: &str,
    loser: &str,
    config: &AlgorithmConfig,
) -> Result<VoteOutcome, RankError> {
    if winner == loser {
        return Err(RankError::SelfMatchup(winner.to_string()));
    }
    let winner_stats = store
        .get(winner)
        .ok_or_else(|| RankError::UnknownItem(winner.to_string()))?;
    let loser_stats = store
        .get(loser)
        .ok_or_else(|| RankError::UnknownItem(loser.to_string()))?;

    let bounds = tier_bounds(store.len(), config);
    let allowed = |stats: &ItemStats, target: i32| move_allowed(stats, target, bounds, config);
    let winner_move = plan_move(winner_stats, 1, allowed);
    let loser_move = plan_move(loser_stats, -1, allowed);

    let round = *round_index + 1;
    if let Some(stats) = store.get_mut(winner) {
        apply(stats, winner_move, loser, Outcome::Win, round);
    }
    if let Some(stats) = store.get_mut(loser) {
        apply(stats, loser_move, winner, Outcome::Loss, round);
    }
    *round_index = round;

    for (id, m) in [(winner, winner_move), (loser, loser_move)] {
        if m.blocked {
            log::debug!("round {round}: {id} held at tier {:+} by bound {bounds:?}", m.from);
        } else {
            log::debug!("round {round}: {id} tier {:+} -> {:+}", m.from, m.to);
        }
    }

    Ok(VoteOutcome { round, winner: winner_move, loser: loser_move })
}
