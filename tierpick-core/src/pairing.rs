/// Pair selection.
///
/// Each round picks a left and a right item through one of three paths:
///   1. Introduction: a never-voted item on the left against an item from the
///      tier closest to 0 on the right.
///   2. Overflow anchoring: both items from the most overflowing tier, the
///      less confident one on the left, a confident anchor on the right.
///   3. Weighted: each side samples the whole collection with its own weights.
///
/// When the caller passes an availability mask, only the marked items are
/// eligible on either side. The tier distribution still counts every item.
///
/// All draws are cumulative-weight samples over a priority-sorted candidate
/// list, so a fixed RNG seed reproduces the same pairs.
use rand::Rng;

use crate::config::{AlgorithmConfig, AnchorPolicy, WeightSet};
use crate::distribution::TierDistribution;
use crate::error::RankError;
use crate::scoring::{side_priorities, Candidate, RoundContext};
use crate::store::ItemStore;
use crate::types::{SelectedPair, Selection, SelectionReason};

/// Everything the selector reads. Borrowed immutably for the whole round.
pub struct SelectorInput<'a> {
    pub store: &'a ItemStore,
    pub config: &'a AlgorithmConfig,
    pub left_weights: &'a WeightSet,
    pub right_weights: &'a WeightSet,
    pub round_index: u64,
    /// Pair shown last round; not repeated while an alternative exists.
    pub previous_pair: Option<(&'a str, &'a str)>,
    /// Per store position, whether the item may be shown. `None` means all.
    pub available: Option<&'a [bool]>,
}

struct Round<'a> {
    config: &'a AlgorithmConfig,
    context: RoundContext,
    left_priorities: Vec<f64>,
    right_priorities: Vec<f64>,
    previous: Option<(usize, usize)>,
    /// Store positions that may be picked, in store order.
    eligible: Vec<usize>,
}

impl Round<'_> {
    fn candidate(&self, idx: usize) -> &Candidate {
        &self.context.candidates[idx]
    }

    /// Partner of `left` in the previous pair, if `left` was in it.
    fn avoid_for(&self, left: usize) -> Option<usize> {
        match self.previous {
            Some((a, b)) if a == left => Some(b),
            Some((a, b)) if b == left => Some(a),
            _ => None,
        }
    }
}

pub fn select_pair(input: &SelectorInput<'_>, rng: &mut impl Rng) -> Result<Selection, RankError> {
    let store = input.store;
    let eligible: Vec<usize> = match input.available {
        Some(mask) => (0..store.len()).filter(|&i| mask.get(i).copied().unwrap_or(false)).collect(),
        None => (0..store.len()).collect(),
    };
    if eligible.len() < 2 {
        return Ok(Selection::NotEnoughItems { available: eligible.len() });
    }

    let distribution = TierDistribution::analyze(store, input.config)?;
    let context = RoundContext::build(
        store,
        &distribution,
        input.round_index,
        input.config.vote_saturation,
    );
    let floor = input.config.min_selection_weight;
    let round = Round {
        config: input.config,
        left_priorities: side_priorities(&context, input.left_weights, floor),
        right_priorities: side_priorities(&context, input.right_weights, floor),
        context,
        previous: input
            .previous_pair
            .and_then(|(a, b)| Some((store.index_of(a)?, store.index_of(b)?))),
        eligible,
    };

    let (left, right, reason) = choose(&round, &distribution, rng)?;
    if left == right {
        return Err(RankError::Internal(format!(
            "selector produced the same item on both sides: {}",
            store.id_at(left)
        )));
    }

    let pair = SelectedPair {
        left: store.id_at(left).to_string(),
        right: store.id_at(right).to_string(),
        reason,
    };
    log::debug!("selected {} vs {}: {}", pair.left, pair.right, pair.reason);
    Ok(Selection::Pair(pair))
}

fn choose(
    round: &Round<'_>,
    distribution: &TierDistribution,
    rng: &mut impl Rng,
) -> Result<(usize, usize, SelectionReason), RankError> {
    let (new, voted): (Vec<usize>, Vec<usize>) = round
        .eligible
        .iter()
        .copied()
        .partition(|&idx| round.candidate(idx).is_new());

    if !new.is_empty() {
        return introduce(round, &new, &voted, rng);
    }

    if let Some(row) = distribution.most_overflowing() {
        if rng.random::<f64>() < round.config.overflow_focus {
            if let Some((left, right)) = anchor_in_tier(round, row.tier, rng) {
                let reason = SelectionReason::OverflowAnchor {
                    tier: row.tier,
                    actual: row.actual,
                    expected: row.expected,
                };
                return Ok((left, right, reason));
            }
        }
    }

    let all = &round.eligible;
    let left = weighted_draw(all, &round.left_priorities, rng)
        .ok_or_else(|| RankError::Internal("no left candidate in a non-empty collection".into()))?;
    let right = draw_right(round, all, left, rng)
        .ok_or_else(|| RankError::Internal("no right candidate distinct from left".into()))?;
    Ok((left, right, SelectionReason::Weighted))
}

fn introduce(
    round: &Round<'_>,
    new: &[usize],
    voted: &[usize],
    rng: &mut impl Rng,
) -> Result<(usize, usize, SelectionReason), RankError> {
    let left = weighted_draw(new, &round.left_priorities, rng)
        .ok_or_else(|| RankError::Internal("empty never-voted pool".into()))?;

    let closest = voted.iter().map(|&idx| round.candidate(idx).tier.unsigned_abs()).min();
    let (pool, opponent_is_voted): (Vec<usize>, bool) = match closest {
        Some(distance) => (
            voted
                .iter()
                .copied()
                .filter(|&idx| round.candidate(idx).tier.unsigned_abs() == distance)
                .collect(),
            true,
        ),
        None => (new.to_vec(), false),
    };

    let right = draw_right(round, &pool, left, rng)
        .ok_or_else(|| RankError::Internal("no opponent for a new item".into()))?;
    let opponent_tier = opponent_is_voted.then(|| round.candidate(right).tier);
    Ok((left, right, SelectionReason::Introduction { opponent_tier }))
}

/// Uncertain-vs-anchor pair from `tier`, widened to neighbours until at
/// least two candidates exist. `None` if the whole range has fewer than two.
fn anchor_in_tier(round: &Round<'_>, tier: i32, rng: &mut impl Rng) -> Option<(usize, usize)> {
    let candidates = &round.context.candidates;
    let max_radius = round
        .eligible
        .iter()
        .map(|&i| candidates[i].tier.abs_diff(tier))
        .max()
        .unwrap_or(0);

    let mut radius = round.config.overflow_neighbor_radius;
    let mut pool: Vec<usize> = Vec::new();
    loop {
        pool.clear();
        pool.extend(
            round
                .eligible
                .iter()
                .copied()
                .filter(|&i| candidates[i].tier.abs_diff(tier) <= radius),
        );
        if pool.len() >= 2 || radius >= max_radius {
            break;
        }
        radius += 1;
    }
    if pool.len() < 2 {
        return None;
    }

    // Least confident first; store order breaks ties.
    pool.sort_by(|&a, &b| {
        candidates[a].confidence.total_cmp(&candidates[b].confidence).then(a.cmp(&b))
    });

    match round.config.anchor_policy {
        AnchorPolicy::SplitHalves => {
            let split = pool.len().div_ceil(2);
            let (uncertain, confident) = pool.split_at(split);
            let left = weighted_draw(uncertain, &round.left_priorities, rng)?;
            let mut right = weighted_draw(confident, &round.right_priorities, rng)?;
            if round.avoid_for(left) == Some(right) {
                right = draw_right(round, confident, left, rng)?;
            }
            Some((left, right))
        }
        AnchorPolicy::Extremes => {
            let left = *pool.iter().min_by(|&&a, &&b| {
                candidates[a]
                    .confidence
                    .total_cmp(&candidates[b].confidence)
                    .then(round.left_priorities[b].total_cmp(&round.left_priorities[a]))
                    .then(a.cmp(&b))
            })?;
            let mut anchors: Vec<usize> = pool.iter().copied().filter(|&i| i != left).collect();
            anchors.sort_by(|&a, &b| {
                candidates[b]
                    .confidence
                    .total_cmp(&candidates[a].confidence)
                    .then(round.right_priorities[b].total_cmp(&round.right_priorities[a]))
                    .then(a.cmp(&b))
            });
            let avoid = round.avoid_for(left);
            let right = anchors
                .iter()
                .copied()
                .find(|&i| Some(i) != avoid)
                .or_else(|| anchors.first().copied())?;
            Some((left, right))
        }
    }
}

/// Right-side draw from `pool` that is distinct from `left`, and avoids
/// repeating the previous pair when it can. Weighted redraws first, then a
/// uniform pick over what remains.
fn draw_right(round: &Round<'_>, pool: &[usize], left: usize, rng: &mut impl Rng) -> Option<usize> {
    let avoid = round.avoid_for(left);
    for _ in 0..round.config.max_redraw_attempts {
        let pick = weighted_draw(pool, &round.right_priorities, rng)?;
        if pick != left && Some(pick) != avoid {
            return Some(pick);
        }
    }

    let fresh: Vec<usize> = pool
        .iter()
        .copied()
        .filter(|&i| i != left && Some(i) != avoid)
        .collect();
    let remaining = if fresh.is_empty() {
        pool.iter().copied().filter(|&i| i != left).collect()
    } else {
        fresh
    };
    if remaining.is_empty() {
        return None;
    }
    log::warn!(
        "right-side redraw exhausted {} attempts, picking uniformly among {} items",
        round.config.max_redraw_attempts,
        remaining.len()
    );
    Some(remaining[rng.random_range(0..remaining.len())])
}

/// Weighted pick from `pool`. Candidates are ordered by descending priority
/// (store order on ties) before the cumulative draw.
fn weighted_draw(pool: &[usize], priorities: &[f64], rng: &mut impl Rng) -> Option<usize> {
    if pool.is_empty() {
        return None;
    }
    let mut ranked: Vec<(usize, f64)> = pool
        .iter()
        .map(|&idx| (idx, priorities[idx].max(0.0)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let weights: Vec<f64> = ranked.iter().map(|&(_, w)| w).collect();
    let total_weight: f64 = weights.iter().sum();
    let pick = if total_weight > 0.0 && total_weight.is_finite() {
        weighted_random_select(&weights, total_weight, rng)
    } else {
        rng.random_range(0..ranked.len())
    };
    Some(ranked[pick].0)
}

fn weighted_random_select(weights: &[f64], total_weight: f64, rng: &mut impl Rng) -> usize {
    let mut r = rng.random::<f64>() * total_weight;
    for (j, &w) in weights.iter().enumerate() {
        r -= w;
        if r < 1e-10 {
            return j;
        }
    }
    weights.len() - 1
}
