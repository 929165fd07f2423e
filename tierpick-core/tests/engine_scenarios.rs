use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tierpick_core::{
    AlgorithmConfig, EngineState, MatchupRecord, Outcome, PersistedItem, RankError,
    RankingEngine, Selection, SelectionReason, Side, WeightSet,
};

fn seeded_engine(seed: u64) -> RankingEngine {
    RankingEngine::with_seed(
        AlgorithmConfig::default(),
        WeightSet::default_left(),
        WeightSet::default_right(),
        seed,
    )
    .unwrap()
}

/// An item that walked straight from tier 0 to `tier`, one vote per step.
fn walked_to(id: &str, tier: i32) -> PersistedItem {
    let step = if tier >= 0 { 1 } else { -1 };
    let mut history = vec![0];
    while *history.last().unwrap() != tier {
        history.push(history.last().unwrap() + step);
    }
    if tier == 0 {
        history.extend([1, 0]);
    }
    let outcomes: Vec<Outcome> = history
        .windows(2)
        .map(|w| if w[1] > w[0] { Outcome::Win } else { Outcome::Loss })
        .collect();
    let votes = outcomes.len() as u32;
    let wins = outcomes.iter().filter(|o| **o == Outcome::Win).count() as u32;
    PersistedItem {
        id: id.to_string(),
        current_tier: tier,
        tier_history: Some(history),
        votes,
        wins,
        losses: votes - wins,
        last_voted: Some(u64::from(votes)),
        matchup_history: Some(
            outcomes
                .into_iter()
                .enumerate()
                .map(|(i, outcome)| MatchupRecord {
                    opponent: "seed".to_string(),
                    outcome,
                    round: i as u64 + 1,
                })
                .collect(),
        ),
    }
}

/// 56 items, 6 of them at +3 where about 2 are expected.
fn crowded_top_state() -> EngineState {
    let layout = [(-3, 2), (-2, 6), (-1, 11), (0, 14), (1, 11), (2, 6), (3, 6)];
    let items: Vec<PersistedItem> = layout
        .iter()
        .flat_map(|&(tier, count)| (0..count).map(move |i| walked_to(&format!("t{tier:+}_{i}"), tier)))
        .collect();
    let participations: u32 = items.iter().map(|item| item.votes).sum();
    EngineState { round_index: u64::from(participations / 2), items, ..EngineState::default() }
}

#[test]
fn fresh_collection_introduces_new_items_then_counts_the_vote() {
    let mut engine = seeded_engine(1);
    engine.seed_items(["a.png", "b.png", "c.png", "d.png", "e.png"]);

    let pair = match engine.select_pair().unwrap() {
        Selection::Pair(pair) => pair,
        other => panic!("expected a pair, got {other:?}"),
    };
    assert_ne!(pair.left, pair.right);
    assert_eq!(engine.snapshot(&pair.left).unwrap().votes, 0);
    assert_eq!(engine.snapshot(&pair.right).unwrap().votes, 0);
    assert!(matches!(pair.reason, SelectionReason::Introduction { opponent_tier: None }));

    engine.record_vote("a.png", "b.png").unwrap();
    let a = engine.snapshot("a.png").unwrap();
    let b = engine.snapshot("b.png").unwrap();
    assert_eq!((a.votes, a.wins, a.losses), (1, 1, 0));
    assert_eq!((b.votes, b.wins, b.losses), (1, 0, 1));
    assert_eq!(engine.round_index(), 1);
}

#[test]
fn single_item_cannot_be_paired() {
    let mut engine = seeded_engine(2);
    assert_eq!(engine.select_pair().unwrap(), Selection::NotEnoughItems { available: 0 });
    engine.seed_items(["only.png"]);
    assert_eq!(engine.select_pair().unwrap(), Selection::NotEnoughItems { available: 1 });
    assert_eq!(
        engine.record_vote("only.png", "only.png"),
        Err(RankError::SelfMatchup("only.png".to_string()))
    );
    assert_eq!(engine.round_index(), 0);
}

#[test]
fn invariants_hold_after_many_random_votes() {
    let mut engine = seeded_engine(3);
    engine.seed_items((0..20).map(|i| format!("img{i:02}.jpg")));
    let mut voter = StdRng::seed_from_u64(99);

    for _ in 0..500 {
        let pair = match engine.select_pair().unwrap() {
            Selection::Pair(pair) => pair,
            other => panic!("expected a pair, got {other:?}"),
        };
        assert_ne!(pair.left, pair.right);
        let side = if voter.random_bool(0.5) { Side::Left } else { Side::Right };
        engine.record_choice(&pair, side).unwrap();
    }

    assert!(engine.validate().is_ok());
    assert_eq!(engine.round_index(), 500);
    let snapshots = engine.snapshots();
    let participations: u32 = snapshots.iter().map(|s| s.votes).sum();
    assert_eq!(participations, 1_000);
    for s in &snapshots {
        assert_eq!(s.votes, s.wins + s.losses);
        assert_eq!(s.votes as usize, s.matchup_history.len());
        assert_eq!(Some(&s.tier), s.tier_history.last());
        assert!((0.0..=1.0).contains(&s.confidence));
        assert!(s.votes > 0, "{} was never shown", s.id);
    }
}

#[test]
fn same_seed_same_pairs() {
    let run = |seed: u64| {
        let mut engine = seeded_engine(seed);
        engine.seed_items((0..8).map(|i| format!("{i}.png")));
        let mut shown = Vec::new();
        for _ in 0..30 {
            if let Selection::Pair(pair) = engine.select_pair().unwrap() {
                engine.record_choice(&pair, Side::Left).unwrap();
                shown.push((pair.left, pair.right));
            }
        }
        shown
    };
    assert_eq!(run(11), run(11));
}

#[test]
fn crowded_tier_is_flagged_and_attracts_picks() {
    let mut engine = RankingEngine::from_state(crowded_top_state()).unwrap();
    engine.reseed(5);

    let distribution = engine.distribution().unwrap();
    assert_eq!(distribution.overflowing(), &[3]);
    let row = distribution.row(3).unwrap();
    assert_eq!(row.actual, 6);
    assert!((row.expected - 2.0).abs() < 0.1);

    let rounds = 200;
    let mut inside_top = 0;
    for _ in 0..rounds {
        let pair = match engine.select_pair().unwrap() {
            Selection::Pair(pair) => pair,
            other => panic!("expected a pair, got {other:?}"),
        };
        let left = engine.snapshot(&pair.left).unwrap().tier;
        let right = engine.snapshot(&pair.right).unwrap().tier;
        if left == 3 && right == 3 {
            inside_top += 1;
        }
    }
    // Six of 56 items; unbiased sampling would almost never pair two of them.
    assert!(inside_top >= rounds / 2, "only {inside_top} of {rounds} pairs came from tier +3");
}

#[test]
fn runaway_winner_is_held_at_the_soft_bound() {
    let mut engine = seeded_engine(4);
    let others = ["b", "c", "d", "e"];
    engine.seed_items(["champ"]);
    engine.seed_items(others);

    for i in 0..40 {
        engine.record_vote("champ", others[i % others.len()]).unwrap();
    }

    let champ = engine.snapshot("champ").unwrap();
    assert_eq!(champ.tier, 4);
    assert_eq!(champ.wins, 40);
    assert_eq!(champ.tier_history.len(), 41);
    for id in others {
        assert_eq!(engine.snapshot(id).unwrap().tier, -4);
    }

    let report = engine.bounds_report();
    assert_eq!(report.at_upper_bound, 1);
    assert_eq!(report.at_lower_bound, 4);
}

#[test]
fn snapshot_is_idempotent_without_votes() {
    let mut engine = seeded_engine(6);
    engine.seed_items(["a", "b", "c"]);
    engine.record_vote("a", "b").unwrap();
    assert_eq!(engine.snapshot("a"), engine.snapshot("a"));
    assert_eq!(engine.snapshots(), engine.snapshots());
    assert!(engine.snapshot("missing").is_none());
}

#[test]
fn state_survives_a_json_round_trip() {
    let mut engine = seeded_engine(7);
    engine.seed_items(["a", "b", "c", "d"]);
    engine.record_vote("a", "b").unwrap();
    engine.record_vote("c", "a").unwrap();
    engine.record_vote("d", "b").unwrap();

    let json = serde_json::to_string_pretty(&engine.to_state()).unwrap();
    let state: EngineState = serde_json::from_str(&json).unwrap();
    let restored = RankingEngine::from_state(state).unwrap();

    assert_eq!(restored.round_index(), 3);
    assert_eq!(restored.snapshots(), engine.snapshots());
    assert_eq!(restored.summary(), engine.summary());
}

#[test]
fn legacy_state_with_shared_weights_loads() {
    let json = r#"{
        "version": 1,
        "round_index": 0,
        "items": [{"id": "a.png"}, {"id": "b.png"}],
        "weights": {"recency": 1.0, "low_votes": 0.0, "instability": 0.0, "tier_size": 0.0}
    }"#;
    let state: EngineState = serde_json::from_str(json).unwrap();
    let engine = RankingEngine::from_state(state).unwrap();
    assert_eq!(engine.len(), 2);
    assert_eq!(engine.weights(Side::Left).recency, 1.0);
    assert_eq!(engine.weights(Side::Right), engine.weights(Side::Left));
}

#[test]
fn newer_state_version_is_rejected() {
    let state = EngineState { version: 99, ..EngineState::default() };
    assert!(matches!(
        RankingEngine::from_state(state),
        Err(RankError::UnsupportedVersion { found: 99, .. })
    ));
}

#[test]
fn save_without_matchup_history_loads() {
    let json = r#"{
        "version": 1,
        "round_index": 2,
        "items": [
            {"id": "a.png", "current_tier": 1, "tier_history": [0, 1], "votes": 1, "wins": 1, "losses": 0},
            {"id": "b.png", "current_tier": -1, "tier_history": [0, -1], "votes": 1, "wins": 0, "losses": 1},
            {"id": "c.png", "current_tier": 0, "votes": 2, "wins": 1, "losses": 1},
            {"id": "d.png"}
        ]
    }"#;
    let state: EngineState = serde_json::from_str(json).unwrap();
    let mut engine = RankingEngine::from_state(state).unwrap();
    assert!(engine.validate().is_ok());

    let a = engine.snapshot("a.png").unwrap();
    assert_eq!(a.last_voted, Some(2));
    assert_eq!(a.matchup_history.len(), 1);
    assert_eq!(a.matchup_history[0].outcome, Outcome::Win);

    // Replayed history keeps the spread of its wins and losses.
    let c = engine.snapshot("c.png").unwrap();
    assert_eq!(c.tier_history, vec![0, 1, 0]);
    assert!(c.stability < 1.0);

    assert!(engine.snapshot("d.png").unwrap().matchup_history.is_empty());

    engine.record_vote("d.png", "c.png").unwrap();
    assert_eq!(engine.round_index(), 3);
    assert!(engine.validate().is_ok());
}

#[test]
fn short_tier_history_is_rejected_on_restore() {
    let mut a = walked_to("a.png", 1);
    a.tier_history = Some(vec![1]);
    let state = EngineState {
        round_index: 1,
        items: vec![a, walked_to("b.png", -1)],
        ..EngineState::default()
    };
    match RankingEngine::from_state(state) {
        Err(RankError::InvalidState { item, reason }) => {
            assert_eq!(item, "a.png");
            assert!(reason.contains("tier history"), "{reason}");
        }
        other => panic!("expected InvalidState, got {:?}", other.map(|e| e.round_index())),
    }
}

#[test]
fn vote_total_must_match_round_clock() {
    let state = EngineState {
        round_index: 5,
        items: vec![walked_to("a.png", 1), walked_to("b.png", -1)],
        ..EngineState::default()
    };
    assert_eq!(
        RankingEngine::from_state(state).err(),
        Some(RankError::VoteCountMismatch { recorded: 2, expected: 10 })
    );
}

#[test]
fn items_missing_from_disk_are_never_shown() {
    let mut engine = seeded_engine(8);
    engine.seed_items(["gone.png", "here1.png", "here2.png", "here3.png"]);
    let on_disk = ["here1.png", "here2.png", "here3.png"];

    for _ in 0..50 {
        let pair = match engine.select_pair_among(on_disk).unwrap() {
            Selection::Pair(pair) => pair,
            other => panic!("expected a pair, got {other:?}"),
        };
        assert_ne!(pair.left, "gone.png");
        assert_ne!(pair.right, "gone.png");
        engine.record_choice(&pair, Side::Left).unwrap();
    }
    assert_eq!(engine.snapshot("gone.png").unwrap().votes, 0);

    assert_eq!(
        engine.select_pair_among(["here1.png", "unknown.png"]).unwrap(),
        Selection::NotEnoughItems { available: 1 }
    );
}
