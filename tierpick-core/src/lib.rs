/// tierpick-core: Pure-computation tier ranking engine.
///
/// Human pairwise votes → signed integer tiers with per-item confidence, and a
/// pair selector that spends each vote where it buys the most information.
/// No IO, no clocks, no UI. Bring your own presentation layer.
///
/// Items are identified by caller-provided string ids (file paths work well).
/// Each starts in tier 0; a win moves it up one tier, a loss down one, within
/// soft bounds that only confident items may pass. The selector keeps the
/// population close to a normal curve around tier 0 by pulling items out of
/// crowded tiers.
///
/// # Quick start
///
/// ```rust
/// use tierpick_core::{AlgorithmConfig, RankingEngine, Selection, Side, WeightSet};
///
/// let mut engine = RankingEngine::with_seed(
///     AlgorithmConfig::default(),
///     WeightSet::default_left(),
///     WeightSet::default_right(),
///     42,
/// )?;
/// engine.seed_items(["cat.png", "dog.png", "owl.png"]);
///
/// for _ in 0..10 {
///     let pair = match engine.select_pair()? {
///         Selection::Pair(pair) => pair,
///         Selection::NotEnoughItems { .. } => break,
///     };
///     println!("{} vs {} ({})", pair.left, pair.right, pair.reason);
///     // Ask a human; here the left image always wins.
///     engine.record_choice(&pair, Side::Left)?;
/// }
///
/// for item in engine.rankings(tierpick_core::RankingMetric::Tier) {
///     println!("{:+} {} (confidence {:.2})", item.tier, item.id, item.confidence);
/// }
/// # Ok::<(), tierpick_core::RankError>(())
/// ```

pub mod confidence;
pub mod config;
pub mod constants;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod pairing;
pub mod scoring;
pub mod state;
pub mod store;
pub mod types;
pub mod vote;

// Re-export primary public API at crate root.
pub use confidence::{ConfidenceBreakdown, ConfidenceSummary};
pub use config::{AlgorithmConfig, AnchorPolicy, BoundsConfig, Factor, WeightSet};
pub use distribution::{BoundsReport, TierBounds, TierDistribution, TierRow};
pub use engine::{CollectionSummary, RankingEngine};
pub use error::RankError;
pub use state::{EngineState, PersistedItem};
pub use store::ItemStore;
pub use types::{
    ItemSnapshot, ItemStats, MatchupRecord, Outcome, RankingMetric, SelectedPair, Selection,
    SelectionReason, Side,
};
pub use vote::{TierMove, VoteOutcome};
