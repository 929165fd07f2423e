/// Tier every item starts in, and the centre of the target distribution.
pub const INITIAL_TIER: i32 = 0;

/// Standard deviation (in tiers) of the target normal distribution.
/// 1.5 keeps roughly 80% of a collection within tiers -2..=2.
pub const DEFAULT_TIER_SPREAD: f64 = 1.5;

/// Vote count at which the vote factor of confidence saturates at 1.0.
///
/// The factor grows as sqrt(votes / saturation): the first handful of votes
/// move confidence a lot, the 19th and 20th barely at all.
pub const DEFAULT_VOTE_SATURATION: f64 = 20.0;

/// A tier overflows once it holds at least this multiple of its expected population.
pub const DEFAULT_OVERFLOW_THRESHOLD: f64 = 1.0;

/// Tiers with fewer items than this are never flagged, whatever the ratio says.
pub const DEFAULT_MIN_OVERFLOW_ITEMS: usize = 2;

/// Soft tier bound in standard deviations (3σ covers 99.7% of a normal population).
pub const DEFAULT_BOUNDS_MULTIPLIER: f64 = 3.0;

/// Confidence an item needs before it may move past the soft bound.
pub const DEFAULT_MIN_CONFIDENCE_TO_EXCEED: f64 = 0.8;

/// Votes an item needs before it may move past the soft bound.
pub const DEFAULT_MIN_VOTES_TO_EXCEED: u32 = 10;

/// Collection size up to which adaptive bounds are not widened.
/// Above it, the bound spread grows with log10(N) / 2.
pub const ADAPTIVE_BOUNDS_BASE_SIZE: usize = 100;

/// Probability that a round with overflowing tiers is spent inside the worst one.
/// The remainder falls through to unconstrained weighted sampling.
pub const DEFAULT_OVERFLOW_FOCUS: f64 = 0.8;

/// Additional tiers on each side of the focus tier that are drawn from.
pub const DEFAULT_OVERFLOW_NEIGHBOR_RADIUS: u32 = 0;

/// Added to every candidate's priority so nothing is starved by a zero score.
pub const DEFAULT_MIN_SELECTION_WEIGHT: f64 = 0.01;

/// Right-side redraws on collision before falling back to a uniform pick.
pub const DEFAULT_MAX_REDRAW_ATTEMPTS: usize = 8;

/// Cap on actual/expected when turning overflow into a tier-size score.
pub const TIER_SIZE_RATIO_CAP: f64 = 3.0;

/// Opponent id of matchup records rebuilt for a save that had no matchup history.
pub const UNRECORDED_OPPONENT: &str = "";

/// Version written into every `EngineState`.
/// 1: single shared `weights` map. 2: per-side weights and preferences.
pub const STATE_VERSION: u32 = 2;
