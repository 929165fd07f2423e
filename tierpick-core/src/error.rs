//! Error type for the ranking engine.
//!
//! Only caller defects and internal inconsistencies are errors. A collection
//! too small to pair is an ordinary result (`Selection::NotEnoughItems`).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankError {
    /// An id that was never seeded into the store.
    #[error("unknown item id: {0}")]
    UnknownItem(String),

    /// Winner and loser are the same item.
    #[error("an item cannot be voted against itself: {0}")]
    SelfMatchup(String),

    /// A configuration value outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Restored state breaks an item invariant.
    #[error("invalid state for item {item}: {reason}")]
    InvalidState { item: String, reason: String },

    /// Per-item vote counts disagree with the round clock. Every vote counts
    /// once for each of its two items.
    #[error("item vote counts sum to {recorded}, expected {expected}")]
    VoteCountMismatch { recorded: u64, expected: u64 },

    #[error("state version {found} is newer than the newest supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The engine reached a state its own invariants rule out.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}
