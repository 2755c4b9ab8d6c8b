//! Error types for outcome ingestion, configuration and persistence.
//!
//! Derived statistics never fail: zero denominators resolve to defined
//! defaults. Only malformed input, invalid configuration and I/O surface as
//! errors.

use thiserror::Error;

use crate::stats::outcome::PlayerId;

/// A match outcome that cannot be ingested without corrupting counters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutcomeError {
    /// Fewer than two players were reported.
    #[error("outcome reports {0} players, at least 2 are required")]
    TooFewPlayers(usize),

    /// The power map does not have one entry per player.
    #[error("alien map has {actual} entries but the game has {expected} players")]
    PlayerCountMismatch {
        /// Reported `num_players`.
        expected: usize,
        /// Entries in the power map.
        actual: usize,
    },

    /// A completed game listed no winners.
    #[error("non-errored game has no winners")]
    NoWinners,

    /// A winner is not seated in the game.
    #[error("winner {0} is not present in the alien map")]
    UnknownWinner(PlayerId),

    /// The same player was listed as a winner twice.
    #[error("winner {0} is listed more than once")]
    DuplicateWinner(PlayerId),

    /// The outcome could not be decoded at all.
    #[error("outcome JSON is invalid: {0}")]
    Decode(String),
}

/// Top-level error for the analytics crate.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Ingestion-time validation failure.
    #[error("malformed outcome: {0}")]
    MalformedOutcome(#[from] OutcomeError),

    /// Reading or writing a snapshot failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot or export could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StatsError>;
