//! Outcome ingestion and per-power statistics.
//!
//! This module turns match outcomes into per-power counters and derives
//! win rates, Wilson confidence intervals and significance tests from them.
//!
//! # Usage
//!
//! ```
//! use power_analytics::stats::{GameOutcome, Statistics};
//!
//! let mut stats = Statistics::new();
//! let outcome = GameOutcome::from_powers(&["Alpha", "Beta", "Gamma"]).with_winners([0]);
//! stats.record_game(&outcome).unwrap();
//!
//! assert_eq!(stats.win_rate("alpha"), Some(1.0));
//! let (lower, upper) = stats.record("Alpha").unwrap().confidence_interval(0.95);
//! assert!(lower < upper);
//! ```
//!
//! # Why Wilson
//!
//! Most powers are picked rarely and many sit near 0% or 100% win rate.
//! The normal approximation collapses to zero width at those extremes and
//! overshoots `[0, 1]` for small samples; the Wilson score interval does not.
//!
//! ```text
//! center = (p + z²/2n) / (1 + z²/n)
//! margin = z·sqrt(p(1−p)/n + z²/4n²) / (1 + z²/n)
//! ```

pub mod config;
pub mod outcome;
pub mod record;
pub mod statistics;

pub use config::AnalysisConfig;
pub use outcome::{AllianceStats, EncounterStats, GameOutcome, PlayerId};
pub use record::{
    confidence_interval, format_rate, is_supported_confidence, normalize_power_id, z_score,
    Direction, PowerRecord,
};
pub use statistics::{expected_win_rate, Statistics};
