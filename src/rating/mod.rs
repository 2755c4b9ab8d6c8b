//! Elo ratings and the persistent statistics that carry them.
//!
//! - [`elo`]: the stateless multiplayer Elo calculator and bounded ratings
//! - [`cumulative`]: statistics persisted across runs, with Elo per power
//!
//! # Rating update
//!
//! ```text
//! E(a, b)   = 1 / (1 + 10^((b − a) / 400))        exponent clamped to ±700
//! expected  = mean over opponents j of E(i, j)
//! actual    = 1 / |winners| if i won, else 0
//! delta     = K · (actual − expected)              K = 32
//! rating'   = clamp(rating + delta, 100, 2500)
//! ```
//!
//! The expectations of one game always sum to `n / 2` while the actual
//! scores sum to 1, so the deltas of an `n`-player game sum to
//! `K · (1 − n/2)`. Only two-player games are zero-sum. Larger games drain
//! rating points from the pool (−48 per five-player game at K = 32), and a
//! long run of them pushes every rating toward the 100 floor. Compare Elo
//! across powers that played the same mix of player counts, and use win
//! rates or [`BalanceAnalyzer`](crate::analysis::BalanceAnalyzer) tiers to
//! rank powers in multiplayer fields.

pub mod cumulative;
pub mod elo;

pub use cumulative::{CumulativeSnapshot, CumulativeStats, PowerSnapshot, PowerStanding};
pub use elo::{EloCalculator, EloRating, DEFAULT_ELO, MAX_ELO, MIN_ELO};
