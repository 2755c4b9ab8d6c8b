//! # Power Analytics
//!
//! Offline statistics for simulated multiplayer matches between competing
//! "powers" (factions, strategies, decks). The crate is a pure sink: a match
//! engine reports one [`GameOutcome`] per game and everything here is
//! derived from those records.
//!
//! ## Features
//!
//! - **Per-run statistics**: win rates with Wilson score intervals and
//!   significance tests against the balanced expectation
//! - **Multiplayer Elo**: averaged pairwise expectations, shared wins split
//!   the point, ratings bounded to `[100, 2500]`
//! - **Persistence**: cumulative stats saved as a JSON snapshot across runs
//! - **Balance analysis**: tiers, composite performance score, balance
//!   score and Gini coefficient, whole-interval outlier detection
//! - **Pairwise analysis**: head-to-head matchups, ally synergies and counters
//! - **Parallel simulation driver**: rayon batches with reproducible seeds
//!
//! ## Quick Start
//!
//! ```
//! use power_analytics::{BalanceAnalyzer, CumulativeStats, GameOutcome};
//!
//! let mut stats = CumulativeStats::new();
//! for i in 0..150u32 {
//!     let outcome = GameOutcome::from_powers(&["Alpha", "Beta", "Gamma"])
//!         .with_winners([i % 3])
//!         .with_turns(20);
//!     stats.record_game(&outcome)?;
//! }
//!
//! let report = BalanceAnalyzer::new(&stats).analyze();
//! assert_eq!(report.powers.len(), 3);
//! # Ok::<(), power_analytics::StatsError>(())
//! ```
//!
//! ## Modules
//!
//! - [`stats`]: outcome records, per-power records, per-run statistics
//! - [`rating`]: Elo and the persistent cumulative statistics
//! - [`analysis`]: balance, matchup and synergy analyzers
//! - [`sim`]: match engine trait and the parallel batch runner
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────────────────────┐
//!                  │  MatchEngine (SyntheticEngine │
//!                  │  or an external game engine)  │
//!                  └──────────────┬───────────────┘
//!                                 │ GameOutcome
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//!   ┌────────────┐        ┌───────────────┐      ┌──────────────────┐
//!   │ Statistics │        │CumulativeStats│      │ Matchup/Synergy  │
//!   │  (per run) │        │  + Elo, JSON  │      │    analyzers     │
//!   └────────────┘        └───────┬───────┘      └──────────────────┘
//!                                 ▼
//!                         ┌───────────────┐
//!                         │BalanceAnalyzer│
//!                         └───────────────┘
//! ```

#![warn(missing_docs)]

/// Balance, matchup and synergy analysis.
pub mod analysis;

/// Error types.
pub mod error;

/// Elo ratings and persistent cumulative statistics.
pub mod rating;

/// Simulation driver and match engines.
pub mod sim;

/// Outcome records and per-run statistics.
pub mod stats;

pub use analysis::{BalanceAnalyzer, BalanceReport, MatchupAnalyzer, SynergyAnalyzer, Tier};
pub use error::{OutcomeError, StatsError};
pub use rating::{CumulativeStats, EloCalculator};
pub use sim::{MatchEngine, SimulationConfig, SimulationRunner, SyntheticEngine};
pub use stats::{AnalysisConfig, GameOutcome, PowerRecord, Statistics};
