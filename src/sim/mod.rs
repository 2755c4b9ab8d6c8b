//! Simulation driver.
//!
//! This is the boundary with the match engine. A [`MatchEngine`] produces
//! [`GameOutcome`](crate::stats::GameOutcome)s; the [`SimulationRunner`]
//! decides who sits at each table, plays batches in parallel and hands the
//! outcomes to the statistics sinks.
//!
//! ```text
//!  pool of powers ──► seating ──► engine.play() ──► GameOutcome
//!                    (random or       (rayon,          │
//!                     head-to-head)    seed + i)       ▼
//!                                           Statistics (try_fold / merge)
//!                                           CumulativeStats, matchups,
//!                                           synergies (record_into)
//! ```
//!
//! # Example
//!
//! ```
//! use power_analytics::sim::{SimulationConfig, SimulationRunner, SyntheticEngine};
//!
//! let engine = SyntheticEngine::new().with_strength("Alpha", 2.0);
//! let config = SimulationConfig::default().with_games(200).with_seed(1);
//! let runner = SimulationRunner::new(engine, &["Alpha", "Beta", "Gamma", "Delta", "Epsilon"], config)?;
//! let batch = runner.run()?;
//! assert_eq!(batch.statistics.total_games, 200);
//! # Ok::<(), power_analytics::StatsError>(())
//! ```

pub mod config;
pub mod engine;
pub mod runner;

pub use config::SimulationConfig;
pub use engine::{MatchEngine, SyntheticEngine};
pub use runner::{BatchResult, SimulationRunner};
