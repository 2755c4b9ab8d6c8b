//! Batch driver: seats powers, plays games in parallel, folds statistics.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::analysis::{MatchupAnalyzer, SynergyAnalyzer};
use crate::error::StatsError;
use crate::rating::CumulativeStats;
use crate::sim::config::SimulationConfig;
use crate::sim::engine::MatchEngine;
use crate::stats::outcome::GameOutcome;
use crate::stats::record::normalize_power_id;
use crate::stats::statistics::Statistics;

/// Outcomes of one batch and their folded statistics.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Every outcome, in game-index order.
    pub outcomes: Vec<GameOutcome>,
    /// Statistics over `outcomes`.
    pub statistics: Statistics,
    /// Base seed the batch ran with.
    pub seed: u64,
    /// Wall-clock time spent playing and folding.
    pub elapsed: Duration,
}

impl BatchResult {
    /// Feed every outcome to the persistent and pairwise sinks, in game
    /// order, and count the batch as one simulation run.
    ///
    /// Returns the number of non-errored games given to the pairwise sinks.
    pub fn record_into(
        &self,
        cumulative: &mut CumulativeStats,
        matchups: &mut MatchupAnalyzer,
        synergies: &mut SynergyAnalyzer,
    ) -> Result<usize, StatsError> {
        cumulative.start_run();
        let mut recorded = 0;
        for outcome in &self.outcomes {
            cumulative.record_game(outcome)?;
            let counted = matchups.record_outcome(outcome)?;
            synergies.record_outcome(outcome)?;
            if counted {
                recorded += 1;
            }
        }
        debug!(
            "recorded {} outcomes ({} completed) into cumulative stats",
            self.outcomes.len(),
            recorded
        );
        Ok(recorded)
    }

    /// Games per second.
    pub fn games_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.outcomes.len() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Plays batches of games with a [`MatchEngine`] over a pool of powers.
#[derive(Debug)]
pub struct SimulationRunner<E: MatchEngine> {
    engine: E,
    pool: Vec<String>,
    config: SimulationConfig,
}

impl<E: MatchEngine> SimulationRunner<E> {
    /// Create a runner. Duplicate pool entries (case-insensitive) are dropped.
    pub fn new<S: AsRef<str>>(
        engine: E,
        pool: &[S],
        config: SimulationConfig,
    ) -> Result<Self, StatsError> {
        config.validate()?;

        let mut seen = Vec::new();
        let mut powers = Vec::new();
        for p in pool {
            let name = p.as_ref().trim();
            let key = normalize_power_id(name);
            if name.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            powers.push(name.to_string());
        }

        if powers.len() < config.players_per_game {
            return Err(StatsError::InvalidConfig(format!(
                "pool has {} distinct powers but games seat {}",
                powers.len(),
                config.players_per_game
            )));
        }

        Ok(Self {
            engine,
            pool: powers,
            config,
        })
    }

    /// The power pool.
    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    /// The batch configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Play a batch with every table drawn at random from the pool.
    pub fn run(&self) -> Result<BatchResult, StatsError> {
        let seats = self.config.players_per_game;
        self.execute(|rng| self.pool.choose_multiple(rng, seats).cloned().collect())
    }

    /// Play a batch in which `a` and `b` sit at every table and the
    /// remaining seats are drawn from the rest of the pool.
    pub fn run_head_to_head(&self, a: &str, b: &str) -> Result<BatchResult, StatsError> {
        let (key_a, key_b) = (normalize_power_id(a), normalize_power_id(b));
        if key_a.is_empty() || key_b.is_empty() || key_a == key_b {
            return Err(StatsError::InvalidConfig(format!(
                "head-to-head needs two distinct powers, got '{a}' and '{b}'"
            )));
        }

        let fillers: Vec<String> = self
            .pool
            .iter()
            .filter(|p| {
                let key = normalize_power_id(p);
                key != key_a && key != key_b
            })
            .cloned()
            .collect();
        let open = self.config.players_per_game - 2;
        if fillers.len() < open {
            return Err(StatsError::InvalidConfig(format!(
                "{} filler powers available for {} open seats",
                fillers.len(),
                open
            )));
        }

        let (a, b) = (a.trim().to_string(), b.trim().to_string());
        self.execute(|rng| {
            let mut seats = Vec::with_capacity(open + 2);
            seats.push(a.clone());
            seats.push(b.clone());
            seats.extend(fillers.choose_multiple(rng, open).cloned());
            seats.shuffle(rng);
            seats
        })
    }

    fn execute<F>(&self, seat: F) -> Result<BatchResult, StatsError>
    where
        F: Fn(&mut StdRng) -> Vec<String> + Sync,
    {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let games = self.config.games;
        let progress = self.progress_bar(games as u64);
        let start = Instant::now();

        let play = || -> Result<(Vec<GameOutcome>, Statistics), StatsError> {
            let outcomes: Vec<GameOutcome> = (0..games)
                .into_par_iter()
                .map(|i| {
                    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                    let seats = seat(&mut rng);
                    let outcome = self.engine.play(&seats, &mut rng);
                    progress.inc(1);
                    outcome
                })
                .collect();

            let statistics = outcomes
                .par_iter()
                .try_fold(Statistics::new, |mut stats, outcome| {
                    stats.record_game(outcome)?;
                    Ok::<_, StatsError>(stats)
                })
                .try_reduce(Statistics::new, |mut left, right| {
                    left.merge(&right);
                    Ok(left)
                })?;

            Ok((outcomes, statistics))
        };

        let (outcomes, statistics) = match self.config.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| StatsError::InvalidConfig(e.to_string()))?
                .install(play)?,
            None => play()?,
        };

        progress.finish_and_clear();
        let elapsed = start.elapsed();
        info!(
            "played {} games (seed {}) in {:.2}s: {} errored, {} timed out",
            games,
            seed,
            elapsed.as_secs_f64(),
            statistics.error_count,
            statistics.timeout_count
        );

        Ok(BatchResult {
            outcomes,
            statistics,
            seed,
            elapsed,
        })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40}] {pos}/{len} games ({eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}
