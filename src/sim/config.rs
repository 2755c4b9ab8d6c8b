//! Configuration for simulation batches.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StatsError;

/// Configuration for a [`SimulationRunner`](super::SimulationRunner) batch.
///
/// # Example
/// ```
/// use power_analytics::sim::SimulationConfig;
///
/// let config = SimulationConfig::default().with_games(500).with_seed(7);
/// assert_eq!(config.players_per_game, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Games per batch.
    pub games: usize,

    /// Seats per game.
    pub players_per_game: usize,

    /// Base seed. Game `i` is seeded with `seed + i`, so a batch is
    /// reproducible for a given seed whatever the thread count.
    ///
    /// `None` draws a fresh seed per batch.
    pub seed: Option<u64>,

    /// Worker threads. `None` uses the global rayon pool.
    pub threads: Option<usize>,

    /// Draw a progress bar on stderr.
    pub show_progress: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            games: 1000,
            players_per_game: 5,
            seed: None,
            threads: None,
            show_progress: false,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the number of games.
    pub fn with_games(mut self, games: usize) -> Self {
        self.games = games;
        self
    }

    /// Builder method: set the seats per game.
    pub fn with_players(mut self, players: usize) -> Self {
        self.players_per_game = players;
        self
    }

    /// Builder method: fix the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: use a dedicated pool of `threads` workers.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Builder method: toggle the progress bar.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StatsError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.players_per_game < 2 {
            return Err(StatsError::InvalidConfig(format!(
                "players_per_game must be at least 2, got {}",
                self.players_per_game
            )));
        }
        if self.threads == Some(0) {
            return Err(StatsError::InvalidConfig(
                "threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
