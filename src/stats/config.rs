//! Configuration for the analyzers.
//!
//! This module provides the thresholds that control sample-size cutoffs,
//! confidence levels and the Elo K-factor.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::stats::record::is_supported_confidence;

/// Thresholds shared by the balance, matchup and synergy analyzers.
///
/// # Example
/// ```
/// use power_analytics::stats::AnalysisConfig;
///
/// let config = AnalysisConfig::default().with_min_games(50);
/// assert_eq!(config.min_games, 50);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum games before a power is ranked or tiered.
    ///
    /// Powers below this are reported as insufficient sample rather than
    /// assigned a tier.
    pub min_games: u64,

    /// Confidence level for Wilson intervals (0.90, 0.95 or 0.99).
    pub confidence: f64,

    /// Elo K-factor.
    pub elo_k_factor: f64,

    /// Expected combined win rate for an ally pair.
    ///
    /// Calibrated for two allies out of five players and not adjusted for
    /// the actual player count.
    pub synergy_baseline: f64,

    /// Games together before a synergy score is reported.
    pub synergy_min_games: u64,

    /// Head-to-head games before a matchup is ranked.
    pub matchup_min_games: u64,

    /// Minimum win-rate advantage for an opponent to count as a counter.
    pub counter_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_games: 100,
            confidence: 0.95,
            elo_k_factor: 32.0,
            synergy_baseline: 0.4,
            synergy_min_games: 10,
            matchup_min_games: 20,
            counter_threshold: 0.10,
        }
    }
}

impl AnalysisConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loose thresholds for small exploratory batches.
    pub fn exploratory() -> Self {
        Self {
            min_games: 10,
            matchup_min_games: 5,
            ..Default::default()
        }
    }

    /// Builder method: set the ranking threshold.
    pub fn with_min_games(mut self, min_games: u64) -> Self {
        self.min_games = min_games;
        self
    }

    /// Builder method: set the confidence level.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Builder method: set the Elo K-factor.
    pub fn with_k_factor(mut self, k: f64) -> Self {
        self.elo_k_factor = k;
        self
    }

    /// Builder method: set the minimum head-to-head sample.
    pub fn with_matchup_min_games(mut self, games: u64) -> Self {
        self.matchup_min_games = games;
        self
    }

    /// Builder method: set the counter threshold.
    pub fn with_counter_threshold(mut self, threshold: f64) -> Self {
        self.counter_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StatsError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, StatsError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), StatsError> {
        if !is_supported_confidence(self.confidence) {
            return Err(StatsError::InvalidConfig(format!(
                "confidence {} is not one of 0.90, 0.95 or 0.99",
                self.confidence
            )));
        }

        if !(self.elo_k_factor > 0.0) {
            return Err(StatsError::InvalidConfig(format!(
                "Elo K-factor {} must be positive",
                self.elo_k_factor
            )));
        }

        if !(0.0..=1.0).contains(&self.synergy_baseline) {
            return Err(StatsError::InvalidConfig(format!(
                "synergy baseline {} is out of range [0, 1]",
                self.synergy_baseline
            )));
        }

        if !(0.0..=1.0).contains(&self.counter_threshold) {
            return Err(StatsError::InvalidConfig(format!(
                "counter threshold {} is out of range [0, 1]",
                self.counter_threshold
            )));
        }

        Ok(())
    }
}
