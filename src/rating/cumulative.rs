//! Persistent statistics carried across simulation runs.
//!
//! [`CumulativeStats`] keeps the game-level counters and, per power, the
//! win counters plus an Elo rating. The lifecycle is load-or-create, then
//! `record_game` for every outcome, then `save`.
//!
//! # Persistence
//!
//! The on-disk format is a single pretty-printed JSON snapshot
//! ([`CumulativeSnapshot`]). Loading tolerates missing fields and falls back
//! to an empty instance when the file is missing or unreadable; saving
//! propagates every failure to the caller.
//!
//! # Merging
//!
//! Counters merge exactly. Elo cannot: the sequential game history is gone
//! once aggregated, so [`CumulativeStats::merge`] takes the games-weighted
//! average of the two ratings. This is an approximation and is kept as one.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::rating::elo::{EloCalculator, EloRating, DEFAULT_ELO};
use crate::stats::outcome::GameOutcome;
use crate::stats::record::{
    confidence_interval, merge_counts, merge_display_name, normalize_power_id, ratio,
};
use crate::stats::statistics::{csv_field, expected_win_rate, render, truncate};

/// Cumulative standing of one power.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerStanding {
    /// Display name (first-seen casing).
    pub name: String,
    /// Completed games this power was seated in.
    pub games_played: u64,
    /// Games won.
    pub games_won: u64,
    /// Wins with no co-winner.
    pub solo_wins: u64,
    /// Wins shared with other players.
    pub shared_wins: u64,
    /// Running mean of final colonies.
    pub avg_colonies: f64,
    /// Current rating and peak.
    pub elo: EloRating,
}

impl PowerStanding {
    fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            games_played: 0,
            games_won: 0,
            solo_wins: 0,
            shared_wins: 0,
            avg_colonies: 0.0,
            elo: EloRating::default(),
        }
    }

    /// Fraction of games won; 0 with no games.
    pub fn win_rate(&self) -> f64 {
        ratio(self.games_won, self.games_played)
    }

    /// Fraction of games won alone; 0 with no games.
    pub fn solo_rate(&self) -> f64 {
        ratio(self.solo_wins, self.games_played)
    }

    /// Current Elo rating.
    pub fn elo_rating(&self) -> f64 {
        self.elo.rating()
    }

    /// Highest Elo rating held.
    pub fn peak_elo(&self) -> f64 {
        self.elo.peak()
    }

    /// Wilson interval for the win rate.
    pub fn confidence_interval(&self, confidence: f64) -> (f64, f64) {
        confidence_interval(self.games_won, self.games_played, confidence)
    }

    fn record_colonies(&mut self, colonies: u32) {
        // games_played has already been incremented for this game
        let n = self.games_played.max(1) as f64;
        self.avg_colonies += (f64::from(colonies) - self.avg_colonies) / n;
    }

    fn merge(&mut self, other: &PowerStanding) {
        merge_display_name(&mut self.name, &other.name);
        let games = self.games_played + other.games_played;
        if games > 0 {
            let w_self = self.games_played as f64 / games as f64;
            let w_other = other.games_played as f64 / games as f64;
            let rating = self.elo.rating() * w_self + other.elo.rating() * w_other;
            let peak = self.elo.peak().max(other.elo.peak());
            self.elo = EloRating::with_peak(rating, peak);
            self.avg_colonies = self.avg_colonies * w_self + other.avg_colonies * w_other;
        } else {
            let rating = (self.elo.rating() + other.elo.rating()) / 2.0;
            self.elo = EloRating::with_peak(rating, self.elo.peak().max(other.elo.peak()));
        }
        self.games_played = games;
        self.games_won += other.games_won;
        self.solo_wins += other.solo_wins;
        self.shared_wins += other.shared_wins;
    }

    fn to_snapshot(&self) -> PowerSnapshot {
        PowerSnapshot {
            games_played: self.games_played,
            games_won: self.games_won,
            win_rate: self.win_rate() * 100.0,
            solo_wins: self.solo_wins,
            shared_wins: self.shared_wins,
            elo_rating: self.elo.rating(),
            peak_elo: self.elo.peak(),
            avg_colonies: self.avg_colonies,
        }
    }

    fn from_snapshot(name: &str, snap: &PowerSnapshot) -> Self {
        Self {
            name: name.trim().to_string(),
            games_played: snap.games_played,
            games_won: snap.games_won.min(snap.games_played),
            solo_wins: snap.solo_wins,
            shared_wins: snap.shared_wins,
            avg_colonies: snap.avg_colonies,
            elo: EloRating::with_peak(snap.elo_rating, snap.peak_elo),
        }
    }
}

/// Persisted per-power entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSnapshot {
    /// Completed games played.
    #[serde(default)]
    pub games_played: u64,
    /// Games won.
    #[serde(default)]
    pub games_won: u64,
    /// Win rate as a percentage (0–100). Recomputed on load.
    #[serde(default)]
    pub win_rate: f64,
    /// Solo wins.
    #[serde(default)]
    pub solo_wins: u64,
    /// Shared wins.
    #[serde(default)]
    pub shared_wins: u64,
    /// Current Elo rating.
    #[serde(default = "default_elo")]
    pub elo_rating: f64,
    /// Highest Elo rating held.
    #[serde(default = "default_elo")]
    pub peak_elo: f64,
    /// Mean final colonies.
    #[serde(default)]
    pub avg_colonies: f64,
}

fn default_elo() -> f64 {
    DEFAULT_ELO
}

/// Serializable snapshot of [`CumulativeStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeSnapshot {
    /// Every recorded game, errored ones included.
    #[serde(default)]
    pub total_games: u64,
    /// Games with one winner.
    #[serde(default)]
    pub solo_victories: u64,
    /// Games with several winners.
    #[serde(default)]
    pub shared_victories: u64,
    /// Games stopped at the turn limit.
    #[serde(default)]
    pub timeouts: u64,
    /// Games the engine aborted.
    #[serde(default)]
    pub errors: u64,
    /// Sum of game lengths.
    #[serde(default)]
    pub total_turns: u64,
    /// Shortest game, `null` before the first game.
    #[serde(default)]
    pub min_game_length: Option<u32>,
    /// Longest game, `null` before the first game.
    #[serde(default)]
    pub max_game_length: Option<u32>,
    /// Player count -> games (string keys in JSON).
    #[serde(default)]
    pub games_by_player_count: BTreeMap<usize, u64>,
    /// Time of the last save.
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
    /// Simulation runs folded into this file.
    #[serde(default)]
    pub simulation_runs: u64,
    /// Power display name -> standing.
    #[serde(default)]
    pub alien_stats: BTreeMap<String, PowerSnapshot>,
}

/// Statistics and Elo ratings persisted across runs.
#[derive(Debug, Clone)]
pub struct CumulativeStats {
    /// Every recorded game, errored ones included.
    pub total_games: u64,
    /// Games with one winner.
    pub solo_victories: u64,
    /// Games with several winners.
    pub shared_victories: u64,
    /// Games stopped at the turn limit.
    pub timeouts: u64,
    /// Games the engine aborted.
    pub errors: u64,
    /// Sum of game lengths.
    pub total_turns: u64,
    /// Shortest recorded game.
    pub min_game_length: Option<u32>,
    /// Longest recorded game.
    pub max_game_length: Option<u32>,
    /// Player count -> games.
    pub games_by_player_count: BTreeMap<usize, u64>,
    /// Time of the last save or load.
    pub last_updated: DateTime<Utc>,
    /// Simulation runs folded into these stats.
    pub simulation_runs: u64,
    powers: FxHashMap<String, PowerStanding>,
    calculator: EloCalculator,
}

impl Default for CumulativeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CumulativeStats {
    /// Create empty stats with the default K-factor.
    pub fn new() -> Self {
        Self {
            total_games: 0,
            solo_victories: 0,
            shared_victories: 0,
            timeouts: 0,
            errors: 0,
            total_turns: 0,
            min_game_length: None,
            max_game_length: None,
            games_by_player_count: BTreeMap::new(),
            last_updated: Utc::now(),
            simulation_runs: 0,
            powers: FxHashMap::default(),
            calculator: EloCalculator::default(),
        }
    }

    /// Builder method: set the Elo K-factor used by `record_game`.
    pub fn with_k_factor(mut self, k: f64) -> Self {
        self.calculator = EloCalculator::new(k);
        self
    }

    /// Mark the start of a new simulation run.
    pub fn start_run(&mut self) {
        self.simulation_runs += 1;
    }

    /// Ingest one game and update Elo for every seated power.
    pub fn record_game(&mut self, outcome: &GameOutcome) -> Result<(), StatsError> {
        outcome.validate()?;

        self.total_games += 1;
        self.total_turns += u64::from(outcome.turn_count);
        self.min_game_length = Some(
            self.min_game_length
                .map_or(outcome.turn_count, |m| m.min(outcome.turn_count)),
        );
        self.max_game_length = Some(
            self.max_game_length
                .map_or(outcome.turn_count, |m| m.max(outcome.turn_count)),
        );
        *self
            .games_by_player_count
            .entry(outcome.num_players)
            .or_insert(0) += 1;

        if outcome.errored {
            self.errors += 1;
            return Ok(());
        }

        if outcome.timed_out {
            self.timeouts += 1;
        }

        let solo = outcome.is_solo_victory();
        if solo {
            self.solo_victories += 1;
        } else {
            self.shared_victories += 1;
        }

        // Snapshot pre-game ratings in seat order.
        let seats: Vec<(u32, String, &String)> = outcome
            .alien_map
            .iter()
            .map(|(&player, power)| (player, normalize_power_id(power), power))
            .collect();
        let ratings: Vec<f64> = seats
            .iter()
            .map(|(_, key, power)| {
                self.powers
                    .entry(key.clone())
                    .or_insert_with(|| PowerStanding::new(power))
                    .elo
                    .rating()
            })
            .collect();
        let winners: Vec<usize> = seats
            .iter()
            .enumerate()
            .filter(|(_, (player, _, _))| outcome.is_winner(*player))
            .map(|(i, _)| i)
            .collect();
        let deltas = self.calculator.calculate_multiplayer_changes(&ratings, &winners);

        for ((player, key, _), delta) in seats.iter().zip(deltas) {
            let Some(standing) = self.powers.get_mut(key) else {
                continue;
            };
            standing.games_played += 1;
            if outcome.is_winner(*player) {
                standing.games_won += 1;
                if solo {
                    standing.solo_wins += 1;
                } else {
                    standing.shared_wins += 1;
                }
            }
            standing.record_colonies(outcome.final_colonies.get(player).copied().unwrap_or(0));
            standing.elo.apply(delta);
        }

        Ok(())
    }

    /// Ingest a batch in order, stopping at the first malformed outcome.
    pub fn record_all<'a, I>(&mut self, outcomes: I) -> Result<usize, StatsError>
    where
        I: IntoIterator<Item = &'a GameOutcome>,
    {
        let mut count = 0;
        for outcome in outcomes {
            self.record_game(outcome)?;
            count += 1;
        }
        Ok(count)
    }

    /// Fold another instance in. Elo is reconciled by games-weighted average.
    pub fn merge(&mut self, other: &CumulativeStats) {
        self.total_games += other.total_games;
        self.solo_victories += other.solo_victories;
        self.shared_victories += other.shared_victories;
        self.timeouts += other.timeouts;
        self.errors += other.errors;
        self.total_turns += other.total_turns;
        self.min_game_length = match (self.min_game_length, other.min_game_length) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_game_length = match (self.max_game_length, other.max_game_length) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        merge_counts(&mut self.games_by_player_count, &other.games_by_player_count);
        self.simulation_runs += other.simulation_runs;
        self.last_updated = self.last_updated.max(other.last_updated);

        for (key, standing) in &other.powers {
            match self.powers.get_mut(key) {
                Some(existing) => existing.merge(standing),
                None => {
                    self.powers.insert(key.clone(), standing.clone());
                }
            }
        }
        debug!(
            "merged cumulative stats: {} games, {} powers",
            self.total_games,
            self.powers.len()
        );
    }

    /// Standing for `power` (case-insensitive).
    pub fn power(&self, power: &str) -> Option<&PowerStanding> {
        self.powers.get(&normalize_power_id(power))
    }

    /// All standings, in no particular order.
    pub fn powers(&self) -> impl Iterator<Item = &PowerStanding> {
        self.powers.values()
    }

    /// Number of distinct powers.
    pub fn num_powers(&self) -> usize {
        self.powers.len()
    }

    /// Current Elo for `power`; `None` if never seen.
    pub fn elo(&self, power: &str) -> Option<f64> {
        self.power(power).map(PowerStanding::elo_rating)
    }

    /// Mean game length; `None` with no games.
    pub fn avg_game_length(&self) -> Option<f64> {
        (self.total_games > 0).then(|| ratio(self.total_turns, self.total_games))
    }

    /// `1 / games-weighted-average player count`; `None` with no games.
    pub fn expected_win_rate(&self) -> Option<f64> {
        expected_win_rate(&self.games_by_player_count)
    }

    /// Powers with at least `min_games`, highest Elo first.
    pub fn elo_leaderboard(&self, min_games: u64) -> Vec<&PowerStanding> {
        let mut board: Vec<&PowerStanding> = self
            .powers
            .values()
            .filter(|p| p.games_played >= min_games)
            .collect();
        board.sort_by(|a, b| {
            b.elo
                .rating()
                .total_cmp(&a.elo.rating())
                .then_with(|| a.name.cmp(&b.name))
        });
        board
    }

    /// Convert to the persisted representation.
    pub fn to_snapshot(&self) -> CumulativeSnapshot {
        CumulativeSnapshot {
            total_games: self.total_games,
            solo_victories: self.solo_victories,
            shared_victories: self.shared_victories,
            timeouts: self.timeouts,
            errors: self.errors,
            total_turns: self.total_turns,
            min_game_length: self.min_game_length,
            max_game_length: self.max_game_length,
            games_by_player_count: self.games_by_player_count.clone(),
            last_updated: self.last_updated,
            simulation_runs: self.simulation_runs,
            alien_stats: self
                .powers
                .values()
                .map(|p| (p.name.clone(), p.to_snapshot()))
                .collect(),
        }
    }

    /// Rebuild from a snapshot. Entries differing only in case are merged.
    pub fn from_snapshot(snapshot: CumulativeSnapshot) -> Self {
        let mut stats = Self::new();
        stats.total_games = snapshot.total_games;
        stats.solo_victories = snapshot.solo_victories;
        stats.shared_victories = snapshot.shared_victories;
        stats.timeouts = snapshot.timeouts;
        stats.errors = snapshot.errors;
        stats.total_turns = snapshot.total_turns;
        stats.min_game_length = snapshot.min_game_length;
        stats.max_game_length = snapshot.max_game_length;
        stats.games_by_player_count = snapshot.games_by_player_count;
        stats.last_updated = snapshot.last_updated;
        stats.simulation_runs = snapshot.simulation_runs;

        for (name, snap) in &snapshot.alien_stats {
            let standing = PowerStanding::from_snapshot(name, snap);
            match stats.powers.get_mut(&normalize_power_id(name)) {
                Some(existing) => existing.merge(&standing),
                None => {
                    stats.powers.insert(normalize_power_id(name), standing);
                }
            }
        }
        stats
    }

    /// Strict load: any I/O or parse failure is returned.
    pub fn try_load<P: AsRef<Path>>(path: P) -> Result<Self, StatsError> {
        let content = fs::read_to_string(path.as_ref())?;
        let snapshot: CumulativeSnapshot = serde_json::from_str(&content)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Load from `path`, or start fresh if the file is missing or unreadable.
    ///
    /// Never fails: a corrupt file is logged and replaced by an empty
    /// instance the next time it is saved.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("no cumulative stats at {}, starting fresh", path.display());
            return Self::new();
        }

        match Self::try_load(path) {
            Ok(stats) => {
                info!(
                    "loaded cumulative stats from {} ({} games, {} powers)",
                    path.display(),
                    stats.total_games,
                    stats.powers.len()
                );
                stats
            }
            Err(e) => {
                warn!(
                    "could not load cumulative stats from {}: {}; starting fresh",
                    path.display(),
                    e
                );
                Self::new()
            }
        }
    }

    /// Stamp `last_updated` and write the snapshot to `path`.
    ///
    /// The file is written next to its destination and renamed into place.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<(), StatsError> {
        let path = path.as_ref();
        self.last_updated = Utc::now();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.to_snapshot())?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;

        info!(
            "saved cumulative stats to {} ({} games)",
            path.display(),
            self.total_games
        );
        Ok(())
    }

    /// Fixed-width Elo leaderboard.
    pub fn summary(&self, min_games: u64) -> String {
        render(|out| {
            writeln!(out, "=== Cumulative Statistics ===")?;
            writeln!(
                out,
                "Runs: {} | Games: {} | Errors: {} | Timeouts: {} | Solo: {} | Shared: {}",
                self.simulation_runs,
                self.total_games,
                self.errors,
                self.timeouts,
                self.solo_victories,
                self.shared_victories
            )?;
            writeln!(
                out,
                "Last updated: {}",
                self.last_updated.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            )?;
            writeln!(out)?;
            writeln!(
                out,
                "{:<4} {:<24} {:>7} {:>8} {:>8} {:>8} {:>8}",
                "Rank", "Power", "Games", "WinRate", "Solo", "Elo", "Peak"
            )?;
            writeln!(out, "{}", "-".repeat(73))?;
            for (i, p) in self.elo_leaderboard(min_games).iter().enumerate() {
                writeln!(
                    out,
                    "{:<4} {:<24} {:>7} {:>7.1}% {:>8} {:>8.1} {:>8.1}",
                    i + 1,
                    truncate(&p.name, 24),
                    p.games_played,
                    p.win_rate() * 100.0,
                    p.solo_wins,
                    p.elo.rating(),
                    p.elo.peak()
                )?;
            }
            Ok(())
        })
    }

    /// CSV export of every standing with at least `min_games`.
    pub fn to_csv(&self, min_games: u64) -> String {
        render(|out| {
            out.push_str(
                "power,games_played,games_won,win_rate,solo_wins,shared_wins,elo_rating,peak_elo,avg_colonies\n",
            );
            for p in self.elo_leaderboard(min_games) {
                writeln!(
                    out,
                    "{},{},{},{:.6},{},{},{:.2},{:.2},{:.3}",
                    csv_field(&p.name),
                    p.games_played,
                    p.games_won,
                    p.win_rate(),
                    p.solo_wins,
                    p.shared_wins,
                    p.elo.rating(),
                    p.elo.peak(),
                    p.avg_colonies
                )?;
            }
            Ok(())
        })
    }
}
