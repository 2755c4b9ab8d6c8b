//! Ally-pair synergy and opposing-pair counters.
//!
//! An allied game counts as a win for the pair when either ally won. The
//! combined win rate is scored against a flat baseline (0.4 by default, the
//! chance that one of two seats wins a balanced five-player game). The
//! baseline does not follow the actual player count of each game.
//!
//! Every seated pair that was not allied in a game is an opposing pair for
//! that game. When exactly one of the two won, the winner is credited with
//! a win over the other.

use std::fmt::Write as _;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::analysis::{pair_key, unique_ids, PairKey, PowerNames};
use crate::error::StatsError;
use crate::stats::config::AnalysisConfig;
use crate::stats::outcome::GameOutcome;
use crate::stats::record::{normalize_power_id, ratio};
use crate::stats::statistics::{csv_field, render, truncate};

/// Counts for one ally pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynergyData {
    /// Games in which the two were allied.
    pub games_together: u64,
    /// Allied games in which at least one of them won.
    pub wins_together: u64,
}

impl SynergyData {
    /// `wins_together / games_together`; 0 with no games.
    pub fn combined_win_rate(&self) -> f64 {
        ratio(self.wins_together, self.games_together)
    }

    /// `100 · (combined_win_rate − baseline)`, or 0 below `min_games`.
    pub fn synergy_score(&self, baseline: f64, min_games: u64) -> f64 {
        if self.games_together < min_games || self.games_together == 0 {
            return 0.0;
        }
        100.0 * (self.combined_win_rate() - baseline)
    }
}

/// Counts for one opposing pair, oriented as `(a, b)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterData {
    /// Games in which both were seated and not allied.
    pub games_opposed: u64,
    /// Games `a` won and `b` did not.
    pub a_over_b: u64,
    /// Games `b` won and `a` did not.
    pub b_over_a: u64,
}

impl CounterData {
    /// `100 · (a_over_b − b_over_a) / games_opposed`, or 0 below `min_games`.
    ///
    /// Positive when `a` counters `b`.
    pub fn counter_score(&self, min_games: u64) -> f64 {
        if self.games_opposed < min_games || self.games_opposed == 0 {
            return 0.0;
        }
        100.0 * (self.a_over_b as f64 - self.b_over_a as f64) / self.games_opposed as f64
    }

    /// The same counts seen from `b`'s side.
    pub fn swapped(self) -> Self {
        Self {
            a_over_b: self.b_over_a,
            b_over_a: self.a_over_b,
            ..self
        }
    }
}

/// A ranked ally pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyEntry {
    /// First power, alphabetically by id.
    pub power_a: String,
    /// Second power.
    pub power_b: String,
    /// Games allied.
    pub games_together: u64,
    /// Allied games either of them won.
    pub wins_together: u64,
    /// `wins_together / games_together`.
    pub combined_win_rate: f64,
    /// Percentage points above the baseline.
    pub synergy_score: f64,
}

/// An opponent that counters a queried power.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterEntry {
    /// The countering power.
    pub counter: String,
    /// The queried power.
    pub target: String,
    /// Games opposed.
    pub games_opposed: u64,
    /// Games the counter won and the target did not.
    pub wins: u64,
    /// Games the target won and the counter did not.
    pub losses: u64,
    /// Counter score from the counter's side.
    pub counter_score: f64,
}

#[derive(Serialize)]
struct SynergyExport<'a> {
    synergy_baseline: f64,
    min_games: u64,
    synergies: Vec<SynergyEntry>,
    counters: Vec<CounterExport<'a>>,
}

#[derive(Serialize)]
struct CounterExport<'a> {
    power_a: &'a str,
    power_b: &'a str,
    #[serde(flatten)]
    data: CounterData,
    counter_score: f64,
}

/// Accumulates ally and opposing pairs.
#[derive(Debug, Clone)]
pub struct SynergyAnalyzer {
    synergies: FxHashMap<PairKey, SynergyData>,
    counters: FxHashMap<PairKey, CounterData>,
    names: PowerNames,
    games_recorded: u64,
    baseline: f64,
    min_games: u64,
    counter_threshold: f64,
}

impl Default for SynergyAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl SynergyAnalyzer {
    /// Analyzer with a 0.4 baseline and a 10-game floor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzer using the synergy settings in `config`.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            synergies: FxHashMap::default(),
            counters: FxHashMap::default(),
            names: PowerNames::default(),
            games_recorded: 0,
            baseline: config.synergy_baseline,
            min_games: config.synergy_min_games,
            counter_threshold: config.counter_threshold,
        }
    }

    /// Builder method: set the games floor for scores.
    pub fn with_min_games(mut self, min_games: u64) -> Self {
        self.min_games = min_games;
        self
    }

    /// Expected combined win rate of an ally pair.
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Games recorded so far.
    pub fn games_recorded(&self) -> u64 {
        self.games_recorded
    }

    /// Record one game.
    ///
    /// `ally_pairs` name powers that were allied during the game; pairs
    /// naming a power not in `powers`, or a power with itself, are ignored.
    pub fn record_game<S, W, A>(&mut self, powers: &[S], winners: &[W], ally_pairs: &[(A, A)])
    where
        S: AsRef<str>,
        W: AsRef<str>,
        A: AsRef<str>,
    {
        let ids = unique_ids(&mut self.names, powers);
        let winner_ids: FxHashSet<String> = winners
            .iter()
            .map(|w| normalize_power_id(w.as_ref()))
            .collect();

        let mut allied: FxHashSet<PairKey> = FxHashSet::default();
        for (a, b) in ally_pairs {
            let (key, _) = pair_key(a.as_ref(), b.as_ref());
            if key.0 != key.1 && ids.contains(&key.0) && ids.contains(&key.1) {
                allied.insert(key);
            }
        }

        for key in &allied {
            let data = self.synergies.entry(key.clone()).or_default();
            data.games_together += 1;
            if winner_ids.contains(&key.0) || winner_ids.contains(&key.1) {
                data.wins_together += 1;
            }
        }

        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                let (key, _) = pair_key(a, b);
                if allied.contains(&key) {
                    continue;
                }
                let first_won = winner_ids.contains(&key.0);
                let second_won = winner_ids.contains(&key.1);
                let data = self.counters.entry(key).or_default();
                data.games_opposed += 1;
                match (first_won, second_won) {
                    (true, false) => data.a_over_b += 1,
                    (false, true) => data.b_over_a += 1,
                    _ => {}
                }
            }
        }

        self.games_recorded += 1;
    }

    /// Record a validated outcome. Errored games are skipped and return
    /// `Ok(false)`.
    pub fn record_outcome(&mut self, outcome: &GameOutcome) -> Result<bool, StatsError> {
        outcome.validate()?;
        if outcome.errored {
            return Ok(false);
        }
        self.record_game(
            &outcome.powers(),
            &outcome.winning_powers(),
            &outcome.ally_powers(),
        );
        Ok(true)
    }

    /// Ally counts for a pair; all zero if never allied.
    pub fn get_synergy(&self, a: &str, b: &str) -> SynergyData {
        let (key, _) = pair_key(a, b);
        self.synergies.get(&key).copied().unwrap_or_default()
    }

    /// Synergy score for a pair; 0 below the games floor.
    pub fn synergy_score(&self, a: &str, b: &str) -> f64 {
        self.get_synergy(a, b)
            .synergy_score(self.baseline, self.min_games)
    }

    /// Opposing counts oriented as `(a, b)`.
    pub fn get_counter(&self, a: &str, b: &str) -> CounterData {
        let (key, swapped) = pair_key(a, b);
        let data = self.counters.get(&key).copied().unwrap_or_default();
        if swapped {
            data.swapped()
        } else {
            data
        }
    }

    fn entry(&self, key: &PairKey, data: &SynergyData) -> SynergyEntry {
        SynergyEntry {
            power_a: self.names.display(&key.0).to_string(),
            power_b: self.names.display(&key.1).to_string(),
            games_together: data.games_together,
            wins_together: data.wins_together,
            combined_win_rate: data.combined_win_rate(),
            synergy_score: data.synergy_score(self.baseline, self.min_games),
        }
    }

    /// Ally pairs at or above the games floor, unordered.
    fn qualifying_synergies(&self) -> Vec<SynergyEntry> {
        self.synergies
            .iter()
            .filter(|(_, d)| d.games_together >= self.min_games)
            .map(|(k, d)| self.entry(k, d))
            .collect()
    }

    /// Ally pairs at or above the games floor, best score first.
    fn ranked_synergies(&self) -> Vec<SynergyEntry> {
        let mut entries = self.qualifying_synergies();
        entries.sort_by(|x, y| {
            y.synergy_score
                .total_cmp(&x.synergy_score)
                .then_with(|| x.power_a.cmp(&y.power_a))
                .then_with(|| x.power_b.cmp(&y.power_b))
        });
        entries
    }

    /// Strongest ally pairs.
    pub fn get_best_synergies(&self, limit: usize) -> Vec<SynergyEntry> {
        let mut entries = self.ranked_synergies();
        entries.truncate(limit);
        entries
    }

    /// Weakest ally pairs, lowest score first. Ties break alphabetically.
    pub fn get_worst_synergies(&self, limit: usize) -> Vec<SynergyEntry> {
        let mut entries = self.qualifying_synergies();
        entries.sort_by(|x, y| {
            x.synergy_score
                .total_cmp(&y.synergy_score)
                .then_with(|| x.power_a.cmp(&y.power_a))
                .then_with(|| x.power_b.cmp(&y.power_b))
        });
        entries.truncate(limit);
        entries
    }

    /// Opponents whose counter score against `power` reaches the counter
    /// threshold, strongest first.
    pub fn get_counters(&self, power: &str) -> Vec<CounterEntry> {
        let target = normalize_power_id(power);
        let threshold = self.counter_threshold * 100.0;
        let mut entries: Vec<CounterEntry> = self
            .counters
            .iter()
            .filter_map(|((a, b), data)| {
                if *a == target {
                    Some((b.as_str(), data.swapped()))
                } else if *b == target {
                    Some((a.as_str(), *data))
                } else {
                    None
                }
            })
            .map(|(counter, data)| CounterEntry {
                counter: self.names.display(counter).to_string(),
                target: self.names.display(&target).to_string(),
                games_opposed: data.games_opposed,
                wins: data.a_over_b,
                losses: data.b_over_a,
                counter_score: data.counter_score(self.min_games),
            })
            .filter(|e| e.games_opposed >= self.min_games && e.counter_score >= threshold)
            .collect();
        entries.sort_by(|x, y| {
            y.counter_score
                .total_cmp(&x.counter_score)
                .then_with(|| x.counter.cmp(&y.counter))
        });
        entries
    }

    /// Fixed-width report of ranked ally pairs.
    pub fn summary(&self) -> String {
        render(|out| {
            writeln!(out, "=== Synergy Analysis ===")?;
            writeln!(
                out,
                "Games: {} | Ally pairs: {} | Baseline: {:.1}% | Min games: {}",
                self.games_recorded,
                self.synergies.len(),
                self.baseline * 100.0,
                self.min_games
            )?;
            writeln!(out)?;
            writeln!(
                out,
                "{:<20} {:<20} {:>7} {:>6} {:>8} {:>8}",
                "Power A", "Power B", "Games", "Wins", "WinRate", "Synergy"
            )?;
            writeln!(out, "{}", "-".repeat(74))?;
            for e in self.ranked_synergies() {
                writeln!(
                    out,
                    "{:<20} {:<20} {:>7} {:>6} {:>7.1}% {:>+8.1}",
                    truncate(&e.power_a, 20),
                    truncate(&e.power_b, 20),
                    e.games_together,
                    e.wins_together,
                    e.combined_win_rate * 100.0,
                    e.synergy_score
                )?;
            }
            Ok(())
        })
    }

    /// CSV export of every ally pair.
    pub fn to_csv(&self) -> String {
        let mut entries: Vec<SynergyEntry> =
            self.synergies.iter().map(|(k, d)| self.entry(k, d)).collect();
        entries.sort_by(|x, y| {
            x.power_a
                .cmp(&y.power_a)
                .then_with(|| x.power_b.cmp(&y.power_b))
        });

        render(|out| {
            out.push_str(
                "power_a,power_b,games_together,wins_together,combined_win_rate,synergy_score\n",
            );
            for e in entries {
                writeln!(
                    out,
                    "{},{},{},{},{:.6},{:.2}",
                    csv_field(&e.power_a),
                    csv_field(&e.power_b),
                    e.games_together,
                    e.wins_together,
                    e.combined_win_rate,
                    e.synergy_score
                )?;
            }
            Ok(())
        })
    }

    /// Pretty JSON with ranked synergies and every opposing pair.
    pub fn to_json(&self) -> Result<String, StatsError> {
        let mut counters: Vec<CounterExport<'_>> = self
            .counters
            .iter()
            .map(|((a, b), data)| CounterExport {
                power_a: self.names.display(a),
                power_b: self.names.display(b),
                data: *data,
                counter_score: data.counter_score(self.min_games),
            })
            .collect();
        counters.sort_by(|x, y| {
            x.power_a
                .cmp(y.power_a)
                .then_with(|| x.power_b.cmp(y.power_b))
        });

        let export = SynergyExport {
            synergy_baseline: self.baseline,
            min_games: self.min_games,
            synergies: self.ranked_synergies(),
            counters,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }
}
