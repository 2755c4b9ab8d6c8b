//! Transient per-run statistics.
//!
//! [`Statistics`] owns one [`PowerRecord`] per power id and the game-level
//! counters of a single run. Parallel workers each own an instance and fold
//! them together with [`Statistics::merge`], which is commutative and
//! associative over every counter.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::stats::outcome::GameOutcome;
use crate::stats::record::{format_rate, merge_counts, normalize_power_id, PowerRecord};

/// Aggregate statistics for one batch of games.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Every recorded game, errored ones included.
    pub total_games: u64,
    /// Games the engine aborted.
    pub error_count: u64,
    /// Games stopped at the turn limit.
    pub timeout_count: u64,
    /// Games with exactly one winner.
    pub solo_victories: u64,
    /// Games with more than one winner.
    pub shared_victories: u64,
    /// Games ending through an alternate victory condition.
    pub alternate_victories: u64,
    /// Turn count of each recorded game.
    pub turn_counts: Vec<u32>,
    /// Number of recorded games per player count.
    pub games_by_player_count: BTreeMap<usize, u64>,
    /// Normalized power id -> record.
    records: FxHashMap<String, PowerRecord>,
}

impl Statistics {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one game.
    ///
    /// Must be called exactly once per game. The outcome is validated before
    /// any counter moves. Errored games only update the game-level counters.
    pub fn record_game(&mut self, outcome: &GameOutcome) -> Result<(), StatsError> {
        outcome.validate()?;

        self.total_games += 1;
        self.turn_counts.push(outcome.turn_count);
        *self
            .games_by_player_count
            .entry(outcome.num_players)
            .or_insert(0) += 1;

        if outcome.errored {
            self.error_count += 1;
            return Ok(());
        }

        if outcome.timed_out {
            self.timeout_count += 1;
        }

        let solo = outcome.is_solo_victory();
        if solo {
            self.solo_victories += 1;
        } else {
            self.shared_victories += 1;
        }
        if outcome.alternate_win {
            self.alternate_victories += 1;
        }

        for (&player, power) in &outcome.alien_map {
            let won = outcome.is_winner(player);
            let record = self.record_mut(power);

            record.games_played += 1;
            record.total_turns += u64::from(outcome.turn_count);
            record.total_colonies +=
                u64::from(outcome.final_colonies.get(&player).copied().unwrap_or(0));
            *record
                .games_by_player_count
                .entry(outcome.num_players)
                .or_insert(0) += 1;

            if won {
                record.games_won += 1;
                *record
                    .wins_by_player_count
                    .entry(outcome.num_players)
                    .or_insert(0) += 1;
                if solo {
                    record.solo_wins += 1;
                } else {
                    record.shared_wins += 1;
                }
                if outcome.alternate_win {
                    record.alternate_wins += 1;
                }
            }

            if let Some(&count) = outcome.power_activations.get(&player) {
                record.power_activations += count;
            }
            if let Some(encounters) = outcome.encounter_stats.get(&player) {
                record.add_encounters(encounters);
            }
            if let Some(alliances) = outcome.alliance_stats.get(&player) {
                record.add_alliances(alliances);
            }
        }

        Ok(())
    }

    /// Record for `power`, created on first sight.
    fn record_mut(&mut self, power: &str) -> &mut PowerRecord {
        self.records
            .entry(normalize_power_id(power))
            .or_insert_with(|| PowerRecord::new(power.trim()))
    }

    /// Fold `other` into this instance.
    pub fn merge(&mut self, other: &Statistics) {
        self.total_games += other.total_games;
        self.error_count += other.error_count;
        self.timeout_count += other.timeout_count;
        self.solo_victories += other.solo_victories;
        self.shared_victories += other.shared_victories;
        self.alternate_victories += other.alternate_victories;
        self.turn_counts.extend_from_slice(&other.turn_counts);
        merge_counts(&mut self.games_by_player_count, &other.games_by_player_count);

        for (key, record) in &other.records {
            match self.records.get_mut(key) {
                Some(existing) => existing.merge(record),
                None => {
                    self.records.insert(key.clone(), record.clone());
                }
            }
        }
    }

    /// Record for `power` (case-insensitive), if it has been seen.
    pub fn record(&self, power: &str) -> Option<&PowerRecord> {
        self.records.get(&normalize_power_id(power))
    }

    /// Win rate for `power`; `None` if the power was never seen.
    pub fn win_rate(&self, power: &str) -> Option<f64> {
        self.record(power).map(PowerRecord::win_rate)
    }

    /// All records, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &PowerRecord> {
        self.records.values()
    }

    /// Number of distinct powers seen.
    pub fn num_powers(&self) -> usize {
        self.records.len()
    }

    /// Games that produced a result.
    pub fn completed_games(&self) -> u64 {
        self.total_games - self.error_count
    }

    /// Mean game length; `None` with no games.
    pub fn avg_game_length(&self) -> Option<f64> {
        if self.turn_counts.is_empty() {
            return None;
        }
        let sum: u64 = self.turn_counts.iter().map(|&t| u64::from(t)).sum();
        Some(sum as f64 / self.turn_counts.len() as f64)
    }

    /// Shortest recorded game.
    pub fn min_game_length(&self) -> Option<u32> {
        self.turn_counts.iter().copied().min()
    }

    /// Longest recorded game.
    pub fn max_game_length(&self) -> Option<u32> {
        self.turn_counts.iter().copied().max()
    }

    /// Expected win rate given the mix of player counts recorded.
    ///
    /// `1 / weighted-average player count`, or `None` with no games.
    pub fn expected_win_rate(&self) -> Option<f64> {
        expected_win_rate(&self.games_by_player_count)
    }

    /// Powers with at least `min_games`, best win rate first.
    ///
    /// Ties break on games played, then name, so output is deterministic.
    pub fn rankings(&self, min_games: u64) -> Vec<&PowerRecord> {
        let mut ranked: Vec<&PowerRecord> = self
            .records
            .values()
            .filter(|r| r.games_played >= min_games)
            .collect();
        ranked.sort_by(|a, b| {
            b.win_rate()
                .total_cmp(&a.win_rate())
                .then(b.games_played.cmp(&a.games_played))
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked
    }

    /// Fixed-width text report of the ranked powers.
    pub fn summary(&self, min_games: u64, confidence: f64) -> String {
        render(|out| {
            writeln!(out, "=== Simulation Statistics ===")?;
            writeln!(
                out,
                "Games: {} | Errors: {} | Timeouts: {} | Solo: {} | Shared: {}",
                self.total_games,
                self.error_count,
                self.timeout_count,
                self.solo_victories,
                self.shared_victories
            )?;
            writeln!(
                out,
                "Game length: avg {} | min {} | max {}",
                self.avg_game_length()
                    .map(|v| format!("{:.1}", v))
                    .unwrap_or_else(|| "N/A".to_string()),
                self.min_game_length()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
                self.max_game_length()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
            )?;
            let expected = self.expected_win_rate();
            writeln!(out, "Expected win rate: {}", format_rate(expected))?;
            writeln!(out)?;
            writeln!(
                out,
                "{:<4} {:<24} {:>7} {:>7} {:>8} {:>17} {:>8} {:>8}",
                "Rank", "Power", "Games", "Wins", "WinRate", "CI", "Solo", "Rating"
            )?;
            writeln!(out, "{}", "-".repeat(90))?;

            for (i, record) in self.rankings(min_games).iter().enumerate() {
                let (lower, upper) = record.confidence_interval(confidence);
                writeln!(
                    out,
                    "{:<4} {:<24} {:>7} {:>7} {:>7.1}% {:>7.1}%-{:>6.1}%  {:>7} {:>8.2}",
                    i + 1,
                    truncate(&record.name, 24),
                    record.games_played,
                    record.games_won,
                    record.win_rate() * 100.0,
                    lower * 100.0,
                    upper * 100.0,
                    record.solo_wins,
                    record.power_rating(expected.unwrap_or(0.0)),
                )?;
            }
            Ok(())
        })
    }

    /// CSV export, one row per ranked power.
    pub fn to_csv(&self, min_games: u64, confidence: f64) -> String {
        render(|out| {
            out.push_str(
                "power,games_played,games_won,win_rate,ci_lower,ci_upper,solo_wins,shared_wins,alternate_wins,avg_turns,avg_colonies\n",
            );
            for record in self.rankings(min_games) {
                let (lower, upper) = record.confidence_interval(confidence);
                writeln!(
                    out,
                    "{},{},{},{:.6},{:.6},{:.6},{},{},{},{:.3},{:.3}",
                    csv_field(&record.name),
                    record.games_played,
                    record.games_won,
                    record.win_rate(),
                    lower,
                    upper,
                    record.solo_wins,
                    record.shared_wins,
                    record.alternate_wins,
                    record.avg_turns().unwrap_or(0.0),
                    record.avg_colonies().unwrap_or(0.0),
                )?;
            }
            Ok(())
        })
    }

    /// Pretty JSON export of the full aggregate.
    pub fn to_json(&self) -> Result<String, StatsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `1 / weighted-average player count` over a player-count histogram.
pub fn expected_win_rate(games_by_player_count: &BTreeMap<usize, u64>) -> Option<f64> {
    let games: u64 = games_by_player_count.values().sum();
    if games == 0 {
        return None;
    }
    let seats: u64 = games_by_player_count
        .iter()
        .map(|(&players, &count)| players as u64 * count)
        .sum();
    if seats == 0 {
        return None;
    }
    let avg_players = seats as f64 / games as f64;
    Some(1.0 / avg_players)
}

/// Shorten `s` to at most `width` characters for table output.
pub(crate) fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(width.saturating_sub(1)).collect();
        t.push('~');
        t
    }
}

/// Quote a CSV field when it contains a delimiter or quote.
pub(crate) fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Run a report writer against a fresh `String`.
///
/// Writing into a `String` only fails if a `Display` impl inside the report
/// fails; the partial report is returned and the failure logged.
pub(crate) fn render(write: impl FnOnce(&mut String) -> fmt::Result) -> String {
    let mut out = String::new();
    if let Err(e) = write(&mut out) {
        warn!("report rendering stopped early: {e}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::outcome::EncounterStats;

    const POWERS: [&str; 5] = ["Alpha", "Beta", "Gamma", "Delta", "Epsilon"];

    fn solo_game(winner: u32) -> GameOutcome {
        GameOutcome::from_powers(&POWERS)
            .with_winners([winner])
            .with_turns(10)
    }

    #[test]
    fn test_fixed_winner_rates() {
        let mut stats = Statistics::new();
        for _ in 0..25 {
            stats.record_game(&solo_game(0)).unwrap();
        }
        assert_eq!(stats.win_rate("Alpha"), Some(1.0));
        for power in &POWERS[1..] {
            assert_eq!(stats.win_rate(power), Some(0.0));
        }
        assert_eq!(stats.win_rate("Unknown"), None);
        assert_eq!(stats.solo_victories, 25);
    }

    #[test]
    fn test_case_insensitive_first_casing_wins() {
        let mut stats = Statistics::new();
        stats
            .record_game(&GameOutcome::from_powers(&["Void", "Oracle"]).with_winners([0]))
            .unwrap();
        stats
            .record_game(&GameOutcome::from_powers(&["VOID", "oracle"]).with_winners([1]))
            .unwrap();
        assert_eq!(stats.num_powers(), 2);
        let void = stats.record("void").unwrap();
        assert_eq!(void.name, "Void");
        assert_eq!(void.games_played, 2);
        assert_eq!(void.games_won, 1);
    }

    #[test]
    fn test_errored_game_leaves_powers_untouched() {
        let mut stats = Statistics::new();
        stats.record_game(&solo_game(0)).unwrap();
        let before: Vec<PowerRecord> = POWERS
            .iter()
            .map(|p| stats.record(p).unwrap().clone())
            .collect();

        let errored = GameOutcome::from_powers(&POWERS).with_turns(3).errored();
        stats.record_game(&errored).unwrap();

        assert_eq!(stats.total_games, 2);
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.solo_victories, 1);
        for (power, old) in POWERS.iter().zip(before.iter()) {
            assert_eq!(stats.record(power).unwrap(), old);
        }
    }

    #[test]
    fn test_timeout_still_counts() {
        let mut stats = Statistics::new();
        stats.record_game(&solo_game(2).timed_out()).unwrap();
        assert_eq!(stats.timeout_count, 1);
        assert_eq!(stats.record("Gamma").unwrap().games_won, 1);
    }

    #[test]
    fn test_shared_victory_counters() {
        let mut stats = Statistics::new();
        let mut outcome = GameOutcome::from_powers(&POWERS).with_winners([0, 1]);
        outcome.alternate_win = true;
        outcome.final_colonies.insert(0, 5);
        outcome.power_activations.insert(1, 7);
        outcome.encounter_stats.insert(
            0,
            EncounterStats {
                offense: 4,
                offense_wins: 3,
                defense: 2,
                defense_wins: 1,
            },
        );
        stats.record_game(&outcome).unwrap();

        let alpha = stats.record("Alpha").unwrap();
        assert_eq!(alpha.shared_wins, 1);
        assert_eq!(alpha.solo_wins, 0);
        assert_eq!(alpha.alternate_wins, 1);
        assert_eq!(alpha.total_colonies, 5);
        assert_eq!(alpha.offense_win_rate(), Some(0.75));
        assert_eq!(stats.record("Beta").unwrap().power_activations, 7);
        assert_eq!(stats.shared_victories, 1);
        assert_eq!(stats.alternate_victories, 1);
    }

    #[test]
    fn test_malformed_outcome_rejected_before_counting() {
        let mut stats = Statistics::new();
        let bad = GameOutcome::from_powers(&POWERS).with_winners([42]);
        assert!(matches!(
            stats.record_game(&bad),
            Err(StatsError::MalformedOutcome(_))
        ));
        assert_eq!(stats, Statistics::new());
    }

    #[test]
    fn test_merge_empty_is_identity() {
        let mut stats = Statistics::new();
        stats.record_game(&solo_game(1)).unwrap();
        stats.record_game(&solo_game(3).timed_out()).unwrap();
        let snapshot = stats.clone();
        stats.merge(&Statistics::new());
        assert_eq!(stats, snapshot);
    }

    #[test]
    fn test_merge_matches_sequential_recording() {
        let games: Vec<GameOutcome> = (0..10).map(|i| solo_game(i % 5)).collect();

        let mut sequential = Statistics::new();
        for g in &games {
            sequential.record_game(g).unwrap();
        }

        let mut left = Statistics::new();
        let mut right = Statistics::new();
        for g in &games[..4] {
            left.record_game(g).unwrap();
        }
        for g in &games[4..] {
            right.record_game(g).unwrap();
        }

        let mut ab = left.clone();
        ab.merge(&right);
        let mut ba = right.clone();
        ba.merge(&left);

        for power in &POWERS {
            assert_eq!(ab.record(power), sequential.record(power));
            assert_eq!(ba.record(power), sequential.record(power));
        }
        assert_eq!(ab.total_games, sequential.total_games);
        assert_eq!(ab.games_by_player_count, ba.games_by_player_count);
    }

    #[test]
    fn test_merge_display_name_independent_of_order() {
        let mut upper = Statistics::new();
        upper
            .record_game(&GameOutcome::from_powers(&["ORACLE", "Clone"]).with_winners([0]))
            .unwrap();
        let mut lower = Statistics::new();
        lower
            .record_game(&GameOutcome::from_powers(&["oracle", "Clone"]).with_winners([1]))
            .unwrap();

        let mut ab = upper.clone();
        ab.merge(&lower);
        let mut ba = lower.clone();
        ba.merge(&upper);

        assert_eq!(ab.record("Oracle"), ba.record("Oracle"));
        assert_eq!(ab.record("oracle").unwrap().name, "ORACLE");
        assert_eq!(ab.record("oracle").unwrap().games_played, 2);
    }

    #[test]
    fn test_expected_win_rate_weighted_by_player_count() {
        let mut stats = Statistics::new();
        stats
            .record_game(&GameOutcome::from_powers(&["A", "B"]).with_winners([0]))
            .unwrap();
        for _ in 0..3 {
            stats.record_game(&solo_game(0)).unwrap();
        }
        // (2*1 + 5*3) / 4 = 4.25 players on average
        let expected = stats.expected_win_rate().unwrap();
        assert!((expected - 1.0 / 4.25).abs() < 1e-12);
        assert_eq!(Statistics::new().expected_win_rate(), None);
    }

    #[test]
    fn test_rankings_and_reports() {
        let mut stats = Statistics::new();
        for i in 0..20 {
            stats.record_game(&solo_game(if i < 12 { 0 } else { 1 })).unwrap();
        }
        let ranked = stats.rankings(10);
        assert_eq!(ranked[0].name, "Alpha");
        assert_eq!(ranked[1].name, "Beta");
        assert_eq!(stats.rankings(21).len(), 0);

        let summary = stats.summary(10, 0.95);
        assert!(summary.contains("Alpha"));
        assert!(summary.contains("60.0%"));

        let csv = stats.to_csv(10, 0.95);
        assert_eq!(csv.lines().count(), 6);
        assert!(csv.lines().nth(1).unwrap().starts_with("Alpha,20,12,0.600000"));
        assert!(stats.to_json().unwrap().contains("\"total_games\": 20"));
    }

    #[test]
    fn test_game_lengths() {
        let mut stats = Statistics::new();
        assert_eq!(stats.avg_game_length(), None);
        stats.record_game(&solo_game(0).with_turns(4)).unwrap();
        stats.record_game(&solo_game(0).with_turns(8)).unwrap();
        assert_eq!(stats.avg_game_length(), Some(6.0));
        assert_eq!(stats.min_game_length(), Some(4));
        assert_eq!(stats.max_game_length(), Some(8));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(truncate("abcdef", 4), "abc~");
    }
}
