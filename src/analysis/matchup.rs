//! Head-to-head matchup records.
//!
//! Every game contributes once to every unordered pair of distinct powers
//! seated in it, whatever the other participants were. A shared victory in
//! which both powers of a pair won counts as a draw and credits **both**
//! sides, so `a_win_rate + b_win_rate` can exceed 1.0 for a pair.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::{pair_key, unique_ids, PairKey, PowerNames};
use crate::error::StatsError;
use crate::stats::config::AnalysisConfig;
use crate::stats::outcome::GameOutcome;
use crate::stats::record::{normalize_power_id, ratio};
use crate::stats::statistics::{csv_field, render, truncate};

/// Outcome counts for one pair, oriented as `(a, b)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchupData {
    /// Games in which both powers were seated.
    pub games_played: u64,
    /// Games won by `a`, draws included.
    pub a_wins: u64,
    /// Games won by `b`, draws included.
    pub b_wins: u64,
    /// Shared victories that included both.
    pub draws: u64,
    /// Games won by neither.
    pub neither_wins: u64,
}

impl MatchupData {
    /// Share of games won by `a`; 0 with no games.
    pub fn a_win_rate(&self) -> f64 {
        ratio(self.a_wins, self.games_played)
    }

    /// Share of games won by `b`; 0 with no games.
    pub fn b_win_rate(&self) -> f64 {
        ratio(self.b_wins, self.games_played)
    }

    /// Share of games that were draws; 0 with no games.
    pub fn draw_rate(&self) -> f64 {
        ratio(self.draws, self.games_played)
    }

    /// `a_win_rate − b_win_rate`.
    pub fn advantage(&self) -> f64 {
        self.a_win_rate() - self.b_win_rate()
    }

    /// The same counts seen from `b`'s side.
    pub fn swapped(self) -> Self {
        Self {
            a_wins: self.b_wins,
            b_wins: self.a_wins,
            ..self
        }
    }

    fn record(&mut self, a_won: bool, b_won: bool) {
        self.games_played += 1;
        match (a_won, b_won) {
            (true, true) => {
                self.draws += 1;
                self.a_wins += 1;
                self.b_wins += 1;
            }
            (true, false) => self.a_wins += 1,
            (false, true) => self.b_wins += 1,
            (false, false) => self.neither_wins += 1,
        }
    }
}

/// Canonical pair storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchupMatrix {
    pairs: FxHashMap<PairKey, MatchupData>,
}

impl MatchupMatrix {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one game between `a` and `b`. Self-pairs are ignored.
    pub fn record(&mut self, a: &str, b: &str, a_won: bool, b_won: bool) {
        let (key, swapped) = pair_key(a, b);
        if key.0 == key.1 {
            return;
        }
        let (first_won, second_won) = if swapped {
            (b_won, a_won)
        } else {
            (a_won, b_won)
        };
        self.pairs.entry(key).or_default().record(first_won, second_won);
    }

    /// Counts oriented as `(a, b)`; all zero if the pair never met.
    pub fn get(&self, a: &str, b: &str) -> MatchupData {
        let (key, swapped) = pair_key(a, b);
        let data = self.pairs.get(&key).copied().unwrap_or_default();
        if swapped {
            data.swapped()
        } else {
            data
        }
    }

    /// Stored pairs in canonical orientation.
    pub fn pairs(&self) -> impl Iterator<Item = (&PairKey, &MatchupData)> {
        self.pairs.iter()
    }

    /// Number of pairs that have met at least once.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pair has been recorded.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// One opponent as seen from a queried power.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupEntry {
    /// The queried power.
    pub power: String,
    /// The opposing power.
    pub opponent: String,
    /// Games both were seated in.
    pub games_played: u64,
    /// Queried power's win rate against this opponent.
    pub win_rate: f64,
    /// Opponent's win rate against the queried power.
    pub opponent_win_rate: f64,
    /// `win_rate − opponent_win_rate`.
    pub advantage: f64,
}

#[derive(Serialize)]
struct PairExport<'a> {
    power_a: &'a str,
    power_b: &'a str,
    #[serde(flatten)]
    data: MatchupData,
    a_win_rate: f64,
    b_win_rate: f64,
}

/// Accumulates matchups and answers ranking queries.
#[derive(Debug, Clone)]
pub struct MatchupAnalyzer {
    matrix: MatchupMatrix,
    names: PowerNames,
    games_recorded: u64,
    min_games: u64,
    counter_threshold: f64,
}

impl Default for MatchupAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl MatchupAnalyzer {
    /// Analyzer with a 20-game ranking floor and a 0.10 counter threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzer using the matchup thresholds in `config`.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            matrix: MatchupMatrix::new(),
            names: PowerNames::default(),
            games_recorded: 0,
            min_games: config.matchup_min_games,
            counter_threshold: config.counter_threshold,
        }
    }

    /// Builder method: set the ranking floor.
    pub fn with_min_games(mut self, min_games: u64) -> Self {
        self.min_games = min_games;
        self
    }

    /// Builder method: set the counter threshold.
    pub fn with_counter_threshold(mut self, threshold: f64) -> Self {
        self.counter_threshold = threshold;
        self
    }

    /// Record one game.
    ///
    /// Every unordered pair of distinct powers in `powers` gains a game.
    /// With `solo_win` only the first listed winner is credited.
    pub fn record_game<S: AsRef<str>, W: AsRef<str>>(
        &mut self,
        powers: &[S],
        winners: &[W],
        solo_win: bool,
    ) {
        let ids = unique_ids(&mut self.names, powers);
        let credited = if solo_win {
            &winners[..winners.len().min(1)]
        } else {
            winners
        };
        let winner_ids: Vec<String> = credited
            .iter()
            .map(|w| normalize_power_id(w.as_ref()))
            .collect();

        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                self.matrix
                    .record(a, b, winner_ids.contains(a), winner_ids.contains(b));
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
            outcome.is_solo_victory(),
        );
        Ok(true)
    }

    /// Games recorded so far.
    pub fn games_recorded(&self) -> u64 {
        self.games_recorded
    }

    /// Underlying matrix.
    pub fn matrix(&self) -> &MatchupMatrix {
        &self.matrix
    }

    /// Counts for `a` against `b`, oriented to the query order.
    pub fn get_matchup(&self, a: &str, b: &str) -> MatchupData {
        self.matrix.get(a, b)
    }

    /// Every opponent `power` has met, most games first.
    pub fn matrix_for(&self, power: &str) -> Vec<MatchupEntry> {
        let key = normalize_power_id(power);
        let mut entries: Vec<MatchupEntry> = self
            .matrix
            .pairs()
            .filter_map(|((a, b), data)| {
                if *a == key {
                    Some((b.as_str(), *data))
                } else if *b == key {
                    Some((a.as_str(), data.swapped()))
                } else {
                    None
                }
            })
            .map(|(opponent, data)| MatchupEntry {
                power: self.names.display(&key).to_string(),
                opponent: self.names.display(opponent).to_string(),
                games_played: data.games_played,
                win_rate: data.a_win_rate(),
                opponent_win_rate: data.b_win_rate(),
                advantage: data.advantage(),
            })
            .collect();
        entries.sort_by(|x, y| {
            y.games_played
                .cmp(&x.games_played)
                .then_with(|| x.opponent.cmp(&y.opponent))
        });
        entries
    }

    fn ranked(&self, power: &str) -> Vec<MatchupEntry> {
        self.matrix_for(power)
            .into_iter()
            .filter(|e| e.games_played >= self.min_games)
            .collect()
    }

    /// Opponents `power` does best against, largest advantage first.
    pub fn get_best_matchups(&self, power: &str, limit: usize) -> Vec<MatchupEntry> {
        let mut entries = self.ranked(power);
        entries.sort_by(|x, y| {
            y.advantage
                .total_cmp(&x.advantage)
                .then_with(|| x.opponent.cmp(&y.opponent))
        });
        entries.truncate(limit);
        entries
    }

    /// Opponents `power` does worst against, largest deficit first.
    pub fn get_worst_matchups(&self, power: &str, limit: usize) -> Vec<MatchupEntry> {
        let mut entries = self.ranked(power);
        entries.sort_by(|x, y| {
            x.advantage
                .total_cmp(&y.advantage)
                .then_with(|| x.opponent.cmp(&y.opponent))
        });
        entries.truncate(limit);
        entries
    }

    /// Opponents that beat `power` by at least the counter threshold.
    pub fn get_counters(&self, power: &str) -> Vec<MatchupEntry> {
        self.get_worst_matchups(power, usize::MAX)
            .into_iter()
            .filter(|e| -e.advantage >= self.counter_threshold)
            .collect()
    }

    fn sorted_pairs(&self) -> Vec<(&str, &str, MatchupData)> {
        let mut pairs: Vec<(&str, &str, MatchupData)> = self
            .matrix
            .pairs()
            .map(|((a, b), data)| (self.names.display(a), self.names.display(b), *data))
            .collect();
        pairs.sort_by(|x, y| {
            y.2.games_played
                .cmp(&x.2.games_played)
                .then_with(|| x.0.cmp(y.0))
                .then_with(|| x.1.cmp(y.1))
        });
        pairs
    }

    /// Fixed-width table of pairs with at least the ranking floor of games.
    pub fn summary(&self) -> String {
        render(|out| {
            writeln!(out, "=== Matchup Analysis ===")?;
            writeln!(
                out,
                "Games: {} | Pairs: {} | Min games per pair: {}",
                self.games_recorded,
                self.matrix.len(),
                self.min_games
            )?;
            writeln!(out)?;
            writeln!(
                out,
                "{:<20} {:<20} {:>7} {:>8} {:>8} {:>7} {:>8}",
                "Power A", "Power B", "Games", "A Win%", "B Win%", "Draw%", "Edge"
            )?;
            writeln!(out, "{}", "-".repeat(84))?;
            for (a, b, data) in self.sorted_pairs() {
                if data.games_played < self.min_games {
                    continue;
                }
                writeln!(
                    out,
                    "{:<20} {:<20} {:>7} {:>7.1}% {:>7.1}% {:>6.1}% {:>+8.3}",
                    truncate(a, 20),
                    truncate(b, 20),
                    data.games_played,
                    data.a_win_rate() * 100.0,
                    data.b_win_rate() * 100.0,
                    data.draw_rate() * 100.0,
                    data.advantage()
                )?;
            }
            writeln!(out)?;
            writeln!(
                out,
                "Note: a shared victory credits both powers, so A Win% + B Win% may exceed 100%."
            )?;
            Ok(())
        })
    }

    /// CSV export of every pair.
    pub fn to_csv(&self) -> String {
        render(|out| {
            out.push_str(
                "power_a,power_b,games_played,a_wins,b_wins,draws,neither_wins,a_win_rate,b_win_rate\n",
            );
            for (a, b, data) in self.sorted_pairs() {
                writeln!(
                    out,
                    "{},{},{},{},{},{},{},{:.6},{:.6}",
                    csv_field(a),
                    csv_field(b),
                    data.games_played,
                    data.a_wins,
                    data.b_wins,
                    data.draws,
                    data.neither_wins,
                    data.a_win_rate(),
                    data.b_win_rate()
                )?;
            }
            Ok(())
        })
    }

    /// Pretty JSON array of every pair.
    pub fn to_json(&self) -> Result<String, StatsError> {
        let pairs: Vec<PairExport<'_>> = self
            .sorted_pairs()
            .into_iter()
            .map(|(a, b, data)| PairExport {
                power_a: a,
                power_b: b,
                data,
                a_win_rate: data.a_win_rate(),
                b_win_rate: data.b_win_rate(),
            })
            .collect();
        Ok(serde_json::to_string_pretty(&pairs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_independent() {
        let mut first = MatchupMatrix::new();
        first.record("A", "B", true, false);
        let mut second = MatchupMatrix::new();
        second.record("B", "A", false, true);
        assert_eq!(first, second);
        assert_eq!(first.get("A", "B").a_wins, 1);
        assert_eq!(first.get("B", "A").b_wins, 1);
    }

    #[test]
    fn test_never_met() {
        let analyzer = MatchupAnalyzer::new();
        let data = analyzer.get_matchup("X", "Y");
        assert_eq!(data.games_played, 0);
        assert_eq!(data.a_win_rate(), 0.0);
        assert_eq!(data.b_win_rate(), 0.0);
        assert_eq!(data.draw_rate(), 0.0);
    }

    #[test]
    fn test_draw_credits_both() {
        let mut analyzer = MatchupAnalyzer::new();
        analyzer.record_game(&["A", "B", "C"], &["A", "B"], false);
        let ab = analyzer.get_matchup("A", "B");
        assert_eq!((ab.a_wins, ab.b_wins, ab.draws), (1, 1, 1));
        assert_eq!(ab.a_win_rate() + ab.b_win_rate(), 2.0);

        let ac = analyzer.get_matchup("C", "A");
        assert_eq!((ac.a_wins, ac.b_wins), (0, 1));
    }

    #[test]
    fn test_neither_wins() {
        let mut analyzer = MatchupAnalyzer::new();
        analyzer.record_game(&["A", "B", "C"], &["C"], true);
        assert_eq!(analyzer.get_matchup("A", "B").neither_wins, 1);
    }

    #[test]
    fn test_solo_credits_first_winner() {
        let mut analyzer = MatchupAnalyzer::new();
        analyzer.record_game(&["A", "B"], &["B", "A"], true);
        let data = analyzer.get_matchup("A", "B");
        assert_eq!((data.a_wins, data.b_wins, data.draws), (0, 1, 0));
    }

    #[test]
    fn test_duplicate_and_case_variants_collapse() {
        let mut analyzer = MatchupAnalyzer::new();
        analyzer.record_game(&["Alpha", "alpha", "Beta"], &["ALPHA"], true);
        assert_eq!(analyzer.matrix().len(), 1);
        let data = analyzer.get_matchup("alpha", "beta");
        assert_eq!((data.games_played, data.a_wins), (1, 1));
    }

    #[test]
    fn test_rankings_and_counters() {
        let mut analyzer = MatchupAnalyzer::new();
        for i in 0..40 {
            // Hero beats Minion every time and loses to Nemesis 3 of 4
            analyzer.record_game(&["Hero", "Minion"], &["Hero"], true);
            let winner = if i % 4 == 0 { "Hero" } else { "Nemesis" };
            analyzer.record_game(&["Hero", "Nemesis"], &[winner], true);
        }
        // Rare meets only 5 times, below the floor
        for _ in 0..5 {
            analyzer.record_game(&["Hero", "Rare"], &["Rare"], true);
        }

        let best = analyzer.get_best_matchups("hero", 5);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].opponent, "Minion");
        assert_eq!(best[0].advantage, 1.0);

        let worst = analyzer.get_worst_matchups("Hero", 1);
        assert_eq!(worst[0].opponent, "Nemesis");
        assert!((worst[0].advantage + 0.5).abs() < 1e-12);

        let counters = analyzer.get_counters("Hero");
        assert_eq!(counters.len(), 1);
        assert_eq!(counters[0].opponent, "Nemesis");

        assert_eq!(analyzer.matrix_for("Hero").len(), 3);
        assert!(analyzer.get_counters("Minion").iter().any(|e| e.opponent == "Hero"));
    }

    #[test]
    fn test_record_outcome_skips_errored() {
        let mut analyzer = MatchupAnalyzer::new();
        let errored = GameOutcome::from_powers(&["A", "B"]).errored();
        assert!(!analyzer.record_outcome(&errored).unwrap());

        let shared = GameOutcome::from_powers(&["A", "B", "C"]).with_winners([0, 2]);
        assert!(analyzer.record_outcome(&shared).unwrap());
        assert_eq!(analyzer.games_recorded(), 1);
        assert_eq!(analyzer.get_matchup("A", "C").draws, 1);

        let bad = GameOutcome::from_powers(&["A", "B"]);
        assert!(analyzer.record_outcome(&bad).is_err());
    }

    #[test]
    fn test_exports() {
        let mut analyzer = MatchupAnalyzer::new().with_min_games(1);
        analyzer.record_game(&["Beta", "Alpha"], &["Beta"], true);

        let summary = analyzer.summary();
        assert!(summary.contains("Alpha"));
        assert!(summary.contains("may exceed 100%"));

        let csv = analyzer.to_csv();
        assert_eq!(
            csv.lines().nth(1).unwrap(),
            "Alpha,Beta,1,0,1,0,0,0.000000,1.000000"
        );

        let json: serde_json::Value = serde_json::from_str(&analyzer.to_json().unwrap()).unwrap();
        assert_eq!(json[0]["power_a"], "Alpha");
        assert_eq!(json[0]["b_wins"], 1);
    }
}
