//! Tier classification and balance scoring.
//!
//! The analyzer compares every sufficiently-sampled power against the win
//! rate it would have in a perfectly balanced field, `1 / average player
//! count`, where the average is weighted by how many games were actually
//! played at each table size.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::rating::cumulative::{CumulativeStats, PowerStanding};
use crate::rating::elo::DEFAULT_ELO;
use crate::stats::config::AnalysisConfig;
use crate::stats::statistics::{csv_field, render, truncate};

/// Lower bound of the normalized-win-rate band for each tier.
const TIER_THRESHOLDS: [(f64, Tier); 5] = [
    (1.50, Tier::S),
    (1.25, Tier::A),
    (1.10, Tier::B),
    (0.90, Tier::C),
    (0.75, Tier::D),
];

/// Whole-interval multipliers of the expected rate for outlier detection.
const OVERPOWERED_FACTOR: f64 = 1.25;
const UNDERPOWERED_FACTOR: f64 = 0.75;

/// Performance tier, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Normalized win rate ≥ 1.50.
    S,
    /// ≥ 1.25.
    A,
    /// ≥ 1.10.
    B,
    /// ≥ 0.90.
    C,
    /// ≥ 0.75.
    D,
    /// Below 0.75.
    F,
}

impl Tier {
    /// All tiers, strongest first.
    pub const ALL: [Tier; 6] = [Tier::S, Tier::A, Tier::B, Tier::C, Tier::D, Tier::F];

    /// Tier for a `win_rate / expected` ratio.
    pub fn from_ratio(normalized: f64) -> Tier {
        TIER_THRESHOLDS
            .iter()
            .find(|(threshold, _)| normalized >= *threshold)
            .map(|&(_, tier)| tier)
            .unwrap_or(Tier::F)
    }

    /// One-letter label.
    pub fn label(self) -> &'static str {
        match self {
            Tier::S => "S",
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
            Tier::D => "D",
            Tier::F => "F",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Balance metrics for one power.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerBalance {
    /// Display name.
    pub power: String,
    /// Games the power took part in.
    pub games_played: u64,
    /// Games the power won, solo or shared.
    pub games_won: u64,
    /// `games_won / games_played`.
    pub win_rate: f64,
    /// `solo_wins / games_played`.
    pub solo_rate: f64,
    /// Current Elo rating.
    pub elo_rating: f64,
    /// `win_rate / expected_win_rate`; 1.0 when the expectation is unknown.
    pub normalized_win_rate: f64,
    /// Tier from the normalized win rate.
    pub tier: Tier,
    /// Composite score in `[0, 100]`.
    pub performance_score: f64,
    /// Lower Wilson bound of the win rate.
    pub ci_lower: f64,
    /// Upper Wilson bound of the win rate.
    pub ci_upper: f64,
}

/// Result of a balance analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    /// Games in the underlying stats.
    pub total_games: u64,
    /// Threshold used to exclude small samples.
    pub min_games: u64,
    /// Confidence level of `ci_lower`/`ci_upper`.
    pub confidence: f64,
    /// Win rate of a power in a perfectly balanced field.
    pub expected_win_rate: f64,
    /// Ranked powers, best performance first.
    pub powers: Vec<PowerBalance>,
    /// Powers seen but below `min_games`, sorted by name.
    pub insufficient_sample: Vec<String>,
    /// `max(0, 100 − 100·mean relative deviation − 100·stddev)`.
    pub balance_score: f64,
    /// Gini coefficient of the ranked win rates.
    pub gini_coefficient: f64,
    /// Powers whose whole interval sits above 1.25× expected.
    pub overpowered: Vec<String>,
    /// Powers whose whole interval sits below 0.75× expected.
    pub underpowered: Vec<String>,
}

impl BalanceReport {
    /// Ranked powers grouped by tier. Empty tiers are present with no entries.
    pub fn tier_list(&self) -> BTreeMap<Tier, Vec<&str>> {
        let mut tiers: BTreeMap<Tier, Vec<&str>> =
            Tier::ALL.iter().map(|&t| (t, Vec::new())).collect();
        for p in &self.powers {
            tiers.entry(p.tier).or_default().push(p.power.as_str());
        }
        tiers
    }

    /// Metrics for one ranked power.
    pub fn power(&self, name: &str) -> Option<&PowerBalance> {
        let key = name.trim().to_lowercase();
        self.powers.iter().find(|p| p.power.to_lowercase() == key)
    }

    /// Fixed-width report.
    pub fn summary(&self) -> String {
        render(|out| {
            writeln!(out, "=== Balance Analysis ===")?;
            writeln!(
                out,
                "Games: {} | Ranked powers: {} | Below {} games: {}",
                self.total_games,
                self.powers.len(),
                self.min_games,
                self.insufficient_sample.len()
            )?;
            writeln!(
                out,
                "Expected win rate: {:.1}% | Balance score: {:.1}/100 | Gini: {:.3}",
                self.expected_win_rate * 100.0,
                self.balance_score,
                self.gini_coefficient
            )?;
            writeln!(out)?;
            let ci_header = format!("{:.0}% CI", self.confidence * 100.0);
            writeln!(
                out,
                "{:<4} {:<24} {:>4} {:>7} {:>8} {:>17} {:>6} {:>8} {:>6}",
                "Rank", "Power", "Tier", "Games", "WinRate", ci_header, "Norm", "Elo", "Score"
            )?;
            writeln!(out, "{}", "-".repeat(91))?;
            for (i, p) in self.powers.iter().enumerate() {
                writeln!(
                    out,
                    "{:<4} {:<24} {:>4} {:>7} {:>7.1}% {:>7.1}%-{:>6.1}%  {:>6.2} {:>8.1} {:>6.1}",
                    i + 1,
                    truncate(&p.power, 24),
                    p.tier,
                    p.games_played,
                    p.win_rate * 100.0,
                    p.ci_lower * 100.0,
                    p.ci_upper * 100.0,
                    p.normalized_win_rate,
                    p.elo_rating,
                    p.performance_score
                )?;
            }

            writeln!(out)?;
            for (tier, powers) in self.tier_list() {
                writeln!(out, "{}: {}", tier, powers.join(", "))?;
            }

            writeln!(out)?;
            writeln!(
                out,
                "Overpowered: {}",
                if self.overpowered.is_empty() {
                    "none".to_string()
                } else {
                    self.overpowered.join(", ")
                }
            )?;
            writeln!(
                out,
                "Underpowered: {}",
                if self.underpowered.is_empty() {
                    "none".to_string()
                } else {
                    self.underpowered.join(", ")
                }
            )?;
            Ok(())
        })
    }

    /// CSV export, one row per ranked power.
    pub fn to_csv(&self) -> String {
        render(|out| {
            out.push_str(
                "power,tier,games_played,games_won,win_rate,solo_rate,normalized_win_rate,ci_lower,ci_upper,elo_rating,performance_score\n",
            );
            for p in &self.powers {
                writeln!(
                    out,
                    "{},{},{},{},{:.6},{:.6},{:.4},{:.6},{:.6},{:.2},{:.2}",
                    csv_field(&p.power),
                    p.tier,
                    p.games_played,
                    p.games_won,
                    p.win_rate,
                    p.solo_rate,
                    p.normalized_win_rate,
                    p.ci_lower,
                    p.ci_upper,
                    p.elo_rating,
                    p.performance_score
                )?;
            }
            Ok(())
        })
    }

    /// Pretty JSON export.
    pub fn to_json(&self) -> Result<String, StatsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Classifies powers from a cumulative snapshot.
#[derive(Debug, Clone)]
pub struct BalanceAnalyzer<'a> {
    stats: &'a CumulativeStats,
    min_games: u64,
    confidence: f64,
}

impl<'a> BalanceAnalyzer<'a> {
    /// Analyzer with the default 100-game threshold and 95% intervals.
    pub fn new(stats: &'a CumulativeStats) -> Self {
        Self::from_config(stats, &AnalysisConfig::default())
    }

    /// Analyzer using the thresholds in `config`.
    pub fn from_config(stats: &'a CumulativeStats, config: &AnalysisConfig) -> Self {
        Self {
            stats,
            min_games: config.min_games,
            confidence: config.confidence,
        }
    }

    /// Builder method: set the ranking threshold.
    pub fn with_min_games(mut self, min_games: u64) -> Self {
        self.min_games = min_games;
        self
    }

    /// Expected win rate from the recorded player-count mix; 0 with no games.
    pub fn expected_win_rate(&self) -> f64 {
        self.stats.expected_win_rate().unwrap_or(0.0)
    }

    /// Metrics for `power`, or `None` if unknown or below the threshold.
    pub fn analyze_power(&self, power: &str) -> Option<PowerBalance> {
        let standing = self.stats.power(power)?;
        if standing.games_played < self.min_games {
            return None;
        }
        Some(self.evaluate(standing, self.expected_win_rate()))
    }

    fn evaluate(&self, standing: &PowerStanding, expected: f64) -> PowerBalance {
        let win_rate = standing.win_rate();
        let solo_rate = standing.solo_rate();
        let normalized = if expected > 0.0 {
            win_rate / expected
        } else {
            1.0
        };
        let (ci_lower, ci_upper) = standing.confidence_interval(self.confidence);

        PowerBalance {
            power: standing.name.clone(),
            games_played: standing.games_played,
            games_won: standing.games_won,
            win_rate,
            solo_rate,
            elo_rating: standing.elo_rating(),
            normalized_win_rate: normalized,
            tier: Tier::from_ratio(normalized),
            performance_score: performance_score(win_rate, solo_rate, standing.elo_rating()),
            ci_lower,
            ci_upper,
        }
    }

    /// Run the full analysis.
    pub fn analyze(&self) -> BalanceReport {
        let expected = self.expected_win_rate();

        let mut powers = Vec::new();
        let mut insufficient = Vec::new();
        for standing in self.stats.powers() {
            if standing.games_played >= self.min_games {
                powers.push(self.evaluate(standing, expected));
            } else {
                insufficient.push(standing.name.clone());
            }
        }
        powers.sort_by(|a, b| {
            b.performance_score
                .total_cmp(&a.performance_score)
                .then_with(|| b.win_rate.total_cmp(&a.win_rate))
                .then_with(|| a.power.cmp(&b.power))
        });
        insufficient.sort();

        let win_rates: Vec<f64> = powers.iter().map(|p| p.win_rate).collect();

        let (mut overpowered, mut underpowered) = (Vec::new(), Vec::new());
        if expected > 0.0 {
            for p in &powers {
                if p.ci_lower > OVERPOWERED_FACTOR * expected {
                    overpowered.push(p.power.clone());
                } else if p.ci_upper < UNDERPOWERED_FACTOR * expected {
                    underpowered.push(p.power.clone());
                }
            }
        }

        BalanceReport {
            total_games: self.stats.total_games,
            min_games: self.min_games,
            confidence: self.confidence,
            expected_win_rate: expected,
            balance_score: balance_score(&win_rates, expected),
            gini_coefficient: gini_coefficient(&win_rates),
            powers,
            insufficient_sample: insufficient,
            overpowered,
            underpowered,
        }
    }
}

/// Fixed-weight composite in `[0, 100]`.
///
/// `0.5·(win_rate·200) + 0.3·(solo_rate·100) + 0.2·((elo − 1500)/50) + 10`
pub fn performance_score(win_rate: f64, solo_rate: f64, elo: f64) -> f64 {
    let score = 0.5 * (win_rate * 200.0)
        + 0.3 * (solo_rate * 100.0)
        + 0.2 * ((elo - DEFAULT_ELO) / 50.0)
        + 10.0;
    score.clamp(0.0, 100.0)
}

/// Overall balance in `[0, 100]`; 100 when there is nothing to compare.
pub fn balance_score(win_rates: &[f64], expected: f64) -> f64 {
    if win_rates.is_empty() {
        return 100.0;
    }
    let n = win_rates.len() as f64;

    let mean_deviation = if expected > 0.0 {
        win_rates
            .iter()
            .map(|wr| (wr - expected).abs() / expected)
            .sum::<f64>()
            / n
    } else {
        0.0
    };

    let mean = win_rates.iter().sum::<f64>() / n;
    let variance = win_rates.iter().map(|wr| (wr - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    (100.0 - 100.0 * mean_deviation - 100.0 * std_dev).max(0.0)
}

/// Gini coefficient of a set of non-negative values; 0 for empty or all-zero input.
pub fn gini_coefficient(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len() as f64;
    let total: f64 = sorted.iter().sum();
    if total == 0.0 {
        return 0.0;
    }

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64 + 1.0) * v)
        .sum();

    2.0 * weighted / (n * total) - (n + 1.0) / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::outcome::GameOutcome;

    /// Five-player games where `wins[i]` games are solo-won by power `i`.
    fn field(wins: &[u32]) -> CumulativeStats {
        let powers = ["Alpha", "Beta", "Gamma", "Delta", "Epsilon"];
        let mut stats = CumulativeStats::new();
        for (winner, &count) in wins.iter().enumerate() {
            for _ in 0..count {
                let outcome = GameOutcome::from_powers(&powers).with_winners([winner as u32]);
                stats.record_game(&outcome).unwrap();
            }
        }
        stats
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(Tier::from_ratio(1.50), Tier::S);
        assert_eq!(Tier::from_ratio(1.49), Tier::A);
        assert_eq!(Tier::from_ratio(1.25), Tier::A);
        assert_eq!(Tier::from_ratio(1.10), Tier::B);
        assert_eq!(Tier::from_ratio(1.00), Tier::C);
        assert_eq!(Tier::from_ratio(0.90), Tier::C);
        assert_eq!(Tier::from_ratio(0.80), Tier::D);
        assert_eq!(Tier::from_ratio(0.10), Tier::F);
    }

    #[test]
    fn test_performance_score_formula() {
        // 0.5·80 + 0.3·30 + 0.2·2 + 10
        let score = performance_score(0.4, 0.3, 1600.0);
        assert!((score - 59.4).abs() < 1e-9);
        assert_eq!(performance_score(1.0, 1.0, 2500.0), 100.0);
        assert!((performance_score(0.0, 0.0, 100.0) - 4.4).abs() < 1e-9);
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini_coefficient(&[]), 0.0);
        assert_eq!(gini_coefficient(&[0.0, 0.0]), 0.0);
        assert!(gini_coefficient(&[0.2, 0.2, 0.2, 0.2]).abs() < 1e-12);
        // one holder of everything among four: (n-1)/n
        assert!((gini_coefficient(&[0.0, 0.0, 0.0, 1.0]) - 0.75).abs() < 1e-12);
        assert!(
            (gini_coefficient(&[1.0, 0.0, 0.0, 0.0]) - gini_coefficient(&[0.0, 0.0, 0.0, 1.0]))
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn test_balance_score() {
        assert_eq!(balance_score(&[], 0.2), 100.0);
        assert!((balance_score(&[0.2; 5], 0.2) - 100.0).abs() < 1e-9);
        // mean deviation 1.0 alone drives the score to zero
        assert_eq!(balance_score(&[1.0, 0.0, 0.0, 0.0, 0.0], 0.2), 0.0);
    }

    #[test]
    fn test_balance_score_uses_population_spread() {
        let rates = [0.32, 0.20, 0.20, 0.16, 0.12];
        // mean deviation 0.24, population stddev 0.066933
        assert!((balance_score(&rates, 0.2) - 69.3067).abs() < 1e-4);
        assert!((gini_coefficient(&rates) - 0.176).abs() < 1e-9);

        let report = BalanceAnalyzer::new(&field(&[32, 20, 20, 16, 12]))
            .with_min_games(100)
            .analyze();
        assert_eq!(report.powers.len(), 5);
        assert!((report.balance_score - 69.3067).abs() < 1e-4);
        assert!((report.gini_coefficient - 0.176).abs() < 1e-9);
    }

    #[test]
    fn test_expected_rate_is_weighted() {
        let mut stats = field(&[10, 10, 10, 10, 10]);
        for _ in 0..50 {
            let outcome = GameOutcome::from_powers(&["Alpha", "Beta"]).with_winners([0]);
            stats.record_game(&outcome).unwrap();
        }
        let analyzer = BalanceAnalyzer::new(&stats);
        // 50 five-player and 50 two-player games: 3.5 players on average
        assert!((analyzer.expected_win_rate() - 1.0 / 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_small_samples_excluded() {
        let stats = field(&[10, 10, 10, 10, 10]);
        let report = BalanceAnalyzer::new(&stats).analyze();
        assert!(report.powers.is_empty());
        assert_eq!(report.insufficient_sample.len(), 5);
        assert_eq!(report.balance_score, 100.0);
        assert!(BalanceAnalyzer::new(&stats).analyze_power("Alpha").is_none());
        assert!(BalanceAnalyzer::new(&stats)
            .with_min_games(50)
            .analyze_power("Alpha")
            .is_some());
    }

    #[test]
    fn test_dominant_power_flagged() {
        // 500 games: Alpha wins 300, the rest split 200
        let stats = field(&[300, 50, 50, 50, 50]);
        let report = BalanceAnalyzer::new(&stats).analyze();

        assert_eq!(report.powers.len(), 5);
        assert!((report.expected_win_rate - 0.2).abs() < 1e-12);

        let alpha = report.power("alpha").unwrap();
        assert_eq!(alpha.tier, Tier::S);
        assert!((alpha.normalized_win_rate - 3.0).abs() < 1e-9);
        assert_eq!(report.powers[0].power, "Alpha");
        assert_eq!(report.overpowered, vec!["Alpha".to_string()]);
        assert_eq!(report.underpowered.len(), 4);

        let tiers = report.tier_list();
        assert_eq!(tiers[&Tier::S], vec!["Alpha"]);
        assert_eq!(tiers[&Tier::F].len(), 4);

        // four at 0.1 and one at 0.6
        assert!((report.gini_coefficient - 0.4).abs() < 1e-9);
        assert!(report.balance_score < 50.0);
    }

    #[test]
    fn test_even_field_is_balanced() {
        let stats = field(&[100, 100, 100, 100, 100]);
        let report = BalanceAnalyzer::new(&stats).analyze();
        assert!(report.overpowered.is_empty());
        assert!(report.underpowered.is_empty());
        assert!(report.powers.iter().all(|p| p.tier == Tier::C));
        assert!(report.balance_score > 99.0);
        assert!(report.gini_coefficient.abs() < 1e-9);
    }

    #[test]
    fn test_report_exports() {
        let stats = field(&[300, 50, 50, 50, 50]);
        let report = BalanceAnalyzer::new(&stats).analyze();
        let summary = report.summary();
        assert!(summary.contains("=== Balance Analysis ==="));
        assert!(summary.contains("S: Alpha"));
        assert!(summary.contains("Overpowered: Alpha"));

        let csv = report.to_csv();
        assert_eq!(csv.lines().count(), 6);
        assert!(csv.lines().nth(1).unwrap().starts_with("Alpha,S,500,300,"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["powers"][0]["tier"], "S");
    }

    #[test]
    fn test_summary_header_follows_confidence() {
        let stats = field(&[300, 50, 50, 50, 50]);
        assert!(BalanceAnalyzer::new(&stats).analyze().summary().contains("95% CI"));

        for (level, header) in [(0.90, "90% CI"), (0.99, "99% CI")] {
            let config = AnalysisConfig::default().with_confidence(level);
            let report = BalanceAnalyzer::from_config(&stats, &config).analyze();
            assert_eq!(report.confidence, level);
            let summary = report.summary();
            assert!(summary.contains(header));
            assert!(!summary.contains("95% CI"));
        }

        let config = AnalysisConfig::default().with_confidence(0.99);
        let wide = BalanceAnalyzer::from_config(&stats, &config)
            .analyze_power("Beta")
            .unwrap();
        let narrow = BalanceAnalyzer::new(&stats).analyze_power("Beta").unwrap();
        assert!(wide.ci_upper - wide.ci_lower > narrow.ci_upper - narrow.ci_lower);
    }

    #[test]
    fn test_unknown_expectation_is_neutral() {
        let stats = CumulativeStats::new();
        let analyzer = BalanceAnalyzer::new(&stats).with_min_games(0);
        assert_eq!(analyzer.expected_win_rate(), 0.0);
        let report = analyzer.analyze();
        assert!(report.powers.is_empty());
        assert_eq!(report.gini_coefficient, 0.0);
    }
}
