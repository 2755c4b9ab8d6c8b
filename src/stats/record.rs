//! Per-power accumulators and the significance helpers built on them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stats::outcome::{AllianceStats, EncounterStats};

/// z-scores for the supported two-sided confidence levels.
const Z_SCORES: [(f64, f64); 3] = [(0.90, 1.645), (0.95, 1.96), (0.99, 2.576)];

/// z-score used when the requested confidence level is not tabulated.
const DEFAULT_Z: f64 = 1.96;

/// Canonical map key for a power id.
///
/// Lookups are case-insensitive; the first spelling seen is kept for
/// display on the record itself, and merges keep the smaller spelling.
pub fn normalize_power_id(power: &str) -> String {
    power.trim().to_lowercase()
}

fn tabulated_z(confidence: f64) -> Option<f64> {
    Z_SCORES
        .iter()
        .find(|(level, _)| (level - confidence).abs() < 1e-9)
        .map(|&(_, z)| z)
}

/// z-score for a confidence level (0.90, 0.95 or 0.99).
pub fn z_score(confidence: f64) -> f64 {
    tabulated_z(confidence).unwrap_or(DEFAULT_Z)
}

/// Whether `confidence` is one of the tabulated levels.
pub fn is_supported_confidence(confidence: f64) -> bool {
    tabulated_z(confidence).is_some()
}

/// Keep the lexicographically smaller of two non-empty display names.
pub(crate) fn merge_display_name(name: &mut String, other: &str) {
    if !other.is_empty() && (name.is_empty() || other < name.as_str()) {
        *name = other.to_string();
    }
}

/// Wilson score interval for a binomial proportion.
///
/// Returns `(lower, upper)` clamped to `[0, 1]`, or `(0, 0)` when there are
/// no trials.
pub fn confidence_interval(wins: u64, total: u64, confidence: f64) -> (f64, f64) {
    if total == 0 {
        return (0.0, 0.0);
    }

    let n = total as f64;
    let p = (wins.min(total)) as f64 / n;
    let z = z_score(confidence);
    let z2 = z * z;

    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let margin = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;

    (
        (center - margin).clamp(0.0, 1.0),
        (center + margin).clamp(0.0, 1.0),
    )
}

/// Where an expected rate sits relative to an observed confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The whole interval is above the expected rate.
    Above,
    /// The whole interval is below the expected rate.
    Below,
    /// The expected rate is inside the interval.
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Above => "above",
            Direction::Below => "below",
            Direction::Neutral => "neutral",
        };
        write!(f, "{}", s)
    }
}

/// Accumulated counters for one power.
///
/// Counters only grow, except through [`PowerRecord::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerRecord {
    /// Display name (first-seen casing).
    pub name: String,
    /// Games this power was seated in (errored games excluded).
    pub games_played: u64,
    /// Games this power was credited with a win.
    pub games_won: u64,
    /// Wins with no co-winner.
    pub solo_wins: u64,
    /// Wins shared with at least one other player.
    pub shared_wins: u64,
    /// Wins through an alternate victory condition.
    pub alternate_wins: u64,
    /// Sum of game lengths in turns.
    pub total_turns: u64,
    /// Sum of final colony counts.
    pub total_colonies: u64,
    /// Sum of power activations.
    pub power_activations: u64,
    /// Encounters initiated.
    pub encounters_offense: u64,
    /// Initiated encounters won.
    pub encounter_wins_offense: u64,
    /// Encounters defended.
    pub encounters_defense: u64,
    /// Defended encounters won.
    pub encounter_wins_defense: u64,
    /// Times joined as an offensive ally.
    pub alliances_offense: u64,
    /// Times joined as a defensive ally.
    pub alliances_defense: u64,
    /// Encounters won while allied.
    pub alliance_wins: u64,
    /// Games played, bucketed by the number of players in the game.
    pub games_by_player_count: BTreeMap<usize, u64>,
    /// Games won, bucketed by the number of players in the game.
    pub wins_by_player_count: BTreeMap<usize, u64>,
}

impl PowerRecord {
    /// Create an empty record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
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

    /// Fraction of wins that were shared; `None` without wins.
    pub fn shared_win_share(&self) -> Option<f64> {
        (self.games_won > 0).then(|| ratio(self.shared_wins, self.games_won))
    }

    /// Mean game length in turns; `None` with no games.
    pub fn avg_turns(&self) -> Option<f64> {
        (self.games_played > 0).then(|| ratio(self.total_turns, self.games_played))
    }

    /// Mean final colony count; `None` with no games.
    pub fn avg_colonies(&self) -> Option<f64> {
        (self.games_played > 0).then(|| ratio(self.total_colonies, self.games_played))
    }

    /// Offensive encounter success rate; `None` without offensive encounters.
    pub fn offense_win_rate(&self) -> Option<f64> {
        (self.encounters_offense > 0)
            .then(|| ratio(self.encounter_wins_offense, self.encounters_offense))
    }

    /// Defensive encounter success rate; `None` without defensive encounters.
    pub fn defense_win_rate(&self) -> Option<f64> {
        (self.encounters_defense > 0)
            .then(|| ratio(self.encounter_wins_defense, self.encounters_defense))
    }

    /// Win rate restricted to games with `players` seats; `None` if no such games.
    pub fn win_rate_at(&self, players: usize) -> Option<f64> {
        let played = self.games_by_player_count.get(&players).copied()?;
        let won = self.wins_by_player_count.get(&players).copied().unwrap_or(0);
        Some(ratio(won, played))
    }

    /// Wilson interval for this power's win rate.
    pub fn confidence_interval(&self, confidence: f64) -> (f64, f64) {
        confidence_interval(self.games_won, self.games_played, confidence)
    }

    /// Test whether `expected_rate` lies outside the win-rate interval.
    pub fn is_significantly_different(
        &self,
        expected_rate: f64,
        confidence: f64,
    ) -> (bool, Direction) {
        let (lower, upper) = self.confidence_interval(confidence);
        if expected_rate < lower {
            (true, Direction::Above)
        } else if expected_rate > upper {
            (true, Direction::Below)
        } else {
            (false, Direction::Neutral)
        }
    }

    /// Win rate relative to `expected_rate`; 1.0 when either side is empty.
    pub fn power_rating(&self, expected_rate: f64) -> f64 {
        if expected_rate == 0.0 || self.games_played == 0 {
            return 1.0;
        }
        self.win_rate() / expected_rate
    }

    pub(crate) fn add_encounters(&mut self, stats: &EncounterStats) {
        self.encounters_offense += stats.offense;
        self.encounter_wins_offense += stats.offense_wins;
        self.encounters_defense += stats.defense;
        self.encounter_wins_defense += stats.defense_wins;
    }

    pub(crate) fn add_alliances(&mut self, stats: &AllianceStats) {
        self.alliances_offense += stats.joined_offense;
        self.alliances_defense += stats.joined_defense;
        self.alliance_wins += stats.alliance_wins;
    }

    /// Add every counter of `other` into this record.
    ///
    /// When the two records spell the power differently, the
    /// lexicographically smaller non-empty name is kept, so merge order
    /// never changes the result.
    pub fn merge(&mut self, other: &PowerRecord) {
        merge_display_name(&mut self.name, &other.name);
        self.games_played += other.games_played;
        self.games_won += other.games_won;
        self.solo_wins += other.solo_wins;
        self.shared_wins += other.shared_wins;
        self.alternate_wins += other.alternate_wins;
        self.total_turns += other.total_turns;
        self.total_colonies += other.total_colonies;
        self.power_activations += other.power_activations;
        self.encounters_offense += other.encounters_offense;
        self.encounter_wins_offense += other.encounter_wins_offense;
        self.encounters_defense += other.encounters_defense;
        self.encounter_wins_defense += other.encounter_wins_defense;
        self.alliances_offense += other.alliances_offense;
        self.alliances_defense += other.alliances_defense;
        self.alliance_wins += other.alliance_wins;
        merge_counts(&mut self.games_by_player_count, &other.games_by_player_count);
        merge_counts(&mut self.wins_by_player_count, &other.wins_by_player_count);
    }
}

/// `num / den`, or 0 when `den` is 0.
pub(crate) fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub(crate) fn merge_counts(into: &mut BTreeMap<usize, u64>, from: &BTreeMap<usize, u64>) {
    for (&k, &v) in from {
        *into.entry(k).or_insert(0) += v;
    }
}

/// Render an optional rate as a percentage, or "N/A" when there is no data.
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "N/A".to_string(),
    }
}
