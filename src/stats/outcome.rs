//! Match outcome records.
//!
//! A [`GameOutcome`] is the only thing the match engine hands to this crate.
//! It describes one completed (or aborted) match: who sat where, which
//! power each seat played, who won, and optional per-player detail counters.
//!
//! Outcomes are validated once at ingestion via [`GameOutcome::validate`];
//! every sink in the crate calls it before touching a counter.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::OutcomeError;

/// Seat identifier inside a single match.
pub type PlayerId = u32;

/// Offense/defense encounter counters for one player in one match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterStats {
    /// Encounters the player initiated.
    #[serde(default)]
    pub offense: u64,
    /// Initiated encounters the player won.
    #[serde(default)]
    pub offense_wins: u64,
    /// Encounters where the player was the defender.
    #[serde(default)]
    pub defense: u64,
    /// Defended encounters the player won.
    #[serde(default)]
    pub defense_wins: u64,
}

/// Alliance counters for one player in one match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceStats {
    /// Times the player joined an encounter as an offensive ally.
    #[serde(default)]
    pub joined_offense: u64,
    /// Times the player joined an encounter as a defensive ally.
    #[serde(default)]
    pub joined_defense: u64,
    /// Encounters won while allied.
    #[serde(default)]
    pub alliance_wins: u64,
}

/// Normalized description of one match, produced by the match engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameOutcome {
    /// Number of seated players (at least 2).
    pub num_players: usize,

    /// Winning players. Empty only when `errored` is set.
    #[serde(default)]
    pub winners: Vec<PlayerId>,

    /// Player -> power id, one entry per player.
    pub alien_map: BTreeMap<PlayerId, String>,

    /// Turns played before the game ended.
    #[serde(default)]
    pub turn_count: u32,

    /// Player -> colonies held at the end.
    #[serde(default)]
    pub final_colonies: BTreeMap<PlayerId, u32>,

    /// The game was won through an alternate victory condition.
    #[serde(default)]
    pub alternate_win: bool,

    /// The engine stopped the game at its turn limit.
    #[serde(default)]
    pub timed_out: bool,

    /// The engine failed mid-game; only game-level counters are updated.
    #[serde(default)]
    pub errored: bool,

    /// Player -> number of power activations.
    #[serde(default)]
    pub power_activations: BTreeMap<PlayerId, u64>,

    /// Player -> offense/defense encounter counters.
    #[serde(default)]
    pub encounter_stats: BTreeMap<PlayerId, EncounterStats>,

    /// Player -> alliance counters.
    #[serde(default)]
    pub alliance_stats: BTreeMap<PlayerId, AllianceStats>,

    /// Ally pairs observed during the match.
    #[serde(default)]
    pub alliances: Vec<(PlayerId, PlayerId)>,
}

impl GameOutcome {
    /// Start an outcome from `(player, power)` seats.
    pub fn new<I, S>(seats: I) -> Self
    where
        I: IntoIterator<Item = (PlayerId, S)>,
        S: Into<String>,
    {
        let alien_map: BTreeMap<PlayerId, String> =
            seats.into_iter().map(|(p, s)| (p, s.into())).collect();
        Self {
            num_players: alien_map.len(),
            alien_map,
            ..Default::default()
        }
    }

    /// Seat powers in order, assigning player ids `0..n`.
    pub fn from_powers<S: AsRef<str>>(powers: &[S]) -> Self {
        Self::new(
            powers
                .iter()
                .enumerate()
                .map(|(i, p)| (i as PlayerId, p.as_ref().to_string())),
        )
    }

    /// Builder method: set the winners.
    pub fn with_winners(mut self, winners: impl IntoIterator<Item = PlayerId>) -> Self {
        self.winners = winners.into_iter().collect();
        self
    }

    /// Builder method: set the turn count.
    pub fn with_turns(mut self, turns: u32) -> Self {
        self.turn_count = turns;
        self
    }

    /// Builder method: mark the game as errored.
    pub fn errored(mut self) -> Self {
        self.errored = true;
        self
    }

    /// Builder method: mark the game as timed out.
    pub fn timed_out(mut self) -> Self {
        self.timed_out = true;
        self
    }

    /// Builder method: record an ally pair.
    pub fn with_alliance(mut self, a: PlayerId, b: PlayerId) -> Self {
        self.alliances.push((a, b));
        self
    }

    /// Decode and validate an outcome from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, OutcomeError> {
        let outcome: Self =
            serde_json::from_str(json).map_err(|e| OutcomeError::Decode(e.to_string()))?;
        outcome.validate()?;
        Ok(outcome)
    }

    /// Check the structural invariants of the record.
    ///
    /// Errored games may omit winners, but any winner listed must still be
    /// seated.
    pub fn validate(&self) -> Result<(), OutcomeError> {
        if self.num_players < 2 {
            return Err(OutcomeError::TooFewPlayers(self.num_players));
        }

        if self.alien_map.len() != self.num_players {
            return Err(OutcomeError::PlayerCountMismatch {
                expected: self.num_players,
                actual: self.alien_map.len(),
            });
        }

        if !self.errored && self.winners.is_empty() {
            return Err(OutcomeError::NoWinners);
        }

        let mut seen = BTreeSet::new();
        for &winner in &self.winners {
            if !self.alien_map.contains_key(&winner) {
                return Err(OutcomeError::UnknownWinner(winner));
            }
            if !seen.insert(winner) {
                return Err(OutcomeError::DuplicateWinner(winner));
            }
        }

        Ok(())
    }

    /// Whether exactly one player was credited with the win.
    pub fn is_solo_victory(&self) -> bool {
        self.winners.len() == 1
    }

    /// Whether more than one player was credited with the win.
    pub fn is_shared_victory(&self) -> bool {
        self.winners.len() > 1
    }

    /// Whether `player` is among the winners.
    pub fn is_winner(&self, player: PlayerId) -> bool {
        self.winners.contains(&player)
    }

    /// Power ids in seat order.
    pub fn powers(&self) -> Vec<&str> {
        self.alien_map.values().map(String::as_str).collect()
    }

    /// Power ids of the winners.
    pub fn winning_powers(&self) -> Vec<&str> {
        self.winners
            .iter()
            .filter_map(|p| self.alien_map.get(p))
            .map(String::as_str)
            .collect()
    }

    /// Ally pairs mapped to power ids. Pairs naming unseated players or a
    /// player allied with itself are dropped.
    pub fn ally_powers(&self) -> Vec<(&str, &str)> {
        self.alliances
            .iter()
            .filter(|(a, b)| a != b)
            .filter_map(|(a, b)| {
                let pa = self.alien_map.get(a)?;
                let pb = self.alien_map.get(b)?;
                Some((pa.as_str(), pb.as_str()))
            })
            .collect()
    }
}
