//! Match engines.
//!
//! The analytics core never plays games itself. An engine turns a list of
//! seated powers into a [`GameOutcome`]; everything downstream only sees
//! that record.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;

use crate::stats::outcome::{EncounterStats, GameOutcome, PlayerId};
use crate::stats::record::normalize_power_id;

/// Anything that can play one match between seated powers.
///
/// Engines are shared across rayon workers, so all per-game randomness
/// must come from the supplied `rng`.
pub trait MatchEngine: Send + Sync {
    /// Play one match. `seats[i]` is the power of player `i`.
    fn play(&self, seats: &[String], rng: &mut StdRng) -> GameOutcome;
}

/// A stand-in engine that picks winners in proportion to per-power
/// strength.
///
/// ```text
/// P(seat i wins) = strength(i) / Σ strength
/// shared win     -> a second winner drawn from the rest, allied to the first
/// ```
///
/// Powers without an explicit strength have strength 1.0.
#[derive(Debug, Clone)]
pub struct SyntheticEngine {
    strengths: FxHashMap<String, f64>,
    shared_win_chance: f64,
    alliance_chance: f64,
    alternate_win_chance: f64,
    timeout_chance: f64,
    error_chance: f64,
    min_turns: u32,
    max_turns: u32,
}

impl Default for SyntheticEngine {
    fn default() -> Self {
        Self {
            strengths: FxHashMap::default(),
            shared_win_chance: 0.2,
            alliance_chance: 0.3,
            alternate_win_chance: 0.05,
            timeout_chance: 0.02,
            error_chance: 0.0,
            min_turns: 8,
            max_turns: 40,
        }
    }
}

impl SyntheticEngine {
    /// Engine where every power is equally strong.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set one power's relative strength.
    ///
    /// Non-finite or negative values are treated as zero.
    pub fn with_strength(mut self, power: &str, strength: f64) -> Self {
        let strength = if strength.is_finite() { strength.max(0.0) } else { 0.0 };
        self.strengths.insert(normalize_power_id(power), strength);
        self
    }

    /// Builder method: chance that a game ends in a shared victory.
    pub fn with_shared_win_chance(mut self, p: f64) -> Self {
        self.shared_win_chance = probability(p);
        self
    }

    /// Builder method: chance that a solo game still records an alliance.
    pub fn with_alliance_chance(mut self, p: f64) -> Self {
        self.alliance_chance = probability(p);
        self
    }

    /// Builder method: chance that a solo win is an alternate victory.
    pub fn with_alternate_win_chance(mut self, p: f64) -> Self {
        self.alternate_win_chance = probability(p);
        self
    }

    /// Builder method: chance that a game hits the turn limit.
    pub fn with_timeout_chance(mut self, p: f64) -> Self {
        self.timeout_chance = probability(p);
        self
    }

    /// Builder method: chance that a game aborts.
    pub fn with_error_chance(mut self, p: f64) -> Self {
        self.error_chance = probability(p);
        self
    }

    /// Builder method: bounds on the turn count of a finished game.
    pub fn with_turn_range(mut self, min_turns: u32, max_turns: u32) -> Self {
        self.min_turns = min_turns.min(max_turns);
        self.max_turns = max_turns.max(min_turns);
        self
    }

    /// Relative strength of `power`.
    pub fn strength(&self, power: &str) -> f64 {
        self.strengths
            .get(&normalize_power_id(power))
            .copied()
            .unwrap_or(1.0)
    }

    /// Draw a seat in proportion to strength, uniformly if every candidate
    /// has zero strength.
    fn pick_weighted(&self, seats: &[String], candidates: &[usize], rng: &mut StdRng) -> usize {
        let weights: Vec<f64> = candidates.iter().map(|&i| self.strength(&seats[i])).collect();
        let idx = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..candidates.len()),
        };
        candidates[idx]
    }
}

impl MatchEngine for SyntheticEngine {
    fn play(&self, seats: &[String], rng: &mut StdRng) -> GameOutcome {
        let mut outcome = GameOutcome::from_powers(seats);
        let n = seats.len();
        if n < 2 {
            return outcome;
        }

        if rng.gen_bool(self.error_chance) {
            outcome.turn_count = rng.gen_range(1..=self.max_turns.max(1));
            return outcome.errored();
        }

        let all: Vec<usize> = (0..n).collect();
        let first = self.pick_weighted(seats, &all, rng);
        let mut winners = vec![first];

        if rng.gen_bool(self.shared_win_chance) {
            let rest: Vec<usize> = all.iter().copied().filter(|&i| i != first).collect();
            let second = self.pick_weighted(seats, &rest, rng);
            winners.push(second);
            outcome.alliances.push((first as PlayerId, second as PlayerId));
        } else if n > 2 && rng.gen_bool(self.alliance_chance) {
            let pair: Vec<usize> = all.choose_multiple(rng, 2).copied().collect();
            outcome.alliances.push((pair[0] as PlayerId, pair[1] as PlayerId));
        }

        outcome.winners = winners.iter().map(|&i| i as PlayerId).collect();

        if rng.gen_bool(self.timeout_chance) {
            outcome.timed_out = true;
            outcome.turn_count = self.max_turns;
        } else {
            outcome.turn_count = rng.gen_range(self.min_turns..=self.max_turns);
            outcome.alternate_win = winners.len() == 1 && rng.gen_bool(self.alternate_win_chance);
        }

        let turns = u64::from(outcome.turn_count.max(1));
        for player in 0..n {
            let id = player as PlayerId;
            let won = winners.contains(&player);

            let colonies = if won { 5 } else { rng.gen_range(0..5) };
            outcome.final_colonies.insert(id, colonies);
            outcome
                .power_activations
                .insert(id, rng.gen_range(0..=turns / 2));

            let offense = (turns / n as u64).max(1);
            let defense = rng.gen_range(0..=offense);
            let bias = if won { 0.65 } else { 0.4 };
            outcome.encounter_stats.insert(
                id,
                EncounterStats {
                    offense,
                    offense_wins: (0..offense).filter(|_| rng.gen_bool(bias)).count() as u64,
                    defense,
                    defense_wins: (0..defense).filter(|_| rng.gen_bool(bias)).count() as u64,
                },
            );
        }

        let alliances = outcome.alliances.clone();
        for (a, b) in alliances {
            let allied_win = outcome.is_winner(a) && outcome.is_winner(b);
            for player in [a, b] {
                let stats = outcome.alliance_stats.entry(player).or_default();
                stats.joined_offense += 1;
                stats.joined_defense += u64::from(rng.gen_bool(0.5));
                stats.alliance_wins += u64::from(allied_win);
            }
        }

        outcome
    }
}

fn probability(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
