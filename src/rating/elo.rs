//! Multiplayer Elo.
//!
//! Standard Elo compares two players. Here every participant is scored
//! against each opponent individually and the pairwise expectations are
//! averaged, so the expected score stays in `[0, 1]` whatever the table
//! size. A shared win splits the single point between the winners.

use serde::{Deserialize, Serialize};

/// Rating assigned to a power on first sight.
pub const DEFAULT_ELO: f64 = 1500.0;

/// Lowest rating a power can hold.
pub const MIN_ELO: f64 = 100.0;

/// Highest rating a power can hold.
pub const MAX_ELO: f64 = 2500.0;

/// Default K-factor.
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Bound on the base-10 exponent in [`EloCalculator::expected_score`].
const MAX_EXPONENT: f64 = 700.0;

/// Stateless Elo delta calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EloCalculator {
    k_factor: f64,
}

impl Default for EloCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_K_FACTOR)
    }
}

impl EloCalculator {
    /// Create a calculator with the given K-factor.
    pub fn new(k_factor: f64) -> Self {
        Self { k_factor }
    }

    /// The K-factor.
    pub fn k_factor(&self) -> f64 {
        self.k_factor
    }

    /// Probability that a player rated `elo_a` beats one rated `elo_b`.
    ///
    /// The exponent is clamped so very large rating gaps cannot overflow.
    pub fn expected_score(elo_a: f64, elo_b: f64) -> f64 {
        let exponent = ((elo_b - elo_a) / 400.0).clamp(-MAX_EXPONENT, MAX_EXPONENT);
        1.0 / (1.0 + 10f64.powf(exponent))
    }

    /// Rating deltas for one game.
    ///
    /// `ratings[i]` is the pre-game rating of participant `i`; `winners`
    /// holds indices into `ratings`. Out-of-range and repeated winner
    /// indices are ignored. With fewer than two participants every delta is
    /// zero. Deltas are not clamped; see [`EloRating::apply`].
    pub fn calculate_multiplayer_changes(&self, ratings: &[f64], winners: &[usize]) -> Vec<f64> {
        let n = ratings.len();
        if n < 2 {
            return vec![0.0; n];
        }

        let mut is_winner = vec![false; n];
        for &w in winners {
            if w < n {
                is_winner[w] = true;
            }
        }
        let num_winners = is_winner.iter().filter(|&&w| w).count();

        (0..n)
            .map(|i| {
                let expected: f64 = (0..n)
                    .filter(|&j| j != i)
                    .map(|j| Self::expected_score(ratings[i], ratings[j]))
                    .sum::<f64>()
                    / (n - 1) as f64;

                let actual = if is_winner[i] {
                    1.0 / num_winners as f64
                } else {
                    0.0
                };

                self.k_factor * (actual - expected)
            })
            .collect()
    }
}

/// A bounded rating with its historical peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EloRating {
    rating: f64,
    peak: f64,
}

impl Default for EloRating {
    fn default() -> Self {
        Self::new(DEFAULT_ELO)
    }
}

impl EloRating {
    /// A rating at `value`, clamped into range. The peak starts equal to it.
    pub fn new(value: f64) -> Self {
        let rating = clamp_elo(value);
        Self { rating, peak: rating }
    }

    /// Restore a persisted rating. The peak is never below the rating.
    pub fn with_peak(value: f64, peak: f64) -> Self {
        let rating = clamp_elo(value);
        Self {
            rating,
            peak: clamp_elo(peak).max(rating),
        }
    }

    /// Current rating.
    pub fn rating(&self) -> f64 {
        self.rating
    }

    /// Highest rating ever held.
    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// Apply a delta, clamp into `[MIN_ELO, MAX_ELO]` and update the peak.
    pub fn apply(&mut self, delta: f64) {
        self.rating = clamp_elo(self.rating + delta);
        if self.rating > self.peak {
            self.peak = self.rating;
        }
    }
}

/// Clamp a raw rating into `[MIN_ELO, MAX_ELO]`. NaN resets to the default.
pub fn clamp_elo(value: f64) -> f64 {
    if value.is_nan() {
        return DEFAULT_ELO;
    }
    value.clamp(MIN_ELO, MAX_ELO)
}
