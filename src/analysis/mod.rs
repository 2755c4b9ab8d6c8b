//! Cross-power analysis built on recorded outcomes.
//!
//! - [`balance`]: tiers, performance scores, balance score and Gini
//! - [`matchup`]: head-to-head records between opposing powers
//! - [`synergy`]: ally-pair records and opposing-pair counters
//!
//! Pairwise analyzers store every unordered pair once, under the sorted
//! pair of normalized power ids:
//!
//! ```text
//! record("Gamma", "Alpha")  ->  key ("alpha", "gamma"), swapped = true
//! get("Alpha", "Gamma")     ->  stored slot as-is
//! get("Gamma", "Alpha")     ->  stored slot with a/b sides swapped
//! ```

pub mod balance;
pub mod matchup;
pub mod synergy;

pub use balance::{
    balance_score, gini_coefficient, performance_score, BalanceAnalyzer, BalanceReport,
    PowerBalance, Tier,
};
pub use matchup::{MatchupAnalyzer, MatchupData, MatchupEntry, MatchupMatrix};
pub use synergy::{CounterData, CounterEntry, SynergyAnalyzer, SynergyData, SynergyEntry};

use rustc_hash::FxHashMap;

use crate::stats::record::normalize_power_id;

/// Sorted pair of normalized power ids.
pub(crate) type PairKey = (String, String);

/// Canonical key for `(a, b)` and whether the arguments were swapped to
/// produce it.
pub(crate) fn pair_key(a: &str, b: &str) -> (PairKey, bool) {
    let (a, b) = (normalize_power_id(a), normalize_power_id(b));
    if a <= b {
        ((a, b), false)
    } else {
        ((b, a), true)
    }
}

/// Display names keyed by normalized id. The first casing seen wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PowerNames {
    names: FxHashMap<String, String>,
}

impl PowerNames {
    /// Register `raw` and return its normalized id.
    pub(crate) fn intern(&mut self, raw: &str) -> String {
        let key = normalize_power_id(raw);
        self.names
            .entry(key.clone())
            .or_insert_with(|| raw.trim().to_string());
        key
    }

    /// Display name for a normalized id, falling back to the id itself.
    pub(crate) fn display<'a>(&'a self, key: &'a str) -> &'a str {
        self.names.get(key).map(String::as_str).unwrap_or(key)
    }
}

/// Deduplicated normalized ids, in first-seen order.
pub(crate) fn unique_ids<S: AsRef<str>>(names: &mut PowerNames, powers: &[S]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(powers.len());
    for p in powers {
        let id = names.intern(p.as_ref());
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}
