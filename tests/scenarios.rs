//! Scripted end-to-end scenarios over the public API.

use power_analytics::analysis::{BalanceAnalyzer, MatchupAnalyzer, SynergyAnalyzer, Tier};
use power_analytics::rating::{CumulativeStats, DEFAULT_ELO, MAX_ELO, MIN_ELO};
use power_analytics::sim::{SimulationConfig, SimulationRunner, SyntheticEngine};
use power_analytics::stats::{confidence_interval, Direction, GameOutcome, Statistics};

const FIVE: [&str; 5] = ["Alpha", "Beta", "Gamma", "Delta", "Epsilon"];

/// 200 five-player games: Alpha solo-wins 80, the others 30 each.
fn alpha_heavy_games() -> Vec<GameOutcome> {
    let mut outcomes = Vec::new();
    for i in 0..200u32 {
        let winner = if i < 80 { 0 } else { 1 + (i % 4) };
        outcomes.push(
            GameOutcome::from_powers(&FIVE)
                .with_winners([winner])
                .with_turns(15 + i % 10),
        );
    }
    outcomes
}

#[test]
fn alpha_is_significantly_above_expectation() {
    let mut stats = Statistics::new();
    for outcome in alpha_heavy_games() {
        stats.record_game(&outcome).unwrap();
    }

    assert_eq!(stats.total_games, 200);
    assert_eq!(stats.win_rate("Alpha"), Some(0.40));
    assert_eq!(stats.expected_win_rate(), Some(0.20));

    let alpha = stats.record("alpha").unwrap();
    assert_eq!(
        alpha.is_significantly_different(0.20, 0.95),
        (true, Direction::Above)
    );
    assert!((alpha.power_rating(0.20) - 2.0).abs() < 1e-12);
    assert_eq!(alpha.power_rating(0.0), 1.0);

    let beta = stats.record("Beta").unwrap();
    assert_eq!(beta.win_rate(), 0.15);
    assert!(!beta.is_significantly_different(0.20, 0.95).0);
}

#[test]
fn fixed_sole_winner() {
    let mut stats = Statistics::new();
    for _ in 0..25 {
        let outcome = GameOutcome::from_powers(&["Winner", "Loser", "Other"]).with_winners([0]);
        stats.record_game(&outcome).unwrap();
    }
    assert_eq!(stats.win_rate("Winner"), Some(1.0));
    assert_eq!(stats.win_rate("Loser"), Some(0.0));
    assert_eq!(stats.win_rate("Other"), Some(0.0));
    assert_eq!(stats.win_rate("Absent"), None);
}

#[test]
fn errored_game_only_touches_game_counters() {
    let mut stats = Statistics::new();
    let completed = GameOutcome::from_powers(&["A", "B"]).with_winners([0]);
    stats.record_game(&completed).unwrap();
    let before_a = stats.record("A").cloned();
    let before_b = stats.record("B").cloned();

    let errored = GameOutcome::from_powers(&["A", "B", "C"]).errored();
    stats.record_game(&errored).unwrap();

    assert_eq!(stats.total_games, 2);
    assert_eq!(stats.error_count, 1);
    assert_eq!(stats.record("A").cloned(), before_a);
    assert_eq!(stats.record("B").cloned(), before_b);
    assert!(stats.record("C").is_none());

    let mut cumulative = CumulativeStats::new();
    cumulative.record_game(&errored).unwrap();
    assert_eq!(cumulative.total_games, 1);
    assert_eq!(cumulative.errors, 1);
    assert_eq!(cumulative.num_powers(), 0);
}

#[test]
fn merge_with_empty_is_identity() {
    let mut stats = Statistics::new();
    for outcome in alpha_heavy_games() {
        stats.record_game(&outcome).unwrap();
    }
    let before = stats.clone();
    stats.merge(&Statistics::new());
    assert_eq!(stats, before);
}

#[test]
fn merge_is_associative() {
    let games = alpha_heavy_games();
    let parts: Vec<Statistics> = games
        .chunks(100)
        .map(|chunk| {
            let mut stats = Statistics::new();
            for outcome in chunk {
                stats.record_game(outcome).unwrap();
            }
            stats
        })
        .collect();
    let (a, b) = (&parts[0], &parts[1]);
    // a third worker that saw different spellings
    let mut c = Statistics::new();
    c.record_game(&GameOutcome::from_powers(&["ALPHA", "beta"]).with_winners([1]))
        .unwrap();

    let mut left = a.clone();
    left.merge(b);
    left.merge(&c);

    let mut bc = b.clone();
    bc.merge(&c);
    let mut right = a.clone();
    right.merge(&bc);

    assert_eq!(left, right);
    assert_eq!(left.total_games, 201);
    for power in FIVE {
        assert_eq!(left.record(power), right.record(power));
    }
    assert_eq!(left.record("alpha").unwrap().name, "ALPHA");
    assert_eq!(left.record("beta").unwrap().name, "Beta");
    assert_eq!(left.record("beta").unwrap().games_won, 31);
}

#[test]
fn interval_edges() {
    assert_eq!(confidence_interval(0, 0, 0.95), (0.0, 0.0));
    for (wins, total) in [(0, 1), (1, 1), (3, 7), (500, 1000), (999, 1000)] {
        let (lo, hi) = confidence_interval(wins, total, 0.95);
        assert!(0.0 <= lo && lo <= hi && hi <= 1.0);
    }
}

#[test]
fn powers_that_never_meet() {
    let mut matchups = MatchupAnalyzer::new();
    matchups.record_game(&["X", "A"], &["X"], true);
    matchups.record_game(&["Y", "B"], &["B"], true);

    let data = matchups.get_matchup("X", "Y");
    assert_eq!(data.games_played, 0);
    assert_eq!(data.a_win_rate(), 0.0);
    assert_eq!(data.b_win_rate(), 0.0);
}

#[test]
fn matchup_order_independence() {
    let mut forward = MatchupAnalyzer::new();
    forward.record_game(&["A", "B"], &["A"], true);
    let mut backward = MatchupAnalyzer::new();
    backward.record_game(&["B", "A"], &["A"], true);

    assert_eq!(forward.get_matchup("A", "B"), backward.get_matchup("A", "B"));
    assert_eq!(forward.matrix(), backward.matrix());
}

#[test]
fn elo_stays_bounded_over_long_runs() {
    let mut cumulative = CumulativeStats::new();
    for _ in 0..2000 {
        let outcome = GameOutcome::from_powers(&["Titan", "Mouse"]).with_winners([0]);
        cumulative.record_game(&outcome).unwrap();
    }
    for standing in cumulative.powers() {
        assert!(standing.elo_rating() >= MIN_ELO);
        assert!(standing.elo_rating() <= MAX_ELO);
        assert!(standing.peak_elo() >= standing.elo_rating());
    }
    assert!(cumulative.elo("Titan").unwrap() > cumulative.elo("Mouse").unwrap());
}

#[test]
fn balance_report_from_alpha_heavy_field() {
    let mut cumulative = CumulativeStats::new();
    cumulative.record_all(&alpha_heavy_games()).unwrap();

    let report = BalanceAnalyzer::new(&cumulative).analyze();
    assert_eq!(report.powers.len(), 5);
    assert!((report.expected_win_rate - 0.20).abs() < 1e-12);

    let alpha = report.power("Alpha").unwrap();
    assert_eq!(alpha.tier, Tier::S);
    assert_eq!(report.powers[0].power, "Alpha");
    assert!(report.overpowered.contains(&"Alpha".to_string()));
    assert_eq!(report.tier_list()[&Tier::S], vec!["Alpha"]);
}

#[test]
fn simulated_strong_power_rises() {
    let engine = SyntheticEngine::new()
        .with_strength("Alpha", 4.0)
        .with_shared_win_chance(0.0);
    let config = SimulationConfig::new().with_games(1500).with_seed(2024);
    let pool = ["Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta"];
    let runner = SimulationRunner::new(engine, &pool, config).unwrap();
    let batch = runner.run().unwrap();

    assert_eq!(batch.statistics.rankings(1)[0].name, "Alpha");

    let mut cumulative = CumulativeStats::new();
    let mut matchups = MatchupAnalyzer::new();
    let mut synergies = SynergyAnalyzer::new();
    batch
        .record_into(&mut cumulative, &mut matchups, &mut synergies)
        .unwrap();

    let report = BalanceAnalyzer::new(&cumulative).analyze();
    assert_eq!(report.powers[0].power, "Alpha");
    assert_eq!(report.power("Alpha").unwrap().tier, Tier::S);
    assert!(report.overpowered.contains(&"Alpha".to_string()));

    let best = matchups.get_best_matchups("Alpha", 3);
    assert_eq!(best.len(), 3);
    assert!(best.iter().all(|m| m.advantage > 0.0));
}

#[test]
fn multiplayer_elo_deflates_toward_the_floor() {
    let mut cumulative = CumulativeStats::new();
    for i in 0..200u32 {
        let outcome = GameOutcome::from_powers(&FIVE).with_winners([i % 5]);
        cumulative.record_game(&outcome).unwrap();
    }
    // every five-player game removes K·1.5 rating points in total
    let total: f64 = cumulative.powers().map(|p| p.elo_rating()).sum();
    assert!(total < 5.0 * DEFAULT_ELO);
    assert!(cumulative.powers().all(|p| p.elo_rating() < DEFAULT_ELO));
}

#[test]
fn two_player_elo_ranks_the_strong_power_first() {
    let engine = SyntheticEngine::new()
        .with_strength("Alpha", 4.0)
        .with_shared_win_chance(0.0);
    let config = SimulationConfig::new()
        .with_games(1500)
        .with_players(2)
        .with_seed(2024);
    let pool = ["Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta"];
    let batch = SimulationRunner::new(engine, &pool, config)
        .unwrap()
        .run()
        .unwrap();

    let mut cumulative = CumulativeStats::new();
    cumulative.record_all(&batch.outcomes).unwrap();

    let leaderboard = cumulative.elo_leaderboard(100);
    assert_eq!(leaderboard[0].name, "Alpha");
    assert!(leaderboard[0].elo_rating() > DEFAULT_ELO + 50.0);

    // sole-winner two-player games move no rating points in total
    let total: f64 = cumulative.powers().map(|p| p.elo_rating()).sum();
    assert!((total - pool.len() as f64 * DEFAULT_ELO).abs() < 1e-6);
}
