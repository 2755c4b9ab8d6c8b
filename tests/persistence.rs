//! Snapshot save/load behaviour against real files.

use power_analytics::rating::CumulativeStats;
use power_analytics::sim::{SimulationConfig, SimulationRunner, SyntheticEngine};
use power_analytics::stats::GameOutcome;

fn populated() -> CumulativeStats {
    let mut stats = CumulativeStats::new();
    stats.start_run();
    let mut outcome = GameOutcome::from_powers(&["Virus", "Oracle", "Clone", "Zombie"])
        .with_winners([1, 3])
        .with_turns(27)
        .with_alliance(1, 3);
    outcome.final_colonies.insert(1, 5);
    outcome.final_colonies.insert(3, 5);
    outcome.final_colonies.insert(0, 2);
    stats.record_game(&outcome).unwrap();

    for i in 0..30u32 {
        let outcome = GameOutcome::from_powers(&["Virus", "Oracle", "Macron"])
            .with_winners([i % 3])
            .with_turns(10 + i);
        stats.record_game(&outcome).unwrap();
    }
    stats
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cumulative_stats.json");

    let mut stats = populated();
    stats.save(&path).unwrap();
    let loaded = CumulativeStats::load(&path);

    let saved = serde_json::to_value(stats.to_snapshot()).unwrap();
    let restored = serde_json::to_value(loaded.to_snapshot()).unwrap();
    assert_eq!(saved, restored);
    assert_eq!(loaded.elo("oracle"), stats.elo("Oracle"));
}

#[test]
fn persisted_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.json");
    let mut stats = populated();
    stats.save(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["total_games"], 31);
    assert_eq!(json["simulation_runs"], 1);
    assert_eq!(json["games_by_player_count"]["3"], 30);
    assert_eq!(json["games_by_player_count"]["4"], 1);
    assert_eq!(json["min_game_length"], 10);
    assert_eq!(json["max_game_length"], 39);
    assert!(json["last_updated"].is_string());

    let clone = &json["alien_stats"]["Clone"];
    assert_eq!(clone["games_played"], 1);
    assert_eq!(clone["win_rate"], 0.0);
    let zombie = &json["alien_stats"]["Zombie"];
    assert_eq!(zombie["win_rate"], 100.0);
    assert_eq!(zombie["avg_colonies"], 5.0);
}

#[test]
fn missing_fields_are_default_filled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.json");
    std::fs::write(
        &path,
        r#"{
            "total_games": 12,
            "alien_stats": {
                "Amoeba": { "games_played": 12, "games_won": 4 }
            }
        }"#,
    )
    .unwrap();

    let stats = CumulativeStats::try_load(&path).unwrap();
    assert_eq!(stats.total_games, 12);
    assert_eq!(stats.simulation_runs, 0);
    assert_eq!(stats.min_game_length, None);
    let amoeba = stats.power("amoeba").unwrap();
    assert_eq!(amoeba.games_won, 4);
    assert_eq!(amoeba.elo_rating(), 1500.0);
}

#[test]
fn corrupt_file_loads_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(CumulativeStats::try_load(&path).is_err());
    let stats = CumulativeStats::load(&path);
    assert_eq!(stats.total_games, 0);
    assert_eq!(stats.num_powers(), 0);
}

#[test]
fn runs_accumulate_across_saves() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runs.json");
    let pool = ["Amoeba", "Clone", "Macron", "Oracle", "Virus", "Zombie"];

    for seed in [1u64, 2] {
        let config = SimulationConfig::new().with_games(60).with_seed(seed);
        let runner = SimulationRunner::new(SyntheticEngine::new(), &pool, config).unwrap();
        let batch = runner.run().unwrap();

        let mut stats = CumulativeStats::load(&path);
        stats.start_run();
        stats.record_all(&batch.outcomes).unwrap();
        stats.save(&path).unwrap();
    }

    let stats = CumulativeStats::try_load(&path).unwrap();
    assert_eq!(stats.simulation_runs, 2);
    assert_eq!(stats.total_games, 120);
    let seats: u64 = stats.powers().map(|p| p.games_played).sum();
    assert_eq!(seats, 120 * 5);
}
