//! Batch simulation binary.
//!
//! Plays a batch of games with the synthetic engine, prints the per-run
//! statistics and the pairwise analyses, then folds the batch into the
//! persistent cumulative stats file.
//!
//! Usage:
//!   cargo run --release --bin simulate -- [OPTIONS]
//!
//! Examples:
//!   simulate --games 5000 --seed 42 --strength Macron=1.6 --strength Pacifist=0.7
//!   simulate --head-to-head Virus Oracle --games 1000 --no-save

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::debug;

use power_analytics::analysis::{BalanceAnalyzer, MatchupAnalyzer, SynergyAnalyzer};
use power_analytics::rating::CumulativeStats;
use power_analytics::sim::{SimulationConfig, SimulationRunner, SyntheticEngine};
use power_analytics::stats::AnalysisConfig;
use power_analytics::StatsError;

const DEFAULT_POWERS: [&str; 12] = [
    "Amoeba",
    "Anti-Matter",
    "Barbarian",
    "Chosen",
    "Clone",
    "Macron",
    "Mutant",
    "Oracle",
    "Parasite",
    "Pacifist",
    "Virus",
    "Zombie",
];

#[derive(Debug, Parser)]
#[command(name = "simulate", about = "Simulate games and accumulate power statistics")]
struct Args {
    /// Number of games to play
    #[arg(short = 'n', long, default_value_t = 1000)]
    games: usize,

    /// Seats per game
    #[arg(short, long, default_value_t = 5)]
    players: usize,

    /// Comma-separated power pool (default: built-in list of 12)
    #[arg(long, value_delimiter = ',')]
    powers: Vec<String>,

    /// Relative strength override, repeatable
    #[arg(long = "strength", value_name = "POWER=WEIGHT")]
    strengths: Vec<String>,

    /// Force two powers into every game
    #[arg(long, num_args = 2, value_names = ["POWER_A", "POWER_B"])]
    head_to_head: Option<Vec<String>>,

    /// Chance that a game ends in a shared victory
    #[arg(long, default_value_t = 0.2)]
    shared_win_chance: f64,

    /// Chance that a game aborts
    #[arg(long, default_value_t = 0.0)]
    error_chance: f64,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Worker threads (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Analysis configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the minimum games for ranking
    #[arg(long)]
    min_games: Option<u64>,

    /// Cumulative stats file
    #[arg(long, default_value = "cumulative_stats.json")]
    stats_file: PathBuf,

    /// Do not update the cumulative stats file
    #[arg(long)]
    no_save: bool,

    /// Write this run's per-power statistics as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,
}

fn parse_strength(arg: &str) -> Result<(String, f64), StatsError> {
    let (power, weight) = arg
        .split_once('=')
        .ok_or_else(|| StatsError::InvalidConfig(format!("expected POWER=WEIGHT, got '{arg}'")))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| StatsError::InvalidConfig(format!("invalid weight in '{arg}'")))?;
    Ok((power.trim().to_string(), weight))
}

fn run(args: Args) -> Result<(), StatsError> {
    let mut analysis = match &args.config {
        Some(path) => {
            println!("Loading analysis configuration from: {}", path.display());
            AnalysisConfig::from_json_file(path)?
        }
        None => AnalysisConfig::default(),
    };
    if let Some(min_games) = args.min_games {
        analysis = analysis.with_min_games(min_games);
    }
    analysis.validate()?;

    let pool: Vec<String> = if args.powers.is_empty() {
        DEFAULT_POWERS.iter().map(|s| s.to_string()).collect()
    } else {
        args.powers.clone()
    };

    let mut engine = SyntheticEngine::new()
        .with_shared_win_chance(args.shared_win_chance)
        .with_error_chance(args.error_chance);
    for arg in &args.strengths {
        let (power, weight) = parse_strength(arg)?;
        debug!("strength override {power} = {weight}");
        engine = engine.with_strength(&power, weight);
    }

    let mut sim_config = SimulationConfig::new()
        .with_games(args.games)
        .with_players(args.players)
        .with_progress(args.progress);
    if let Some(seed) = args.seed {
        sim_config = sim_config.with_seed(seed);
    }
    if let Some(threads) = args.threads {
        sim_config = sim_config.with_threads(threads);
    }

    println!("=================================================");
    println!("  Power Simulation");
    println!("=================================================");
    println!();
    println!("Games: {}", args.games);
    println!("Players per game: {}", args.players);
    println!("Pool: {} powers", pool.len());
    println!(
        "Threads: {}",
        args.threads
            .map_or_else(|| "auto".to_string(), |t| t.to_string())
    );
    if let Some(pair) = &args.head_to_head {
        println!("Head-to-head: {} vs {}", pair[0], pair[1]);
    }
    println!();

    let runner = SimulationRunner::new(engine, &pool, sim_config)?;
    let batch = match &args.head_to_head {
        Some(pair) => runner.run_head_to_head(&pair[0], &pair[1])?,
        None => runner.run()?,
    };

    println!(
        "Played {} games in {:.2}s ({:.0} games/s, seed {})",
        batch.outcomes.len(),
        batch.elapsed.as_secs_f64(),
        batch.games_per_second(),
        batch.seed
    );
    println!();
    print!(
        "{}",
        batch
            .statistics
            .summary(analysis.min_games, analysis.confidence)
    );
    println!();

    if let Some(path) = &args.csv {
        std::fs::write(
            path,
            batch
                .statistics
                .to_csv(analysis.min_games, analysis.confidence),
        )?;
        println!("Run statistics written to {}", path.display());
        println!();
    }

    let mut cumulative = CumulativeStats::load(&args.stats_file).with_k_factor(analysis.elo_k_factor);
    let mut matchups = MatchupAnalyzer::from_config(&analysis);
    let mut synergies = SynergyAnalyzer::from_config(&analysis);
    batch.record_into(&mut cumulative, &mut matchups, &mut synergies)?;

    if let Some(pair) = &args.head_to_head {
        let data = matchups.get_matchup(&pair[0], &pair[1]);
        println!(
            "{} vs {}: {} games, {:.1}% / {:.1}% (draws {:.1}%)",
            pair[0],
            pair[1],
            data.games_played,
            data.a_win_rate() * 100.0,
            data.b_win_rate() * 100.0,
            data.draw_rate() * 100.0
        );
        println!();
    }

    print!("{}", matchups.summary());
    println!();
    print!("{}", synergies.summary());
    println!();
    print!("{}", cumulative.summary(analysis.min_games));
    println!();
    print!(
        "{}",
        BalanceAnalyzer::from_config(&cumulative, &analysis)
            .analyze()
            .summary()
    );

    if args.no_save {
        println!();
        println!("Cumulative stats not saved (--no-save)");
    } else {
        cumulative.save(&args.stats_file)?;
        println!();
        println!("Cumulative stats saved to {}", args.stats_file.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
