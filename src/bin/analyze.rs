//! Balance report over a saved cumulative stats file.
//!
//! Usage:
//!   cargo run --release --bin analyze -- [OPTIONS]
//!
//! Examples:
//!   analyze --stats-file cumulative_stats.json
//!   analyze --format csv --output balance.csv
//!   analyze --power Macron --min-games 50

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use power_analytics::analysis::BalanceAnalyzer;
use power_analytics::rating::CumulativeStats;
use power_analytics::stats::{format_rate, AnalysisConfig};
use power_analytics::StatsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Csv,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "analyze", about = "Tier and balance report from cumulative stats")]
struct Args {
    /// Cumulative stats file
    #[arg(long, default_value = "cumulative_stats.json")]
    stats_file: PathBuf,

    /// Analysis configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the minimum games for ranking
    #[arg(long)]
    min_games: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Show details for a single power
    #[arg(long)]
    power: Option<String>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn power_details(stats: &CumulativeStats, analyzer: &BalanceAnalyzer<'_>, name: &str) -> String {
    let Some(standing) = stats.power(name) else {
        return format!("No games recorded for '{name}'\n");
    };

    let mut lines = vec![
        format!("=== {} ===", standing.name),
        format!("Games played: {}", standing.games_played),
        format!("Games won: {}", standing.games_won),
        format!(
            "Win rate: {}",
            format_rate((standing.games_played > 0).then(|| standing.win_rate()))
        ),
        format!("Solo wins: {}", standing.solo_wins),
        format!("Shared wins: {}", standing.shared_wins),
        format!("Elo: {:.1} (peak {:.1})", standing.elo_rating(), standing.peak_elo()),
        format!("Avg colonies: {:.2}", standing.avg_colonies),
    ];
    match analyzer.analyze_power(name) {
        Some(balance) => {
            lines.push(format!("Tier: {}", balance.tier));
            lines.push(format!("Normalized win rate: {:.2}", balance.normalized_win_rate));
            lines.push(format!(
                "Win rate interval: {:.1}% - {:.1}%",
                balance.ci_lower * 100.0,
                balance.ci_upper * 100.0
            ));
            lines.push(format!("Performance score: {:.1}", balance.performance_score));
        }
        None => lines.push("Tier: insufficient sample".to_string()),
    }
    lines.join("\n") + "\n"
}

fn run(args: Args) -> Result<(), StatsError> {
    let mut analysis = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(min_games) = args.min_games {
        analysis = analysis.with_min_games(min_games);
    }
    analysis.validate()?;

    let stats = CumulativeStats::try_load(&args.stats_file)?;
    let analyzer = BalanceAnalyzer::from_config(&stats, &analysis);

    let report = match (&args.power, args.format) {
        (Some(name), _) => power_details(&stats, &analyzer, name),
        (None, Format::Text) => {
            let balance = analyzer.analyze();
            format!("{}\n{}", stats.summary(analysis.min_games), balance.summary())
        }
        (None, Format::Csv) => analyzer.analyze().to_csv(),
        (None, Format::Json) => analyzer.analyze().to_json()?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &report)?;
            println!("Report written to {}", path.display());
        }
        None => print!("{report}"),
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
