use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use props_value::cache::{get_typed, put_typed, CacheCategory, FileCache};
use props_value::data::{
    load_injury_report, load_player_lines, load_player_stats, load_team_defenses,
    save_value_bets_to_csv,
};
use props_value::odds_api::OddsApiClient;
use props_value::{
    demo, render_report, run_analysis, AnalysisInputs, AnalysisReport, AnalyzerConfig,
    PlayerLine, PlayerStats, StabilityAnalyzer,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

const LINES_CACHE_KEY: &str = "nba_player_points";

#[derive(Parser)]
#[command(name = "cli", about = "NBA player points prop value finder")]
struct Cli {
    /// JSON file overriding the default analyzer settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of value bets to show
    #[arg(long, global = true)]
    top: Option<usize>,

    /// Also write the value bets to this CSV file
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    #[arg(long, global = true, default_value = "cache")]
    cache_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze the built-in demo pool
    Demo,
    /// Analyze lines and stats from JSON files
    Analyze {
        #[arg(long)]
        lines: PathBuf,
        #[arg(long)]
        stats: PathBuf,
        #[arg(long)]
        defense: Option<PathBuf>,
        #[arg(long)]
        injuries: Option<PathBuf>,
    },
    /// Fetch today's lines from The Odds API and analyze them
    Live {
        #[arg(long)]
        stats: PathBuf,
        #[arg(long)]
        defense: Option<PathBuf>,
        #[arg(long)]
        injuries: Option<PathBuf>,
        /// Ignore cached lines
        #[arg(long)]
        refresh: bool,
    },
    /// Show stability and trend for one player at their posted line
    Player {
        name: String,
        #[arg(long, requires = "stats")]
        lines: Option<PathBuf>,
        #[arg(long, requires = "lines")]
        stats: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Command::Demo => {
            println!("NBA Player Points Value Finder (demo data)\n");
            let report = run_analysis(&config, &demo::demo_inputs())?;
            print_report(&report, &cli)?;
        }
        Command::Analyze {
            lines,
            stats,
            defense,
            injuries,
        } => {
            let inputs = AnalysisInputs {
                lines: load_player_lines(lines)?,
                stats: load_player_stats(stats)?,
                team_defenses: defense.as_ref().map(load_team_defenses).transpose()?,
                injury_report: injuries.as_ref().map(load_injury_report).transpose()?,
            };
            let report = run_analysis(&config, &inputs)?;
            print_report(&report, &cli)?;
        }
        Command::Live {
            stats,
            defense,
            injuries,
            refresh,
        } => {
            let lines = fetch_live_lines(&cli.cache_dir, *refresh).await?;
            let inputs = AnalysisInputs {
                lines,
                stats: load_player_stats(stats)?,
                team_defenses: defense.as_ref().map(load_team_defenses).transpose()?,
                injury_report: injuries.as_ref().map(load_injury_report).transpose()?,
            };
            let report = run_analysis(&config, &inputs)?;
            print_report(&report, &cli)?;
        }
        Command::Player { name, lines, stats } => {
            let (lines, stats) = match (lines, stats) {
                (Some(lines), Some(stats)) => (load_player_lines(lines)?, load_player_stats(stats)?),
                _ => demo::demo_pool(),
            };
            print_player(&config, name, &lines, &stats)?;
        }
        Command::Config => {
            let json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize configuration")?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<AnalyzerConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalyzerConfig::from_file(path)?,
        None => AnalyzerConfig::default(),
    };
    if let Some(top) = cli.top {
        config.value.top_n_results = top;
    }
    config.validate()?;
    Ok(config)
}

async fn fetch_live_lines(cache_dir: &Path, refresh: bool) -> Result<Vec<PlayerLine>> {
    let cache = FileCache::new(cache_dir)?;

    if !refresh {
        if let Some(lines) = get_typed::<Vec<PlayerLine>>(&cache, LINES_CACHE_KEY, CacheCategory::Lines) {
            println!("Loaded {} lines from cache\n", lines.len());
            return Ok(lines);
        }
    }

    let api_key = std::env::var("ODDS_API_KEY").context("ODDS_API_KEY not set in .env file")?;
    let client = OddsApiClient::new(api_key);

    let lines = client
        .fetch_player_points_lines()
        .await
        .context("Failed to fetch player points lines")?;
    put_typed(&cache, LINES_CACHE_KEY, CacheCategory::Lines, &lines)?;
    if let Err(e) = client.check_usage().await {
        warn!(error = %e, "Failed to check Odds API usage");
    }

    println!("Fetched {} lines from The Odds API\n", lines.len());
    Ok(lines)
}

fn print_report(report: &AnalysisReport, cli: &Cli) -> Result<()> {
    let summary = &report.pool.summary;
    println!(
        "Player pool: {} lines, {} accepted, {} rejected (avg stability {:.1})\n",
        summary.total_lines, summary.accepted, summary.rejected, summary.avg_stability
    );

    if !report.pool.rejected.is_empty() {
        println!("Rejected:");
        for rejection in &report.pool.rejected {
            println!(
                "  {} [{}] {}",
                rejection.player_name, rejection.reason, rejection.detail
            );
        }
        println!();
    }

    println!("{}", render_report(&report.value_bets));

    if let Some(path) = &cli.csv {
        if !report.value_bets.is_empty() {
            save_value_bets_to_csv(&report.value_bets, path)?;
            println!("\nSaved value bets to {}", path.display());
        }
    }

    Ok(())
}

fn print_player(
    config: &AnalyzerConfig,
    name: &str,
    lines: &[PlayerLine],
    stats: &HashMap<String, PlayerStats>,
) -> Result<()> {
    let line = lines
        .iter()
        .find(|line| line.player_name == name)
        .with_context(|| format!("No posted line for {}", name))?;
    let player_stats = stats
        .get(name)
        .with_context(|| format!("No statistics for {}", name))?;

    let analyzer = StabilityAnalyzer::new(config.stability.clone());
    let stability = analyzer.analyze(player_stats, line.line_points)?;
    let trend = analyzer.trend(player_stats)?;

    println!("{} ({}) O/U {} points", name, player_stats.team, line.line_points);
    println!("  Over {} / Under {}", line.over_odds, line.under_odds);
    println!(
        "  Last 10: {:.1} PTS (std {:.1}, cv {:.2}), {:.1} MIN (cv {:.2})",
        stability.mean_pts,
        stability.std_pts,
        stability.cv_pts,
        stability.mean_minutes,
        stability.cv_minutes
    );
    println!(
        "  Hit rate: {:.0}% last 5, {:.0}% last 10",
        stability.hit_rate_last_5 * 100.0,
        stability.hit_rate_last_10 * 100.0
    );
    println!(
        "  Stability: {:.1}/100 ({} risk)",
        stability.stability_score, stability.risk_level
    );
    println!(
        "  Trend: points {} ({:+.1}%), minutes {} ({:+.1}%)",
        trend.pts_direction, trend.pts_trend_pct, trend.min_direction, trend.min_trend_pct
    );

    Ok(())
}
