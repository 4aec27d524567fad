pub mod analysis;
pub mod api;
pub mod config;
pub mod demo;
pub mod error;
pub mod models;
pub mod utils;

pub use analysis::*;
pub use api::*;
pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, Result};
pub use models::*;
pub use utils::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Everything the analytical pipeline consumes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInputs {
    pub lines: Vec<PlayerLine>,
    /// Keyed by player name
    pub stats: HashMap<String, PlayerStats>,
    pub team_defenses: Option<TeamDefenses>,
    pub injury_report: Option<InjuryReport>,
}

/// Result of one full pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub pool: PoolAnalysis,
    /// Ranked, best edge first
    pub value_bets: Vec<ValueBet>,
}

/// Filter the pool, score stability and trend, then detect and rank value bets.
/// Pure function of its inputs: no I/O, no clock, no randomness.
pub fn run_analysis(config: &AnalyzerConfig, inputs: &AnalysisInputs) -> Result<AnalysisReport> {
    config.validate()?;

    let pool = analyze_player_pool(
        config,
        &inputs.lines,
        &inputs.stats,
        inputs.injury_report.as_ref(),
    )?;

    let detector = ValueDetector::new(config);
    let value_bets = detector.detect_value_bets(&pool.analyzed, inputs.team_defenses.as_ref())?;

    info!(
        lines = inputs.lines.len(),
        value_bets = value_bets.len(),
        "Analysis complete"
    );

    Ok(AnalysisReport { pool, value_bets })
}
