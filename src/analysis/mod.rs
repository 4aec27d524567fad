pub mod player_filter;
pub mod probability_model;
pub mod stability;
pub mod value_detector;

pub use player_filter::*;
pub use probability_model::*;
pub use stability::*;
pub use value_detector::*;

use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, Result};
use crate::models::{InjuryReport, PlayerLine, PlayerStats};
use crate::utils::distribution::mean;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// An accepted line with everything the value detector needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedPlayer {
    pub line: PlayerLine,
    pub stats: PlayerStats,
    pub stability: StabilityMetrics,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub total_lines: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub avg_stability: f64,
}

/// Filtered and scored player pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolAnalysis {
    /// Sorted by stability score, most stable first
    pub analyzed: Vec<AnalyzedPlayer>,
    pub rejected: Vec<Rejection>,
    pub summary: PoolSummary,
}

/// Filter the pool, then compute stability and trend for every accepted line
pub fn analyze_player_pool(
    config: &AnalyzerConfig,
    lines: &[PlayerLine],
    stats: &HashMap<String, PlayerStats>,
    injury_report: Option<&InjuryReport>,
) -> Result<PoolAnalysis> {
    let filter = PlayerFilter::new(config.filter.clone());
    let outcome = filter.filter_players(lines, stats, injury_report);

    let analyzer = StabilityAnalyzer::new(config.stability.clone());
    let mut analyzed = Vec::with_capacity(outcome.accepted.len());

    for line in outcome.accepted {
        let player_stats = stats
            .get(&line.player_name)
            .ok_or_else(|| AnalyzerError::MissingStats {
                player: line.player_name.clone(),
            })?
            .clone();

        let stability = analyzer.analyze(&player_stats, line.line_points)?;
        let trend = analyzer.trend(&player_stats)?;

        analyzed.push(AnalyzedPlayer {
            line,
            stats: player_stats,
            stability,
            trend,
        });
    }

    analyzed.sort_by(|a, b| {
        b.stability
            .stability_score
            .partial_cmp(&a.stability.stability_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let scores: Vec<f64> = analyzed
        .iter()
        .map(|a| a.stability.stability_score)
        .collect();
    let summary = PoolSummary {
        total_lines: lines.len(),
        accepted: analyzed.len(),
        rejected: outcome.rejected.len(),
        avg_stability: mean(&scores),
    };

    info!(
        total = summary.total_lines,
        accepted = summary.accepted,
        rejected = summary.rejected,
        "Player pool analyzed"
    );

    Ok(PoolAnalysis {
        analyzed,
        rejected: outcome.rejected,
        summary,
    })
}
