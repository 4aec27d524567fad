use crate::config::FilterConfig;
use crate::models::{InjuryReport, PlayerLine, PlayerStats};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Why a player line was excluded from analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NoStats,
    LowMinutes,
    InsufficientSample,
    InjuryStatus,
    Unavailable,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::NoStats => "no_stats",
            RejectionReason::LowMinutes => "low_minutes",
            RejectionReason::InsufficientSample => "insufficient_sample",
            RejectionReason::InjuryStatus => "injury_status",
            RejectionReason::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A rejected line with its reason and a human-readable detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub player_name: String,
    pub reason: RejectionReason,
    pub detail: String,
}

/// Both outputs of the filter, each in input order
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub accepted: Vec<PlayerLine>,
    pub rejected: Vec<Rejection>,
}

/// Eligibility gate in front of the analysis
pub struct PlayerFilter {
    config: FilterConfig,
}

impl PlayerFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Split lines into accepted and rejected. Gates run in a fixed order and
    /// the first failing gate decides the reason.
    pub fn filter_players(
        &self,
        lines: &[PlayerLine],
        stats: &HashMap<String, PlayerStats>,
        injury_report: Option<&InjuryReport>,
    ) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for line in lines {
            match self.check(line, stats, injury_report) {
                Ok(()) => outcome.accepted.push(line.clone()),
                Err((reason, detail)) => {
                    debug!(player = %line.player_name, %reason, %detail, "Rejected player line");
                    outcome.rejected.push(Rejection {
                        player_name: line.player_name.clone(),
                        reason,
                        detail,
                    });
                }
            }
        }

        outcome
    }

    fn check(
        &self,
        line: &PlayerLine,
        stats: &HashMap<String, PlayerStats>,
        injury_report: Option<&InjuryReport>,
    ) -> Result<(), (RejectionReason, String)> {
        let player_stats = stats.get(&line.player_name).ok_or_else(|| {
            (
                RejectionReason::NoStats,
                format!("No statistics found for {}", line.player_name),
            )
        })?;

        let avg_minutes = player_stats.avg_min_last_10();
        // NaN minutes fail the gate
        if avg_minutes.is_nan() || avg_minutes < self.config.min_minutes {
            return Err((
                RejectionReason::LowMinutes,
                format!(
                    "Avg MIN: {:.1} < {:.1}",
                    avg_minutes, self.config.min_minutes
                ),
            ));
        }

        if player_stats.games_played < self.config.min_games_played {
            return Err((
                RejectionReason::InsufficientSample,
                format!(
                    "Games played: {} < {}",
                    player_stats.games_played, self.config.min_games_played
                ),
            ));
        }

        if let Some(status) = injury_report.and_then(|report| report.get(&line.player_name)) {
            if self.config.excluded_statuses.iter().any(|s| s == status) {
                return Err((RejectionReason::InjuryStatus, format!("Status: {}", status)));
            }
        }

        if !player_stats.is_available {
            let detail = match player_stats.injury_status.as_deref() {
                Some(status) if !status.trim().is_empty() => status.to_string(),
                _ => "Unknown reason".to_string(),
            };
            return Err((RejectionReason::Unavailable, detail));
        }

        Ok(())
    }
}
