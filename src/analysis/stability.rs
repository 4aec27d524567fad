use crate::config::StabilityConfig;
use crate::error::Result;
use crate::models::PlayerStats;
use crate::utils::distribution::{mean, population_std_dev};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score at or above which a player counts as stable
const STABLE_SCORE: f64 = 60.0;

/// Percent change of the last-5 vs last-10 average that counts as a trend
const POINTS_TREND_THRESHOLD: f64 = 5.0;
const MINUTES_TREND_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        })
    }
}

/// Variance and consistency of a player's recent output against one line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityMetrics {
    pub player_name: String,

    pub mean_pts: f64,
    pub std_pts: f64,
    pub cv_pts: f64,

    pub mean_minutes: f64,
    pub std_minutes: f64,
    pub cv_minutes: f64,

    /// Fraction of games where points strictly exceeded the line
    pub hit_rate_last_5: f64,
    pub hit_rate_last_10: f64,

    /// 0-100, higher is more predictable
    pub stability_score: f64,
    pub is_stable: bool,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    fn classify(change_pct: f64, threshold: f64) -> Self {
        if change_pct > threshold {
            TrendDirection::Up
        } else if change_pct < -threshold {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Stable => "stable",
        })
    }
}

/// Last-5 vs last-10 form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub pts_avg_5: f64,
    pub pts_avg_10: f64,
    pub pts_trend_pct: f64,
    pub pts_direction: TrendDirection,
    pub min_avg_5: f64,
    pub min_avg_10: f64,
    pub min_trend_pct: f64,
    pub min_direction: TrendDirection,
}

pub struct StabilityAnalyzer {
    config: StabilityConfig,
}

impl StabilityAnalyzer {
    pub fn new(config: StabilityConfig) -> Self {
        Self { config }
    }

    /// Compute stability metrics for a player relative to `line_points`
    pub fn analyze(&self, stats: &PlayerStats, line_points: f64) -> Result<StabilityMetrics> {
        stats.require_windows()?;

        let pts_10 = stats.points_last_10();
        let mean_pts = mean(&pts_10);
        let std_pts = population_std_dev(&pts_10);
        let cv_pts = coefficient_of_variation(mean_pts, std_pts);

        let min_10 = stats.minutes_last_10();
        let mean_minutes = mean(&min_10);
        let std_minutes = population_std_dev(&min_10);
        let cv_minutes = coefficient_of_variation(mean_minutes, std_minutes);

        let hit_rate_last_5 = hit_rate(&stats.points_last_5(), line_points);
        let hit_rate_last_10 = hit_rate(&pts_10, line_points);

        let stability_score =
            self.stability_score(std_pts, cv_pts, cv_minutes, hit_rate_last_10);
        let risk_level = risk_level(stability_score, cv_pts);

        Ok(StabilityMetrics {
            player_name: stats.player_name.clone(),
            mean_pts,
            std_pts,
            cv_pts,
            mean_minutes,
            std_minutes,
            cv_minutes,
            hit_rate_last_5,
            hit_rate_last_10,
            stability_score,
            is_stable: stability_score >= STABLE_SCORE,
            risk_level,
        })
    }

    /// Weighted sum of four components, each clamped to [0, 100] first.
    /// The hit-rate component is a plain linear scale, not centered on 50%.
    fn stability_score(&self, std_pts: f64, cv_pts: f64, cv_minutes: f64, hit_rate: f64) -> f64 {
        // std 3 -> 100, std 8 -> 0
        let std_component = clamp_component((8.0 - std_pts) / 5.0 * 100.0);
        // cv 0.05 -> 100, cv 0.20 -> 0
        let minutes_component = clamp_component((0.20 - cv_minutes) / 0.15 * 100.0);
        // cv 0.10 -> 100, cv 0.30 -> 0
        let cv_component = clamp_component((0.30 - cv_pts) / 0.20 * 100.0);
        let hit_component = clamp_component(hit_rate * 100.0);

        let score = std_component * self.config.weight_std_dev
            + minutes_component * self.config.weight_minutes_consistency
            + cv_component * self.config.weight_usage_consistency
            + hit_component * self.config.weight_hit_rate;

        (score.clamp(0.0, 100.0) * 10.0).round() / 10.0
    }

    /// Compare last-5 against last-10 averages for points and minutes
    pub fn trend(&self, stats: &PlayerStats) -> Result<Trend> {
        stats.require_windows()?;

        let pts_avg_5 = mean(&stats.points_last_5());
        let pts_avg_10 = mean(&stats.points_last_10());
        let min_avg_5 = mean(&stats.minutes_last_5());
        let min_avg_10 = mean(&stats.minutes_last_10());

        let pts_trend_pct = percent_change(pts_avg_5, pts_avg_10);
        let min_trend_pct = percent_change(min_avg_5, min_avg_10);

        Ok(Trend {
            pts_avg_5,
            pts_avg_10,
            pts_trend_pct,
            pts_direction: TrendDirection::classify(pts_trend_pct, POINTS_TREND_THRESHOLD),
            min_avg_5,
            min_avg_10,
            min_trend_pct,
            min_direction: TrendDirection::classify(min_trend_pct, MINUTES_TREND_THRESHOLD),
        })
    }
}

/// std / mean, or 1.0 when the mean is not positive
fn coefficient_of_variation(mean: f64, std_dev: f64) -> f64 {
    if mean > 0.0 {
        std_dev / mean
    } else {
        1.0
    }
}

/// Ties with the line count as misses
fn hit_rate(points: &[f64], line_points: f64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let hits = points.iter().filter(|&&p| p > line_points).count();
    hits as f64 / points.len() as f64
}

fn clamp_component(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn risk_level(stability_score: f64, cv_pts: f64) -> RiskLevel {
    if stability_score >= 70.0 && cv_pts < 0.20 {
        RiskLevel::Low
    } else if stability_score >= 50.0 && cv_pts < 0.25 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

fn percent_change(recent: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        (recent - baseline) / baseline * 100.0
    } else {
        0.0
    }
}
