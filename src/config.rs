use crate::error::{AnalyzerError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level analyzer configuration. Every group falls back to its defaults,
/// so a config file only needs to name what it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub filter: FilterConfig,
    pub stability: StabilityConfig,
    pub context: ContextConfig,
    pub value: ValueConfig,
}

/// Player eligibility gates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum average minutes over the last 10 games
    pub min_minutes: f64,
    /// Minimum games played this season
    pub min_games_played: u32,
    /// Injury statuses that exclude a player
    pub excluded_statuses: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_minutes: 24.0,
            min_games_played: 5,
            excluded_statuses: vec![
                "Out".to_string(),
                "Doubtful".to_string(),
                "Questionable".to_string(),
            ],
        }
    }
}

/// Weights of the composite stability score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    pub weight_std_dev: f64,
    pub weight_minutes_consistency: f64,
    pub weight_usage_consistency: f64,
    pub weight_hit_rate: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            weight_std_dev: 0.35,
            weight_minutes_consistency: 0.30,
            weight_usage_consistency: 0.20,
            weight_hit_rate: 0.15,
        }
    }
}

/// Additive probability modifiers for game context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub home_advantage: f64,
    pub road_penalty: f64,
    pub back_to_back_penalty: f64,
    pub weak_defense_bonus: f64,
    pub high_pace_bonus: f64,
    pub blowout_risk_penalty: f64,
    /// Defensive rating above this is a weak defense
    pub weak_defense_threshold: f64,
    /// Defensive rating below this is a strong defense
    pub strong_defense_threshold: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            home_advantage: 0.03,
            road_penalty: -0.02,
            back_to_back_penalty: -0.04,
            weak_defense_bonus: 0.05,
            high_pace_bonus: 0.02,
            blowout_risk_penalty: -0.03,
            weak_defense_threshold: 115.0,
            strong_defense_threshold: 108.0,
        }
    }
}

/// Value bet qualification and output size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueConfig {
    pub min_edge_percent: f64,
    pub strong_edge_percent: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    pub top_n_results: usize,
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self {
            min_edge_percent: 5.0,
            strong_edge_percent: 8.0,
            min_confidence: 0.55,
            max_confidence: 0.85,
            top_n_results: 5,
        }
    }
}

impl AnalyzerConfig {
    /// Load a (possibly partial) configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AnalyzerConfig =
            serde_json::from_str(&json).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.filter.min_minutes < 0.0 {
            errors.push("filter.min_minutes must be >= 0".to_string());
        }
        if self.value.min_edge_percent < 0.0 {
            errors.push("value.min_edge_percent must be >= 0".to_string());
        }
        if self.value.top_n_results == 0 {
            errors.push("value.top_n_results must be >= 1".to_string());
        }
        if self.value.min_confidence > self.value.max_confidence {
            errors.push("value.min_confidence must not exceed value.max_confidence".to_string());
        }

        let weights = [
            ("weight_std_dev", self.stability.weight_std_dev),
            (
                "weight_minutes_consistency",
                self.stability.weight_minutes_consistency,
            ),
            (
                "weight_usage_consistency",
                self.stability.weight_usage_consistency,
            ),
            ("weight_hit_rate", self.stability.weight_hit_rate),
        ];
        for (name, weight) in weights {
            if weight < 0.0 {
                errors.push(format!("stability.{} must be >= 0", name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AnalyzerError::InvalidConfig(errors.join("; ")))
        }
    }
}
