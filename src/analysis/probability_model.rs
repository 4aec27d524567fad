use crate::analysis::stability::StabilityMetrics;
use crate::config::{AnalyzerConfig, ContextConfig};
use crate::error::Result;
use crate::models::{PlayerLine, PlayerStats, TeamDefense};
use crate::utils::distribution::{mean, normal_survival, population_std_dev};
use serde::{Deserialize, Serialize};
use std::fmt;

/// League-average defensive rating used when the opponent is unknown
pub const LEAGUE_AVG_DEF_RATING: f64 = 112.0;
/// League-average pace used when the opponent is unknown
pub const LEAGUE_AVG_PACE: f64 = 100.0;

/// Floor for the standard deviation fed to the normal model
const MIN_STD_DEV: f64 = 1.0;
/// Weight of the last-5 estimate in the blended base probability
const RECENT_WEIGHT: f64 = 0.6;
const STRONG_DEFENSE_PENALTY: f64 = 0.03;

const MIN_PROBABILITY: f64 = 0.05;
const MAX_PROBABILITY: f64 = 0.95;
const MIN_CONFIDENCE: f64 = 0.3;
const MAX_CONFIDENCE: f64 = 0.9;

/// Side recommended by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetSide {
    Over,
    Under,
    NoValue,
}

impl fmt::Display for BetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BetSide::Over => "OVER",
            BetSide::Under => "UNDER",
            BetSide::NoValue => "NO_VALUE",
        })
    }
}

/// Game context for one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFactors {
    pub is_home: bool,
    /// No schedule source is wired in, so this stays false unless a caller sets it
    pub is_back_to_back: bool,
    pub opponent_def_rating: f64,
    pub opponent_pace: f64,
    /// 0-1; no source is wired in
    pub blowout_risk: f64,
    /// Filled in by the model
    pub total_adjustment: f64,
}

impl Default for ContextFactors {
    fn default() -> Self {
        Self {
            is_home: true,
            is_back_to_back: false,
            opponent_def_rating: LEAGUE_AVG_DEF_RATING,
            opponent_pace: LEAGUE_AVG_PACE,
            blowout_risk: 0.0,
            total_adjustment: 0.0,
        }
    }
}

impl ContextFactors {
    /// Context for a line at league-average opposition
    pub fn for_line(line: &PlayerLine) -> Self {
        Self {
            is_home: line.is_home,
            ..Self::default()
        }
    }

    /// Context for a line against a known (or unknown) opponent
    pub fn for_matchup(line: &PlayerLine, opponent: Option<&TeamDefense>) -> Self {
        let mut context = Self::for_line(line);
        if let Some(defense) = opponent {
            context.opponent_def_rating = defense.def_rating;
            context.opponent_pace = defense.pace;
        }
        context
    }
}

/// Model output for one (player, line)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityResult {
    pub player_name: String,
    pub line: f64,

    pub base_probability: f64,
    pub context_adjustment: f64,
    pub stability_adjustment: f64,

    pub p_over: f64,
    pub p_under: f64,

    pub implied_over: f64,
    pub implied_under: f64,

    pub edge_over: f64,
    pub edge_under: f64,

    pub recommended: BetSide,
    /// Edge of the recommended side in percent; for NO_VALUE the larger of the two edges
    pub edge_percent: f64,

    /// 0.3-0.9
    pub confidence: f64,

    pub reasons: Vec<String>,
    pub context: ContextFactors,
}

impl ProbabilityResult {
    /// Model probability of the recommended side (over for NO_VALUE)
    pub fn model_probability(&self) -> f64 {
        match self.recommended {
            BetSide::Under => self.p_under,
            _ => self.p_over,
        }
    }

    /// Bookmaker probability of the recommended side (over for NO_VALUE)
    pub fn implied_probability(&self) -> f64 {
        match self.recommended {
            BetSide::Under => self.implied_under,
            _ => self.implied_over,
        }
    }
}

/// Rule-based probability model: a normal approximation of recent scoring,
/// shifted by additive context and stability adjustments.
pub struct ProbabilityModel {
    context_config: ContextConfig,
    /// Minimum edge as a fraction (5% -> 0.05)
    min_edge: f64,
}

impl ProbabilityModel {
    pub fn new(context_config: ContextConfig, min_edge_percent: f64) -> Self {
        Self {
            context_config,
            min_edge: min_edge_percent / 100.0,
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(config.context.clone(), config.value.min_edge_percent)
    }

    pub fn calculate_probability(
        &self,
        stats: &PlayerStats,
        line: &PlayerLine,
        stability: &StabilityMetrics,
        context: Option<ContextFactors>,
        team_defense: Option<&TeamDefense>,
    ) -> Result<ProbabilityResult> {
        stats.require_windows()?;

        let line_value = line.line_points;

        let base_probability = base_probability(stats, line_value);

        let mut context = context.unwrap_or_else(|| ContextFactors::for_line(line));
        if let Some(defense) = team_defense {
            context.opponent_def_rating = defense.def_rating;
            context.opponent_pace = defense.pace;
        }
        let context_adjustment = self.context_adjustment(&context);
        context.total_adjustment = context_adjustment;

        let stability_adjustment = stability_adjustment(stability);

        let p_over = (base_probability + context_adjustment + stability_adjustment)
            .clamp(MIN_PROBABILITY, MAX_PROBABILITY);
        let p_under = 1.0 - p_over;

        let implied_over = line.over_implied_prob;
        let implied_under = line.under_implied_prob;

        let edge_over = p_over - implied_over;
        let edge_under = p_under - implied_under;

        let (recommended, edge_percent) = self.best_bet(edge_over, edge_under);

        let confidence = confidence(stability, edge_percent.abs(), stats.games_played);

        let reasons = reasons(line_value, stats, stability, &context, recommended);

        Ok(ProbabilityResult {
            player_name: stats.player_name.clone(),
            line: line_value,
            base_probability,
            context_adjustment,
            stability_adjustment,
            p_over,
            p_under,
            implied_over,
            implied_under,
            edge_over,
            edge_under,
            recommended,
            edge_percent,
            confidence,
            reasons,
            context,
        })
    }

    /// Sum of the additive context modifiers
    fn context_adjustment(&self, context: &ContextFactors) -> f64 {
        let cfg = &self.context_config;
        let mut adjustment = 0.0;

        if context.is_home {
            adjustment += cfg.home_advantage;
        } else {
            adjustment += cfg.road_penalty;
        }

        if context.is_back_to_back {
            adjustment += cfg.back_to_back_penalty;
        }

        if context.opponent_def_rating > cfg.weak_defense_threshold {
            adjustment += cfg.weak_defense_bonus;
        } else if context.opponent_def_rating < cfg.strong_defense_threshold {
            adjustment -= STRONG_DEFENSE_PENALTY;
        }

        let pace_diff = (context.opponent_pace - LEAGUE_AVG_PACE) / 100.0;
        adjustment += pace_diff * cfg.high_pace_bonus;

        if context.blowout_risk > 0.5 {
            adjustment += cfg.blowout_risk_penalty * context.blowout_risk;
        }

        adjustment
    }

    fn best_bet(&self, edge_over: f64, edge_under: f64) -> (BetSide, f64) {
        if edge_over >= self.min_edge && edge_over > edge_under {
            (BetSide::Over, edge_over * 100.0)
        } else if edge_under >= self.min_edge && edge_under > edge_over {
            (BetSide::Under, edge_under * 100.0)
        } else {
            (BetSide::NoValue, edge_over.max(edge_under) * 100.0)
        }
    }
}

/// Recency-weighted P(points > line) under a normal approximation
fn base_probability(stats: &PlayerStats, line: f64) -> f64 {
    let pts_10 = stats.points_last_10();
    let mean_10 = mean(&pts_10);
    let std_10 = population_std_dev(&pts_10).max(MIN_STD_DEV);
    let p_over_10 = normal_survival(line, mean_10, std_10);

    let pts_5 = stats.points_last_5();
    let mean_5 = mean(&pts_5);
    let raw_std_5 = population_std_dev(&pts_5);
    let std_5 = if raw_std_5 > MIN_STD_DEV {
        raw_std_5
    } else {
        std_10
    };
    let p_over_5 = normal_survival(line, mean_5, std_5);

    RECENT_WEIGHT * p_over_5 + (1.0 - RECENT_WEIGHT) * p_over_10
}

/// Hit-rate checks take priority over the variance check
fn stability_adjustment(stability: &StabilityMetrics) -> f64 {
    if stability.hit_rate_last_10 > 0.7 {
        0.03
    } else if stability.hit_rate_last_10 < 0.3 {
        -0.03
    } else if stability.cv_pts > 0.25 {
        -0.02
    } else {
        0.0
    }
}

fn confidence(stability: &StabilityMetrics, edge_percent: f64, games_played: u32) -> f64 {
    let mut confidence = 0.5;

    confidence += (stability.stability_score - 50.0) / 200.0;
    confidence += (games_played as f64 / 30.0).min(1.0) * 0.1;

    // suspiciously large edge
    if edge_percent > 15.0 {
        confidence -= 0.1;
    }

    if stability.cv_pts < 0.15 {
        confidence += 0.1;
    } else if stability.cv_pts > 0.25 {
        confidence -= 0.1;
    }

    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

fn reasons(
    line: f64,
    stats: &PlayerStats,
    stability: &StabilityMetrics,
    context: &ContextFactors,
    side: BetSide,
) -> Vec<String> {
    let mut reasons = Vec::new();

    let sample = stats.last_10_games.len();
    let overs = (stability.hit_rate_last_10 * sample as f64).round() as usize;
    let unders = sample - overs.min(sample);

    match side {
        BetSide::Over => {
            if stability.mean_pts > line {
                reasons.push(format!(
                    "Average ({:.1}) above the line ({})",
                    stability.mean_pts, line
                ));
            }
            if overs * 10 >= sample * 7 {
                reasons.push(format!("{} of last {} games went OVER", overs, sample));
            }
        }
        BetSide::Under => {
            if stability.mean_pts < line {
                reasons.push(format!(
                    "Average ({:.1}) below the line ({})",
                    stability.mean_pts, line
                ));
            }
            if unders * 10 >= sample * 7 {
                reasons.push(format!("{} of last {} games went UNDER", unders, sample));
            }
        }
        BetSide::NoValue => {}
    }

    if stability.is_stable {
        reasons.push(format!(
            "High stability (score: {:.0})",
            stability.stability_score
        ));
    }

    if stability.mean_minutes >= 34.0 {
        reasons.push(format!(
            "Steady minutes ({:.0}+ MPG)",
            stability.mean_minutes
        ));
    }

    if context.is_home && side == BetSide::Over {
        reasons.push("Home game (+)".to_string());
    }

    if context.is_back_to_back {
        reasons.push("Back-to-back (-)".to_string());
    }

    if stability.cv_pts < 0.18 {
        reasons.push("Low scoring variance".to_string());
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stability::StabilityAnalyzer;
    use crate::config::StabilityConfig;
    use crate::models::{GameLog, Odds};
    use chrono::{Days, NaiveDate, TimeZone, Utc};

    fn stats_from(points: &[f64], minutes: f64, games_played: u32) -> PlayerStats {
        let newest = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let games = points
            .iter()
            .enumerate()
            .map(|(i, &p)| GameLog::new(newest - Days::new(i as u64), p, minutes))
            .collect();
        let mut stats = PlayerStats::from_game_log("Test Player", "TST", games);
        stats.games_played = games_played;
        stats
    }

    fn line_at(points: f64, is_home: bool, over: Odds, under: Odds) -> PlayerLine {
        PlayerLine::new(
            "Test Player",
            "TST",
            "OPP",
            "g1",
            Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap(),
            is_home,
            points,
            over,
            under,
        )
        .unwrap()
    }

    fn model() -> ProbabilityModel {
        ProbabilityModel::from_config(&AnalyzerConfig::default())
    }

    fn evaluate(
        stats: &PlayerStats,
        line: &PlayerLine,
        context: Option<ContextFactors>,
        defense: Option<&TeamDefense>,
    ) -> ProbabilityResult {
        let stability = StabilityAnalyzer::new(StabilityConfig::default())
            .analyze(stats, line.line_points)
            .unwrap();
        model()
            .calculate_probability(stats, line, &stability, context, defense)
            .unwrap()
    }

    const CONSISTENT: [f64; 10] = [30.0, 32.0, 28.0, 31.0, 29.0, 30.0, 33.0, 27.0, 31.0, 30.0];

    #[test]
    fn test_consistent_scorer_recommends_over() {
        let stats = stats_from(&CONSISTENT, 36.0, 40);
        let line = line_at(24.5, true, Odds::American(-110), Odds::American(-110));
        let result = evaluate(&stats, &line, None, None);

        assert_eq!(result.recommended, BetSide::Over);
        assert!(result.edge_over > 0.0);
        assert_eq!(result.p_over, 0.95);
        assert!((result.edge_percent - (0.95 - 110.0 / 210.0) * 100.0).abs() < 1e-9);
        assert!(result.reasons.iter().any(|r| r.contains("10 of last 10")));
        assert!(result.reasons.contains(&"Home game (+)".to_string()));
    }

    #[test]
    fn test_probabilities_are_complementary_and_clipped() {
        let cases: [&[f64]; 3] = [
            &CONSISTENT,
            &[5.0, 40.0, 12.0, 33.0, 0.0, 21.0, 18.0, 44.0, 9.0, 27.0],
            &[0.0; 10],
        ];
        for points in cases {
            for line_points in [0.5, 15.5, 24.5, 60.5] {
                let stats = stats_from(points, 30.0, 20);
                let line = line_at(
                    line_points,
                    false,
                    Odds::American(-120),
                    Odds::American(100),
                );
                let result = evaluate(&stats, &line, None, None);
                assert_eq!(result.p_over + result.p_under, 1.0);
                assert!(result.p_over >= 0.05 && result.p_over <= 0.95);
                assert!(result.p_under >= 0.05 && result.p_under <= 0.95);
                assert!(result.confidence >= 0.3 && result.confidence <= 0.9);
            }
        }
    }

    #[test]
    fn test_base_probability_blend() {
        // last 5 average 30, last 10 average 25, line at the last-10 mean
        let stats = stats_from(
            &[32.0, 28.0, 32.0, 28.0, 30.0, 21.0, 19.0, 21.0, 19.0, 20.0],
            30.0,
            20,
        );
        let p = base_probability(&stats, 25.0);
        let std_10 = population_std_dev(&stats.points_last_10());
        let std_5 = population_std_dev(&stats.points_last_5());
        let expected =
            0.6 * normal_survival(25.0, 30.0, std_5) + 0.4 * normal_survival(25.0, 25.0, std_10);
        assert!((p - expected).abs() < 1e-12);
        assert!(p > 0.6);
    }

    #[test]
    fn test_flat_history_uses_std_floor() {
        let stats = stats_from(&[20.0; 10], 30.0, 20);
        // z = 1 with the floored std of 1.0
        let p = base_probability(&stats, 21.0);
        assert!((p - normal_survival(1.0, 0.0, 1.0)).abs() < 1e-12);
        assert!((p - 0.1587).abs() < 1e-3);
    }

    #[test]
    fn test_context_adjustment() {
        let m = model();
        let home = ContextFactors::default();
        assert!((m.context_adjustment(&home) - 0.03).abs() < 1e-12);

        let road_b2b = ContextFactors {
            is_home: false,
            is_back_to_back: true,
            ..ContextFactors::default()
        };
        assert!((m.context_adjustment(&road_b2b) + 0.06).abs() < 1e-12);

        let weak_fast = ContextFactors {
            opponent_def_rating: 118.0,
            opponent_pace: 105.0,
            ..ContextFactors::default()
        };
        assert!((m.context_adjustment(&weak_fast) - (0.03 + 0.05 + 0.05 * 0.02)).abs() < 1e-12);

        let strong_blowout = ContextFactors {
            opponent_def_rating: 105.0,
            blowout_risk: 0.8,
            ..ContextFactors::default()
        };
        assert!((m.context_adjustment(&strong_blowout) - (0.03 - 0.03 - 0.03 * 0.8)).abs() < 1e-12);
    }

    #[test]
    fn test_team_defense_overrides_context() {
        let stats = stats_from(
            &[22.0, 26.0, 24.0, 25.0, 23.0, 27.0, 21.0, 24.0, 25.0, 23.0],
            34.0,
            20,
        );
        let line = line_at(24.5, true, Odds::American(-110), Odds::American(-110));
        let weak = TeamDefense {
            team_name: "Washington Wizards".to_string(),
            team_abbr: "WAS".to_string(),
            def_rating: 119.0,
            opp_pts_per_game: 121.0,
            pace: 100.0,
        };

        let neutral = evaluate(&stats, &line, None, None);
        let boosted = evaluate(&stats, &line, None, Some(&weak));
        assert!((boosted.context_adjustment - neutral.context_adjustment - 0.05).abs() < 1e-12);
        assert_eq!(boosted.context.opponent_def_rating, 119.0);
        assert_eq!(boosted.context.total_adjustment, boosted.context_adjustment);
    }

    #[test]
    fn test_stability_adjustment_priority() {
        let mut stability = StabilityAnalyzer::new(StabilityConfig::default())
            .analyze(&stats_from(&CONSISTENT, 36.0, 20), 24.5)
            .unwrap();

        stability.hit_rate_last_10 = 0.8;
        stability.cv_pts = 0.4;
        assert_eq!(stability_adjustment(&stability), 0.03);

        stability.hit_rate_last_10 = 0.2;
        assert_eq!(stability_adjustment(&stability), -0.03);

        stability.hit_rate_last_10 = 0.5;
        assert_eq!(stability_adjustment(&stability), -0.02);

        stability.cv_pts = 0.2;
        assert_eq!(stability_adjustment(&stability), 0.0);

        // exactly 0.7 is not above 0.7
        stability.hit_rate_last_10 = 0.7;
        assert_eq!(stability_adjustment(&stability), 0.0);
    }

    #[test]
    fn test_zero_edges_are_no_value() {
        let (side, edge) = model().best_bet(0.0, 0.0);
        assert_eq!(side, BetSide::NoValue);
        assert_eq!(edge, 0.0);

        // equal positive edges do not pick a side either
        let (side, _) = model().best_bet(0.07, 0.07);
        assert_eq!(side, BetSide::NoValue);
    }

    #[test]
    fn test_best_bet_thresholds() {
        let m = model();
        assert_eq!(m.best_bet(0.06, -0.08).0, BetSide::Over);
        assert_eq!(m.best_bet(-0.08, 0.06).0, BetSide::Under);
        let (side, edge) = m.best_bet(0.04, -0.06);
        assert_eq!(side, BetSide::NoValue);
        assert!((edge - 4.0).abs() < 1e-9);
        let (side, edge) = m.best_bet(-0.02, -0.03);
        assert_eq!(side, BetSide::NoValue);
        assert!((edge + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_fair_pricing_at_model_probability_is_no_value() {
        // Symmetric history around the line gives a base of 0.5; with no home
        // bonus every adjustment is zero and the model matches even money.
        let stats = stats_from(
            &[20.0, 25.0, 30.0, 20.0, 30.0, 25.0, 20.0, 30.0, 25.0, 25.0],
            30.0,
            20,
        );
        let line = line_at(25.0, true, Odds::Decimal(2.0), Odds::Decimal(2.0));
        let m = ProbabilityModel::new(
            ContextConfig {
                home_advantage: 0.0,
                ..ContextConfig::default()
            },
            5.0,
        );
        let stability = StabilityAnalyzer::new(StabilityConfig::default())
            .analyze(&stats, 25.0)
            .unwrap();
        let result = m
            .calculate_probability(&stats, &line, &stability, None, None)
            .unwrap();

        assert!((result.base_probability - 0.5).abs() < 1e-6);
        assert!(result.edge_over.abs() < 1e-6);
        assert!(result.edge_under.abs() < 1e-6);
        assert_eq!(result.recommended, BetSide::NoValue);
    }

    #[test]
    fn test_confidence() {
        let mut stability = StabilityAnalyzer::new(StabilityConfig::default())
            .analyze(&stats_from(&CONSISTENT, 36.0, 20), 24.5)
            .unwrap();
        stability.stability_score = 70.0;
        stability.cv_pts = 0.2;

        // 0.5 + 0.1 + 0.1 * (15 / 30)
        assert!((confidence(&stability, 6.0, 15) - 0.65).abs() < 1e-12);
        // large edge penalty
        assert!((confidence(&stability, 20.0, 15) - 0.55).abs() < 1e-12);
        // games factor caps at 0.1
        assert!((confidence(&stability, 6.0, 82) - 0.7).abs() < 1e-12);

        stability.cv_pts = 0.1;
        stability.stability_score = 100.0;
        assert_eq!(confidence(&stability, 6.0, 82), 0.9);

        stability.cv_pts = 0.4;
        stability.stability_score = 0.0;
        assert_eq!(confidence(&stability, 30.0, 0), 0.3);
    }

    #[test]
    fn test_under_reasons() {
        let stats = stats_from(
            &[12.0, 14.0, 13.0, 15.0, 12.0, 14.0, 13.0, 12.0, 15.0, 14.0],
            35.0,
            30,
        );
        let line = line_at(20.5, false, Odds::American(-110), Odds::American(-110));
        let result = evaluate(&stats, &line, None, None);

        assert_eq!(result.recommended, BetSide::Under);
        assert_eq!(result.model_probability(), result.p_under);
        assert_eq!(result.implied_probability(), result.implied_under);
        assert!(result.reasons[0].starts_with("Average (13.4) below the line"));
        assert!(result.reasons.iter().any(|r| r == "10 of last 10 games went UNDER"));
        assert!(!result.reasons.iter().any(|r| r.starts_with("Home game")));
    }
}
