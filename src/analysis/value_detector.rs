use crate::analysis::probability_model::{BetSide, ContextFactors, ProbabilityModel};
use crate::analysis::stability::RiskLevel;
use crate::analysis::AnalyzedPlayer;
use crate::config::{AnalyzerConfig, ValueConfig};
use crate::error::Result;
use crate::models::{Odds, TeamDefense};
use crate::utils::odds::calculate_expected_value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Team abbreviation -> defensive profile. Ordered so opponent matching is deterministic.
pub type TeamDefenses = BTreeMap<String, TeamDefense>;

/// A ranked value bet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueBet {
    pub rank: usize,
    pub player_name: String,
    pub team: String,
    pub opponent: String,
    pub game_time: DateTime<Utc>,
    pub line: f64,
    pub bet_side: BetSide,
    /// Price of the recommended side
    pub odds: Odds,
    pub model_prob: f64,
    pub implied_prob: f64,
    pub edge_percent: f64,
    /// Per unit staked at `odds` and `model_prob`
    pub expected_value: f64,
    pub is_strong: bool,
    pub stability_score: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

impl ValueBet {
    /// Format the value bet as a readable one-line summary
    pub fn format(&self) -> String {
        format!(
            "#{} {} {} {} ({}) | {} vs {} | Edge: {:+.1}%{} | EV: {:+.2}% | Model: {:.1}% | Implied: {:.1}% | Stability: {:.0} ({}) | Confidence: {:.0}%",
            self.rank,
            self.player_name,
            self.bet_side,
            self.line,
            self.odds,
            self.team,
            self.opponent,
            self.edge_percent,
            if self.is_strong { " [strong]" } else { "" },
            self.expected_value * 100.0,
            self.model_prob * 100.0,
            self.implied_prob * 100.0,
            self.stability_score,
            self.risk_level,
            self.confidence * 100.0
        )
    }
}

/// Runs the probability model over an analyzed pool and ranks the bets that qualify
pub struct ValueDetector {
    config: ValueConfig,
    model: ProbabilityModel,
}

impl ValueDetector {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            config: config.value.clone(),
            model: ProbabilityModel::from_config(config),
        }
    }

    /// Evaluate every analyzed player and return the top-N bets by edge.
    /// Ties keep their input order.
    pub fn detect_value_bets(
        &self,
        analyzed: &[AnalyzedPlayer],
        team_defenses: Option<&TeamDefenses>,
    ) -> Result<Vec<ValueBet>> {
        let mut value_bets = Vec::new();

        for item in analyzed {
            let line = &item.line;
            let opponent_defense =
                team_defenses.and_then(|defenses| find_opponent(defenses, &line.opponent));

            let context = ContextFactors::for_matchup(line, opponent_defense);
            let result = self.model.calculate_probability(
                &item.stats,
                line,
                &item.stability,
                Some(context),
                opponent_defense,
            )?;

            debug!(
                player = %result.player_name,
                side = %result.recommended,
                edge = result.edge_percent,
                confidence = result.confidence,
                "Evaluated player line"
            );

            if result.recommended == BetSide::NoValue
                || result.edge_percent < self.config.min_edge_percent
                || result.confidence < self.config.min_confidence
            {
                continue;
            }

            let model_prob = result.model_probability();
            let odds = match result.recommended {
                BetSide::Under => line.under_odds,
                _ => line.over_odds,
            };

            value_bets.push(ValueBet {
                rank: 0,
                player_name: item.stats.player_name.clone(),
                team: if item.stats.team.is_empty() {
                    line.team.clone()
                } else {
                    item.stats.team.clone()
                },
                opponent: line.opponent.clone(),
                game_time: line.game_time,
                line: line.line_points,
                bet_side: result.recommended,
                odds,
                model_prob,
                implied_prob: result.implied_probability(),
                edge_percent: result.edge_percent,
                expected_value: calculate_expected_value(model_prob, odds.payout()),
                is_strong: result.edge_percent >= self.config.strong_edge_percent,
                stability_score: item.stability.stability_score,
                risk_level: item.stability.risk_level,
                confidence: result.confidence,
                reasons: result.reasons,
            });
        }

        // Sort by edge (descending); sort_by is stable so ties keep input order
        value_bets.sort_by(|a, b| {
            b.edge_percent
                .partial_cmp(&a.edge_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for (i, bet) in value_bets.iter_mut().enumerate() {
            bet.rank = i + 1;
        }

        info!(
            candidates = analyzed.len(),
            qualifying = value_bets.len(),
            "Value detection complete"
        );

        value_bets.truncate(self.config.top_n_results);
        Ok(value_bets)
    }
}

/// First team whose abbreviation appears in the opponent descriptor, or whose
/// name contains it
pub fn find_opponent<'a>(defenses: &'a TeamDefenses, opponent: &str) -> Option<&'a TeamDefense> {
    if opponent.is_empty() {
        return None;
    }
    defenses
        .iter()
        .find(|(abbr, defense)| {
            (!abbr.is_empty() && opponent.contains(abbr.as_str()))
                || defense.team_name.contains(opponent)
        })
        .map(|(_, defense)| defense)
}

/// Render value bets as a multi-line report
pub fn render_report(value_bets: &[ValueBet]) -> String {
    if value_bets.is_empty() {
        return "No value bets found in the current player pool.".to_string();
    }

    let mut output = Vec::new();
    output.push("=".repeat(70));
    output.push("NBA PLAYER POINTS VALUE BETS".to_string());
    output.push("=".repeat(70));

    for bet in value_bets {
        output.push(format!("#{}. {}", bet.rank, bet.player_name));
        output.push(format!("   Line: O/U {} points", bet.line));
        output.push(format!(
            "   Recommendation: {} ({}){}",
            bet.bet_side,
            bet.odds,
            if bet.is_strong { " - strong edge" } else { "" }
        ));
        output.push(format!("   Model probability:     {:.1}%", bet.model_prob * 100.0));
        output.push(format!("   Implied probability:   {:.1}%", bet.implied_prob * 100.0));
        output.push(format!(
            "   Edge: {:+.1}%  EV: {:+.2}%",
            bet.edge_percent,
            bet.expected_value * 100.0
        ));
        output.push(format!(
            "   Stability: {:.0}/100 ({})  Confidence: {:.0}%",
            bet.stability_score,
            bet.risk_level,
            bet.confidence * 100.0
        ));
        if !bet.reasons.is_empty() {
            output.push("   Reasons:".to_string());
            for reason in &bet.reasons {
                output.push(format!("   - {}", reason));
            }
        }
        output.push(format!(
            "   {} vs {} | {}",
            bet.team,
            bet.opponent,
            bet.game_time.format("%Y-%m-%d %H:%M")
        ));
        output.push("-".repeat(70));
    }

    output.push("This is an analytical tool, not financial advice.".to_string());
    output.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defense(name: &str, abbr: &str, rating: f64) -> TeamDefense {
        TeamDefense {
            team_name: name.to_string(),
            team_abbr: abbr.to_string(),
            def_rating: rating,
            opp_pts_per_game: rating,
            pace: 100.0,
        }
    }

    fn defenses() -> TeamDefenses {
        let mut map = TeamDefenses::new();
        map.insert("BOS".to_string(), defense("Boston Celtics", "BOS", 107.0));
        map.insert("WAS".to_string(), defense("Washington Wizards", "WAS", 119.0));
        map
    }

    #[test]
    fn test_find_opponent_by_abbreviation() {
        let map = defenses();
        assert_eq!(find_opponent(&map, "WAS").unwrap().team_abbr, "WAS");
        assert_eq!(find_opponent(&map, "@ BOS").unwrap().team_abbr, "BOS");
    }

    #[test]
    fn test_find_opponent_by_name_fragment() {
        let map = defenses();
        assert_eq!(find_opponent(&map, "Celtics").unwrap().team_abbr, "BOS");
        assert!(find_opponent(&map, "Lakers").is_none());
        assert!(find_opponent(&map, "").is_none());
    }

    #[test]
    fn test_find_opponent_first_match_wins() {
        let map = defenses();
        // both abbreviations appear; BTreeMap order makes BOS first
        assert_eq!(find_opponent(&map, "WAS @ BOS").unwrap().team_abbr, "BOS");
    }

    #[test]
    fn test_render_empty_report() {
        assert_eq!(
            render_report(&[]),
            "No value bets found in the current player pool."
        );
    }
}
