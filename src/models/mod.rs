use crate::error::{AnalyzerError, Result};
use crate::utils::distribution::mean;
use crate::utils::odds::{
    american_odds_payout, american_odds_to_probability, decimal_odds_to_probability,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Player name -> injury status (e.g. "Out", "Questionable")
pub type InjuryReport = HashMap<String, String>;

/// A bookmaker price in one of the supported formats
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Odds {
    /// American format (e.g., -110, +150)
    American(i32),
    /// Decimal format (e.g., 1.91)
    Decimal(f64),
}

impl Odds {
    /// Implied probability of the price, rejecting prices that cannot exist
    pub fn implied_probability(&self) -> Result<f64> {
        match *self {
            Odds::American(price) if price.unsigned_abs() >= 100 => {
                Ok(american_odds_to_probability(price))
            }
            Odds::Decimal(price) if price > 1.0 && price.is_finite() => {
                Ok(decimal_odds_to_probability(price))
            }
            other => Err(AnalyzerError::InvalidOdds(other.to_string())),
        }
    }

    /// Net profit per unit staked if the bet wins
    pub fn payout(&self) -> f64 {
        match *self {
            Odds::American(price) => american_odds_payout(price),
            Odds::Decimal(price) => price - 1.0,
        }
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Odds::American(price) => write!(f, "{:+}", price),
            Odds::Decimal(price) => write!(f, "{:.2}", price),
        }
    }
}

/// One posted over/under points market for one player in one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlayerLineRecord")]
pub struct PlayerLine {
    pub player_name: String,
    pub player_id: Option<String>,
    pub team: String,
    /// Opponent descriptor: an abbreviation, a team name or "Away @ Home"
    pub opponent: String,
    pub game_id: String,
    pub game_time: DateTime<Utc>,
    pub is_home: bool,
    pub line_points: f64,
    pub over_odds: Odds,
    pub under_odds: Odds,
    pub over_implied_prob: f64,
    pub under_implied_prob: f64,
}

/// Wire shape of a `PlayerLine`; implied probabilities are always derived
#[derive(Debug, Deserialize)]
struct PlayerLineRecord {
    player_name: String,
    #[serde(default)]
    player_id: Option<String>,
    #[serde(default)]
    team: String,
    #[serde(default)]
    opponent: String,
    #[serde(default)]
    game_id: String,
    game_time: DateTime<Utc>,
    #[serde(default = "default_true")]
    is_home: bool,
    line_points: f64,
    over_odds: Odds,
    under_odds: Odds,
}

fn default_true() -> bool {
    true
}

impl TryFrom<PlayerLineRecord> for PlayerLine {
    type Error = AnalyzerError;

    fn try_from(record: PlayerLineRecord) -> Result<Self> {
        let mut line = PlayerLine::new(
            record.player_name,
            record.team,
            record.opponent,
            record.game_id,
            record.game_time,
            record.is_home,
            record.line_points,
            record.over_odds,
            record.under_odds,
        )?;
        line.player_id = record.player_id;
        Ok(line)
    }
}

impl PlayerLine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        player_name: impl Into<String>,
        team: impl Into<String>,
        opponent: impl Into<String>,
        game_id: impl Into<String>,
        game_time: DateTime<Utc>,
        is_home: bool,
        line_points: f64,
        over_odds: Odds,
        under_odds: Odds,
    ) -> Result<Self> {
        let over_implied_prob = over_odds.implied_probability()?;
        let under_implied_prob = under_odds.implied_probability()?;

        Ok(Self {
            player_name: player_name.into(),
            player_id: None,
            team: team.into(),
            opponent: opponent.into(),
            game_id: game_id.into(),
            game_time,
            is_home,
            line_points,
            over_odds,
            under_odds,
            over_implied_prob,
            under_implied_prob,
        })
    }
}

/// Win/loss of a single game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Loss,
}

/// One box score line from a player's game log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLog {
    pub date: NaiveDate,
    #[serde(default)]
    pub matchup: String,
    pub points: f64,
    #[serde(deserialize_with = "deserialize_minutes")]
    pub minutes: f64,
    #[serde(default)]
    pub outcome: Option<GameOutcome>,
    #[serde(default)]
    pub fga: f64,
    #[serde(default)]
    pub fta: f64,
    #[serde(default)]
    pub rebounds: f64,
    #[serde(default)]
    pub assists: f64,
    #[serde(default)]
    pub plus_minus: f64,
}

impl GameLog {
    pub fn new(date: NaiveDate, points: f64, minutes: f64) -> Self {
        Self {
            date,
            matchup: String::new(),
            points,
            minutes,
            outcome: None,
            fga: 0.0,
            fta: 0.0,
            rebounds: 0.0,
            assists: 0.0,
            plus_minus: 0.0,
        }
    }

    /// Shot-volume usage estimate: (FGA + 0.44 * FTA) per minute
    pub fn usage_estimate(&self) -> Option<f64> {
        if self.minutes > 0.0 {
            Some((self.fga + 0.44 * self.fta) / self.minutes)
        } else {
            None
        }
    }
}

/// Parse minutes from "MM:SS" or a plain number; unparseable or non-finite text is 0
pub fn parse_minutes(raw: &str) -> f64 {
    let parse = |text: &str| {
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .unwrap_or(0.0)
    };

    let raw = raw.trim();
    if let Some((mins, secs)) = raw.split_once(':') {
        parse(mins) + parse(secs) / 60.0
    } else {
        parse(raw)
    }
}

fn deserialize_minutes<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawMinutes {
        Number(f64),
        Text(String),
    }

    Ok(match RawMinutes::deserialize(deserializer)? {
        RawMinutes::Number(minutes) => minutes,
        RawMinutes::Text(text) => parse_minutes(&text),
    })
}

/// A player's recent performance window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_name: String,
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub team: String,
    pub season_ppg: f64,
    pub season_mpg: f64,
    #[serde(default)]
    pub season_usage: f64,
    pub games_played: u32,
    /// Newest first
    pub last_5_games: Vec<GameLog>,
    /// Newest first; `last_5_games` is its prefix
    pub last_10_games: Vec<GameLog>,
    #[serde(default)]
    pub injury_status: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl PlayerStats {
    /// Build a stats record from a full game log. The log is sorted newest-first
    /// before the recent windows are cut from it.
    pub fn from_game_log(
        player_name: impl Into<String>,
        team: impl Into<String>,
        mut games: Vec<GameLog>,
    ) -> Self {
        games.sort_by(|a, b| b.date.cmp(&a.date));

        let points: Vec<f64> = games.iter().map(|g| g.points).collect();
        let minutes: Vec<f64> = games.iter().map(|g| g.minutes).collect();
        let usage: Vec<f64> = games.iter().filter_map(GameLog::usage_estimate).collect();

        let last_10_games: Vec<GameLog> = games.iter().take(10).cloned().collect();
        let last_5_games: Vec<GameLog> = games.iter().take(5).cloned().collect();

        Self {
            player_name: player_name.into(),
            player_id: None,
            team: team.into(),
            season_ppg: mean(&points),
            season_mpg: mean(&minutes),
            season_usage: mean(&usage),
            games_played: games.len() as u32,
            last_5_games,
            last_10_games,
            injury_status: None,
            is_available: true,
        }
    }

    pub fn points_last_5(&self) -> Vec<f64> {
        self.last_5_games.iter().map(|g| g.points).collect()
    }

    pub fn points_last_10(&self) -> Vec<f64> {
        self.last_10_games.iter().map(|g| g.points).collect()
    }

    pub fn minutes_last_5(&self) -> Vec<f64> {
        self.last_5_games.iter().map(|g| g.minutes).collect()
    }

    pub fn minutes_last_10(&self) -> Vec<f64> {
        self.last_10_games.iter().map(|g| g.minutes).collect()
    }

    /// Average minutes over the last 10 games; 0.0 when there are none
    pub fn avg_min_last_10(&self) -> f64 {
        mean(&self.minutes_last_10())
    }

    /// Fail fast unless both recent windows are present and usable
    pub fn require_windows(&self) -> Result<()> {
        if self.last_5_games.is_empty() {
            return Err(AnalyzerError::EmptyGameHistory {
                player: self.player_name.clone(),
                window: "last-5",
            });
        }
        if self.last_10_games.is_empty() {
            return Err(AnalyzerError::EmptyGameHistory {
                player: self.player_name.clone(),
                window: "last-10",
            });
        }
        Ok(())
    }

    /// Check the recency invariants of the game windows
    pub fn validate(&self) -> Result<()> {
        self.require_windows()?;

        let newest_first = |games: &[GameLog]| games.windows(2).all(|w| w[0].date >= w[1].date);
        if !newest_first(&self.last_5_games) || !newest_first(&self.last_10_games) {
            return Err(AnalyzerError::UnorderedGameHistory {
                player: self.player_name.clone(),
            });
        }

        let is_prefix = self.last_5_games.len() <= self.last_10_games.len()
            && self
                .last_5_games
                .iter()
                .zip(&self.last_10_games)
                .all(|(a, b)| a == b);
        if !is_prefix {
            return Err(AnalyzerError::WindowMismatch {
                player: self.player_name.clone(),
            });
        }

        Ok(())
    }
}

/// Defensive profile of a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDefense {
    pub team_name: String,
    pub team_abbr: String,
    /// Points allowed per 100 possessions
    pub def_rating: f64,
    #[serde(default)]
    pub opp_pts_per_game: f64,
    pub pace: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn log(day: u32, points: f64, minutes: f64) -> GameLog {
        GameLog::new(NaiveDate::from_ymd_opt(2025, 1, day).unwrap(), points, minutes)
    }

    #[test]
    fn test_odds_implied_probability() {
        let p = Odds::American(-110).implied_probability().unwrap();
        assert!((p - 0.5238).abs() < 0.001);
        let p = Odds::Decimal(2.5).implied_probability().unwrap();
        assert!((p - 0.4).abs() < 1e-12);

        assert!(Odds::American(0).implied_probability().is_err());
        assert!(Odds::American(50).implied_probability().is_err());
        assert!(Odds::Decimal(1.0).implied_probability().is_err());
    }

    #[test]
    fn test_player_line_derives_implied_probabilities() {
        let json = r#"{
            "player_name": "Jalen Brunson",
            "team": "NYK",
            "opponent": "BOS",
            "game_id": "g1",
            "game_time": "2025-01-20T00:30:00Z",
            "is_home": false,
            "line_points": 27.5,
            "over_odds": { "american": -115 },
            "under_odds": { "decimal": 1.95 }
        }"#;
        let line: PlayerLine = serde_json::from_str(json).unwrap();
        assert!(!line.is_home);
        assert!((line.over_implied_prob - 115.0 / 215.0).abs() < 1e-12);
        assert!((line.under_implied_prob - 1.0 / 1.95).abs() < 1e-12);
        assert_eq!(
            line.game_time,
            Utc.with_ymd_and_hms(2025, 1, 20, 0, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_player_line_rejects_bad_price() {
        let json = r#"{
            "player_name": "X",
            "game_time": "2025-01-20T00:30:00Z",
            "line_points": 10.5,
            "over_odds": { "american": 0 },
            "under_odds": { "american": -110 }
        }"#;
        assert!(serde_json::from_str::<PlayerLine>(json).is_err());
    }

    #[test]
    fn test_parse_minutes() {
        assert!((parse_minutes("34:30") - 34.5).abs() < 1e-12);
        assert!((parse_minutes("28") - 28.0).abs() < 1e-12);
        assert_eq!(parse_minutes(""), 0.0);
        assert_eq!(parse_minutes("DNP"), 0.0);
        assert_eq!(parse_minutes("NaN"), 0.0);
        assert_eq!(parse_minutes("inf"), 0.0);
        assert_eq!(parse_minutes("NaN:30"), 0.5);
    }

    #[test]
    fn test_game_log_minutes_accepts_text() {
        let json = r#"{ "date": "2025-01-03", "points": 31, "minutes": "36:45", "outcome": "W" }"#;
        let game: GameLog = serde_json::from_str(json).unwrap();
        assert!((game.minutes - 36.75).abs() < 1e-12);
        assert_eq!(game.outcome, Some(GameOutcome::Win));
    }

    #[test]
    fn test_from_game_log_builds_windows() {
        let mut games: Vec<GameLog> = (1..=12).map(|d| log(d, d as f64 + 10.0, 30.0)).collect();
        games[0].fga = 15.0;
        games[0].fta = 5.0;

        let stats = PlayerStats::from_game_log("Test Player", "TST", games);
        assert_eq!(stats.games_played, 12);
        assert_eq!(stats.last_10_games.len(), 10);
        assert_eq!(stats.last_5_games.len(), 5);
        // newest game (Jan 12) first
        assert_eq!(stats.last_10_games[0].points, 22.0);
        assert!(stats.validate().is_ok());
        assert!((stats.season_mpg - 30.0).abs() < 1e-12);
        assert!(stats.season_usage > 0.0);
    }

    #[test]
    fn test_validate_detects_broken_windows() {
        let mut stats = PlayerStats::from_game_log(
            "Test Player",
            "TST",
            (1..=10).map(|d| log(d, 20.0, 30.0)).collect(),
        );
        stats.last_5_games.reverse();
        assert!(matches!(
            stats.validate(),
            Err(AnalyzerError::UnorderedGameHistory { .. })
        ));

        stats.last_5_games = vec![log(1, 99.0, 30.0)];
        assert!(matches!(
            stats.validate(),
            Err(AnalyzerError::WindowMismatch { .. })
        ));

        stats.last_5_games.clear();
        assert!(matches!(
            stats.validate(),
            Err(AnalyzerError::EmptyGameHistory { window: "last-5", .. })
        ));
    }

    #[test]
    fn test_avg_min_last_10_empty() {
        let mut stats = PlayerStats::from_game_log("Nobody", "", vec![]);
        stats.last_10_games.clear();
        assert_eq!(stats.avg_min_last_10(), 0.0);
    }
}
