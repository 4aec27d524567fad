use crate::models::{Odds, PlayerLine};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, warn};

const ODDS_API_BASE_URL: &str = "https://api.the-odds-api.com/v4";
const SPORT_KEY: &str = "basketball_nba";
const PLAYER_POINTS_MARKET: &str = "player_points";

/// Upcoming event from The Odds API events endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct OddsApiEvent {
    pub id: String,
    pub commence_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
}

/// Event odds response for the player props endpoint
#[derive(Debug, Deserialize)]
struct OddsApiEventOdds {
    id: String,
    commence_time: DateTime<Utc>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<OddsApiBookmaker>,
}

#[derive(Debug, Deserialize)]
struct OddsApiBookmaker {
    key: String,
    markets: Vec<OddsApiMarket>,
}

#[derive(Debug, Deserialize)]
struct OddsApiMarket {
    key: String,
    outcomes: Vec<OddsApiOutcome>,
}

/// One side of a player prop; `description` carries the player name
#[derive(Debug, Deserialize)]
struct OddsApiOutcome {
    name: String,
    #[serde(default)]
    description: Option<String>,
    price: f64,
    #[serde(default)]
    point: Option<f64>,
}

#[derive(Default)]
struct PropSides {
    point: Option<f64>,
    over: Option<i32>,
    under: Option<i32>,
}

pub struct OddsApiClient {
    api_key: String,
    client: reqwest::Client,
}

impl OddsApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch NBA events starting within the next two days
    pub async fn fetch_upcoming_events(&self) -> Result<Vec<OddsApiEvent>> {
        let url = format!("{}/sports/{}/events", ODDS_API_BASE_URL, SPORT_KEY);

        let now = Utc::now();
        let window_end = now + chrono::Duration::days(2);
        let from = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let to = window_end.format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("commenceTimeFrom", from.as_str()),
                ("commenceTimeTo", to.as_str()),
            ])
            .send()
            .await
            .context("Failed to fetch events from The Odds API")?;

        if !response.status().is_success() {
            anyhow::bail!("Odds API returned error: {}", response.status());
        }

        let events: Vec<OddsApiEvent> = response
            .json()
            .await
            .context("Failed to parse Odds API events response")?;

        Ok(events
            .into_iter()
            .filter(|event| event.commence_time > now && event.commence_time <= window_end)
            .collect())
    }

    /// Fetch player points lines for every upcoming event. Events without a
    /// props market are skipped.
    pub async fn fetch_player_points_lines(&self) -> Result<Vec<PlayerLine>> {
        let events = self.fetch_upcoming_events().await?;
        info!(events = events.len(), "Fetched upcoming NBA events");

        let mut lines = Vec::new();
        for event in &events {
            match self.fetch_event_props(&event.id).await? {
                Some(event_odds) => lines.extend(parse_player_points(event_odds)),
                None => continue,
            }
        }

        info!(lines = lines.len(), "Fetched player points lines");
        Ok(lines)
    }

    async fn fetch_event_props(&self, event_id: &str) -> Result<Option<OddsApiEventOdds>> {
        let url = format!(
            "{}/sports/{}/events/{}/odds",
            ODDS_API_BASE_URL, SPORT_KEY, event_id
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", "us"),
                ("markets", PLAYER_POINTS_MARKET),
                ("oddsFormat", "american"),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to fetch props for event {}", event_id))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                warn!(event_id, status = %response.status(), "No player props for event, skipping");
                return Ok(None);
            }
            status if !status.is_success() => {
                anyhow::bail!("Odds API returned error: {}", status);
            }
            _ => {}
        }

        let event_odds = response
            .json()
            .await
            .context("Failed to parse Odds API event odds response")?;
        Ok(Some(event_odds))
    }

    /// Log how many API requests remain on the key
    pub async fn check_usage(&self) -> Result<()> {
        let url = format!("{}/sports", ODDS_API_BASE_URL);

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("unknown")
                .to_string()
        };
        info!(
            remaining = %header("x-requests-remaining"),
            used = %header("x-requests-used"),
            "Odds API usage"
        );

        Ok(())
    }
}

/// Pair Over/Under outcomes per player from the first bookmaker's points market.
/// Players missing either side, or quoted at an impossible price, are skipped.
fn parse_player_points(event: OddsApiEventOdds) -> Vec<PlayerLine> {
    let Some(bookmaker) = event.bookmakers.first() else {
        return Vec::new();
    };
    let Some(market) = bookmaker
        .markets
        .iter()
        .find(|m| m.key == PLAYER_POINTS_MARKET)
    else {
        return Vec::new();
    };

    // keep first-seen order so output is stable
    let mut order: Vec<String> = Vec::new();
    let mut sides: HashMap<String, PropSides> = HashMap::new();

    for outcome in &market.outcomes {
        let Some(player) = outcome.description.as_deref() else {
            continue;
        };
        let entry = sides.entry(player.to_string()).or_insert_with(|| {
            order.push(player.to_string());
            PropSides::default()
        });
        let price = outcome.price.round() as i32;
        match outcome.name.as_str() {
            "Over" => {
                entry.over = Some(price);
                entry.point = entry.point.or(outcome.point);
            }
            "Under" => {
                entry.under = Some(price);
                entry.point = entry.point.or(outcome.point);
            }
            _ => {}
        }
    }

    let opponent = format!("{} @ {}", event.away_team, event.home_team);
    let mut lines = Vec::with_capacity(order.len());

    for player in order {
        let Some(PropSides {
            point: Some(point),
            over: Some(over),
            under: Some(under),
        }) = sides.remove(&player)
        else {
            continue;
        };

        match PlayerLine::new(
            player.clone(),
            "",
            opponent.clone(),
            event.id.clone(),
            event.commence_time,
            true,
            point,
            Odds::American(over),
            Odds::American(under),
        ) {
            Ok(line) => lines.push(line),
            Err(e) => {
                warn!(player = %player, bookmaker = %bookmaker.key, error = %e, "Skipping prop line")
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_ODDS: &str = r#"{
        "id": "evt-1",
        "sport_key": "basketball_nba",
        "commence_time": "2025-01-20T00:30:00Z",
        "home_team": "Boston Celtics",
        "away_team": "New York Knicks",
        "bookmakers": [
            {
                "key": "draftkings",
                "title": "DraftKings",
                "markets": [
                    {
                        "key": "player_points",
                        "outcomes": [
                            { "name": "Over", "description": "Jalen Brunson", "price": -115, "point": 27.5 },
                            { "name": "Under", "description": "Jalen Brunson", "price": -105, "point": 27.5 },
                            { "name": "Over", "description": "Jayson Tatum", "price": -110, "point": 28.5 },
                            { "name": "Over", "description": "Josh Hart", "price": 0, "point": 10.5 },
                            { "name": "Under", "description": "Josh Hart", "price": -110, "point": 10.5 },
                            { "name": "Under", "description": "Jaylen Brown", "price": 105, "point": 23.5 },
                            { "name": "Over", "description": "Jaylen Brown", "price": -125, "point": 23.5 }
                        ]
                    }
                ]
            },
            {
                "key": "fanduel",
                "title": "FanDuel",
                "markets": [
                    {
                        "key": "player_points",
                        "outcomes": [
                            { "name": "Over", "description": "Jalen Brunson", "price": -120, "point": 28.5 },
                            { "name": "Under", "description": "Jalen Brunson", "price": 100, "point": 28.5 }
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_player_points() {
        let event: OddsApiEventOdds = serde_json::from_str(EVENT_ODDS).unwrap();
        let lines = parse_player_points(event);

        // Tatum has no under, Hart has an impossible over price
        let names: Vec<&str> = lines.iter().map(|l| l.player_name.as_str()).collect();
        assert_eq!(names, vec!["Jalen Brunson", "Jaylen Brown"]);

        let brunson = &lines[0];
        assert_eq!(brunson.line_points, 27.5);
        assert_eq!(brunson.over_odds, Odds::American(-115));
        assert_eq!(brunson.under_odds, Odds::American(-105));
        assert_eq!(brunson.opponent, "New York Knicks @ Boston Celtics");
        assert_eq!(brunson.game_id, "evt-1");
        assert!(brunson.is_home);
        assert!((brunson.over_implied_prob - 115.0 / 215.0).abs() < 1e-12);

        assert_eq!(lines[1].under_odds, Odds::American(105));
    }

    #[test]
    fn test_parse_without_bookmakers() {
        let event: OddsApiEventOdds = serde_json::from_str(
            r#"{ "id": "evt-2", "commence_time": "2025-01-20T00:30:00Z",
                 "home_team": "Utah Jazz", "away_team": "Minnesota Timberwolves" }"#,
        )
        .unwrap();
        assert!(parse_player_points(event).is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_player_points_lines() {
        dotenv::dotenv().ok();
        let api_key = std::env::var("ODDS_API_KEY").expect("ODDS_API_KEY not set");
        let client = OddsApiClient::new(api_key);

        let lines = client.fetch_player_points_lines().await.unwrap();
        for line in lines {
            assert!(line.line_points > 0.0);
        }
    }
}
