//! Built-in player pool for the `demo` mode and tests. Every value is fixed so
//! repeated runs produce the same report.

use crate::analysis::TeamDefenses;
use crate::models::{GameLog, InjuryReport, Odds, PlayerLine, PlayerStats, TeamDefense};
use crate::utils::odds::american_odds_to_probability;
use crate::AnalysisInputs;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;

struct DemoPlayer {
    name: &'static str,
    team: &'static str,
    opponent: &'static str,
    is_home: bool,
    line: f64,
    over: i32,
    under: i32,
    games_played: u32,
    /// Newest first
    points: [f64; 10],
    minutes: [f64; 10],
}

const DEMO_PLAYERS: [DemoPlayer; 5] = [
    DemoPlayer {
        name: "Jalen Brunson",
        team: "NYK",
        opponent: "BOS",
        is_home: false,
        line: 28.5,
        over: -110,
        under: -110,
        games_played: 41,
        points: [31.0, 29.0, 33.0, 28.0, 30.0, 32.0, 27.0, 30.0, 31.0, 29.0],
        minutes: [36.0, 35.0, 37.0, 36.0, 34.0, 36.0, 37.0, 35.0, 36.0, 36.0],
    },
    DemoPlayer {
        name: "Anthony Edwards",
        team: "MIN",
        opponent: "UTA",
        is_home: true,
        line: 27.5,
        over: -105,
        under: -115,
        games_played: 43,
        points: [35.0, 18.0, 30.0, 22.0, 38.0, 20.0, 27.0, 33.0, 17.0, 30.0],
        minutes: [38.0, 36.0, 37.0, 35.0, 38.0, 36.0, 37.0, 36.0, 35.0, 37.0],
    },
    DemoPlayer {
        name: "Domantas Sabonis",
        team: "SAC",
        opponent: "LAL",
        is_home: true,
        line: 19.5,
        over: -105,
        under: -115,
        games_played: 42,
        points: [16.0, 17.0, 15.0, 18.0, 16.0, 17.0, 19.0, 15.0, 16.0, 17.0],
        minutes: [34.0; 10],
    },
    DemoPlayer {
        name: "Payton Pritchard",
        team: "BOS",
        opponent: "NYK",
        is_home: true,
        line: 9.5,
        over: -115,
        under: -105,
        games_played: 40,
        points: [12.0, 8.0, 10.0, 14.0, 6.0, 9.0, 11.0, 7.0, 13.0, 10.0],
        minutes: [22.0, 20.0, 24.0, 19.0, 21.0, 23.0, 18.0, 22.0, 25.0, 20.0],
    },
    DemoPlayer {
        name: "Tyrese Haliburton",
        team: "IND",
        opponent: "CHA",
        is_home: false,
        line: 19.5,
        over: -110,
        under: -110,
        games_played: 38,
        points: [21.0, 18.0, 24.0, 17.0, 20.0, 22.0, 19.0, 16.0, 23.0, 20.0],
        minutes: [34.0, 33.0, 35.0, 34.0, 32.0, 34.0, 35.0, 33.0, 34.0, 36.0],
    },
];

fn tip_off() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 20, 0, 30, 0)
        .single()
        .unwrap_or_default()
}

fn demo_line(player: &DemoPlayer, index: usize) -> PlayerLine {
    PlayerLine {
        player_name: player.name.to_string(),
        player_id: None,
        team: player.team.to_string(),
        opponent: player.opponent.to_string(),
        game_id: format!("demo-{}", index + 1),
        game_time: tip_off(),
        is_home: player.is_home,
        line_points: player.line,
        over_odds: Odds::American(player.over),
        under_odds: Odds::American(player.under),
        over_implied_prob: american_odds_to_probability(player.over),
        under_implied_prob: american_odds_to_probability(player.under),
    }
}

fn demo_stats(player: &DemoPlayer) -> PlayerStats {
    let newest = NaiveDate::from_ymd_opt(2025, 1, 18).unwrap_or_default();
    let games = player
        .points
        .iter()
        .zip(player.minutes.iter())
        .enumerate()
        .map(|(i, (&points, &minutes))| {
            // one game every other day
            let mut game = GameLog::new(newest - Days::new(2 * i as u64), points, minutes);
            game.matchup = format!("{} vs. {}", player.team, player.opponent);
            game
        })
        .collect();

    let mut stats = PlayerStats::from_game_log(player.name, player.team, games);
    stats.games_played = player.games_played;
    stats
}

/// Lines and stats for the demo pool, in a fixed order
pub fn demo_pool() -> (Vec<PlayerLine>, HashMap<String, PlayerStats>) {
    let lines = DEMO_PLAYERS
        .iter()
        .enumerate()
        .map(|(i, player)| demo_line(player, i))
        .collect();
    let stats = DEMO_PLAYERS
        .iter()
        .map(|player| (player.name.to_string(), demo_stats(player)))
        .collect();
    (lines, stats)
}

pub fn demo_team_defenses() -> TeamDefenses {
    [
        ("Boston Celtics", "BOS", 107.0, 108.9, 98.0),
        ("Charlotte Hornets", "CHA", 117.8, 115.1, 99.1),
        ("Los Angeles Lakers", "LAL", 114.0, 113.2, 100.5),
        ("New York Knicks", "NYK", 111.0, 109.7, 97.5),
        ("Utah Jazz", "UTA", 119.5, 120.4, 101.2),
    ]
    .into_iter()
    .map(|(name, abbr, def_rating, opp_pts_per_game, pace)| {
        (
            abbr.to_string(),
            TeamDefense {
                team_name: name.to_string(),
                team_abbr: abbr.to_string(),
                def_rating,
                opp_pts_per_game,
                pace,
            },
        )
    })
    .collect()
}

pub fn demo_injury_report() -> InjuryReport {
    HashMap::from([("Tyrese Haliburton".to_string(), "Questionable".to_string())])
}

/// Everything `run_analysis` needs for the demo
pub fn demo_inputs() -> AnalysisInputs {
    let (lines, stats) = demo_pool();
    AnalysisInputs {
        lines,
        stats,
        team_defenses: Some(demo_team_defenses()),
        injury_report: Some(demo_injury_report()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_stats_are_valid() {
        let (lines, stats) = demo_pool();
        assert_eq!(lines.len(), 5);
        for line in &lines {
            let player = &stats[&line.player_name];
            player.validate().unwrap();
            assert_eq!(player.last_10_games.len(), 10);
            assert_eq!(player.last_5_games.len(), 5);
        }
    }

    #[test]
    fn test_demo_lines_match_derived_prices() {
        let (lines, _) = demo_pool();
        for line in lines {
            let rebuilt = PlayerLine::new(
                line.player_name.clone(),
                line.team.clone(),
                line.opponent.clone(),
                line.game_id.clone(),
                line.game_time,
                line.is_home,
                line.line_points,
                line.over_odds,
                line.under_odds,
            )
            .unwrap();
            assert_eq!(rebuilt, line);
        }
    }
}
