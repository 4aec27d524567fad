use crate::analysis::{TeamDefenses, ValueBet};
use crate::models::{InjuryReport, PlayerLine, PlayerStats, TeamDefense};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Save any serializable value to a pretty-printed JSON file
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create output directory")?;
        }
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize data")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Load any deserializable value from a JSON file
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load posted player lines; implied probabilities are derived on load
pub fn load_player_lines(path: impl AsRef<Path>) -> Result<Vec<PlayerLine>> {
    load_json(path).context("Failed to load player lines")
}

/// Load player stats (a JSON array) keyed by player name. Every record is
/// validated here so the core only sees well-formed game windows.
pub fn load_player_stats(path: impl AsRef<Path>) -> Result<HashMap<String, PlayerStats>> {
    let records: Vec<PlayerStats> = load_json(path).context("Failed to load player stats")?;
    index_player_stats(records)
}

pub fn index_player_stats(records: Vec<PlayerStats>) -> Result<HashMap<String, PlayerStats>> {
    let mut stats = HashMap::with_capacity(records.len());
    for record in records {
        record
            .validate()
            .with_context(|| format!("Invalid stats for {}", record.player_name))?;
        stats.insert(record.player_name.clone(), record);
    }
    Ok(stats)
}

/// Load team defensive profiles (a JSON array) keyed by abbreviation
pub fn load_team_defenses(path: impl AsRef<Path>) -> Result<TeamDefenses> {
    let records: Vec<TeamDefense> = load_json(path).context("Failed to load team defenses")?;
    Ok(records
        .into_iter()
        .map(|defense| (defense.team_abbr.clone(), defense))
        .collect())
}

/// Load an injury report (a JSON object of player name -> status)
pub fn load_injury_report(path: impl AsRef<Path>) -> Result<InjuryReport> {
    load_json(path).context("Failed to load injury report")
}

/// Save value bets to CSV
pub fn save_value_bets_to_csv(bets: &[ValueBet], path: impl AsRef<Path>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref()).context("Failed to create CSV file")?;

    writer.write_record([
        "Rank",
        "Player",
        "Team",
        "Opponent",
        "Game Time",
        "Line",
        "Bet",
        "Odds",
        "Model Probability (%)",
        "Implied Probability (%)",
        "Edge (%)",
        "Expected Value (%)",
        "Stability",
        "Risk",
        "Confidence (%)",
    ])?;

    for bet in bets {
        writer.write_record([
            bet.rank.to_string(),
            bet.player_name.clone(),
            bet.team.clone(),
            bet.opponent.clone(),
            bet.game_time.format("%Y-%m-%d %H:%M").to_string(),
            format!("{:.1}", bet.line),
            bet.bet_side.to_string(),
            bet.odds.to_string(),
            format!("{:.1}", bet.model_prob * 100.0),
            format!("{:.1}", bet.implied_prob * 100.0),
            format!("{:.2}", bet.edge_percent),
            format!("{:.2}", bet.expected_value * 100.0),
            format!("{:.1}", bet.stability_score),
            bet.risk_level.to_string(),
            format!("{:.0}", bet.confidence * 100.0),
        ])?;
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}
