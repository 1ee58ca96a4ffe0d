use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use serde_json::Value;

use crate::config::{AppConfig, Backend};
use crate::db::{init_database, seed_data, SqliteStore};
use crate::models::{MatchResult, TeamRow};
use crate::services::league::League;
use crate::store::Record;
use crate::utils::{format_table_cell_value, format_table_column_label};

pub async fn init_db(config: &AppConfig) -> Result<()> {
    if config.backend == Backend::Supabase {
        println!("ℹ️  LEAGUE_BACKEND is supabase; initializing the local database anyway.");
    }
    init_database(&config.database_url).await?;
    println!("✅ Database ready at {}", config.database_url);
    Ok(())
}

pub async fn seed(config: &AppConfig) -> Result<()> {
    let store = SqliteStore::connect(&config.database_url).await?;

    println!("🌱 Seeding demo league into {}...", config.database_url);
    let summary = seed_data(&store).await?;

    println!("✅ Seeded {} players across {} teams", summary.people, summary.teams);
    println!("   Memberships: {}", summary.memberships);
    println!("   Matches: {} ({} lines)", summary.matches, summary.lines);
    println!("\n💡 Use 'league player' to see the demo player's stats");
    Ok(())
}

pub async fn show_player(league: &League, player_id: &str, today: NaiveDate) -> Result<()> {
    println!("🔍 Loading player {}...", player_id);
    let view = league.player_profile(player_id, today).await?;
    let profile = &view.profile;

    println!("\n🏓 {} ({})", profile.name, profile.handle);
    println!("   {} | {}", profile.team, profile.location);
    println!("   {}", profile.joined);
    if let Some(bio) = &profile.bio {
        println!("   \"{}\"", bio);
    }

    if !view.has_matches {
        println!("\n📭 No recorded matches yet.");
        return Ok(());
    }

    println!("\n📊 Quick stats:");
    for stat in view.quick_stats.iter().chain(&view.social_stats) {
        println!("   {}: {}", stat.label, stat.value);
    }

    println!("\n🎯 Highlights:");
    for highlight in &view.stat_highlights {
        let arrow = match highlight.trend {
            crate::services::player_profile::Direction::Up => "▲",
            crate::services::player_profile::Direction::Down => "▼",
        };
        println!("   {} {}: {} ({})", arrow, highlight.label, highlight.value, highlight.change);
    }

    if let Some(partner) = &view.partner {
        println!(
            "\n🤝 Top partner: {} ({} matches, {}-{}, {}%)",
            partner.name, partner.matches, partner.wins, partner.losses, partner.win_pct
        );
    }

    if !view.trend.is_empty() {
        println!("\n📈 Point differential trend:");
        for point in &view.trend {
            println!("   {:>8}  {:+}", point.label, point.value);
        }
    }

    println!("\n🏟️  Team history:");
    for item in &view.team_history {
        let marker = if item.is_current { "•" } else { "◦" };
        println!("   {} {} ({}) {} [{}]", marker, item.team_name, item.location, item.range_label, item.duration_label);
    }

    Ok(())
}

pub async fn show_standings(league: &League) -> Result<()> {
    let standings = league.standings().await?;

    if standings.is_empty() {
        println!("📭 No standings yet. Try seeding first with: league seed");
        return Ok(());
    }

    println!("🏆 Standings:\n");
    println!("   {:<3} {:<26} {:>4} {:>4} {:>6} {:>6}", "#", "Team", "W", "L", "Win%", "Pts");
    let number = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{}", v));
    for (index, row) in standings.iter().enumerate() {
        println!(
            "   {:<3} {:<26} {:>4} {:>4} {:>6} {:>6}",
            index + 1,
            row.team_name,
            number(row.matches_won),
            number(row.matches_lost),
            number(row.win_percentage),
            number(row.total_points)
        );
    }
    Ok(())
}

/// Team names close to `query`, best first.
pub fn suggest_team_names(query: &str, teams: &[TeamRow]) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    let mut scored: Vec<(f64, &str)> = teams
        .iter()
        .map(|team| {
            let name = team.name.to_lowercase();
            let whole = strsim::jaro_winkler(&needle, &name);
            let best_word = name
                .split_whitespace()
                .map(|word| strsim::jaro_winkler(&needle, word))
                .fold(0.0, f64::max);
            (whole.max(best_word), team.name.as_str())
        })
        .filter(|(score, _)| *score >= 0.75)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(3).map(|(_, name)| name.to_string()).collect()
}

pub async fn query_team(league: &League, team_name: &str) -> Result<()> {
    println!("🔍 Searching for team: {}", team_name);

    let teams = league.search_teams(team_name).await?;

    if teams.is_empty() {
        println!("❌ No teams found matching '{}'", team_name);

        let all_teams = league.teams().await?;
        let suggestions = suggest_team_names(team_name, &all_teams);
        if suggestions.is_empty() {
            println!("\n💡 Available teams:");
            for team in all_teams.iter().take(10) {
                println!("   • {}", team.name);
            }
        } else {
            println!("\n💡 Did you mean:");
            for name in suggestions {
                println!("   • {}", name);
            }
        }
        return Ok(());
    }

    if teams.len() > 1 {
        println!("📋 Found {} teams matching '{}':\n", teams.len(), team_name);
        for (i, team) in teams.iter().enumerate() {
            println!("{}. {}", i + 1, team.name);
        }
        println!("\n🔍 Showing details for first match:");
    }

    let team = &teams[0];
    println!("📊 Team Details:");
    println!("   Name: {}", team.name);
    println!("   Home courts: {}", team.location.as_deref().unwrap_or("Location unknown"));

    println!("\n👥 Roster:");
    let roster = league.team_roster(&team.id).await?;
    if roster.is_empty() {
        println!("   No players listed");
    }
    for entry in &roster {
        let person = &entry.person;
        println!(
            "   • {} {}{}",
            person.first_name.as_deref().unwrap_or_default(),
            person.last_name.as_deref().unwrap_or_default(),
            entry.role.as_deref().map(|r| format!(" ({})", r)).unwrap_or_default()
        );
    }

    println!("\n📅 Matches:");
    let history = league.match_history(&team.id).await?;
    if history.is_empty() {
        println!("   No matches found");
    }
    for entry in history.iter().take(10) {
        let venue = if entry.is_home_match { "vs" } else { "at" };
        let result = match entry.result {
            MatchResult::Win => "W",
            MatchResult::Loss => "L",
            MatchResult::Tie if entry.lines.is_empty() => "-",
            MatchResult::Tie => "T",
        };
        let score = if entry.lines.is_empty() {
            "(TBD)".to_string()
        } else {
            format!("({}-{} lines)", entry.team_score, entry.opponent_score)
        };
        println!("   {} {} {} {} {}", entry.match_date_label, venue, entry.opponent_name, score, result);
    }

    Ok(())
}

/// Union of the rows' columns in first-seen order.
fn table_columns(rows: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write rows as CSV with raw column names as the header.
pub fn write_table_csv<W: Write>(writer: W, rows: &[Record]) -> Result<usize> {
    let columns = table_columns(rows);
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&columns)?;
    for row in rows {
        csv.write_record(columns.iter().map(|c| csv_cell(row.get(c))))?;
    }
    csv.flush()?;
    Ok(rows.len())
}

pub async fn browse_table(league: &League, table: &str, limit: Option<usize>, csv_path: Option<&Path>) -> Result<()> {
    let rows = league.browse_table(table, limit).await?;

    if let Some(path) = csv_path {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let written = write_table_csv(std::fs::File::create(path)?, &rows)?;
        println!("✅ Wrote {} rows from {} to {}", written, table, path.display());
        return Ok(());
    }

    if rows.is_empty() {
        println!("📭 {} has no rows", table);
        return Ok(());
    }

    let columns = table_columns(&rows);
    println!("🗂️  {} ({} rows)\n", table, rows.len());
    println!(
        "   {}",
        columns.iter().map(|c| format_table_column_label(c)).collect::<Vec<_>>().join(" | ")
    );
    for row in &rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| row.get(c).map_or_else(|| "-".to_string(), format_table_cell_value))
            .collect();
        println!("   {}", cells.join(" | "));
    }
    Ok(())
}

pub async fn autofill(league: &League, lines: Option<usize>, submit: bool, today: NaiveDate) -> Result<()> {
    println!("🎲 Autofilling a match...");
    let filled = league.autofill_match(lines, today).await?;
    let form = &filled.form;

    let name = |id: &str| {
        filled
            .home_players
            .iter()
            .chain(&filled.away_players)
            .find(|p| p.id == id)
            .map_or_else(|| id.to_string(), |p| p.full_name.clone())
    };

    println!("✅ {}", filled.message);
    println!("   {} {} at {}", form.match_date, form.match_time, form.location);
    for line in &form.lines {
        let games: Vec<String> = line.games.iter().map(|g| format!("{}-{}", g.home, g.away)).collect();
        println!(
            "   Line {}: {} / {} vs {} / {}  [{}]",
            line.line_number,
            name(&line.team_h.player1_id),
            name(&line.team_h.player2_id),
            name(&line.team_a.player1_id),
            name(&line.team_a.player2_id),
            games.join(", ")
        );
    }

    if !submit {
        println!("\n💡 Re-run with --submit to save a generated match");
        return Ok(());
    }

    let saved = league.submit_match(form).await?;
    let winner = match saved.winner_team_id.as_deref() {
        Some(id) if id == filled.home_team.id => filled.home_team.name.as_str(),
        Some(_) => filled.away_team.name.as_str(),
        None => "nobody (tied)",
    };
    println!("\n💾 Saved match {} ({} lines, {} games), won by {}", saved.match_id, saved.line_ids.len(), saved.games_saved, winner);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn team(name: &str) -> TeamRow {
        TeamRow { id: name.to_lowercase(), name: name.into(), location: None }
    }

    #[test]
    fn test_suggestions_rank_close_names() {
        let teams = vec![team("Rainier Smash"), team("Bay City Dinks"), team("Harbor Ridge Waves")];
        let suggestions = suggest_team_names("Ranier", &teams);
        assert_eq!(suggestions.first().map(String::as_str), Some("Rainier Smash"));
        assert!(suggest_team_names("zzzz", &teams).is_empty());
    }

    #[test]
    fn test_csv_uses_union_of_columns() {
        let rows: Vec<Record> = vec![
            json!({"id": "t-1", "name": "Rainier Smash"}).as_object().cloned().unwrap(),
            json!({"id": "t-2", "name": "Bay, City", "location": null, "rank": 2}).as_object().cloned().unwrap(),
        ];
        let mut out = Vec::new();
        assert_eq!(write_table_csv(&mut out, &rows).unwrap(), 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,name,location,rank");
        assert_eq!(lines[1], "t-1,Rainier Smash,,");
        assert_eq!(lines[2], "t-2,\"Bay, City\",,2");
    }
}
