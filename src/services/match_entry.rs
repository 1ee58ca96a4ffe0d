use std::collections::HashMap;

use anyhow::Context;
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::LeagueError;
use crate::models::{NewLineGame, NewMatch, NewMatchLine, PlayerOption, TeamRow};
use crate::store::LeagueStore;
use crate::utils::{coerce_str, format_full_name};

pub const DEFAULT_GAMES_PER_LINE: usize = 3;
pub const MIN_GAMES_PER_LINE: usize = 1;
pub const DEFAULT_LINES_PER_MATCH: usize = 3;
pub const MAX_LINES_PER_MATCH: usize = 8;
pub const AUTOFILL_MATCH_TIME: &str = "19:00";

// Scores arrive as text from forms and as numbers from JSON clients.
fn de_score<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(text) => Ok(text),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid score: {}", other))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameScoreInput {
    #[serde(deserialize_with = "de_score")]
    pub home: String,
    #[serde(deserialize_with = "de_score")]
    pub away: String,
}

impl GameScoreInput {
    pub fn new(home: impl ToString, away: impl ToString) -> Self {
        Self {
            home: home.to_string(),
            away: away.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairSlots {
    pub player1_id: String,
    pub player2_id: String,
}

/// One line of the entry form. `team_h` is the home pair, `team_a` the away pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineForm {
    pub id: String,
    pub line_number: i64,
    pub team_a: PairSlots,
    pub team_h: PairSlots,
    pub games: Vec<GameScoreInput>,
    pub winner_team_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchEntryForm {
    pub home_team_id: String,
    pub away_team_id: String,
    pub match_date: String,
    pub match_time: String,
    pub location: String,
    pub lines: Vec<LineForm>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedMatch {
    pub match_id: String,
    pub home_team_id: String,
    pub away_team_id: String,
    pub winner_team_id: Option<String>,
    pub line_ids: Vec<String>,
    pub games_saved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutofillResult {
    pub form: MatchEntryForm,
    pub home_team: TeamRow,
    pub away_team: TeamRow,
    pub home_players: Vec<PlayerOption>,
    pub away_players: Vec<PlayerOption>,
    pub message: String,
}

pub fn create_empty_line(position: i64) -> LineForm {
    LineForm {
        id: uuid::Uuid::new_v4().to_string(),
        line_number: position,
        team_a: PairSlots::default(),
        team_h: PairSlots::default(),
        games: vec![GameScoreInput::default(); DEFAULT_GAMES_PER_LINE],
        winner_team_id: None,
    }
}

pub fn renumber_lines(lines: &mut [LineForm]) {
    for (index, line) in lines.iter_mut().enumerate() {
        line.line_number = index as i64 + 1;
    }
}

fn parse_score(text: &str) -> Option<f64> {
    coerce_str(Some(text))?
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn is_whole_score(text: &str) -> bool {
    parse_score(text).is_some_and(|value| value >= 0.0 && value.fract() == 0.0)
}

/// Team that won more games, or `None` when a score is missing or the
/// games are split evenly. Tied games count for neither side.
pub fn determine_winner(line: &LineForm, home_team_id: &str, away_team_id: &str) -> Option<String> {
    let home_team_id = coerce_str(Some(home_team_id))?;
    let away_team_id = coerce_str(Some(away_team_id))?;

    let mut home_games = 0;
    let mut away_games = 0;
    for game in &line.games {
        let home = parse_score(&game.home)?;
        let away = parse_score(&game.away)?;
        if home > away {
            home_games += 1;
        } else if away > home {
            away_games += 1;
        }
    }

    if home_games == away_games {
        return None;
    }
    let winner = if home_games > away_games { home_team_id } else { away_team_id };
    Some(winner.to_string())
}

/// Winner from the scores, else the winner picked on the form when it names
/// one of the two teams.
pub fn resolve_line_winner(line: &LineForm, home_team_id: &str, away_team_id: &str) -> Option<String> {
    determine_winner(line, home_team_id, away_team_id).or_else(|| {
        line.winner_team_id
            .as_deref()
            .filter(|id| !id.is_empty() && (*id == home_team_id || *id == away_team_id))
            .map(str::to_string)
    })
}

/// Majority of line winners; `None` when both teams won the same number.
pub fn derive_match_winner(lines: &[LineForm], home_team_id: &str, away_team_id: &str) -> Option<String> {
    let (mut home_lines, mut away_lines) = (0, 0);
    for line in lines {
        match line.winner_team_id.as_deref() {
            Some(id) if id == home_team_id => home_lines += 1,
            Some(id) if id == away_team_id => away_lines += 1,
            _ => {}
        }
    }

    if home_lines == away_lines {
        return None;
    }
    let winner = if home_lines > away_lines { home_team_id } else { away_team_id };
    Some(winner.to_string())
}

fn validate_pair(errors: &mut Vec<String>, line_label: &str, side: &str, pair: &PairSlots) {
    let first = pair.player1_id.trim();
    let second = pair.player2_id.trim();
    if first.is_empty() || second.is_empty() {
        errors.push(format!("{}: select two {} players.", line_label, side));
    } else if first == second {
        errors.push(format!("{}: {} players must be different.", line_label, side));
    }
}

/// Every problem with the form, in field order. Empty when it can be saved.
pub fn validate_match_entry(form: &MatchEntryForm) -> Vec<String> {
    let mut errors = Vec::new();
    let home = form.home_team_id.trim();
    let away = form.away_team_id.trim();

    if home.is_empty() {
        errors.push("Select a home team.".to_string());
    }
    if away.is_empty() {
        errors.push("Select an away team.".to_string());
    }
    if !home.is_empty() && home == away {
        errors.push("Home and away teams must be different.".to_string());
    }

    let date = form.match_date.trim();
    if date.is_empty() {
        errors.push("Enter a match date.".to_string());
    } else if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        errors.push("Match date must be in YYYY-MM-DD format.".to_string());
    }
    if form.match_time.trim().is_empty() {
        errors.push("Enter a match time.".to_string());
    }
    if form.location.trim().is_empty() {
        errors.push("Enter a match location.".to_string());
    }

    if form.lines.is_empty() {
        errors.push("Add at least one line.".to_string());
    }

    for (index, line) in form.lines.iter().enumerate() {
        let label = format!("Line {}", index + 1);
        validate_pair(&mut errors, &label, "home", &line.team_h);
        validate_pair(&mut errors, &label, "away", &line.team_a);

        if line.games.len() < MIN_GAMES_PER_LINE {
            errors.push(format!("{}: add at least one game.", label));
            continue;
        }

        let mut scores_ok = true;
        for (game_index, game) in line.games.iter().enumerate() {
            let game_label = format!("{}, game {}", label, game_index + 1);
            if game.home.trim().is_empty() || game.away.trim().is_empty() {
                errors.push(format!("{}: enter both scores.", game_label));
                scores_ok = false;
            } else if !is_whole_score(&game.home) || !is_whole_score(&game.away) {
                errors.push(format!("{}: scores must be whole numbers.", game_label));
                scores_ok = false;
            }
        }

        if scores_ok && !home.is_empty() && !away.is_empty() && resolve_line_winner(line, home, away).is_none() {
            errors.push(format!("{}: games are split evenly, pick a winner.", label));
        }
    }

    errors
}

fn partial_write(match_id: &str, message: String) -> anyhow::Error {
    tracing::error!(
        "Match {} was recorded but its lines/games were not: {}",
        match_id,
        message
    );
    LeagueError::PartialWrite {
        match_id: match_id.to_string(),
        message,
    }
    .into()
}

/// Validate and write a match, its lines and their games, in that order.
///
/// A failure after the match row exists is reported as
/// [`LeagueError::PartialWrite`] carrying the orphaned match id; the match
/// row is not removed.
pub async fn save_match(store: &dyn LeagueStore, form: &MatchEntryForm) -> anyhow::Result<SavedMatch> {
    let errors = validate_match_entry(form);
    if !errors.is_empty() {
        return Err(LeagueError::Validation(errors).into());
    }

    let home = form.home_team_id.trim();
    let away = form.away_team_id.trim();

    let mut lines = form.lines.clone();
    renumber_lines(&mut lines);
    for line in &mut lines {
        line.winner_team_id = resolve_line_winner(line, home, away);
    }
    let winner_team_id = derive_match_winner(&lines, home, away);

    let match_id = store
        .insert_match(&NewMatch {
            home_team_id: home.to_string(),
            away_team_id: away.to_string(),
            match_date: form.match_date.trim().to_string(),
            match_time: form.match_time.trim().to_string(),
            location: form.location.trim().to_string(),
            winner_team_id: winner_team_id.clone(),
        })
        .await
        .context("Unable to save match.")?;
    tracing::info!("Saved match {} ({} vs {})", match_id, home, away);

    let line_payload: Vec<NewMatchLine> = lines
        .iter()
        .map(|line| NewMatchLine {
            match_id: match_id.clone(),
            line_number: line.line_number,
            home_player1: line.team_h.player1_id.trim().to_string(),
            home_player2: line.team_h.player2_id.trim().to_string(),
            away_player1: line.team_a.player1_id.trim().to_string(),
            away_player2: line.team_a.player2_id.trim().to_string(),
            winner_team_id: line.winner_team_id.clone(),
        })
        .collect();

    let inserted = store
        .insert_lines(&line_payload)
        .await
        .map_err(|err| partial_write(&match_id, format!("{:#}", err)))?;
    if inserted.is_empty() {
        return Err(partial_write(&match_id, "Unable to create line rows.".to_string()));
    }

    let line_ids: HashMap<i64, String> = inserted
        .into_iter()
        .map(|row| (row.line_number, row.id))
        .collect();

    let mut ordered_ids = Vec::with_capacity(lines.len());
    let mut games = Vec::new();
    for line in &lines {
        let Some(line_id) = line_ids.get(&line.line_number) else {
            return Err(partial_write(&match_id, "Line mapping mismatch. Please retry.".to_string()));
        };
        ordered_ids.push(line_id.clone());
        for (game_index, game) in line.games.iter().enumerate() {
            games.push(NewLineGame {
                line_id: line_id.clone(),
                game_number: game_index as i64 + 1,
                home_score: parse_score(&game.home).unwrap_or_default() as i64,
                away_score: parse_score(&game.away).unwrap_or_default() as i64,
            });
        }
    }

    store
        .insert_games(&games)
        .await
        .map_err(|err| partial_write(&match_id, format!("{:#}", err)))?;

    Ok(SavedMatch {
        match_id,
        home_team_id: home.to_string(),
        away_team_id: away.to_string(),
        winner_team_id,
        line_ids: ordered_ids,
        games_saved: games.len(),
    })
}

/// Players on a team's roster as pick-list options, ordered by person id.
pub async fn players_for_team(store: &dyn LeagueStore, team_id: &str) -> anyhow::Result<Vec<PlayerOption>> {
    let rows = store
        .team_roster(team_id)
        .await
        .context("Unable to load players for the selected team.")?;

    let mut players: Vec<PlayerOption> = rows
        .into_iter()
        .filter_map(|row| row.person.into_first())
        .map(|person| PlayerOption {
            full_name: format_full_name(person.first_name.as_deref(), person.last_name.as_deref()),
            id: person.id,
        })
        .collect();
    players.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(players)
}

fn pick_players_for_line<R: Rng + ?Sized>(
    roster: &[PlayerOption],
    usage: &mut HashMap<String, u32>,
    rng: &mut R,
) -> (String, String) {
    match roster {
        [] => (String::new(), String::new()),
        [only] => {
            *usage.entry(only.id.clone()).or_default() += 1;
            (only.id.clone(), only.id.clone())
        }
        _ => {
            let mut prioritized: Vec<&PlayerOption> = roster.iter().collect();
            prioritized.shuffle(rng);
            prioritized.sort_by_key(|player| usage.get(&player.id).copied().unwrap_or(0));

            let first = prioritized[0];
            let mut pool: Vec<&PlayerOption> = prioritized[1..prioritized.len().min(3)].to_vec();
            pool.shuffle(rng);
            let second = pool
                .into_iter()
                .find(|player| player.id != first.id)
                .unwrap_or(prioritized[1]);

            *usage.entry(first.id.clone()).or_default() += 1;
            *usage.entry(second.id.clone()).or_default() += 1;
            (first.id.clone(), second.id.clone())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Home,
    Away,
}

const CLOSE_SCORES: [(u32, u32); 3] = [(11, 9), (12, 10), (11, 8)];
const ROUTINE_SCORES: [(u32, u32); 3] = [(11, 6), (11, 5), (11, 4)];
const BLOWOUT_SCORES: [(u32, u32); 3] = [(11, 0), (11, 2), (11, 3)];

fn pick_game_score<R: Rng + ?Sized>(competitiveness: f64, rng: &mut R) -> (u32, u32) {
    let clamped = competitiveness.clamp(0.0, 1.0);
    let close_chance = 0.35 + clamped * 0.4;
    let routine_chance = 0.45 - clamped * 0.25;
    let roll: f64 = rng.gen();

    let options = if roll < close_chance {
        &CLOSE_SCORES
    } else if roll < close_chance + routine_chance {
        &ROUTINE_SCORES
    } else {
        &BLOWOUT_SCORES
    };
    options[rng.gen_range(0..options.len())]
}

fn generate_game_scores<R: Rng + ?Sized>(
    games: usize,
    winner: Side,
    competitiveness: f64,
    rng: &mut R,
) -> Vec<GameScoreInput> {
    let count = games.max(MIN_GAMES_PER_LINE);
    let wins_needed = count / 2 + 1;
    let max_losing = count.saturating_sub(wins_needed);
    let losing_target = ((competitiveness * max_losing as f64 + rng.gen::<f64>() * 0.6).round() as usize).min(max_losing);
    let loser = if winner == Side::Home { Side::Away } else { Side::Home };

    let mut game_winners = vec![winner; wins_needed];
    game_winners.extend(std::iter::repeat(loser).take(losing_target));
    game_winners.resize(count, winner);
    game_winners.shuffle(rng);

    game_winners
        .into_iter()
        .map(|side| {
            let (win, lose) = pick_game_score(competitiveness, rng);
            match side {
                Side::Home => GameScoreInput::new(win, lose),
                Side::Away => GameScoreInput::new(lose, win),
            }
        })
        .collect()
}

/// Random but plausible lines between two rosters. Every line's winner is
/// derived from its generated scores.
pub fn build_autofill_form<R: Rng + ?Sized>(
    home: (&TeamRow, &[PlayerOption]),
    away: (&TeamRow, &[PlayerOption]),
    line_count: usize,
    today: NaiveDate,
    rng: &mut R,
) -> MatchEntryForm {
    let (home_team, home_roster) = home;
    let (away_team, away_roster) = away;
    let mut home_usage = HashMap::new();
    let mut away_usage = HashMap::new();
    let home_edge = (0.55 + (rng.gen::<f64>() - 0.5) * 0.15).clamp(0.35, 0.75);

    let mut lines: Vec<LineForm> = (0..line_count.clamp(1, MAX_LINES_PER_MATCH))
        .map(|index| {
            let (away1, away2) = pick_players_for_line(away_roster, &mut away_usage, rng);
            let (home1, home2) = pick_players_for_line(home_roster, &mut home_usage, rng);

            let noise = (rng.gen::<f64>() - 0.5) * 0.12 - index as f64 * 0.015;
            let home_chance = (home_edge + noise).clamp(0.3, 0.8);
            let winner = if rng.gen::<f64>() < home_chance { Side::Home } else { Side::Away };
            let competitiveness =
                (0.45 + rng.gen::<f64>() * 0.35 - index as f64 * 0.02 + rng.gen::<f64>() * 0.05).clamp(0.25, 0.95);

            let mut line = create_empty_line(index as i64 + 1);
            line.team_a = PairSlots { player1_id: away1, player2_id: away2 };
            line.team_h = PairSlots { player1_id: home1, player2_id: home2 };
            line.games = generate_game_scores(DEFAULT_GAMES_PER_LINE, winner, competitiveness, rng);
            line.winner_team_id = determine_winner(&line, &home_team.id, &away_team.id).or_else(|| {
                Some(match winner {
                    Side::Home => home_team.id.clone(),
                    Side::Away => away_team.id.clone(),
                })
            });
            line
        })
        .collect();
    renumber_lines(&mut lines);

    let location = home_team
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} Courts", home_team.name));

    MatchEntryForm {
        home_team_id: home_team.id.clone(),
        away_team_id: away_team.id.clone(),
        match_date: today.format("%Y-%m-%d").to_string(),
        match_time: AUTOFILL_MATCH_TIME.to_string(),
        location,
        lines,
    }
}

/// Pick two random teams that can field a pair and fill a form for them.
pub async fn autofill_match<R: Rng + Send + ?Sized>(
    store: &dyn LeagueStore,
    line_count: usize,
    today: NaiveDate,
    rng: &mut R,
) -> anyhow::Result<AutofillResult> {
    if !(1..=MAX_LINES_PER_MATCH).contains(&line_count) {
        return Err(LeagueError::Validation(vec![format!(
            "Autofill needs between 1 and {} lines.",
            MAX_LINES_PER_MATCH
        )])
        .into());
    }
    let mut teams = store.list_teams().await.context("Unable to load teams.")?;
    if teams.is_empty() {
        anyhow::bail!("No teams available to autofill.");
    }
    teams.shuffle(rng);

    let mut eligible: Vec<(TeamRow, Vec<PlayerOption>)> = Vec::with_capacity(2);
    for team in teams {
        match players_for_team(store, &team.id).await {
            Ok(roster) if roster.len() >= 2 => eligible.push((team, roster)),
            Ok(_) => {}
            Err(err) => tracing::warn!("Skipping team {} for autofill: {:#}", team.id, err),
        }
        if eligible.len() == 2 {
            break;
        }
    }

    let (Some(second), Some(first)) = (eligible.pop(), eligible.pop()) else {
        anyhow::bail!("Autofill requires at least two teams with available players.");
    };
    let ((home_team, home_players), (away_team, away_players)) =
        if rng.gen_bool(0.5) { (first, second) } else { (second, first) };

    let form = build_autofill_form(
        (&home_team, &home_players),
        (&away_team, &away_players),
        line_count,
        today,
        rng,
    );
    let message = format!("Autofilled {} at {}.", away_team.name, home_team.name);
    tracing::info!("{}", message);

    Ok(AutofillResult {
        form,
        home_team,
        away_team,
        home_players,
        away_players,
        message,
    })
}
