use std::collections::HashMap;

use crate::models::{GameScore, LineGameRow, NormalizedPlayerLine, PartnerIdentity, PersonRow, RawPlayerLineRow};
use crate::utils::{coerce_number, format_full_name, format_match_label, parse_date_time};

/// Reorient the raw games of one line to the player's side, dropping any
/// game whose scores are not both finite numbers.
pub fn normalize_games<'a, I>(games: I, is_home: bool) -> Vec<GameScore>
where
    I: IntoIterator<Item = &'a LineGameRow>,
{
    games
        .into_iter()
        .filter_map(|game| {
            let home = coerce_number(&game.home_score)?;
            let away = coerce_number(&game.away_score)?;
            Some(if is_home {
                GameScore { for_score: home, against_score: away }
            } else {
                GameScore { for_score: away, against_score: home }
            })
        })
        .collect()
}

fn occupies(slot: Option<&PersonRow>, player_id: &str) -> bool {
    slot.is_some_and(|person| person.id == player_id)
}

fn map_line_row(row: &RawPlayerLineRow, index: usize, player_id: &str) -> Option<NormalizedPlayerLine> {
    let Some(match_info) = row.match_info.first() else {
        tracing::debug!("Skipping line {} without a match", row.id);
        return None;
    };

    let home1 = row.home_player1.first();
    let home2 = row.home_player2.first();
    let away1 = row.away_player1.first();
    let away2 = row.away_player2.first();

    let is_home = occupies(home1, player_id) || occupies(home2, player_id);
    let is_away = occupies(away1, player_id) || occupies(away2, player_id);
    if !is_home && !is_away {
        return None;
    }

    let (player_team_id, opponent_team_id) = if is_home {
        (&match_info.home_team_id, &match_info.away_team_id)
    } else {
        (&match_info.away_team_id, &match_info.home_team_id)
    };

    let partner = match (is_home, occupies(home1, player_id), occupies(away1, player_id)) {
        (true, true, _) => home2,
        (true, false, _) => home1,
        (false, _, true) => away2,
        (false, _, false) => away1,
    };
    let partner = partner
        .filter(|person| !person.id.trim().is_empty())
        .map(|person| PartnerIdentity {
            id: person.id.clone(),
            full_name: format_full_name(person.first_name.as_deref(), person.last_name.as_deref()),
        });

    let match_date = parse_date_time(match_info.match_date.as_deref(), match_info.match_time.as_deref());

    Some(NormalizedPlayerLine {
        id: row.id.clone(),
        match_id: row.match_id.clone(),
        match_date,
        match_label: format_match_label(match_date),
        match_location: match_info.location.clone(),
        player_team_id: player_team_id.clone(),
        opponent_team_id: opponent_team_id.clone(),
        line_number: row.line_number.unwrap_or(index as i64 + 1),
        is_home,
        line_win: row
            .winner_team_id
            .as_ref()
            .map(|winner| winner == player_team_id),
        games: normalize_games(row.line_game.all(), is_home),
        partner,
    })
}

/// Keep one line per match. A dated line replaces an undated one; otherwise
/// the lower line number wins. First-seen order is preserved.
fn dedupe_lines_by_match(lines: Vec<NormalizedPlayerLine>) -> Vec<NormalizedPlayerLine> {
    let mut kept: Vec<NormalizedPlayerLine> = Vec::with_capacity(lines.len());
    let mut by_match: HashMap<String, usize> = HashMap::new();

    for line in lines {
        match by_match.get(&line.match_id) {
            None => {
                by_match.insert(line.match_id.clone(), kept.len());
                kept.push(line);
            }
            Some(&slot) => {
                let existing = &kept[slot];
                if existing.match_date.is_none() && line.match_date.is_some() {
                    kept[slot] = line;
                } else if line.line_number < existing.line_number {
                    kept[slot] = line;
                }
            }
        }
    }

    kept
}

/// Turn the raw line rows of one player into at most one line per match,
/// oldest first. Rows without a match, or without the player in any slot,
/// are skipped.
pub fn normalize_player_lines(rows: &[RawPlayerLineRow], player_id: &str) -> Vec<NormalizedPlayerLine> {
    let normalized: Vec<NormalizedPlayerLine> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| map_line_row(row, index, player_id))
        .collect();

    let mut lines = dedupe_lines_by_match(normalized);
    lines.sort_by_key(NormalizedPlayerLine::sort_millis);
    lines
}
