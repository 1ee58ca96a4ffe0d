use crate::models::{
    MatchHistoryEntry, MatchLineDetail, MatchLineGame, MatchLinePlayer, MatchLineRow, MatchLineTotals, MatchResult,
    PersonRow, RawMatchHistoryRow, Relation,
};
use crate::utils::{coerce_number, format_full_name, parse_date_time};

fn line_players(slots: [&Relation<PersonRow>; 2]) -> Vec<MatchLinePlayer> {
    slots
        .into_iter()
        .filter_map(Relation::first)
        .map(|person| MatchLinePlayer {
            id: person.id.clone(),
            full_name: format_full_name(person.first_name.as_deref(), person.last_name.as_deref()),
        })
        .collect()
}

fn result_for(winner_team_id: Option<&str>, team_id: &str) -> MatchResult {
    match winner_team_id {
        Some(winner) if winner == team_id => MatchResult::Win,
        Some(_) => MatchResult::Loss,
        None => MatchResult::Tie,
    }
}

fn line_detail(line: &MatchLineRow, index: usize, team_id: &str) -> MatchLineDetail {
    let mut games: Vec<(Option<i64>, MatchLineGame)> = line
        .line_game
        .all()
        .into_iter()
        .map(|game| {
            (
                game.game_number,
                MatchLineGame {
                    id: game.id.clone(),
                    home_score: coerce_number(&game.home_score),
                    away_score: coerce_number(&game.away_score),
                },
            )
        })
        .collect();
    games.sort_by_key(|(number, _)| number.unwrap_or(i64::MAX));
    let games: Vec<MatchLineGame> = games.into_iter().map(|(_, game)| game).collect();

    let total = |score: fn(&MatchLineGame) -> Option<f64>| {
        let scores: Vec<f64> = games.iter().filter_map(score).collect();
        (!scores.is_empty()).then(|| scores.iter().sum::<f64>())
    };

    MatchLineDetail {
        id: line.id.clone(),
        line_number: line.line_number.unwrap_or(index as i64 + 1),
        winner_team_id: line.winner_team_id.clone(),
        result: result_for(line.winner_team_id.as_deref(), team_id),
        total_points: MatchLineTotals {
            home: total(|g| g.home_score),
            away: total(|g| g.away_score),
        },
        home_players: line_players([&line.home_player1, &line.home_player2]),
        away_players: line_players([&line.away_player1, &line.away_player2]),
        games,
    }
}

fn history_entry(row: &RawMatchHistoryRow, team_id: &str) -> MatchHistoryEntry {
    let is_home = row.home_team_id == team_id;
    let (opponent_id, opponent) = if is_home {
        (&row.away_team_id, row.away_team.first())
    } else {
        (&row.home_team_id, row.home_team.first())
    };

    let mut lines: Vec<MatchLineDetail> = row
        .match_line
        .all()
        .into_iter()
        .enumerate()
        .map(|(index, line)| line_detail(line, index, team_id))
        .collect();
    lines.sort_by_key(|line| line.line_number);

    let team_score = lines.iter().filter(|l| l.result == MatchResult::Win).count() as u32;
    let opponent_score = lines
        .iter()
        .filter(|l| l.winner_team_id.as_deref() == Some(opponent_id.as_str()))
        .count() as u32;

    let (mut games_won, mut games_lost) = (0, 0);
    for game in lines.iter().flat_map(|l| &l.games) {
        let (Some(home), Some(away)) = (game.home_score, game.away_score) else {
            continue;
        };
        let (ours, theirs) = if is_home { (home, away) } else { (away, home) };
        if ours > theirs {
            games_won += 1;
        } else if theirs > ours {
            games_lost += 1;
        }
    }

    let result = match row.winner_team_id.as_deref() {
        Some(winner) => result_for(Some(winner), team_id),
        None if team_score > opponent_score => MatchResult::Win,
        None if team_score < opponent_score => MatchResult::Loss,
        None => MatchResult::Tie,
    };

    let match_date = parse_date_time(row.match_date.as_deref(), row.match_time.as_deref());

    MatchHistoryEntry {
        id: row.id.clone(),
        team_id: team_id.to_string(),
        match_date,
        match_date_label: match_date
            .map(|d| d.format("%b %-d, %Y").to_string())
            .unwrap_or_else(|| "Date TBD".to_string()),
        match_time: row.match_time.clone(),
        location: row.location.clone(),
        opponent_name: opponent
            .map(|team| team.name.clone())
            .unwrap_or_else(|| "Unknown opponent".to_string()),
        opponent_id: opponent_id.clone(),
        is_home_match: is_home,
        team_score,
        opponent_score,
        result,
        points_earned: team_score,
        games_won,
        games_lost,
        lines,
    }
}

/// One entry per match the team played, newest first; undated matches last.
pub fn normalize_match_history(rows: &[RawMatchHistoryRow], team_id: &str) -> Vec<MatchHistoryEntry> {
    let mut entries: Vec<MatchHistoryEntry> = rows
        .iter()
        .filter(|row| row.home_team_id == team_id || row.away_team_id == team_id)
        .map(|row| history_entry(row, team_id))
        .collect();
    entries.sort_by(|a, b| b.match_date.cmp(&a.match_date));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineGameRow, TeamRow};
    use serde_json::json;

    fn team(id: &str, name: &str) -> Relation<TeamRow> {
        Relation::One(TeamRow { id: id.into(), name: name.into(), location: None })
    }

    fn player(id: &str, first: &str) -> Relation<PersonRow> {
        Relation::One(PersonRow {
            id: id.into(),
            first_name: Some(first.into()),
            last_name: Some("Player".into()),
            preferred_name: None,
            email: None,
            phone_mobile: None,
            birthday: None,
        })
    }

    fn line(number: i64, winner: Option<&str>, games: &[(i64, serde_json::Value, serde_json::Value)]) -> MatchLineRow {
        MatchLineRow {
            id: format!("line-{}", number),
            line_number: Some(number),
            winner_team_id: winner.map(str::to_string),
            line_game: Relation::Many(
                games
                    .iter()
                    .map(|(n, h, a)| LineGameRow {
                        id: Some(format!("g-{}-{}", number, n)),
                        game_number: Some(*n),
                        home_score: h.clone(),
                        away_score: a.clone(),
                    })
                    .collect(),
            ),
            home_player1: player("h1", "Hana"),
            home_player2: player("h2", "Hugo"),
            away_player1: player("a1", "Ari"),
            away_player2: Relation::Empty,
        }
    }

    fn match_row(id: &str, date: Option<&str>, winner: Option<&str>, lines: Vec<MatchLineRow>) -> RawMatchHistoryRow {
        RawMatchHistoryRow {
            id: id.into(),
            match_date: date.map(str::to_string),
            match_time: Some("18:00:00+00".into()),
            location: Some("Riverside Courts".into()),
            home_team_id: "home".into(),
            away_team_id: "away".into(),
            winner_team_id: winner.map(str::to_string),
            home_team: team("home", "Net Ninjas"),
            away_team: team("away", "Dink Dynasty"),
            match_line: Relation::Many(lines),
        }
    }

    #[test]
    fn test_away_team_perspective() {
        let row = match_row(
            "m-1",
            Some("2025-10-12"),
            Some("away"),
            vec![
                line(2, Some("away"), &[(1, json!(8), json!(11)), (2, json!(9), json!(11))]),
                line(1, Some("home"), &[(2, json!(5), json!(11)), (1, json!(11), json!(7)), (3, json!(11), json!(4))]),
                line(3, Some("away"), &[(1, json!("x"), json!(11))]),
            ],
        );

        let entries = normalize_match_history(&[row], "away");
        let entry = &entries[0];
        assert!(!entry.is_home_match);
        assert_eq!(entry.opponent_id, "home");
        assert_eq!(entry.opponent_name, "Net Ninjas");
        assert_eq!((entry.team_score, entry.opponent_score), (2, 1));
        assert_eq!(entry.points_earned, 2);
        assert_eq!(entry.result, MatchResult::Win);
        assert_eq!((entry.games_won, entry.games_lost), (3, 2));
        assert_eq!(entry.match_date_label, "Oct 12, 2025");

        let first = &entry.lines[0];
        assert_eq!(first.line_number, 1);
        assert_eq!(first.result, MatchResult::Loss);
        assert_eq!(first.games[0].id.as_deref(), Some("g-1-1"));
        assert_eq!(first.total_points, MatchLineTotals { home: Some(27.0), away: Some(22.0) });
        assert_eq!(first.home_players.len(), 2);
        assert_eq!(first.away_players.len(), 1);
        assert_eq!(first.away_players[0].full_name, "Ari Player");

        let third = &entry.lines[2];
        assert_eq!(third.games[0].home_score, None);
        assert_eq!(third.total_points, MatchLineTotals { home: None, away: Some(11.0) });
    }

    #[test]
    fn test_result_falls_back_to_line_count() {
        let won = match_row("m-1", Some("2025-10-01"), None, vec![line(1, Some("home"), &[]), line(2, None, &[])]);
        let tied = match_row("m-2", Some("2025-10-08"), None, vec![line(1, Some("home"), &[]), line(2, Some("away"), &[])]);

        let entries = normalize_match_history(&[won, tied], "home");
        assert_eq!(entries[0].id, "m-2");
        assert_eq!(entries[0].result, MatchResult::Tie);
        assert_eq!(entries[1].result, MatchResult::Win);
        assert_eq!(entries[1].lines[1].result, MatchResult::Tie);
    }

    #[test]
    fn test_newest_first_with_undated_last() {
        let rows = vec![
            match_row("old", Some("2025-09-01"), None, vec![]),
            match_row("undated", None, None, vec![]),
            match_row("new", Some("2025-10-20"), None, vec![]),
        ];
        let ids: Vec<String> = normalize_match_history(&rows, "home").into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }

    #[test]
    fn test_matches_of_other_teams_are_ignored() {
        let row = match_row("m-1", Some("2025-10-12"), None, vec![]);
        assert!(normalize_match_history(&[row], "someone-else").is_empty());
    }
}
