//! Records as delivered by the league database, nested relations included.

use serde::{Deserialize, Serialize};

use super::relation::{de_id, de_opt_id, Relation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub preferred_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfileRow {
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMembershipRow {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(deserialize_with = "de_id")]
    pub team_id: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub team: Relation<TeamRow>,
}

/// A team membership seen from the team side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterRow {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub person: Relation<PersonRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub match_date: Option<String>,
    #[serde(default)]
    pub match_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(deserialize_with = "de_id")]
    pub home_team_id: String,
    #[serde(deserialize_with = "de_id")]
    pub away_team_id: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub winner_team_id: Option<String>,
}

/// Scores stay untyped until normalization; legacy rows hold strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineGameRow {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub game_number: Option<i64>,
    #[serde(default)]
    pub home_score: serde_json::Value,
    #[serde(default)]
    pub away_score: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlayerLineRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_id")]
    pub match_id: String,
    #[serde(default)]
    pub line_number: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub winner_team_id: Option<String>,
    #[serde(rename = "match", default)]
    pub match_info: Relation<MatchRow>,
    #[serde(default)]
    pub line_game: Relation<LineGameRow>,
    #[serde(default)]
    pub home_player1: Relation<PersonRow>,
    #[serde(default)]
    pub home_player2: Relation<PersonRow>,
    #[serde(default)]
    pub away_player1: Relation<PersonRow>,
    #[serde(default)]
    pub away_player2: Relation<PersonRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLineRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub line_number: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub winner_team_id: Option<String>,
    #[serde(default)]
    pub line_game: Relation<LineGameRow>,
    #[serde(default)]
    pub home_player1: Relation<PersonRow>,
    #[serde(default)]
    pub home_player2: Relation<PersonRow>,
    #[serde(default)]
    pub away_player1: Relation<PersonRow>,
    #[serde(default)]
    pub away_player2: Relation<PersonRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMatchHistoryRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub match_date: Option<String>,
    #[serde(default)]
    pub match_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(deserialize_with = "de_id")]
    pub home_team_id: String,
    #[serde(deserialize_with = "de_id")]
    pub away_team_id: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub winner_team_id: Option<String>,
    #[serde(default)]
    pub home_team: Relation<TeamRow>,
    #[serde(default)]
    pub away_team: Relation<TeamRow>,
    #[serde(default)]
    pub match_line: Relation<MatchLineRow>,
}

// Insert payloads, in write order: match, then lines, then games.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMatch {
    pub home_team_id: String,
    pub away_team_id: String,
    pub match_date: String,
    pub match_time: String,
    pub location: String,
    pub winner_team_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMatchLine {
    pub match_id: String,
    pub line_number: i64,
    pub home_player1: String,
    pub home_player2: String,
    pub away_player1: String,
    pub away_player2: String,
    pub winner_team_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertedLine {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub line_number: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLineGame {
    pub line_id: String,
    pub game_number: i64,
    pub home_score: i64,
    pub away_score: i64,
}
