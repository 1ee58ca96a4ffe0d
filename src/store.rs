//! Data access boundary shared by the hosted and the local backends.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::models::{
    InsertedLine, NewLineGame, NewMatch, NewMatchLine, PersonRow, PlayerProfileRow, RawMatchHistoryRow,
    RawPlayerLineRow, RosterRow, TeamMembershipRow, TeamRow,
};

pub type Record = Map<String, Value>;

/// Tables the raw browser is allowed to read.
pub const BROWSABLE_TABLES: &[&str] = &[
    "person",
    "player_profile",
    "team",
    "team_membership",
    "match",
    "match_line",
    "line_game",
    "team_standings",
];

pub fn is_browsable_table(name: &str) -> bool {
    BROWSABLE_TABLES.contains(&name)
}

#[async_trait]
pub trait LeagueStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    async fn list_teams(&self) -> anyhow::Result<Vec<TeamRow>>;

    async fn get_team(&self, team_id: &str) -> anyhow::Result<Option<TeamRow>>;

    /// Case-insensitive substring match on the team name.
    async fn search_teams(&self, query: &str) -> anyhow::Result<Vec<TeamRow>>;

    async fn team_roster(&self, team_id: &str) -> anyhow::Result<Vec<RosterRow>>;

    /// Rows of the standings view, untyped.
    async fn standings(&self) -> anyhow::Result<Vec<Record>>;

    async fn person(&self, person_id: &str) -> anyhow::Result<Option<PersonRow>>;

    async fn player_profile(&self, person_id: &str) -> anyhow::Result<Option<PlayerProfileRow>>;

    /// Memberships of one person, newest start date first.
    async fn player_memberships(&self, person_id: &str) -> anyhow::Result<Vec<TeamMembershipRow>>;

    /// Every line the person played in any slot, with match, games and players.
    async fn player_line_rows(&self, person_id: &str) -> anyhow::Result<Vec<RawPlayerLineRow>>;

    /// Every match the team played, home or away, newest first.
    async fn team_match_rows(&self, team_id: &str) -> anyhow::Result<Vec<RawMatchHistoryRow>>;

    /// Returns the new match id.
    async fn insert_match(&self, new_match: &NewMatch) -> anyhow::Result<String>;

    async fn insert_lines(&self, lines: &[NewMatchLine]) -> anyhow::Result<Vec<InsertedLine>>;

    async fn insert_games(&self, games: &[NewLineGame]) -> anyhow::Result<()>;

    async fn browse_table(&self, table: &str, limit: usize) -> anyhow::Result<Vec<Record>>;
}
