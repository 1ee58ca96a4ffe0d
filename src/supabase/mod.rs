//! Hosted league database reached through its PostgREST endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::LeagueError;
use crate::models::*;
use crate::store::{is_browsable_table, LeagueStore, Record};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

const TEAM_COLUMNS: &str = "id,name,location";

const ROSTER_SELECTION: &str = r#"
    role,
    person:person_id (
        id,
        first_name,
        last_name,
        preferred_name,
        email,
        phone_mobile,
        birthday
    )
"#;

const STANDINGS_COLUMNS: &str = "team_id,team_name,matches_won,matches_lost,win_percentage,total_points";

const PERSON_COLUMNS: &str = "id,first_name,last_name,preferred_name";

const MEMBERSHIP_SELECTION: &str = r#"
    id,
    team_id,
    start_date,
    end_date,
    team:team_id ( id, name, location )
"#;

const PLAYER_LINE_SELECTION: &str = r#"
    id,
    match_id,
    line_number,
    winner_team_id,
    match:match_id (
        id,
        match_date,
        match_time,
        location,
        home_team_id,
        away_team_id,
        winner_team_id
    ),
    line_game ( id, game_number, home_score, away_score ),
    home_player1:home_player1 ( id, first_name, last_name, preferred_name ),
    home_player2:home_player2 ( id, first_name, last_name, preferred_name ),
    away_player1:away_player1 ( id, first_name, last_name, preferred_name ),
    away_player2:away_player2 ( id, first_name, last_name, preferred_name )
"#;

const MATCH_HISTORY_SELECTION: &str = r#"
    id,
    match_date,
    match_time,
    location,
    home_team_id,
    away_team_id,
    winner_team_id,
    home_team:home_team_id ( id, name, location ),
    away_team:away_team_id ( id, name, location ),
    match_line (
        id,
        line_number,
        winner_team_id,
        line_game ( id, game_number, home_score, away_score ),
        home_player1:home_player1 ( id, first_name, last_name ),
        home_player2:home_player2 ( id, first_name, last_name ),
        away_player1:away_player1 ( id, first_name, last_name ),
        away_player2:away_player2 ( id, first_name, last_name )
    )
"#;

/// Whitespace is not allowed inside a PostgREST `select`.
fn compact_selection(columns: &str) -> String {
    columns.chars().filter(|c| !c.is_whitespace()).collect()
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    details: Option<String>,
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|err| err.message.or(err.details))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });

    Err(LeagueError::Api {
        status: status.as_u16(),
        message,
    }
    .into())
}

#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    rest_url: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(anon_key)
            .map_err(|_| LeagueError::Config("SUPABASE_ANON_KEY is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", anon_key))
            .map_err(|_| LeagueError::Config("SUPABASE_ANON_KEY is not a valid header value".into()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(20))
            .build()?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
        })
    }

    pub fn from(&self, table: &str) -> QueryBuilder<'_> {
        QueryBuilder {
            client: self,
            table: table.to_string(),
            params: Vec::new(),
        }
    }
}

/// One request against a table or view, built up filter by filter.
pub struct QueryBuilder<'a> {
    client: &'a SupabaseClient,
    table: String,
    params: Vec<(String, String)>,
}

impl<'a> QueryBuilder<'a> {
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".into(), compact_selection(columns)));
        self
    }

    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.params.push((column.into(), format!("eq.{}", value)));
        self
    }

    /// `filters` uses PostgREST syntax, e.g. `home_team_id.eq.1,away_team_id.eq.1`.
    pub fn or(mut self, filters: &str) -> Self {
        self.params.push(("or".into(), format!("({})", filters)));
        self
    }

    pub fn ilike(mut self, column: &str, pattern: &str) -> Self {
        self.params.push((column.into(), format!("ilike.{}", pattern)));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params.push(("order".into(), format!("{}.{}", column, direction)));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.params.push(("limit".into(), count.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    fn url(&self) -> String {
        format!("{}/{}", self.client.rest_url, self.table)
    }

    pub async fn fetch_all<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let response = self
            .client
            .http
            .get(self.url())
            .query(&self.params)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.table))?;
        Ok(check(response).await?.json().await?)
    }

    /// Exactly one row; PostgREST answers 406 otherwise.
    pub async fn single<T: DeserializeOwned>(self) -> Result<T> {
        let response = self
            .client
            .http
            .get(self.url())
            .query(&self.params)
            .header(ACCEPT, SINGLE_OBJECT)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.table))?;
        Ok(check(response).await?.json().await?)
    }

    /// Zero or one row.
    pub async fn maybe_single<T: DeserializeOwned>(self) -> Result<Option<T>> {
        let rows: Vec<T> = self.limit(2).fetch_all().await?;
        if rows.len() > 1 {
            return Err(LeagueError::Api {
                status: 406,
                message: "expected at most one row".into(),
            }
            .into());
        }
        Ok(rows.into_iter().next())
    }

    /// Insert rows and return them as stored (`select` narrows the columns).
    pub async fn insert<B, T>(self, rows: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .http
            .post(self.url())
            .query(&self.params)
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await
            .with_context(|| format!("insert into {} failed", self.table))?;
        Ok(check(response).await?.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    #[serde(deserialize_with = "de_id")]
    id: String,
}

pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LeagueStore for SupabaseStore {
    fn backend(&self) -> &'static str {
        "supabase"
    }

    async fn list_teams(&self) -> Result<Vec<TeamRow>> {
        self.client
            .from("team")
            .select(TEAM_COLUMNS)
            .order("name", true)
            .fetch_all()
            .await
    }

    async fn get_team(&self, team_id: &str) -> Result<Option<TeamRow>> {
        self.client
            .from("team")
            .select(TEAM_COLUMNS)
            .eq("id", team_id)
            .maybe_single()
            .await
    }

    async fn search_teams(&self, query: &str) -> Result<Vec<TeamRow>> {
        self.client
            .from("team")
            .select(TEAM_COLUMNS)
            .ilike("name", &format!("*{}*", query.trim()))
            .order("name", true)
            .limit(25)
            .fetch_all()
            .await
    }

    async fn team_roster(&self, team_id: &str) -> Result<Vec<RosterRow>> {
        self.client
            .from("team_membership")
            .select(ROSTER_SELECTION)
            .eq("team_id", team_id)
            .order("person_id", true)
            .fetch_all()
            .await
    }

    async fn standings(&self) -> Result<Vec<Record>> {
        self.client
            .from("team_standings")
            .select(STANDINGS_COLUMNS)
            .order("total_points", false)
            .fetch_all()
            .await
    }

    async fn person(&self, person_id: &str) -> Result<Option<PersonRow>> {
        self.client
            .from("person")
            .select(PERSON_COLUMNS)
            .eq("id", person_id)
            .maybe_single()
            .await
    }

    async fn player_profile(&self, person_id: &str) -> Result<Option<PlayerProfileRow>> {
        self.client
            .from("player_profile")
            .select("handle,bio,avatar_url,cover_url")
            .eq("person_id", person_id)
            .maybe_single()
            .await
    }

    async fn player_memberships(&self, person_id: &str) -> Result<Vec<TeamMembershipRow>> {
        self.client
            .from("team_membership")
            .select(MEMBERSHIP_SELECTION)
            .eq("person_id", person_id)
            .order("start_date", false)
            .fetch_all()
            .await
    }

    async fn player_line_rows(&self, person_id: &str) -> Result<Vec<RawPlayerLineRow>> {
        let filter = ["home_player1", "home_player2", "away_player1", "away_player2"]
            .iter()
            .map(|slot| format!("{}.eq.{}", slot, person_id))
            .collect::<Vec<_>>()
            .join(",");
        self.client
            .from("match_line")
            .select(PLAYER_LINE_SELECTION)
            .or(&filter)
            .order("match_id", true)
            .fetch_all()
            .await
    }

    async fn team_match_rows(&self, team_id: &str) -> Result<Vec<RawMatchHistoryRow>> {
        self.client
            .from("match")
            .select(MATCH_HISTORY_SELECTION)
            .or(&format!("home_team_id.eq.{0},away_team_id.eq.{0}", team_id))
            .order("match_date", false)
            .fetch_all()
            .await
    }

    async fn insert_match(&self, new_match: &NewMatch) -> Result<String> {
        let rows: Vec<IdOnly> = self
            .client
            .from("match")
            .select("id")
            .insert(std::slice::from_ref(new_match))
            .await?;
        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| anyhow::anyhow!("match insert returned no row"))
    }

    async fn insert_lines(&self, lines: &[NewMatchLine]) -> Result<Vec<InsertedLine>> {
        self.client
            .from("match_line")
            .select("id,line_number")
            .insert(lines)
            .await
    }

    async fn insert_games(&self, games: &[NewLineGame]) -> Result<()> {
        let _: Vec<IdOnly> = self.client.from("line_game").select("id").insert(games).await?;
        Ok(())
    }

    async fn browse_table(&self, table: &str, limit: usize) -> Result<Vec<Record>> {
        if !is_browsable_table(table) {
            return Err(LeagueError::UnknownTable(table.to_string()).into());
        }
        self.client.from(table).select("*").limit(limit).fetch_all().await
    }
}
