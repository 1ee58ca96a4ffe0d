pub mod seed;
pub use seed::{seed_data, DEMO_PLAYER_ID};

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Number, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::error::LeagueError;
use crate::models::*;
use crate::store::{is_browsable_table, LeagueStore, Record};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/league.db";

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    let in_memory = file_path.contains(":memory:") || file_path.contains("mode=memory");
    if !in_memory {
        if let Some(parent) = std::path::Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // Every connection to an in-memory database gets its own copy.
    let max_connections = if in_memory { 1 } else { 5 };
    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if in_memory {
        // Closing the only connection would drop the database with it.
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database(database_url: &str) -> Result<SqlitePool> {
    let pool = create_pool(database_url).await?;
    init_database_with_pool(&pool).await?;
    Ok(pool)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS person (
        id TEXT PRIMARY KEY,
        first_name TEXT,
        last_name TEXT,
        preferred_name TEXT,
        email TEXT,
        phone_mobile TEXT,
        birthday TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS player_profile (
        person_id TEXT PRIMARY KEY,
        handle TEXT,
        bio TEXT,
        avatar_url TEXT,
        cover_url TEXT,
        FOREIGN KEY (person_id) REFERENCES person (id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS team (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        location TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS team_membership (
        id TEXT PRIMARY KEY,
        person_id TEXT NOT NULL,
        team_id TEXT NOT NULL,
        role TEXT,
        start_date TEXT,
        end_date TEXT,
        FOREIGN KEY (person_id) REFERENCES person (id),
        FOREIGN KEY (team_id) REFERENCES team (id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "match" (
        id TEXT PRIMARY KEY,
        match_date TEXT,
        match_time TEXT,
        location TEXT,
        home_team_id TEXT NOT NULL,
        away_team_id TEXT NOT NULL,
        winner_team_id TEXT,
        FOREIGN KEY (home_team_id) REFERENCES team (id),
        FOREIGN KEY (away_team_id) REFERENCES team (id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS match_line (
        id TEXT PRIMARY KEY,
        match_id TEXT NOT NULL,
        line_number INTEGER NOT NULL,
        home_player1 TEXT,
        home_player2 TEXT,
        away_player1 TEXT,
        away_player2 TEXT,
        winner_team_id TEXT,
        FOREIGN KEY (match_id) REFERENCES "match" (id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS line_game (
        id TEXT PRIMARY KEY,
        line_id TEXT NOT NULL,
        game_number INTEGER NOT NULL,
        home_score INTEGER,
        away_score INTEGER,
        FOREIGN KEY (line_id) REFERENCES match_line (id)
    )
    "#,
    // Lines won count as standings points.
    r#"
    CREATE VIEW IF NOT EXISTS team_standings AS
    SELECT
        team_id,
        team_name,
        matches_won,
        matches_lost,
        CASE WHEN matches_won + matches_lost = 0 THEN 0
             ELSE ROUND(100.0 * matches_won / (matches_won + matches_lost)) END AS win_percentage,
        total_points
    FROM (
        SELECT
            t.id AS team_id,
            t.name AS team_name,
            (SELECT COUNT(*) FROM "match" m WHERE m.winner_team_id = t.id) AS matches_won,
            (SELECT COUNT(*) FROM "match" m
                WHERE m.winner_team_id IS NOT NULL
                  AND m.winner_team_id <> t.id
                  AND (m.home_team_id = t.id OR m.away_team_id = t.id)) AS matches_lost,
            (SELECT COUNT(*) FROM match_line l WHERE l.winner_team_id = t.id) AS total_points
        FROM team t
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_membership_team ON team_membership(team_id)",
    "CREATE INDEX IF NOT EXISTS idx_membership_person ON team_membership(person_id)",
    r#"CREATE INDEX IF NOT EXISTS idx_match_date ON "match"(match_date)"#,
    "CREATE INDEX IF NOT EXISTS idx_line_match ON match_line(match_id)",
    "CREATE INDEX IF NOT EXISTS idx_game_line ON line_game(line_id)",
];

/// Called from the server so schema creation shares the main pool.
pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!("Database initialized successfully");
    Ok(())
}

pub async fn clear_all_data(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM line_game").execute(pool).await?;
    sqlx::query("DELETE FROM match_line").execute(pool).await?;
    sqlx::query(r#"DELETE FROM "match""#).execute(pool).await?;
    sqlx::query("DELETE FROM team_membership").execute(pool).await?;
    sqlx::query("DELETE FROM player_profile").execute(pool).await?;
    sqlx::query("DELETE FROM team").execute(pool).await?;
    sqlx::query("DELETE FROM person").execute(pool).await?;
    tracing::info!("All data cleared");
    Ok(())
}

fn person_from_row(row: &SqliteRow) -> PersonRow {
    PersonRow {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        preferred_name: row.get("preferred_name"),
        email: row.get("email"),
        phone_mobile: row.get("phone_mobile"),
        birthday: row.get("birthday"),
    }
}

fn team_from_row(row: &SqliteRow) -> TeamRow {
    TeamRow {
        id: row.get("id"),
        name: row.get("name"),
        location: row.get("location"),
    }
}

fn match_from_row(row: &SqliteRow) -> MatchRow {
    MatchRow {
        id: row.get("id"),
        match_date: row.get("match_date"),
        match_time: row.get("match_time"),
        location: row.get("location"),
        home_team_id: row.get("home_team_id"),
        away_team_id: row.get("away_team_id"),
        winner_team_id: row.get("winner_team_id"),
    }
}

fn game_from_row(row: &SqliteRow) -> LineGameRow {
    LineGameRow {
        id: row.get("id"),
        game_number: row.get("game_number"),
        home_score: row
            .get::<Option<i64>, _>("home_score")
            .map_or(Value::Null, Value::from),
        away_score: row
            .get::<Option<i64>, _>("away_score")
            .map_or(Value::Null, Value::from),
    }
}

/// Untyped record for the standings view and the table browser.
fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(index)?),
                "REAL" | "NUMERIC" => Number::from_f64(row.try_get::<f64, _>(index)?)
                    .map_or(Value::Null, Value::Number),
                "BLOB" => Value::String(format!("<{} bytes>", row.try_get::<Vec<u8>, _>(index)?.len())),
                _ => Value::String(row.try_get::<String, _>(index)?),
            }
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

/// Local SQLite backend with the same tables as the hosted database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = init_database(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn people(&self, ids: &[Option<String>]) -> Result<HashMap<String, PersonRow>> {
        let mut people = HashMap::new();
        for id in ids.iter().flatten() {
            if people.contains_key(id) {
                continue;
            }
            if let Some(person) = self.person(id).await? {
                people.insert(id.clone(), person);
            }
        }
        Ok(people)
    }

    async fn games_for_line(&self, line_id: &str) -> Result<Vec<LineGameRow>> {
        let rows = sqlx::query("SELECT * FROM line_game WHERE line_id = ? ORDER BY game_number")
            .bind(line_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(game_from_row).collect())
    }

    async fn match_by_id(&self, match_id: &str) -> Result<Option<MatchRow>> {
        let row = sqlx::query(r#"SELECT * FROM "match" WHERE id = ?"#)
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(match_from_row))
    }

    async fn lines_for_match(&self, match_id: &str) -> Result<Vec<MatchLineRow>> {
        let rows = sqlx::query("SELECT * FROM match_line WHERE match_id = ? ORDER BY line_number")
            .bind(match_id)
            .fetch_all(&self.pool)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let slots: [Option<String>; 4] = [
                row.get("home_player1"),
                row.get("home_player2"),
                row.get("away_player1"),
                row.get("away_player2"),
            ];
            let people = self.people(&slots).await?;
            let slot = |index: usize| -> Relation<PersonRow> {
                slots[index].as_ref().and_then(|id| people.get(id).cloned()).into()
            };
            let id: String = row.get("id");

            lines.push(MatchLineRow {
                line_game: Relation::Many(self.games_for_line(&id).await?),
                line_number: row.get("line_number"),
                winner_team_id: row.get("winner_team_id"),
                home_player1: slot(0),
                home_player2: slot(1),
                away_player1: slot(2),
                away_player2: slot(3),
                id,
            });
        }
        Ok(lines)
    }
}

#[async_trait]
impl LeagueStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn list_teams(&self) -> Result<Vec<TeamRow>> {
        let rows = sqlx::query("SELECT id, name, location FROM team ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(team_from_row).collect())
    }

    async fn get_team(&self, team_id: &str) -> Result<Option<TeamRow>> {
        let row = sqlx::query("SELECT id, name, location FROM team WHERE id = ?")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(team_from_row))
    }

    async fn search_teams(&self, query: &str) -> Result<Vec<TeamRow>> {
        // LIKE is case-insensitive for ASCII in SQLite, matching ILIKE.
        let rows = sqlx::query("SELECT id, name, location FROM team WHERE name LIKE ? ORDER BY name LIMIT 25")
            .bind(format!("%{}%", query.trim()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(team_from_row).collect())
    }

    async fn team_roster(&self, team_id: &str) -> Result<Vec<RosterRow>> {
        let rows = sqlx::query(
            r#"
            SELECT tm.role, p.id, p.first_name, p.last_name, p.preferred_name,
                   p.email, p.phone_mobile, p.birthday
            FROM team_membership tm
            LEFT JOIN person p ON p.id = tm.person_id
            WHERE tm.team_id = ?
            ORDER BY tm.person_id
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RosterRow {
                role: row.get("role"),
                person: match row.get::<Option<String>, _>("id") {
                    Some(_) => Relation::One(person_from_row(row)),
                    None => Relation::Empty,
                },
            })
            .collect())
    }

    async fn standings(&self) -> Result<Vec<Record>> {
        let rows = sqlx::query(
            "SELECT team_id, team_name, matches_won, matches_lost, win_percentage, total_points \
             FROM team_standings ORDER BY total_points DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn person(&self, person_id: &str) -> Result<Option<PersonRow>> {
        let row = sqlx::query("SELECT * FROM person WHERE id = ?")
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(person_from_row))
    }

    async fn player_profile(&self, person_id: &str) -> Result<Option<PlayerProfileRow>> {
        let row = sqlx::query("SELECT handle, bio, avatar_url, cover_url FROM player_profile WHERE person_id = ?")
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| PlayerProfileRow {
            handle: row.get("handle"),
            bio: row.get("bio"),
            avatar_url: row.get("avatar_url"),
            cover_url: row.get("cover_url"),
        }))
    }

    async fn player_memberships(&self, person_id: &str) -> Result<Vec<TeamMembershipRow>> {
        let rows = sqlx::query(
            r#"
            SELECT tm.id AS membership_id, tm.team_id, tm.start_date, tm.end_date,
                   t.id, t.name, t.location
            FROM team_membership tm
            LEFT JOIN team t ON t.id = tm.team_id
            WHERE tm.person_id = ?
            ORDER BY tm.start_date DESC
            "#,
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| TeamMembershipRow {
                id: row.get("membership_id"),
                team_id: row.get("team_id"),
                start_date: row.get("start_date"),
                end_date: row.get("end_date"),
                team: match row.get::<Option<String>, _>("id") {
                    Some(_) => Relation::One(team_from_row(row)),
                    None => Relation::Empty,
                },
            })
            .collect())
    }

    async fn player_line_rows(&self, person_id: &str) -> Result<Vec<RawPlayerLineRow>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM match_line
            WHERE home_player1 = ?1 OR home_player2 = ?1 OR away_player1 = ?1 OR away_player2 = ?1
            ORDER BY match_id
            "#,
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await?;

        let mut matches: HashMap<String, Option<MatchRow>> = HashMap::new();
        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let match_id: String = row.get("match_id");
            if !matches.contains_key(&match_id) {
                let found = self.match_by_id(&match_id).await?;
                matches.insert(match_id.clone(), found);
            }

            let slots: [Option<String>; 4] = [
                row.get("home_player1"),
                row.get("home_player2"),
                row.get("away_player1"),
                row.get("away_player2"),
            ];
            let people = self.people(&slots).await?;
            let slot = |index: usize| -> Relation<PersonRow> {
                slots[index].as_ref().and_then(|id| people.get(id).cloned()).into()
            };

            lines.push(RawPlayerLineRow {
                match_info: matches.get(&match_id).cloned().flatten().into(),
                line_game: Relation::Many(self.games_for_line(&id).await?),
                line_number: row.get("line_number"),
                winner_team_id: row.get("winner_team_id"),
                home_player1: slot(0),
                home_player2: slot(1),
                away_player1: slot(2),
                away_player2: slot(3),
                match_id,
                id,
            });
        }
        Ok(lines)
    }

    async fn team_match_rows(&self, team_id: &str) -> Result<Vec<RawMatchHistoryRow>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM "match"
            WHERE home_team_id = ?1 OR away_team_id = ?1
            ORDER BY match_date DESC, match_time DESC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        let mut history = Vec::with_capacity(rows.len());
        for row in rows {
            let m = match_from_row(&row);
            let home_team = self.get_team(&m.home_team_id).await?;
            let away_team = self.get_team(&m.away_team_id).await?;
            let lines = self.lines_for_match(&m.id).await?;
            history.push(RawMatchHistoryRow {
                home_team: home_team.into(),
                away_team: away_team.into(),
                match_line: Relation::Many(lines),
                id: m.id,
                match_date: m.match_date,
                match_time: m.match_time,
                location: m.location,
                home_team_id: m.home_team_id,
                away_team_id: m.away_team_id,
                winner_team_id: m.winner_team_id,
            });
        }
        Ok(history)
    }

    async fn insert_match(&self, new_match: &NewMatch) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO "match"
            (id, match_date, match_time, location, home_team_id, away_team_id, winner_team_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new_match.match_date)
        .bind(&new_match.match_time)
        .bind(&new_match.location)
        .bind(&new_match.home_team_id)
        .bind(&new_match.away_team_id)
        .bind(&new_match.winner_team_id)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_lines(&self, lines: &[NewMatchLine]) -> Result<Vec<InsertedLine>> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(lines.len());
        for line in lines {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO match_line
                (id, match_id, line_number, home_player1, home_player2, away_player1, away_player2, winner_team_id)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&line.match_id)
            .bind(line.line_number)
            .bind(&line.home_player1)
            .bind(&line.home_player2)
            .bind(&line.away_player1)
            .bind(&line.away_player2)
            .bind(&line.winner_team_id)
            .execute(&mut *tx)
            .await?;
            inserted.push(InsertedLine {
                id,
                line_number: line.line_number,
            });
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn insert_games(&self, games: &[NewLineGame]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for game in games {
            sqlx::query(
                "INSERT INTO line_game (id, line_id, game_number, home_score, away_score) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&game.line_id)
            .bind(game.game_number)
            .bind(game.home_score)
            .bind(game.away_score)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn browse_table(&self, table: &str, limit: usize) -> Result<Vec<Record>> {
        if !is_browsable_table(table) {
            return Err(LeagueError::UnknownTable(table.to_string()).into());
        }
        // Names come from the allow-list above, so quoting is enough.
        let sql = format!(r#"SELECT * FROM "{}" LIMIT ?"#, table);
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::match_history::normalize_match_history;
    use crate::services::player_lines::normalize_player_lines;
    use crate::services::standings::sanitize_standings;

    async fn seeded_store() -> SqliteStore {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        seed_data(&store).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        init_database_with_pool(store.pool()).await.unwrap();
        assert!(store.list_teams().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_teams_sorted_and_searchable() {
        let store = seeded_store().await;
        let teams = store.list_teams().await.unwrap();
        let names: Vec<&str> = teams.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Bay City Dinks", "Cascadia Dink Queens", "Harbor Ridge Waves", "Rainier Smash"]
        );

        let found = store.search_teams("dINK").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(store.get_team("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_roster_has_people() {
        let store = seeded_store().await;
        let teams = store.search_teams("Rainier").await.unwrap();
        let roster = store.team_roster(&teams[0].id).await.unwrap();
        assert_eq!(roster.len(), 4);
        assert!(roster.iter().all(|r| r.person.first().is_some()));
    }

    #[tokio::test]
    async fn test_player_lines_carry_nested_rows() {
        let store = seeded_store().await;
        let rows = store.player_line_rows(DEMO_PLAYER_ID).await.unwrap();
        assert!(rows.len() >= 4);
        assert!(rows.iter().all(|r| r.match_info.first().is_some()));
        assert!(rows.iter().all(|r| !r.line_game.all().is_empty()));

        let lines = normalize_player_lines(&rows, DEMO_PLAYER_ID);
        assert_eq!(lines.len(), 3);
        assert!(lines.windows(2).all(|w| w[0].match_date <= w[1].match_date));
    }

    #[tokio::test]
    async fn test_memberships_newest_first() {
        let store = seeded_store().await;
        let memberships = store.player_memberships(DEMO_PLAYER_ID).await.unwrap();
        assert_eq!(memberships.len(), 2);
        assert!(memberships[0].end_date.is_none());
        assert_eq!(memberships[1].team.first().map(|t| t.name.as_str()), Some("Harbor Ridge Waves"));
    }

    #[tokio::test]
    async fn test_standings_view_counts_matches_and_lines() {
        let store = seeded_store().await;
        let standings = sanitize_standings(store.standings().await.unwrap());
        assert_eq!(standings.len(), 4);
        assert_eq!(standings[0].team_name, "Rainier Smash");
        assert_eq!(standings[0].matches_won, Some(2.0));
        assert_eq!(standings[0].matches_lost, Some(0.0));
        assert_eq!(standings[0].win_percentage, Some(100.0));
        assert_eq!(standings[0].total_points, Some(5.0));
    }

    #[tokio::test]
    async fn test_match_history_rows() {
        let store = seeded_store().await;
        let teams = store.search_teams("Rainier").await.unwrap();
        let team_id = &teams[0].id;
        let rows = store.team_match_rows(team_id).await.unwrap();
        assert_eq!(rows.len(), 4);

        let history = normalize_match_history(&rows, team_id);
        assert_eq!(history[0].match_date_label, "Nov 9, 2025");
        assert!(history[0].lines.is_empty());
        assert_eq!(history[1].match_date_label, "Oct 26, 2025");
        assert_eq!(history[1].lines.len(), 2);
        assert_eq!(history[1].result, crate::models::MatchResult::Tie);
        assert!(history.iter().all(|h| !h.opponent_name.is_empty()));
    }

    #[tokio::test]
    async fn test_insert_round_trip_through_history() {
        let store = seeded_store().await;
        let teams = store.list_teams().await.unwrap();
        let (home, away) = (&teams[0], &teams[1]);
        let match_id = store
            .insert_match(&NewMatch {
                home_team_id: home.id.clone(),
                away_team_id: away.id.clone(),
                match_date: "2025-12-01".into(),
                match_time: "19:00".into(),
                location: "Test Courts".into(),
                winner_team_id: None,
            })
            .await
            .unwrap();
        let lines = store
            .insert_lines(&[NewMatchLine {
                match_id: match_id.clone(),
                line_number: 1,
                home_player1: DEMO_PLAYER_ID.into(),
                home_player2: DEMO_PLAYER_ID.into(),
                away_player1: DEMO_PLAYER_ID.into(),
                away_player2: DEMO_PLAYER_ID.into(),
                winner_team_id: Some(home.id.clone()),
            }])
            .await
            .unwrap();
        store
            .insert_games(&[NewLineGame {
                line_id: lines[0].id.clone(),
                game_number: 1,
                home_score: 11,
                away_score: 7,
            }])
            .await
            .unwrap();

        let rows = store.team_match_rows(&home.id).await.unwrap();
        let row = rows.iter().find(|r| r.id == match_id).unwrap();
        let line = row.match_line.first().unwrap();
        assert_eq!(line.line_game.first().map(|g| g.home_score.clone()), Some(Value::from(11)));
    }

    #[tokio::test]
    async fn test_table_browser() {
        let store = seeded_store().await;
        let rows = store.browse_table("team", 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains_key("name"));

        let standings = store.browse_table("team_standings", 10).await.unwrap();
        assert!(standings[0].get("total_points").is_some_and(Value::is_number));

        let err = store.browse_table("sqlite_master", 10).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<LeagueError>(), Some(LeagueError::UnknownTable(_))));
    }
}
