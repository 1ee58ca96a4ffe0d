//! Composition root: one store, one cache per resource family.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::cache::{ConsumeOptions, ResourceCache, StaleTime};
use super::match_entry::{self, AutofillResult, MatchEntryForm, SavedMatch, DEFAULT_LINES_PER_MATCH, MAX_LINES_PER_MATCH};
use super::match_history::normalize_match_history;
use super::player_profile::{build_profile_view, PlayerProfileView};
use super::player_stats::get_player_computed_stats;
use super::standings::{sanitize_roster, sanitize_standings};
use crate::error::LeagueError;
use crate::models::{
    MatchHistoryEntry, PlayerComputedStats, PlayerOption, RosterEntry, StandingRecord, TeamRow,
};
use crate::store::{LeagueStore, Record};
use crate::utils::is_valid_uuid;

pub const TEAMS_STALE_MINUTES: i64 = 5;
pub const MATCH_ENTRY_TEAMS_STALE_MINUTES: i64 = 10;
pub const TEAM_DETAIL_STALE_MINUTES: i64 = 2;
pub const STANDINGS_STALE_MINUTES: i64 = 5;
pub const PLAYER_STATS_STALE_MINUTES: i64 = 5;

pub const DEFAULT_TABLE_LIMIT: usize = 50;
pub const MAX_TABLE_LIMIT: usize = 500;

const TEAMS_KEY: &str = "teams";
const MATCH_ENTRY_TEAMS_KEY: &str = "matchEntry:teams";
const STANDINGS_KEY: &str = "standings";
const PLAYER_STATS_PREFIX: &str = "playerStats:";

pub fn player_stats_key(player_id: &str) -> String {
    format!("{}{}", PLAYER_STATS_PREFIX, player_id)
}

pub fn match_history_key(team_id: &str) -> String {
    format!("matchHistory:{}", team_id)
}

/// Read the entry through the cache. An entry left in the error state is
/// fetched again, since every call here is an explicit request for data.
async fn load<T, F, Fut>(cache: &ResourceCache<T>, key: &str, stale_time: StaleTime, fetcher: F) -> Result<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let view = cache.consume(key, fetcher, ConsumeOptions::stale_after(stale_time));
    let result = if view.is_error() && !view.is_fetching() {
        view.refetch().await
    } else {
        view.resolve().await
    };
    result.map_err(anyhow::Error::from)
}

pub struct League {
    store: Arc<dyn LeagueStore>,
    teams: ResourceCache<Vec<TeamRow>>,
    team_details: ResourceCache<Option<TeamRow>>,
    rosters: ResourceCache<Vec<RosterEntry>>,
    standings: ResourceCache<Vec<StandingRecord>>,
    player_stats: ResourceCache<PlayerComputedStats>,
    match_history: ResourceCache<Vec<MatchHistoryEntry>>,
    entry_rosters: ResourceCache<Vec<PlayerOption>>,
}

impl League {
    pub fn new(store: Arc<dyn LeagueStore>) -> Self {
        Self {
            store,
            teams: ResourceCache::new(),
            team_details: ResourceCache::new(),
            rosters: ResourceCache::new(),
            standings: ResourceCache::new(),
            player_stats: ResourceCache::new(),
            match_history: ResourceCache::new(),
            entry_rosters: ResourceCache::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn LeagueStore> {
        &self.store
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn standings_cache(&self) -> &ResourceCache<Vec<StandingRecord>> {
        &self.standings
    }

    pub fn player_stats_cache(&self) -> &ResourceCache<PlayerComputedStats> {
        &self.player_stats
    }

    pub fn match_history_cache(&self) -> &ResourceCache<Vec<MatchHistoryEntry>> {
        &self.match_history
    }

    async fn team_list(&self, key: &str, stale_minutes: i64) -> Result<Vec<TeamRow>> {
        let store = Arc::clone(&self.store);
        load(&self.teams, key, StaleTime::minutes(stale_minutes), move || {
            let store = Arc::clone(&store);
            async move { store.list_teams().await.context("Unable to load teams.") }
        })
        .await
    }

    /// All teams by name.
    pub async fn teams(&self) -> Result<Vec<TeamRow>> {
        self.team_list(TEAMS_KEY, TEAMS_STALE_MINUTES).await
    }

    /// Team pick-list for match entry; refreshed less eagerly.
    pub async fn match_entry_teams(&self) -> Result<Vec<TeamRow>> {
        self.team_list(MATCH_ENTRY_TEAMS_KEY, MATCH_ENTRY_TEAMS_STALE_MINUTES).await
    }

    pub async fn team(&self, team_id: &str) -> Result<TeamRow> {
        let store = Arc::clone(&self.store);
        let id = team_id.to_string();
        let key = format!("team:{}", team_id);
        let team = load(&self.team_details, &key, StaleTime::minutes(TEAM_DETAIL_STALE_MINUTES), move || {
            let store = Arc::clone(&store);
            let id = id.clone();
            async move { store.get_team(&id).await.context("Unable to load team.") }
        })
        .await?;
        team.ok_or_else(|| LeagueError::NotFound(format!("team {}", team_id)).into())
    }

    /// Uncached; a blank query lists every team.
    pub async fn search_teams(&self, query: &str) -> Result<Vec<TeamRow>> {
        if query.trim().is_empty() {
            return self.teams().await;
        }
        self.store
            .search_teams(query)
            .await
            .context("Unable to search teams.")
    }

    pub async fn team_roster(&self, team_id: &str) -> Result<Vec<RosterEntry>> {
        let store = Arc::clone(&self.store);
        let id = team_id.to_string();
        let key = format!("teamRoster:{}", team_id);
        load(&self.rosters, &key, StaleTime::minutes(TEAM_DETAIL_STALE_MINUTES), move || {
            let store = Arc::clone(&store);
            let id = id.clone();
            async move {
                let rows = store.team_roster(&id).await.context("Unable to load team roster.")?;
                Ok(sanitize_roster(rows))
            }
        })
        .await
    }

    pub async fn standings(&self) -> Result<Vec<StandingRecord>> {
        let store = Arc::clone(&self.store);
        load(&self.standings, STANDINGS_KEY, StaleTime::minutes(STANDINGS_STALE_MINUTES), move || {
            let store = Arc::clone(&store);
            async move {
                let rows = store.standings().await.context("Unable to load standings.")?;
                Ok(sanitize_standings(rows))
            }
        })
        .await
    }

    pub async fn player_stats(&self, player_id: &str) -> Result<PlayerComputedStats> {
        let player_id = player_id.trim();
        if !is_valid_uuid(player_id) {
            return Err(LeagueError::InvalidPlayerId(player_id.to_string()).into());
        }

        let store = Arc::clone(&self.store);
        let id = player_id.to_string();
        load(
            &self.player_stats,
            &player_stats_key(player_id),
            StaleTime::minutes(PLAYER_STATS_STALE_MINUTES),
            move || {
                let store = Arc::clone(&store);
                let id = id.clone();
                async move { get_player_computed_stats(store.as_ref(), &id).await }
            },
        )
        .await
    }

    pub async fn player_profile(&self, player_id: &str, today: NaiveDate) -> Result<PlayerProfileView> {
        let stats = self.player_stats(player_id).await?;
        Ok(build_profile_view(&stats, today))
    }

    pub async fn match_history(&self, team_id: &str) -> Result<Vec<MatchHistoryEntry>> {
        let store = Arc::clone(&self.store);
        let id = team_id.to_string();
        load(
            &self.match_history,
            &match_history_key(team_id),
            StaleTime::minutes(TEAM_DETAIL_STALE_MINUTES),
            move || {
                let store = Arc::clone(&store);
                let id = id.clone();
                async move {
                    let rows = store
                        .team_match_rows(&id)
                        .await
                        .context("Unable to load match history.")?;
                    Ok(normalize_match_history(&rows, &id))
                }
            },
        )
        .await
    }

    /// Roster pick-list for match entry. Never goes stale on its own.
    pub async fn players_for_team(&self, team_id: &str) -> Result<Vec<PlayerOption>> {
        let store = Arc::clone(&self.store);
        let id = team_id.to_string();
        let key = format!("matchEntry:players:{}", team_id);
        load(&self.entry_rosters, &key, StaleTime::Never, move || {
            let store = Arc::clone(&store);
            let id = id.clone();
            async move { match_entry::players_for_team(store.as_ref(), &id).await }
        })
        .await
    }

    /// Save a match and expire everything its result feeds into.
    ///
    /// A partial write also expires those entries: the match row exists and
    /// already counts toward the standings.
    pub async fn submit_match(&self, form: &MatchEntryForm) -> Result<SavedMatch> {
        let result = match_entry::save_match(self.store.as_ref(), form).await;

        let wrote_match = match &result {
            Ok(_) => true,
            Err(err) => matches!(err.downcast_ref::<LeagueError>(), Some(LeagueError::PartialWrite { .. })),
        };
        if wrote_match {
            self.standings.invalidate(STANDINGS_KEY);
            self.match_history.invalidate(&match_history_key(form.home_team_id.trim()));
            self.match_history.invalidate(&match_history_key(form.away_team_id.trim()));
            self.player_stats.invalidate_where(|key| key.starts_with(PLAYER_STATS_PREFIX));
            tracing::debug!("Expired standings, match history and player stats after a match write");
        }
        result
    }

    pub async fn autofill_match(&self, line_count: Option<usize>, today: NaiveDate) -> Result<AutofillResult> {
        let mut rng = StdRng::from_entropy();
        match_entry::autofill_match(
            self.store.as_ref(),
            line_count.unwrap_or(DEFAULT_LINES_PER_MATCH),
            today,
            &mut rng,
        )
        .await
    }

    pub async fn browse_table(&self, table: &str, limit: Option<usize>) -> Result<Vec<Record>> {
        let limit = limit.unwrap_or(DEFAULT_TABLE_LIMIT).clamp(1, MAX_TABLE_LIMIT);
        self.store.browse_table(table, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_data, SqliteStore, DEMO_PLAYER_ID};
    use crate::models::{MatchResult, PersonRow, Relation, RosterRow};
    use crate::services::cache::ResourceStatus;
    use crate::services::match_entry::{GameScoreInput, LineForm, PairSlots};
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
    }

    async fn seeded_league() -> League {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        seed_data(&store).await.unwrap();
        League::new(Arc::new(store))
    }

    fn memory_league() -> (Arc<MemoryStore>, League) {
        let mut store = MemoryStore::default();
        store.teams = vec![TeamRow { id: "t-1".into(), name: "Net Ninjas".into(), location: None }];
        store.standings = vec![json!({"team_id": "t-1", "team_name": "Net Ninjas", "total_points": 3})
            .as_object()
            .cloned()
            .unwrap()];
        store.rosters.insert(
            "t-1".into(),
            vec![RosterRow {
                role: None,
                person: Relation::One(PersonRow {
                    id: "p-1".into(),
                    first_name: Some("Hana".into()),
                    last_name: Some("Ito".into()),
                    preferred_name: None,
                    email: None,
                    phone_mobile: None,
                    birthday: None,
                }),
            }],
        );
        let store = Arc::new(store);
        let league = League::new(store.clone());
        (store, league)
    }

    #[tokio::test]
    async fn test_reads_are_cached() {
        let (store, league) = memory_league();

        assert_eq!(league.teams().await.unwrap().len(), 1);
        assert_eq!(league.teams().await.unwrap().len(), 1);
        assert_eq!(store.calls(), 1);

        league.standings().await.unwrap();
        league.standings().await.unwrap();
        assert_eq!(store.calls(), 2);

        league.players_for_team("t-1").await.unwrap();
        league.players_for_team("t-1").await.unwrap();
        assert_eq!(store.calls(), 3);

        // Separate key with its own stale time.
        league.match_entry_teams().await.unwrap();
        assert_eq!(store.calls(), 4);
    }

    #[tokio::test]
    async fn test_invalidated_entry_is_refetched() {
        let (store, league) = memory_league();
        league.standings().await.unwrap();
        league.standings_cache().invalidate(STANDINGS_KEY);

        // Nothing fresh is cached, so the read waits for the refetch.
        let standings = league.standings().await.unwrap();
        assert_eq!(standings[0].total_points, Some(3.0));
        assert_eq!(store.calls(), 2);
        assert!(league.standings_cache().snapshot(STANDINGS_KEY).updated_at.is_some());
    }

    #[tokio::test]
    async fn test_player_stats_read_every_source_once() {
        let player_id = "00000000-0000-4000-8000-0000000000aa";
        let mut store = MemoryStore::default();
        store.people = vec![PersonRow {
            id: player_id.into(),
            first_name: Some("Hana".into()),
            last_name: Some("Ito".into()),
            preferred_name: None,
            email: None,
            phone_mobile: None,
            birthday: None,
        }];
        let store = Arc::new(store);
        let league = League::new(store.clone());

        let (first, second) = tokio::join!(league.player_stats(player_id), league.player_stats(player_id));
        assert_eq!(first.unwrap().basics.full_name, "Hana Ito");
        assert!(second.is_ok());
        league.player_stats(player_id).await.unwrap();

        // person, profile, memberships and line rows
        assert_eq!(store.calls(), 4);
    }

    #[tokio::test]
    async fn test_player_id_must_be_uuid() {
        let (store, league) = memory_league();
        let err = league.player_stats("not-a-uuid").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<LeagueError>(), Some(LeagueError::InvalidPlayerId(_))));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_team_is_not_found() {
        let (_, league) = memory_league();
        let err = league.team("t-9").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<LeagueError>(), Some(LeagueError::NotFound(_))));
        assert_eq!(league.team("t-1").await.unwrap().name, "Net Ninjas");
    }

    #[tokio::test]
    async fn test_seeded_player_profile() {
        let league = seeded_league().await;
        let view = league.player_profile(DEMO_PLAYER_ID, today()).await.unwrap();
        assert!(view.has_matches);
        assert_eq!(view.profile.name, "Ava Morales");
        assert_eq!(view.profile.team, "Rainier Smash");
        assert_eq!(view.team_history.len(), 2);
        assert_eq!(view.quick_stats[0].value, "100%");
    }

    #[tokio::test]
    async fn test_submit_match_invalidates_dependents() {
        let league = seeded_league().await;
        let teams = league.search_teams("Harbor").await.unwrap();
        let harbor = teams[0].clone();
        let cascadia = league.search_teams("Cascadia").await.unwrap()[0].clone();
        let harbor_players = league.players_for_team(&harbor.id).await.unwrap();
        let cascadia_players = league.players_for_team(&cascadia.id).await.unwrap();
        assert!(harbor_players.len() >= 2 && cascadia_players.len() >= 2);

        let before = league.match_history(&harbor.id).await.unwrap();
        league.player_stats(DEMO_PLAYER_ID).await.unwrap();
        league.standings().await.unwrap();

        let form = MatchEntryForm {
            home_team_id: harbor.id.clone(),
            away_team_id: cascadia.id.clone(),
            match_date: "2025-11-16".into(),
            match_time: "17:30".into(),
            location: "Harbor Ridge Athletic Club (Bremerton, WA)".into(),
            lines: vec![LineForm {
                id: "line-a".into(),
                line_number: 1,
                team_h: PairSlots {
                    player1_id: harbor_players[0].id.clone(),
                    player2_id: harbor_players[1].id.clone(),
                },
                team_a: PairSlots {
                    player1_id: cascadia_players[0].id.clone(),
                    player2_id: cascadia_players[1].id.clone(),
                },
                games: vec![GameScoreInput::new(11, 6), GameScoreInput::new(11, 9)],
                winner_team_id: None,
            }],
        };
        let saved = league.submit_match(&form).await.unwrap();
        assert_eq!(saved.winner_team_id.as_deref(), Some(harbor.id.as_str()));

        assert!(league.standings_cache().snapshot(STANDINGS_KEY).updated_at.is_none());
        assert!(league
            .player_stats_cache()
            .snapshot(&player_stats_key(DEMO_PLAYER_ID))
            .updated_at
            .is_none());
        let history_state = league.match_history_cache().snapshot(&match_history_key(&harbor.id));
        assert!(history_state.updated_at.is_none());
        assert_eq!(history_state.status, ResourceStatus::Success);

        let after = league.match_history(&harbor.id).await.unwrap();
        assert_eq!(after.len(), before.len() + 1);
        let saved_entry = after.iter().find(|m| m.id == saved.match_id).unwrap();
        assert_eq!(saved_entry.result, MatchResult::Win);
    }

    #[tokio::test]
    async fn test_invalid_submission_touches_nothing() {
        let (store, league) = memory_league();
        league.standings().await.unwrap();
        let err = league.submit_match(&MatchEntryForm::default()).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<LeagueError>(), Some(LeagueError::Validation(_))));
        assert!(league.standings_cache().snapshot(STANDINGS_KEY).updated_at.is_some());
        assert!(store.inserted_matches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_autofill_and_browse() {
        let league = seeded_league().await;
        let filled = league.autofill_match(Some(2), today()).await.unwrap();
        assert_eq!(filled.form.lines.len(), 2);
        assert_ne!(filled.home_team.id, filled.away_team.id);

        for count in [0, MAX_LINES_PER_MATCH + 1, 200_000] {
            let err = league.autofill_match(Some(count), today()).await.unwrap_err();
            assert!(matches!(err.downcast_ref::<LeagueError>(), Some(LeagueError::Validation(_))));
        }
        let filled = league.autofill_match(Some(MAX_LINES_PER_MATCH), today()).await.unwrap();
        assert_eq!(filled.form.lines.len(), MAX_LINES_PER_MATCH);

        let rows = league.browse_table("person", Some(10_000)).await.unwrap();
        assert_eq!(rows.len(), 12);
        assert!(league.browse_table("secrets", None).await.is_err());
    }
}
