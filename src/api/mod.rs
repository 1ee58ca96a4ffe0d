use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::AppConfig;
use crate::error::{find_league_error, LeagueError};
use crate::models::{
    ApiResponse, MatchHistoryEntry, PlayerComputedStats, PlayerOption, RosterEntry, StandingRecord, TeamRow,
};
use crate::services::league::League;
use crate::services::match_entry::{AutofillResult, MatchEntryForm, SavedMatch};
use crate::services::player_profile::PlayerProfileView;
use crate::store::Record;

#[derive(Clone)]
pub struct AppState {
    pub league: Arc<League>,
    pub default_player_id: String,
}

pub async fn serve(config: &AppConfig, port: u16) -> anyhow::Result<()> {
    let store = config.connect_store().await?;
    let state = AppState {
        league: Arc::new(League::new(store)),
        default_player_id: config.default_player_id.clone(),
    };

    let app = create_router(state).fallback_service(ServeDir::new(&config.static_dir));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("League API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/teams", get(list_teams_handler))
        .route("/teams/search", get(search_teams_handler))
        .route("/teams/{id}", get(get_team_handler))
        .route("/teams/{id}/roster", get(team_roster_handler))
        .route("/teams/{id}/matches", get(match_history_handler))
        .route("/teams/{id}/players", get(team_players_handler))
        .route("/standings", get(standings_handler))
        .route("/players/stats", get(default_player_stats_handler))
        .route("/players/{id}/stats", get(player_stats_handler))
        .route("/players/{id}/profile", get(player_profile_handler))
        .route("/tables/{name}", get(browse_table_handler))
        .route("/matches", axum::routing::post(submit_match_handler))
        .route("/matches/autofill", get(autofill_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Handler error carrying the status it maps to.
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = format!("{:#}", self.0);
        let (status, body) = match find_league_error(&self.0) {
            Some(LeagueError::Validation(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiResponse::<()>::invalid("Match entry is invalid.".to_string(), errors.clone()),
            ),
            Some(LeagueError::NotFound(_)) => (StatusCode::NOT_FOUND, ApiResponse::error(message)),
            Some(LeagueError::InvalidPlayerId(_)) | Some(LeagueError::UnknownTable(_)) => {
                (StatusCode::BAD_REQUEST, ApiResponse::error(message))
            }
            Some(LeagueError::Api { .. }) => (StatusCode::BAD_GATEWAY, ApiResponse::error(message)),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, ApiResponse::error(message)),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", body.error.as_deref().unwrap_or_default());
        } else {
            tracing::debug!("Request rejected with {}", status);
        }
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    backend: &'static str,
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<Health>> {
    Json(ApiResponse::success(Health {
        status: "League API is running",
        backend: state.league.backend(),
    }))
}

// GET /teams
async fn list_teams_handler(State(state): State<AppState>) -> ApiResult<Vec<TeamRow>> {
    ok(state.league.teams().await?)
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

// GET /teams/search?q=
async fn search_teams_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Vec<TeamRow>> {
    ok(state.league.search_teams(params.q.as_deref().unwrap_or_default()).await?)
}

async fn get_team_handler(State(state): State<AppState>, Path(team_id): Path<String>) -> ApiResult<TeamRow> {
    ok(state.league.team(&team_id).await?)
}

async fn team_roster_handler(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<Vec<RosterEntry>> {
    ok(state.league.team_roster(&team_id).await?)
}

async fn match_history_handler(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<Vec<MatchHistoryEntry>> {
    ok(state.league.match_history(&team_id).await?)
}

async fn team_players_handler(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<Vec<PlayerOption>> {
    ok(state.league.players_for_team(&team_id).await?)
}

async fn standings_handler(State(state): State<AppState>) -> ApiResult<Vec<StandingRecord>> {
    ok(state.league.standings().await?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerQuery {
    player_id: Option<String>,
}

// GET /players/stats?playerId= - falls back to the configured demo player
async fn default_player_stats_handler(
    State(state): State<AppState>,
    Query(params): Query<PlayerQuery>,
) -> ApiResult<PlayerComputedStats> {
    let player_id = params
        .player_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| state.default_player_id.clone());
    ok(state.league.player_stats(&player_id).await?)
}

async fn player_stats_handler(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> ApiResult<PlayerComputedStats> {
    ok(state.league.player_stats(&player_id).await?)
}

async fn player_profile_handler(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> ApiResult<PlayerProfileView> {
    let today = chrono::Utc::now().date_naive();
    ok(state.league.player_profile(&player_id, today).await?)
}

#[derive(Deserialize)]
struct TableQuery {
    limit: Option<usize>,
}

// GET /tables/:name?limit= - raw rows for the table browser
async fn browse_table_handler(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<TableQuery>,
) -> ApiResult<Vec<Record>> {
    ok(state.league.browse_table(&table, params.limit).await?)
}

#[derive(Deserialize)]
struct AutofillQuery {
    lines: Option<usize>,
}

async fn autofill_handler(
    State(state): State<AppState>,
    Query(params): Query<AutofillQuery>,
) -> ApiResult<AutofillResult> {
    let today = chrono::Utc::now().date_naive();
    ok(state.league.autofill_match(params.lines, today).await?)
}

// POST /matches - validate and save a match with its lines and games
async fn submit_match_handler(
    State(state): State<AppState>,
    Json(form): Json<MatchEntryForm>,
) -> Result<(StatusCode, Json<ApiResponse<SavedMatch>>), ApiError> {
    let saved = state.league.submit_match(&form).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(saved))))
}
