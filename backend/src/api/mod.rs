use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{create_pool, init_database};
use crate::error::Error;
use crate::models::{ApiResponse, Competition, ImportSummary, PageRequest, Player, Team};
use crate::services::{catalog, FootballDataClient, Importer};

/// Shared by every handler. The importer (and the rate limiter inside it) is
/// built once, so concurrent import requests draw on one throttle budget.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub importer: Arc<Importer<FootballDataClient>>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        let importer = Importer::from_config(pool.clone(), config);
        Self { pool, importer: Arc::new(importer) }
    }
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let pool = create_pool(&config.database_url).await?;
    init_database(&pool).await?;

    let app = create_router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("Football import API listening on port {}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/competitionImport/{code}", post(import_competition_handler))
        .route("/api/competitions", get(list_competitions_handler))
        .route("/api/teams/{code}", get(teams_by_competition_handler))
        .route("/api/teams/{code}/players", get(players_by_team_handler))
        .route("/api/players/{code}", get(players_by_competition_handler))
        .route("/api/players/{code}/{tla}", get(players_by_competition_and_team_handler))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
        )
        .with_state(state)
}

/// Error body in the same envelope as successful responses.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// Health check endpoint
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("Football import API is running"))
}

async fn not_found() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("Not Found".to_string())))
}

// POST /api/competitionImport/:code - Run the full import synchronously
async fn import_competition_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<ImportSummary> {
    let summary = state.importer.import_competition(&code).await?;
    Ok(Json(ApiResponse::success(summary)))
}

// GET /api/competitions
async fn list_competitions_handler(State(state): State<AppState>) -> ApiResult<Vec<Competition>> {
    Ok(Json(ApiResponse::success(catalog::list_competitions(&state.pool).await?)))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<usize>,
    limit: Option<usize>,
    name: Option<String>,
}

impl ListQuery {
    fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

// GET /api/teams/:code?page&limit&name - Teams of a competition
async fn teams_by_competition_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<ListQuery>,
) -> ApiResult<Vec<Team>> {
    let teams = catalog::teams_by_competition(&state.pool, &code, params.name.as_deref(), params.page()).await?;
    Ok(Json(ApiResponse::success(teams)))
}

// GET /api/teams/:tla/players - Squad of one team
async fn players_by_team_handler(
    State(state): State<AppState>,
    Path(tla): Path<String>,
) -> ApiResult<Vec<Player>> {
    Ok(Json(ApiResponse::success(catalog::players_by_team(&state.pool, &tla).await?)))
}

// GET /api/players/:code?page&limit - Players across a competition
async fn players_by_competition_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<ListQuery>,
) -> ApiResult<Vec<Player>> {
    let players = catalog::players_by_competition(&state.pool, &code, None, params.page()).await?;
    Ok(Json(ApiResponse::success(players)))
}

// GET /api/players/:code/:tla?page&limit
async fn players_by_competition_and_team_handler(
    State(state): State<AppState>,
    Path((code, tla)): Path<(String, String)>,
    Query(params): Query<ListQuery>,
) -> ApiResult<Vec<Player>> {
    let players = catalog::players_by_competition(&state.pool, &code, Some(&tla), params.page()).await?;
    Ok(Json(ApiResponse::success(players)))
}
