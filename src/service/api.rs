//! HTTP JSON API over the ranked engine
//!
//! Every route is scoped by the `{scope}` path segment. Engine errors are
//! returned as `{"error": <kind>, "message": <text>}` with a status code
//! derived from the error kind.

use crate::engine::RankedEngine;
use crate::error::RankedError;
use crate::types::PlayerId;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Body of `POST /scopes/{scope}/queue`
#[derive(Debug, Clone, Deserialize)]
pub struct JoinRequest {
    pub player_id: PlayerId,
    /// Mode token such as `"1s"` or `"3v3"`
    pub mode: String,
}

/// Body of `POST /scopes/{scope}/matches/{match_id}/reports`
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    pub player_id: PlayerId,
    /// `"team1"` or `"team2"`
    pub winner: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// Engine error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub RankedError);

impl From<RankedError> for ApiError {
    fn from(error: RankedError) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            RankedError::InvalidMode { .. } | RankedError::InvalidVote { .. } => {
                StatusCode::BAD_REQUEST
            }
            RankedError::AlreadyQueued { .. } | RankedError::AlreadyInMatch { .. } => {
                StatusCode::CONFLICT
            }
            RankedError::NotQueued { .. } | RankedError::MatchNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            RankedError::NotAParticipant { .. } => StatusCode::FORBIDDEN,
            RankedError::Persistence { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RankedError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Routes exposing the engine operations
pub fn router(engine: RankedEngine) -> Router {
    Router::new()
        .route("/scopes/{scope}/queue", post(join_queue).get(queue_status))
        .route("/scopes/{scope}/queue/{player_id}", delete(leave_queue))
        .route("/scopes/{scope}/matches/{match_id}", get(get_match))
        .route(
            "/scopes/{scope}/matches/{match_id}/reports",
            post(report_outcome),
        )
        .route("/scopes/{scope}/leaderboard", get(leaderboard))
        .route("/scopes/{scope}/players/{player_id}", get(get_player))
        .with_state(engine)
}

async fn join_queue(
    State(engine): State<RankedEngine>,
    Path(scope): Path<String>,
    Json(request): Json<JoinRequest>,
) -> ApiResult<impl IntoResponse> {
    debug!(
        "API join: scope={}, player={}, mode={}",
        scope, request.player_id, request.mode
    );
    let outcome = engine
        .join_queue_token(&scope, &request.player_id, &request.mode)
        .await?;
    Ok(Json(outcome))
}

async fn leave_queue(
    State(engine): State<RankedEngine>,
    Path((scope, player_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let outcome = engine.leave_queue(&scope, &player_id).await?;
    Ok(Json(outcome))
}

async fn report_outcome(
    State(engine): State<RankedEngine>,
    Path((scope, match_id)): Path<(String, String)>,
    Json(request): Json<ReportRequest>,
) -> ApiResult<impl IntoResponse> {
    debug!(
        "API report: scope={}, match={}, player={}, winner={}",
        scope, match_id, request.player_id, request.winner
    );
    let outcome = engine
        .report_outcome_token(&scope, &match_id, &request.player_id, &request.winner)
        .await?;
    Ok(Json(outcome))
}

async fn queue_status(
    State(engine): State<RankedEngine>,
    Path(scope): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.queue_status(&scope).await?))
}

async fn leaderboard(
    State(engine): State<RankedEngine>,
    Path(scope): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.leaderboard(&scope, query.limit).await?))
}

async fn get_match(
    State(engine): State<RankedEngine>,
    Path((scope, match_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(engine.get_match(&scope, &match_id).await?))
}

async fn get_player(
    State(engine): State<RankedEngine>,
    Path((scope, player_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    match engine.get_player(&scope, &player_id).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "player_not_found",
                "message": format!("Player {} has no record in scope {}", player_id, scope),
            })),
        )
            .into_response()),
    }
}
