//! User inspection HTTP handlers.
//!
//! Endpoints:
//! - GET /api/v1/users/{id}/entitlement - Entitlement record
//! - GET /api/v1/users/{id}/sessions    - Sessions, newest first
//! - GET /api/v1/users/{id}/history     - Dialogue log, oldest first

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use talkgate_types::entitlement::Entitlement;
use talkgate_types::history::Turn;
use talkgate_types::session::Session;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::ListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/users/{id}/entitlement
pub async fn get_entitlement(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Entitlement>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let entitlement = state
        .orchestrator
        .gate()
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("entitlement for user {user_id} not found")))?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(entitlement, request_id, elapsed)
        .with_link("self", &format!("/api/v1/users/{user_id}/entitlement"))
        .with_link("sessions", &format!("/api/v1/users/{user_id}/sessions"));

    Ok(Json(resp))
}

/// GET /api/v1/users/{id}/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(user_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Session>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sessions = state
        .orchestrator
        .sessions()
        .list_for_user(user_id, Some(query.bounded()))
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(sessions, request_id, elapsed)
        .with_link("self", &format!("/api/v1/users/{user_id}/sessions"));

    Ok(Json(resp))
}

/// GET /api/v1/users/{id}/history
pub async fn get_history(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(user_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Turn>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let turns = state
        .orchestrator
        .sessions()
        .history_for_user(user_id, Some(query.bounded()))
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(turns, request_id, elapsed)
        .with_link("self", &format!("/api/v1/users/{user_id}/history"));

    Ok(Json(resp))
}
