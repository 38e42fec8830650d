//! Event injection handler.
//!
//! `POST /api/v1/events` takes an `InboundEvent` and returns the effects the
//! orchestrator produced, so the conversation core can be driven without
//! Telegram.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use uuid::Uuid;

use talkgate_types::event::{EventKind, InboundEvent, OutboundEffect};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/events
pub async fn post_event(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(event): Json<InboundEvent>,
) -> Result<Json<ApiResponse<Vec<OutboundEffect>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    validate_event(&event)?;
    tracing::debug!(user_id = event.user_id, request_id = %request_id, "injected event");

    let effects = state.orchestrator.handle(event).await;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(effects, request_id, elapsed)))
}

fn validate_event(event: &InboundEvent) -> Result<(), AppError> {
    if event.user_id <= 0 {
        return Err(AppError::Validation(format!(
            "user_id must be positive, got {}",
            event.user_id
        )));
    }
    if let EventKind::Command { name, .. } = &event.kind {
        if name.is_empty() {
            return Err(AppError::Validation("command name is empty".to_string()));
        }
    }
    Ok(())
}
