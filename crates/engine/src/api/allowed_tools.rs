//! `GET`/`POST /allowed_tools` (§4.3, §4.7, §6) — bare JSON array on the
//! wire, mirroring `ToolPolicy`'s transparent serialization.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

pub async fn get_allowed_tools(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.policy.snapshot().tools)
}

pub async fn post_allowed_tools(
    State(state): State<AppState>,
    Json(tools): Json<Vec<String>>,
) -> impl IntoResponse {
    match state.policy.replace(tools) {
        Ok(()) => (StatusCode::OK, Json(json!({"ok": true}))),
        Err(e) => {
            tracing::error!(error = %e, "failed to persist allowed_tools");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.kind()})),
            )
        }
    }
}
