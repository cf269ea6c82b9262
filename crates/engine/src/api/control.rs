//! `POST /pause`, `POST /unpause` (§4.3, §6) — flip `RunState.paused`
//! atomically and report the new state.

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

pub async fn pause(State(state): State<AppState>) -> impl IntoResponse {
    state.run_state.set_paused(true);
    Json(json!({"paused": true}))
}

pub async fn unpause(State(state): State<AppState>) -> impl IntoResponse {
    state.run_state.set_paused(false);
    Json(json!({"paused": false}))
}
