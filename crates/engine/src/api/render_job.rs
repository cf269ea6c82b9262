//! `GET /render_job` (§4.3, §6) — must return within ~50 ms regardless of
//! engine state, so this handler only ever takes the gate's mutex for a
//! `peek`; it never awaits the engine loop.

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

pub async fn render_job(State(state): State<AppState>) -> impl IntoResponse {
    match state.gate.peek() {
        Some(job) => Json(json!({
            "seq": job.seq,
            "image_b64": job.raw_image_b64,
            "actions": job.actions,
        })),
        None => Json(json!({ "waiting": true })),
    }
}
