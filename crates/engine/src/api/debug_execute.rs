//! `POST /debug/execute` (§4.3, §6) — a dry-run executor invocation for
//! interactive debugging. Never advances `seq` and never publishes a
//! render job; it runs entirely alongside the engine loop, not through it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DebugExecutePayload {
    pub story_text: String,
}

pub async fn debug_execute(
    State(state): State<AppState>,
    Json(payload): Json<DebugExecutePayload>,
) -> impl IntoResponse {
    let tools = state.policy.snapshot().tools;
    match state.executor.call(&payload.story_text, &tools, true).await {
        Ok(resp) => (
            StatusCode::OK,
            Json(json!({
                "executed": resp.executed,
                "malformed": resp.malformed.iter().map(|m| json!({"text": m.text, "reason": m.reason})).collect::<Vec<_>>(),
                "raw_image_b64": resp.raw_image_b64,
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "debug/execute failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": e.kind()})),
            )
        }
    }
}
