//! The per-turn state machine (§4.2): execute -> publish -> await
//! annotation -> VLM -> parse -> persist -> broadcast.
//!
//! Runs as a single background `tokio::task`, spawned once after the HTTP
//! listener binds (§4.8). It is the sole mutator of `RunState.last_seq`
//! and the sole writer to `TurnStore` — the concurrency discipline in §5
//! depends on there being exactly one of these tasks per process.

use std::time::{Duration, Instant};

use chrono::Utc;

use va_domain::{RenderAction, RenderJob, ToolCall, ToolPolicy, Turn};

use crate::gate::AwaitOutcome;
use crate::parse::parse_tool_calls;
use crate::state::AppState;

/// §3: "executed[] length >= the executor's declared minimum (typically
/// >=1)". This engine requires at least one well-formed action per turn.
const MIN_EXECUTED_ACTIONS: usize = 1;

pub async fn run_loop(state: AppState) {
    let mut story_in = state.config.paths.initial_story.clone();

    loop {
        state.run_state.wait_until_unpaused(&state.cancel).await;
        if state.cancel.is_cancelled() {
            tracing::info!("engine loop: cancellation observed at turn boundary, stopping");
            return;
        }

        let seq = state.run_state.advance_seq();
        let mut turn = Turn::new(seq, story_in.clone());
        let policy = state.policy.snapshot();

        // ── STEP_EXECUTE ──────────────────────────────────────────────
        let exec_started = Instant::now();
        let exec_result = state.executor.call(&story_in, &policy.tools, false).await;
        turn.latency_ms.exec_ms = exec_started.elapsed().as_millis() as u64;

        let exec_resp = match exec_result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(seq, error = %e, "executor call failed");
                fail_turn(&state, turn, e.kind()).await;
                continue;
            }
        };

        turn.executed = exec_resp
            .executed
            .iter()
            .map(|a| ToolCall {
                name: a.name.clone(),
                args: a.args.clone(),
                source_span: None,
            })
            .collect();

        if turn.executed.len() < MIN_EXECUTED_ACTIONS {
            tracing::warn!(seq, "executor returned zero well-formed calls");
            fail_turn(&state, turn, "executor_malformed_output").await;
            continue;
        }

        // ── STEP_PUBLISH ──────────────────────────────────────────────
        let actions: Vec<RenderAction> = exec_resp
            .executed
            .iter()
            .map(|a| RenderAction {
                name: a.name.clone(),
                args: a.args.clone(),
                coords: a.coords,
            })
            .collect();
        state
            .gate
            .publish(RenderJob::new(seq, exec_resp.raw_image_b64.clone(), actions));

        // ── STEP_AWAIT_ANNOTATION ─────────────────────────────────────
        let annotate_started = Instant::now();
        let annotation_timeout = Duration::from_secs(state.config.engine.annotation_timeout_sec);
        let outcome = state
            .gate
            .await_annotation(seq, annotation_timeout, &state.cancel)
            .await;
        turn.latency_ms.annotate_ms = annotate_started.elapsed().as_millis() as u64;

        let annotated_image_b64 = match outcome {
            AwaitOutcome::Image(img) => img,
            AwaitOutcome::Timeout => {
                tracing::warn!(seq, "annotation timed out, no vlm call made");
                fail_turn(&state, turn, "annotation_timeout").await;
                continue;
            }
            AwaitOutcome::Cancelled => {
                tracing::info!(seq, "engine loop: cancelled awaiting annotation, shutting down");
                return;
            }
        };
        turn.annotated_image_b64 = annotated_image_b64;

        // ── STEP_VLM ──────────────────────────────────────────────────
        let system_prompt = build_system_prompt(&policy);
        let vlm_started = Instant::now();
        let vlm_outcome = call_vlm_with_retry(&state, &story_in, &turn, &system_prompt).await;
        turn.latency_ms.vlm_ms = vlm_started.elapsed().as_millis() as u64;
        let (vlm_text, usage) = match vlm_outcome {
            Ok(resp) => (resp.vlm_text, resp.usage),
            Err(kind) => {
                tracing::warn!(seq, kind, "vlm call did not yield usable text");
                fail_turn(&state, turn, kind).await;
                continue;
            }
        };
        turn.vlm_text = vlm_text;
        turn.usage = usage.into();

        // ── Parse + hygiene rule (§4.2 step 7, §9) ───────────────────
        let parsed = parse_tool_calls(&turn.vlm_text);
        if parsed.len() < state.config.engine.min_tool_calls {
            turn.warnings.push("tool_underflow".into());
        }
        turn.tool_calls_out = parsed;

        // Next turn's story is derived from this turn's vlm_text (§4.2
        // step 8), regardless of the underflow warning — see SPEC_FULL.md
        // §9 for why this engine does not pad with synthetic actions.
        story_in = turn.vlm_text.clone();

        state.run_state.set_last_error(None);
        persist_turn(&state, turn).await;
    }
}

/// Calls the VLM once; on an empty reply, retries once (if configured)
/// before giving up. Returns `Err("vlm_empty")` after exhausting the
/// retry, or the adapter's own error kind on a subprocess failure.
async fn call_vlm_with_retry(
    state: &AppState,
    story_in: &str,
    turn: &Turn,
    system_prompt: &str,
) -> Result<va_adapters::VlmResponse, &'static str> {
    let mut attempts = if state.config.engine.retry_vlm_once { 2 } else { 1 };
    loop {
        let resp = state
            .vlm
            .call(story_in, &turn.annotated_image_b64, system_prompt)
            .await
            .map_err(|e| e.kind())?;
        if !resp.vlm_text.is_empty() {
            return Ok(resp);
        }
        attempts -= 1;
        if attempts == 0 {
            return Err("vlm_empty");
        }
    }
}

/// §9 (tool-set consistency): the allowlist is authoritative; the system
/// prompt is derived from it at call time rather than maintained
/// independently.
fn build_system_prompt(policy: &ToolPolicy) -> String {
    format!(
        "You control a desktop GUI. You may only call these tools: {}. \
         Reply with one or more calls formatted as name(arg1, arg2, ...).",
        policy.tools.join(", ")
    )
}

/// Finalizes timestamps, persists the turn, broadcasts it, and — on a
/// clean turn — leaves pause state untouched (callers of `fail_turn`
/// pause explicitly; a successful turn never does).
async fn persist_turn(state: &AppState, mut turn: Turn) {
    turn.ts_end = Some(Utc::now());
    turn.latency_ms.total_ms = (turn.ts_end.unwrap() - turn.ts_start)
        .num_milliseconds()
        .max(0) as u64;

    match state.store.append(&turn) {
        Ok(event) => {
            state.sse.broadcast(event);
            if let Err(e) = state.store.save_state(&state.run_state.snapshot()) {
                tracing::error!(seq = turn.seq, error = %e, "failed to save run state snapshot");
            }
        }
        Err(e) => {
            tracing::error!(seq = turn.seq, error = %e, "persist_failure");
            state.run_state.set_last_error(Some("persist_failure".into()));
            state.run_state.set_paused(true);
        }
    }
}

/// Records `kind` as the turn's sole error, pauses the run (§7: "any
/// error that would require feeding a raw screenshot... or otherwise
/// prevents the turn from completing is fatal-to-the-turn"), persists,
/// and broadcasts.
async fn fail_turn(state: &AppState, mut turn: Turn, kind: &str) {
    turn.errors.push(kind.to_string());
    state.run_state.set_last_error(Some(kind.to_string()));
    state.run_state.set_paused(true);
    persist_turn(state, turn).await;
}
