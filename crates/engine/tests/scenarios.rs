//! End-to-end scenarios (spec §8 S1–S6), driven over real HTTP against a
//! bound server with stub executor/VLM subprocesses — the same
//! `sh -c 'printf ...'` stub idiom the adapter crate uses for its own
//! unit tests, composed here into full engine-loop runs.

use std::sync::Arc;
use std::time::Duration;

use va_domain::config::{Config, EngineConfig, ExecutorConfig, PathsConfig, ServerConfig, ToolPolicyConfig, VlmConfig};
use va_engine::state::AppState;
use va_engine::{api, bootstrap, engine_loop};

/// A 1x1 transparent PNG, base64-encoded — used as both the raw and
/// annotated image in every scenario that needs a non-empty payload.
const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNk+A8AAQUBAScY42YAAAAASUVORK5CYII=";

fn script(cmd: &str) -> Vec<String> {
    vec!["sh".into(), "-c".into(), cmd.into()]
}

fn test_config(tmp: &std::path::Path, executor_script: &str, vlm_script: &str) -> Config {
    Config {
        // The suite binds its own OS-assigned listener below and never
        // reads `config.server.port`; a non-zero placeholder keeps
        // `Config::validate()` happy (port 0 is flagged as an error).
        server: ServerConfig { port: 8780, host: "127.0.0.1".into() },
        executor: ExecutorConfig {
            command: script(executor_script),
            timeout_sec: 5,
            kill_grace_sec: 1,
        },
        vlm: VlmConfig {
            command: script(vlm_script),
            timeout_sec: 5,
            kill_grace_sec: 1,
            model: None,
        },
        engine: EngineConfig {
            annotation_timeout_sec: 2,
            retry_vlm_once: true,
            min_tool_calls: 2,
        },
        paths: PathsConfig {
            log_root: tmp.to_path_buf(),
            initial_story: "Begin.".into(),
        },
        tool_policy: ToolPolicyConfig {
            file: "allowed_tools.json".into(),
            default_tools: vec!["click".into(), "write".into()],
        },
    }
}

/// Boots `AppState`, serves the HTTP router on an OS-assigned loopback
/// port, and spawns the engine loop. Returns the base URL and the state
/// handle (for direct assertions against `run_state`/`store`).
async fn spawn(config: Config) -> (String, AppState) {
    let state = bootstrap::build_app_state(Arc::new(config)).expect("bootstrap");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = api::router(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::spawn(engine_loop::run_loop(state.clone()));

    (format!("http://{addr}"), state)
}

async fn wait_until<F, Fut>(mut check: F, timeout: Duration)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn s1_happy_path() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = format!(
        r#"printf '{{"executed":[{{"name":"click","args":["100","200"],"coords":[100,200]}}],"malformed":[],"raw_image_b64":"{PNG_B64}"}}'"#
    );
    let vlm = r#"printf '{"vlm_text":"click(10,20); click(30,40)","usage":{"prompt_tokens":5,"completion_tokens":3,"model":"stub"}}'"#;
    let config = test_config(tmp.path(), &executor, vlm);
    let (base, state) = spawn(config).await;
    let client = reqwest::Client::new();

    client.post(format!("{base}/unpause")).send().await.unwrap();

    wait_until(
        || {
            let client = &client;
            let base = &base;
            async move {
                let job: serde_json::Value = client
                    .get(format!("{base}/render_job"))
                    .send()
                    .await
                    .unwrap()
                    .json()
                    .await
                    .unwrap();
                job.get("seq").is_some()
            }
        },
        Duration::from_secs(3),
    )
    .await;

    let resp = client
        .post(format!("{base}/annotated"))
        .json(&serde_json::json!({"seq": 1, "image_b64": PNG_B64}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    wait_until(
        || async { state.run_state.last_seq() >= 1 },
        Duration::from_secs(3),
    )
    .await;

    let jsonl = std::fs::read_to_string(state.store.run_dir().join("turns.jsonl")).unwrap();
    assert_eq!(jsonl.lines().count(), 1);
    let event: serde_json::Value = serde_json::from_str(jsonl.lines().next().unwrap()).unwrap();
    assert_eq!(event["vlm_text"], "click(10,20); click(30,40)");
    assert!(state.store.run_dir().join("turn_0001.png").exists());
}

#[tokio::test]
async fn s2_annotation_timeout_pauses_and_skips_vlm() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = format!(
        r#"printf '{{"executed":[{{"name":"click","args":["1","2"]}}],"malformed":[],"raw_image_b64":"{PNG_B64}"}}'"#
    );
    // Would fail the test if ever invoked: no VLM call should happen.
    let vlm = r#"printf '{"error":"should not be called"}'"#;
    let mut config = test_config(tmp.path(), &executor, vlm);
    config.engine.annotation_timeout_sec = 1;
    let (base, state) = spawn(config).await;
    let client = reqwest::Client::new();
    client.post(format!("{base}/unpause")).send().await.unwrap();

    wait_until(
        || async { state.run_state.last_seq() >= 1 && state.run_state.is_paused() },
        Duration::from_secs(5),
    )
    .await;

    let health: serde_json::Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["paused"], true);

    let jsonl = std::fs::read_to_string(state.store.run_dir().join("turns.jsonl")).unwrap();
    let event: serde_json::Value = serde_json::from_str(jsonl.lines().next().unwrap()).unwrap();
    assert_eq!(event["errors"], serde_json::json!(["annotation_timeout"]));
}

#[tokio::test]
async fn s3_stale_annotation_is_rejected_then_real_seq_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = format!(
        r#"printf '{{"executed":[{{"name":"click","args":["1","2"]}}],"malformed":[],"raw_image_b64":"{PNG_B64}"}}'"#
    );
    let vlm = r#"printf '{"vlm_text":"click(1,1); click(2,2)"}'"#;
    let config = test_config(tmp.path(), &executor, vlm);
    let (base, state) = spawn(config).await;
    let client = reqwest::Client::new();
    client.post(format!("{base}/unpause")).send().await.unwrap();

    wait_until(
        || {
            let client = &client;
            let base = &base;
            async move {
                let job: serde_json::Value = client
                    .get(format!("{base}/render_job"))
                    .send()
                    .await
                    .unwrap()
                    .json()
                    .await
                    .unwrap();
                job.get("seq").is_some()
            }
        },
        Duration::from_secs(3),
    )
    .await;

    let stale = client
        .post(format!("{base}/annotated"))
        .json(&serde_json::json!({"seq": 2, "image_b64": PNG_B64}))
        .send()
        .await
        .unwrap();
    assert_eq!(stale.status(), 409);

    let real = client
        .post(format!("{base}/annotated"))
        .json(&serde_json::json!({"seq": 1, "image_b64": PNG_B64}))
        .send()
        .await
        .unwrap();
    assert_eq!(real.status(), 200);

    wait_until(
        || async { state.run_state.last_seq() >= 1 && !state.run_state.is_paused() },
        Duration::from_secs(3),
    )
    .await;
    let _ = state;
}

#[tokio::test]
async fn s4_vlm_empty_retry_then_fail() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = format!(
        r#"printf '{{"executed":[{{"name":"click","args":["1","2"]}}],"malformed":[],"raw_image_b64":"{PNG_B64}"}}'"#
    );
    let counter_file = tmp.path().join("vlm_calls");
    let vlm = format!(
        r#"echo x >> {count} ; printf '{{"vlm_text":""}}'"#,
        count = counter_file.display()
    );
    let config = test_config(tmp.path(), &executor, &vlm);
    let (base, state) = spawn(config).await;
    let client = reqwest::Client::new();
    client.post(format!("{base}/unpause")).send().await.unwrap();

    wait_until(
        || {
            let client = &client;
            let base = &base;
            async move {
                let job: serde_json::Value = client
                    .get(format!("{base}/render_job"))
                    .send()
                    .await
                    .unwrap()
                    .json()
                    .await
                    .unwrap();
                job.get("seq").is_some()
            }
        },
        Duration::from_secs(3),
    )
    .await;
    client
        .post(format!("{base}/annotated"))
        .json(&serde_json::json!({"seq": 1, "image_b64": PNG_B64}))
        .send()
        .await
        .unwrap();

    wait_until(
        || async { state.run_state.last_seq() >= 1 && state.run_state.is_paused() },
        Duration::from_secs(5),
    )
    .await;

    let jsonl = std::fs::read_to_string(state.store.run_dir().join("turns.jsonl")).unwrap();
    assert_eq!(jsonl.lines().count(), 1);
    let event: serde_json::Value = serde_json::from_str(jsonl.lines().next().unwrap()).unwrap();
    assert_eq!(event["errors"], serde_json::json!(["vlm_empty"]));

    let calls = std::fs::read_to_string(&counter_file).unwrap();
    assert_eq!(calls.lines().count(), 2, "expected exactly two VLM invocations");
}

#[tokio::test]
async fn s5_pause_lets_the_in_flight_turn_finish_before_stopping() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = format!(
        r#"printf '{{"executed":[{{"name":"click","args":["1","2"]}}],"malformed":[],"raw_image_b64":"{PNG_B64}"}}'"#
    );
    let vlm = r#"printf '{"vlm_text":"click(1,1); click(2,2)"}'"#;
    let config = test_config(tmp.path(), &executor, vlm);
    let (base, state) = spawn(config).await;
    let client = reqwest::Client::new();
    client.post(format!("{base}/unpause")).send().await.unwrap();

    wait_until(
        || {
            let client = &client;
            let base = &base;
            async move {
                let job: serde_json::Value = client
                    .get(format!("{base}/render_job"))
                    .send()
                    .await
                    .unwrap()
                    .json()
                    .await
                    .unwrap();
                job.get("seq").is_some()
            }
        },
        Duration::from_secs(3),
    )
    .await;

    // Pause while the turn is in flight (mid STEP_AWAIT_ANNOTATION/VLM,
    // not yet persisted) — then let it complete.
    client.post(format!("{base}/pause")).send().await.unwrap();
    client
        .post(format!("{base}/annotated"))
        .json(&serde_json::json!({"seq": 1, "image_b64": PNG_B64}))
        .send()
        .await
        .unwrap();

    wait_until(
        || async { state.run_state.last_seq() >= 1 },
        Duration::from_secs(3),
    )
    .await;

    let jsonl = std::fs::read_to_string(state.store.run_dir().join("turns.jsonl")).unwrap();
    assert_eq!(jsonl.lines().count(), 1, "the in-flight turn must complete and persist");
    assert!(state.run_state.is_paused(), "pause flag must still be set");

    // No further turn should start while paused.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(state.run_state.last_seq(), 1, "no further turn should start while paused");

    client.post(format!("{base}/unpause")).send().await.unwrap();
    wait_until(
        || async { state.run_state.last_seq() >= 2 },
        Duration::from_secs(5),
    )
    .await;
}

#[tokio::test]
async fn s6_sse_catch_up_replays_last_n_then_streams_live() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = format!(
        r#"printf '{{"executed":[{{"name":"click","args":["1","2"]}}],"malformed":[],"raw_image_b64":"{PNG_B64}"}}'"#
    );
    let vlm = r#"printf '{"vlm_text":"click(1,1); click(2,2)"}'"#;
    let config = test_config(tmp.path(), &executor, vlm);
    let (base, state) = spawn(config).await;
    let client = reqwest::Client::new();
    client.post(format!("{base}/unpause")).send().await.unwrap();

    for _ in 0..5 {
        wait_until(
            || {
                let client = &client;
                let base = &base;
                async move {
                    let job: serde_json::Value = client
                        .get(format!("{base}/render_job"))
                        .send()
                        .await
                        .unwrap()
                        .json()
                        .await
                        .unwrap();
                    job.get("seq").is_some()
                }
            },
            Duration::from_secs(3),
        )
        .await;
        let seq = state.gate.peek().unwrap().seq;
        client
            .post(format!("{base}/annotated"))
            .json(&serde_json::json!({"seq": seq, "image_b64": PNG_B64}))
            .send()
            .await
            .unwrap();
        wait_until(
            || async move { state.run_state.last_seq() >= seq },
            Duration::from_secs(3),
        )
        .await;
    }

    assert_eq!(state.run_state.last_seq(), 5);
    let replay = state.store.replay(3);
    assert_eq!(replay.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![3, 4, 5]);

    use futures_util::StreamExt;
    let resp = client
        .get(format!("{base}/events?replay=3"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let mut body = resp.bytes_stream();
    let first_chunk = tokio::time::timeout(Duration::from_secs(3), body.next())
        .await
        .expect("sse stream should yield promptly")
        .expect("stream should not end immediately")
        .unwrap();
    let text = String::from_utf8_lossy(&first_chunk);
    assert!(text.contains("\"seq\":3"), "expected replayed seq 3 in first SSE chunk, got: {text}");
}
