use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Process-wide singleton. `paused` is the only field mutated by HTTP
/// handlers; `last_seq` and `last_error` are mutated only by the engine
/// loop. Snapshotted for `GET /health` and persisted to `state.json`
/// (write-temp, rename) after every turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub paused: bool,
    pub run_dir: PathBuf,
    pub last_seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl RunState {
    pub fn new(run_dir: PathBuf) -> Self {
        Self {
            paused: false,
            run_dir,
            last_seq: 0,
            last_error: None,
        }
    }
}

/// `GET /health` response shape (§6). `ts` is explicitly volatile (§8
/// invariant 5 names it as excluded from the round-trip property).
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub paused: bool,
    pub run_dir: String,
    pub ts: chrono::DateTime<chrono::Utc>,
    pub last_seq: u64,
}
