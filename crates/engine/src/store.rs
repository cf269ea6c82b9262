//! `TurnStore` — append-only on-disk turn log plus a latest-state snapshot
//! and an in-memory ring for SSE replay (§4.4).
//!
//! Single-writer: only the engine loop calls `append`. HTTP handlers only
//! read snapshots (`replay`, `latest_seq`). `turns.jsonl` is fsync'd after
//! every append so "visible on SSE only after on-disk append returns" (§5)
//! holds by construction — `append` does the fsync before the caller
//! broadcasts.

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use parking_lot::Mutex;

use va_domain::{Error, RunState, Turn, TurnEvent};

const RING_CAPACITY: usize = 256;

pub struct TurnStore {
    run_dir: PathBuf,
    ring: Mutex<VecDeque<TurnEvent>>,
}

impl TurnStore {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
            ring: Mutex::new(VecDeque::with_capacity(RING_CAPACITY)),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn turns_path(&self) -> PathBuf {
        self.run_dir.join("turns.jsonl")
    }

    fn state_path(&self) -> PathBuf {
        self.run_dir.join("state.json")
    }

    fn image_path(&self, seq: u64) -> PathBuf {
        self.run_dir.join(format!("turn_{seq:04}.png"))
    }

    /// Persist `turn` (§3 invariant: only called for turns that pass
    /// `Turn::persistable()`), decode+write its annotated image (when
    /// non-empty), and push the resulting event into the replay ring.
    /// Returns the event so the caller can broadcast it — append-then-
    /// broadcast, never the reverse.
    pub fn append(&self, turn: &Turn) -> Result<TurnEvent, Error> {
        debug_assert!(turn.persistable(), "attempted to persist a non-persistable turn");

        let image_ref = if !turn.annotated_image_b64.is_empty() {
            let path = self.image_path(turn.seq);
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&turn.annotated_image_b64)
                .map_err(|e| Error::PersistFailure(format!("decoding annotated image: {e}")))?;
            std::fs::write(&path, bytes)?;
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string()
        } else {
            String::new()
        };

        let event = turn.to_event(&image_ref);
        let line = serde_json::to_string(&event).map_err(Error::Json)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.turns_path())?;
        writeln!(file, "{line}")?;
        file.sync_all()?;

        let mut ring = self.ring.lock();
        if ring.len() == RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(event.clone());

        Ok(event)
    }

    /// Write-temp + rename, per §4.3/§4.7's atomicity requirement.
    pub fn save_state(&self, state: &RunState) -> Result<(), Error> {
        atomic_write_json(&self.state_path(), state)
    }

    /// Last `n` events from the in-memory ring, in seq order (§8 S6).
    pub fn replay(&self, n: usize) -> Vec<TurnEvent> {
        let ring = self.ring.lock();
        let skip = ring.len().saturating_sub(n);
        ring.iter().skip(skip).cloned().collect()
    }
}

/// Write `value` to a `.tmp` sibling of `path` and rename it into place —
/// the write-temp-then-rename idiom used for both `state.json` and
/// `allowed_tools.json` (§4.3, §4.4, §4.7).
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    let tmp_path = path.with_extension("tmp");
    let bytes = serde_json::to_vec_pretty(value).map_err(Error::Json)?;
    std::fs::write(&tmp_path, &bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
