use serde::{Deserialize, Serialize};

/// One action as seen inside a `RenderJob`: a tool call plus the derived
/// screen coordinates, when the executor could compute them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderAction {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<(i64, i64)>,
}

/// The `(seq, raw_image, executed_actions)` packet handed to the browser
/// for annotation. Lives in the `RenderJobGate` until either consumed by a
/// matching `/annotated` POST or invalidated by a newer job or shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    pub seq: u64,
    pub raw_image_b64: String,
    pub actions: Vec<RenderAction>,
}

impl RenderJob {
    pub fn new(seq: u64, raw_image_b64: impl Into<String>, actions: Vec<RenderAction>) -> Self {
        Self {
            seq,
            raw_image_b64: raw_image_b64.into(),
            actions,
        }
    }
}

/// Created by `POST /annotated`; consumed exactly once by the engine
/// loop's `gate.await`, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedImage {
    pub seq: u64,
    pub image_b64: String,
}
