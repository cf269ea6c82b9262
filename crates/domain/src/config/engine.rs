use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine loop timing + hygiene rules (§4.2)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long `RenderJobGate::await` blocks before `annotation_timeout`.
    #[serde(default = "d_annotation_timeout_sec")]
    pub annotation_timeout_sec: u64,
    /// Retry the VLM call once if it returns an empty reply.
    #[serde(default = "d_true")]
    pub retry_vlm_once: bool,
    /// Minimum well-formed tool calls a VLM reply must parse to avoid
    /// `tool_underflow` (recorded as a warning, not fatal — see
    /// SPEC_FULL.md §9).
    #[serde(default = "d_min_tool_calls")]
    pub min_tool_calls: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            annotation_timeout_sec: d_annotation_timeout_sec(),
            retry_vlm_once: true,
            min_tool_calls: d_min_tool_calls(),
        }
    }
}

fn d_annotation_timeout_sec() -> u64 {
    30
}
fn d_min_tool_calls() -> usize {
    2
}
fn d_true() -> bool {
    true
}
