use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A parsed action invocation: a tool name plus ordered positional
/// arguments. Produced by the executor's parse of `story_in` or by the
/// engine's parse of `vlm_text`. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Offset range `[start, end)` into the originating text, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_span: Option<(usize, usize)>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
            source_span: None,
        }
    }
}

/// Per-turn latency breakdown, in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnLatency {
    #[serde(default)]
    pub exec_ms: u64,
    #[serde(default)]
    pub annotate_ms: u64,
    #[serde(default)]
    pub vlm_ms: u64,
    #[serde(default)]
    pub total_ms: u64,
}

/// Token usage reported by the VLM adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub model: String,
}

/// One iteration of execute -> annotate -> plan. Created when the engine
/// loop begins a step, mutated only by the engine loop, frozen and
/// persisted at the end of the step, never updated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub seq: u64,
    pub story_in: String,
    #[serde(default)]
    pub executed: Vec<ToolCall>,
    /// Populated only transiently while building the render job; never
    /// persisted to `turns.jsonl` (see `annotated_image_b64`'s invariant).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_image_b64: String,
    #[serde(default)]
    pub annotated_image_b64: String,
    #[serde(default)]
    pub vlm_text: String,
    #[serde(default)]
    pub tool_calls_out: Vec<ToolCall>,
    #[serde(default)]
    pub latency_ms: TurnLatency,
    #[serde(default)]
    pub usage: TurnUsage,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub ts_start: DateTime<Utc>,
    #[serde(default)]
    pub ts_end: Option<DateTime<Utc>>,
}

impl Turn {
    pub fn new(seq: u64, story_in: impl Into<String>) -> Self {
        Self {
            seq,
            story_in: story_in.into(),
            executed: Vec::new(),
            raw_image_b64: String::new(),
            annotated_image_b64: String::new(),
            vlm_text: String::new(),
            tool_calls_out: Vec::new(),
            latency_ms: TurnLatency::default(),
            usage: TurnUsage::default(),
            errors: Vec::new(),
            warnings: Vec::new(),
            ts_start: Utc::now(),
            ts_end: None,
        }
    }

    /// A turn is a recorded error when it carries no annotated image and
    /// at least one error tag (§3 invariant: a Turn is persisted only if
    /// `annotated_image_b64` is non-empty or it is an error record).
    pub fn is_error(&self) -> bool {
        self.annotated_image_b64.is_empty() && !self.errors.is_empty()
    }

    /// Whether this turn is eligible for persistence per §3's invariant.
    pub fn persistable(&self) -> bool {
        !self.annotated_image_b64.is_empty() || self.is_error()
    }

    /// The event payload broadcast over SSE: identical to the persisted
    /// record except the raw image is never included and the annotated
    /// image is referenced by path, not inlined (keeps SSE frames small).
    pub fn to_event(&self, annotated_image_ref: &str) -> TurnEvent {
        TurnEvent {
            seq: self.seq,
            ts_start: self.ts_start,
            ts_end: self.ts_end,
            story_in: self.story_in.clone(),
            executed: self.executed.clone(),
            tool_calls_out: self.tool_calls_out.clone(),
            vlm_text: self.vlm_text.clone(),
            usage: self.usage.clone(),
            latency_ms: self.latency_ms.clone(),
            errors: self.errors.clone(),
            warnings: self.warnings.clone(),
            annotated_image_ref: annotated_image_ref.to_string(),
        }
    }
}

/// The SSE / `/events` wire shape (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEvent {
    pub seq: u64,
    pub ts_start: DateTime<Utc>,
    pub ts_end: Option<DateTime<Utc>>,
    pub story_in: String,
    pub executed: Vec<ToolCall>,
    pub tool_calls_out: Vec<ToolCall>,
    pub vlm_text: String,
    pub usage: TurnUsage,
    pub latency_ms: TurnLatency,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub annotated_image_ref: String,
}
