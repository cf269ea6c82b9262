use serde::{Deserialize, Serialize};

/// Ordered set of tool names an executor invocation is allowed to use.
/// Loaded at startup from a file, mutated atomically by HTTP, re-read by
/// each executor invocation (§4.7). Serializes as a bare JSON array on
/// the wire (`GET/POST /allowed_tools`) and on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ToolPolicy {
    pub tools: Vec<String>,
}

impl ToolPolicy {
    pub fn new(tools: Vec<String>) -> Self {
        Self { tools }
    }
}

impl From<Vec<String>> for ToolPolicy {
    fn from(tools: Vec<String>) -> Self {
        Self { tools }
    }
}
