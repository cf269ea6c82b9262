//! VLMAdapter — subprocess wrapper around the vision-language model
//! client (§4.6). POSTs an OpenAI-compatible chat/completions request
//! with the annotated image and returns the model's text reply.
//!
//! The visual proxy guarantee lives one layer up (EngineLoop never
//! constructs a `VlmRequest` from a raw image) — this adapter simply
//! forwards whatever `image_b64` it is given.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use va_domain::config::VlmConfig;
use va_domain::{Error, TurnUsage};

use crate::subprocess::run_json_subprocess;

#[derive(Debug, Clone, Serialize)]
pub struct VlmRequest {
    pub story_text: String,
    pub image_b64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VlmUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub model: String,
}

impl From<VlmUsage> for TurnUsage {
    fn from(u: VlmUsage) -> Self {
        TurnUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            model: u.model,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VlmResponse {
    #[serde(default)]
    pub vlm_text: String,
    #[serde(default)]
    pub usage: VlmUsage,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
}

pub struct VlmAdapter {
    config: VlmConfig,
}

impl VlmAdapter {
    pub fn new(config: VlmConfig) -> Self {
        Self { config }
    }

    /// Invoke the VLM subprocess, retrying once on a transient
    /// child-process failure (crash or timeout) before bubbling the error
    /// (§7: "Transient child-process errors -> one bounded retry at the
    /// adapter level, then bubble"). `system_prompt` is derived by the
    /// caller from the current `ToolPolicy` (§9: the allowlist is
    /// authoritative over any independently-maintained prompt).
    pub async fn call(
        &self,
        story_text: &str,
        image_b64: &str,
        system_prompt: &str,
    ) -> Result<VlmResponse, Error> {
        let req = VlmRequest {
            story_text: story_text.to_string(),
            image_b64: image_b64.to_string(),
            model: self.config.model.clone(),
            system_prompt: system_prompt.to_string(),
        };
        let input = serde_json::to_value(&req).map_err(Error::Json)?;

        let mut attempts_left = 1;
        let reply = loop {
            match self.spawn_once(&input).await {
                Ok(reply) => break reply,
                Err(e) if is_transient(&e) && attempts_left > 0 => {
                    tracing::warn!(error = %e, "vlm call failed, retrying once");
                    attempts_left -= 1;
                }
                Err(e) => return Err(e),
            }
        };

        let parsed: VlmResponse = serde_json::from_str(&reply.stdout)
            .map_err(|e| Error::VlmCrash(format!("malformed vlm output: {e}")))?;

        if let Some(msg) = parsed.error {
            return Err(Error::VlmCrash(msg));
        }

        Ok(parsed)
    }

    async fn spawn_once(
        &self,
        input: &serde_json::Value,
    ) -> Result<crate::subprocess::SubprocessReply, Error> {
        run_json_subprocess(
            &self.config.command,
            input,
            Duration::from_secs(self.config.timeout_sec),
            Duration::from_secs(self.config.kill_grace_sec),
            Error::VlmCrash,
            Error::VlmTimeout,
        )
        .await
    }
}

/// Transient, retry-eligible child-process failures (§7): the subprocess
/// itself crashed or ran past its timeout. An `{"error": ...}` payload or
/// malformed JSON that the child returned cleanly is not transient and is
/// not retried here.
fn is_transient(err: &Error) -> bool {
    matches!(err, Error::VlmCrash(_) | Error::VlmTimeout(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config(script: &str) -> VlmConfig {
        VlmConfig {
            command: vec!["sh".into(), "-c".into(), script.into()],
            timeout_sec: 5,
            kill_grace_sec: 1,
            model: None,
        }
    }

    #[tokio::test]
    async fn parses_well_formed_response() {
        let script = r#"printf '{"vlm_text":"click(10,20)","usage":{"prompt_tokens":5,"completion_tokens":3,"model":"stub"},"latency_ms":12}'"#;
        let adapter = VlmAdapter::new(stub_config(script));
        let resp = adapter.call("go", "aW1n", "tools: click").await.unwrap();
        assert_eq!(resp.vlm_text, "click(10,20)");
        assert_eq!(resp.usage.model, "stub");
    }

    #[tokio::test]
    async fn empty_reply_is_not_an_error_here() {
        // vlm_empty retry policy lives in the engine loop, not the
        // adapter — an empty string is a valid (if unhelpful) reply.
        let script = r#"printf '{"vlm_text":""}'"#;
        let adapter = VlmAdapter::new(stub_config(script));
        let resp = adapter.call("go", "aW1n", "").await.unwrap();
        assert_eq!(resp.vlm_text, "");
    }

    #[tokio::test]
    async fn retries_once_on_transient_crash_then_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let counter_file = dir.path().join("attempts");
        let script = format!(
            r#"echo x >> {count} ; if [ $(wc -l < {count}) -lt 2 ]; then exit 1; fi; printf '{{"vlm_text":"click(1,2)"}}'"#,
            count = counter_file.display()
        );
        let adapter = VlmAdapter::new(stub_config(&script));
        let resp = adapter.call("go", "aW1n", "").await.unwrap();
        assert_eq!(resp.vlm_text, "click(1,2)");
        let attempts = std::fs::read_to_string(&counter_file).unwrap();
        assert_eq!(attempts.lines().count(), 2, "expected exactly one retry");
    }

    #[tokio::test]
    async fn does_not_retry_an_explicit_error_payload() {
        let dir = tempfile::tempdir().unwrap();
        let counter_file = dir.path().join("attempts");
        let script = format!(
            r#"echo x >> {count} ; printf '{{"error":"no api key"}}'"#,
            count = counter_file.display()
        );
        let adapter = VlmAdapter::new(stub_config(&script));
        let err = adapter.call("go", "aW1n", "").await.unwrap_err();
        assert_eq!(err.kind(), "vlm_crash");
        let attempts = std::fs::read_to_string(&counter_file).unwrap();
        assert_eq!(attempts.lines().count(), 1, "a clean error payload must not be retried");
    }
}
