/// Shared error type for the engine, the adapters, and the HTTP surface.
///
/// Variants map 1:1 onto the error taxonomy: `kind()` returns the wire tag
/// used in `Turn.errors[]` and `/health.last_error`, so the Rust type and
/// the wire vocabulary cannot drift apart.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("executor timed out after {0}s")]
    ExecutorTimeout(u64),

    #[error("executor crashed: {0}")]
    ExecutorCrash(String),

    #[error("executor returned malformed output: {0}")]
    ExecutorMalformedOutput(String),

    #[error("annotation timed out after {0}s")]
    AnnotationTimeout(u64),

    #[error("annotation payload invalid: {0}")]
    AnnotationBadPayload(String),

    #[error("vlm timed out after {0}s")]
    VlmTimeout(u64),

    #[error("vlm crashed: {0}")]
    VlmCrash(String),

    #[error("vlm returned an empty reply")]
    VlmEmpty,

    #[error("persisting turn failed: {0}")]
    PersistFailure(String),

    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wire tag for this error, used verbatim in `Turn.errors[]` and
    /// `/health.last_error`.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::ExecutorTimeout(_) => "executor_timeout",
            Error::ExecutorCrash(_) => "executor_crash",
            Error::ExecutorMalformedOutput(_) => "executor_malformed_output",
            Error::AnnotationTimeout(_) => "annotation_timeout",
            Error::AnnotationBadPayload(_) => "annotation_bad_payload",
            Error::VlmTimeout(_) => "vlm_timeout",
            Error::VlmCrash(_) => "vlm_crash",
            Error::VlmEmpty => "vlm_empty",
            Error::PersistFailure(_) => "persist_failure",
            Error::ConfigInvalid(_) => "config_invalid",
            Error::Other(_) => "other",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_taxonomy_tags() {
        assert_eq!(Error::ExecutorTimeout(20).kind(), "executor_timeout");
        assert_eq!(Error::VlmEmpty.kind(), "vlm_empty");
        assert_eq!(
            Error::AnnotationBadPayload("empty image".into()).kind(),
            "annotation_bad_payload"
        );
    }
}
