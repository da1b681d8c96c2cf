use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed decision at index {index}: {reason}")]
    MalformedInput { index: usize, reason: String },

    #[error("expected a sequence of decisions, found {0}")]
    NotASequence(&'static str),

    #[error("invalid analysis config: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
