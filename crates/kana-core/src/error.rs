use thiserror::Error;

/// Top-level error type for Kana.
#[derive(Debug, Error)]
pub enum KanaError {
    /// The model backend reported a throttling code.
    #[error("model backend rate limited")]
    RateLimited,

    /// Any other model-backend failure.
    #[error("model backend error: {0}")]
    Upstream(String),

    /// Device/calendar/CLI/search integration failure. Handlers catch these
    /// locally and convert them into a speakable apology.
    #[error("integration error: {0}")]
    Integration(String),

    /// Invalid request from the client (missing field, empty message).
    #[error("validation error: {0}")]
    Validation(String),

    /// Memory/storage error.
    #[error("memory error: {0}")]
    Memory(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
