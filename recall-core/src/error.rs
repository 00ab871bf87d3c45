use std::time::Duration;

/// Result type alias for memory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the memory service
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transient external error: {0}")]
    Transient(String),

    #[error("Permanent external error: {0}")]
    Permanent(String),

    #[error("Circuit breaker open for service '{service}' (retry after {retry_after:?})")]
    CircuitOpen {
        service: String,
        retry_after: Duration,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if this error is recoverable (can retry with backoff)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Transient(_) => true,
            Error::CircuitOpen { .. } => true,
            Error::NotFound(_)
            | Error::Validation(_)
            | Error::Permanent(_)
            | Error::Serialization(_) => false,
        }
    }

    /// Whether a queue message that failed with this error should be
    /// redelivered. Permanent failures (poison messages included) must be
    /// rejected so the queue does not loop on them.
    pub fn should_requeue(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::CircuitOpen { .. })
    }

    /// Shorthand for a transient error wrapping another error's message.
    pub fn transient(context: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Error::Transient(format!("{}: {source}", context.into()))
    }

    /// Shorthand for a permanent error wrapping another error's message.
    pub fn permanent(context: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Error::Permanent(format!("{}: {source}", context.into()))
    }
}
