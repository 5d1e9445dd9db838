use std::time::Duration;

/// Shared error type used across all switchboard crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("provider {provider} rate limited")]
    RateLimited {
        provider: String,
        /// Provider-supplied retry-after, when the response carried one.
        retry_after: Option<Duration>,
    },

    #[error("quota exceeded: {reason}")]
    QuotaExceeded { reason: String },

    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the orchestrator may retry after this error.
    ///
    /// Quota denials and unsupported-model errors are configuration or
    /// policy failures; retrying cannot fix them.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::QuotaExceeded { .. } | Error::UnsupportedModel(_) | Error::Config(_)
        )
    }

    /// The provider-supplied retry-after delay, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
