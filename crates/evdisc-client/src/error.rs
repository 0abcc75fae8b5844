use evdisc_geo::GeoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited; retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// True for failures worth offering a retry for.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Http(_) | ClientError::RateLimited { .. } | ClientError::Unavailable(_)
        )
    }
}

impl From<ClientError> for GeoError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidInput(message) => GeoError::InvalidInput(message),
            ClientError::Http(e) => GeoError::Http(e),
            other => GeoError::Unavailable(other.to_string()),
        }
    }
}
