use thiserror::Error;

/// Errors returned by the places/geocoding layer.
///
/// "Nothing found" is never an error: lookups return `Ok(None)` or an empty
/// `Vec` for that. Every variant here except [`GeoError::InvalidInput`] means
/// the provider could not be asked.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Network, TLS, timeout, or non-2xx failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered but refused the request (quota, denied key, ...).
    #[error("places provider unavailable: {0}")]
    Unavailable(String),

    /// The response body did not match the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Rejected before any network call was attempted.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GeoError {
    /// True for the "could not ask" family, as opposed to caller mistakes.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, GeoError::InvalidInput(_))
    }

    /// Worth another attempt after a back-off: timeouts, connection failures
    /// and HTTP 5xx. Provider refusals, malformed bodies and invalid input
    /// are permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            GeoError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            GeoError::Unavailable(_) | GeoError::Deserialize { .. } | GeoError::InvalidInput(_) => {
                false
            }
        }
    }
}
