//! Session-scoped place search: cached autocomplete, uncached details.
//!
//! A billing session starts with the first autocomplete call carrying a
//! session token and closes with the one place-details call that carries the
//! same token. Details must therefore always reach the provider: serving
//! them from a cache would leave the session open and get the next details
//! call billed as a standalone request. Autocomplete results are cached per
//! `(input, token)` because repeated keystrokes within one session are free to
//! replay.

use std::time::Duration;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::{AutocompleteCache, CacheKey};
use crate::client::PlacesClient;
use crate::error::GeoError;
use crate::types::{PlaceDetails, Prediction};

/// Inputs shorter than this (in characters, after trimming) do not query
/// the provider.
pub const MIN_AUTOCOMPLETE_INPUT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteOutcome {
    pub predictions: Vec<Prediction>,
    pub cached: bool,
}

pub struct PlaceSearch {
    client: PlacesClient,
    cache: Mutex<AutocompleteCache>,
}

impl PlaceSearch {
    #[must_use]
    pub fn new(client: PlacesClient, cache_capacity: usize, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache: Mutex::new(AutocompleteCache::new(cache_capacity, cache_ttl)),
        }
    }

    #[must_use]
    pub fn client(&self) -> &PlacesClient {
        &self.client
    }

    /// Returns predictions for `input`, from cache when a live entry exists
    /// for this `(input, session_token)` pair.
    ///
    /// # Errors
    ///
    /// - [`GeoError::InvalidInput`] if `session_token` is not a `UUIDv4`.
    /// - Provider failures from [`PlacesClient::autocomplete`]; these are
    ///   never cached.
    pub async fn autocomplete(
        &self,
        input: &str,
        session_token: &str,
    ) -> Result<AutocompleteOutcome, GeoError> {
        let token = parse_session_token(session_token)?;
        let input = input.trim();
        if input.chars().count() < MIN_AUTOCOMPLETE_INPUT {
            return Ok(AutocompleteOutcome {
                predictions: Vec::new(),
                cached: false,
            });
        }

        let key = CacheKey::new(input, token);
        if let Some(predictions) = self.cache.lock().await.get(&key, now()) {
            tracing::debug!(input, "autocomplete cache hit");
            return Ok(AutocompleteOutcome {
                predictions,
                cached: true,
            });
        }

        let predictions = self.client.autocomplete(input, &token).await?;
        self.cache
            .lock()
            .await
            .insert(key, predictions.clone(), now());

        Ok(AutocompleteOutcome {
            predictions,
            cached: false,
        })
    }

    /// Resolves a place selected from autocomplete. Always calls the provider.
    ///
    /// # Errors
    ///
    /// - [`GeoError::InvalidInput`] for a blank place id or a token that is
    ///   not a `UUIDv4`.
    /// - Provider failures from [`PlacesClient::place_details`].
    pub async fn place_details(
        &self,
        place_id: &str,
        session_token: &str,
    ) -> Result<Option<PlaceDetails>, GeoError> {
        let token = parse_session_token(session_token)?;
        let place_id = place_id.trim();
        if place_id.is_empty() {
            return Err(GeoError::InvalidInput("placeId must not be empty".to_owned()));
        }
        self.client.place_details(place_id, &token).await
    }
}

fn parse_session_token(raw: &str) -> Result<Uuid, GeoError> {
    let token = Uuid::parse_str(raw.trim())
        .map_err(|_| GeoError::InvalidInput("sessionToken must be a UUIDv4".to_owned()))?;
    if token.get_version_num() != 4 {
        return Err(GeoError::InvalidInput(
            "sessionToken must be a UUIDv4".to_owned(),
        ));
    }
    Ok(token)
}

/// Reads the tokio clock so paused-time tests can expire entries.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}
