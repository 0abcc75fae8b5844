//! HTTP client for the places/geocoding provider.
//!
//! Speaks the Google Maps Platform web-service JSON dialect: every response
//! carries a `"status"` field, `"ZERO_RESULTS"`/`"NOT_FOUND"` mean "nothing
//! found", and any other non-`"OK"` status means the provider refused.

use std::time::Duration;

use evdisc_core::Coordinates;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::GeoError;
use crate::retry::RetryPolicy;
use crate::types::{
    AutocompleteResponse, DetailsResponse, GeocodeResponse, Locality, PlaceDetails,
    PlaceSuggestion, Prediction, RawPlace,
};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/";
const AUTOCOMPLETE_PATH: &str = "maps/api/place/autocomplete/json";
const DETAILS_PATH: &str = "maps/api/place/details/json";
const GEOCODE_PATH: &str = "maps/api/geocode/json";
const DETAILS_FIELDS: &str = "place_id,name,formatted_address,geometry/location,address_components";

/// Client for the places and geocoding endpoints.
///
/// Use [`PlacesClient::new`] for production or [`PlacesClient::with_base_url`]
/// to point at a mock server in tests.
pub struct PlacesClient {
    client: Client,
    api_key: String,
    base_url: Url,
    retry: RetryPolicy,
}

/// Outcome of the provider's `"status"` envelope check.
enum Envelope {
    Ok,
    Empty,
}

impl PlacesClient {
    /// Creates a client pointed at the production provider.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, GeoError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// `timeout_secs` bounds every provider call; exceeding it surfaces as a
    /// provider failure, never a hang.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`GeoError::InvalidInput`] if `base_url` is not a URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GeoError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent("evdisc/0.1 (event-discovery)")
            .build()?;

        // Exactly one trailing slash so `Url::join` appends instead of
        // replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| GeoError::InvalidInput(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            retry: RetryPolicy::default(),
        })
    }

    /// Overrides the retry policy used by the geocode calls.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.retry = RetryPolicy {
            max_retries,
            backoff_base: Duration::from_millis(backoff_base_ms),
        };
        self
    }

    /// Fetches autocomplete predictions for `input` within a billing session.
    ///
    /// Single attempt, no retry.
    ///
    /// # Errors
    ///
    /// - [`GeoError::Unavailable`] if the provider refuses the request.
    /// - [`GeoError::Http`] on network failure, timeout, or non-2xx status.
    /// - [`GeoError::Deserialize`] if the response shape is unexpected.
    pub async fn autocomplete(
        &self,
        input: &str,
        session_token: &Uuid,
    ) -> Result<Vec<Prediction>, GeoError> {
        let token = session_token.to_string();
        let url = self.build_url(
            AUTOCOMPLETE_PATH,
            &[("input", input), ("sessiontoken", &token)],
        )?;
        let context = "place autocomplete";
        let Some(response) = self
            .fetch_envelope::<AutocompleteResponse>(&url, context)
            .await?
        else {
            return Ok(Vec::new());
        };
        Ok(response
            .predictions
            .into_iter()
            .map(Prediction::from)
            .collect())
    }

    /// Resolves one place by id, closing the billing session `session_token`.
    ///
    /// Single attempt, no retry, never cached by this crate.
    ///
    /// # Errors
    ///
    /// Same as [`PlacesClient::autocomplete`].
    pub async fn place_details(
        &self,
        place_id: &str,
        session_token: &Uuid,
    ) -> Result<Option<PlaceDetails>, GeoError> {
        let token = session_token.to_string();
        let url = self.build_url(
            DETAILS_PATH,
            &[
                ("place_id", place_id),
                ("sessiontoken", &token),
                ("fields", DETAILS_FIELDS),
            ],
        )?;
        let context = format!("place details(place_id={place_id})");
        let response = self
            .fetch_envelope::<DetailsResponse>(&url, &context)
            .await?;
        Ok(response
            .and_then(|r| r.result)
            .map(RawPlace::into_details))
    }

    /// Forward-geocodes a free-text address into city/country.
    ///
    /// # Errors
    ///
    /// [`GeoError::InvalidInput`] for a blank address; otherwise as
    /// [`PlacesClient::autocomplete`], after retrying transient failures.
    pub async fn geocode_address(&self, address: &str) -> Result<Option<Locality>, GeoError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeoError::InvalidInput("address must not be empty".to_owned()));
        }
        let url = self.build_url(GEOCODE_PATH, &[("address", address)])?;
        let results = self.geocode(&url, &format!("geocode(address={address})")).await?;
        Ok(results.into_iter().next().map(|place| place.locality()))
    }

    /// Reverse-geocodes a coordinate pair into city/country.
    ///
    /// # Errors
    ///
    /// [`GeoError::InvalidInput`] for out-of-range coordinates; otherwise as
    /// [`PlacesClient::geocode_address`].
    pub async fn reverse_geocode(&self, coords: Coordinates) -> Result<Option<Locality>, GeoError> {
        if !coords.is_valid() {
            return Err(GeoError::InvalidInput(format!(
                "coordinates out of range: {},{}",
                coords.lat, coords.lng
            )));
        }
        let latlng = format!("{},{}", coords.lat, coords.lng);
        let url = self.build_url(GEOCODE_PATH, &[("latlng", &latlng)])?;
        let results = self.geocode(&url, &format!("reverse geocode({latlng})")).await?;
        Ok(results.into_iter().next().map(|place| place.locality()))
    }

    /// Returns up to `limit` address suggestions for a partial address.
    ///
    /// # Errors
    ///
    /// As [`PlacesClient::geocode_address`].
    pub async fn geocode_suggestions(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<PlaceSuggestion>, GeoError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeoError::InvalidInput("address must not be empty".to_owned()));
        }
        let url = self.build_url(GEOCODE_PATH, &[("address", address)])?;
        let results = self
            .geocode(&url, &format!("geocode suggestions(address={address})"))
            .await?;
        Ok(results
            .into_iter()
            .take(limit)
            .map(RawPlace::into_suggestion)
            .collect())
    }

    async fn geocode(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<Vec<RawPlace>, GeoError> {
        self.retry
            .run(context, || async move {
                let response = self.fetch_envelope::<GeocodeResponse>(url, context).await?;
                Ok(response.map(|r| r.results).unwrap_or_default())
            })
            .await
    }

    /// Builds the request URL with percent-encoded query parameters and the key.
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, GeoError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| GeoError::InvalidInput(format!("invalid provider path '{path}': {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("key", &self.api_key);
        }
        Ok(url)
    }

    /// Sends a GET, checks the status envelope, and deserializes the body.
    ///
    /// Returns `Ok(None)` for the provider's "nothing found" statuses.
    async fn fetch_envelope<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<Option<T>, GeoError> {
        let body: serde_json::Value = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match Self::check_status(&body)? {
            Envelope::Empty => Ok(None),
            Envelope::Ok => serde_json::from_value(body)
                .map(Some)
                .map_err(|source| GeoError::Deserialize {
                    context: context.to_owned(),
                    source,
                }),
        }
    }

    fn check_status(body: &serde_json::Value) -> Result<Envelope, GeoError> {
        let status = body
            .get("status")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("OK");
        match status {
            "OK" => Ok(Envelope::Ok),
            "ZERO_RESULTS" | "NOT_FOUND" => Ok(Envelope::Empty),
            other => {
                let message = body
                    .get("error_message")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("no error message");
                tracing::warn!(status = other, message, "places provider refused request");
                Err(GeoError::Unavailable(format!("{other}: {message}")))
            }
        }
    }
}
