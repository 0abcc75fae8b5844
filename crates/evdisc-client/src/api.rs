//! HTTP client for the discovery server's `/api/v1` surface.

use std::time::Duration;

use evdisc_core::{Coordinates, DiscoveryParams, NearbyEvent, RankedPage};
use evdisc_geo::{GeoError, Geocoder, Locality, PlaceDetails, PlaceSuggestion, Prediction};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClientError;
use crate::feed::PageFetcher;

/// Fallback when a 429 carries neither a header nor a body hint.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AutocompleteReply {
    pub predictions: Vec<Prediction>,
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub catalog_events: usize,
    pub places_configured: bool,
}

#[derive(Debug, Deserialize)]
struct DetailsReply {
    place: PlaceDetails,
}

#[derive(Debug, Deserialize)]
struct SuggestionsReply {
    suggestions: Vec<PlaceSuggestion>,
}

#[derive(Debug, Deserialize)]
struct NearbyReply {
    data: Vec<NearbyEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AutocompleteBody<'a> {
    input: &'a str,
    session_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailsBody<'a> {
    place_id: &'a str,
    session_token: String,
}

#[derive(Serialize, Default)]
struct GeocodeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lng: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    autocomplete: bool,
}

/// A new billing session token for an autocomplete → details sequence.
#[must_use]
pub fn new_session_token() -> Uuid {
    Uuid::new_v4()
}

#[derive(Debug, Clone)]
pub struct DiscoveryApi {
    client: Client,
    base_url: Url,
}

impl DiscoveryApi {
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidInput`] for a malformed base URL, or
    /// [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("evdisc-client/0.1")
            .build()?;
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| ClientError::InvalidInput(format!("invalid server URL '{base_url}': {e}")))?;
        Ok(Self { client, base_url })
    }

    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or a non-2xx response.
    pub async fn events(&self, params: &DiscoveryParams) -> Result<RankedPage, ClientError> {
        let mut url = self.url("api/v1/events")?;
        url.set_query(Some(&params.to_query()));
        self.send(self.client.get(url), "events page")
            .await?
            .ok_or_else(|| not_found("events endpoint"))
    }

    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or a non-2xx response.
    pub async fn nearby(
        &self,
        origin: Coordinates,
        radius_km: Option<f64>,
    ) -> Result<Vec<NearbyEvent>, ClientError> {
        let mut url = self.url("api/v1/events/nearby")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("lat", &origin.lat.to_string());
            query.append_pair("lng", &origin.lng.to_string());
            if let Some(radius) = radius_km {
                query.append_pair("radiusKm", &radius.to_string());
            }
        }
        let reply: NearbyReply = self
            .send(self.client.get(url), "nearby events")
            .await?
            .ok_or_else(|| not_found("nearby endpoint"))?;
        Ok(reply.data)
    }

    /// # Errors
    ///
    /// Returns [`ClientError::RateLimited`], [`ClientError::Unavailable`] or
    /// [`ClientError::InvalidInput`] as reported by the server.
    pub async fn autocomplete(
        &self,
        input: &str,
        session_token: &Uuid,
    ) -> Result<AutocompleteReply, ClientError> {
        let body = AutocompleteBody {
            input,
            session_token: session_token.to_string(),
        };
        let request = self.client.post(self.url("api/v1/places/autocomplete")?).json(&body);
        self.send(request, "autocomplete")
            .await?
            .ok_or_else(|| not_found("autocomplete endpoint"))
    }

    /// Resolves a selected place, closing the billing session. `Ok(None)`
    /// when the place does not exist.
    ///
    /// # Errors
    ///
    /// As [`DiscoveryApi::autocomplete`].
    pub async fn place_details(
        &self,
        place_id: &str,
        session_token: &Uuid,
    ) -> Result<Option<PlaceDetails>, ClientError> {
        let body = DetailsBody {
            place_id,
            session_token: session_token.to_string(),
        };
        let request = self.client.post(self.url("api/v1/places/details")?).json(&body);
        let reply: Option<DetailsReply> = self.send(request, "place details").await?;
        Ok(reply.map(|r| r.place))
    }

    /// # Errors
    ///
    /// As [`DiscoveryApi::autocomplete`].
    pub async fn geocode(&self, address: &str) -> Result<Option<Locality>, ClientError> {
        self.geocode_request(&GeocodeBody {
            address: Some(address),
            ..GeocodeBody::default()
        })
        .await
    }

    /// # Errors
    ///
    /// As [`DiscoveryApi::autocomplete`].
    pub async fn reverse_geocode(&self, coords: Coordinates) -> Result<Option<Locality>, ClientError> {
        self.geocode_request(&GeocodeBody {
            lat: Some(coords.lat),
            lng: Some(coords.lng),
            ..GeocodeBody::default()
        })
        .await
    }

    /// Up to five address suggestions.
    ///
    /// # Errors
    ///
    /// As [`DiscoveryApi::autocomplete`].
    pub async fn geocode_suggestions(&self, address: &str) -> Result<Vec<PlaceSuggestion>, ClientError> {
        let body = GeocodeBody {
            address: Some(address),
            autocomplete: true,
            ..GeocodeBody::default()
        };
        let request = self.client.post(self.url("api/v1/geocode")?).json(&body);
        let reply: Option<SuggestionsReply> = self.send(request, "geocode suggestions").await?;
        Ok(reply.map(|r| r.suggestions).unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns [`ClientError`] when the server cannot be reached.
    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        self.send(self.client.get(self.url("api/v1/health")?), "health")
            .await?
            .ok_or_else(|| not_found("health endpoint"))
    }

    async fn geocode_request(&self, body: &GeocodeBody<'_>) -> Result<Option<Locality>, ClientError> {
        let request = self.client.post(self.url("api/v1/geocode")?).json(body);
        self.send(request, "geocode").await
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidInput(format!("invalid path '{path}': {e}")))
    }

    /// Sends the request; 404 becomes `Ok(None)`, other non-2xx become errors.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<Option<T>, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| ClientError::Decode {
                context: context.to_owned(),
                source,
            })
    }
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    let header_retry = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = if body.error.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    } else {
        body.error
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited {
            retry_after_secs: header_retry
                .or(body.retry_after)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        StatusCode::SERVICE_UNAVAILABLE => ClientError::Unavailable(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ClientError::InvalidInput(message)
        }
        other => ClientError::Api {
            status: other.as_u16(),
            message,
        },
    }
}

fn not_found(what: &str) -> ClientError {
    ClientError::Api {
        status: StatusCode::NOT_FOUND.as_u16(),
        message: format!("{what} not found"),
    }
}

impl PageFetcher for DiscoveryApi {
    async fn fetch_page(&self, params: &DiscoveryParams) -> Result<RankedPage, ClientError> {
        self.events(params).await
    }
}

impl Geocoder for DiscoveryApi {
    async fn forward(&self, address: &str) -> Result<Option<Locality>, GeoError> {
        Ok(self.geocode(address).await?)
    }

    async fn reverse(&self, coords: Coordinates) -> Result<Option<Locality>, GeoError> {
        Ok(self.reverse_geocode(coords).await?)
    }
}
