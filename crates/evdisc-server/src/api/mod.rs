mod events;
mod places;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use evdisc_core::AppConfig;
use evdisc_discovery::{DiscoveryError, StaticCatalog};
use evdisc_geo::{GeoError, PlaceSearch};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<StaticCatalog>,
    /// `None` when no provider key is configured.
    pub places: Option<Arc<PlaceSearch>>,
    pub default_page_size: usize,
}

/// Per-identity quotas, one per route group.
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub discovery: RateLimitState,
    pub autocomplete: RateLimitState,
    pub details: RateLimitState,
    pub geocode: RateLimitState,
}

impl RateLimits {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let limit = |per_minute| {
            RateLimitState::per_minute(per_minute).with_proxy_headers(config.trust_proxy_headers)
        };
        Self {
            discovery: limit(config.discovery_rate_limit_per_min),
            autocomplete: limit(config.autocomplete_rate_limit_per_min),
            details: limit(config.details_rate_limit_per_min),
            geocode: limit(config.geocode_rate_limit_per_min),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    pub meta: ResponseMeta,
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            retry_after: None,
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub fn rate_limited(request_id: impl Into<String>, retry_after_secs: u64) -> Self {
        Self {
            retry_after: Some(retry_after_secs),
            ..Self::new(request_id, "rate_limited", "too many requests")
        }
    }

    fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = self.retry_after;
        let mut response = (status, Json(self)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub(super) fn map_discovery_error(request_id: String, error: &DiscoveryError) -> ApiError {
    match error {
        DiscoveryError::InvalidPage { .. } => {
            ApiError::new(request_id, "bad_request", error.to_string())
        }
        DiscoveryError::Catalog(e) => {
            tracing::error!(error = %e, "event catalog unavailable");
            ApiError::new(request_id, "service_unavailable", "event catalog unavailable")
        }
    }
}

pub(super) fn map_geo_error(request_id: String, error: &GeoError) -> ApiError {
    match error {
        GeoError::InvalidInput(message) => ApiError::new(request_id, "bad_request", message),
        other => {
            tracing::warn!(error = %other, "places provider call failed");
            ApiError::new(request_id, "service_unavailable", "places provider unavailable")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .expose_headers([header::RETRY_AFTER, HeaderName::from_static("x-request-id")])
}

fn limited(router: Router<AppState>, rate_limit: RateLimitState) -> Router<AppState> {
    router.layer(axum::middleware::from_fn_with_state(
        rate_limit,
        enforce_rate_limit,
    ))
}

pub fn build_app(state: AppState, limits: RateLimits) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    let discovery = limited(
        Router::new()
            .route("/api/v1/events", get(events::list_events))
            .route("/api/v1/events/nearby", get(events::nearby_events)),
        limits.discovery,
    );
    let autocomplete = limited(
        Router::new().route("/api/v1/places/autocomplete", post(places::autocomplete)),
        limits.autocomplete,
    );
    let details = limited(
        Router::new().route("/api/v1/places/details", post(places::details)),
        limits.details,
    );
    let geocode = limited(
        Router::new().route("/api/v1/geocode", post(places::geocode)),
        limits.geocode,
    );

    Router::new()
        .merge(public_routes)
        .merge(discovery)
        .merge(autocomplete)
        .merge(details)
        .merge(geocode)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(build_cors()),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthData {
    status: &'static str,
    catalog_events: usize,
    places_configured: bool,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthData {
        status: "ok",
        catalog_events: state.catalog.len(),
        places_configured: state.places.is_some(),
    })
}

#[cfg(test)]
mod tests;
