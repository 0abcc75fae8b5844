use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use evdisc_core::Coordinates;
use evdisc_geo::{GeoError, Locality, PlaceDetails, PlaceSearch, PlaceSuggestion, Prediction};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_geo_error, ApiError, AppState};

/// Maximum suggestions returned by the `autocomplete: true` geocode form.
const GEOCODE_SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AutocompleteRequest {
    input: String,
    #[serde(default)]
    session_token: String,
}

#[derive(Debug, Serialize)]
pub(super) struct AutocompleteResponse {
    predictions: Vec<Prediction>,
    cached: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DetailsRequest {
    place_id: String,
    #[serde(default)]
    session_token: String,
}

#[derive(Debug, Serialize)]
pub(super) struct DetailsResponse {
    place: PlaceDetails,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeocodeRequest {
    address: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    #[serde(default)]
    autocomplete: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct SuggestionsResponse {
    suggestions: Vec<PlaceSuggestion>,
}

fn places(state: &AppState, request_id: &str) -> Result<Arc<PlaceSearch>, ApiError> {
    state.places.clone().ok_or_else(|| {
        ApiError::new(
            request_id,
            "service_unavailable",
            "places provider is not configured",
        )
    })
}

fn body<T>(payload: Result<Json<T>, JsonRejection>, request_id: &str) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::new(request_id, "bad_request", e.body_text()))
}

pub(super) async fn autocomplete(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<AutocompleteRequest>, JsonRejection>,
) -> Result<Json<AutocompleteResponse>, ApiError> {
    let request = body(payload, &req_id.0)?;
    let places = places(&state, &req_id.0)?;

    let outcome = places
        .autocomplete(&request.input, &request.session_token)
        .await
        .map_err(|e| map_geo_error(req_id.0.clone(), &e))?;

    Ok(Json(AutocompleteResponse {
        predictions: outcome.predictions,
        cached: outcome.cached,
    }))
}

pub(super) async fn details(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<DetailsRequest>, JsonRejection>,
) -> Result<Json<DetailsResponse>, ApiError> {
    let request = body(payload, &req_id.0)?;
    let places = places(&state, &req_id.0)?;

    let place = places
        .place_details(&request.place_id, &request.session_token)
        .await
        .map_err(|e| map_geo_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "place not found"))?;

    Ok(Json(DetailsResponse { place }))
}

/// Forward (`address`), suggestion (`address` + `autocomplete`) or reverse
/// (`lat`/`lng`) geocoding. Zero results answer 404.
pub(super) async fn geocode(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<GeocodeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = body(payload, &req_id.0)?;
    let address = request
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());

    // Validate before checking configuration so malformed input is always 400.
    let coords = match (address, request.lat, request.lng) {
        (Some(_), _, _) => None,
        (None, Some(lat), Some(lng)) => {
            let coords = Coordinates { lat, lng };
            if !coords.is_valid() {
                return Err(ApiError::new(
                    req_id.0,
                    "bad_request",
                    "lat must be within ±90 and lng within ±180",
                ));
            }
            Some(coords)
        }
        _ => {
            return Err(ApiError::new(
                req_id.0,
                "bad_request",
                "either address or both lat and lng are required",
            ))
        }
    };

    let places = places(&state, &req_id.0)?;
    let client = places.client();
    let map_err = |e: GeoError| map_geo_error(req_id.0.clone(), &e);

    if let (Some(address), true) = (address, request.autocomplete) {
        let suggestions = client
            .geocode_suggestions(address, GEOCODE_SUGGESTION_LIMIT)
            .await
            .map_err(map_err)?;
        return Ok(Json(SuggestionsResponse { suggestions }).into_response());
    }

    let locality: Option<Locality> = match (address, coords) {
        (Some(address), _) => client.geocode_address(address).await.map_err(map_err)?,
        (None, Some(coords)) => client.reverse_geocode(coords).await.map_err(map_err)?,
        (None, None) => None,
    };

    match locality {
        Some(locality) => Ok(Json(locality).into_response()),
        None => Err(ApiError::new(req_id.0.clone(), "not_found", "no results")),
    }
}
