use axum::{
    extract::{rejection::QueryRejection, Query, RawQuery, State},
    Extension, Json,
};
use chrono::Utc;
use evdisc_core::{Coordinates, DiscoveryParams, NearbyEvent, RankedPage};
use evdisc_discovery::{discover, discover_nearby, NEAR_YOU_RADIUS_KM};
use evdisc_geo::PlaceSearch;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_discovery_error, ApiError, AppState};

pub(super) async fn list_events(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RawQuery(query): RawQuery,
) -> Result<Json<RankedPage>, ApiError> {
    let raw = query.as_deref().unwrap_or_default();
    let params = DiscoveryParams::from_query(raw, state.default_page_size)
        .map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.to_string()))?;

    let geocoder = state.places.as_deref().map(PlaceSearch::client);
    let page = discover(state.catalog.as_ref(), &params, Utc::now(), geocoder)
        .await
        .map_err(|e| map_discovery_error(req_id.0.clone(), &e))?;

    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NearbyQuery {
    lat: f64,
    lng: f64,
    radius_km: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(super) struct NearbyResponse {
    data: Vec<NearbyEvent>,
}

pub(super) async fn nearby_events(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<NearbyQuery>, QueryRejection>,
) -> Result<Json<NearbyResponse>, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.body_text()))?;

    let origin = Coordinates {
        lat: query.lat,
        lng: query.lng,
    };
    if !origin.is_valid() {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "lat must be within ±90 and lng within ±180",
        ));
    }
    let radius_km = query.radius_km.unwrap_or(NEAR_YOU_RADIUS_KM);
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "radiusKm must be a positive number",
        ));
    }

    let nearby = discover_nearby(state.catalog.as_ref(), origin, radius_km)
        .await
        .map_err(|e| map_discovery_error(req_id.0.clone(), &e))?;

    let data = nearby
        .into_iter()
        .map(|(event, distance_km)| NearbyEvent { event, distance_km })
        .collect();
    Ok(Json(NearbyResponse { data }))
}
