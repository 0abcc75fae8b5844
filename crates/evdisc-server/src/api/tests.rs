use std::net::SocketAddr;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use evdisc_geo::PlacesClient;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

const CATALOG: &str = r#"
events:
  - id: lagos-jazz
    title: Jazz on the Lagoon
    startsAt: "2026-12-05T19:00:00Z"
    location: Freedom Park, Lagos
    format: in-person
    categories: [music]
    city: Lagos
    country: Nigeria
    latitude: 6.5244
    longitude: 3.3792
  - id: ikeja-market
    title: Ikeja Night Market
    startsAt: "2026-12-01T18:00:00Z"
    location: Allen Avenue, Ikeja
    format: in-person
    categories: [food]
    city: Ikeja
    country: Nigeria
    latitude: 6.6018
    longitude: 3.3515
  - id: abuja-summit
    title: Abuja Tech Summit
    startsAt: "2026-11-20T09:00:00Z"
    location: Transcorp Hilton, Abuja
    format: hybrid
    categories: [tech]
    city: Abuja
    country: Nigeria
    latitude: 9.0765
    longitude: 7.3986
  - id: london-webinar
    title: Remote Work Webinar
    startsAt: "2026-11-10T12:00:00Z"
    location: Online
    format: online
    categories: [tech]
    city: London
    country: United Kingdom
"#;

fn state(places: Option<Arc<PlaceSearch>>) -> AppState {
    AppState {
        catalog: Arc::new(StaticCatalog::from_yaml_str(CATALOG).expect("catalog")),
        places,
        default_page_size: 2,
    }
}

fn limits(per_minute: usize) -> RateLimits {
    RateLimits {
        discovery: RateLimitState::per_minute(per_minute),
        autocomplete: RateLimitState::per_minute(per_minute),
        details: RateLimitState::per_minute(per_minute),
        geocode: RateLimitState::per_minute(per_minute),
    }
}

fn app() -> Router {
    build_app(state(None), limits(100))
}

fn app_with_provider(server: &MockServer) -> Router {
    let client = PlacesClient::with_base_url("test-key", 2, &server.uri())
        .expect("client")
        .with_retry_policy(0, 0);
    let search = PlaceSearch::new(client, 16, Duration::from_secs(300));
    build_app(state(Some(Arc::new(search))), limits(100))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn post(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, serde_json::Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, headers, json)
}

fn ids(json: &serde_json::Value) -> Vec<&str> {
    json["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|e| e["id"].as_str().expect("id"))
        .collect()
}

#[tokio::test]
async fn health_reports_catalog_and_provider() {
    let (status, _, json) = send(app(), get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["catalogEvents"], 4);
    assert_eq!(json["placesConfigured"], false);
}

#[tokio::test]
async fn events_page_in_catalog_order_without_caller() {
    let (status, headers, json) = send(app(), get("/api/v1/events")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(ids(&json), vec!["london-webinar", "abuja-summit"]);
    assert_eq!(json["total"], 4);
    assert_eq!(json["hasMore"], true);
}

#[tokio::test]
async fn events_are_tiered_by_caller_location() {
    let uri = "/api/v1/events?limit=10&userCity=Lagos&userCountry=Nigeria&lat=6.5244&lng=3.3792";
    let (status, _, json) = send(app(), get(uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&json),
        vec!["lagos-jazz", "abuja-summit", "ikeja-market", "london-webinar"]
    );
    assert_eq!(json["hasMore"], false);
}

#[tokio::test]
async fn events_filter_by_category_and_search() {
    let (_, _, json) = send(app(), get("/api/v1/events?category=tech&search=summit")).await;
    assert_eq!(ids(&json), vec!["abuja-summit"]);
    assert_eq!(json["total"], 1);
}

#[tokio::test]
async fn invalid_page_is_rejected_with_request_id() {
    let request = Request::builder()
        .uri("/api/v1/events?page=0")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .expect("request");
    let (status, headers, json) = send(app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "bad_request");
    assert_eq!(json["meta"]["request_id"], "req-42");
    assert_eq!(headers["x-request-id"], "req-42");
}

#[tokio::test]
async fn lone_coordinate_is_rejected() {
    let (status, _, _) = send(app(), get("/api/v1/events?lat=6.5")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn nearby_returns_events_within_radius_closest_first() {
    let (status, _, json) = send(app(), get("/api/v1/events/nearby?lat=6.5244&lng=3.3792")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&json), vec!["lagos-jazz", "ikeja-market"]);
    let first = json["data"][0]["distanceKm"].as_f64().expect("distance");
    let second = json["data"][1]["distanceKm"].as_f64().expect("distance");
    assert!(first.abs() < 1e-9);
    assert!(second > 5.0 && second < 15.0);
}

#[tokio::test]
async fn nearby_rejects_out_of_range_coordinates() {
    let (status, _, json) = send(app(), get("/api/v1/events/nearby?lat=120&lng=3.3")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "bad_request");
}

/// `GET /api/v1/events` from socket peer `peer`, claiming `forwarded_for`.
fn events_from(peer: &str, forwarded_for: &str) -> Request<Body> {
    let addr: SocketAddr = format!("{peer}:40000").parse().expect("peer addr");
    Request::builder()
        .uri("/api/v1/events")
        .header("x-forwarded-for", forwarded_for)
        .extension(ConnectInfo(addr))
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn rate_limit_is_per_peer_with_retry_hint() {
    let app = build_app(state(None), limits(2));

    for _ in 0..2 {
        let (status, _, _) = send(app.clone(), events_from("203.0.113.1", "198.51.100.1")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, headers, json) =
        send(app.clone(), events_from("203.0.113.1", "198.51.100.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "rate_limited");
    let retry_after = json["retryAfter"].as_u64().expect("retryAfter");
    assert!((1..=60).contains(&retry_after));
    assert_eq!(headers["retry-after"], retry_after.to_string().as_str());

    let (status, _, _) = send(app.clone(), events_from("203.0.113.2", "198.51.100.1")).await;
    assert_eq!(status, StatusCode::OK);

    // Health is not rate limited.
    let (status, _, _) = send(app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rotating_forwarded_for_does_not_reset_quota() {
    let app = build_app(state(None), limits(2));

    let mut admitted = 0;
    for i in 0..10 {
        let request = events_from("203.0.113.1", &format!("198.51.100.{i}"));
        let (status, _, _) = send(app.clone(), request).await;
        if status == StatusCode::OK {
            admitted += 1;
        } else {
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        }
    }
    assert_eq!(admitted, 2);
}

#[tokio::test]
async fn trusted_proxy_headers_key_on_forwarded_client() {
    let trusted = |per_minute| RateLimitState::per_minute(per_minute).with_proxy_headers(true);
    let limits = RateLimits {
        discovery: trusted(1),
        autocomplete: trusted(1),
        details: trusted(1),
        geocode: trusted(1),
    };
    let app = build_app(state(None), limits);

    // One proxy peer, two forwarded clients.
    let (status, _, _) = send(app.clone(), events_from("10.0.0.1", "198.51.100.1")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(app.clone(), events_from("10.0.0.1", "198.51.100.2")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(app, events_from("10.0.0.1", "198.51.100.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn places_without_provider_are_unavailable() {
    let body = json!({ "input": "Lagos", "sessionToken": Uuid::new_v4().to_string() });
    let (status, _, json) = send(app(), post("/api/v1/places/autocomplete", &body)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "service_unavailable");
}

#[tokio::test]
async fn geocode_requires_address_or_coordinates() {
    let (status, _, _) = send(app(), post("/api/v1/geocode", &json!({ "lat": 6.5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn autocomplete_requires_v4_session_token() {
    let server = MockServer::start().await;
    let body = json!({ "input": "Lagos", "sessionToken": "not-a-token" });
    let (status, _, _) = send(
        app_with_provider(&server),
        post("/api/v1/places/autocomplete", &body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn autocomplete_is_cached_but_details_always_reach_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/api/place/autocomplete/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "predictions": [{
                "place_id": "place-lagos",
                "description": "Lagos, Nigeria",
                "structured_formatting": { "main_text": "Lagos", "secondary_text": "Nigeria" }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maps/api/place/details/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": {
                "place_id": "place-lagos",
                "name": "Lagos",
                "formatted_address": "Lagos, Nigeria",
                "geometry": { "location": { "lat": 6.5244, "lng": 3.3792 } },
                "address_components": [
                    { "long_name": "Lagos", "types": ["locality"] },
                    { "long_name": "Nigeria", "types": ["country"] }
                ]
            }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let app = app_with_provider(&server);
    let token = Uuid::new_v4().to_string();

    let first = json!({ "input": "Lagos", "sessionToken": token });
    let (_, _, json) = send(app.clone(), post("/api/v1/places/autocomplete", &first)).await;
    assert_eq!(json["cached"], false);
    assert_eq!(json["predictions"][0]["placeId"], "place-lagos");

    let again = json!({ "input": " lagos ", "sessionToken": token });
    let (_, _, json) = send(app.clone(), post("/api/v1/places/autocomplete", &again)).await;
    assert_eq!(json["cached"], true);

    let details = json!({ "placeId": "place-lagos", "sessionToken": token });
    for _ in 0..2 {
        let (status, _, json) = send(app.clone(), post("/api/v1/places/details", &details)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["place"]["city"], "Lagos");
        assert_eq!(json["place"]["country"], "Nigeria");
    }
}

#[tokio::test]
async fn geocode_zero_results_is_not_found_and_refusal_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/api/geocode/json"))
        .and(wiremock::matchers::query_param("address", "Atlantis"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "ZERO_RESULTS", "results": [] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maps/api/geocode/json"))
        .and(wiremock::matchers::query_param("address", "Lagos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OVER_QUERY_LIMIT",
            "error_message": "quota exceeded"
        })))
        .mount(&server)
        .await;

    let app = app_with_provider(&server);

    let (status, _, json) =
        send(app.clone(), post("/api/v1/geocode", &json!({ "address": "Atlantis" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not_found");

    let (status, _, json) = send(app, post("/api/v1/geocode", &json!({ "address": "Lagos" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "service_unavailable");
}
