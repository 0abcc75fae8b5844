use std::path::Path;

use chrono::{DateTime, Utc};
use evdisc_core::{CallerLocation, Coordinates, DiscoveryParams, FilterCriteria};
use evdisc_discovery::{discover, discover_nearby, StaticCatalog, NEAR_YOU_RADIUS_KM};
use evdisc_geo::PlacesClient;

fn sample_catalog() -> StaticCatalog {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/events.yaml");
    StaticCatalog::load(&path).expect("sample catalog should load")
}

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-19T08:00:00Z")
        .expect("timestamp")
        .with_timezone(&Utc)
}

#[test]
fn sample_catalog_serves_published_events_only() {
    let catalog = sample_catalog();
    assert_eq!(catalog.len(), 9);
    assert!(catalog
        .published()
        .iter()
        .all(|e| e.id != "kigali-fintech-draft"));
}

#[tokio::test]
async fn music_category_in_start_order() {
    let catalog = sample_catalog();
    let params = DiscoveryParams {
        page: 1,
        limit: 12,
        criteria: FilterCriteria {
            categories: vec!["music".to_string()],
            ..FilterCriteria::default()
        },
        caller: CallerLocation::default(),
    };

    let page = discover(&catalog, &params, now(), None::<&PlacesClient>)
        .await
        .expect("discover");
    let ids: Vec<&str> = page.data.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["lagos-jazz-lagoon", "london-afrobeats"]);
    assert_eq!(page.total, 2);
    assert!(!page.has_more);
}

#[tokio::test]
async fn nearby_lagos_events_closest_first() {
    let catalog = sample_catalog();
    let origin = Coordinates {
        lat: 6.4489,
        lng: 3.3954,
    };

    let nearby = discover_nearby(&catalog, origin, NEAR_YOU_RADIUS_KM)
        .await
        .expect("nearby");
    let ids: Vec<&str> = nearby.iter().map(|(e, _)| e.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["lagos-jazz-lagoon", "lagos-book-club", "ikeja-night-market"]
    );
    assert!(nearby[0].1 < 0.01);
}
