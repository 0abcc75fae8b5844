//! Proximity ranking.
//!
//! With a known caller, events are split in one pass into four disjoint tiers
//! (same city, same country, nearby by great-circle distance, everything
//! else) and the tiers are concatenated in that order. Exact locality beats
//! geometric proximity.

use evdisc_core::{CallerLocation, Coordinates, Event};

/// Mean Earth radius used by [`haversine_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Inclusive distance bound for the nearby ranking tier.
pub const NEARBY_RADIUS_KM: f64 = 1000.0;

/// Default radius of the "events near you" feature. Deliberately distinct
/// from [`NEARBY_RADIUS_KM`].
pub const NEAR_YOU_RADIUS_KM: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    City,
    Country,
    Nearby,
    Other,
}

/// Great-circle distance in kilometres between two points given in degrees.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Tier for one event, with the distance when it landed in the nearby tier.
#[must_use]
pub fn classify(event: &Event, caller: &CallerLocation) -> (Tier, Option<f64>) {
    classify_within(event, caller, NEARBY_RADIUS_KM)
}

fn classify_within(
    event: &Event,
    caller: &CallerLocation,
    nearby_radius_km: f64,
) -> (Tier, Option<f64>) {
    let same = |event_value: Option<&String>, caller_value: Option<&str>| {
        event_value
            .zip(caller_value)
            .is_some_and(|(e, c)| e.trim().to_lowercase() == c.to_lowercase())
    };

    if same(event.city.as_ref(), caller.city()) {
        return (Tier::City, None);
    }
    if same(event.country.as_ref(), caller.country()) {
        return (Tier::Country, None);
    }
    if let (Some(from), Some(to)) = (caller.coordinates(), event.coordinates()) {
        let distance = haversine_km(from, to);
        if distance <= nearby_radius_km {
            return (Tier::Nearby, Some(distance));
        }
    }
    (Tier::Other, None)
}

/// Orders `events` by proximity tier.
///
/// Without a usable caller location the input is returned unchanged.
#[must_use]
pub fn rank(events: Vec<Event>, caller: Option<&CallerLocation>) -> Vec<Event> {
    let Some(caller) = caller.filter(|c| c.is_known()) else {
        return events;
    };

    let mut city = Vec::new();
    let mut country = Vec::new();
    let mut nearby = Vec::new();
    let mut other = Vec::new();

    for event in events {
        match classify(&event, caller) {
            (Tier::City, _) => city.push(event),
            (Tier::Country, _) => country.push(event),
            (Tier::Nearby, Some(distance)) => nearby.push((distance, event)),
            (Tier::Nearby | Tier::Other, _) => other.push(event),
        }
    }

    city.sort_by_key(|e| e.starts_at);
    country.sort_by_key(|e| e.starts_at);
    other.sort_by_key(|e| e.starts_at);
    nearby.sort_by(|(a, _), (b, _)| a.total_cmp(b));

    tracing::debug!(
        city = city.len(),
        country = country.len(),
        nearby = nearby.len(),
        other = other.len(),
        "ranked events by proximity"
    );

    city.into_iter()
        .chain(country)
        .chain(nearby.into_iter().map(|(_, e)| e))
        .chain(other)
        .collect()
}

/// Events with coordinates within `radius_km` of `origin`, closest first.
#[must_use]
pub fn events_near(events: &[Event], origin: Coordinates, radius_km: f64) -> Vec<(Event, f64)> {
    let mut near: Vec<(Event, f64)> = events
        .iter()
        .filter_map(|event| {
            let distance = haversine_km(origin, event.coordinates()?);
            (distance <= radius_km).then(|| (event.clone(), distance))
        })
        .collect();
    near.sort_by(|(_, a), (_, b)| a.total_cmp(b));
    near
}

#[cfg(test)]
#[path = "rank_test.rs"]
mod tests;
