//! Server-side locality enrichment ahead of ranking.

use evdisc_core::Event;
use evdisc_geo::Geocoder;
use futures::stream::{self, StreamExt};

/// Upper bound on concurrent forward-geocode calls per request.
pub const ENRICH_CONCURRENCY: usize = 8;

/// Forward-geocodes the location of every event missing a city or country.
///
/// Each lookup is isolated: a failure or empty result leaves that event as it
/// was and never fails the batch. Input order is preserved.
pub async fn enrich_missing_localities<G: Geocoder>(events: Vec<Event>, geocoder: &G) -> Vec<Event> {
    let pending = events.iter().filter(|e| e.needs_locality()).count();
    if pending == 0 {
        return events;
    }

    let enriched: Vec<Event> = stream::iter(events)
        .map(|event| enrich_one(event, geocoder))
        .buffered(ENRICH_CONCURRENCY)
        .collect()
        .await;

    tracing::debug!(pending, "enriched event localities");
    enriched
}

async fn enrich_one<G: Geocoder>(mut event: Event, geocoder: &G) -> Event {
    if !event.needs_locality() || event.location.trim().is_empty() {
        return event;
    }

    match geocoder.forward(&event.location).await {
        Ok(Some(locality)) => {
            fill_blank(&mut event.city, locality.city);
            fill_blank(&mut event.country, locality.country);
        }
        Ok(None) => {
            tracing::debug!(event_id = %event.id, "no locality found for event location");
        }
        Err(e) => {
            tracing::warn!(event_id = %event.id, error = %e, "event locality lookup failed");
        }
    }
    event
}

fn fill_blank(slot: &mut Option<String>, resolved: String) {
    let blank = slot.as_deref().is_none_or(|s| s.trim().is_empty());
    if blank && !resolved.trim().is_empty() {
        *slot = Some(resolved);
    }
}
