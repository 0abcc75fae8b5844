//! Per-event locality enrichment with a durable client-side cache.
//!
//! Resolved localities are kept per event id, including definitive "nothing
//! found" answers. Failed lookups are remembered for the enricher's lifetime
//! only. The enriched list is also kept as a snapshot under its own key,
//! rewritten only when the list of event ids changes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use evdisc_core::{CallerLocation, Coordinates, Event};
use evdisc_geo::{GeoError, Geocoder, Locality};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::store::FilterStore;

const LOCALITY_KEY_PREFIX: &str = "evdisc:locality:";
const SNAPSHOT_KEY: &str = "evdisc:enriched-events";

/// Durable string key-value storage (browser local storage, a file, ...).
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value);
            self.writes.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    ids: Vec<String>,
    events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichOutcome {
    pub events: Vec<Event>,
    pub snapshot_written: bool,
}

pub struct EventEnricher<G, S> {
    geocoder: G,
    store: S,
    /// Event ids whose lookup failed in this session.
    failed: Mutex<HashSet<String>>,
}

impl<G: Geocoder, S: DurableStore> EventEnricher<G, S> {
    #[must_use]
    pub fn new(geocoder: G, store: S) -> Self {
        Self {
            geocoder,
            store,
            failed: Mutex::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fills in city/country for each event lacking them.
    ///
    /// Events with coordinates are reverse-geocoded, others forward-geocoded
    /// from their location text. A failed lookup yields blank city/country for
    /// that event only and is not attempted again by this enricher.
    pub async fn enrich(&self, events: Vec<Event>) -> EnrichOutcome {
        let events = join_all(events.into_iter().map(|event| self.enrich_one(event))).await;
        let snapshot_written = self.write_snapshot_if_changed(&events);
        EnrichOutcome {
            events,
            snapshot_written,
        }
    }

    /// The last enriched list, if one was stored.
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<Event>> {
        let raw = self.store.get(SNAPSHOT_KEY)?;
        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) => Some(snapshot.events),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable event snapshot");
                None
            }
        }
    }

    async fn enrich_one(&self, mut event: Event) -> Event {
        if !event.needs_locality() {
            return event;
        }

        let cache_key = format!("{LOCALITY_KEY_PREFIX}{}", event.id);
        if let Some(locality) = self
            .store
            .get(&cache_key)
            .and_then(|raw| serde_json::from_str::<Locality>(&raw).ok())
        {
            apply_locality(&mut event, locality);
            return event;
        }

        if self.has_failed(&event.id) {
            apply_locality(&mut event, Locality::default());
            return event;
        }

        let locality = match self.lookup(&event).await {
            Ok(found) => {
                let locality = found.unwrap_or_default();
                if let Ok(raw) = serde_json::to_string(&locality) {
                    self.store.put(&cache_key, raw);
                }
                locality
            }
            Err(e) => {
                tracing::debug!(event_id = %event.id, error = %e, "event enrichment failed");
                if let Ok(mut failed) = self.failed.lock() {
                    failed.insert(event.id.clone());
                }
                Locality::default()
            }
        };
        apply_locality(&mut event, locality);
        event
    }

    fn has_failed(&self, event_id: &str) -> bool {
        self.failed
            .lock()
            .is_ok_and(|failed| failed.contains(event_id))
    }

    async fn lookup(&self, event: &Event) -> Result<Option<Locality>, GeoError> {
        match event.coordinates() {
            Some(coords) => self.geocoder.reverse(coords).await,
            None if !event.location.trim().is_empty() => self.geocoder.forward(&event.location).await,
            None => Ok(None),
        }
    }

    fn write_snapshot_if_changed(&self, events: &[Event]) -> bool {
        let ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
        let unchanged = self
            .store
            .get(SNAPSHOT_KEY)
            .and_then(|raw| serde_json::from_str::<Snapshot>(&raw).ok())
            .is_some_and(|previous| previous.ids == ids);
        if unchanged {
            return false;
        }

        let snapshot = Snapshot {
            ids,
            events: events.to_vec(),
        };
        match serde_json::to_string(&snapshot) {
            Ok(raw) => {
                self.store.put(SNAPSHOT_KEY, raw);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize event snapshot");
                false
            }
        }
    }
}

/// Existing non-blank values win over resolved ones.
fn apply_locality(event: &mut Event, locality: Locality) {
    let fill = |slot: &mut Option<String>, value: String| {
        if slot.as_deref().is_none_or(|s| s.trim().is_empty()) {
            *slot = Some(value);
        }
    };
    fill(&mut event.city, locality.city);
    fill(&mut event.country, locality.country);
}

/// Resolves the caller's coordinates into a location and records it in `store`.
///
/// The coordinates are recorded even when the lookup fails, so proximity
/// ranking still works; the failure is then returned to the caller.
///
/// # Errors
///
/// Returns [`ClientError::Unavailable`] when the geocoder could not be asked,
/// or [`ClientError::InvalidInput`] for out-of-range coordinates.
pub async fn resolve_caller_location<G: Geocoder>(
    geocoder: &G,
    coords: Coordinates,
    store: &FilterStore,
) -> Result<CallerLocation, ClientError> {
    if !coords.is_valid() {
        return Err(ClientError::InvalidInput(format!(
            "coordinates out of range: {},{}",
            coords.lat, coords.lng
        )));
    }

    let mut location = CallerLocation {
        latitude: Some(coords.lat),
        longitude: Some(coords.lng),
        ..CallerLocation::default()
    };

    let result = geocoder.reverse(coords).await;
    if let Ok(Some(locality)) = &result {
        location.city = Some(locality.city.clone()).filter(|c| !c.trim().is_empty());
        location.country = Some(locality.country.clone()).filter(|c| !c.trim().is_empty());
    }
    store.set_location(location.clone());

    match result {
        Ok(_) => Ok(location),
        Err(GeoError::InvalidInput(message)) => Err(ClientError::InvalidInput(message)),
        Err(e) => {
            tracing::warn!(error = %e, "caller location lookup failed");
            Err(ClientError::Unavailable(e.to_string()))
        }
    }
}

#[cfg(test)]
#[path = "enrich_test.rs"]
mod tests;
