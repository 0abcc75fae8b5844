//! Shared filter and caller-location state.
//!
//! One store per session. Mutation goes through [`FilterStore::set_filters`]
//! and [`FilterStore::set_location`]; readers take a snapshot or subscribe to
//! change notifications. No-op updates do not notify subscribers.

use evdisc_core::{CallerLocation, FilterCriteria, FilterPatch};
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub criteria: FilterCriteria,
    pub location: CallerLocation,
}

#[derive(Debug)]
pub struct FilterStore {
    state: watch::Sender<FilterState>,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new(FilterState::default())
    }
}

impl FilterStore {
    #[must_use]
    pub fn new(initial: FilterState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    /// Merges `patch` into the current criteria. Returns whether anything changed.
    pub fn set_filters(&self, patch: FilterPatch) -> bool {
        self.state.send_if_modified(|state| {
            let next = state.criteria.merged(patch);
            if next == state.criteria {
                return false;
            }
            state.criteria = next;
            true
        })
    }

    /// Replaces the criteria wholesale. Returns whether anything changed.
    pub fn replace_criteria(&self, criteria: FilterCriteria) -> bool {
        self.state.send_if_modified(|state| {
            if state.criteria == criteria {
                return false;
            }
            state.criteria = criteria;
            true
        })
    }

    /// Records the caller's position. Returns whether anything changed.
    pub fn set_location(&self, location: CallerLocation) -> bool {
        self.state.send_if_modified(|state| {
            if state.location == location {
                return false;
            }
            state.location = location;
            true
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> FilterState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn criteria(&self) -> FilterCriteria {
        self.state.borrow().criteria.clone()
    }

    #[must_use]
    pub fn location(&self) -> CallerLocation {
        self.state.borrow().location.clone()
    }

    /// Change feed. The receiver starts with the current state marked seen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FilterState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use evdisc_core::DateBucket;

    use super::*;

    #[test]
    fn set_filters_merges_partial_updates() {
        let store = FilterStore::default();
        assert!(store.set_filters(FilterPatch {
            city: Some("Lagos".to_string()),
            ..FilterPatch::default()
        }));
        assert!(store.set_filters(FilterPatch {
            date: Some(DateBucket::Today),
            ..FilterPatch::default()
        }));

        let criteria = store.criteria();
        assert_eq!(criteria.city, "Lagos");
        assert_eq!(criteria.date, DateBucket::Today);
    }

    #[tokio::test]
    async fn identical_update_does_not_notify() {
        let store = FilterStore::default();
        let mut rx = store.subscribe();

        assert!(!store.set_filters(FilterPatch::default()));
        assert!(!rx.has_changed().expect("sender alive"));

        store.set_location(CallerLocation {
            city: Some("Accra".to_string()),
            ..CallerLocation::default()
        });
        assert!(rx.has_changed().expect("sender alive"));
        rx.changed().await.expect("changed");
        assert_eq!(rx.borrow().location.city.as_deref(), Some("Accra"));
    }
}
