//! Capacity-bounded, time-limited cache for autocomplete predictions.
//!
//! Entries are keyed by `(normalized input, billing session token)`. Eviction
//! is strictly first-in-first-out by insertion order, tracked in an explicit
//! queue rather than relying on map iteration order. Expiry and eviction are
//! the only ways an entry leaves; payloads are never updated in place.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::types::Prediction;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    input: String,
    session_token: Uuid,
}

impl CacheKey {
    /// Lower-cases the input and collapses runs of whitespace.
    #[must_use]
    pub fn new(input: &str, session_token: Uuid) -> Self {
        let input = input
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            input,
            session_token,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    predictions: Vec<Prediction>,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct AutocompleteCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<CacheKey, CacheEntry>,
    insertion_order: VecDeque<CacheKey>,
}

impl AutocompleteCache {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        assert!(capacity > 0, "autocomplete cache capacity must be positive");
        Self {
            capacity,
            ttl,
            entries: HashMap::with_capacity(capacity),
            insertion_order: VecDeque::with_capacity(capacity),
        }
    }

    /// Returns the cached predictions if the entry is still live at `now`.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &CacheKey, now: Instant) -> Option<Vec<Prediction>> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => now >= entry.expires_at,
        };

        if expired {
            self.remove(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.predictions.clone())
    }

    /// Inserts a fresh entry stamped to expire at `now + ttl`.
    ///
    /// A live entry for the same key is left untouched. When the cache is
    /// full, the oldest-inserted entry is evicted first.
    pub fn insert(&mut self, key: CacheKey, predictions: Vec<Prediction>, now: Instant) {
        if let Some(existing) = self.entries.get(&key) {
            if now < existing.expires_at {
                return;
            }
            self.remove(&key);
        }

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.entries.remove(&oldest);
                tracing::debug!(capacity = self.capacity, "autocomplete cache evicted oldest entry");
            }
        }

        self.entries.insert(
            key.clone(),
            CacheEntry {
                predictions,
                expires_at: now + self.ttl,
            },
        );
        self.insertion_order.push_back(key);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    fn remove(&mut self, key: &CacheKey) {
        self.entries.remove(key);
        self.insertion_order.retain(|k| k != key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(id: &str) -> Prediction {
        Prediction {
            place_id: id.to_string(),
            description: format!("{id}, Somewhere"),
            main_text: id.to_string(),
            secondary_text: "Somewhere".to_string(),
        }
    }

    fn key(input: &str) -> CacheKey {
        CacheKey::new(input, Uuid::nil())
    }

    #[test]
    fn key_normalizes_case_and_whitespace() {
        assert_eq!(key("  Lagos   Island "), key("lagos island"));
    }

    #[test]
    fn key_is_scoped_to_session_token() {
        let a = CacheKey::new("lagos", Uuid::nil());
        let b = CacheKey::new("lagos", Uuid::from_u128(1));
        assert_ne!(a, b);
    }

    #[test]
    fn hit_within_ttl() {
        let now = Instant::now();
        let mut cache = AutocompleteCache::new(4, Duration::from_secs(60));
        cache.insert(key("lag"), vec![prediction("p1")], now);
        let hit = cache.get(&key("lag"), now + Duration::from_secs(59));
        assert_eq!(hit, Some(vec![prediction("p1")]));
    }

    #[test]
    fn lookup_after_ttl_is_a_miss_and_removes_entry() {
        let now = Instant::now();
        let mut cache = AutocompleteCache::new(4, Duration::from_secs(60));
        cache.insert(key("lag"), vec![prediction("p1")], now);

        assert_eq!(cache.get(&key("lag"), now + Duration::from_secs(60)), None);
        assert!(!cache.contains(&key("lag")));
        assert!(cache.is_empty());
    }

    #[test]
    fn inserting_past_capacity_evicts_first_inserted() {
        let now = Instant::now();
        let capacity = 3;
        let mut cache = AutocompleteCache::new(capacity, Duration::from_secs(60));
        for (i, input) in ["aaa", "bbb", "ccc", "ddd"].iter().enumerate() {
            cache.insert(
                key(input),
                vec![prediction(input)],
                now + Duration::from_millis(i as u64),
            );
        }

        assert_eq!(cache.len(), capacity);
        assert!(!cache.contains(&key("aaa")));
        assert!(cache.contains(&key("bbb")));
        assert!(cache.contains(&key("ddd")));
    }

    #[test]
    fn eviction_follows_insertion_not_lookup_order() {
        let now = Instant::now();
        let mut cache = AutocompleteCache::new(2, Duration::from_secs(60));
        cache.insert(key("first"), vec![], now);
        cache.insert(key("second"), vec![], now);
        // A hit does not refresh position.
        assert!(cache.get(&key("first"), now).is_some());
        cache.insert(key("third"), vec![], now);

        assert!(!cache.contains(&key("first")));
        assert!(cache.contains(&key("second")));
    }

    #[test]
    fn live_entry_is_not_overwritten() {
        let now = Instant::now();
        let mut cache = AutocompleteCache::new(2, Duration::from_secs(60));
        cache.insert(key("lag"), vec![prediction("original")], now);
        cache.insert(key("lag"), vec![prediction("replacement")], now);
        assert_eq!(cache.get(&key("lag"), now), Some(vec![prediction("original")]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_entry_is_replaced_on_insert() {
        let now = Instant::now();
        let later = now + Duration::from_secs(120);
        let mut cache = AutocompleteCache::new(2, Duration::from_secs(60));
        cache.insert(key("lag"), vec![prediction("old")], now);
        cache.insert(key("lag"), vec![prediction("new")], later);
        assert_eq!(cache.get(&key("lag"), later), Some(vec![prediction("new")]));
        assert_eq!(cache.len(), 1);
    }
}
