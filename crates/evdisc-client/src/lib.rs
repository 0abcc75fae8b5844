//! Client-side synchronization for event discovery.
//!
//! A [`FilterStore`] holds the shared criteria and caller location,
//! [`UrlSync`] mirrors them into the address bar, [`InfiniteFeed`] pages
//! results in as the list scrolls, and [`EventEnricher`] fills in per-event
//! localities. [`DiscoveryApi`] talks to the server.

pub mod api;
pub mod enrich;
pub mod error;
pub mod feed;
pub mod store;
pub mod url_sync;

pub use api::{new_session_token, AutocompleteReply, DiscoveryApi, HealthReport};
pub use enrich::{resolve_caller_location, DurableStore, EnrichOutcome, EventEnricher, MemoryStore};
pub use error::ClientError;
pub use feed::{
    Applied, FeedKey, FeedView, InfiniteFeed, PageFetcher, PageRequest, Ticket,
    DEFAULT_FRESHNESS, DEFAULT_PREFETCH_MARGIN_PX,
};
pub use store::{FilterState, FilterStore};
pub use url_sync::{History, MemoryHistory, SyncPhase, UrlSync, WriteOutcome, DEFAULT_DEBOUNCE};
