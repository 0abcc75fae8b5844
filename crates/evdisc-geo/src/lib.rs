pub mod cache;
pub mod client;
pub mod error;
pub mod geocoder;
pub(crate) mod retry;
pub mod search;
pub mod types;

pub use cache::{AutocompleteCache, CacheKey};
pub use client::PlacesClient;
pub use error::GeoError;
pub use geocoder::Geocoder;
pub use search::{AutocompleteOutcome, PlaceSearch, MIN_AUTOCOMPLETE_INPUT};
pub use types::{Locality, PlaceDetails, PlaceSuggestion, Prediction};
