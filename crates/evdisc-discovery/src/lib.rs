//! Event discovery pipeline.
//!
//! Retrieves candidates from a [`CatalogGateway`], narrows them with the
//! filter pipeline, orders them by proximity tier when the caller's location
//! is known, and slices out one page.

pub mod catalog;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod paginate;
pub mod pipeline;
pub mod rank;

#[cfg(test)]
mod fixtures;

pub use catalog::{CatalogGateway, StaticCatalog};
pub use enrich::enrich_missing_localities;
pub use error::{CatalogError, DiscoveryError};
pub use filter::{date_range, filter};
pub use paginate::paginate;
pub use pipeline::{discover, discover_nearby};
pub use rank::{
    classify, events_near, haversine_km, rank, Tier, NEARBY_RADIUS_KM, NEAR_YOU_RADIUS_KM,
};
