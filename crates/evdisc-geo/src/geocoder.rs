use std::future::Future;

use evdisc_core::Coordinates;

use crate::client::PlacesClient;
use crate::error::GeoError;
use crate::types::Locality;

/// Forward and reverse resolution of a location into city/country.
///
/// `Ok(None)` means the provider found nothing; an `Err` means it could not
/// be asked.
pub trait Geocoder: Sync {
    fn forward(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Locality>, GeoError>> + Send;

    fn reverse(
        &self,
        coords: Coordinates,
    ) -> impl Future<Output = Result<Option<Locality>, GeoError>> + Send;
}

impl Geocoder for PlacesClient {
    async fn forward(&self, address: &str) -> Result<Option<Locality>, GeoError> {
        self.geocode_address(address).await
    }

    async fn reverse(&self, coords: Coordinates) -> Result<Option<Locality>, GeoError> {
        self.reverse_geocode(coords).await
    }
}

impl<G: Geocoder + Send> Geocoder for std::sync::Arc<G> {
    fn forward(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Locality>, GeoError>> + Send {
        G::forward(self, address)
    }

    fn reverse(
        &self,
        coords: Coordinates,
    ) -> impl Future<Output = Result<Option<Locality>, GeoError>> + Send {
        G::reverse(self, coords)
    }
}
