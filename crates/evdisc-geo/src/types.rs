//! Provider response shapes and the resolved values handed to callers.

use serde::{Deserialize, Serialize};

/// Best-guess city and country for an address or coordinate pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    pub city: String,
    pub country: String,
}

/// One autocomplete prediction, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub place_id: String,
    pub description: String,
    pub main_text: String,
    pub secondary_text: String,
}

/// A resolved place. Tied to a billing session token and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetails {
    pub place_id: String,
    pub formatted_address: String,
    pub lat: f64,
    pub lng: f64,
    pub city: String,
    pub country: String,
    pub name: String,
}

/// Geocode-backed address suggestion (the `autocomplete: true` geocode form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub city: String,
    pub country: String,
}

// ---------------------------------------------------------------------------
// Provider wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct AutocompleteResponse {
    #[serde(default)]
    pub predictions: Vec<RawPrediction>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPrediction {
    pub place_id: String,
    pub description: String,
    #[serde(default)]
    pub structured_formatting: Option<StructuredFormatting>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StructuredFormatting {
    #[serde(default)]
    pub main_text: String,
    #[serde(default)]
    pub secondary_text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailsResponse {
    pub result: Option<RawPlace>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlace {
    #[serde(default)]
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub formatted_address: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    #[serde(default)]
    pub results: Vec<RawPlace>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// City component types, most specific first.
const CITY_TYPES: [&str; 4] = [
    "locality",
    "postal_town",
    "administrative_area_level_2",
    "administrative_area_level_1",
];

impl RawPlace {
    pub(crate) fn locality(&self) -> Locality {
        let find = |wanted: &str| {
            self.address_components
                .iter()
                .find(|c| c.types.iter().any(|t| t == wanted))
                .map(|c| c.long_name.clone())
        };

        Locality {
            city: CITY_TYPES.iter().find_map(|t| find(t)).unwrap_or_default(),
            country: find("country").unwrap_or_default(),
        }
    }

    pub(crate) fn into_details(self) -> PlaceDetails {
        let Locality { city, country } = self.locality();
        PlaceDetails {
            place_id: self.place_id,
            formatted_address: self.formatted_address,
            lat: self.geometry.location.lat,
            lng: self.geometry.location.lng,
            city,
            country,
            name: self.name,
        }
    }

    pub(crate) fn into_suggestion(self) -> PlaceSuggestion {
        let Locality { city, country } = self.locality();
        PlaceSuggestion {
            name: self.formatted_address,
            lat: self.geometry.location.lat,
            lng: self.geometry.location.lng,
            city,
            country,
        }
    }
}

impl From<RawPrediction> for Prediction {
    fn from(raw: RawPrediction) -> Self {
        let formatting = raw.structured_formatting.unwrap_or_default();
        Self {
            place_id: raw.place_id,
            description: raw.description,
            main_text: formatting.main_text,
            secondary_text: formatting.secondary_text,
        }
    }
}
