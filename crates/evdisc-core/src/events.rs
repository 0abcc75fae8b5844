//! Event discovery data model shared by the server, the discovery pipeline,
//! and the client synchronization layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventFormat {
    InPerson,
    Online,
    Hybrid,
}

impl EventFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventFormat::InPerson => "in-person",
            EventFormat::Online => "online",
            EventFormat::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for EventFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    Draft,
    #[default]
    Published,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Latitude within ±90 and longitude within ±180, both finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A published event as seen by the discovery core. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    pub location: String,
    /// Display time-of-day, e.g. `"18:30"`.
    #[serde(default)]
    pub time: String,
    pub format: EventFormat,
    pub categories: Vec<String>,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub publish_state: PublishState,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Event {
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }

    /// True when either city or country is missing or blank.
    #[must_use]
    pub fn needs_locality(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        blank(&self.city) || blank(&self.country)
    }
}

/// Format constraint: everything, or formats whose label contains the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormatSelector {
    #[default]
    All,
    Matching(String),
}

impl From<String> for FormatSelector {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            FormatSelector::All
        } else {
            FormatSelector::Matching(trimmed.to_lowercase())
        }
    }
}

impl From<FormatSelector> for String {
    fn from(selector: FormatSelector) -> Self {
        match selector {
            FormatSelector::All => "all".to_string(),
            FormatSelector::Matching(format) => format,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateBucket {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl DateBucket {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Some(DateBucket::All),
            "today" => Some(DateBucket::Today),
            "week" => Some(DateBucket::Week),
            "month" => Some(DateBucket::Month),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DateBucket::All => "all",
            DateBucket::Today => "today",
            DateBucket::Week => "week",
            DateBucket::Month => "month",
        }
    }
}

/// Immutable per-request filter values. Empty strings and empty category
/// sets impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub categories: Vec<String>,
    pub format: FormatSelector,
    pub location: String,
    pub date: DateBucket,
    pub city: String,
    pub country: String,
    pub search: String,
}

impl FilterCriteria {
    /// Applies every `Some` field of `patch`, leaving the rest untouched.
    #[must_use]
    pub fn merged(&self, patch: FilterPatch) -> Self {
        Self {
            categories: patch.categories.unwrap_or_else(|| self.categories.clone()),
            format: patch.format.unwrap_or_else(|| self.format.clone()),
            location: patch.location.unwrap_or_else(|| self.location.clone()),
            date: patch.date.unwrap_or(self.date),
            city: patch.city.unwrap_or_else(|| self.city.clone()),
            country: patch.country.unwrap_or_else(|| self.country.clone()),
            search: patch.search.unwrap_or_else(|| self.search.clone()),
        }
    }
}

/// Partial update for [`FilterCriteria`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub categories: Option<Vec<String>>,
    pub format: Option<FormatSelector>,
    pub location: Option<String>,
    pub date: Option<DateBucket>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub search: Option<String>,
}

/// What is known about the caller's position. Proximity ranking needs
/// both coordinates; city/country alone only feed the first two tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerLocation {
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl CallerLocation {
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }

    #[must_use]
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn country(&self) -> Option<&str> {
        self.country
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether anything usable for ranking is present.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.city().is_some() || self.country().is_some() || self.coordinates().is_some()
    }
}

/// One page of discovery results. `total` counts the whole filtered set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPage {
    pub data: Vec<Event>,
    pub has_more: bool,
    pub total: usize,
}

/// An event within the "near you" radius, with its distance from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyEvent {
    #[serde(flatten)]
    pub event: Event,
    pub distance_km: f64,
}
