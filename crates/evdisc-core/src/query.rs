//! Query-string codec for discovery criteria.
//!
//! The schema is fixed: every recognized parameter is listed below with its
//! default. Unknown parameters are ignored, and unrecognized values for a
//! known criteria parameter fall back to that parameter's default. Paging and
//! coordinate parameters are strict because they feed arithmetic.
//!
//! | param | field | default |
//! |---|---|---|
//! | `category` (repeatable, comma-delimited) | `categories` | `[]` |
//! | `format` | `format` | `all` |
//! | `location` | `location` | `""` (`all` is an alias) |
//! | `date` | `date` | `all` |
//! | `city` / `country` | `city` / `country` | `""` |
//! | `search` | `search` | `""` |
//! | `page` | page | `1` |
//! | `limit` | page size | configured |
//! | `lat` / `lng` | caller coordinates | none |
//! | `userCity` / `userCountry` | caller city / country | none |

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

use crate::events::{CallerLocation, DateBucket, FilterCriteria, FormatSelector};

const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("page must be an integer >= 1, got {0:?}")]
    InvalidPage(String),

    #[error("limit must be an integer > 0, got {0:?}")]
    InvalidLimit(String),

    #[error("{param} must be a valid coordinate, got {value:?}")]
    InvalidCoordinate { param: &'static str, value: String },

    #[error("lat and lng must be supplied together")]
    IncompleteCoordinates,
}

/// Parsed discovery request: paging, criteria, and caller position.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryParams {
    pub page: usize,
    pub limit: usize,
    pub criteria: FilterCriteria,
    pub caller: CallerLocation,
}

impl DiscoveryParams {
    /// Decodes a raw query string (with or without the leading `?`).
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when `page`, `limit`, `lat` or `lng` is present
    /// but malformed, or when only one coordinate is supplied.
    pub fn from_query(query: &str, default_limit: usize) -> Result<Self, QueryError> {
        let pairs = parse_pairs(query);
        let criteria = criteria_from_pairs(&pairs);

        let page = match last_value(&pairs, "page") {
            None => 1,
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| QueryError::InvalidPage(raw.to_string()))?,
        };

        let limit = match last_value(&pairs, "limit") {
            None => default_limit,
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|l| *l > 0)
                .ok_or_else(|| QueryError::InvalidLimit(raw.to_string()))?,
        };

        let latitude = parse_coordinate(&pairs, "lat", 90.0)?;
        let longitude = parse_coordinate(&pairs, "lng", 180.0)?;
        if latitude.is_some() != longitude.is_some() {
            return Err(QueryError::IncompleteCoordinates);
        }

        let caller = CallerLocation {
            city: non_empty(last_value(&pairs, "userCity")),
            country: non_empty(last_value(&pairs, "userCountry")),
            latitude,
            longitude,
        };

        Ok(Self {
            page,
            limit,
            criteria,
            caller,
        })
    }

    /// Encodes back into a query string without the leading `?`.
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut parts = vec![
            format!("page={}", self.page),
            format!("limit={}", self.limit),
        ];
        let criteria = encode_criteria(&self.criteria);
        if !criteria.is_empty() {
            parts.push(criteria);
        }
        if let Some(coords) = self.caller.coordinates() {
            parts.push(format!("lat={}", coords.lat));
            parts.push(format!("lng={}", coords.lng));
        }
        if let Some(city) = self.caller.city() {
            parts.push(pair("userCity", city));
        }
        if let Some(country) = self.caller.country() {
            parts.push(pair("userCountry", country));
        }
        parts.join("&")
    }
}

/// Decodes filter criteria from a query string. Never fails.
#[must_use]
pub fn decode_criteria(query: &str) -> FilterCriteria {
    criteria_from_pairs(&parse_pairs(query))
}

/// Encodes filter criteria, omitting every parameter at its default.
///
/// The output is canonical: decoding it and encoding again yields the same
/// bytes, which lets callers compare encodings to detect no-op writes.
#[must_use]
pub fn encode_criteria(criteria: &FilterCriteria) -> String {
    let mut parts: Vec<String> = normalize_categories(criteria.categories.iter().map(String::as_str))
        .iter()
        .map(|c| pair("category", c))
        .collect();

    if let FormatSelector::Matching(format) = &criteria.format {
        parts.push(pair("format", format));
    }
    let location = normalize_location(&criteria.location);
    if !location.is_empty() {
        parts.push(pair("location", &location));
    }
    if criteria.date != DateBucket::All {
        parts.push(pair("date", criteria.date.as_str()));
    }
    for (key, value) in [
        ("city", &criteria.city),
        ("country", &criteria.country),
        ("search", &criteria.search),
    ] {
        let value = value.trim();
        if !value.is_empty() {
            parts.push(pair(key, value));
        }
    }

    parts.join("&")
}

fn criteria_from_pairs(pairs: &[(String, String)]) -> FilterCriteria {
    let categories = normalize_categories(
        pairs
            .iter()
            .filter(|(k, _)| k == "category")
            .flat_map(|(_, v)| v.split(',')),
    );

    FilterCriteria {
        categories,
        format: last_value(pairs, "format")
            .map(|v| FormatSelector::from(v.to_string()))
            .unwrap_or_default(),
        location: last_value(pairs, "location")
            .map(normalize_location)
            .unwrap_or_default(),
        date: last_value(pairs, "date")
            .and_then(DateBucket::parse)
            .unwrap_or_default(),
        city: trimmed(last_value(pairs, "city")),
        country: trimmed(last_value(pairs, "country")),
        search: trimmed(last_value(pairs, "search")),
    }
}

fn normalize_categories<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in raw {
        let label = label.trim().to_lowercase();
        if !label.is_empty() && !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

fn normalize_location(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("all") {
        String::new()
    } else {
        trimmed.to_string()
    }
}

fn parse_coordinate(
    pairs: &[(String, String)],
    param: &'static str,
    bound: f64,
) -> Result<Option<f64>, QueryError> {
    let Some(raw) = last_value(pairs, param) else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= bound)
        .map(Some)
        .ok_or_else(|| QueryError::InvalidCoordinate {
            param,
            value: raw.to_string(),
        })
}

fn parse_pairs(query: &str) -> Vec<(String, String)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn trimmed(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

fn pair(key: &str, value: &str) -> String {
    format!("{key}={}", utf8_percent_encode(value, QUERY_VALUE))
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
