//! Event catalog gateway and its YAML-backed implementation.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;

use evdisc_core::{Event, PublishState};
use serde::Deserialize;

use crate::error::CatalogError;

/// Source of publishable candidate events.
///
/// Two retrieval modes: keyword search by category label, or everything.
/// Failures here are not isolated; they abort the whole request.
pub trait CatalogGateway: Sync {
    fn search_by_categories(
        &self,
        categories: &[String],
    ) -> impl Future<Output = Result<Vec<Event>, CatalogError>> + Send;

    fn all_events(&self) -> impl Future<Output = Result<Vec<Event>, CatalogError>> + Send;
}

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub events: Vec<Event>,
}

/// In-memory catalog of published events, ordered by start instant
/// (ties keep file order).
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    events: Vec<Event>,
}

impl StaticCatalog {
    /// Load and validate the catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// # Errors
    ///
    /// Returns `CatalogError` on malformed YAML or invalid events.
    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(content)?;
        Self::from_events(file.events)
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for a blank or duplicate id, or an
    /// event with no categories.
    pub fn from_events(events: Vec<Event>) -> Result<Self, CatalogError> {
        validate_events(&events)?;

        let mut events: Vec<Event> = events
            .into_iter()
            .filter(|e| e.publish_state == PublishState::Published)
            .collect();
        events.sort_by_key(|e| e.starts_at);

        Ok(Self { events })
    }

    /// All publishable events in retrieval order.
    #[must_use]
    pub fn published(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl CatalogGateway for StaticCatalog {
    async fn search_by_categories(&self, categories: &[String]) -> Result<Vec<Event>, CatalogError> {
        let wanted: HashSet<String> = categories
            .iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();

        Ok(self
            .events
            .iter()
            .filter(|e| {
                e.categories
                    .iter()
                    .any(|c| wanted.contains(&c.trim().to_lowercase()))
            })
            .cloned()
            .collect())
    }

    async fn all_events(&self) -> Result<Vec<Event>, CatalogError> {
        Ok(self.events.clone())
    }
}

impl<C: CatalogGateway + Send> CatalogGateway for std::sync::Arc<C> {
    fn search_by_categories(
        &self,
        categories: &[String],
    ) -> impl Future<Output = Result<Vec<Event>, CatalogError>> + Send {
        C::search_by_categories(self, categories)
    }

    fn all_events(&self) -> impl Future<Output = Result<Vec<Event>, CatalogError>> + Send {
        C::all_events(self)
    }
}

fn validate_events(events: &[Event]) -> Result<(), CatalogError> {
    let mut seen_ids = HashSet::new();

    for event in events {
        if event.id.trim().is_empty() {
            return Err(CatalogError::Validation(format!(
                "event '{}' has an empty id",
                event.title
            )));
        }

        if event.categories.iter().all(|c| c.trim().is_empty()) {
            return Err(CatalogError::Validation(format!(
                "event '{}' must have at least one category",
                event.id
            )));
        }

        if !seen_ids.insert(event.id.as_str()) {
            return Err(CatalogError::Validation(format!(
                "duplicate event id: '{}'",
                event.id
            )));
        }
    }

    Ok(())
}
