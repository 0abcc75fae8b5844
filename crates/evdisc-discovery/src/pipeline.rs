//! End-to-end discovery: catalog → filter → (enrich) → rank → paginate.

use chrono::{DateTime, Utc};
use evdisc_core::{Coordinates, DiscoveryParams, Event, FilterCriteria, RankedPage};
use evdisc_geo::Geocoder;

use crate::catalog::CatalogGateway;
use crate::enrich::enrich_missing_localities;
use crate::error::DiscoveryError;
use crate::filter::filter;
use crate::paginate::paginate;
use crate::rank::{events_near, rank};

/// Runs one discovery request.
///
/// An empty category set always uses the catalog's "all events" mode. When a
/// geocoder is supplied and locality matters for this request (the caller or
/// the criteria name a city or country), events missing a locality are
/// forward-geocoded before the city/country filters and ranking run.
///
/// # Errors
///
/// - [`DiscoveryError::InvalidPage`] before the catalog is consulted.
/// - [`DiscoveryError::Catalog`] when candidate retrieval fails.
pub async fn discover<C, G>(
    catalog: &C,
    params: &DiscoveryParams,
    now: DateTime<Utc>,
    geocoder: Option<&G>,
) -> Result<RankedPage, DiscoveryError>
where
    C: CatalogGateway,
    G: Geocoder,
{
    if params.page < 1 || params.limit == 0 {
        return Err(DiscoveryError::InvalidPage {
            page: params.page,
            page_size: params.limit,
        });
    }

    let candidates = fetch_candidates(catalog, &params.criteria.categories).await?;
    let candidate_count = candidates.len();

    let filtered = match geocoder.filter(|_| locality_matters(params)) {
        Some(geocoder) => {
            let (broad, locality) = split_locality(&params.criteria);
            let narrowed = filter(candidates, &broad, now);
            let enriched = enrich_missing_localities(narrowed, geocoder).await;
            filter(enriched, &locality, now)
        }
        None => filter(candidates, &params.criteria, now),
    };

    let ranked = rank(filtered, Some(&params.caller));
    let page = paginate(ranked, params.page, params.limit)?;

    tracing::debug!(
        candidates = candidate_count,
        total = page.total,
        page = params.page,
        returned = page.data.len(),
        "discovery request served"
    );
    Ok(page)
}

/// Publishable events within `radius_km` of `origin`, closest first.
///
/// # Errors
///
/// Returns [`DiscoveryError::Catalog`] when candidate retrieval fails.
pub async fn discover_nearby<C: CatalogGateway>(
    catalog: &C,
    origin: Coordinates,
    radius_km: f64,
) -> Result<Vec<(Event, f64)>, DiscoveryError> {
    let events = catalog.all_events().await?;
    Ok(events_near(&events, origin, radius_km))
}

async fn fetch_candidates<C: CatalogGateway>(
    catalog: &C,
    categories: &[String],
) -> Result<Vec<Event>, DiscoveryError> {
    let events = if categories.is_empty() {
        catalog.all_events().await
    } else {
        catalog.search_by_categories(categories).await
    };
    events.map_err(|e| {
        tracing::warn!(error = %e, "event catalog retrieval failed");
        DiscoveryError::Catalog(e)
    })
}

fn locality_matters(params: &DiscoveryParams) -> bool {
    params.caller.city().is_some()
        || params.caller.country().is_some()
        || !params.criteria.city.trim().is_empty()
        || !params.criteria.country.trim().is_empty()
}

/// Splits criteria into everything but city/country, and city/country alone.
fn split_locality(criteria: &FilterCriteria) -> (FilterCriteria, FilterCriteria) {
    let broad = FilterCriteria {
        city: String::new(),
        country: String::new(),
        ..criteria.clone()
    };
    let locality = FilterCriteria {
        city: criteria.city.clone(),
        country: criteria.country.clone(),
        ..FilterCriteria::default()
    };
    (broad, locality)
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
