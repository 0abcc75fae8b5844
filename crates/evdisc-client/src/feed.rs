//! Infinite-scroll result feed.
//!
//! The feed is keyed by the full `(criteria, caller location)` pair. A key
//! change resets to page one and drops pages accumulated for the old key,
//! while the old list stays visible (marked stale) until the new first page
//! lands. Every request carries a ticket; a response whose ticket is not the
//! one currently awaited is discarded, so a late answer for an old key never
//! reaches the view. First pages are remembered per key for a short
//! freshness window, inside which re-activating a key costs no request.
//! After a failure the feed requests nothing more until [`InfiniteFeed::retry`].

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use evdisc_core::{CallerLocation, DiscoveryParams, Event, FilterCriteria, RankedPage};
use tokio::time::Instant;

use crate::error::ClientError;
use crate::store::FilterState;

pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(30);

/// How far below the viewport (in pixels) the sentinel may be and still
/// trigger the next page.
pub const DEFAULT_PREFETCH_MARGIN_PX: u32 = 800;

pub trait PageFetcher: Sync {
    fn fetch_page(
        &self,
        params: &DiscoveryParams,
    ) -> impl Future<Output = Result<RankedPage, ClientError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedKey {
    pub criteria: FilterCriteria,
    pub location: CallerLocation,
}

impl From<&FilterState> for FeedKey {
    fn from(state: &FilterState) -> Self {
        Self {
            criteria: state.criteria.clone(),
            location: state.location.clone(),
        }
    }
}

impl FeedKey {
    #[must_use]
    pub fn params(&self, page: usize, limit: usize) -> DiscoveryParams {
        DiscoveryParams {
            page,
            limit,
            criteria: self.criteria.clone(),
            caller: self.location.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    page: usize,
}

impl Ticket {
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub ticket: Ticket,
    pub params: DiscoveryParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// The response was for a key or page no longer awaited.
    Discarded,
}

/// What the list should render right now.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedView<'a> {
    pub items: &'a [Event],
    pub total: Option<usize>,
    pub has_more: bool,
    pub loading: bool,
    /// The items belong to the previous key.
    pub stale: bool,
    pub error: Option<&'a str>,
}

struct CachedFirstPage {
    page: RankedPage,
    fetched_at: Instant,
}

pub struct InfiniteFeed<F> {
    fetcher: F,
    page_size: usize,
    freshness: Duration,
    prefetch_margin_px: u32,
    generation: u64,
    key: Option<FeedKey>,
    items: Vec<Event>,
    total: Option<usize>,
    has_more: bool,
    next_page: usize,
    in_flight: Option<Ticket>,
    failure: Option<String>,
    stale: bool,
    first_pages: HashMap<String, CachedFirstPage>,
}

impl<F: PageFetcher> InfiniteFeed<F> {
    #[must_use]
    pub fn new(fetcher: F, page_size: usize) -> Self {
        Self {
            fetcher,
            page_size: page_size.max(1),
            freshness: DEFAULT_FRESHNESS,
            prefetch_margin_px: DEFAULT_PREFETCH_MARGIN_PX,
            generation: 0,
            key: None,
            items: Vec::new(),
            total: None,
            has_more: false,
            next_page: 1,
            in_flight: None,
            failure: None,
            stale: false,
            first_pages: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    #[must_use]
    pub fn with_prefetch_margin(mut self, margin_px: u32) -> Self {
        self.prefetch_margin_px = margin_px;
        self
    }

    #[must_use]
    pub fn view(&self) -> FeedView<'_> {
        FeedView {
            items: &self.items,
            total: self.total,
            has_more: self.has_more,
            loading: self.in_flight.is_some(),
            stale: self.stale,
            error: self.failure.as_deref(),
        }
    }

    #[must_use]
    pub fn key(&self) -> Option<&FeedKey> {
        self.key.as_ref()
    }

    /// Switches to `key`. Returns the first-page request unless fresh data
    /// for the key is already cached.
    pub fn set_key(&mut self, key: FeedKey) -> Option<PageRequest> {
        if self.key.as_ref() == Some(&key) {
            return self.activate();
        }

        self.generation += 1;
        self.key = Some(key);
        self.in_flight = None;
        self.failure = None;
        self.total = None;
        self.has_more = false;
        self.next_page = 1;

        if self.restore_fresh_first_page() {
            return None;
        }
        self.stale = !self.items.is_empty();
        self.request(1)
    }

    /// Re-activation of the current key (e.g. a remount). Requests a
    /// revalidation only once the cached first page has gone stale.
    pub fn activate(&mut self) -> Option<PageRequest> {
        if self.key.is_none() || self.in_flight.is_some() || self.failure.is_some() {
            return None;
        }
        if self.fresh_first_page().is_some() {
            tracing::debug!("feed data still fresh, skipping request");
            return None;
        }
        self.request(1)
    }

    /// Called as the sentinel moves; `distance_px` is how far it sits below
    /// the viewport (0 when visible).
    pub fn on_sentinel(&mut self, distance_px: u32) -> Option<PageRequest> {
        if distance_px > self.prefetch_margin_px
            || self.key.is_none()
            || self.in_flight.is_some()
            || self.failure.is_some()
            || self.next_page == 1
            || !self.has_more
        {
            return None;
        }
        self.request(self.next_page)
    }

    /// Clears a failure and re-requests the page that failed.
    pub fn retry(&mut self) -> Option<PageRequest> {
        if self.key.is_none() || self.in_flight.is_some() {
            return None;
        }
        self.failure.take()?;
        self.request(self.next_page)
    }

    /// Applies a response if `ticket` is the one currently awaited.
    pub fn apply(&mut self, ticket: Ticket, result: Result<RankedPage, ClientError>) -> Applied {
        if self.in_flight != Some(ticket) {
            tracing::debug!(
                page = ticket.page,
                generation = ticket.generation,
                current = self.generation,
                "discarding response for superseded request"
            );
            return Applied::Discarded;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                if ticket.page == 1 {
                    self.remember_first_page(&page);
                    self.total = Some(page.total);
                    self.items = page.data;
                } else {
                    self.items.extend(page.data);
                }
                self.has_more = page.has_more;
                self.next_page = ticket.page + 1;
                self.stale = false;
            }
            Err(e) => {
                tracing::warn!(page = ticket.page, error = %e, "feed page request failed");
                if ticket.page == 1 {
                    self.items.clear();
                    self.total = None;
                    self.stale = false;
                }
                self.failure = Some(e.to_string());
            }
        }
        Applied::Applied
    }

    /// Fetches `request` and applies the result.
    pub async fn load(&mut self, request: PageRequest) -> Applied {
        let result = self.fetcher.fetch_page(&request.params).await;
        self.apply(request.ticket, result)
    }

    fn request(&mut self, page: usize) -> Option<PageRequest> {
        let params = self.key.as_ref()?.params(page, self.page_size);
        let ticket = Ticket {
            generation: self.generation,
            page,
        };
        self.in_flight = Some(ticket);
        Some(PageRequest { ticket, params })
    }

    fn cache_key(&self) -> Option<String> {
        self.key
            .as_ref()
            .map(|key| key.params(1, self.page_size).to_query())
    }

    fn fresh_first_page(&self) -> Option<&CachedFirstPage> {
        let cached = self.first_pages.get(&self.cache_key()?)?;
        (cached.fetched_at.elapsed() < self.freshness).then_some(cached)
    }

    fn restore_fresh_first_page(&mut self) -> bool {
        let Some(page) = self.fresh_first_page().map(|cached| cached.page.clone()) else {
            return false;
        };
        self.total = Some(page.total);
        self.has_more = page.has_more;
        self.items = page.data;
        self.next_page = 2;
        self.stale = false;
        true
    }

    fn remember_first_page(&mut self, page: &RankedPage) {
        let Some(cache_key) = self.cache_key() else {
            return;
        };
        let freshness = self.freshness;
        self.first_pages
            .retain(|_, cached| cached.fetched_at.elapsed() < freshness);
        self.first_pages.insert(
            cache_key,
            CachedFirstPage {
                page: page.clone(),
                fetched_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
#[path = "feed_test.rs"]
mod tests;
