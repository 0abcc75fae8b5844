//! Two-way sync between the filter store and the address bar.
//!
//! The sync starts [`SyncPhase::Uninitialized`]. [`UrlSync::hydrate`] reads
//! the URL into the store and moves it to [`SyncPhase::Synced`]; until then
//! every write is deferred, so a page opened from a shared link cannot
//! overwrite that link with empty criteria. After hydration, store changes
//! are written back once they have been quiet for the debounce period. Writes
//! replace the current history entry, keep the scroll offset, and are skipped
//! when the URL already encodes the same criteria.

use std::time::Duration;

use evdisc_core::{decode_criteria, encode_criteria, FilterCriteria};
use tokio::sync::watch;

use crate::store::{FilterState, FilterStore};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// The address-bar surface.
pub trait History: Send {
    /// Current query string, without the leading `?`.
    fn current_query(&self) -> String;

    /// Replaces the current history entry's query. Never pushes.
    fn replace_query(&mut self, query: &str);

    fn scroll_offset(&self) -> u32;

    fn set_scroll_offset(&mut self, offset: u32);
}

/// In-process history used by the CLI and tests.
///
/// Like a browser, a replace resets the scroll offset to the top.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    query: String,
    scroll: u32,
    replacements: usize,
}

impl MemoryHistory {
    #[must_use]
    pub fn with_query(query: &str) -> Self {
        Self {
            query: query.trim_start_matches('?').to_string(),
            ..Self::default()
        }
    }

    /// Number of history mutations so far.
    #[must_use]
    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl History for MemoryHistory {
    fn current_query(&self) -> String {
        self.query.clone()
    }

    fn replace_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.scroll = 0;
        self.replacements += 1;
    }

    fn scroll_offset(&self) -> u32 {
        self.scroll
    }

    fn set_scroll_offset(&mut self, offset: u32) {
        self.scroll = offset;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Uninitialized,
    Synced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Hydration has not completed; nothing was written.
    Deferred,
    /// The URL already encodes these criteria.
    Unchanged,
    Replaced,
}

pub struct UrlSync<H> {
    history: H,
    phase: SyncPhase,
    debounce: Duration,
}

impl<H: History> UrlSync<H> {
    #[must_use]
    pub fn new(history: H) -> Self {
        Self {
            history,
            phase: SyncPhase::Uninitialized,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    #[must_use]
    pub fn history(&self) -> &H {
        &self.history
    }

    /// Reads criteria from the URL into `store` and enables writes.
    pub fn hydrate(&mut self, store: &FilterStore) -> FilterCriteria {
        let criteria = decode_criteria(&self.history.current_query());
        store.replace_criteria(criteria.clone());
        self.phase = SyncPhase::Synced;
        tracing::debug!(query = %encode_criteria(&criteria), "hydrated filters from URL");
        criteria
    }

    /// Writes `criteria` to the URL immediately.
    pub fn write(&mut self, criteria: &FilterCriteria) -> WriteOutcome {
        if self.phase == SyncPhase::Uninitialized {
            return WriteOutcome::Deferred;
        }

        let encoded = encode_criteria(criteria);
        let current = encode_criteria(&decode_criteria(&self.history.current_query()));
        if encoded == current {
            return WriteOutcome::Unchanged;
        }

        let scroll = self.history.scroll_offset();
        self.history.replace_query(&encoded);
        self.history.set_scroll_offset(scroll);
        tracing::debug!(query = %encoded, "wrote filters to URL");
        WriteOutcome::Replaced
    }

    /// Writes store changes back to the URL after each quiet period.
    ///
    /// `changes` should be subscribed after [`UrlSync::hydrate`] so the
    /// hydrated criteria do not count as a change. Returns when the store is
    /// dropped, flushing any pending change first.
    pub async fn run(&mut self, mut changes: watch::Receiver<FilterState>) {
        while changes.changed().await.is_ok() {
            let open = self.settle(&mut changes).await;
            let criteria = changes.borrow_and_update().criteria.clone();
            self.write(&criteria);
            if !open {
                return;
            }
        }
    }

    /// Waits until no change has arrived for one debounce period. Returns
    /// `false` if the store went away meanwhile.
    async fn settle(&self, changes: &mut watch::Receiver<FilterState>) -> bool {
        loop {
            match tokio::time::timeout(self.debounce, changes.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => return false,
                Err(_) => return true,
            }
        }
    }
}

#[cfg(test)]
#[path = "url_sync_test.rs"]
mod tests;
