use std::sync::Arc;

use evdisc_core::{DateBucket, FilterPatch};

use super::*;

fn patch_search(term: &str) -> FilterPatch {
    FilterPatch {
        search: Some(term.to_string()),
        ..FilterPatch::default()
    }
}

#[test]
fn hydrate_reads_repeated_and_delimited_categories() {
    let store = FilterStore::default();
    let mut sync = UrlSync::new(MemoryHistory::with_query(
        "?category=Music&category=art,%20Tech&date=week&utm_source=mail",
    ));

    let criteria = sync.hydrate(&store);
    assert_eq!(criteria.categories, vec!["music", "art", "tech"]);
    assert_eq!(criteria.date, DateBucket::Week);
    assert_eq!(store.criteria(), criteria);
    assert_eq!(sync.phase(), SyncPhase::Synced);
}

#[test]
fn writes_are_deferred_until_hydrated() {
    let mut sync = UrlSync::new(MemoryHistory::with_query("category=music"));
    let outcome = sync.write(&FilterCriteria::default());

    assert_eq!(outcome, WriteOutcome::Deferred);
    assert_eq!(sync.history().current_query(), "category=music");
    assert_eq!(sync.history().replacements(), 0);
}

#[test]
fn identical_write_twice_mutates_history_once() {
    let store = FilterStore::default();
    let mut sync = UrlSync::new(MemoryHistory::default());
    sync.hydrate(&store);

    let criteria = FilterCriteria {
        city: "Lagos".to_string(),
        ..FilterCriteria::default()
    };
    assert_eq!(sync.write(&criteria), WriteOutcome::Replaced);
    assert_eq!(sync.write(&criteria), WriteOutcome::Unchanged);
    assert_eq!(sync.history().replacements(), 1);
    assert_eq!(sync.history().current_query(), "city=Lagos");
}

#[test]
fn equivalent_url_encoding_is_not_rewritten() {
    let store = FilterStore::default();
    let mut sync = UrlSync::new(MemoryHistory::with_query("location=all&category=Music"));
    let criteria = sync.hydrate(&store);

    assert_eq!(sync.write(&criteria), WriteOutcome::Unchanged);
    assert_eq!(sync.history().replacements(), 0);
}

#[test]
fn replace_preserves_scroll_offset() {
    let store = FilterStore::default();
    let mut history = MemoryHistory::default();
    history.set_scroll_offset(1_240);
    let mut sync = UrlSync::new(history);
    sync.hydrate(&store);

    sync.write(&FilterCriteria {
        search: "jazz".to_string(),
        ..FilterCriteria::default()
    });
    assert_eq!(sync.history().scroll_offset(), 1_240);
}

#[tokio::test(start_paused = true)]
async fn rapid_changes_collapse_into_one_write() {
    let store = Arc::new(FilterStore::default());
    let mut sync = UrlSync::new(MemoryHistory::default());
    sync.hydrate(&store);

    let changes = store.subscribe();
    let task = tokio::spawn(async move {
        sync.run(changes).await;
        sync
    });

    for term in ["j", "ja", "jaz", "jazz"] {
        store.set_filters(patch_search(term));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_millis(600)).await;

    drop(store);
    let sync = task.await.expect("sync task");
    assert_eq!(sync.history().replacements(), 1);
    assert_eq!(sync.history().current_query(), "search=jazz");
}

#[tokio::test(start_paused = true)]
async fn separate_quiet_periods_write_separately() {
    let store = Arc::new(FilterStore::default());
    let mut sync = UrlSync::new(MemoryHistory::default());
    sync.hydrate(&store);

    let changes = store.subscribe();
    let task = tokio::spawn(async move {
        sync.run(changes).await;
        sync
    });

    store.set_filters(patch_search("jazz"));
    tokio::time::sleep(Duration::from_millis(700)).await;
    store.set_filters(patch_search("afrobeat"));
    tokio::time::sleep(Duration::from_millis(700)).await;

    drop(store);
    let sync = task.await.expect("sync task");
    assert_eq!(sync.history().replacements(), 2);
    assert_eq!(sync.history().current_query(), "search=afrobeat");
}

#[tokio::test(start_paused = true)]
async fn pending_change_is_flushed_when_store_closes() {
    let store = Arc::new(FilterStore::default());
    let mut sync = UrlSync::new(MemoryHistory::default());
    sync.hydrate(&store);

    let changes = store.subscribe();
    let task = tokio::spawn(async move {
        sync.run(changes).await;
        sync
    });

    store.set_filters(patch_search("jazz"));
    tokio::task::yield_now().await;
    drop(store);

    let sync = task.await.expect("sync task");
    assert_eq!(sync.history().current_query(), "search=jazz");
}

#[tokio::test(start_paused = true)]
async fn run_before_hydrate_never_writes() {
    let store = Arc::new(FilterStore::default());
    let mut sync = UrlSync::new(MemoryHistory::with_query("category=music"));

    let changes = store.subscribe();
    let task = tokio::spawn(async move {
        sync.run(changes).await;
        sync
    });

    store.set_filters(patch_search("jazz"));
    tokio::time::sleep(Duration::from_secs(1)).await;
    drop(store);

    let sync = task.await.expect("sync task");
    assert_eq!(sync.history().replacements(), 0);
    assert_eq!(sync.history().current_query(), "category=music");
}
