//! `browse`: drives the client synchronization layer against the server.
//!
//! Filters start from an optional URL query, are patched from the command
//! line, and written back as the canonical query. Pages are pulled through
//! the infinite feed, one sentinel trigger per page.

use clap::Args;
use evdisc_client::{
    resolve_caller_location, Applied, DiscoveryApi, EventEnricher, FeedKey, FilterStore, History,
    InfiniteFeed, MemoryHistory, MemoryStore, UrlSync,
};
use evdisc_core::{CallerLocation, Coordinates, DateBucket, Event, FilterPatch, FormatSelector};

#[derive(Debug, Args)]
pub struct BrowseArgs {
    /// Existing discovery query to start from, e.g. `category=music&date=week`
    #[arg(long, default_value = "")]
    pub query: String,
    /// Category label; repeat for several
    #[arg(long = "category")]
    pub categories: Vec<String>,
    #[arg(long)]
    pub format: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long, value_parser = parse_date)]
    pub date: Option<DateBucket>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    /// Your latitude, for proximity ranking
    #[arg(long, allow_negative_numbers = true, requires = "lng")]
    pub lat: Option<f64>,
    /// Your longitude, for proximity ranking
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lng: Option<f64>,
    /// Resolve --lat/--lng into your city and country through the server
    #[arg(long, requires = "lat")]
    pub locate: bool,
    #[arg(long)]
    pub user_city: Option<String>,
    #[arg(long)]
    pub user_country: Option<String>,
    /// Fill in missing event city/country through the server's geocoder
    #[arg(long)]
    pub enrich: bool,
    /// Maximum pages to load
    #[arg(long, default_value = "3")]
    pub pages: usize,
    #[arg(long, default_value = "12")]
    pub page_size: usize,
}

impl BrowseArgs {
    pub(crate) fn patch(&self) -> FilterPatch {
        FilterPatch {
            categories: (!self.categories.is_empty()).then(|| self.categories.clone()),
            format: self.format.clone().map(FormatSelector::from),
            location: self.location.clone(),
            date: self.date,
            city: self.city.clone(),
            country: self.country.clone(),
            search: self.search.clone(),
        }
    }

    pub(crate) fn caller(&self) -> CallerLocation {
        CallerLocation {
            city: self.user_city.clone(),
            country: self.user_country.clone(),
            latitude: self.lat,
            longitude: self.lng,
        }
    }
}

fn parse_date(raw: &str) -> Result<DateBucket, String> {
    DateBucket::parse(raw).ok_or_else(|| format!("expected all, today, week or month, got '{raw}'"))
}

pub(crate) fn describe(event: &Event) -> String {
    let mut line = format!(
        "{}  {}  [{}] {}",
        event.starts_at.format("%a %d %b %H:%M"),
        event.title,
        event.format,
        event.location
    );
    let locality: Vec<&str> = [event.city.as_deref(), event.country.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
    if !locality.is_empty() {
        line.push_str(&format!(" ({})", locality.join(", ")));
    }
    line
}

pub(crate) async fn run_browse(api: DiscoveryApi, args: BrowseArgs) -> anyhow::Result<()> {
    let store = FilterStore::default();
    let mut sync = UrlSync::new(MemoryHistory::with_query(&args.query));
    sync.hydrate(&store);
    store.set_filters(args.patch());
    sync.write(&store.criteria());
    println!("filters: ?{}", sync.history().current_query());

    let caller = args.caller();
    if let Some(coords) = caller.coordinates() {
        anyhow::ensure!(
            coords.is_valid(),
            "lat must be within ±90 and lng within ±180"
        );
    }
    store.set_location(caller.clone());
    if let (true, Some(coords)) = (args.locate, caller.coordinates()) {
        locate(&api, coords, &store).await;
    }

    let enricher = args
        .enrich
        .then(|| EventEnricher::new(api.clone(), MemoryStore::default()));
    let mut feed = InfiniteFeed::new(api, args.page_size);
    let mut request = feed.set_key(FeedKey::from(&store.snapshot()));
    let mut shown = 0;

    for _ in 0..args.pages.max(1) {
        let Some(next) = request.take() else {
            break;
        };
        if feed.load(next).await == Applied::Discarded {
            break;
        }

        let view = feed.view();
        if let Some(error) = view.error {
            anyhow::bail!("discovery request failed: {error}");
        }
        if shown == 0 {
            println!("{} matching events", view.total.unwrap_or_default());
        }

        let fresh = view.items[shown..].to_vec();
        shown = view.items.len();
        let has_more = view.has_more;

        let fresh = match &enricher {
            Some(enricher) => enricher.enrich(fresh).await.events,
            None => fresh,
        };
        for event in &fresh {
            println!("{}", describe(event));
        }

        if !has_more {
            break;
        }
        // Everything rendered so far has been read; the sentinel is in view.
        request = feed.on_sentinel(0);
    }

    Ok(())
}

async fn locate(api: &DiscoveryApi, coords: Coordinates, store: &FilterStore) {
    match resolve_caller_location(api, coords, store).await {
        Ok(location) => println!(
            "you are in {}",
            [location.city(), location.country()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Err(e) => {
            tracing::warn!(error = %e, "could not resolve your location; ranking by coordinates");
        }
    }
}
