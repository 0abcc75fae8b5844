mod api;
mod middleware;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use evdisc_discovery::StaticCatalog;
use evdisc_geo::{PlaceSearch, PlacesClient};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState, RateLimits};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = evdisc_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let catalog = StaticCatalog::load(&config.catalog_path).with_context(|| {
        format!(
            "failed to load event catalog from {}",
            config.catalog_path.display()
        )
    })?;
    tracing::info!(
        events = catalog.len(),
        path = %config.catalog_path.display(),
        "event catalog loaded"
    );

    let places = match &config.places_api_key {
        Some(key) => {
            let client = PlacesClient::with_base_url(
                key,
                config.geo_request_timeout_secs,
                &config.places_base_url,
            )?
            .with_retry_policy(config.geo_max_retries, config.geo_retry_backoff_base_ms);
            Some(Arc::new(PlaceSearch::new(
                client,
                config.autocomplete_cache_capacity,
                Duration::from_secs(config.autocomplete_cache_ttl_secs),
            )))
        }
        None => {
            tracing::warn!(
                "EVDISC_PLACES_API_KEY not set; place and geocode endpoints will report unavailable"
            );
            None
        }
    };

    let state = AppState {
        catalog: Arc::new(catalog),
        places,
        default_page_size: config.default_page_size,
    };
    let app = build_app(state, RateLimits::from_config(&config));

    tracing::info!(addr = %config.bind_addr, env = %config.env, "evdisc-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
