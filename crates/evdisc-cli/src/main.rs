mod browse;

use clap::{Parser, Subcommand};
use evdisc_client::DiscoveryApi;
use evdisc_core::Coordinates;
use tracing_subscriber::EnvFilter;

use crate::browse::BrowseArgs;

#[derive(Debug, Parser)]
#[command(name = "evdisc-cli")]
#[command(about = "Event discovery command line interface")]
struct Cli {
    /// Base URL of a running evdisc-server
    #[arg(long, env = "EVDISC_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, env = "EVDISC_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Page through discovery results
    Browse(BrowseArgs),
    /// Resolve an address into city and country
    Geocode {
        address: String,
        /// List up to five matching places instead of one resolution
        #[arg(long)]
        suggest: bool,
    },
    /// Events near a coordinate pair, closest first
    Nearby {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Search radius in kilometres (server default when omitted)
        #[arg(long)]
        radius_km: Option<f64>,
    },
    /// Check that the server is up
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        println!("evdisc-cli ready; run with --help for commands");
        return Ok(());
    };

    let api = DiscoveryApi::new(&cli.server, cli.timeout_secs)?;
    match command {
        Commands::Browse(args) => browse::run_browse(api, args).await?,
        Commands::Geocode { address, suggest } => run_geocode(&api, &address, suggest).await?,
        Commands::Nearby {
            lat,
            lng,
            radius_km,
        } => run_nearby(&api, Coordinates { lat, lng }, radius_km).await?,
        Commands::Health => {
            let report = api.health().await?;
            println!(
                "{}: {} events, places provider {}",
                report.status,
                report.catalog_events,
                if report.places_configured {
                    "configured"
                } else {
                    "not configured"
                }
            );
        }
    }

    Ok(())
}

async fn run_geocode(api: &DiscoveryApi, address: &str, suggest: bool) -> anyhow::Result<()> {
    if suggest {
        let suggestions = api.geocode_suggestions(address).await?;
        if suggestions.is_empty() {
            println!("no matches for '{address}'");
        }
        for s in suggestions {
            println!("{} ({:.4}, {:.4}) {}, {}", s.name, s.lat, s.lng, s.city, s.country);
        }
        return Ok(());
    }

    match api.geocode(address).await? {
        Some(locality) => println!("{}, {}", locality.city, locality.country),
        None => println!("no results for '{address}'"),
    }
    Ok(())
}

async fn run_nearby(
    api: &DiscoveryApi,
    origin: Coordinates,
    radius_km: Option<f64>,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        origin.is_valid(),
        "lat must be within ±90 and lng within ±180"
    );
    let events = api.nearby(origin, radius_km).await?;
    if events.is_empty() {
        println!("no events nearby");
    }
    for nearby in events {
        println!(
            "{:>7.1} km  {}",
            nearby.distance_km,
            browse::describe(&nearby.event)
        );
    }
    Ok(())
}
