//! CLI entry point for the bike-share router.
//!
//! Provides subcommands for refreshing the station snapshot, listing the
//! stations nearest a position, and planning walk/ride/walk trips.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bikeshare_router::config::Config;
use bikeshare_router::feed::{StationCache, StationFeed};
use bikeshare_router::fetch::BasicClient;
use bikeshare_router::fetch::auth::{UrlParam, WithHeaders};
use bikeshare_router::filter::{filter_by_bikes, filter_by_docks};
use bikeshare_router::geo::Position;
use bikeshare_router::output::{NearestReport, write_json, write_leg, write_report, write_route};
use bikeshare_router::rank::rank;
use bikeshare_router::route::{Composer, LegFetcher, RouteCache, RouteClient, TravelMode};
use bikeshare_router::station::StationSnapshot;
use clap::{Parser, Subcommand};
use reqwest::header::{HeaderValue, REFERER, USER_AGENT};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bikeshare_router")]
#[command(about = "Find bike-share stations and plan walk/ride/walk trips", long_about = None)]
struct Cli {
    /// Directory for the station snapshot (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for cached route legs (overrides ROUTES_DIR)
    #[arg(long, global = true)]
    routes_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the live station feed and refresh the local snapshot
    FetchStations,
    /// List the stations nearest a position
    Nearest {
        /// Latitude of the query position
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,

        /// Longitude of the query position
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,

        /// Also rank the stations nearest this destination (LAT,LON)
        #[arg(long, allow_hyphen_values = true)]
        dest: Option<Position>,

        /// Number of stations to list
        #[arg(short, long)]
        k: Option<usize>,

        /// Only keep stations with more than this many bikes
        #[arg(long)]
        min_bikes: Option<u32>,

        /// Only keep stations with more than this many free docks
        #[arg(long)]
        min_docks: Option<u32>,

        /// Use the cached snapshot without contacting the feed
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Plan a walk to a station, a ride, and a walk to the destination
    Route {
        /// Start position as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        from: Position,

        /// Destination as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        to: Position,

        /// Use the cached snapshot without contacting the feed
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Print JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Fetch a single walking or cycling leg
    Leg {
        /// Start position as LAT,LON
        #[arg(long, allow_hyphen_values = true, required_unless_present = "cached")]
        from: Option<Position>,

        /// Destination as LAT,LON
        #[arg(long, allow_hyphen_values = true, required_unless_present = "cached")]
        to: Option<Position>,

        /// foot or bike
        #[arg(long, default_value = "foot")]
        mode: TravelMode,

        /// Show the last cached leg for the mode instead of calling the service
        #[arg(long, default_value_t = false)]
        cached: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/bikeshare_router.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bikeshare_router.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = Config::env().context("Invalid configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.routes_dir {
        config.routes_dir = dir;
    }

    match cli.command {
        Commands::FetchStations => {
            let snapshot = station_feed(&config)?
                .fetch()
                .await
                .context("Failed to fetch station feed")?;
            let unavailable = snapshot
                .stations()
                .iter()
                .filter(|s| !s.bikes().is_ok_and(|b| b > 0))
                .count();
            if snapshot.is_empty() {
                warn!("Station feed returned no stations");
            }
            info!(
                stations = snapshot.len(),
                without_bikes = unavailable,
                dir = %config.data_dir.display(),
                "Station snapshot refreshed"
            );
        }
        Commands::Nearest {
            lat,
            lon,
            dest,
            k,
            min_bikes,
            min_docks,
            offline,
            json,
        } => {
            let query = match (lat, lon) {
                (Some(lat), Some(lon)) => Position::geographic(lat, lon),
                _ => config.default_position,
            };
            let k = k.unwrap_or(config.default_k);

            let snapshot = load_snapshot(&config, offline).await?;
            let mut stations = snapshot.stations().to_vec();
            if let Some(min) = min_bikes {
                stations = filter_by_bikes(&stations, min)?;
            }
            if let Some(min) = min_docks {
                stations = filter_by_docks(&stations, min)?;
            }

            let ranked = rank(&stations, query, k, &config.projector)?;
            let destination = dest
                .map(|dest| rank(&stations, dest, k, &config.projector))
                .transpose()?;
            let report = NearestReport::new(&ranked, destination.as_ref());
            info!(
                candidates = stations.len(),
                returned = ranked.len(),
                highlighted = report.highlighted.len(),
                "Stations ranked"
            );

            let stdout = std::io::stdout().lock();
            if json {
                write_json(stdout, &report)?;
            } else {
                write_report(stdout, &report)?;
            }
        }
        Commands::Route {
            from,
            to,
            offline,
            json,
        } => {
            let snapshot = load_snapshot(&config, offline).await?;
            let composer = Composer::new(
                route_client(&config)?,
                config.projector,
                config.availability_threshold,
            );
            let route = composer
                .compose_full_route(snapshot.stations(), from, to)
                .await
                .context("Failed to compose route")?;

            let stdout = std::io::stdout().lock();
            if json {
                write_json(stdout, &route)?;
            } else {
                write_route(stdout, &route)?;
            }
        }
        Commands::Leg {
            from,
            to,
            mode,
            cached,
        } => {
            let leg = if cached {
                let cache = RouteCache::new(&config.routes_dir);
                cache
                    .load(mode)
                    .with_context(|| format!("No usable cached {mode} leg"))?
            } else {
                let from = from.context("--from is required")?;
                let to = to.context("--to is required")?;
                route_client(&config)?
                    .fetch_leg(from, to, mode)
                    .await
                    .with_context(|| format!("Failed to fetch {mode} leg"))?
            };
            write_leg(std::io::stdout().lock(), &mode.to_string(), &leg)?;
        }
    }

    Ok(())
}

fn station_feed(config: &Config) -> Result<StationFeed<WithHeaders<BasicClient>>> {
    let client = WithHeaders::new(BasicClient::new(config.request_timeout)?)
        .header(
            USER_AGENT,
            HeaderValue::from_str(&config.feed_user_agent).context("Invalid feed user agent")?,
        )
        .header(
            REFERER,
            HeaderValue::from_str(&config.feed_referer).context("Invalid feed referer")?,
        );
    Ok(StationFeed::new(client, config.feed_url.clone())
        .with_cache(StationCache::new(&config.data_dir)))
}

fn route_client(config: &Config) -> Result<RouteClient<UrlParam<BasicClient>>> {
    let key = config.require_api_key()?.to_string();
    let client = UrlParam::api_key(BasicClient::new(config.request_timeout)?, key);
    Ok(
        RouteClient::new(client, config.routing_base_url.clone(), config.projector)
            .with_cache(RouteCache::new(&config.routes_dir)),
    )
}

/// Live snapshot when reachable, otherwise the last cached one.
#[tracing::instrument(skip(config))]
async fn load_snapshot(config: &Config, offline: bool) -> Result<StationSnapshot> {
    let cache = StationCache::new(&config.data_dir);
    if offline {
        return cache.load().context("No cached station snapshot");
    }

    match station_feed(config)?.fetch().await {
        Ok(snapshot) => Ok(snapshot),
        Err(e) => {
            warn!(error = %e, "Live station feed unavailable, using cached snapshot");
            cache
                .load()
                .context("Station feed failed and no cached snapshot is available")
        }
    }
}
