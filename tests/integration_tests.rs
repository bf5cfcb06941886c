use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bikeshare_router::Error;
use bikeshare_router::error::RouteFetchError;
use bikeshare_router::fetch::{BasicClient, HttpClient};
use bikeshare_router::filter::{filter_by_bikes, filter_rideable};
use bikeshare_router::geo::{Position, Projector};
use bikeshare_router::rank::rank;
use bikeshare_router::route::{
    Composer, LegFetcher, RouteCache, RouteClient, RouteLeg, TravelMode, parse_leg,
};
use bikeshare_router::station::{Count, Station, parse_stations};
use reqwest::{Request, Response};

const DOWNTOWN: Position = Position::geographic(34.04919, -118.24799);

fn fixture_stations() -> Vec<Station> {
    parse_stations(include_bytes!("fixtures/stations.json")).expect("Failed to parse stations")
}

fn ids(stations: &[Station]) -> Vec<&str> {
    stations.iter().map(|s| s.kiosk_id.as_str()).collect()
}

#[test]
fn test_parse_station_feed() {
    let stations = fixture_stations();
    assert_eq!(
        ids(&stations),
        vec!["3005", "3006", "3007", "3008", "3010", "3014"]
    );

    let flower = &stations[0];
    assert_eq!(flower.name, "7th & Flower");
    assert_eq!(flower.address.zip_code.as_deref(), Some("90017"));
    assert_eq!(flower.position, Position::geographic(34.0485, -118.25854));

    // Numeric strings in the feed are accepted as counts.
    assert_eq!(stations[4].bikes_available, Count::Known(7));
    assert_eq!(stations[1].address.zip_code.as_deref(), Some("90014"));
}

#[test]
fn test_nearest_pipeline() {
    let stations = fixture_stations();
    let ranked = rank(&stations, DOWNTOWN, 3, &Projector::default()).unwrap();

    let order: Vec<&str> = ranked.iter().map(|e| e.station.kiosk_id.as_str()).collect();
    assert_eq!(order, vec!["3007", "3006", "3005"]);

    let nearest = ranked.nearest().unwrap();
    assert!((nearest.distance.as_meters() - 754.87).abs() < 1.0);
}

#[test]
fn test_filter_then_rank_never_returns_empty_station() {
    let stations = fixture_stations();
    let with_bikes = filter_by_bikes(&stations, 0).unwrap();
    assert!(!ids(&with_bikes).contains(&"3006"));

    let ranked = rank(&with_bikes, DOWNTOWN, stations.len(), &Projector::default()).unwrap();
    assert_eq!(ranked.len(), with_bikes.len());
    assert!(!ranked.contains("3006"));

    let distances: Vec<f64> = ranked.iter().map(|e| e.distance.as_meters()).collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_rideable_threshold() {
    let stations = fixture_stations();
    let rideable = filter_rideable(&stations, 1).unwrap();
    // 3006 has no bikes, 3008 a single free dock.
    assert_eq!(ids(&rideable), vec!["3005", "3007", "3010", "3014"]);
}

#[test]
fn test_parse_route_fixture() {
    let leg = parse_leg(TravelMode::Foot, include_bytes!("fixtures/route_foot.json")).unwrap();
    assert_eq!(leg.path().len(), 5);
    assert_eq!(leg.start(), Position::geographic(34.0466, -118.2665));
    assert_eq!(leg.end(), Position::geographic(34.0485, -118.25854));
}

/// Records requested legs and answers with a straight line.
#[derive(Default)]
struct RecordingFetcher {
    calls: Mutex<Vec<TravelMode>>,
}

#[async_trait]
impl LegFetcher for RecordingFetcher {
    async fn fetch_leg(
        &self,
        origin: Position,
        destination: Position,
        mode: TravelMode,
    ) -> Result<RouteLeg, RouteFetchError> {
        self.calls.lock().unwrap().push(mode);
        RouteLeg::new(mode, vec![origin, destination])
    }
}

#[tokio::test]
async fn test_compose_route_over_snapshot() {
    let stations = fixture_stations();
    let composer = Composer::new(RecordingFetcher::default(), Projector::default(), 1);

    // Figueroa & 9th is closest to the source but has a single free dock.
    let source = Position::geographic(34.0466, -118.2665);
    let destination = Position::geographic(34.0560, -118.2370);
    let route = composer
        .compose_full_route(&stations, source, destination)
        .await
        .unwrap();

    assert_eq!(route.boarding.kiosk_id, "3005");
    assert_eq!(route.alighting.kiosk_id, "3014");
    assert_eq!(route.to_station.start(), source);
    assert_eq!(route.from_station.end(), destination);
    assert_eq!(
        *composer.fetcher().calls.lock().unwrap(),
        vec![TravelMode::Foot, TravelMode::Bike, TravelMode::Foot]
    );
}

#[tokio::test]
async fn test_compose_route_without_bikes() {
    let stations: Vec<Station> = fixture_stations()
        .into_iter()
        .map(|mut s| {
            s.bikes_available = Count::Known(0);
            s
        })
        .collect();
    let composer = Composer::new(RecordingFetcher::default(), Projector::default(), 1);

    let result = composer
        .compose_full_route(&stations, DOWNTOWN, DOWNTOWN)
        .await;
    assert!(matches!(result, Err(Error::NoAvailableStation(_))));
    assert!(composer.fetcher().calls.lock().unwrap().is_empty());
}

/// Serves canned responses in order and keeps the requested URLs.
struct ScriptedClient {
    responses: Mutex<VecDeque<(u16, &'static str)>>,
    urls: Mutex<Vec<reqwest::Url>>,
}

impl ScriptedClient {
    fn new(responses: &[(u16, &'static str)]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().copied().collect()),
            urls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.urls.lock().unwrap().push(req.url().clone());
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted response left");
        let response = http::Response::builder()
            .status(status)
            .body(body)
            .unwrap();
        Ok(Response::from(response))
    }
}

#[tokio::test]
async fn test_route_client_fetches_and_caches_leg() {
    let dir = std::env::temp_dir().join("bikeshare_router_it_routes");
    let _ = std::fs::remove_dir_all(&dir);
    let cache = RouteCache::new(&dir);

    let body = include_str!("fixtures/route_foot.json");
    let client = ScriptedClient::new(&[(200, body)]);
    let routes = RouteClient::new(
        client,
        "https://api.openrouteservice.org".parse().unwrap(),
        Projector::default(),
    )
    .with_cache(cache.clone());

    let origin = Position::geographic(34.0466, -118.2665);
    let destination = Position::geographic(34.0485, -118.25854);
    let leg = routes
        .fetch_leg(origin, destination, TravelMode::Foot)
        .await
        .unwrap();
    assert_eq!(leg.path().len(), 5);

    let cached = cache.load(TravelMode::Foot).unwrap();
    assert_eq!(cached, leg);
    assert!(cache.load(TravelMode::Bike).is_err());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_route_client_sends_lon_lat() {
    let client = ScriptedClient::new(&[(200, include_str!("fixtures/route_foot.json"))]);
    let routes = RouteClient::new(
        client,
        "https://api.openrouteservice.org".parse().unwrap(),
        Projector::default(),
    );
    let url = routes
        .leg_url(
            Position::geographic(34.0466, -118.2665),
            Position::geographic(34.0485, -118.25854),
            TravelMode::Bike,
        )
        .unwrap();

    assert_eq!(url.path(), "/v2/directions/cycling-regular");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
        pairs,
        vec![
            ("start".to_string(), "-118.2665,34.0466".to_string()),
            ("end".to_string(), "-118.25854,34.0485".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_route_client_surfaces_service_errors() {
    let client = ScriptedClient::new(&[(500, "upstream failure")]);
    let routes = RouteClient::new(
        client,
        "https://api.openrouteservice.org".parse().unwrap(),
        Projector::default(),
    );
    let result = routes
        .fetch_leg(DOWNTOWN, DOWNTOWN, TravelMode::Foot)
        .await;
    assert!(matches!(
        result,
        Err(RouteFetchError::Status { status: 500, .. })
    ));
}

fn local_routes(addr: std::net::SocketAddr, timeout: Duration) -> RouteClient<BasicClient> {
    RouteClient::new(
        BasicClient::new(timeout).unwrap(),
        format!("http://{addr}").parse().unwrap(),
        Projector::default(),
    )
}

#[tokio::test]
async fn test_unanswered_request_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept connections and hold them open without ever replying.
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let routes = local_routes(addr, Duration::from_millis(500));
    let started = Instant::now();
    let result = routes
        .fetch_leg(DOWNTOWN, DOWNTOWN, TravelMode::Foot)
        .await;

    assert!(matches!(result, Err(RouteFetchError::Timeout)));
    assert!(started.elapsed() < Duration::from_secs(5));
    server.abort();
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let routes = local_routes(addr, Duration::from_secs(5));
    let result = routes
        .fetch_leg(DOWNTOWN, DOWNTOWN, TravelMode::Bike)
        .await;

    assert!(matches!(result, Err(RouteFetchError::Network(_))));
}
