use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{RouteCache, RouteLeg, TravelMode};
use crate::error::RouteFetchError;
use crate::fetch::{HttpClient, get_json};
use crate::geo::{Position, Projector};

/// Source of single-mode legs between two positions.
#[async_trait]
pub trait LegFetcher: Send + Sync {
    async fn fetch_leg(
        &self,
        origin: Position,
        destination: Position,
        mode: TravelMode,
    ) -> Result<RouteLeg, RouteFetchError>;
}

/// Client for an openrouteservice-style directions endpoint.
pub struct RouteClient<C> {
    client: C,
    base_url: Url,
    projector: Projector,
    cache: Option<RouteCache>,
}

impl<C: HttpClient> RouteClient<C> {
    /// `client` is expected to already carry the API key (see
    /// [`UrlParam`](crate::fetch::auth::UrlParam)).
    pub fn new(client: C, base_url: Url, projector: Projector) -> Self {
        Self {
            client,
            base_url,
            projector,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: RouteCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// `{base}/v2/directions/{profile}?start=lon,lat&end=lon,lat`
    pub fn leg_url(
        &self,
        origin: Position,
        destination: Position,
        mode: TravelMode,
    ) -> Result<Url, RouteFetchError> {
        let origin = self.projector.to_geographic(origin)?;
        let destination = self.projector.to_geographic(destination)?;

        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut url = base
            .join(&format!("v2/directions/{}", mode.profile()))
            .map_err(|e| RouteFetchError::Url(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("start", &origin.to_lon_lat())
            .append_pair("end", &destination.to_lon_lat());
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> LegFetcher for RouteClient<C> {
    #[tracing::instrument(skip(self))]
    async fn fetch_leg(
        &self,
        origin: Position,
        destination: Position,
        mode: TravelMode,
    ) -> Result<RouteLeg, RouteFetchError> {
        let url = self.leg_url(origin, destination, mode)?;
        let response = get_json(&self.client, url).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Routing service rejected request");
            return Err(RouteFetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let leg = parse_leg(mode, &body)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(mode, &body) {
                warn!(error = %e, "Failed to cache route leg");
            }
        }

        info!(points = leg.path().len(), "Route leg fetched");
        Ok(leg)
    }
}

#[derive(Deserialize)]
struct Directions {
    features: Vec<DirectionsFeature>,
}

#[derive(Deserialize)]
struct DirectionsFeature {
    geometry: Option<LineGeometry>,
}

#[derive(Deserialize)]
struct LineGeometry {
    coordinates: Vec<Value>,
}

/// Parses a directions response into a leg.
///
/// The service returns `[lon, lat]` pairs; the leg holds them as
/// (latitude, longitude). Only the first feature is used.
///
/// # Errors
///
/// [`RouteFetchError::EmptyPath`] when there is no feature or no coordinate,
/// [`RouteFetchError::InvalidPath`] when a coordinate is not a valid pair, and
/// [`RouteFetchError::InvalidBody`] when the body is not a feature collection.
pub fn parse_leg(mode: TravelMode, body: &[u8]) -> Result<RouteLeg, RouteFetchError> {
    let directions: Directions =
        serde_json::from_slice(body).map_err(|e| RouteFetchError::InvalidBody(e.to_string()))?;

    let Some(feature) = directions.features.into_iter().next() else {
        return Err(RouteFetchError::EmptyPath);
    };
    let coordinates = feature.geometry.map(|g| g.coordinates).unwrap_or_default();

    let path = coordinates
        .iter()
        .enumerate()
        .map(|(i, coordinate)| to_position(i, coordinate))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(mode = %mode, points = path.len(), "Parsed route leg");
    RouteLeg::new(mode, path)
}

fn to_position(index: usize, coordinate: &Value) -> Result<Position, RouteFetchError> {
    let invalid = || RouteFetchError::InvalidPath(format!("coordinate {index} is {coordinate}"));
    let pair = coordinate.as_array().ok_or_else(invalid)?;
    let (Some(longitude), Some(latitude)) = (
        pair.first().and_then(Value::as_f64),
        pair.get(1).and_then(Value::as_f64),
    ) else {
        return Err(invalid());
    };
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(invalid());
    }
    Ok(Position::geographic(latitude, longitude))
}
