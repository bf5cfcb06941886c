use serde::Serialize;
use tracing::info;

use super::{LegFetcher, RouteLeg, TravelMode};
use crate::error::{Error, NoAvailableStationError};
use crate::filter::filter_rideable;
use crate::geo::{Position, Projector};
use crate::rank::rank;
use crate::station::Station;

/// A walk to the boarding station, a ride, and a walk from the alighting
/// station. The legs stay separate because each mode is drawn differently.
#[derive(Debug, Clone, Serialize)]
pub struct FullRoute {
    pub boarding: Station,
    pub alighting: Station,
    pub to_station: RouteLeg,
    pub between_stations: RouteLeg,
    pub from_station: RouteLeg,
}

impl FullRoute {
    pub fn legs(&self) -> [&RouteLeg; 3] {
        [&self.to_station, &self.between_stations, &self.from_station]
    }
}

/// Plans walk/bike/walk trips over a station snapshot.
pub struct Composer<F> {
    fetcher: F,
    projector: Projector,
    min_available: u32,
}

impl<F: LegFetcher> Composer<F> {
    /// Stations with `min_available` or fewer bikes or docks are never
    /// chosen as endpoints.
    pub fn new(fetcher: F, projector: Projector, min_available: u32) -> Self {
        Self {
            fetcher,
            projector,
            min_available,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Picks the stations nearest to `source` and `destination` and fetches
    /// the three legs between them, in travel order.
    ///
    /// # Errors
    ///
    /// [`NoAvailableStationError`] when no station clears the availability
    /// threshold; otherwise the first ranking or fetch error. Legs fetched
    /// before a failure are dropped.
    #[tracing::instrument(skip(self, stations), fields(station_count = stations.len()))]
    pub async fn compose_full_route(
        &self,
        stations: &[Station],
        source: Position,
        destination: Position,
    ) -> Result<FullRoute, Error> {
        let candidates = filter_rideable(stations, self.min_available)?;
        if candidates.is_empty() {
            return Err(NoAvailableStationError.into());
        }

        let boarding = nearest(&candidates, source, &self.projector)?;
        let alighting = nearest(&candidates, destination, &self.projector)?;
        info!(
            boarding = %boarding.kiosk_id,
            alighting = %alighting.kiosk_id,
            candidates = candidates.len(),
            "Route stations selected"
        );

        let to_station = self
            .fetcher
            .fetch_leg(source, boarding.position, TravelMode::Foot)
            .await?;
        let between_stations = self
            .fetcher
            .fetch_leg(boarding.position, alighting.position, TravelMode::Bike)
            .await?;
        let from_station = self
            .fetcher
            .fetch_leg(alighting.position, destination, TravelMode::Foot)
            .await?;

        Ok(FullRoute {
            boarding,
            alighting,
            to_station,
            between_stations,
            from_station,
        })
    }
}

fn nearest(
    candidates: &[Station],
    query: Position,
    projector: &Projector,
) -> Result<Station, Error> {
    let ranked = rank(candidates, query, 1, projector)?;
    ranked
        .nearest()
        .map(|entry| entry.station.clone())
        .ok_or_else(|| NoAvailableStationError.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::RouteFetchError;
    use crate::station::tests::station;

    /// Answers each call with a straight two-point leg, optionally failing
    /// the n-th call.
    #[derive(Default)]
    struct StraightLines {
        calls: Mutex<Vec<(Position, Position, TravelMode)>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl LegFetcher for StraightLines {
        async fn fetch_leg(
            &self,
            origin: Position,
            destination: Position,
            mode: TravelMode,
        ) -> Result<RouteLeg, RouteFetchError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((origin, destination, mode));
            if self.fail_on == Some(calls.len()) {
                return Err(RouteFetchError::EmptyPath);
            }
            RouteLeg::new(mode, vec![origin, destination])
        }
    }

    fn composer(fetcher: StraightLines) -> Composer<StraightLines> {
        Composer::new(fetcher, Projector::default(), 1)
    }

    const SOURCE: Position = Position::geographic(34.0400, -118.2600);
    const DESTINATION: Position = Position::geographic(34.0600, -118.2400);

    #[tokio::test]
    async fn test_only_eligible_station_is_used_for_both_ends() {
        let stations = vec![
            station("1", 34.0500, -118.2500, 10, 10),
            station("2", 34.0401, -118.2601, 0, 0),
        ];
        let composer = composer(StraightLines::default());
        let route = composer
            .compose_full_route(&stations, SOURCE, DESTINATION)
            .await
            .unwrap();

        assert_eq!(route.boarding.kiosk_id, "1");
        assert_eq!(route.alighting.kiosk_id, "1");
    }

    #[tokio::test]
    async fn test_no_eligible_station() {
        let stations = vec![
            station("1", 34.0500, -118.2500, 0, 10),
            station("2", 34.0401, -118.2601, 0, 0),
        ];
        let composer = composer(StraightLines::default());
        let result = composer
            .compose_full_route(&stations, SOURCE, DESTINATION)
            .await;

        assert!(matches!(result, Err(Error::NoAvailableStation(_))));
        assert!(composer.fetcher().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_legs_chain_in_travel_order() {
        let stations = vec![
            station("near-source", 34.0410, -118.2590, 5, 5),
            station("near-destination", 34.0590, -118.2410, 5, 5),
            station("middle", 34.0500, -118.2500, 5, 5),
        ];
        let composer = composer(StraightLines::default());
        let route = composer
            .compose_full_route(&stations, SOURCE, DESTINATION)
            .await
            .unwrap();

        assert_eq!(route.boarding.kiosk_id, "near-source");
        assert_eq!(route.alighting.kiosk_id, "near-destination");

        let modes: Vec<TravelMode> = route.legs().iter().map(|leg| leg.mode).collect();
        assert_eq!(
            modes,
            vec![TravelMode::Foot, TravelMode::Bike, TravelMode::Foot]
        );

        assert_eq!(route.to_station.start(), SOURCE);
        assert_eq!(route.to_station.end(), route.boarding.position);
        assert_eq!(route.between_stations.start(), route.boarding.position);
        assert_eq!(route.between_stations.end(), route.alighting.position);
        assert_eq!(route.from_station.start(), route.alighting.position);
        assert_eq!(route.from_station.end(), DESTINATION);
    }

    #[tokio::test]
    async fn test_failed_leg_aborts_composition() {
        let stations = vec![station("1", 34.0500, -118.2500, 10, 10)];
        let composer = composer(StraightLines {
            fail_on: Some(2),
            ..Default::default()
        });
        let result = composer
            .compose_full_route(&stations, SOURCE, DESTINATION)
            .await;

        assert!(matches!(
            result,
            Err(Error::RouteFetch(RouteFetchError::EmptyPath))
        ));
        // The walk from the alighting station is never requested.
        assert_eq!(composer.fetcher().calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_threshold_excludes_single_bike() {
        let stations = vec![
            station("one-bike", 34.0401, -118.2601, 1, 10),
            station("two-bikes", 34.0500, -118.2500, 2, 10),
        ];
        let composer = composer(StraightLines::default());
        let route = composer
            .compose_full_route(&stations, SOURCE, DESTINATION)
            .await
            .unwrap();
        assert_eq!(route.boarding.kiosk_id, "two-bikes");
    }
}
