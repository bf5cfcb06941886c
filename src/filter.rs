//! Availability filtering.
//!
//! A station is retained only when its count is strictly greater than the
//! threshold. Stations whose count is missing or not numeric fail the whole
//! call instead of being dropped.

use crate::error::MalformedStationError;
use crate::station::Station;

/// Keeps stations with more than `min_count` bikes available, in input order.
pub fn filter_by_bikes(
    stations: &[Station],
    min_count: u32,
) -> Result<Vec<Station>, MalformedStationError> {
    retain_above(stations, min_count, Station::bikes)
}

/// Keeps stations with more than `min_count` docks available, in input order.
pub fn filter_by_docks(
    stations: &[Station],
    min_count: u32,
) -> Result<Vec<Station>, MalformedStationError> {
    retain_above(stations, min_count, Station::docks)
}

/// Keeps stations that clear the threshold for both bikes and docks.
///
/// Both counts are checked on every station, so a malformed dock count is
/// reported even when the station has no bikes.
pub fn filter_rideable(
    stations: &[Station],
    min_count: u32,
) -> Result<Vec<Station>, MalformedStationError> {
    retain_above(stations, min_count, |station| {
        Ok(station.bikes()?.min(station.docks()?))
    })
}

fn retain_above<F>(
    stations: &[Station],
    min_count: u32,
    count: F,
) -> Result<Vec<Station>, MalformedStationError>
where
    F: Fn(&Station) -> Result<u32, MalformedStationError>,
{
    let mut kept = Vec::with_capacity(stations.len());
    for station in stations {
        if count(station)? > min_count {
            kept.push(station.clone());
        }
    }
    tracing::debug!(
        total = stations.len(),
        kept = kept.len(),
        min_count,
        "Availability filter applied"
    );
    Ok(kept)
}
