//! Nearest-station ranking.
//!
//! Distances are straight lines in the planar frame. The station set is a
//! few hundred kiosks, so every call projects and sorts the whole set.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::ProjectionError;
use crate::geo::{Distance, Position, Projector};
use crate::station::Station;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RankedStation<'a> {
    pub station: &'a Station,
    #[serde(rename = "distance_m")]
    pub distance: Distance,
}

/// The `k` stations closest to a query, nearest first.
///
/// Equal distances keep the order the stations had in the input.
#[derive(Debug, Clone, Serialize)]
pub struct RankedSet<'a> {
    pub query: Position,
    entries: Vec<RankedStation<'a>>,
}

impl<'a> RankedSet<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn nearest(&self) -> Option<&RankedStation<'a>> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedStation<'a>> {
        self.entries.iter()
    }

    /// Whether the station is part of the set, used to highlight markers.
    pub fn contains(&self, kiosk_id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.station.kiosk_id == kiosk_id)
    }
}

/// Ranks `stations` by planar distance to `query` and keeps the first `k`.
///
/// A `k` larger than the station count returns every station.
///
/// # Errors
///
/// Fails if the query or any station position cannot be projected.
pub fn rank<'a>(
    stations: &'a [Station],
    query: Position,
    k: usize,
    projector: &Projector,
) -> Result<RankedSet<'a>, ProjectionError> {
    let query_geo = projector.to_geographic(query)?;
    if k == 0 {
        return Ok(RankedSet {
            query: query_geo,
            entries: Vec::new(),
        });
    }

    let origin = projector.to_planar(query)?;
    let mut entries = stations
        .iter()
        .map(|station| {
            let planar = projector.to_planar(station.position)?;
            Ok(RankedStation {
                station,
                distance: origin.euclidean_distance(&planar),
            })
        })
        .collect::<Result<Vec<_>, ProjectionError>>()?;

    // `sort_by` is stable, which gives ties their input order.
    entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    entries.truncate(k);

    if let Some(first) = entries.first() {
        tracing::debug!(
            candidates = stations.len(),
            k,
            nearest = %first.station.kiosk_id,
            distance_m = first.distance.as_meters(),
            "Stations ranked"
        );
    }

    Ok(RankedSet {
        query: query_geo,
        entries,
    })
}

/// Stations present in any of `sets`, each once, in first-seen order.
///
/// Origin and destination rankings share this list for marker highlighting.
pub fn highlighted<'a>(sets: &[&RankedSet<'a>]) -> Vec<&'a Station> {
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut stations = Vec::new();
    for set in sets {
        for entry in set.iter() {
            let station: &'a Station = entry.station;
            if seen.insert(station.kiosk_id.as_str()) {
                stations.push(station);
            }
        }
    }
    stations
}
