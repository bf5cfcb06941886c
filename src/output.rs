//! Plain renderings of stations, rankings and routes for the calling layer.
//!
//! Supports a flat CSV export of a snapshot, aligned text tables, and JSON.

use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::error::CacheError;
use crate::rank::{RankedSet, highlighted};
use crate::route::{FullRoute, RouteLeg};
use crate::station::{AvailabilityTier, Station};

/// One CSV row per station; nested fields are flattened.
#[derive(Debug, Serialize)]
struct StationRow<'a> {
    kiosk_id: &'a str,
    name: &'a str,
    address_street: Option<&'a str>,
    address_city: Option<&'a str>,
    address_state: Option<&'a str>,
    address_zip_code: Option<&'a str>,
    latitude: f64,
    longitude: f64,
    bikes_available: Option<u32>,
    classic_bikes_available: Option<u32>,
    smart_bikes_available: Option<u32>,
    electric_bikes_available: Option<u32>,
    docks_available: Option<u32>,
    kiosk_public_status: &'a str,
    open_time: Option<&'a str>,
    close_time: Option<&'a str>,
}

impl<'a> From<&'a Station> for StationRow<'a> {
    fn from(s: &'a Station) -> Self {
        Self {
            kiosk_id: &s.kiosk_id,
            name: &s.name,
            address_street: s.address.street.as_deref(),
            address_city: s.address.city.as_deref(),
            address_state: s.address.state.as_deref(),
            address_zip_code: s.address.zip_code.as_deref(),
            latitude: s.position.latitude,
            longitude: s.position.longitude,
            bikes_available: s.bikes_available.get(),
            classic_bikes_available: s.classic_bikes_available.get(),
            smart_bikes_available: s.smart_bikes_available.get(),
            electric_bikes_available: s.electric_bikes_available.get(),
            docks_available: s.docks_available.get(),
            kiosk_public_status: s.status.as_str(),
            open_time: s.open_time.as_deref(),
            close_time: s.close_time.as_deref(),
        }
    }
}

/// Writes the whole snapshot to `path`, replacing any previous export.
pub fn write_stations_csv(path: &Path, stations: &[Station]) -> Result<(), CacheError> {
    debug!(path = %path.display(), rows = stations.len(), "Writing station CSV");
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for station in stations {
        writer.serialize(StationRow::from(station))?;
    }
    writer.flush()?;
    Ok(())
}

/// Ranked station as shown to a user.
#[derive(Debug, Serialize)]
pub struct StationView<'a> {
    pub rank: usize,
    pub kiosk_id: &'a str,
    pub name: &'a str,
    pub distance_m: f64,
    pub bikes_available: Option<u32>,
    pub docks_available: Option<u32>,
    pub status: &'a str,
    pub tier: AvailabilityTier,
}

pub fn station_views<'a>(set: &'a RankedSet<'_>) -> Vec<StationView<'a>> {
    set.iter()
        .enumerate()
        .map(|(i, entry)| StationView {
            rank: i + 1,
            kiosk_id: &entry.station.kiosk_id,
            name: &entry.station.name,
            distance_m: entry.distance.as_meters(),
            bikes_available: entry.station.bikes_available.get(),
            docks_available: entry.station.docks_available.get(),
            status: entry.station.status.as_str(),
            tier: entry.station.tier(),
        })
        .collect()
}

fn count(value: Option<u32>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

pub fn write_ranked<W: Write>(mut out: W, set: &RankedSet<'_>) -> std::io::Result<()> {
    writeln!(
        out,
        "Nearest stations to {:.5}, {:.5}",
        set.query.latitude, set.query.longitude
    )?;
    for view in station_views(set) {
        writeln!(
            out,
            "{:>3}. {:<8} {:<40} {:>8.0} m  bikes {:>3}  docks {:>3}  {:?}",
            view.rank,
            view.kiosk_id,
            view.name,
            view.distance_m,
            count(view.bikes_available),
            count(view.docks_available),
            view.tier,
        )?;
    }
    Ok(())
}

/// Origin ranking, an optional destination ranking, and the stations to
/// highlight across both.
#[derive(Debug, Serialize)]
pub struct NearestReport<'s, 'a> {
    pub origin: &'s RankedSet<'a>,
    pub destination: Option<&'s RankedSet<'a>>,
    pub highlighted: Vec<&'a str>,
}

impl<'s, 'a> NearestReport<'s, 'a> {
    pub fn new(origin: &'s RankedSet<'a>, destination: Option<&'s RankedSet<'a>>) -> Self {
        let mut sets = vec![origin];
        sets.extend(destination);
        let highlighted = highlighted(&sets)
            .into_iter()
            .map(|station| station.kiosk_id.as_str())
            .collect();
        Self {
            origin,
            destination,
            highlighted,
        }
    }
}

pub fn write_report<W: Write>(mut out: W, report: &NearestReport<'_, '_>) -> std::io::Result<()> {
    write_ranked(&mut out, report.origin)?;
    if let Some(destination) = report.destination {
        writeln!(out)?;
        write_ranked(&mut out, destination)?;
        writeln!(out, "Highlighted: {}", report.highlighted.join(", "))?;
    }
    Ok(())
}

pub fn write_leg<W: Write>(mut out: W, label: &str, leg: &RouteLeg) -> std::io::Result<()> {
    writeln!(out, "{label} [{}], {} points", leg.mode, leg.path().len())?;
    for point in leg.path() {
        writeln!(out, "  {:.6}, {:.6}", point.latitude, point.longitude)?;
    }
    Ok(())
}

pub fn write_route<W: Write>(mut out: W, route: &FullRoute) -> std::io::Result<()> {
    writeln!(
        out,
        "Board at {} ({}), leave at {} ({})",
        route.boarding.name, route.boarding.kiosk_id, route.alighting.name, route.alighting.kiosk_id
    )?;
    write_leg(&mut out, "Walk to station", &route.to_station)?;
    write_leg(&mut out, "Ride", &route.between_stations)?;
    write_leg(&mut out, "Walk to destination", &route.from_station)?;
    Ok(())
}

pub fn write_json<W: Write, T: Serialize + ?Sized>(mut out: W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
