//! Station records as published by the bike-share station feed.
//!
//! The feed is a GeoJSON feature collection; each feature carries one kiosk
//! in its `properties` and the kiosk location as a `[lon, lat]` point.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{FeedError, MalformedReason, MalformedStationError};
use crate::geo::Position;

/// A numeric availability field as it appeared in the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Count {
    Known(u32),
    #[default]
    Missing,
    Invalid(String),
}

impl Count {
    pub fn get(&self) -> Option<u32> {
        match self {
            Count::Known(value) => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn require(
        &self,
        kiosk_id: &str,
        field: &'static str,
    ) -> Result<u32, MalformedStationError> {
        match self {
            Count::Known(value) => Ok(*value),
            Count::Missing => Err(MalformedStationError::new(
                Some(kiosk_id),
                field,
                MalformedReason::Missing,
            )),
            Count::Invalid(_) => Err(MalformedStationError::new(
                Some(kiosk_id),
                field,
                MalformedReason::NotNumeric,
            )),
        }
    }
}

impl From<u32> for Count {
    fn from(value: u32) -> Self {
        Count::Known(value)
    }
}

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Null => Count::Missing,
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Count::Known)
                .unwrap_or_else(|| Count::Invalid(n.to_string())),
            Value::String(s) => s
                .trim()
                .parse()
                .map(Count::Known)
                .unwrap_or(Count::Invalid(s)),
            other => Count::Invalid(other.to_string()),
        })
    }
}

impl Serialize for Count {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Count::Known(value) => serializer.serialize_some(value),
            _ => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KioskStatus {
    Active,
    Unavailable,
    Other(String),
    #[default]
    Unknown,
}

impl From<&str> for KioskStatus {
    fn from(value: &str) -> Self {
        if value.contains("Active") {
            KioskStatus::Active
        } else if value.contains("Unavailable") {
            KioskStatus::Unavailable
        } else {
            KioskStatus::Other(value.to_string())
        }
    }
}

impl<'de> Deserialize<'de> for KioskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value
            .as_deref()
            .map(KioskStatus::from)
            .unwrap_or(KioskStatus::Unknown))
    }
}

impl Serialize for KioskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl KioskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            KioskStatus::Active => "Active",
            KioskStatus::Unavailable => "Unavailable",
            KioskStatus::Other(value) => value,
            KioskStatus::Unknown => "",
        }
    }
}

/// Marker class a renderer uses to colour a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityTier {
    /// Active with more than five bikes and five docks.
    Plenty,
    /// Active with at least two bikes and two docks.
    Some,
    Low,
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub kiosk_id: String,
    pub name: String,
    pub address: Address,
    pub position: Position,
    pub bikes_available: Count,
    pub docks_available: Count,
    pub classic_bikes_available: Count,
    pub smart_bikes_available: Count,
    pub electric_bikes_available: Count,
    pub status: KioskStatus,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
}

impl Station {
    pub fn bikes(&self) -> Result<u32, MalformedStationError> {
        self.bikes_available.require(&self.kiosk_id, "bikesAvailable")
    }

    pub fn docks(&self) -> Result<u32, MalformedStationError> {
        self.docks_available.require(&self.kiosk_id, "docksAvailable")
    }

    pub fn tier(&self) -> AvailabilityTier {
        let (Some(bikes), Some(docks)) = (self.bikes_available.get(), self.docks_available.get())
        else {
            return AvailabilityTier::Unknown;
        };
        match self.status {
            KioskStatus::Active if bikes > 5 && docks > 5 => AvailabilityTier::Plenty,
            KioskStatus::Active if bikes >= 2 && docks >= 2 => AvailabilityTier::Some,
            KioskStatus::Active | KioskStatus::Unavailable => AvailabilityTier::Low,
            _ => AvailabilityTier::Unknown,
        }
    }
}

/// Immutable set of stations from one fetch cycle.
#[derive(Debug, Clone)]
pub struct StationSnapshot {
    pub taken_at: DateTime<Utc>,
    pub stations: Vec<Station>,
}

impl StationSnapshot {
    pub fn new(taken_at: DateTime<Utc>, stations: Vec<Station>) -> Self {
        Self { taken_at, stations }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    properties: Properties,
}

#[derive(Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Properties {
    kiosk_id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    address_street: Option<String>,
    address_city: Option<String>,
    address_state: Option<String>,
    address_zip_code: Option<Value>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    bikes_available: Count,
    #[serde(default)]
    docks_available: Count,
    #[serde(default)]
    classic_bikes_available: Count,
    #[serde(default)]
    smart_bikes_available: Count,
    #[serde(default)]
    electric_bikes_available: Count,
    #[serde(default)]
    kiosk_public_status: KioskStatus,
    open_time: Option<String>,
    close_time: Option<String>,
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn station_from_feature(feature: Feature) -> Result<Station, MalformedStationError> {
    let props = feature.properties;
    let kiosk_id = props.kiosk_id.and_then(value_to_string).ok_or_else(|| {
        MalformedStationError::new(None, "kioskId", MalformedReason::Missing)
    })?;

    // Geometry is [lon, lat]; the flat properties are a fallback.
    let position = match feature.geometry.as_ref().map(|g| g.coordinates.as_slice()) {
        Some([longitude, latitude, ..]) => Position::geographic(*latitude, *longitude),
        _ => match (props.latitude, props.longitude) {
            (Some(latitude), Some(longitude)) => Position::geographic(latitude, longitude),
            _ => {
                return Err(MalformedStationError::new(
                    Some(&kiosk_id),
                    "geometry",
                    MalformedReason::Missing,
                ));
            }
        },
    };

    Ok(Station {
        name: props.name.unwrap_or_default(),
        address: Address {
            street: props.address_street,
            city: props.address_city,
            state: props.address_state,
            zip_code: props.address_zip_code.and_then(value_to_string),
        },
        position,
        bikes_available: props.bikes_available,
        docks_available: props.docks_available,
        classic_bikes_available: props.classic_bikes_available,
        smart_bikes_available: props.smart_bikes_available,
        electric_bikes_available: props.electric_bikes_available,
        status: props.kiosk_public_status,
        open_time: props.open_time,
        close_time: props.close_time,
        kiosk_id,
    })
}

/// Parses a station feed body into station records, in feed order.
///
/// # Errors
///
/// Fails if the body is not a feature collection, if a feature lacks an id or
/// a location, or if two features share a kiosk id.
pub fn parse_stations(bytes: &[u8]) -> Result<Vec<Station>, FeedError> {
    let collection: FeatureCollection = serde_json::from_slice(bytes)?;
    let mut seen = HashSet::with_capacity(collection.features.len());
    let mut stations = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let station = station_from_feature(feature)?;
        if !seen.insert(station.kiosk_id.clone()) {
            return Err(MalformedStationError::new(
                Some(&station.kiosk_id),
                "kioskId",
                MalformedReason::DuplicateId,
            )
            .into());
        }
        stations.push(station);
    }
    Ok(stations)
}
