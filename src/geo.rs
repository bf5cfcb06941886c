use std::{cmp, f64::consts::FRAC_PI_4, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;

/// Spherical radius used by Web Mercator.
const EARTH_RADIUS_M: f64 = 6_378_137.0;
/// Latitude at which Web Mercator turns the world into a square.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Reference frame a [`Position`] is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frame {
    /// WGS 84 latitude/longitude in degrees (EPSG:4326).
    Geographic,
    /// Spherical Web Mercator in meters (EPSG:3857).
    WebMercator,
}

impl Frame {
    pub const fn code(&self) -> &'static str {
        match self {
            Frame::Geographic => "EPSG:4326",
            Frame::WebMercator => "EPSG:3857",
        }
    }

    pub const fn is_planar(&self) -> bool {
        matches!(self, Frame::WebMercator)
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Frame {
    type Err = ProjectionError;

    /// Accepts `EPSG:4326`, `epsg:3857` and the colon-less `EPSG3857` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(':', "");
        match normalized.as_str() {
            "EPSG4326" | "WGS84" => Ok(Frame::Geographic),
            "EPSG3857" | "EPSG900913" => Ok(Frame::WebMercator),
            _ => Err(ProjectionError::UnknownFrame(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl Serialize for Distance {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl Distance {
    pub const fn from_meters(distance: f64) -> Self {
        Self(distance)
    }

    pub const fn as_meters(&self) -> f64 {
        self.0
    }

    pub fn total_cmp(&self, other: &Self) -> cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// A coordinate pair tagged with its frame.
///
/// In a planar frame `latitude` holds the northing and `longitude` the
/// easting, both in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub frame: Frame,
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}, {} ({})",
            self.latitude, self.longitude, self.frame
        ))
    }
}

impl FromStr for Position {
    type Err = String;

    /// Parses `LAT,LON` in the geographic frame.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LON but got `{s}`"))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|e| format!("invalid latitude `{lat}`: {e}"))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|e| format!("invalid longitude `{lon}`: {e}"))?;
        Ok(Position::geographic(latitude, longitude))
    }
}

impl Position {
    pub const fn geographic(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            frame: Frame::Geographic,
        }
    }

    pub const fn new(latitude: f64, longitude: f64, frame: Frame) -> Self {
        Self {
            latitude,
            longitude,
            frame,
        }
    }

    /// Straight-line distance. Only meaningful when both positions share a
    /// planar frame.
    pub fn euclidean_distance(&self, other: &Self) -> Distance {
        debug_assert_eq!(self.frame, other.frame);
        Distance::from_meters(f64::hypot(
            self.latitude - other.latitude,
            self.longitude - other.longitude,
        ))
    }

    /// Service-side `lon,lat` ordering.
    pub fn to_lon_lat(&self) -> String {
        format!("{},{}", self.longitude, self.latitude)
    }
}

/// Converts positions between the display frame and the planar frame used
/// for distance math.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projector {
    geographic: Frame,
    planar: Frame,
}

impl Default for Projector {
    fn default() -> Self {
        Self {
            geographic: Frame::Geographic,
            planar: Frame::WebMercator,
        }
    }
}

impl Projector {
    /// Builds a projector from CRS codes, rejecting codes that are unknown or
    /// play the wrong role.
    pub fn from_codes(geographic: &str, planar: &str) -> Result<Self, ProjectionError> {
        let geo_frame: Frame = geographic.parse()?;
        let planar_frame: Frame = planar.parse()?;
        if geo_frame.is_planar() {
            return Err(ProjectionError::UnknownFrame(format!(
                "{geographic} is not a geographic frame"
            )));
        }
        if !planar_frame.is_planar() {
            return Err(ProjectionError::UnknownFrame(format!(
                "{planar} is not a planar frame"
            )));
        }
        Ok(Self {
            geographic: geo_frame,
            planar: planar_frame,
        })
    }

    pub fn project(&self, position: Position, target: Frame) -> Result<Position, ProjectionError> {
        if !position.latitude.is_finite() || !position.longitude.is_finite() {
            return Err(ProjectionError::NonFinite);
        }
        match (position.frame, target) {
            (source, target) if source == target => Ok(position),
            (Frame::Geographic, Frame::WebMercator) => to_web_mercator(position),
            (Frame::WebMercator, Frame::Geographic) => Ok(from_web_mercator(position)),
            (source, _) => Err(ProjectionError::UnknownFrame(source.to_string())),
        }
    }

    pub fn to_planar(&self, position: Position) -> Result<Position, ProjectionError> {
        self.project(position, self.planar)
    }

    pub fn to_geographic(&self, position: Position) -> Result<Position, ProjectionError> {
        self.project(position, self.geographic)
    }
}

fn to_web_mercator(position: Position) -> Result<Position, ProjectionError> {
    if position.latitude.abs() > MAX_MERCATOR_LATITUDE {
        return Err(ProjectionError::OutOfBounds {
            latitude: position.latitude,
        });
    }
    let x = EARTH_RADIUS_M * position.longitude.to_radians();
    let y = EARTH_RADIUS_M * f64::ln(f64::tan(FRAC_PI_4 + position.latitude.to_radians() / 2.0));
    Ok(Position::new(y, x, Frame::WebMercator))
}

fn from_web_mercator(position: Position) -> Position {
    let longitude = (position.longitude / EARTH_RADIUS_M).to_degrees();
    let latitude =
        (2.0 * f64::atan(f64::exp(position.latitude / EARTH_RADIUS_M)) - 2.0 * FRAC_PI_4)
            .to_degrees();
    Position::geographic(latitude, longitude)
}
