//! Walking and cycling legs from the external directions service, and the
//! three-leg walk/ride/walk composition built on top of them.

mod cache;
mod client;
mod compose;

pub use cache::RouteCache;
pub use client::{LegFetcher, RouteClient, parse_leg};
pub use compose::{Composer, FullRoute};

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::RouteFetchError;
use crate::geo::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Foot,
    Bike,
}

impl TravelMode {
    /// Directions-service profile for this mode.
    pub const fn profile(&self) -> &'static str {
        match self {
            TravelMode::Foot => "foot-walking",
            TravelMode::Bike => "cycling-regular",
        }
    }
}

impl Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TravelMode::Foot => f.write_str("foot"),
            TravelMode::Bike => f.write_str("bike"),
        }
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "foot" | "walk" | "foot-walking" => Ok(TravelMode::Foot),
            "bike" | "cycle" | "cycling-regular" => Ok(TravelMode::Bike),
            _ => Err(format!("unknown travel mode `{s}`, expected foot or bike")),
        }
    }
}

/// One continuous single-mode segment, as (latitude, longitude) points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteLeg {
    pub mode: TravelMode,
    path: Vec<Position>,
}

impl RouteLeg {
    /// Builds a leg, refusing an empty path.
    pub fn new(mode: TravelMode, path: Vec<Position>) -> Result<Self, RouteFetchError> {
        if path.is_empty() {
            return Err(RouteFetchError::EmptyPath);
        }
        Ok(Self { mode, path })
    }

    /// Always holds at least one point.
    pub fn path(&self) -> &[Position] {
        &self.path
    }

    pub fn start(&self) -> Position {
        self.path[0]
    }

    pub fn end(&self) -> Position {
        self.path[self.path.len() - 1]
    }
}
