//! Identifiers and the vehicle aggregate shared by every system.

use std::fmt;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geo::Coordinate;

/// Backend ride identifier. The dispatcher emits numeric ids, but strings are
/// accepted so the unit keeps working if the registry switches to opaque ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RideId(String);

impl RideId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for RideId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for RideId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Serialize for RideId {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<u64>() {
            Ok(numeric) => ser.serialize_u64(numeric),
            Err(_) => ser.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for RideId {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Numeric(u64),
            Text(String),
        }

        let id = match Raw::deserialize(de)? {
            Raw::Numeric(n) => RideId::from(n),
            Raw::Text(s) => RideId::new(s),
        };
        if id.is_empty() {
            return Err(serde::de::Error::custom("empty ride id"));
        }
        Ok(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The tracked vehicle: where it is and what it has earned.
#[derive(Debug, Clone, Resource)]
pub struct VehicleState {
    pub id: VehicleId,
    pub position: Coordinate,
    points: u32,
}

impl VehicleState {
    pub fn new(id: VehicleId, position: Coordinate) -> Self {
        Self {
            id,
            position,
            points: 0,
        }
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    /// Adds backend-awarded points. Points never decrease.
    pub fn award(&mut self, points: u32) -> u32 {
        self.points = self.points.saturating_add(points);
        self.points
    }
}
