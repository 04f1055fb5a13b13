//! Remote ride registry: the reconciliation source.
//!
//! The registry response is parsed once into JSON objects. A ride's fields are
//! only ever read from the object whose `rideID` matches, so a status or
//! vehicle id belonging to a neighbouring ride can never leak into the view of
//! the tracked one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::wire::lenient_f64;
use crate::ecs::{RideId, VehicleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    Pending,
    Accepted,
    Pickup,
    Completed,
    PendingReview,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl RemoteStatus {
    /// The ride has been dropped off, whether or not the drop is under review.
    pub fn is_finished(self) -> bool {
        matches!(self, RemoteStatus::Completed | RemoteStatus::PendingReview)
    }
}

/// Who the backend says the ride belongs to, from this unit's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Assignment {
    Unassigned,
    ThisUnit,
    Other(String),
}

/// The fields of one registry entry the unit cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRide {
    #[serde(rename = "rideID")]
    pub ride_id: RideId,
    pub status: RemoteStatus,
    #[serde(rename = "rickshawID", default, skip_serializing_if = "Option::is_none")]
    pub assigned_vehicle: Option<String>,
    #[serde(rename = "pickupBlock", default, skip_serializing_if = "Option::is_none")]
    pub pickup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(
        rename = "dropDistance",
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub drop_distance_m: Option<f64>,
}

impl RemoteRide {
    pub fn new(ride_id: RideId, status: RemoteStatus) -> Self {
        Self {
            ride_id,
            status,
            assigned_vehicle: None,
            pickup: None,
            destination: None,
            points: None,
            drop_distance_m: None,
        }
    }

    pub fn assigned_to(mut self, vehicle: &str) -> Self {
        self.assigned_vehicle = Some(vehicle.to_string());
        self
    }

    pub fn with_route(mut self, pickup: &str, destination: &str) -> Self {
        self.pickup = Some(pickup.to_string());
        self.destination = Some(destination.to_string());
        self
    }

    pub fn assignment(&self, me: &VehicleId) -> Assignment {
        match self.assigned_vehicle.as_deref().map(str::trim) {
            None | Some("") => Assignment::Unassigned,
            Some(id) if id == me.as_str() => Assignment::ThisUnit,
            Some(id) => Assignment::Other(id.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry response has no ride list")]
    Shape,

    #[error("registry entry for ride {ride_id} is malformed: {source}")]
    Entry {
        ride_id: RideId,
        #[source]
        source: serde_json::Error,
    },
}

/// A parsed registry poll.
#[derive(Debug, Clone, Default)]
pub struct RideRegistry {
    entries: Vec<Value>,
}

impl RideRegistry {
    /// Accepts either `{"rides": [...]}` or a bare array.
    pub fn from_value(body: Value) -> Result<Self, RegistryError> {
        let entries = match body {
            Value::Array(entries) => entries,
            Value::Object(mut map) => match map.remove("rides") {
                Some(Value::Array(entries)) => entries,
                _ => return Err(RegistryError::Shape),
            },
            _ => return Err(RegistryError::Shape),
        };
        Ok(Self { entries })
    }

    pub fn from_rides(rides: &[RemoteRide]) -> Self {
        let entries = rides
            .iter()
            .filter_map(|ride| serde_json::to_value(ride).ok())
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the view of `ride_id`, built only from its own object.
    pub fn find(&self, ride_id: &RideId) -> Result<Option<RemoteRide>, RegistryError> {
        let Some(entry) = self.entries.iter().find(|entry| entry_id(entry).as_ref() == Some(ride_id)) else {
            return Ok(None);
        };
        RemoteRide::deserialize(entry)
            .map(Some)
            .map_err(|source| RegistryError::Entry {
                ride_id: ride_id.clone(),
                source,
            })
    }

    /// Every well-formed entry the backend currently assigns to `me`.
    pub fn assigned_to<'a>(&'a self, me: &'a VehicleId) -> impl Iterator<Item = RemoteRide> + 'a {
        self.entries
            .iter()
            .filter_map(|entry| RemoteRide::deserialize(entry).ok())
            .filter(move |ride| ride.assignment(me) == Assignment::ThisUnit)
    }
}

fn entry_id(entry: &Value) -> Option<RideId> {
    let raw = entry.as_object()?.get("rideID")?;
    RideId::deserialize(raw).ok()
}
