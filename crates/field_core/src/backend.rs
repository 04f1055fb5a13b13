//! Dispatch backend abstraction.
//!
//! The unit talks to the dispatcher through [`DispatchBackend`]. The HTTP
//! implementation lives in [`http`]; tests use the scripted double in
//! `test_helpers`. The backend is stored as a boxed ECS resource, constructed
//! once at startup.

pub mod error;
pub mod http;
pub mod registry;
mod wire;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

pub use error::BackendError;
pub use http::HttpBackend;
pub use registry::{Assignment, RegistryError, RemoteRide, RemoteStatus, RideRegistry};

use crate::config::VehicleProfile;
use crate::ecs::{RideId, VehicleId};
use crate::geo::Coordinate;

/// A ride proposed to this vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideOffer {
    #[serde(rename = "rideID")]
    pub ride_id: RideId,
    #[serde(rename = "pickupBlock", default)]
    pub pickup: String,
    #[serde(default)]
    pub destination: String,
    /// Trip length as quoted by the dispatcher, in kilometres.
    #[serde(
        rename = "distance",
        default,
        deserialize_with = "wire::lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub distance_km: Option<f64>,
}

impl RideOffer {
    pub fn new(ride_id: impl Into<RideId>, pickup: &str, destination: &str) -> Self {
        Self {
            ride_id: ride_id.into(),
            pickup: pickup.to_string(),
            destination: destination.to_string(),
            distance_km: None,
        }
    }

    /// Points the operator can expect, as shown with the offer.
    pub fn points_estimate(&self) -> &'static str {
        match self.distance_km {
            Some(km) if km <= 2.0 => "10",
            Some(km) if km <= 5.0 => "8-10",
            _ => "5-10",
        }
    }
}

/// Backend verdict on a local accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    Granted,
    /// Another vehicle claimed the ride first.
    Taken,
}

/// What the backend returns for a drop-off.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionReceipt {
    pub points: u32,
    /// Distance between the reported drop and the requested destination.
    pub drop_distance_m: Option<f64>,
    /// The drop was accepted but flagged for manual review.
    pub pending_review: bool,
}

/// Synchronous request/response view of the dispatcher.
pub trait DispatchBackend: Send + Sync {
    fn register(&self, profile: &VehicleProfile, position: Coordinate) -> Result<(), BackendError>;

    fn pending_offers(&self, vehicle: &VehicleId) -> Result<Vec<RideOffer>, BackendError>;

    fn accept(&self, ride: &RideId, vehicle: &VehicleId) -> Result<AcceptOutcome, BackendError>;

    fn confirm_pickup(&self, ride: &RideId) -> Result<(), BackendError>;

    fn complete(&self, ride: &RideId, drop: Coordinate) -> Result<CompletionReceipt, BackendError>;

    fn ride_registry(&self) -> Result<RideRegistry, BackendError>;

    fn push_location(&self, vehicle: &VehicleId, position: Coordinate) -> Result<(), BackendError>;
}

/// ECS resource wrapping a boxed backend.
#[derive(Resource)]
pub struct BackendResource(pub Box<dyn DispatchBackend>);
