//! Test helpers for common test setup and utilities.
//!
//! [`ScriptedBackend`] stands in for the dispatcher: tests script what each
//! endpoint returns and inspect how often it was called. Clones share state,
//! so a test keeps one handle while the world owns another.

use std::sync::{Arc, Mutex, MutexGuard};

use bevy_ecs::prelude::World;

use crate::backend::{
    AcceptOutcome, BackendError, CompletionReceipt, DispatchBackend, RemoteRide, RideOffer, RideRegistry,
};
use crate::config::{FieldUnitConfig, VehicleProfile};
use crate::ecs::{RideId, VehicleId};
use crate::geo::{Coordinate, EARTH_RADIUS_M};
use crate::runner::build_field_unit;

/// `meters` due north of `origin`, measured along the same sphere as
/// [`crate::geo::distance_m`].
pub fn offset_north(origin: Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(origin.lat + meters / EARTH_RADIUS_M.to_radians(), origin.lng)
}

/// How many times each endpoint was hit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub register: usize,
    pub pending_offers: usize,
    pub accept: usize,
    pub confirm_pickup: usize,
    pub complete: usize,
    pub ride_registry: usize,
    pub push_location: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.register
            + self.pending_offers
            + self.accept
            + self.confirm_pickup
            + self.complete
            + self.ride_registry
            + self.push_location
    }
}

#[derive(Debug)]
struct Script {
    offers: Vec<RideOffer>,
    registry: serde_json::Value,
    accept_outcome: AcceptOutcome,
    receipt: CompletionReceipt,
    offline: bool,
    calls: CallCounts,
    last_location: Option<Coordinate>,
    last_drop: Option<Coordinate>,
    accepted: Vec<RideId>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            offers: Vec::new(),
            registry: serde_json::json!({ "rides": [] }),
            accept_outcome: AcceptOutcome::Granted,
            receipt: CompletionReceipt {
                points: 10,
                drop_distance_m: Some(0.0),
                pending_review: false,
            },
            offline: false,
            calls: CallCounts::default(),
            last_location: None,
            last_drop: None,
            accepted: Vec::new(),
        }
    }
}

/// Scripted [`DispatchBackend`]. Every call is counted, including those made
/// while offline.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().expect("script lock poisoned")
    }

    pub fn set_offers(&self, offers: Vec<RideOffer>) {
        self.script().offers = offers;
    }

    pub fn set_registry(&self, rides: Vec<RemoteRide>) {
        let rides: Vec<_> = rides
            .iter()
            .map(|ride| serde_json::to_value(ride).expect("remote ride serializes"))
            .collect();
        self.script().registry = serde_json::json!({ "rides": rides });
    }

    /// Serves `body` verbatim from the registry endpoint.
    pub fn set_raw_registry(&self, body: serde_json::Value) {
        self.script().registry = body;
    }

    pub fn set_accept_outcome(&self, outcome: AcceptOutcome) {
        self.script().accept_outcome = outcome;
    }

    pub fn set_receipt(&self, receipt: CompletionReceipt) {
        self.script().receipt = receipt;
    }

    pub fn set_offline(&self, offline: bool) {
        self.script().offline = offline;
    }

    pub fn calls(&self) -> CallCounts {
        self.script().calls
    }

    pub fn last_location(&self) -> Option<Coordinate> {
        self.script().last_location
    }

    pub fn last_drop(&self) -> Option<Coordinate> {
        self.script().last_drop
    }

    pub fn accepted(&self) -> Vec<RideId> {
        self.script().accepted.clone()
    }

    fn call(&self, count: impl FnOnce(&mut CallCounts)) -> Result<MutexGuard<'_, Script>, BackendError> {
        let mut script = self.script();
        count(&mut script.calls);
        if script.offline {
            return Err(BackendError::Offline);
        }
        Ok(script)
    }
}

impl DispatchBackend for ScriptedBackend {
    fn register(&self, _profile: &VehicleProfile, position: Coordinate) -> Result<(), BackendError> {
        let mut script = self.call(|c| c.register += 1)?;
        script.last_location = Some(position);
        Ok(())
    }

    fn pending_offers(&self, _vehicle: &VehicleId) -> Result<Vec<RideOffer>, BackendError> {
        let script = self.call(|c| c.pending_offers += 1)?;
        Ok(script.offers.clone())
    }

    fn accept(&self, ride: &RideId, _vehicle: &VehicleId) -> Result<AcceptOutcome, BackendError> {
        let mut script = self.call(|c| c.accept += 1)?;
        if script.accept_outcome == AcceptOutcome::Granted {
            script.accepted.push(ride.clone());
        }
        Ok(script.accept_outcome)
    }

    fn confirm_pickup(&self, _ride: &RideId) -> Result<(), BackendError> {
        self.call(|c| c.confirm_pickup += 1)?;
        Ok(())
    }

    fn complete(&self, _ride: &RideId, drop: Coordinate) -> Result<CompletionReceipt, BackendError> {
        let mut script = self.call(|c| c.complete += 1)?;
        script.last_drop = Some(drop);
        Ok(script.receipt.clone())
    }

    fn ride_registry(&self) -> Result<RideRegistry, BackendError> {
        let script = self.call(|c| c.ride_registry += 1)?;
        RideRegistry::from_value(script.registry.clone()).map_err(|err| BackendError::Malformed(err.to_string()))
    }

    fn push_location(&self, _vehicle: &VehicleId, position: Coordinate) -> Result<(), BackendError> {
        let mut script = self.call(|c| c.push_location += 1)?;
        script.last_location = Some(position);
        Ok(())
    }
}

/// Create a field unit world with default configuration, backed by a clone of
/// `backend`.
pub fn create_test_world(backend: &ScriptedBackend) -> World {
    create_test_world_with(&FieldUnitConfig::default(), backend)
}

pub fn create_test_world_with(config: &FieldUnitConfig, backend: &ScriptedBackend) -> World {
    let mut world = World::new();
    build_field_unit(&mut world, config, Box::new(backend.clone()));
    world
}
