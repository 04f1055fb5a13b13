//! Core of the ride-dispatch field unit: geospatial model, ride state machine,
//! backend client, registry reconciliation and the tick schedule that ties
//! them together.

pub mod backend;
pub mod clock;
pub mod command;
pub mod config;
pub mod ecs;
pub mod geo;
pub mod reconcile;
pub mod ride;
pub mod runner;
pub mod systems;
pub mod telemetry;
pub mod waypoints;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
