//! Field unit configuration.
//!
//! Every section has working defaults so the unit can start with no file at
//! all; a JSON file may override any subset of fields.

use std::path::Path;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::CallSite;
use crate::ecs::VehicleId;
use crate::geo::{Coordinate, ARRIVAL_EPSILON_M, PROXIMITY_THRESHOLD_M};
use crate::waypoints::CUET_CAMPUS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Identity announced to the backend at registration.
#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleProfile {
    pub vehicle_id: VehicleId,
    pub operator_name: String,
    pub phone_number: String,
    /// Where the simulated vehicle starts.
    pub start_position: Coordinate,
}

impl Default for VehicleProfile {
    fn default() -> Self {
        Self {
            vehicle_id: VehicleId("RICK001".to_string()),
            operator_name: "Abdul Karim".to_string(),
            phone_number: "01712345678".to_string(),
            start_position: CUET_CAMPUS.position,
        }
    }
}

#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL including the API prefix, e.g. `http://10.0.0.5:3000/api`.
    pub base_url: String,
    pub request_timeout_ms: u64,
    /// Accepting is contended, so it gets a longer budget.
    pub accept_timeout_ms: u64,
    /// How many recent rides the registry poll asks for.
    pub registry_limit: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api".to_string(),
            request_timeout_ms: 3_000,
            accept_timeout_ms: 5_000,
            registry_limit: 10,
        }
    }
}

/// Minimum interval between calls, per call-site (milliseconds).
#[derive(Debug, Clone, Copy, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub location_push_ms: u64,
    pub offer_discovery_ms: u64,
    pub assignment_watch_ms: u64,
    /// Watching a pending offer for a remote accept.
    pub acceptance_watch_ms: u64,
    /// Watching an active ride; faster because staleness while driving costs more.
    pub status_watch_ms: u64,
    pub movement_step_ms: u64,
    pub submit_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            location_push_ms: 5_000,
            offer_discovery_ms: 3_000,
            assignment_watch_ms: 2_000,
            acceptance_watch_ms: 2_000,
            status_watch_ms: 1_500,
            movement_step_ms: 1_000,
            submit_ms: 1_000,
        }
    }
}

impl PollingConfig {
    pub fn interval_ms(&self, site: CallSite) -> u64 {
        match site {
            CallSite::LocationPush => self.location_push_ms,
            CallSite::OfferDiscovery => self.offer_discovery_ms,
            CallSite::AssignmentWatch => self.assignment_watch_ms,
            CallSite::AcceptanceWatch => self.acceptance_watch_ms,
            CallSite::StatusWatch => self.status_watch_ms,
            CallSite::MovementStep => self.movement_step_ms,
            CallSite::AcceptSubmit | CallSite::PickupSubmit | CallSite::CompleteSubmit => self.submit_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub speed_kmh: f64,
    pub arrival_epsilon_m: f64,
    pub proximity_threshold_m: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed_kmh: 15.0,
            arrival_epsilon_m: ARRIVAL_EPSILON_M,
            proximity_threshold_m: PROXIMITY_THRESHOLD_M,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldUnitConfig {
    pub vehicle: VehicleProfile,
    pub backend: BackendConfig,
    pub polling: PollingConfig,
    pub motion: MotionConfig,
    /// Host tick period.
    pub tick_ms: u64,
}

impl FieldUnitConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vehicle.vehicle_id.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid("vehicle_id must not be empty".into()));
        }
        if !self.vehicle.start_position.is_finite() {
            return Err(ConfigError::Invalid("start_position must be finite".into()));
        }
        if !(self.motion.speed_kmh.is_finite() && self.motion.speed_kmh > 0.0) {
            return Err(ConfigError::Invalid("speed_kmh must be positive".into()));
        }
        if self.motion.proximity_threshold_m < self.motion.arrival_epsilon_m {
            return Err(ConfigError::Invalid(
                "proximity_threshold_m must be at least arrival_epsilon_m".into(),
            ));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be positive".into()));
        }
        Ok(())
    }
}

impl Default for FieldUnitConfig {
    fn default() -> Self {
        Self {
            vehicle: VehicleProfile::default(),
            backend: BackendConfig::default(),
            polling: PollingConfig::default(),
            motion: MotionConfig::default(),
            tick_ms: 100,
        }
    }
}
