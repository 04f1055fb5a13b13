#![allow(dead_code)]

use bevy_ecs::prelude::World;
use field_core::config::FieldUnitConfig;
use field_core::ecs::{RideId, VehicleState};
use field_core::geo::Coordinate;
use field_core::ride::RideContext;
use field_core::test_helpers::{create_test_world_with, ScriptedBackend};

/// Builder for reproducible field unit worlds backed by a scripted backend.
#[derive(Clone, Debug, Default)]
pub struct TestWorldBuilder {
    config: FieldUnitConfig,
    position: Option<Coordinate>,
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: Coordinate) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_speed_kmh(mut self, speed_kmh: f64) -> Self {
        self.config.motion.speed_kmh = speed_kmh;
        self
    }

    /// A vehicle that never moves, for guard checks at exact distances.
    pub fn parked(self) -> Self {
        self.with_speed_kmh(0.0)
    }

    pub fn with_vehicle_id(mut self, id: &str) -> Self {
        self.config.vehicle.vehicle_id.0 = id.to_string();
        self
    }

    pub fn config(&self) -> &FieldUnitConfig {
        &self.config
    }

    pub fn build(self, backend: &ScriptedBackend) -> World {
        let mut world = create_test_world_with(&self.config, backend);
        if let Some(position) = self.position {
            world.resource_mut::<VehicleState>().position = position;
        }
        world
    }
}

/// Puts the world into OFFER_PENDING for ride 42, PAHARTOLI to NOAPARA.
pub fn offer_ride_42(world: &mut World) {
    world
        .resource_mut::<RideContext>()
        .offer(RideId::from(42u64), "PAHARTOLI", "NOAPARA")
        .expect("offer ride 42");
}

/// Puts the world into TO_PICKUP for ride 42.
pub fn accept_ride_42(world: &mut World) {
    offer_ride_42(world);
    world.resource_mut::<RideContext>().accept().expect("accept ride 42");
}

/// Puts the world into TO_DESTINATION for ride 42.
pub fn board_ride_42(world: &mut World) {
    accept_ride_42(world);
    world
        .resource_mut::<RideContext>()
        .confirm_pickup()
        .expect("pickup ride 42");
}
