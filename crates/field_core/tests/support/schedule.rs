#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use field_core::command::{Command, PendingCommands};
use field_core::runner::{field_schedule, run_tick, run_until};
use field_core::telemetry::{Notice, OperatorNotices};

pub const TICK_MS: u64 = 100;

/// Owns a reusable `Schedule` so tests can step ticks or run until a condition.
pub struct TickRunner {
    schedule: Schedule,
}

impl Default for TickRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TickRunner {
    pub fn new() -> Self {
        Self {
            schedule: field_schedule(),
        }
    }

    pub fn tick(&mut self, world: &mut World) {
        run_tick(world, &mut self.schedule, TICK_MS);
    }

    /// Runs ticks covering `ms` of field time.
    pub fn run_for_ms(&mut self, world: &mut World, ms: u64) {
        for _ in 0..ms / TICK_MS {
            self.tick(world);
        }
    }

    /// Runs until `done` holds; panics if it never does within `max_ticks`.
    pub fn run_until<F>(&mut self, world: &mut World, max_ticks: usize, done: F) -> usize
    where
        F: FnMut(&World) -> bool,
    {
        let ticks = run_until(world, &mut self.schedule, TICK_MS, max_ticks, done);
        assert!(ticks < max_ticks, "condition not reached within {max_ticks} ticks");
        ticks
    }

    /// Queues `command`, runs one tick and returns the notices it produced.
    pub fn command(&mut self, world: &mut World, command: Command) -> Vec<Notice> {
        drain_notices(world);
        world.resource_mut::<PendingCommands>().push(command);
        self.tick(world);
        drain_notices(world)
    }
}

pub fn drain_notices(world: &mut World) -> Vec<Notice> {
    world.resource_mut::<OperatorNotices>().drain().collect()
}
