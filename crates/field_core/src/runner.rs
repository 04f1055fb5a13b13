//! Field unit runner: advances the clock and runs one tick of the schedule.
//!
//! Clock progression happens here, outside systems. Before each run the
//! runner snapshots the ride phase into [`TickPlan`]; the schedule branches on
//! that plan, so a transition made early in a tick does not start a different
//! branch in the same tick.

use bevy_ecs::prelude::{Res, Resource, Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::backend::{BackendError, BackendResource, DispatchBackend};
use crate::clock::{CallThrottle, FieldClock};
use crate::command::PendingCommands;
use crate::config::{FieldUnitConfig, VehicleProfile};
use crate::ecs::VehicleState;
use crate::reconcile::{SeenOffers, SnapshotLedger};
use crate::ride::{RideContext, RidePhase};
use crate::systems::{
    acceptance_watch::acceptance_watch_system,
    assignment_watch::assignment_watch_system,
    command_intake::command_intake_system,
    location_push::location_push_system,
    movement::{movement_system, Navigation},
    offer_discovery::offer_discovery_system,
    status_watch::status_watch_system,
};
use crate::telemetry::{Connectivity, Notice, OperatorNotices, RideLog};

/// The ride phase as it stood when the current tick began.
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct TickPlan {
    pub phase: RidePhase,
}

fn plan_is_idle(plan: Option<Res<TickPlan>>) -> bool {
    plan.map(|p| p.phase == RidePhase::Idle).unwrap_or(false)
}

fn plan_is_offer_pending(plan: Option<Res<TickPlan>>) -> bool {
    plan.map(|p| p.phase == RidePhase::OfferPending).unwrap_or(false)
}

fn plan_is_ride_active(plan: Option<Res<TickPlan>>) -> bool {
    plan.map(|p| p.phase.is_active()).unwrap_or(false)
}

/// Inserts every resource the schedule needs.
pub fn build_field_unit(world: &mut World, config: &FieldUnitConfig, backend: Box<dyn DispatchBackend>) {
    let profile = config.vehicle.clone();
    world.insert_resource(VehicleState::new(
        profile.vehicle_id.clone(),
        profile.start_position,
    ));
    world.insert_resource(profile);
    world.insert_resource(config.backend.clone());
    world.insert_resource(config.polling);
    world.insert_resource(config.motion);
    world.insert_resource(FieldClock::default());
    world.insert_resource(CallThrottle::default());
    world.insert_resource(TickPlan::default());
    world.insert_resource(RideContext::default());
    world.insert_resource(SnapshotLedger::default());
    world.insert_resource(SeenOffers::default());
    world.insert_resource(Navigation::default());
    world.insert_resource(PendingCommands::default());
    world.insert_resource(OperatorNotices::default());
    world.insert_resource(RideLog::default());
    world.insert_resource(Connectivity::default());
    world.insert_resource(BackendResource(backend));
}

/// Announces the vehicle to the backend. An unreachable backend is reported
/// to the operator but does not stop the unit; polling recovers later.
pub fn initialize_field_unit(world: &mut World) -> Result<(), BackendError> {
    let profile = world.resource::<VehicleProfile>().clone();
    let position = world.resource::<VehicleState>().position;
    let result = world.resource::<BackendResource>().0.register(&profile, position);

    match &result {
        Ok(()) => {
            log::info!("registered {} at {}", profile.vehicle_id, position);
            world.resource_mut::<OperatorNotices>().push(Notice::Registered {
                vehicle: profile.vehicle_id.to_string(),
            });
        }
        Err(err) => {
            log::warn!("registration failed: {err}");
            if err.is_offline() {
                world.resource_mut::<Connectivity>().record_offline();
            }
            world.resource_mut::<OperatorNotices>().push(Notice::backend(err));
        }
    }
    result
}

/// Builds the tick schedule. Systems run chained, in this order:
/// location push, assignment watch, offer discovery, acceptance watch, status
/// watch, movement, command intake. A dispatcher assignment found while idle
/// takes precedence over a new offer in the same tick.
pub fn field_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            location_push_system,
            assignment_watch_system.run_if(plan_is_idle),
            offer_discovery_system.run_if(plan_is_idle),
            acceptance_watch_system.run_if(plan_is_offer_pending),
            status_watch_system.run_if(plan_is_ride_active),
            movement_system.run_if(plan_is_ride_active),
            command_intake_system,
        )
            .chain(),
    );
    schedule
}

/// Advances the clock by `elapsed_ms` and runs one tick.
pub fn run_tick(world: &mut World, schedule: &mut Schedule, elapsed_ms: u64) {
    world.resource_mut::<FieldClock>().advance(elapsed_ms);
    let phase = world.resource::<RideContext>().phase();
    world.insert_resource(TickPlan { phase });
    schedule.run(world);
}

/// Runs `ticks` ticks of `tick_ms` each and returns the number run.
pub fn run_ticks(world: &mut World, schedule: &mut Schedule, tick_ms: u64, ticks: usize) -> usize {
    for _ in 0..ticks {
        run_tick(world, schedule, tick_ms);
    }
    ticks
}

/// Runs ticks until `done` holds or `max_ticks` is reached. Returns the
/// number of ticks run.
pub fn run_until<F>(world: &mut World, schedule: &mut Schedule, tick_ms: u64, max_ticks: usize, mut done: F) -> usize
where
    F: FnMut(&World) -> bool,
{
    let mut ticks = 0;
    while ticks < max_ticks && !done(world) {
        run_tick(world, schedule, tick_ms);
        ticks += 1;
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RemoteRide, RemoteStatus, RideOffer};
    use crate::clock::CallSite;
    use crate::ecs::RideId;
    use crate::test_helpers::{create_test_world, ScriptedBackend};

    #[test]
    fn registration_failure_is_not_fatal() {
        let backend = ScriptedBackend::new();
        backend.set_offline(true);
        let mut world = create_test_world(&backend);
        assert!(initialize_field_unit(&mut world).is_err());
        assert_eq!(world.resource::<OperatorNotices>().len(), 1);

        let mut schedule = field_schedule();
        run_ticks(&mut world, &mut schedule, 100, 10);
        assert_eq!(world.resource::<RideContext>().phase(), RidePhase::Idle);
    }

    #[test]
    fn offer_surfaced_in_a_tick_is_not_watched_until_next_tick() {
        let backend = ScriptedBackend::new();
        backend.set_offers(vec![RideOffer::new(42u64, "PAHARTOLI", "NOAPARA")]);
        let mut world = create_test_world(&backend);
        let mut schedule = field_schedule();

        run_tick(&mut world, &mut schedule, 0);
        assert_eq!(world.resource::<RideContext>().ride_id(), Some(&RideId::from(42)));
        let throttle = world.resource::<CallThrottle>();
        assert_eq!(throttle.last_call(CallSite::AcceptanceWatch), None);

        run_tick(&mut world, &mut schedule, 100);
        let throttle = world.resource::<CallThrottle>();
        assert_eq!(throttle.last_call(CallSite::AcceptanceWatch), Some(100));
        assert_eq!(backend.calls().pending_offers, 1);
    }

    #[test]
    fn run_until_stops_on_condition() {
        let backend = ScriptedBackend::new();
        let mut world = create_test_world(&backend);
        let mut schedule = field_schedule();
        let ticks = run_until(&mut world, &mut schedule, 100, 50, |w| {
            w.resource::<FieldClock>().now() >= 1_000
        });
        assert_eq!(ticks, 10);
        assert_eq!(world.resource::<FieldClock>().ticks(), 10);
    }

    #[test]
    fn dispatcher_assignment_wins_over_a_new_offer() {
        let backend = ScriptedBackend::new();
        backend.set_offers(vec![RideOffer::new(42u64, "PAHARTOLI", "NOAPARA")]);
        backend.set_registry(vec![RemoteRide::new(RideId::from(57u64), RemoteStatus::Accepted)
            .assigned_to("RICK001")
            .with_route("RAOJAN", "NOAPARA")]);
        let mut world = create_test_world(&backend);
        let mut schedule = field_schedule();

        run_tick(&mut world, &mut schedule, 0);
        assert_eq!(world.resource::<RideContext>().ride_id(), Some(&RideId::from(57)));
        assert_eq!(backend.calls().pending_offers, 0);
    }
}
