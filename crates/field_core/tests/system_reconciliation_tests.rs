mod support;

use field_core::backend::{RemoteRide, RemoteStatus};
use field_core::command::Command;
use field_core::ecs::{RideId, VehicleState};
use field_core::reconcile::SeenOffers;
use field_core::ride::{RideContext, RidePhase};
use field_core::telemetry::{Notice, RideLog};
use field_core::test_helpers::{offset_north, ScriptedBackend};
use field_core::waypoints::{NOAPARA, PAHARTOLI, RAOJAN};

use support::schedule::{drain_notices, TickRunner};
use support::world::{accept_ride_42, board_ride_42, offer_ride_42, TestWorldBuilder};

fn ride_42(status: RemoteStatus, vehicle: &str) -> RemoteRide {
    RemoteRide::new(RideId::from(42u64), status)
        .assigned_to(vehicle)
        .with_route("PAHARTOLI", "NOAPARA")
}

#[test]
fn remote_completion_while_driving_goes_idle_without_points() {
    let backend = ScriptedBackend::new();
    let start = offset_north(NOAPARA.position, 800.0);
    let mut world = TestWorldBuilder::new().with_position(start).build(&backend);
    board_ride_42(&mut world);
    let mut runner = TickRunner::new();

    runner.run_for_ms(&mut world, 3_000);
    let moved_to = world.resource::<VehicleState>().position;
    assert_ne!(moved_to, start);

    backend.set_registry(vec![ride_42(RemoteStatus::Completed, "RICK001")]);
    runner.run_for_ms(&mut world, 2_000);

    assert_eq!(world.resource::<RideContext>().phase(), RidePhase::Idle);
    assert_eq!(world.resource::<VehicleState>().points(), 0);
    assert!(drain_notices(&mut world).contains(&Notice::RemoteCompleted(RideId::from(42u64))));

    // Idle vehicles do not move, and the completion is not counted twice.
    let parked = world.resource::<VehicleState>().position;
    runner.run_for_ms(&mut world, 5_000);
    assert_eq!(world.resource::<VehicleState>().position, parked);
    assert_eq!(world.resource::<RideLog>().len(), 1);
}

#[test]
fn local_completion_is_not_double_counted_by_registry() {
    let backend = ScriptedBackend::new();
    let mut world = TestWorldBuilder::new()
        .with_position(offset_north(NOAPARA.position, 20.0))
        .build(&backend);
    board_ride_42(&mut world);
    let mut runner = TickRunner::new();

    runner.command(&mut world, Command::Complete);
    assert_eq!(world.resource::<VehicleState>().points(), 10);

    backend.set_registry(vec![ride_42(RemoteStatus::Completed, "RICK001")]);
    runner.run_for_ms(&mut world, 5_000);
    assert_eq!(world.resource::<VehicleState>().points(), 10);
    assert_eq!(world.resource::<RideLog>().len(), 1);
}

#[test]
fn remote_accept_moves_offer_to_pickup() {
    let backend = ScriptedBackend::new();
    let mut world = TestWorldBuilder::new().build(&backend);
    offer_ride_42(&mut world);
    let mut runner = TickRunner::new();

    backend.set_registry(vec![ride_42(RemoteStatus::Accepted, "RICK001")]);
    runner.tick(&mut world);

    let ride = world.resource::<RideContext>();
    assert_eq!(ride.phase(), RidePhase::ToPickup);
    assert_eq!(ride.target(), Some(&PAHARTOLI));
}

#[test]
fn offer_taken_by_another_vehicle_returns_to_idle() {
    let backend = ScriptedBackend::new();
    let mut world = TestWorldBuilder::new().build(&backend);
    offer_ride_42(&mut world);
    let mut runner = TickRunner::new();

    backend.set_registry(vec![ride_42(RemoteStatus::Accepted, "RICK009")]);
    runner.tick(&mut world);

    assert_eq!(world.resource::<RideContext>().phase(), RidePhase::Idle);
    assert!(drain_notices(&mut world).contains(&Notice::RideTaken(RideId::from(42u64))));
}

#[test]
fn reassignment_adopts_the_new_ride_and_retargets() {
    let backend = ScriptedBackend::new();
    let mut world = TestWorldBuilder::new().build(&backend);
    accept_ride_42(&mut world);
    let mut runner = TickRunner::new();

    backend.set_registry(vec![
        ride_42(RemoteStatus::Accepted, "RICK002"),
        RemoteRide::new(RideId::from(57u64), RemoteStatus::Accepted)
            .assigned_to("RICK001")
            .with_route("RAOJAN", "CUET_CAMPUS"),
    ]);
    runner.tick(&mut world);

    let ride = world.resource::<RideContext>();
    assert_eq!(ride.ride_id(), Some(&RideId::from(57u64)));
    assert_eq!(ride.phase(), RidePhase::ToPickup);
    assert_eq!(ride.target(), Some(&RAOJAN));
    assert!(world.resource::<SeenOffers>().contains(&RideId::from(57u64)));
}

#[test]
fn registry_neighbours_do_not_leak_into_tracked_ride() {
    let backend = ScriptedBackend::new();
    let mut world = TestWorldBuilder::new().build(&backend);
    accept_ride_42(&mut world);
    let mut runner = TickRunner::new();

    // Ride 41 is completed and belongs to this vehicle; 42 is still accepted.
    backend.set_registry(vec![
        RemoteRide::new(RideId::from(41u64), RemoteStatus::Completed).assigned_to("RICK001"),
        ride_42(RemoteStatus::Accepted, "RICK001"),
        RemoteRide::new(RideId::from(43u64), RemoteStatus::Pickup).assigned_to("RICK003"),
    ]);
    runner.run_for_ms(&mut world, 3_000);

    let ride = world.resource::<RideContext>();
    assert_eq!(ride.ride_id(), Some(&RideId::from(42u64)));
    assert_eq!(ride.phase(), RidePhase::ToPickup);
}

#[test]
fn offline_backend_leaves_state_untouched() {
    let backend = ScriptedBackend::new();
    backend.set_offline(true);
    let mut world = TestWorldBuilder::new().build(&backend);
    board_ride_42(&mut world);
    let mut runner = TickRunner::new();

    runner.run_for_ms(&mut world, 5_000);
    assert_eq!(world.resource::<RideContext>().phase(), RidePhase::ToDestination);
    let notices = drain_notices(&mut world);
    assert_eq!(notices.iter().filter(|n| **n == Notice::Offline).count(), 1);
}

#[test]
fn pending_offer_taken_elsewhere_moves_onto_ride_assigned_here() {
    let backend = ScriptedBackend::new();
    let mut world = TestWorldBuilder::new().build(&backend);
    offer_ride_42(&mut world);
    let mut runner = TickRunner::new();

    backend.set_registry(vec![
        ride_42(RemoteStatus::Accepted, "RICK002"),
        RemoteRide::new(RideId::from(57u64), RemoteStatus::Accepted)
            .assigned_to("RICK001")
            .with_route("RAOJAN", "CUET_CAMPUS"),
    ]);
    runner.run_for_ms(&mut world, 20_000);

    let ride = world.resource::<RideContext>();
    assert_eq!(ride.ride_id(), Some(&RideId::from(57u64)));
    assert_eq!(ride.phase(), RidePhase::ToPickup);
    assert!(drain_notices(&mut world).contains(&Notice::Reassigned {
        from: RideId::from(42u64),
        to: RideId::from(57u64),
    }));
}

#[test]
fn idle_unit_picks_up_ride_assigned_by_dispatcher() {
    let backend = ScriptedBackend::new();
    let mut world = TestWorldBuilder::new().build(&backend);
    let mut runner = TickRunner::new();

    runner.run_for_ms(&mut world, 3_000);
    assert_eq!(world.resource::<RideContext>().phase(), RidePhase::Idle);

    backend.set_registry(vec![RemoteRide::new(RideId::from(57u64), RemoteStatus::Accepted)
        .assigned_to("RICK001")
        .with_route("RAOJAN", "CUET_CAMPUS")]);
    runner.run_for_ms(&mut world, 2_000);

    let ride = world.resource::<RideContext>();
    assert_eq!(ride.ride_id(), Some(&RideId::from(57u64)));
    assert_eq!(ride.phase(), RidePhase::ToPickup);
    assert_eq!(ride.target(), Some(&RAOJAN));
    assert!(drain_notices(&mut world).contains(&Notice::Assigned {
        ride_id: RideId::from(57u64),
        phase: RidePhase::ToPickup,
    }));
}

#[test]
fn completed_ride_is_not_adopted_again_from_a_lagging_registry() {
    let backend = ScriptedBackend::new();
    let mut world = TestWorldBuilder::new()
        .with_position(offset_north(NOAPARA.position, 20.0))
        .build(&backend);
    board_ride_42(&mut world);
    let mut runner = TickRunner::new();

    runner.command(&mut world, Command::Complete);
    backend.set_registry(vec![ride_42(RemoteStatus::Pickup, "RICK001")]);
    runner.run_for_ms(&mut world, 5_000);

    assert_eq!(world.resource::<RideContext>().phase(), RidePhase::Idle);
    assert_eq!(world.resource::<RideLog>().len(), 1);
}
