mod support;

use field_core::clock::{CallSite, CallThrottle, FieldClock};
use field_core::test_helpers::ScriptedBackend;

use support::schedule::TickRunner;
use support::world::{accept_ride_42, offer_ride_42, TestWorldBuilder};

// The clock advances before each tick runs, so the first tick sees t=100 and
// ten seconds of ticks cover t=100..=10_000.

#[test]
fn idle_unit_polls_offers_assignments_and_location_on_their_own_intervals() {
    let backend = ScriptedBackend::new();
    let mut world = TestWorldBuilder::new().build(&backend);
    let mut runner = TickRunner::new();

    runner.run_for_ms(&mut world, 10_000);

    let calls = backend.calls();
    assert_eq!(world.resource::<FieldClock>().now(), 10_000);
    assert_eq!(calls.push_location, 2);
    assert_eq!(calls.pending_offers, 4);
    assert_eq!(calls.ride_registry, 5);
    assert_eq!(
        world.resource::<CallThrottle>().last_call(CallSite::AssignmentWatch),
        Some(8_100)
    );
}

#[test]
fn pending_offer_is_watched_every_two_seconds() {
    let backend = ScriptedBackend::new();
    let mut world = TestWorldBuilder::new().build(&backend);
    offer_ride_42(&mut world);
    let mut runner = TickRunner::new();

    runner.run_for_ms(&mut world, 10_000);

    let calls = backend.calls();
    assert_eq!(calls.ride_registry, 5);
    assert_eq!(calls.pending_offers, 0);
    assert_eq!(
        world.resource::<CallThrottle>().last_call(CallSite::AcceptanceWatch),
        Some(8_100)
    );
}

#[test]
fn active_ride_is_watched_faster_than_a_pending_offer() {
    let backend = ScriptedBackend::new();
    let mut world = TestWorldBuilder::new().build(&backend);
    accept_ride_42(&mut world);
    let mut runner = TickRunner::new();

    runner.run_for_ms(&mut world, 10_000);

    let calls = backend.calls();
    assert_eq!(calls.ride_registry, 7);
    assert_eq!(calls.pending_offers, 0);
    assert_eq!(world.resource::<CallThrottle>().last_call(CallSite::AcceptanceWatch), None);
    assert_eq!(
        world.resource::<CallThrottle>().last_call(CallSite::MovementStep),
        Some(9_100)
    );
}

#[test]
fn offline_backend_keeps_the_same_cadence() {
    let backend = ScriptedBackend::new();
    backend.set_offline(true);
    let mut world = TestWorldBuilder::new().build(&backend);
    let mut runner = TickRunner::new();

    runner.run_for_ms(&mut world, 10_000);

    let calls = backend.calls();
    assert_eq!(calls.push_location, 2);
    assert_eq!(calls.pending_offers, 4);
}
