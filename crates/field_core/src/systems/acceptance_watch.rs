use crate::clock::CallSite;

use super::registry_sync::RegistrySync;

/// Watches a pending offer for an accept made on this unit's behalf, or for
/// another vehicle taking it.
pub fn acceptance_watch_system(mut sync: RegistrySync) {
    sync.poll(CallSite::AcceptanceWatch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::Schedule;

    use crate::backend::{RemoteRide, RemoteStatus};
    use crate::clock::FieldClock;
    use crate::ecs::RideId;
    use crate::ride::{RideContext, RidePhase};
    use crate::telemetry::{Notice, OperatorNotices};
    use crate::test_helpers::{create_test_world, ScriptedBackend};

    #[test]
    fn remote_accept_is_applied_once() {
        let backend = ScriptedBackend::new();
        backend.set_registry(vec![RemoteRide::new(RideId::from(42), RemoteStatus::Accepted)
            .assigned_to("RICK001")
            .with_route("PAHARTOLI", "NOAPARA")]);
        let mut world = create_test_world(&backend);
        world
            .resource_mut::<RideContext>()
            .offer(RideId::from(42), "PAHARTOLI", "NOAPARA")
            .unwrap();

        let mut schedule = Schedule::default();
        schedule.add_systems(acceptance_watch_system);
        schedule.run(&mut world);
        assert_eq!(world.resource::<RideContext>().phase(), RidePhase::ToPickup);

        world.resource_mut::<FieldClock>().advance(2_000);
        schedule.run(&mut world);
        assert_eq!(backend.calls().ride_registry, 2);

        let notices: Vec<_> = world.resource_mut::<OperatorNotices>().drain().collect();
        assert_eq!(notices, vec![Notice::RemoteAccepted(RideId::from(42))]);
    }

    #[test]
    fn polls_respect_interval() {
        let backend = ScriptedBackend::new();
        let mut world = create_test_world(&backend);
        let mut schedule = Schedule::default();
        schedule.add_systems(acceptance_watch_system);

        schedule.run(&mut world);
        world.resource_mut::<FieldClock>().advance(1_999);
        schedule.run(&mut world);
        assert_eq!(backend.calls().ride_registry, 1);
    }
}
