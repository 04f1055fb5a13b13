use bevy_ecs::prelude::{Res, ResMut};

use crate::backend::BackendResource;
use crate::clock::{CallSite, CallThrottle, FieldClock};
use crate::config::PollingConfig;
use crate::ecs::VehicleState;
use crate::telemetry::{Connectivity, OperatorNotices};

use super::{note_backend_ok, note_poll_failure};

/// Reports the vehicle position to the backend, in every phase.
pub fn location_push_system(
    clock: Res<FieldClock>,
    mut throttle: ResMut<CallThrottle>,
    polling: Res<PollingConfig>,
    vehicle: Res<VehicleState>,
    backend: Res<BackendResource>,
    mut connectivity: ResMut<Connectivity>,
    mut notices: ResMut<OperatorNotices>,
) {
    let site = CallSite::LocationPush;
    if throttle
        .try_acquire(site, clock.now(), polling.interval_ms(site))
        .is_none()
    {
        return;
    }

    match backend.0.push_location(&vehicle.id, vehicle.position) {
        Ok(()) => {
            log::debug!("location pushed: {}", vehicle.position);
            note_backend_ok(&mut connectivity, &mut notices);
        }
        Err(err) => note_poll_failure("location push", &err, &mut connectivity, &mut notices),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::test_helpers::{create_test_world, ScriptedBackend};

    #[test]
    fn pushes_at_most_once_per_interval() {
        let backend = ScriptedBackend::new();
        let mut world: World = create_test_world(&backend);
        let mut schedule = Schedule::default();
        schedule.add_systems(location_push_system);

        schedule.run(&mut world);
        world.resource_mut::<FieldClock>().advance(4_000);
        schedule.run(&mut world);
        assert_eq!(backend.calls().push_location, 1);

        world.resource_mut::<FieldClock>().advance(1_000);
        schedule.run(&mut world);
        assert_eq!(backend.calls().push_location, 2);
        assert_eq!(
            backend.last_location(),
            Some(world.resource::<VehicleState>().position)
        );
    }

    #[test]
    fn offline_is_announced_once() {
        let backend = ScriptedBackend::new();
        backend.set_offline(true);
        let mut world = create_test_world(&backend);
        let mut schedule = Schedule::default();
        schedule.add_systems(location_push_system);

        for _ in 0..3 {
            schedule.run(&mut world);
            world.resource_mut::<FieldClock>().advance(5_000);
        }
        assert_eq!(world.resource::<OperatorNotices>().len(), 1);
        assert!(!world.resource::<Connectivity>().is_online());

        backend.set_offline(false);
        schedule.run(&mut world);
        assert!(world.resource::<Connectivity>().is_online());
        assert_eq!(world.resource::<OperatorNotices>().len(), 2);
    }
}
