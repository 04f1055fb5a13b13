//! Applies one queued operator command per tick.
//!
//! Commands that need the backend check their guard first, then make the
//! call, and only commit the local transition once the backend agreed. A
//! failed call leaves the ride exactly as it was.

use bevy_ecs::prelude::{Res, ResMut};
use bevy_ecs::system::SystemParam;

use crate::backend::{AcceptOutcome, BackendResource};
use crate::clock::{CallSite, CallThrottle, FieldClock};
use crate::command::{Command, PendingCommands, StatusReport};
use crate::config::{MotionConfig, PollingConfig};
use crate::ecs::VehicleState;
use crate::reconcile::SnapshotLedger;
use crate::ride::RideContext;
use crate::telemetry::{CompletedRideRecord, Connectivity, Notice, OperatorNotices, RideLog};

use super::{note_backend_ok, note_submit_failure};

#[derive(SystemParam)]
pub struct CommandContext<'w> {
    clock: Res<'w, FieldClock>,
    throttle: ResMut<'w, CallThrottle>,
    polling: Res<'w, PollingConfig>,
    motion: Res<'w, MotionConfig>,
    vehicle: ResMut<'w, VehicleState>,
    backend: Res<'w, BackendResource>,
    ride: ResMut<'w, RideContext>,
    ledger: ResMut<'w, SnapshotLedger>,
    connectivity: ResMut<'w, Connectivity>,
    notices: ResMut<'w, OperatorNotices>,
    ride_log: ResMut<'w, RideLog>,
}

pub fn command_intake_system(mut commands: ResMut<PendingCommands>, mut ctx: CommandContext) {
    let Some(command) = commands.pop() else {
        return;
    };
    log::debug!("command {command:?}");
    match command {
        Command::Accept => ctx.accept(),
        Command::Reject => ctx.reject(),
        Command::Pickup => ctx.pickup(),
        Command::Complete => ctx.complete(),
        Command::Status => ctx.status(),
        Command::Help => ctx.notices.push(Notice::Help),
    }
}

impl CommandContext<'_> {
    /// Throttles a submission. An early repeat is dropped with a notice.
    fn acquire(&mut self, site: CallSite) -> bool {
        let acquired = self
            .throttle
            .try_acquire(site, self.clock.now(), self.polling.interval_ms(site))
            .is_some();
        if !acquired {
            self.notices.push(Notice::Busy);
        }
        acquired
    }

    fn accept(&mut self) {
        let id = match self.ride.check_accept() {
            Ok(id) => id.clone(),
            Err(err) => return self.notices.push(Notice::Refused(err)),
        };
        if !self.acquire(CallSite::AcceptSubmit) {
            return;
        }

        match self.backend.0.accept(&id, &self.vehicle.id) {
            Ok(AcceptOutcome::Granted) => {
                note_backend_ok(&mut self.connectivity, &mut self.notices);
                if let Err(err) = self.ride.accept() {
                    log::warn!("accept of ride {id} granted but not applied: {err}");
                    return;
                }
                log::info!("ride {id} accepted");
                self.notices.push(Notice::Accepted(id));
            }
            Ok(AcceptOutcome::Taken) => {
                note_backend_ok(&mut self.connectivity, &mut self.notices);
                self.ride.finish();
                self.ledger.forget(&id);
                log::info!("ride {id} already taken");
                self.notices.push(Notice::RideTaken(id));
            }
            Err(err) => note_submit_failure("accept", &err, &mut self.connectivity, &mut self.notices),
        }
    }

    fn reject(&mut self) {
        match self.ride.reject() {
            Ok(id) => {
                self.ledger.forget(&id);
                log::info!("ride {id} rejected");
                self.notices.push(Notice::Rejected(id));
            }
            Err(err) => self.notices.push(Notice::Refused(err)),
        }
    }

    fn pickup(&mut self) {
        let position = self.vehicle.position;
        let id = match self.ride.check_pickup(position, self.motion.proximity_threshold_m) {
            Ok(id) => id.clone(),
            Err(err) => return self.notices.push(Notice::Refused(err)),
        };
        if !self.acquire(CallSite::PickupSubmit) {
            return;
        }

        match self.backend.0.confirm_pickup(&id) {
            Ok(()) => {
                note_backend_ok(&mut self.connectivity, &mut self.notices);
                if let Err(err) = self.ride.confirm_pickup() {
                    log::warn!("pickup of ride {id} confirmed but not applied: {err}");
                    return;
                }
                log::info!("ride {id} picked up");
                self.notices.push(Notice::PickedUp(id));
            }
            Err(err) => note_submit_failure("pickup", &err, &mut self.connectivity, &mut self.notices),
        }
    }

    fn complete(&mut self) {
        let position = self.vehicle.position;
        let id = match self.ride.check_complete(position, self.motion.proximity_threshold_m) {
            Ok(id) => id.clone(),
            Err(err) => return self.notices.push(Notice::Refused(err)),
        };
        if !self.acquire(CallSite::CompleteSubmit) {
            return;
        }

        let receipt = match self.backend.0.complete(&id, position) {
            Ok(receipt) => {
                note_backend_ok(&mut self.connectivity, &mut self.notices);
                receipt
            }
            Err(err) => {
                return note_submit_failure("complete", &err, &mut self.connectivity, &mut self.notices);
            }
        };

        self.ride.finish();
        self.ledger.forget(&id);
        let total_points = self.vehicle.award(receipt.points);
        log::info!(
            "ride {id} completed: +{} points (total {total_points}){}",
            receipt.points,
            if receipt.pending_review { ", pending review" } else { "" }
        );
        self.ride_log.record(CompletedRideRecord {
            ride_id: id.clone(),
            points: receipt.points,
            drop_distance_m: receipt.drop_distance_m,
            pending_review: receipt.pending_review,
            completed_remotely: false,
            completed_at_ms: self.clock.now(),
        });
        self.notices.push(Notice::Completed {
            ride_id: id,
            receipt,
            total_points,
        });
    }

    fn status(&mut self) {
        let report = StatusReport::capture(
            self.vehicle.id.clone(),
            self.vehicle.position,
            self.vehicle.points(),
            &self.ride,
            self.ride_log.len(),
        );
        self.notices.push(Notice::Status(report));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::backend::CompletionReceipt;
    use crate::ecs::RideId;
    use crate::ride::{RideError, RidePhase};
    use crate::test_helpers::{create_test_world, offset_north, ScriptedBackend};
    use crate::waypoints::{NOAPARA, PAHARTOLI};

    fn run_command(world: &mut World, command: Command) -> Vec<Notice> {
        world.resource_mut::<PendingCommands>().push(command);
        let mut schedule = Schedule::default();
        schedule.add_systems(command_intake_system);
        schedule.run(world);
        world.resource_mut::<OperatorNotices>().drain().collect()
    }

    fn offered(world: &mut World) {
        world
            .resource_mut::<RideContext>()
            .offer(RideId::from(42), "PAHARTOLI", "NOAPARA")
            .unwrap();
    }

    #[test]
    fn accept_granted_heads_to_pickup() {
        let backend = ScriptedBackend::new();
        let mut world = create_test_world(&backend);
        offered(&mut world);

        let notices = run_command(&mut world, Command::Accept);
        assert_eq!(notices, vec![Notice::Accepted(RideId::from(42))]);
        let ride = world.resource::<RideContext>();
        assert_eq!(ride.phase(), RidePhase::ToPickup);
        assert_eq!(ride.target(), Some(&PAHARTOLI));
    }

    #[test]
    fn accept_taken_returns_to_idle() {
        let backend = ScriptedBackend::new();
        backend.set_accept_outcome(AcceptOutcome::Taken);
        let mut world = create_test_world(&backend);
        offered(&mut world);

        let notices = run_command(&mut world, Command::Accept);
        assert_eq!(notices, vec![Notice::RideTaken(RideId::from(42))]);
        assert_eq!(world.resource::<RideContext>().phase(), RidePhase::Idle);
    }

    #[test]
    fn offline_accept_leaves_offer_pending() {
        let backend = ScriptedBackend::new();
        backend.set_offline(true);
        let mut world = create_test_world(&backend);
        offered(&mut world);

        let notices = run_command(&mut world, Command::Accept);
        assert_eq!(notices, vec![Notice::Offline]);
        assert_eq!(world.resource::<RideContext>().phase(), RidePhase::OfferPending);
    }

    #[test]
    fn pickup_far_away_is_refused_without_calling_backend() {
        let backend = ScriptedBackend::new();
        let mut world = create_test_world(&backend);
        offered(&mut world);
        world.resource_mut::<RideContext>().accept().unwrap();
        world.resource_mut::<VehicleState>().position = offset_north(PAHARTOLI.position, 101.0);

        let notices = run_command(&mut world, Command::Pickup);
        assert!(matches!(notices.as_slice(), [Notice::Refused(RideError::TooFar { .. })]));
        assert_eq!(backend.calls().confirm_pickup, 0);
        assert_eq!(world.resource::<RideContext>().phase(), RidePhase::ToPickup);
    }

    #[test]
    fn repeated_pickup_inside_interval_is_throttled() {
        let backend = ScriptedBackend::new();
        backend.set_offline(true);
        let mut world = create_test_world(&backend);
        offered(&mut world);
        world.resource_mut::<RideContext>().accept().unwrap();
        world.resource_mut::<VehicleState>().position = offset_north(PAHARTOLI.position, 40.0);

        run_command(&mut world, Command::Pickup);
        let notices = run_command(&mut world, Command::Pickup);
        assert_eq!(notices, vec![Notice::Busy]);
        assert_eq!(backend.calls().confirm_pickup, 1);
    }

    #[test]
    fn completion_awards_receipt_points_once() {
        let backend = ScriptedBackend::new();
        backend.set_receipt(CompletionReceipt {
            points: 10,
            drop_distance_m: Some(12.0),
            pending_review: false,
        });
        let mut world = create_test_world(&backend);
        offered(&mut world);
        {
            let mut ride = world.resource_mut::<RideContext>();
            ride.accept().unwrap();
            ride.confirm_pickup().unwrap();
        }
        world.resource_mut::<VehicleState>().position = offset_north(NOAPARA.position, 30.0);

        let notices = run_command(&mut world, Command::Complete);
        assert!(matches!(notices.as_slice(), [Notice::Completed { total_points: 10, .. }]));
        assert_eq!(world.resource::<VehicleState>().points(), 10);
        assert_eq!(world.resource::<RideContext>().phase(), RidePhase::Idle);

        let notices = run_command(&mut world, Command::Complete);
        assert_eq!(notices, vec![Notice::Refused(RideError::NotHeadingToDestination)]);
        assert_eq!(world.resource::<VehicleState>().points(), 10);
        assert_eq!(world.resource::<RideLog>().len(), 1);
    }

    #[test]
    fn status_and_help_only_report() {
        let backend = ScriptedBackend::new();
        let mut world = create_test_world(&backend);

        let notices = run_command(&mut world, Command::Status);
        assert!(matches!(notices.as_slice(), [Notice::Status(report)] if report.phase == RidePhase::Idle));
        assert_eq!(run_command(&mut world, Command::Help), vec![Notice::Help]);
        assert_eq!(backend.calls().total(), 0);
    }
}
