//! Shared body of the registry watchers: poll the registry, reconcile the
//! tracked ride (or adopt an assigned one while idle), and report what
//! changed.

use bevy_ecs::prelude::{Res, ResMut};
use bevy_ecs::system::SystemParam;

use crate::backend::{BackendResource, RemoteStatus, RideRegistry};
use crate::clock::{CallSite, CallThrottle, FieldClock};
use crate::config::PollingConfig;
use crate::ecs::VehicleState;
use crate::reconcile::{
    adopt_assigned, reconcile, AssignmentOutcome, ReconcileError, ReconcileOutcome, SeenOffers, SnapshotLedger,
};
use crate::ride::RideContext;
use crate::telemetry::{CompletedRideRecord, Connectivity, Notice, OperatorNotices, RideLog};

use super::{note_backend_ok, note_poll_failure};

#[derive(SystemParam)]
pub struct RegistrySync<'w> {
    clock: Res<'w, FieldClock>,
    throttle: ResMut<'w, CallThrottle>,
    polling: Res<'w, PollingConfig>,
    vehicle: Res<'w, VehicleState>,
    backend: Res<'w, BackendResource>,
    ride: ResMut<'w, RideContext>,
    ledger: ResMut<'w, SnapshotLedger>,
    seen: ResMut<'w, SeenOffers>,
    connectivity: ResMut<'w, Connectivity>,
    notices: ResMut<'w, OperatorNotices>,
    ride_log: ResMut<'w, RideLog>,
}

impl RegistrySync<'_> {
    /// Fetches the registry for `site`, or `None` while the call-site cools
    /// down or the backend fails.
    fn fetch(&mut self, site: CallSite) -> Option<RideRegistry> {
        if self
            .throttle
            .try_acquire(site, self.clock.now(), self.polling.interval_ms(site))
            .is_none()
        {
            return None;
        }

        match self.backend.0.ride_registry() {
            Ok(registry) => {
                note_backend_ok(&mut self.connectivity, &mut self.notices);
                Some(registry)
            }
            Err(err) => {
                note_poll_failure("registry poll", &err, &mut self.connectivity, &mut self.notices);
                None
            }
        }
    }

    /// Runs one throttled reconciliation step for `site`.
    pub fn poll(&mut self, site: CallSite) {
        let Some(registry) = self.fetch(site) else {
            return;
        };

        let now = self.clock.now();
        let me = self.vehicle.id.clone();
        match reconcile(&mut self.ride, &mut self.ledger, &registry, &me) {
            Ok(outcome) => self.report(outcome, now),
            Err(ReconcileError::RideMissing(id)) => {
                log::debug!("ride {id} not in the last {} registry entries", registry.len());
            }
            Err(err) => log::warn!("reconciliation abandoned: {err}"),
        }
    }

    /// Looks for a ride the dispatcher assigned to this unit while idle.
    pub fn watch_assignments(&mut self, site: CallSite) {
        let Some(registry) = self.fetch(site) else {
            return;
        };

        let me = self.vehicle.id.clone();
        let ride_log = &self.ride_log;
        let outcome = adopt_assigned(&mut self.ride, &mut self.ledger, &registry, &me, |id| {
            ride_log.contains(id)
        });
        match outcome {
            Ok(AssignmentOutcome::Adopted { ride_id, transition }) => {
                log::info!("adopting ride {ride_id} assigned by dispatcher in {}", transition.to);
                self.seen.mark(ride_id.clone());
                self.notices.push(Notice::Assigned {
                    ride_id,
                    phase: transition.to,
                });
            }
            Ok(AssignmentOutcome::Busy | AssignmentOutcome::NothingAssigned) => {}
            Err(err) => log::warn!("assignment not adopted: {err}"),
        }
    }

    fn report(&mut self, outcome: ReconcileOutcome, now: u64) {
        let tracked = self.ride.ride_id().cloned();
        match outcome {
            ReconcileOutcome::Untracked | ReconcileOutcome::Unchanged => {}
            ReconcileOutcome::Observed(status) => {
                log::debug!("registry status {status:?} needs no local change");
            }
            ReconcileOutcome::RemoteAccepted(transition) => {
                log::info!("remote accept: {} -> {}", transition.from, transition.to);
                if let Some(id) = tracked {
                    self.notices.push(Notice::RemoteAccepted(id));
                }
            }
            ReconcileOutcome::RemotePickup(transition) => {
                if transition.is_noop() {
                    return;
                }
                log::info!("remote pickup: {} -> {}", transition.from, transition.to);
                if let Some(id) = tracked {
                    self.notices.push(Notice::RemotePickup(id));
                }
            }
            ReconcileOutcome::RemoteCompleted { ride, remote } => {
                log::info!("ride {} completed remotely ({:?})", ride.id, remote.status);
                self.ride_log.record(CompletedRideRecord {
                    ride_id: ride.id.clone(),
                    points: 0,
                    drop_distance_m: remote.drop_distance_m,
                    pending_review: remote.status == RemoteStatus::PendingReview,
                    completed_remotely: true,
                    completed_at_ms: now,
                });
                self.notices.push(Notice::RemoteCompleted(ride.id));
            }
            ReconcileOutcome::OfferTaken { ride_id, by } => {
                log::info!("ride {ride_id} taken by {by}");
                self.notices.push(Notice::RideTaken(ride_id));
            }
            ReconcileOutcome::OfferWithdrawn(id) => {
                log::info!("ride {id} withdrawn");
                self.notices.push(Notice::OfferWithdrawn(id));
            }
            ReconcileOutcome::Cancelled(id) => {
                log::info!("ride {id} cancelled remotely");
                self.notices.push(Notice::Cancelled(id));
            }
            ReconcileOutcome::Reassigned { from, to, transition } => {
                log::info!("ride {from} reassigned, adopting {to} in {}", transition.to);
                self.seen.mark(to.clone());
                self.notices.push(Notice::Reassigned { from, to });
            }
            ReconcileOutcome::Lost(id) => {
                log::info!("ride {id} lost to another vehicle");
                self.notices.push(Notice::Lost(id));
            }
        }
    }
}
