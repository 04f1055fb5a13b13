//! Reconciliation engine: brings the local ride in line with the backend.
//!
//! Two entry points, both pure over the state they are handed:
//!
//! - [`surface_offer`] turns a discovery poll into at most one new offer.
//! - [`reconcile`] diffs the registry view of the tracked ride against the
//!   last snapshot seen for it and applies the implied transition.
//! - [`adopt_assigned`] picks up a ride the dispatcher assigned directly to an
//!   idle unit.
//!
//! A step that fails (ride missing from the registry, malformed entry,
//! unresolvable labels) leaves both the ride and the ledger untouched, so the
//! next poll retries it from scratch.

mod ledger;

pub use ledger::{RemoteSnapshot, SeenOffers, SnapshotLedger, SEEN_OFFERS_CAPACITY};

use thiserror::Error;

use crate::backend::{Assignment, RegistryError, RemoteRide, RemoteStatus, RideOffer, RideRegistry};
use crate::ecs::{RideId, VehicleId};
use crate::ride::{ActiveRide, RideContext, RideError, RidePhase, Transition};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("ride {0} not present in registry")]
    RideMissing(RideId),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("cannot apply remote state: {0}")]
    Ride(#[from] RideError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryOutcome {
    /// A ride is already pending or active; offers are left for later.
    Busy,
    NothingNew,
    Surfaced { offer: RideOffer, transition: Transition },
    /// The offer could not be taken on (e.g. unknown location). Its id is
    /// remembered so it is not surfaced again.
    Refused { offer: RideOffer, reason: RideError },
}

/// Surfaces the first previously unseen offer, if the unit is idle.
pub fn surface_offer(ride: &mut RideContext, seen: &mut SeenOffers, offers: &[RideOffer]) -> DiscoveryOutcome {
    if ride.phase() != RidePhase::Idle {
        return DiscoveryOutcome::Busy;
    }
    let Some(offer) = offers.iter().find(|offer| !seen.contains(&offer.ride_id)) else {
        return DiscoveryOutcome::NothingNew;
    };

    seen.mark(offer.ride_id.clone());
    match ride.offer(offer.ride_id.clone(), &offer.pickup, &offer.destination) {
        Ok(transition) => DiscoveryOutcome::Surfaced {
            offer: offer.clone(),
            transition,
        },
        Err(reason) => DiscoveryOutcome::Refused {
            offer: offer.clone(),
            reason,
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentOutcome {
    /// A ride is already tracked; the status watches cover it.
    Busy,
    NothingAssigned,
    Adopted { ride_id: RideId, transition: Transition },
}

/// Adopts the first accepted or picked-up ride the registry assigns to `me`
/// while the unit is idle. Rides for which `finished` holds are skipped, so a
/// registry lagging behind a completion cannot bring the ride back.
pub fn adopt_assigned(
    ride: &mut RideContext,
    ledger: &mut SnapshotLedger,
    registry: &RideRegistry,
    me: &VehicleId,
    finished: impl Fn(&RideId) -> bool,
) -> Result<AssignmentOutcome, ReconcileError> {
    use RemoteStatus::*;

    if ride.phase() != RidePhase::Idle {
        return Ok(AssignmentOutcome::Busy);
    }
    let Some(next) = registry
        .assigned_to(me)
        .find(|candidate| matches!(candidate.status, Accepted | Pickup) && !finished(&candidate.ride_id))
    else {
        return Ok(AssignmentOutcome::NothingAssigned);
    };

    let transition = ride.adopt(
        next.ride_id.clone(),
        next.pickup.as_deref().unwrap_or_default(),
        next.destination.as_deref().unwrap_or_default(),
        phase_for(next.status),
    )?;
    ledger.record(next.ride_id.clone(), RemoteSnapshot::of(&next, me));
    Ok(AssignmentOutcome::Adopted {
        ride_id: next.ride_id,
        transition,
    })
}

fn phase_for(status: RemoteStatus) -> RidePhase {
    match status {
        RemoteStatus::Pending => RidePhase::OfferPending,
        RemoteStatus::Accepted => RidePhase::ToPickup,
        _ => RidePhase::ToDestination,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// No ride tracked locally.
    Untracked,
    /// Remote snapshot identical to the last one seen.
    Unchanged,
    /// Remote changed in a way that needs no local transition.
    Observed(RemoteStatus),
    /// The pending offer was accepted on this unit's behalf.
    RemoteAccepted(Transition),
    RemotePickup(Transition),
    /// Dropped off remotely. No points are awarded locally.
    RemoteCompleted { ride: ActiveRide, remote: RemoteRide },
    /// Another vehicle got the pending offer and nothing replaced it.
    OfferTaken { ride_id: RideId, by: String },
    OfferWithdrawn(RideId),
    Cancelled(RideId),
    /// The tracked ride or offer went to another vehicle and a different ride
    /// is now assigned to this one.
    Reassigned {
        from: RideId,
        to: RideId,
        transition: Transition,
    },
    /// The tracked ride went to another vehicle and nothing replaced it.
    Lost(RideId),
}

impl ReconcileOutcome {
    /// The outcome changed local state.
    pub fn is_transition(&self) -> bool {
        !matches!(
            self,
            ReconcileOutcome::Untracked | ReconcileOutcome::Unchanged | ReconcileOutcome::Observed(_)
        )
    }
}

/// Applies the registry's view of the tracked ride to `ride`.
pub fn reconcile(
    ride: &mut RideContext,
    ledger: &mut SnapshotLedger,
    registry: &RideRegistry,
    me: &VehicleId,
) -> Result<ReconcileOutcome, ReconcileError> {
    let Some(tracked) = ride.ride_id().cloned() else {
        return Ok(ReconcileOutcome::Untracked);
    };
    let remote = registry
        .find(&tracked)?
        .ok_or_else(|| ReconcileError::RideMissing(tracked.clone()))?;

    let snapshot = RemoteSnapshot::of(&remote, me);
    if ledger.last_seen(&tracked) == Some(&snapshot) {
        return Ok(ReconcileOutcome::Unchanged);
    }

    let outcome = apply_remote(ride, remote, &snapshot.assignment, registry, me)?;
    if ride.ride_id() == Some(&tracked) {
        ledger.record(tracked, snapshot);
    } else {
        ledger.forget(&tracked);
    }
    Ok(outcome)
}

fn apply_remote(
    ride: &mut RideContext,
    remote: RemoteRide,
    assignment: &Assignment,
    registry: &RideRegistry,
    me: &VehicleId,
) -> Result<ReconcileOutcome, ReconcileError> {
    use RemoteStatus::*;

    let from = ride.phase();
    let outcome = match (from, remote.status, assignment) {
        (RidePhase::OfferPending, Accepted | Pickup, Assignment::ThisUnit) => {
            ride.accept()?;
            if remote.status == Pickup {
                ride.confirm_pickup()?;
            }
            ReconcileOutcome::RemoteAccepted(Transition {
                from,
                to: ride.phase(),
            })
        }
        (RidePhase::OfferPending, Accepted | Pickup | Completed | PendingReview, Assignment::Other(by)) => {
            let by = by.clone();
            return reassign(ride, remote.ride_id, registry, me, |ride_id| {
                ReconcileOutcome::OfferTaken { ride_id, by }
            });
        }
        (RidePhase::OfferPending, Completed | PendingReview | Cancelled, _) => {
            ride.finish();
            ReconcileOutcome::OfferWithdrawn(remote.ride_id)
        }
        (RidePhase::ToPickup | RidePhase::ToDestination, Accepted | Pickup, Assignment::Other(_)) => {
            return reassign(ride, remote.ride_id, registry, me, ReconcileOutcome::Lost);
        }
        (RidePhase::ToPickup, Pickup, _) => ReconcileOutcome::RemotePickup(ride.confirm_pickup()?),
        (RidePhase::ToPickup | RidePhase::ToDestination, status, _) if status.is_finished() => {
            match ride.finish() {
                Some(finished) => ReconcileOutcome::RemoteCompleted {
                    ride: finished,
                    remote,
                },
                None => ReconcileOutcome::Untracked,
            }
        }
        (RidePhase::ToPickup | RidePhase::ToDestination, Cancelled, _) => {
            ride.finish();
            ReconcileOutcome::Cancelled(remote.ride_id)
        }
        (_, status, _) => ReconcileOutcome::Observed(status),
    };
    Ok(outcome)
}

/// Moves onto another ride the registry assigns to `me` after `lost` went
/// elsewhere. With no replacement the ride ends with `otherwise(lost)`.
fn reassign(
    ride: &mut RideContext,
    lost: RideId,
    registry: &RideRegistry,
    me: &VehicleId,
    otherwise: impl FnOnce(RideId) -> ReconcileOutcome,
) -> Result<ReconcileOutcome, ReconcileError> {
    let replacement = registry.assigned_to(me).find(|candidate| {
        candidate.ride_id != lost
            && matches!(
                candidate.status,
                RemoteStatus::Pending | RemoteStatus::Accepted | RemoteStatus::Pickup
            )
    });

    let Some(next) = replacement else {
        ride.finish();
        return Ok(otherwise(lost));
    };

    let transition = ride.adopt(
        next.ride_id.clone(),
        next.pickup.as_deref().unwrap_or_default(),
        next.destination.as_deref().unwrap_or_default(),
        phase_for(next.status),
    )?;
    Ok(ReconcileOutcome::Reassigned {
        from: lost,
        to: next.ride_id,
        transition,
    })
}
