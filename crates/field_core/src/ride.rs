//! Ride lifecycle state machine.
//!
//! [`RideContext`] is the single source of truth for the ride this unit is
//! working on. The phase lives inside the optional [`ActiveRide`], so an idle
//! context cannot carry a stale id, and the navigation target is derived from
//! the phase instead of being stored beside it.
//!
//! Local operations that need the backend are split into a guard check
//! (`check_*`) and a commit, so the caller can perform the network call in
//! between and leave the context untouched if it fails.

use bevy_ecs::prelude::Resource;
use thiserror::Error;

use crate::ecs::RideId;
use crate::geo::{distance_m, Coordinate};
use crate::waypoints::{self, NamedWaypoint};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RidePhase {
    #[default]
    Idle,
    OfferPending,
    ToPickup,
    ToDestination,
}

impl RidePhase {
    pub fn is_active(self) -> bool {
        matches!(self, RidePhase::ToPickup | RidePhase::ToDestination)
    }

    pub fn label(self) -> &'static str {
        match self {
            RidePhase::Idle => "IDLE",
            RidePhase::OfferPending => "OFFER_PENDING",
            RidePhase::ToPickup => "TO_PICKUP",
            RidePhase::ToDestination => "TO_DESTINATION",
        }
    }
}

impl std::fmt::Display for RidePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A resolved endpoint of a ride: the rider's label and the catalog point it
/// resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct RideStop {
    pub label: String,
    pub waypoint: NamedWaypoint,
}

impl RideStop {
    pub fn resolve(label: &str) -> Result<Self, RideError> {
        let waypoint =
            waypoints::resolve(label).ok_or_else(|| RideError::UnresolvedWaypoint(label.to_string()))?;
        Ok(Self {
            label: label.trim().to_string(),
            waypoint,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRide {
    pub id: RideId,
    pub pickup: RideStop,
    pub destination: RideStop,
    phase: RidePhase,
}

impl ActiveRide {
    pub fn phase(&self) -> RidePhase {
        self.phase
    }

    /// Where the vehicle should be heading in the current phase. Offers
    /// already point at the pickup so the operator can see how far it is.
    pub fn target(&self) -> &NamedWaypoint {
        match self.phase {
            RidePhase::ToDestination => &self.destination.waypoint,
            _ => &self.pickup.waypoint,
        }
    }
}

/// Observable result of a state-machine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: RidePhase,
    pub to: RidePhase,
}

impl Transition {
    fn new(from: RidePhase, to: RidePhase) -> Self {
        Self { from, to }
    }

    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Guard violations for local operations. The context is unchanged whenever
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RideError {
    #[error("no pending offer to act on")]
    NoPendingOffer,

    #[error("already handling ride {0}")]
    Busy(RideId),

    #[error("not heading to a pickup")]
    NotHeadingToPickup,

    #[error("not heading to a destination")]
    NotHeadingToDestination,

    #[error("too far: {distance_m:.1} m away, must be within {threshold_m:.0} m")]
    TooFar { distance_m: f64, threshold_m: f64 },

    #[error("unknown location '{0}'")]
    UnresolvedWaypoint(String),
}

#[derive(Debug, Default, Clone, Resource)]
pub struct RideContext {
    ride: Option<ActiveRide>,
}

impl RideContext {
    pub fn phase(&self) -> RidePhase {
        self.ride.as_ref().map_or(RidePhase::Idle, |r| r.phase)
    }

    pub fn ride(&self) -> Option<&ActiveRide> {
        self.ride.as_ref()
    }

    pub fn ride_id(&self) -> Option<&RideId> {
        self.ride.as_ref().map(|r| &r.id)
    }

    pub fn target(&self) -> Option<&NamedWaypoint> {
        self.ride.as_ref().map(ActiveRide::target)
    }

    /// Distance from `position` to the current target, if a ride is tracked.
    pub fn distance_to_target(&self, position: Coordinate) -> Option<f64> {
        self.target().map(|wp| distance_m(position, wp.position))
    }

    /// IDLE → OFFER_PENDING. Both labels must resolve; an offer the vehicle
    /// cannot navigate is refused outright.
    pub fn offer(&mut self, id: RideId, pickup: &str, destination: &str) -> Result<Transition, RideError> {
        if let Some(current) = &self.ride {
            return Err(RideError::Busy(current.id.clone()));
        }
        let pickup = RideStop::resolve(pickup)?;
        let destination = RideStop::resolve(destination)?;
        self.ride = Some(ActiveRide {
            id,
            pickup,
            destination,
            phase: RidePhase::OfferPending,
        });
        Ok(Transition::new(RidePhase::Idle, RidePhase::OfferPending))
    }

    /// Guard for a local accept; returns the id to submit.
    pub fn check_accept(&self) -> Result<&RideId, RideError> {
        match &self.ride {
            Some(ride) if ride.phase == RidePhase::OfferPending => Ok(&ride.id),
            _ => Err(RideError::NoPendingOffer),
        }
    }

    /// OFFER_PENDING → TO_PICKUP, from a local accept or a remote one.
    /// Repeating it once in TO_PICKUP is a no-op.
    pub fn accept(&mut self) -> Result<Transition, RideError> {
        let ride = self.ride.as_mut().ok_or(RideError::NoPendingOffer)?;
        match ride.phase {
            RidePhase::OfferPending => {
                ride.phase = RidePhase::ToPickup;
                Ok(Transition::new(RidePhase::OfferPending, RidePhase::ToPickup))
            }
            RidePhase::ToPickup => Ok(Transition::new(RidePhase::ToPickup, RidePhase::ToPickup)),
            _ => Err(RideError::NoPendingOffer),
        }
    }

    /// OFFER_PENDING → IDLE.
    pub fn reject(&mut self) -> Result<RideId, RideError> {
        self.check_accept()?;
        self.clear().ok_or(RideError::NoPendingOffer)
    }

    /// Guard for a local pickup confirmation.
    pub fn check_pickup(&self, position: Coordinate, threshold_m: f64) -> Result<&RideId, RideError> {
        let ride = match &self.ride {
            Some(ride) if ride.phase == RidePhase::ToPickup => ride,
            _ => return Err(RideError::NotHeadingToPickup),
        };
        within_threshold(position, &ride.pickup.waypoint, threshold_m)?;
        Ok(&ride.id)
    }

    /// TO_PICKUP → TO_DESTINATION. Idempotent once in TO_DESTINATION.
    pub fn confirm_pickup(&mut self) -> Result<Transition, RideError> {
        let ride = self.ride.as_mut().ok_or(RideError::NotHeadingToPickup)?;
        match ride.phase {
            RidePhase::ToPickup => {
                ride.phase = RidePhase::ToDestination;
                Ok(Transition::new(RidePhase::ToPickup, RidePhase::ToDestination))
            }
            RidePhase::ToDestination => Ok(Transition::new(
                RidePhase::ToDestination,
                RidePhase::ToDestination,
            )),
            _ => Err(RideError::NotHeadingToPickup),
        }
    }

    /// Guard for a local completion.
    pub fn check_complete(&self, position: Coordinate, threshold_m: f64) -> Result<&RideId, RideError> {
        let ride = match &self.ride {
            Some(ride) if ride.phase == RidePhase::ToDestination => ride,
            _ => return Err(RideError::NotHeadingToDestination),
        };
        within_threshold(position, &ride.destination.waypoint, threshold_m)?;
        Ok(&ride.id)
    }

    /// Ends the ride in any phase and returns it.
    pub fn finish(&mut self) -> Option<ActiveRide> {
        self.ride.take()
    }

    fn clear(&mut self) -> Option<RideId> {
        self.ride.take().map(|r| r.id)
    }

    /// Replaces the tracked ride with one the backend says belongs to this
    /// unit. Nothing changes if either label fails to resolve.
    pub fn adopt(
        &mut self,
        id: RideId,
        pickup: &str,
        destination: &str,
        phase: RidePhase,
    ) -> Result<Transition, RideError> {
        let pickup = RideStop::resolve(pickup)?;
        let destination = RideStop::resolve(destination)?;
        let from = self.phase();
        if phase == RidePhase::Idle {
            self.ride = None;
        } else {
            self.ride = Some(ActiveRide {
                id,
                pickup,
                destination,
                phase,
            });
        }
        Ok(Transition::new(from, phase))
    }
}

fn within_threshold(position: Coordinate, waypoint: &NamedWaypoint, threshold_m: f64) -> Result<(), RideError> {
    let distance = distance_m(position, waypoint.position);
    if distance > threshold_m {
        return Err(RideError::TooFar {
            distance_m: distance,
            threshold_m,
        });
    }
    Ok(())
}
