//! Telemetry: finished rides and the operator notice queue.

use std::collections::VecDeque;
use std::fmt;

use bevy_ecs::prelude::Resource;

use crate::backend::{BackendError, CompletionReceipt, RideOffer};
use crate::command::{StatusReport, HELP_TEXT};
use crate::ecs::RideId;
use crate::ride::{RideError, RidePhase};

/// One finished ride, recorded when the context is cleared by a drop-off.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRideRecord {
    pub ride_id: RideId,
    /// Points awarded by this completion; zero when completed remotely.
    pub points: u32,
    pub drop_distance_m: Option<f64>,
    pub pending_review: bool,
    pub completed_remotely: bool,
    pub completed_at_ms: u64,
}

#[derive(Debug, Default, Resource)]
pub struct RideLog {
    pub completed: Vec<CompletedRideRecord>,
}

impl RideLog {
    pub fn record(&mut self, record: CompletedRideRecord) {
        self.completed.push(record);
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    pub fn total_points(&self) -> u64 {
        self.completed.iter().map(|r| u64::from(r.points)).sum()
    }

    pub fn last(&self) -> Option<&CompletedRideRecord> {
        self.completed.last()
    }

    pub fn contains(&self, ride: &RideId) -> bool {
        self.completed.iter().any(|r| &r.ride_id == ride)
    }
}

/// Something the operator has to see.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Registered { vehicle: String },
    OfferSurfaced(RideOffer),
    OfferRefused { ride_id: RideId, reason: RideError },
    Accepted(RideId),
    Rejected(RideId),
    RideTaken(RideId),
    Refused(RideError),
    Arrived { phase: RidePhase, waypoint: &'static str },
    PickedUp(RideId),
    Completed { ride_id: RideId, receipt: CompletionReceipt, total_points: u32 },
    RemoteAccepted(RideId),
    /// The dispatcher assigned a ride to this unit while it was idle.
    Assigned { ride_id: RideId, phase: RidePhase },
    RemotePickup(RideId),
    RemoteCompleted(RideId),
    OfferWithdrawn(RideId),
    Cancelled(RideId),
    Reassigned { from: RideId, to: RideId },
    Lost(RideId),
    Offline,
    BackOnline,
    BackendFailed(String),
    Busy,
    Status(StatusReport),
    Help,
}

impl Notice {
    pub fn backend(err: &BackendError) -> Self {
        if err.is_offline() {
            Notice::Offline
        } else {
            Notice::BackendFailed(err.to_string())
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Registered { vehicle } => write!(f, "registered as {vehicle}"),
            Notice::OfferSurfaced(offer) => {
                write!(f, "NEW RIDE {}: {} -> {}", offer.ride_id, offer.pickup, offer.destination)?;
                if let Some(km) = offer.distance_km {
                    write!(f, " ({km:.1} km)")?;
                }
                write!(f, ", est. {} points. ACCEPT or REJECT", offer.points_estimate())
            }
            Notice::OfferRefused { ride_id, reason } => write!(f, "ride {ride_id} skipped: {reason}"),
            Notice::Accepted(id) => write!(f, "ride {id} accepted, heading to pickup"),
            Notice::Rejected(id) => write!(f, "ride {id} rejected"),
            Notice::RideTaken(id) => write!(f, "ride {id} taken by another vehicle"),
            Notice::Refused(err) => write!(f, "cannot do that: {err}"),
            Notice::Arrived { phase, waypoint } => match phase {
                RidePhase::ToDestination => write!(f, "arrived at destination {waypoint}, send COMPLETE"),
                _ => write!(f, "arrived at pickup {waypoint}, send PICKUP"),
            },
            Notice::PickedUp(id) => write!(f, "passenger on board for ride {id}"),
            Notice::Completed {
                ride_id,
                receipt,
                total_points,
            } => {
                write!(f, "ride {ride_id} completed, +{} points", receipt.points)?;
                if let Some(m) = receipt.drop_distance_m {
                    write!(f, ", drop {m:.0} m from destination")?;
                }
                if receipt.pending_review {
                    f.write_str(", pending review")?;
                }
                write!(f, " (total {total_points})")
            }
            Notice::RemoteAccepted(id) => write!(f, "ride {id} accepted remotely, heading to pickup"),
            Notice::Assigned { ride_id, phase } => match phase {
                RidePhase::ToDestination => write!(f, "ride {ride_id} assigned by dispatcher, passenger on board"),
                _ => write!(f, "ride {ride_id} assigned by dispatcher, heading to pickup"),
            },
            Notice::RemotePickup(id) => write!(f, "ride {id} picked up remotely, heading to destination"),
            Notice::RemoteCompleted(id) => write!(f, "ride {id} completed remotely"),
            Notice::OfferWithdrawn(id) => write!(f, "ride {id} is no longer available"),
            Notice::Cancelled(id) => write!(f, "ride {id} cancelled"),
            Notice::Reassigned { from, to } => write!(f, "ride {from} reassigned, now handling ride {to}"),
            Notice::Lost(id) => write!(f, "ride {id} reassigned to another vehicle"),
            Notice::Offline => f.write_str("backend offline, will retry"),
            Notice::BackOnline => f.write_str("backend reachable again"),
            Notice::BackendFailed(reason) => write!(f, "backend error: {reason}"),
            Notice::Busy => f.write_str("request already in flight, try again shortly"),
            Notice::Status(report) => write!(f, "{report}"),
            Notice::Help => f.write_str(HELP_TEXT),
        }
    }
}

/// Notices waiting for the console.
#[derive(Debug, Default, Resource)]
pub struct OperatorNotices {
    queue: VecDeque<Notice>,
}

impl OperatorNotices {
    pub fn push(&mut self, notice: Notice) {
        log::debug!("notice: {notice}");
        self.queue.push_back(notice);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Notice> + '_ {
        self.queue.drain(..)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.queue.iter()
    }
}

/// Tracks whether the last backend call got through, so going offline is
/// announced once rather than on every failed poll.
#[derive(Debug, Resource)]
pub struct Connectivity {
    online: bool,
    failed_calls: u64,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self {
            online: true,
            failed_calls: 0,
        }
    }
}

impl Connectivity {
    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn failed_calls(&self) -> u64 {
        self.failed_calls
    }

    /// Returns `true` if this call ended an offline stretch.
    pub fn record_success(&mut self) -> bool {
        let recovered = !self.online;
        self.online = true;
        recovered
    }

    /// Returns `true` if this call started an offline stretch.
    pub fn record_offline(&mut self) -> bool {
        self.failed_calls += 1;
        let dropped = self.online;
        self.online = false;
        dropped
    }
}
