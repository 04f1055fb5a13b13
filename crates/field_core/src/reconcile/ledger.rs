use std::collections::{HashMap, HashSet, VecDeque};

use bevy_ecs::prelude::Resource;

use crate::backend::{Assignment, RemoteRide, RemoteStatus};
use crate::ecs::{RideId, VehicleId};

/// The part of a remote ride whose change can trigger a local transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnapshot {
    pub status: RemoteStatus,
    pub assignment: Assignment,
}

impl RemoteSnapshot {
    pub fn of(ride: &RemoteRide, me: &VehicleId) -> Self {
        Self {
            status: ride.status,
            assignment: ride.assignment(me),
        }
    }
}

/// Last remote snapshot seen per tracked ride. A transition fires only when
/// the snapshot differs from the recorded one.
#[derive(Debug, Default, Resource)]
pub struct SnapshotLedger {
    last_seen: HashMap<RideId, RemoteSnapshot>,
}

impl SnapshotLedger {
    pub fn last_seen(&self, ride: &RideId) -> Option<&RemoteSnapshot> {
        self.last_seen.get(ride)
    }

    pub fn record(&mut self, ride: RideId, snapshot: RemoteSnapshot) {
        self.last_seen.insert(ride, snapshot);
    }

    pub fn forget(&mut self, ride: &RideId) {
        self.last_seen.remove(ride);
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

/// How many offer ids [`SeenOffers`] keeps before forgetting the oldest.
pub const SEEN_OFFERS_CAPACITY: usize = 512;

/// Offer ids already surfaced to (or refused on behalf of) the operator.
///
/// Bounded: once full, the oldest id is forgotten. The backend issues ids in
/// increasing order and stops listing old offers long before that many newer
/// ones have been seen.
#[derive(Debug, Resource)]
pub struct SeenOffers {
    ids: HashSet<RideId>,
    order: VecDeque<RideId>,
    capacity: usize,
}

impl Default for SeenOffers {
    fn default() -> Self {
        Self::with_capacity(SEEN_OFFERS_CAPACITY)
    }
}

impl SeenOffers {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, ride: &RideId) -> bool {
        self.ids.contains(ride)
    }

    /// Returns `true` the first time an id is seen.
    pub fn mark(&mut self, ride: RideId) -> bool {
        if !self.ids.insert(ride.clone()) {
            return false;
        }
        self.order.push_back(ride);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
