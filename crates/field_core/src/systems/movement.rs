//! Movement system: drives the simulated vehicle toward the current target.
//!
//! The vehicle only moves while a ride is active. Each permitted step covers
//! `speed * elapsed` metres, with `elapsed` at most one step interval and the
//! distance capped at the remaining distance. Reaching the
//! arrival radius is announced once per ride and phase.

use bevy_ecs::prelude::{Res, ResMut, Resource};

use crate::clock::{CallSite, CallThrottle, FieldClock, ONE_SEC_MS};
use crate::config::{MotionConfig, PollingConfig};
use crate::ecs::{RideId, VehicleState};
use crate::geo::{advance, distance_m, kmh_to_mps};
use crate::ride::{RideContext, RidePhase};
use crate::telemetry::{Notice, OperatorNotices};

/// Remembers which leg the arrival notice was already given for.
#[derive(Debug, Default, Resource)]
pub struct Navigation {
    announced: Option<(RideId, RidePhase)>,
}

impl Navigation {
    /// Returns `true` the first time a given leg is announced.
    pub fn announce(&mut self, ride: &RideId, phase: RidePhase) -> bool {
        if matches!(&self.announced, Some((id, p)) if id == ride && *p == phase) {
            return false;
        }
        self.announced = Some((ride.clone(), phase));
        true
    }
}

#[allow(clippy::too_many_arguments)]
pub fn movement_system(
    clock: Res<FieldClock>,
    mut throttle: ResMut<CallThrottle>,
    polling: Res<PollingConfig>,
    motion: Res<MotionConfig>,
    mut vehicle: ResMut<VehicleState>,
    ride: Res<RideContext>,
    mut navigation: ResMut<Navigation>,
    mut notices: ResMut<OperatorNotices>,
) {
    let Some(active) = ride.ride() else {
        return;
    };
    if !active.phase().is_active() {
        return;
    }
    let site = CallSite::MovementStep;
    let step_ms = polling.interval_ms(site);
    let Some(elapsed_ms) = throttle.try_acquire(site, clock.now(), step_ms) else {
        return;
    };
    // The last step may belong to an earlier ride; never cover the idle gap.
    let elapsed_ms = elapsed_ms.min(step_ms);

    let target = *active.target();
    if distance_m(vehicle.position, target.position) > motion.arrival_epsilon_m {
        let elapsed_secs = elapsed_ms as f64 / ONE_SEC_MS as f64;
        vehicle.position = advance(
            vehicle.position,
            target.position,
            kmh_to_mps(motion.speed_kmh),
            elapsed_secs,
        );
    }

    let remaining = distance_m(vehicle.position, target.position);
    log::trace!("{} m to {}", remaining.round(), target.name);
    if remaining <= motion.arrival_epsilon_m && navigation.announce(&active.id, active.phase()) {
        log::info!("arrived at {} for ride {}", target.name, active.id);
        notices.push(Notice::Arrived {
            phase: active.phase(),
            waypoint: target.name,
        });
    }
}
