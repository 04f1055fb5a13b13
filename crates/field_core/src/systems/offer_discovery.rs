use bevy_ecs::prelude::{Res, ResMut};

use crate::backend::BackendResource;
use crate::clock::{CallSite, CallThrottle, FieldClock};
use crate::config::PollingConfig;
use crate::ecs::VehicleState;
use crate::reconcile::{surface_offer, DiscoveryOutcome, SeenOffers};
use crate::ride::{RideContext, RidePhase};
use crate::telemetry::{Connectivity, Notice, OperatorNotices};

use super::{note_backend_ok, note_poll_failure};

/// Polls for offers while idle and surfaces the first one not seen before.
#[allow(clippy::too_many_arguments)]
pub fn offer_discovery_system(
    clock: Res<FieldClock>,
    mut throttle: ResMut<CallThrottle>,
    polling: Res<PollingConfig>,
    vehicle: Res<VehicleState>,
    backend: Res<BackendResource>,
    mut ride: ResMut<RideContext>,
    mut seen: ResMut<SeenOffers>,
    mut connectivity: ResMut<Connectivity>,
    mut notices: ResMut<OperatorNotices>,
) {
    if ride.phase() != RidePhase::Idle {
        return;
    }
    let site = CallSite::OfferDiscovery;
    if throttle
        .try_acquire(site, clock.now(), polling.interval_ms(site))
        .is_none()
    {
        return;
    }

    let offers = match backend.0.pending_offers(&vehicle.id) {
        Ok(offers) => {
            note_backend_ok(&mut connectivity, &mut notices);
            offers
        }
        Err(err) => {
            note_poll_failure("offer discovery", &err, &mut connectivity, &mut notices);
            return;
        }
    };

    match surface_offer(&mut ride, &mut seen, &offers) {
        DiscoveryOutcome::Surfaced { offer, .. } => {
            log::info!(
                "offer {}: {} -> {} ({} pending)",
                offer.ride_id,
                offer.pickup,
                offer.destination,
                offers.len()
            );
            notices.push(Notice::OfferSurfaced(offer));
        }
        DiscoveryOutcome::Refused { offer, reason } => {
            log::warn!("offer {} refused: {reason}", offer.ride_id);
            notices.push(Notice::OfferRefused {
                ride_id: offer.ride_id,
                reason,
            });
        }
        DiscoveryOutcome::Busy | DiscoveryOutcome::NothingNew => {}
    }
}
