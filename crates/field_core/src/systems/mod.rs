//! Tick systems. Each one is throttled per call-site and does nothing when
//! its interval has not elapsed yet.

pub mod acceptance_watch;
pub mod assignment_watch;
pub mod command_intake;
pub mod location_push;
pub mod movement;
pub mod offer_discovery;
pub mod registry_sync;
pub mod status_watch;

use crate::backend::BackendError;
use crate::telemetry::{Connectivity, Notice, OperatorNotices};

/// Marks a successful backend call; announces recovery after an outage.
pub(crate) fn note_backend_ok(connectivity: &mut Connectivity, notices: &mut OperatorNotices) {
    if connectivity.record_success() {
        log::info!("backend reachable again");
        notices.push(Notice::BackOnline);
    }
}

/// Logs a failed background poll. Only the start of an outage reaches the
/// operator.
pub(crate) fn note_poll_failure(
    call: &str,
    err: &BackendError,
    connectivity: &mut Connectivity,
    notices: &mut OperatorNotices,
) {
    if !err.is_offline() {
        log::warn!("{call} failed: {err}");
        return;
    }
    if connectivity.record_offline() {
        log::warn!("{call}: backend offline");
        notices.push(Notice::Offline);
    } else {
        log::debug!("{call}: backend still offline");
    }
}

/// Reports a failed operator-initiated call. The operator always hears
/// about it since they are waiting for an answer.
pub(crate) fn note_submit_failure(
    call: &str,
    err: &BackendError,
    connectivity: &mut Connectivity,
    notices: &mut OperatorNotices,
) {
    if err.is_offline() {
        connectivity.record_offline();
    }
    log::warn!("{call} failed: {err}");
    notices.push(Notice::backend(err));
}
