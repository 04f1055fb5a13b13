use crate::clock::CallSite;

use super::registry_sync::RegistrySync;

/// Keeps an active ride in line with the registry: remote pickup, remote
/// completion, cancellation and reassignment.
pub fn status_watch_system(mut sync: RegistrySync) {
    sync.poll(CallSite::StatusWatch);
}
