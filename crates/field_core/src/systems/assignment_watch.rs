use crate::clock::CallSite;

use super::registry_sync::RegistrySync;

/// While idle, adopts a ride the dispatcher assigned straight to this unit.
/// Such rides never show up as offers.
pub fn assignment_watch_system(mut sync: RegistrySync) {
    sync.watch_assignments(CallSite::AssignmentWatch);
}
