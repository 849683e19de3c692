//! Version history: list, restore, recover.
//!
//! Thin orchestration over the store. Restores re-enter the coordinator's
//! normal load path so a restored snapshot flows through the same fan-out
//! (and upholds the same invariants) as any other load.

use std::sync::Arc;

use log::info;

use beltane_store::ProjectStore;
use beltane_types::{CompositionId, VersionEntry};

use crate::coordinator::Coordinator;
use crate::error::CoreError;

pub struct VersionHistory {
    store: Arc<dyn ProjectStore>,
}

impl VersionHistory {
    pub fn new(store: Arc<dyn ProjectStore>) -> Self {
        Self { store }
    }

    /// History entries in the store's order (newest first); never
    /// re-sorted client-side.
    pub fn list(&self, id: CompositionId) -> Result<Vec<VersionEntry>, CoreError> {
        Ok(self.store.list_history(id)?)
    }

    /// Restore a stored version: the store replaces the live rows from the
    /// version's snapshot, then the coordinator reloads through the normal
    /// path.
    pub fn restore_version(
        &self,
        coordinator: &mut Coordinator,
        id: CompositionId,
        version: i64,
    ) -> Result<(), CoreError> {
        self.store.restore_version(id, version)?;
        info!("restored composition {} to version {}", id, version);
        coordinator.begin_load(id);
        Ok(())
    }

    /// Crash-recovery escape hatch: load the last autosave payload through
    /// the normal fan-out, distinct from ordinary version history.
    pub fn recover_from_autosave(
        &self,
        coordinator: &mut Coordinator,
        id: CompositionId,
    ) -> Result<(), CoreError> {
        coordinator.begin_load_autosave(id);
        Ok(())
    }
}
