use tracing::warn;

use super::error::Result;
use super::store::{KeyStore, LEGACY_SCHEDULE_KEY, SIMULATIONS_KEY};
use super::types::{PaymentRow, SimulationRecord, StoredState};

pub struct SimulationArchive<S> {
    store: S,
}

impl<S: KeyStore> SimulationArchive<S> {
    pub fn new(store: S) -> Self {
        SimulationArchive { store }
    }

    // Oldest first. Missing, unreadable or corrupt data loads as an
    // empty collection after a logged warning, never as an error.
    pub fn load_all(&self) -> Vec<SimulationRecord> {
        let raw = match self.store.read(SIMULATIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("failed to read '{SIMULATIONS_KEY}': {e}");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!("discarding corrupt data under '{SIMULATIONS_KEY}': {e}");
                Vec::new()
            }
        }
    }

    /// Appends one record and persists the whole collection, returning the
    /// updated sequence. The write is a non-atomic read-modify-write:
    /// concurrent appends against the same store race and the last writer
    /// wins the entire collection.
    pub fn append(&self, record: SimulationRecord) -> Result<Vec<SimulationRecord>> {
        let mut records = self.load_all();
        records.push(record);
        let raw = serde_json::to_string(&records)?;
        self.store.write(SIMULATIONS_KEY, &raw)?;
        Ok(records)
    }

    // Resolution order: populated archive, usable legacy schedule, empty.
    // The legacy key is read-only and is never migrated in place.
    pub fn load_state(&self) -> StoredState {
        let records = self.load_all();
        if !records.is_empty() {
            return StoredState::Archive(records);
        }

        match self.read_legacy_schedule() {
            Some(rows) if !rows.is_empty() => StoredState::Legacy(rows),
            _ => StoredState::Empty,
        }
    }

    fn read_legacy_schedule(&self) -> Option<Vec<PaymentRow>> {
        let raw = match self.store.read(LEGACY_SCHEDULE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("failed to read '{LEGACY_SCHEDULE_KEY}': {e}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!("discarding corrupt data under '{LEGACY_SCHEDULE_KEY}': {e}");
                None
            }
        }
    }
}
