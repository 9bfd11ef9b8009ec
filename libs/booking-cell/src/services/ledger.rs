use shared_models::appointment::{LedgerEntry, SlotKey};
use shared_store::{MemoryStore, StoreError};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::BookingError;

/// Capacity accounting for slots. Every live reservation is one ledger
/// entry; the store's per-slot lock makes reserve an atomic
/// check-then-insert so occupancy can never exceed capacity.
pub struct BookingLedger {
    store: Arc<MemoryStore>,
}

impl BookingLedger {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub async fn reserve(
        &self,
        slot: SlotKey,
        capacity: u32,
        appointment_id: Uuid,
        patient_id: Uuid,
    ) -> Result<LedgerEntry, BookingError> {
        let entry = self
            .store
            .reserve_slot(slot, capacity, appointment_id, patient_id)
            .await
            .map_err(|e| match e {
                StoreError::SlotFull(key) => BookingError::SlotFull(format!(
                    "No available spots left for doctor {} on {} at {}",
                    key.doctor_id,
                    key.date,
                    key.start_time.format("%H:%M")
                )),
                StoreError::NotFound(msg) => BookingError::NotFound(msg),
            })?;

        info!(
            "Reserved spot in slot {} for appointment {}",
            slot, appointment_id
        );
        Ok(entry)
    }

    /// Releases the reservation held by an appointment. Safe to call more
    /// than once; only the first call changes anything.
    pub async fn release(&self, appointment_id: Uuid) -> bool {
        let released = self.store.release_by_appointment(appointment_id).await;
        if released {
            info!("Released reservation for appointment {}", appointment_id);
        } else {
            debug!(
                "No live reservation to release for appointment {}",
                appointment_id
            );
        }
        released
    }

    pub async fn occupancy(&self, slot: SlotKey) -> u32 {
        self.store.occupancy(slot).await
    }
}
