use chrono::{DateTime, NaiveDate, Utc};
use shared_models::appointment::MaterializedSlot;
use shared_store::MemoryStore;
use std::sync::Arc;
use uuid::Uuid;

use crate::services::materializer::SlotMaterializer;

/// Read side of the booking surface: what patients see when they browse
/// a doctor's day. Only counts are exposed, never who holds the spots.
pub struct AvailabilityQueryService {
    materializer: SlotMaterializer,
}

impl AvailabilityQueryService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            materializer: SlotMaterializer::new(store),
        }
    }

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Vec<MaterializedSlot> {
        self.materializer.slots_for_day(doctor_id, date, now).await
    }

    /// Slots with at least one free spot.
    pub async fn open_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Vec<MaterializedSlot> {
        self.available_slots(doctor_id, date, now)
            .await
            .into_iter()
            .filter(|s| s.available_spots() > 0)
            .collect()
    }
}
