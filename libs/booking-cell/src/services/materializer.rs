use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use shared_models::appointment::{MaterializedSlot, SlotKey};
use shared_models::schedule::Weekday;
use shared_store::MemoryStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::BookingError;

/// Turns weekly availability templates into concrete dated slots with
/// live occupancy. Templates sharing a start time fold into one slot
/// whose capacity is the sum and whose end time is the latest window end.
pub struct SlotMaterializer {
    store: Arc<MemoryStore>,
}

impl SlotMaterializer {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Concrete slots for one doctor on one date. Past dates, Sundays and
    /// dates with no templates all yield an empty list; on the current
    /// date, slots whose start time has already passed are dropped.
    pub async fn slots_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Vec<MaterializedSlot> {
        if date < now.date_naive() {
            debug!("Not materializing past date {}", date);
            return Vec::new();
        }

        let day = match Weekday::from_date(date) {
            Some(day) => day,
            None => return Vec::new(),
        };

        let templates = self.store.templates_for_doctor(doctor_id, day).await;

        let mut grouped: BTreeMap<NaiveTime, (NaiveTime, u32)> = BTreeMap::new();
        for template in templates.into_iter().filter(|t| t.is_available) {
            let entry = grouped
                .entry(template.start_time)
                .or_insert((template.end_time, 0));
            entry.0 = entry.0.max(template.end_time);
            entry.1 += template.max_appointments;
        }

        let occupancy = self.store.occupancy_for_day(doctor_id, date).await;

        grouped
            .into_iter()
            .filter(|(start_time, _)| {
                date.and_time(*start_time).and_utc() > now
            })
            .map(|(start_time, (end_time, capacity))| {
                let key = SlotKey {
                    doctor_id,
                    date,
                    start_time,
                };
                MaterializedSlot {
                    doctor_id,
                    date,
                    start_time,
                    end_time,
                    capacity,
                    booked_count: occupancy.get(&key).copied().unwrap_or(0),
                }
            })
            .collect()
    }

    /// Re-derives a slot's capacity and end time from the templates. The
    /// client never supplies capacity; this is the only source of truth
    /// a reservation is checked against.
    pub async fn resolve_slot(
        &self,
        slot: SlotKey,
        now: DateTime<Utc>,
    ) -> Result<MaterializedSlot, BookingError> {
        let slots = self.slots_for_day(slot.doctor_id, slot.date, now).await;
        slots
            .into_iter()
            .find(|s| s.start_time == slot.start_time)
            .ok_or_else(|| {
                BookingError::NotFound(format!(
                    "No bookable slot for doctor {} on {} at {}",
                    slot.doctor_id,
                    slot.date,
                    slot.start_time.format("%H:%M")
                ))
            })
    }
}
