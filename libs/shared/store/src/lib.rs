use chrono::{DateTime, Utc};
use shared_config::AppConfig;
use shared_models::appointment::{Appointment, LedgerEntry, SlotKey};
use shared_models::schedule::{AvailabilityTemplate, Weekday};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Slot is fully booked: {0}")]
    SlotFull(SlotKey),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Shared handle threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<MemoryStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: Arc::new(MemoryStore::new()),
        }
    }
}

/// In-process persistence layer. Tables are independent RwLocks; the
/// per-slot lock registry serializes capacity checks so a reserve is a
/// single atomic check-then-insert against a slot.
pub struct MemoryStore {
    templates: RwLock<HashMap<Uuid, AvailabilityTemplate>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    ledger: RwLock<HashMap<Uuid, LedgerEntry>>,
    slot_locks: Mutex<HashMap<SlotKey, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            appointments: RwLock::new(HashMap::new()),
            ledger: RwLock::new(HashMap::new()),
            slot_locks: Mutex::new(HashMap::new()),
        }
    }

    // -- availability templates --

    pub async fn insert_template(&self, template: AvailabilityTemplate) {
        self.templates
            .write()
            .await
            .insert(template.id, template);
    }

    pub async fn get_template(&self, id: Uuid) -> Option<AvailabilityTemplate> {
        self.templates.read().await.get(&id).cloned()
    }

    pub async fn update_template(&self, template: AvailabilityTemplate) -> Result<(), StoreError> {
        let mut templates = self.templates.write().await;
        if !templates.contains_key(&template.id) {
            return Err(StoreError::NotFound(format!(
                "availability template {}",
                template.id
            )));
        }
        templates.insert(template.id, template);
        Ok(())
    }

    pub async fn delete_template(&self, id: Uuid) -> Result<AvailabilityTemplate, StoreError> {
        self.templates
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("availability template {}", id)))
    }

    pub async fn list_templates(&self, day: Option<Weekday>) -> Vec<AvailabilityTemplate> {
        let templates = self.templates.read().await;
        let mut result: Vec<AvailabilityTemplate> = templates
            .values()
            .filter(|t| day.map_or(true, |d| t.day == d))
            .cloned()
            .collect();
        result.sort_by_key(|t| (t.day, t.start_time));
        result
    }

    pub async fn templates_for_doctor(
        &self,
        doctor_id: Uuid,
        day: Weekday,
    ) -> Vec<AvailabilityTemplate> {
        let templates = self.templates.read().await;
        let mut result: Vec<AvailabilityTemplate> = templates
            .values()
            .filter(|t| t.doctor_id == doctor_id && t.day == day)
            .cloned()
            .collect();
        result.sort_by_key(|t| t.start_time);
        result
    }

    // -- appointments --

    pub async fn insert_appointment(&self, appointment: Appointment) {
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment);
    }

    pub async fn get_appointment(&self, id: Uuid) -> Option<Appointment> {
        self.appointments.read().await.get(&id).cloned()
    }

    pub async fn update_appointment(&self, appointment: Appointment) -> Result<(), StoreError> {
        let mut appointments = self.appointments.write().await;
        if !appointments.contains_key(&appointment.id) {
            return Err(StoreError::NotFound(format!(
                "appointment {}",
                appointment.id
            )));
        }
        appointments.insert(appointment.id, appointment);
        Ok(())
    }

    pub async fn appointments_where<F>(&self, predicate: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let appointments = self.appointments.read().await;
        let mut result: Vec<Appointment> = appointments
            .values()
            .filter(|a| predicate(a))
            .cloned()
            .collect();
        result.sort_by_key(|a| (a.date, a.start_time, a.created_at));
        result
    }

    // -- booking ledger --

    /// Atomically reserves one spot in a slot. The per-slot mutex makes the
    /// occupancy count and the ledger insert a single critical section, so
    /// concurrent reserves against the same slot cannot both observe the
    /// last free spot.
    pub async fn reserve_slot(
        &self,
        slot: SlotKey,
        capacity: u32,
        appointment_id: Uuid,
        patient_id: Uuid,
    ) -> Result<LedgerEntry, StoreError> {
        let lock = self.slot_lock(slot).await;
        let _guard = lock.lock().await;

        let booked = self.occupancy(slot).await;
        if booked >= capacity {
            debug!("Slot {} full: {}/{}", slot, booked, capacity);
            return Err(StoreError::SlotFull(slot));
        }

        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            appointment_id,
            patient_id,
            slot,
            released: false,
            created_at: Utc::now(),
            released_at: None,
        };

        self.ledger.write().await.insert(entry.id, entry.clone());
        debug!("Reserved slot {}: now {}/{}", slot, booked + 1, capacity);

        Ok(entry)
    }

    /// Releases the reservation held by an appointment. Idempotent: an
    /// already-released or missing entry is a no-op.
    pub async fn release_by_appointment(&self, appointment_id: Uuid) -> bool {
        let mut ledger = self.ledger.write().await;
        let entry = ledger
            .values_mut()
            .find(|e| e.appointment_id == appointment_id && !e.released);

        match entry {
            Some(entry) => {
                entry.released = true;
                entry.released_at = Some(Utc::now());
                debug!("Released slot {} for appointment {}", entry.slot, appointment_id);
                true
            }
            None => false,
        }
    }

    /// Live reservations against a slot.
    pub async fn occupancy(&self, slot: SlotKey) -> u32 {
        self.ledger
            .read()
            .await
            .values()
            .filter(|e| e.slot == slot && !e.released)
            .count() as u32
    }

    pub async fn occupancy_for_day(&self, doctor_id: Uuid, date: chrono::NaiveDate) -> HashMap<SlotKey, u32> {
        let ledger = self.ledger.read().await;
        let mut counts: HashMap<SlotKey, u32> = HashMap::new();
        for entry in ledger.values() {
            if !entry.released && entry.slot.doctor_id == doctor_id && entry.slot.date == date {
                *counts.entry(entry.slot).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Drops slot locks for dates already in the past so the registry does
    /// not grow without bound. Returns the number of locks removed.
    pub async fn prune_past_slots(&self, now: DateTime<Utc>) -> usize {
        let today = now.date_naive();
        let mut locks = self.slot_locks.lock().await;
        let before = locks.len();
        locks.retain(|key, _| key.date >= today);
        before - locks.len()
    }

    async fn slot_lock(&self, slot: SlotKey) -> Arc<Mutex<()>> {
        let mut locks = self.slot_locks.lock().await;
        locks
            .entry(slot)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn slot(date: NaiveDate) -> SlotKey {
        SlotKey {
            doctor_id: Uuid::new_v4(),
            date,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_reserve_respects_capacity() {
        let store = MemoryStore::new();
        let key = slot(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());

        store
            .reserve_slot(key, 1, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();

        let second = store
            .reserve_slot(key, 1, Uuid::new_v4(), Uuid::new_v4())
            .await;
        assert!(matches!(second, Err(StoreError::SlotFull(_))));
        assert_eq!(store.occupancy(key).await, 1);
    }

    #[tokio::test]
    async fn test_prune_past_slots() {
        let store = MemoryStore::new();
        let past = slot(NaiveDate::from_ymd_opt(2025, 5, 26).unwrap());
        let future = slot(NaiveDate::from_ymd_opt(2025, 6, 9).unwrap());

        store
            .reserve_slot(past, 1, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        store
            .reserve_slot(future, 1, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        assert_eq!(store.prune_past_slots(now).await, 1);
        // Second sweep finds nothing left to drop
        assert_eq!(store.prune_past_slots(now).await, 0);
    }
}
