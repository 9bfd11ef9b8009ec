use chrono::{DateTime, Utc};
use shared_models::appointment::{Appointment, AppointmentStatus, SlotKey};
use shared_store::MemoryStore;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AppointmentSearchQuery, BookAppointmentRequest, BookingError};
use crate::services::ledger::BookingLedger;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::materializer::SlotMaterializer;

pub struct AppointmentBookingService {
    store: Arc<MemoryStore>,
    materializer: SlotMaterializer,
    ledger: BookingLedger,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            materializer: SlotMaterializer::new(store.clone()),
            ledger: BookingLedger::new(store.clone()),
            lifecycle: AppointmentLifecycleService::new(),
            store,
        }
    }

    /// Books a pending appointment into a slot. The reservation is taken
    /// before the appointment record is written, so a full slot can never
    /// leave an orphaned appointment behind.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        info!(
            "Booking appointment for patient {} with doctor {} on {} at {}",
            request.patient_id,
            request.doctor_id,
            request.date,
            request.start_time.format("%H:%M")
        );

        self.validate_booking_request(&request, now)?;

        let key = SlotKey {
            doctor_id: request.doctor_id,
            date: request.date,
            start_time: request.start_time,
        };

        // Capacity comes from the templates, never from the client.
        let slot = self.materializer.resolve_slot(key, now).await?;

        self.check_duplicate_booking(&request, key).await?;

        let appointment_id = Uuid::new_v4();
        self.ledger
            .reserve(key, slot.capacity, appointment_id, request.patient_id)
            .await?;

        let appointment = Appointment {
            id: appointment_id,
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            date: request.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            reason: request.reason,
            status: AppointmentStatus::Pending,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_appointment(appointment.clone()).await;
        info!("Booked appointment {}", appointment.id);

        Ok(appointment)
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, BookingError> {
        self.store
            .get_appointment(id)
            .await
            .ok_or_else(|| BookingError::NotFound(format!("appointment {}", id)))
    }

    /// Cancels an appointment and releases its slot reservation. Cancelling
    /// from a terminal state is rejected by the lifecycle check.
    pub async fn cancel_appointment(
        &self,
        id: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        let appointment = self
            .transition(id, AppointmentStatus::Cancelled, reason, now)
            .await?;

        self.ledger.release(id).await;

        Ok(appointment)
    }

    pub async fn confirm_appointment(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        self.transition(id, AppointmentStatus::Confirmed, None, now)
            .await
    }

    pub async fn complete_appointment(
        &self,
        id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        self.transition(id, AppointmentStatus::Completed, notes, now)
            .await
    }

    pub async fn search_appointments(&self, query: AppointmentSearchQuery) -> Vec<Appointment> {
        self.store
            .appointments_where(|a| {
                query.doctor_id.map_or(true, |id| a.doctor_id == id)
                    && query.patient_id.map_or(true, |id| a.patient_id == id)
                    && query.status.map_or(true, |s| a.status == s)
                    && query.date_from.map_or(true, |from| a.date >= from)
                    && query.date_to.map_or(true, |to| a.date <= to)
            })
            .await
    }

    pub async fn appointments_for_patient(&self, patient_id: Uuid) -> Vec<Appointment> {
        self.store
            .appointments_where(|a| a.patient_id == patient_id)
            .await
    }

    pub async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Vec<Appointment> {
        self.store
            .appointments_where(|a| a.doctor_id == doctor_id)
            .await
    }

    async fn transition(
        &self,
        id: Uuid,
        new_status: AppointmentStatus,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        let mut appointment = self.get_appointment(id).await?;

        self.lifecycle
            .validate_status_transition(&appointment.status, &new_status)?;

        appointment.status = new_status;
        if notes.is_some() {
            appointment.notes = notes;
        }
        appointment.updated_at = now;

        self.store
            .update_appointment(appointment.clone())
            .await
            .map_err(|e| BookingError::NotFound(e.to_string()))?;

        info!("Appointment {} moved to {}", id, new_status);
        Ok(appointment)
    }

    fn validate_booking_request(
        &self,
        request: &BookAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        if request.reason.trim().is_empty() {
            return Err(BookingError::ValidationError(
                "A reason for the appointment is required".to_string(),
            ));
        }

        if request.date < now.date_naive() {
            return Err(BookingError::ValidationError(
                "Appointments cannot be booked on a past date".to_string(),
            ));
        }

        let start = request.date.and_time(request.start_time).and_utc();
        if start <= now {
            return Err(BookingError::ValidationError(
                "Appointments must be booked for a future time".to_string(),
            ));
        }

        Ok(())
    }

    /// A patient may hold at most one live appointment per slot.
    async fn check_duplicate_booking(
        &self,
        request: &BookAppointmentRequest,
        key: SlotKey,
    ) -> Result<(), BookingError> {
        let existing = self
            .store
            .appointments_where(|a| {
                a.patient_id == request.patient_id
                    && a.slot_key() == key
                    && matches!(
                        a.status,
                        AppointmentStatus::Pending | AppointmentStatus::Confirmed
                    )
            })
            .await;

        if let Some(existing) = existing.first() {
            warn!(
                "Patient {} already holds appointment {} in slot {}",
                request.patient_id, existing.id, key
            );
            return Err(BookingError::Conflict(
                "You already have an appointment in this time slot".to_string(),
            ));
        }

        Ok(())
    }
}
