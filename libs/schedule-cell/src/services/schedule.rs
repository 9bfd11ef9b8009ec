use chrono::{DateTime, Utc};
use shared_models::appointment::AppointmentStatus;
use shared_models::schedule::{AvailabilityTemplate, Weekday};
use shared_store::MemoryStore;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{CreateTemplateRequest, ScheduleError, UpdateTemplateRequest};

pub struct ScheduleService {
    store: Arc<MemoryStore>,
}

impl ScheduleService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub async fn create_template(
        &self,
        request: CreateTemplateRequest,
    ) -> Result<AvailabilityTemplate, ScheduleError> {
        Self::validate_window(request.start_time, request.end_time)?;
        Self::validate_capacity(request.max_appointments)?;

        let now = Utc::now();
        let template = AvailabilityTemplate {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            day: request.day,
            start_time: request.start_time,
            end_time: request.end_time,
            max_appointments: request.max_appointments,
            is_available: request.is_available.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        self.store.insert_template(template.clone()).await;
        info!(
            "Created availability template {} for doctor {} on {}",
            template.id, template.doctor_id, template.day
        );

        Ok(template)
    }

    pub async fn update_template(
        &self,
        template_id: Uuid,
        request: UpdateTemplateRequest,
    ) -> Result<AvailabilityTemplate, ScheduleError> {
        let mut template = self
            .store
            .get_template(template_id)
            .await
            .ok_or_else(|| ScheduleError::NotFound(template_id.to_string()))?;

        if let Some(day) = request.day {
            template.day = day;
        }
        if let Some(start_time) = request.start_time {
            template.start_time = start_time;
        }
        if let Some(end_time) = request.end_time {
            template.end_time = end_time;
        }
        if let Some(max_appointments) = request.max_appointments {
            Self::validate_capacity(max_appointments)?;
            template.max_appointments = max_appointments;
        }
        if let Some(is_available) = request.is_available {
            template.is_available = is_available;
        }

        Self::validate_window(template.start_time, template.end_time)?;

        template.updated_at = Utc::now();
        self.store
            .update_template(template.clone())
            .await
            .map_err(|e| ScheduleError::NotFound(e.to_string()))?;

        debug!("Updated availability template {}", template_id);
        Ok(template)
    }

    /// Deletes a template. Without `force`, the delete is refused while
    /// future pending or confirmed appointments still sit in the template's
    /// slot. With `force`, those appointments are kept as-is and the slot
    /// simply stops materializing; the count of detached appointments is
    /// returned.
    pub async fn delete_template(
        &self,
        template_id: Uuid,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<usize, ScheduleError> {
        let template = self
            .store
            .get_template(template_id)
            .await
            .ok_or_else(|| ScheduleError::NotFound(template_id.to_string()))?;

        let dependents = self
            .store
            .appointments_where(|a| {
                a.doctor_id == template.doctor_id
                    && a.start_time == template.start_time
                    && Weekday::from_date(a.date) == Some(template.day)
                    && matches!(
                        a.status,
                        AppointmentStatus::Pending | AppointmentStatus::Confirmed
                    )
                    && a.scheduled_start() > now
            })
            .await;

        if !dependents.is_empty() && !force {
            return Err(ScheduleError::Conflict(format!(
                "{} upcoming appointment(s) still depend on this availability",
                dependents.len()
            )));
        }

        self.store
            .delete_template(template_id)
            .await
            .map_err(|e| ScheduleError::NotFound(e.to_string()))?;

        info!(
            "Deleted availability template {} ({} appointments detached)",
            template_id,
            dependents.len()
        );
        Ok(dependents.len())
    }

    pub async fn get_template(
        &self,
        template_id: Uuid,
    ) -> Result<AvailabilityTemplate, ScheduleError> {
        self.store
            .get_template(template_id)
            .await
            .ok_or_else(|| ScheduleError::NotFound(template_id.to_string()))
    }

    pub async fn list_templates(&self, day: Option<Weekday>) -> Vec<AvailabilityTemplate> {
        self.store.list_templates(day).await
    }

    pub async fn templates_for_doctor(
        &self,
        doctor_id: Uuid,
        day: Weekday,
    ) -> Vec<AvailabilityTemplate> {
        self.store.templates_for_doctor(doctor_id, day).await
    }

    fn validate_window(
        start: chrono::NaiveTime,
        end: chrono::NaiveTime,
    ) -> Result<(), ScheduleError> {
        if start >= end {
            return Err(ScheduleError::ValidationError(
                "start_time must be before end_time".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_capacity(max_appointments: u32) -> Result<(), ScheduleError> {
        if max_appointments == 0 {
            return Err(ScheduleError::ValidationError(
                "max_appointments must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
