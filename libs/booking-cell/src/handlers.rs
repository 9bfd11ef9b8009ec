use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_store::AppState;

use crate::models::{
    AppointmentSearchQuery, BookAppointmentRequest, BookingError, CancelAppointmentRequest,
};
use crate::services::availability::AvailabilityQueryService;
use crate::services::booking::AppointmentBookingService;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize, Default)]
pub struct CompleteRequest {
    pub notes: Option<String>,
}

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::ValidationError(msg) => AppError::ValidationError(msg),
        BookingError::NotFound(msg) => AppError::NotFound(msg),
        BookingError::Conflict(msg) => AppError::Conflict(msg),
        BookingError::SlotFull(msg) => AppError::Conflict(msg),
        BookingError::InvalidStatusTransition(status) => AppError::BadRequest(format!(
            "Appointment cannot change state from {}",
            status
        )),
    }
}

fn is_participant(user: &User, patient_id: Uuid, doctor_id: Uuid) -> bool {
    user.is_admin() || user.id == patient_id.to_string() || user.id == doctor_id.to_string()
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityQueryService::new(state.store.clone());

    let slots = service
        .available_slots(doctor_id, query.date, Utc::now())
        .await;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "available_slots": slots,
        "total_slots": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() && user.id != request.patient_id.to_string() {
        return Err(AppError::Auth(
            "Not authorized to book appointments for this patient".to_string(),
        ));
    }

    let service = AppointmentBookingService::new(state.store.clone());
    let appointment = service
        .book_appointment(request, Utc::now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state.store.clone());
    let appointment = service
        .get_appointment(appointment_id)
        .await
        .map_err(map_booking_error)?;

    if !is_participant(&user, appointment.patient_id, appointment.doctor_id) {
        return Err(AppError::Auth(
            "Not authorized to view this appointment".to_string(),
        ));
    }

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    request: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state.store.clone());
    let existing = service
        .get_appointment(appointment_id)
        .await
        .map_err(map_booking_error)?;

    if !is_participant(&user, existing.patient_id, existing.doctor_id) {
        return Err(AppError::Auth(
            "Not authorized to cancel this appointment".to_string(),
        ));
    }

    let reason = request.and_then(|Json(r)| r.reason);
    let appointment = service
        .cancel_appointment(appointment_id, reason, Utc::now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state.store.clone());
    let existing = service
        .get_appointment(appointment_id)
        .await
        .map_err(map_booking_error)?;

    // Only the doctor or an admin can confirm
    if !user.is_admin() && user.id != existing.doctor_id.to_string() {
        return Err(AppError::Auth(
            "Not authorized to confirm this appointment".to_string(),
        ));
    }

    let appointment = service
        .confirm_appointment(appointment_id, Utc::now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    request: Option<Json<CompleteRequest>>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state.store.clone());
    let existing = service
        .get_appointment(appointment_id)
        .await
        .map_err(map_booking_error)?;

    if !user.is_admin() && user.id != existing.doctor_id.to_string() {
        return Err(AppError::Auth(
            "Not authorized to complete this appointment".to_string(),
        ));
    }

    let notes = request.and_then(|Json(r)| r.notes);
    let appointment = service
        .complete_appointment(appointment_id, notes, Utc::now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(mut query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    // Non-admins only ever see their own appointments.
    if !user.is_admin() {
        let own_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))?;
        if user.is_doctor() {
            query.doctor_id = Some(own_id);
        } else {
            query.patient_id = Some(own_id);
        }
    }

    let service = AppointmentBookingService::new(state.store.clone());
    let appointments = service.search_appointments(query).await;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() && user.id != patient_id.to_string() {
        return Err(AppError::Auth(
            "Not authorized to view this patient's appointments".to_string(),
        ));
    }

    let service = AppointmentBookingService::new(state.store.clone());
    let appointments = service.appointments_for_patient(patient_id).await;

    Ok(Json(json!({
        "patient_id": patient_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() && user.id != doctor_id.to_string() {
        return Err(AppError::Auth(
            "Not authorized to view this doctor's appointments".to_string(),
        ));
    }

    let service = AppointmentBookingService::new(state.store.clone());
    let appointments = service.appointments_for_doctor(doctor_id).await;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}
