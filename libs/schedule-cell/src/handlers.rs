use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::schedule::Weekday;
use shared_store::AppState;

use crate::models::{CreateTemplateRequest, ScheduleError, UpdateTemplateRequest};
use crate::services::schedule::ScheduleService;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub day: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub force: Option<bool>,
}

fn map_schedule_error(e: ScheduleError) -> AppError {
    match e {
        ScheduleError::ValidationError(msg) => AppError::ValidationError(msg),
        ScheduleError::NotFound(msg) => AppError::NotFound(msg),
        ScheduleError::Conflict(msg) => AppError::Conflict(msg),
    }
}

fn require_schedule_manager(user: &User, doctor_id: Uuid) -> Result<(), AppError> {
    if user.is_admin() || user.id == doctor_id.to_string() {
        return Ok(());
    }
    Err(AppError::Auth(
        "Not authorized to manage this doctor's schedule".to_string(),
    ))
}

#[axum::debug_handler]
pub async fn create_template(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<Json<Value>, AppError> {
    require_schedule_manager(&user, request.doctor_id)?;

    let service = ScheduleService::new(state.store.clone());
    let template = service
        .create_template(request)
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!(template)))
}

#[axum::debug_handler]
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let day = match query.day {
        Some(raw) => Some(Weekday::parse(&raw).ok_or_else(|| {
            AppError::ValidationError(format!("Invalid day of week: {}", raw))
        })?),
        None => None,
    };

    let service = ScheduleService::new(state.store.clone());
    let templates = service.list_templates(day).await;

    Ok(Json(json!({
        "timeslots": templates,
        "total": templates.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_templates(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(state.store.clone());

    let templates = match query.day {
        Some(raw) => {
            let day = Weekday::parse(&raw).ok_or_else(|| {
                AppError::ValidationError(format!("Invalid day of week: {}", raw))
            })?;
            service.templates_for_doctor(doctor_id, day).await
        }
        None => {
            let all = service.list_templates(None).await;
            all.into_iter()
                .filter(|t| t.doctor_id == doctor_id)
                .collect()
        }
    };

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "timeslots": templates,
        "total": templates.len()
    })))
}

#[axum::debug_handler]
pub async fn update_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateTemplateRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(state.store.clone());

    let existing = service
        .get_template(template_id)
        .await
        .map_err(map_schedule_error)?;
    require_schedule_manager(&user, existing.doctor_id)?;

    let template = service
        .update_template(template_id, request)
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!(template)))
}

#[axum::debug_handler]
pub async fn delete_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(state.store.clone());

    let existing = service
        .get_template(template_id)
        .await
        .map_err(map_schedule_error)?;
    require_schedule_manager(&user, existing.doctor_id)?;

    let detached = service
        .delete_template(template_id, query.force.unwrap_or(false), Utc::now())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "deleted": true,
        "detached_appointments": detached
    })))
}
