use assert_matches::assert_matches;
use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::NaiveTime;
use uuid::Uuid;

use schedule_cell::handlers::{self, DeleteQuery, ListQuery};
use schedule_cell::models::{CreateTemplateRequest, UpdateTemplateRequest};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::schedule::Weekday;
use shared_store::AppState;
use shared_utils::test_utils::TestConfig;

fn test_state() -> AppState {
    TestConfig::default().to_app_state()
}

fn user_with_role(role: &str, id: &str) -> Extension<User> {
    Extension(User {
        id: id.to_string(),
        email: Some(format!("{}@example.com", role)),
        role: Some(role.to_string()),
        metadata: None,
        created_at: Some(chrono::Utc::now()),
    })
}

fn time(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

fn create_request(doctor_id: Uuid) -> CreateTemplateRequest {
    CreateTemplateRequest {
        doctor_id,
        day: Weekday::Wednesday,
        start_time: time(9),
        end_time: time(10),
        max_appointments: 2,
        is_available: None,
    }
}

#[tokio::test]
async fn test_doctor_creates_own_template() {
    let state = test_state();
    let doctor_id = Uuid::new_v4();

    let result = handlers::create_template(
        State(state),
        user_with_role("doctor", &doctor_id.to_string()),
        Json(create_request(doctor_id)),
    )
    .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_patient_cannot_create_template() {
    let state = test_state();

    let result = handlers::create_template(
        State(state),
        user_with_role("patient", &Uuid::new_v4().to_string()),
        Json(create_request(Uuid::new_v4())),
    )
    .await;

    assert_matches!(result, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn test_admin_creates_template_for_any_doctor() {
    let state = test_state();

    let result = handlers::create_template(
        State(state),
        user_with_role("admin", &Uuid::new_v4().to_string()),
        Json(create_request(Uuid::new_v4())),
    )
    .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_list_rejects_unknown_day() {
    let state = test_state();

    let result = handlers::list_templates(
        State(state),
        Query(ListQuery {
            day: Some("funday".to_string()),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_list_filters_by_day() {
    let state = test_state();
    let doctor_id = Uuid::new_v4();

    handlers::create_template(
        State(state.clone()),
        user_with_role("doctor", &doctor_id.to_string()),
        Json(create_request(doctor_id)),
    )
    .await
    .unwrap();

    let Json(body) = handlers::list_templates(
        State(state.clone()),
        Query(ListQuery {
            day: Some("wednesday".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(body["total"], 1);

    let Json(body) = handlers::list_templates(
        State(state),
        Query(ListQuery {
            day: Some("monday".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_update_missing_template_is_not_found() {
    let state = test_state();

    let result = handlers::update_template(
        State(state),
        Path(Uuid::new_v4()),
        user_with_role("admin", &Uuid::new_v4().to_string()),
        Json(UpdateTemplateRequest {
            day: None,
            start_time: None,
            end_time: None,
            max_appointments: Some(4),
            is_available: None,
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn test_other_doctor_cannot_delete_template() {
    let state = test_state();
    let owner = Uuid::new_v4();

    let Json(created) = handlers::create_template(
        State(state.clone()),
        user_with_role("doctor", &owner.to_string()),
        Json(create_request(owner)),
    )
    .await
    .unwrap();
    let template_id: Uuid = serde_json::from_value(created["id"].clone()).unwrap();

    let result = handlers::delete_template(
        State(state),
        Path(template_id),
        Query(DeleteQuery { force: None }),
        user_with_role("doctor", &Uuid::new_v4().to_string()),
    )
    .await;

    assert_matches!(result, Err(AppError::Auth(_)));
}
