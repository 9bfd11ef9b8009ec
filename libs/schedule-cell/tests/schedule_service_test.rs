use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use schedule_cell::models::{CreateTemplateRequest, ScheduleError, UpdateTemplateRequest};
use schedule_cell::services::schedule::ScheduleService;
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::schedule::Weekday;
use shared_store::MemoryStore;
use std::sync::Arc;

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn create_request(doctor_id: Uuid, day: Weekday, start: NaiveTime, end: NaiveTime) -> CreateTemplateRequest {
    CreateTemplateRequest {
        doctor_id,
        day,
        start_time: start,
        end_time: end,
        max_appointments: 3,
        is_available: None,
    }
}

#[tokio::test]
async fn test_create_template() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store);
    let doctor_id = Uuid::new_v4();

    let template = service
        .create_template(create_request(doctor_id, Weekday::Monday, time(9, 0), time(10, 0)))
        .await
        .unwrap();

    assert_eq!(template.doctor_id, doctor_id);
    assert_eq!(template.day, Weekday::Monday);
    assert_eq!(template.max_appointments, 3);
    assert!(template.is_available);
}

#[tokio::test]
async fn test_create_template_rejects_inverted_window() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store);

    let result = service
        .create_template(create_request(
            Uuid::new_v4(),
            Weekday::Monday,
            time(10, 0),
            time(9, 0),
        ))
        .await;

    assert_matches!(result, Err(ScheduleError::ValidationError(_)));
}

#[tokio::test]
async fn test_create_template_rejects_zero_length_window() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store);

    let result = service
        .create_template(create_request(
            Uuid::new_v4(),
            Weekday::Monday,
            time(9, 0),
            time(9, 0),
        ))
        .await;

    assert_matches!(result, Err(ScheduleError::ValidationError(_)));
}

#[tokio::test]
async fn test_create_template_rejects_zero_capacity() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store);

    let mut request = create_request(Uuid::new_v4(), Weekday::Monday, time(9, 0), time(10, 0));
    request.max_appointments = 0;

    let result = service.create_template(request).await;
    assert_matches!(result, Err(ScheduleError::ValidationError(_)));
}

#[tokio::test]
async fn test_overlapping_windows_coexist_as_separate_slots() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store);
    let doctor_id = Uuid::new_v4();

    service
        .create_template(create_request(doctor_id, Weekday::Monday, time(9, 0), time(11, 0)))
        .await
        .unwrap();

    // A window overlapping the first is an independent bookable slot,
    // not a conflict.
    service
        .create_template(create_request(doctor_id, Weekday::Monday, time(10, 0), time(12, 0)))
        .await
        .unwrap();

    let templates = service.templates_for_doctor(doctor_id, Weekday::Monday).await;
    assert_eq!(templates.len(), 2);
    assert_eq!(templates[0].start_time, time(9, 0));
    assert_eq!(templates[1].start_time, time(10, 0));
}

#[tokio::test]
async fn test_same_start_time_templates_allowed() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store);
    let doctor_id = Uuid::new_v4();

    service
        .create_template(create_request(doctor_id, Weekday::Monday, time(9, 0), time(10, 0)))
        .await
        .unwrap();

    // Same start folds into the same slot; capacity adds up there.
    let result = service
        .create_template(create_request(doctor_id, Weekday::Monday, time(9, 0), time(10, 0)))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_overlap_allowed_across_doctors_and_days() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store);
    let doctor_id = Uuid::new_v4();

    service
        .create_template(create_request(doctor_id, Weekday::Monday, time(9, 0), time(11, 0)))
        .await
        .unwrap();

    // Same window on another day
    service
        .create_template(create_request(doctor_id, Weekday::Tuesday, time(9, 0), time(11, 0)))
        .await
        .unwrap();

    // Same window for another doctor
    service
        .create_template(create_request(Uuid::new_v4(), Weekday::Monday, time(9, 0), time(11, 0)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_template() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store);
    let doctor_id = Uuid::new_v4();

    let template = service
        .create_template(create_request(doctor_id, Weekday::Monday, time(9, 0), time(10, 0)))
        .await
        .unwrap();

    let updated = service
        .update_template(
            template.id,
            UpdateTemplateRequest {
                day: None,
                start_time: None,
                end_time: None,
                max_appointments: Some(5),
                is_available: Some(false),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.max_appointments, 5);
    assert!(!updated.is_available);
    assert_eq!(updated.start_time, template.start_time);
}

#[tokio::test]
async fn test_update_template_validates_resulting_window() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store);

    let template = service
        .create_template(create_request(
            Uuid::new_v4(),
            Weekday::Monday,
            time(9, 0),
            time(10, 0),
        ))
        .await
        .unwrap();

    let result = service
        .update_template(
            template.id,
            UpdateTemplateRequest {
                day: None,
                start_time: Some(time(11, 0)),
                end_time: None,
                max_appointments: None,
                is_available: None,
            },
        )
        .await;

    assert_matches!(result, Err(ScheduleError::ValidationError(_)));
}

#[tokio::test]
async fn test_update_missing_template() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store);

    let result = service
        .update_template(
            Uuid::new_v4(),
            UpdateTemplateRequest {
                day: None,
                start_time: None,
                end_time: None,
                max_appointments: Some(2),
                is_available: None,
            },
        )
        .await;

    assert_matches!(result, Err(ScheduleError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_template() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store.clone());

    let template = service
        .create_template(create_request(
            Uuid::new_v4(),
            Weekday::Monday,
            time(9, 0),
            time(10, 0),
        ))
        .await
        .unwrap();

    let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
    let detached = service.delete_template(template.id, false, now).await.unwrap();

    assert_eq!(detached, 0);
    assert!(store.get_template(template.id).await.is_none());
}

#[tokio::test]
async fn test_delete_template_refused_with_upcoming_appointments() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store.clone());
    let doctor_id = Uuid::new_v4();

    let template = service
        .create_template(create_request(doctor_id, Weekday::Monday, time(9, 0), time(10, 0)))
        .await
        .unwrap();

    // Upcoming appointment sitting in the template's slot
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
    let monday = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    store
        .insert_appointment(Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id,
            date: monday,
            start_time: time(9, 0),
            end_time: time(10, 0),
            reason: "checkup".to_string(),
            status: AppointmentStatus::Confirmed,
            notes: None,
            created_at: now,
            updated_at: now,
        })
        .await;

    let result = service.delete_template(template.id, false, now).await;
    assert_matches!(result, Err(ScheduleError::Conflict(_)));

    // Forced delete keeps the appointment but removes the template
    let detached = service.delete_template(template.id, true, now).await.unwrap();
    assert_eq!(detached, 1);
    assert!(store.get_template(template.id).await.is_none());
}

#[tokio::test]
async fn test_delete_template_ignores_cancelled_and_past_appointments() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store.clone());
    let doctor_id = Uuid::new_v4();

    let template = service
        .create_template(create_request(doctor_id, Weekday::Monday, time(9, 0), time(10, 0)))
        .await
        .unwrap();

    let now = Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap();
    let past_monday = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let next_monday = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();

    let base = Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        doctor_id,
        date: past_monday,
        start_time: time(9, 0),
        end_time: time(10, 0),
        reason: "checkup".to_string(),
        status: AppointmentStatus::Completed,
        notes: None,
        created_at: now,
        updated_at: now,
    };
    store.insert_appointment(base.clone()).await;
    store
        .insert_appointment(Appointment {
            id: Uuid::new_v4(),
            date: next_monday,
            status: AppointmentStatus::Cancelled,
            ..base
        })
        .await;

    let detached = service.delete_template(template.id, false, now).await.unwrap();
    assert_eq!(detached, 0);
}

#[tokio::test]
async fn test_list_templates_filtered_by_day() {
    let store = Arc::new(MemoryStore::new());
    let service = ScheduleService::new(store);
    let doctor_id = Uuid::new_v4();

    service
        .create_template(create_request(doctor_id, Weekday::Monday, time(9, 0), time(10, 0)))
        .await
        .unwrap();
    service
        .create_template(create_request(doctor_id, Weekday::Friday, time(9, 0), time(10, 0)))
        .await
        .unwrap();

    let monday_only = service.list_templates(Some(Weekday::Monday)).await;
    assert_eq!(monday_only.len(), 1);
    assert_eq!(monday_only[0].day, Weekday::Monday);

    let all = service.list_templates(None).await;
    assert_eq!(all.len(), 2);
}
