use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::*;
use appointment_cell::services::{AppointmentStore, SupabaseAppointmentStore};
use schedule_cell::models::TimeSlot;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

const START: &str = "2031-03-03T09:00:00Z";
const END: &str = "2031-03-03T09:30:00Z";

fn store(mock_server: &MockServer) -> SupabaseAppointmentStore {
    SupabaseAppointmentStore::new(&TestConfig::with_supabase_url(&mock_server.uri()).to_app_config())
}

fn new_appointment(resource_id: Uuid) -> Appointment {
    let start = Utc.with_ymd_and_hms(2031, 3, 3, 9, 0, 0).unwrap();
    Appointment {
        id: Uuid::new_v4(),
        resource_id,
        patient_name: "Ana Torres".to_string(),
        patient_phone: Some("+51 947 236 123".to_string()),
        service: "Cleaning".to_string(),
        message: None,
        start_time: start,
        end_time: start + chrono::Duration::minutes(30),
        status: AppointmentStatus::Requested,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn insert_returns_the_stored_row() {
    let mock_server = MockServer::start().await;
    let appointment = new_appointment(Uuid::new_v4());

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "status": "requested" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                appointment.id,
                appointment.resource_id,
                START,
                END,
                "requested",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let stored = store(&mock_server).insert(appointment.clone()).await.unwrap();

    assert_eq!(stored.id, appointment.id);
    assert_eq!(stored.status, AppointmentStatus::Requested);
}

#[tokio::test]
async fn exclusion_violation_is_a_slot_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response(
                "conflicting key value violates exclusion constraint \"appointments_no_overlap\"",
                "23P01",
            ),
        ))
        .mount(&mock_server)
        .await;

    assert_matches!(
        store(&mock_server).insert(new_appointment(Uuid::new_v4())).await,
        Err(AppointmentError::SlotConflict)
    );
}

#[tokio::test]
async fn busy_query_filters_cancelled_and_window() {
    let mock_server = MockServer::start().await;
    let resource_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("resource_id", format!("eq.{}", resource_id)))
        .and(query_param("status", "neq.cancelled"))
        .and(query_param("start_time", "lt.2031-03-04T00:00:00Z"))
        .and(query_param("end_time", "gt.2031-03-03T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(Uuid::new_v4(), resource_id, START, END, "confirmed")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let window = TimeSlot::new(
        Utc.with_ymd_and_hms(2031, 3, 3, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2031, 3, 4, 0, 0, 0).unwrap(),
    );
    let busy = store(&mock_server).active_in_range(resource_id, window).await.unwrap();

    assert_eq!(busy.len(), 1);
    assert_eq!(busy[0].status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn status_update_is_guarded_by_expected_status() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let resource_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("status", "eq.requested"))
        .and(body_partial_json(json!({ "status": "confirmed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(appointment_id, resource_id, START, END, "confirmed")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let updated = store(&mock_server)
        .update_status(appointment_id, AppointmentStatus::Requested, AppointmentStatus::Confirmed)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn lost_status_race_reports_current_status() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(appointment_id, Uuid::new_v4(), START, END, "cancelled")
        ])))
        .mount(&mock_server)
        .await;

    assert_matches!(
        store(&mock_server)
            .update_status(appointment_id, AppointmentStatus::Requested, AppointmentStatus::Confirmed)
            .await,
        Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Cancelled))
    );
}

#[tokio::test]
async fn missing_rows_are_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = store(&mock_server);
    assert_matches!(store.get(Uuid::new_v4()).await, Err(AppointmentError::NotFound));
    assert_matches!(store.delete(Uuid::new_v4()).await, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn ping_fails_when_backend_is_down() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    assert_matches!(
        store(&mock_server).ping().await,
        Err(AppointmentError::DatabaseError(_))
    );
}

fn has_end_time_bound(request: &wiremock::Request) -> bool {
    request
        .url
        .query_pairs()
        .any(|(key, value)| key == "end_time" && value.starts_with("lte."))
}

#[tokio::test]
async fn stats_are_counted_server_side() {
    let mock_server = MockServer::start().await;

    for (status, total) in [("requested", "1500"), ("confirmed", "1200"), ("attended", "40"), ("cancelled", "0")] {
        Mock::given(method("HEAD"))
            .and(path("/rest/v1/appointments"))
            .and(header("Prefer", "count=exact"))
            .and(query_param("status", format!("eq.{}", status)))
            .and(|request: &wiremock::Request| !has_end_time_bound(request))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", format!("*/{}", total)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("HEAD"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.confirmed"))
        .and(has_end_time_bound)
        .respond_with(ResponseTemplate::new(206).insert_header("Content-Range", "0-6/7"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let stats = store(&mock_server).stats(Utc::now()).await.unwrap();

    assert_eq!(
        stats,
        AppointmentStats {
            total: 2740,
            requested: 1500,
            confirmed: 1200,
            attended: 40,
            cancelled: 0,
            expired: 7,
        }
    );
}
