mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{json, Value};

const BASE: &str = "/api/v1/agency-1";

async fn create_schedule(app: &TestApp, body: Value) -> Value {
    let (status, body) = app.request("POST", &format!("{}/schedules", BASE), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    body
}

fn mon_wed_fri() -> Value {
    json!({
        "activity_id": "activity-1",
        "start_date": "2024-01-01",
        "weekdays": [1, 3, 5],
        "start_time": "10:00",
        "end_time": "12:00",
        "capacity": 10
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let (status, body) = app.request("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_schedule_lifecycle_over_http() {
    let app = TestApp::new().await;

    let created = create_schedule(&app, mon_wed_fri()).await;
    let schedule_id = created["schedule"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["schedule"]["weekdays"], json!([1, 3, 5]));
    assert_eq!(created["generation"]["slots_created"], 12);

    let (status, expansion) = app.request("GET", &format!("{}/schedules/{}/expansion", BASE, schedule_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(expansion["horizon_days"], 28);
    assert_eq!(expansion["dates"].as_array().unwrap().len(), 12);
    assert_eq!(expansion["dates"][0], "2024-01-01");

    let (status, slots) = app
        .request("GET", &format!("{}/schedules/{}/slots?from=2024-01-08&to=2024-01-12", BASE, schedule_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slots.as_array().unwrap().len(), 3);

    let (status, updated) = app
        .request("PUT", &format!("{}/schedules/{}", BASE, schedule_id), Some(json!({ "capacity": 6 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["schedule"]["capacity"], 6);
    assert_eq!(updated["reconciliation"]["slots_patched"], 12);
    assert_eq!(updated["reconciliation"]["regenerated"], false);

    let (status, deleted) = app.request("DELETE", &format!("{}/schedules/{}", BASE, schedule_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["slots_deleted"], 12);

    let (status, _) = app.request("GET", &format!("{}/schedules/{}", BASE, schedule_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_schedules_are_rejected() {
    let app = TestApp::new().await;

    let mut bad_day = mon_wed_fri();
    bad_day["weekdays"] = json!([1, 9]);
    let (status, _) = app.request("POST", &format!("{}/schedules", BASE), Some(bad_day)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_time = mon_wed_fri();
    bad_time["end_time"] = json!("09:00");
    let (status, _) = app.request("POST", &format!("{}/schedules", BASE), Some(bad_time)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schedules_are_scoped_to_agency() {
    let app = TestApp::new().await;
    let created = create_schedule(&app, mon_wed_fri()).await;
    let schedule_id = created["schedule"]["id"].as_str().unwrap();

    let (status, _) = app.request("GET", &format!("/api/v1/agency-2/schedules/{}", schedule_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.request("DELETE", &format!("/api/v1/agency-2/schedules/{}", schedule_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reservations_and_modifications_over_http() {
    let app = TestApp::new().await;
    let created = create_schedule(&app, mon_wed_fri()).await;
    let schedule_id = created["schedule"]["id"].as_str().unwrap().to_string();

    let (_, slots) = app
        .request("GET", &format!("{}/schedules/{}/slots?from=2024-01-03&to=2024-01-03", BASE, schedule_id), None)
        .await;
    let slot_id = slots[0]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request("POST", &format!("{}/reservations", BASE), Some(json!({ "slot_id": slot_id, "quantity": 0 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, reservation) = app
        .request("POST", &format!("{}/reservations", BASE), Some(json!({ "slot_id": slot_id, "quantity": 2 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reservation["status"], "HOLD");
    let reservation_id = reservation["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request("POST", &format!("{}/reservations", BASE), Some(json!({ "slot_id": slot_id, "quantity": 9 })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Blocking a range with a live reservation is refused.
    let block = json!({
        "type": "BLOCK_SCHEDULE",
        "schedule_id": schedule_id,
        "date_from": "2024-01-01",
        "date_to": "2024-01-10"
    });
    let (status, body) = app.request("POST", &format!("{}/modifications", BASE), Some(block.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reservations"], 1);

    // Capacity below what is reserved names the slot.
    let shrink = json!({
        "type": "CHANGE_CAPACITY",
        "schedule_id": schedule_id,
        "date_from": "2024-01-01",
        "date_to": "2024-01-10",
        "new_capacity": 1
    });
    let (status, body) = app.request("POST", &format!("{}/modifications", BASE), Some(shrink)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["slot_id"], slot_id.as_str());
    assert_eq!(body["consumed"], 2);

    let change = json!({
        "type": "CHANGE_CAPACITY",
        "schedule_id": schedule_id,
        "date_from": "2024-01-01",
        "date_to": "2024-01-10",
        "new_capacity": 4,
        "reason": "staff shortage"
    });
    let (status, body) = app.request("POST", &format!("{}/modifications", BASE), Some(change)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["applied"], true);
    assert_eq!(body["slots_affected"], 5);
    let modification_id = body["modification"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.request("GET", &format!("{}/modifications/{}", BASE, modification_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "CHANGE_CAPACITY");
    assert_eq!(body["previous_capacity"], 10);

    let (status, body) = app.request("DELETE", &format!("{}/modifications/{}", BASE, modification_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots_affected"], 5);

    let (status, _) = app.request("DELETE", &format!("{}/modifications/{}", BASE, modification_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, confirmed) = app
        .request("POST", &format!("{}/reservations/{}/confirm", BASE, reservation_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "CONFIRMED");

    let (status, _) = app.request("DELETE", &format!("{}/reservations/{}", BASE, reservation_id), None).await;
    assert_eq!(status, StatusCode::OK);

    // With the reservation gone the block goes through.
    let (status, body) = app.request("POST", &format!("{}/modifications", BASE), Some(block)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slots_affected"], 5);
}

#[tokio::test]
async fn test_modification_errors_over_http() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request("POST", &format!("{}/modifications", BASE), Some(json!({
            "type": "SHIFT_DAY",
            "date_from": "2024-01-01",
            "date_to": "2024-01-10"
        })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.request("GET", &format!("{}/modifications/unknown", BASE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.request("DELETE", &format!("{}/modifications/unknown", BASE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_activity_generation_and_listing() {
    let app = TestApp::new().await;
    create_schedule(&app, mon_wed_fri()).await;

    let mut tuesdays = mon_wed_fri();
    tuesdays["weekdays"] = json!([2]);
    create_schedule(&app, tuesdays).await;

    let (status, body) = app.request("POST", &format!("{}/activities/activity-1/generate", BASE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots_created"], 0);
    assert_eq!(body["slots_skipped"], 16);

    let (status, slots) = app
        .request("GET", &format!("{}/activities/activity-1/slots?from=2024-01-01&to=2024-01-07", BASE), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slots.as_array().unwrap().len(), 4);

    let (status, slots) = app.request("GET", "/api/v1/agency-2/activities/activity-1/slots", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(slots.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_switching_to_full_day_clears_times() {
    let app = TestApp::new().await;
    let created = create_schedule(&app, mon_wed_fri()).await;
    let schedule_id = created["schedule"]["id"].as_str().unwrap().to_string();
    let uri = format!("{}/schedules/{}", BASE, schedule_id);

    let (status, updated) = app.request("PUT", &uri, Some(json!({ "full_day": true }))).await;
    assert_eq!(status, StatusCode::OK, "body: {}", updated);
    assert_eq!(updated["schedule"]["full_day"], true);
    assert!(updated["schedule"]["start_time"].is_null());
    assert!(updated["schedule"]["end_time"].is_null());
    assert_eq!(updated["reconciliation"]["regenerated"], true);

    let (_, slots) = app.request("GET", &format!("{}/slots", uri), None).await;
    let slots = slots.as_array().unwrap();
    assert_eq!(slots.len(), 12);
    assert!(slots.iter().all(|s| s["start_time"].is_null() && s["end_time"].is_null()));

    // Leaving full-day mode needs the times again.
    let (status, _) = app.request("PUT", &uri, Some(json!({ "full_day": false }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .request("PUT", &uri, Some(json!({ "full_day": false, "start_time": "08:00", "end_time": "09:30" })))
        .await;
    assert_eq!(status, StatusCode::OK, "body: {}", updated);
    assert_eq!(updated["schedule"]["start_time"], "08:00:00");
}
