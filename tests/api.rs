use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{DateTime, FixedOffset};
use secretary_scheduler::{AppState, app, store::Store};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let state = AppState::new(Store::new(dir.path().join("db.json")));
    (app(state, dir.path()), dir)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app.clone().oneshot(request).await.expect("request should complete");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read");
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let parsed = serde_json::from_slice(&bytes).expect("response body should be JSON");
    (status, parsed)
}

fn instant(v: &Value) -> DateTime<FixedOffset> {
    let raw = v.as_str().expect("timestamp should be a string");
    DateTime::parse_from_rfc3339(raw).expect("timestamp should be RFC 3339")
}

fn scenario_a() -> Value {
    json!({
        "fixedIntervals": [
            { "id": "m", "name": "Dentist", "start": "2025-03-10T09:00:00+00:00", "end": "2025-03-10T10:00:00+00:00" }
        ],
        "tasks": [
            { "id": "t", "name": "Essay", "totalDuration": 180, "minChunk": 30, "maxChunk": 120, "priority": "High" }
        ],
        "workDayStart": "2025-03-10T08:00:00+00:00",
        "workDayEnd": "2025-03-10T12:00:00+00:00"
    })
}

#[tokio::test]
async fn schedule_places_task_around_appointment() {
    let (app, _dir) = test_app();
    let (status, body) = send_json(&app, Method::POST, "/api/schedule", Some(scenario_a())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["complete"], json!(true));
    let blocks = body["blocks"].as_array().expect("blocks should be an array");
    let ids: Vec<&str> = blocks.iter().map(|b| b["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["t-chunk-0", "m", "t-chunk-1"]);
    assert_eq!(blocks[1]["kind"], json!("fixed"));
    assert_eq!(blocks[0]["isChunk"], json!(true));
    assert_eq!(blocks[0]["name"], json!("Essay (Part)"));
}

#[tokio::test]
async fn schedule_reports_partial_placement_as_success() {
    let (app, _dir) = test_app();
    let mut req = scenario_a();
    req["tasks"][0]["totalDuration"] = json!(400);

    let (status, body) = send_json(&app, Method::POST, "/api/schedule", Some(req)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["complete"], json!(false));
    assert_eq!(body["unplaced"][0]["taskId"], json!("t"));
    assert_eq!(body["unplaced"][0]["unplacedMinutes"], json!(220));
}

#[tokio::test]
async fn schedule_rejects_bad_chunk_bounds() {
    let (app, _dir) = test_app();
    let mut req = scenario_a();
    req["tasks"][0]["minChunk"] = json!(150);

    let (status, body) = send_json(&app, Method::POST, "/api/schedule", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("VALIDATION_FAILED"));
    assert_eq!(body["error"]["field"], json!("tasks[0].minChunk"));
}

#[tokio::test]
async fn schedule_rejects_unknown_fields() {
    let (app, _dir) = test_app();
    let mut req = scenario_a();
    req["fixedIntervals"][0]["location"] = json!("Room 4");

    let (status, body) = send_json(&app, Method::POST, "/api/schedule", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("VALIDATION_FAILED"));
}

#[tokio::test]
async fn task_crud_roundtrip() {
    let (app, _dir) = test_app();

    let (status, created) = send_json(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "name": "Read chapter 4", "priority": "Medium", "category": "Academic" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // omitted sizes come from the task defaults
    assert_eq!(created["totalDuration"], json!(60));
    assert_eq!(created["minChunk"], json!(30));
    assert_eq!(created["maxChunk"], json!(120));
    let id = created["id"].as_str().expect("id should be present").to_string();

    let (status, updated) = send_json(
        &app,
        Method::PUT,
        &format!("/api/tasks/{id}"),
        Some(json!({ "name": "Read chapter 4", "totalDuration": 90, "minChunk": 30, "maxChunk": 45, "priority": "Low" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["totalDuration"], json!(90));

    let (_, listed) = send_json(&app, Method::GET, "/api/tasks", None).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, _) = send_json(&app, Method::DELETE, &format!("/api/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send_json(&app, Method::DELETE, &format!("/api/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn task_with_blank_name_is_rejected() {
    let (app, _dir) = test_app();
    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "name": "  ", "priority": "High" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], json!("name"));
}

#[tokio::test]
async fn appointment_with_inverted_range_is_rejected() {
    let (app, _dir) = test_app();
    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/appointments",
        Some(json!({
            "name": "Gym",
            "start": "2025-03-10T18:00:00+00:00",
            "end": "2025-03-10T17:00:00+00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], json!("appointment"));
}

#[tokio::test]
async fn settings_update_is_validated() {
    let (app, _dir) = test_app();
    let (status, _) = send_json(
        &app,
        Method::PUT,
        "/api/settings",
        Some(json!({
            "dayStart": "18:00",
            "dayEnd": "09:00",
            "taskDefaults": { "duration": 60, "minChunk": 15, "maxChunk": 60 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_json(
        &app,
        Method::PUT,
        "/api/settings",
        Some(json!({
            "dayStart": "09:00",
            "dayEnd": "17:00",
            "taskDefaults": { "duration": 45, "minChunk": 15, "maxChunk": 45 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dayStart"], json!("09:00"));
    assert_eq!(body["bufferTimes"]["appointments"], json!(15));

    let (status, body) = send_json(
        &app,
        Method::PUT,
        "/api/settings",
        Some(json!({
            "dayStart": "09:00",
            "dayEnd": "17:00",
            "bufferTimes": { "appointments": -5, "tasks": 10 },
            "rules": ["Gym before noon"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], json!("bufferTimes"));
}

#[tokio::test]
async fn stored_plan_uses_that_days_appointments() {
    let (app, _dir) = test_app();

    for (name, start, end) in [
        ("Lecture", "2025-03-10T09:00:00+00:00", "2025-03-10T12:00:00+00:00"),
        ("Tomorrow", "2025-03-11T09:00:00+00:00", "2025-03-11T10:00:00+00:00"),
    ] {
        let (status, _) = send_json(
            &app,
            Method::POST,
            "/api/appointments",
            Some(json!({ "name": name, "start": start, "end": end })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send_json(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "name": "Lab report", "totalDuration": 120, "minChunk": 30, "maxChunk": 120, "priority": "High" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, plan) = send_json(
        &app,
        Method::GET,
        "/api/plan?date=2025-03-10&offset=%2B00:00",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        instant(&plan["workDayStart"]),
        instant(&json!("2025-03-10T08:00:00+00:00"))
    );
    // same serializer as the blocks
    let day_end = instant(&json!("2025-03-10T22:00:00+00:00"));
    assert_eq!(plan["workDayEnd"], serde_json::to_value(day_end).unwrap());

    let blocks = plan["blocks"].as_array().expect("blocks should be an array");
    let names: Vec<&str> = blocks.iter().map(|b| b["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Lab report (Part)", "Lecture", "Lab report (Part)"]);
    assert_eq!(
        instant(&blocks[2]["start"]),
        instant(&json!("2025-03-10T12:00:00+00:00"))
    );
    assert_eq!(plan["complete"], json!(true));
}

#[tokio::test]
async fn stored_plan_avoids_appointments_saved_in_other_offsets() {
    let (app, _dir) = test_app();

    // 23:30 UTC the evening before through 10:00 +09:00 on the planned day
    let (status, _) = send_json(
        &app,
        Method::POST,
        "/api/appointments",
        Some(json!({
            "name": "Overnight flight",
            "start": "2025-03-10T23:30:00+00:00",
            "end": "2025-03-11T01:00:00+00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    send_json(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "name": "Unpack", "totalDuration": 60, "minChunk": 60, "maxChunk": 60, "priority": "High" })),
    )
    .await;

    let (status, plan) = send_json(
        &app,
        Method::GET,
        "/api/plan?date=2025-03-11&offset=%2B09:00",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let blocks = plan["blocks"].as_array().expect("blocks should be an array");
    let flight = blocks
        .iter()
        .find(|b| b["kind"] == json!("fixed"))
        .expect("stored appointment should be on the timeline");
    let (busy_start, busy_end) = (instant(&flight["start"]), instant(&flight["end"]));

    let task = blocks
        .iter()
        .find(|b| b["kind"] == json!("task"))
        .expect("task should be placed");
    let (start, end) = (instant(&task["start"]), instant(&task["end"]));
    assert!(end <= busy_start || start >= busy_end, "task placed over appointment");
    assert_eq!(start, instant(&json!("2025-03-11T10:00:00+09:00")));
}

#[tokio::test]
async fn plan_rejects_malformed_date() {
    let (app, _dir) = test_app();
    let (status, body) = send_json(&app, Method::GET, "/api/plan?date=10/03/2025", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], json!("date"));
}

#[tokio::test]
async fn plan_exports_as_calendar() {
    let (app, _dir) = test_app();
    send_json(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "name": "Inbox zero", "totalDuration": 30, "minChunk": 30, "maxChunk": 30, "priority": "Low" })),
    )
    .await;

    let request = Request::builder()
        .uri("/api/plan.ics?date=2025-03-10&offset=%2B00:00")
        .body(Body::empty())
        .expect("request should build");
    let response = app.clone().oneshot(request).await.expect("request should complete");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/calendar; charset=utf-8"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read");
    let text = String::from_utf8(bytes.to_vec()).expect("calendar should be utf-8");
    assert!(text.contains("SUMMARY:Inbox zero\r\n"));
    assert!(text.contains("DTSTART:20250310T080000\r\n"));
    assert!(text.contains("DTEND:20250310T083000\r\n"));
}

#[tokio::test]
async fn external_schedule_is_checked_before_use() {
    let (app, _dir) = test_app();
    let fixed = json!([
        { "id": "m", "name": "Dentist", "start": "2025-03-10T09:00:00+00:00", "end": "2025-03-10T10:00:00+00:00" }
    ]);
    let clashing = r#"[{"id": "x", "name": "Essay", "start": "2025-03-10T09:30:00+00:00", "end": "2025-03-10T10:30:00+00:00", "kind": "task"}]"#;

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/schedule/validate",
        Some(json!({
            "text": clashing,
            "fixedIntervals": fixed,
            "workDayStart": "2025-03-10T08:00:00+00:00",
            "workDayEnd": "2025-03-10T12:00:00+00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], json!("blocks[0]"));

    let clean = r#"[{"id": "x", "name": "Essay", "start": "2025-03-10T10:00:00+00:00", "end": "2025-03-10T11:00:00+00:00", "kind": "task"}]"#;
    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/schedule/validate",
        Some(json!({
            "text": clean,
            "fixedIntervals": fixed,
            "workDayStart": "2025-03-10T08:00:00+00:00",
            "workDayEnd": "2025-03-10T12:00:00+00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blocks"][0]["id"], json!("x"));
}
