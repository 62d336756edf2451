use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rescue_dispatch::api::rest::router;
use rescue_dispatch::config::Config;
use rescue_dispatch::engine::dispatch::run_dispatch_engine;
use rescue_dispatch::state::AppState;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

fn setup() -> (axum::Router, mpsc::Receiver<String>) {
    let (state, rx) = AppState::new(&Config::default());
    (router(Arc::new(state)), rx)
}

/// App with the dispatch engine running behind it, as in production.
fn setup_with_engine() -> axum::Router {
    let (state, rx) = AppState::new(&Config::default());
    let shared = Arc::new(state);
    tokio::spawn(run_dispatch_engine(shared.clone(), rx));
    router(shared)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn rescuer_payload(name: &str, lat: f64, lng: f64, vehicle: &str, capacity: u32) -> Value {
    json!({
        "name": name,
        "phone": "+84905551234",
        "location": { "lat": lat, "lng": lng },
        "vehicle": vehicle,
        "capacity": capacity
    })
}

fn ticket_payload(lat: f64, lng: f64, priority: u8, people: u32) -> Value {
    json!({
        "location": { "lat": lat, "lng": lng, "address_text": "Phu Vang district" },
        "victim_info": {
            "phone": "+84901112222",
            "people_count": people,
            "elderly": false,
            "children": true,
            "disabled": false
        },
        "priority": priority,
        "raw_message": "nha ngap sau, co tre em",
        "source": "telegram"
    })
}

async fn register_rescuer(app: &axum::Router, payload: Value) -> String {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/rescuers", payload))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    body["id"].as_str().unwrap().to_string()
}

async fn create_ticket(app: &axum::Router, payload: Value) -> String {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/tickets", payload))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    body["id"].as_str().unwrap().to_string()
}

async fn ticket_status(app: &axum::Router, id: &str) -> Value {
    let res = app
        .clone()
        .oneshot(get_request(&format!("/tickets/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn settle() {
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rescuers"], 0);
    assert_eq!(body["tickets"], 0);
    assert_eq!(body["dispatches"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("tickets_in_queue"));
    assert!(body.contains("active_missions"));
}

#[tokio::test]
async fn register_rescuer_initializes_defaults() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/rescuers",
            rescuer_payload("Song Huong Team", 16.46, 107.59, "cano", 6),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["name"], "Song Huong Team");
    assert_eq!(body["status"], "Online");
    assert_eq!(body["vehicle"], "cano");
    assert_eq!(body["rating"], 5.0);
    assert_eq!(body["completed_missions"], 0);
    assert_eq!(body["registration"], "Active");
    assert!(body["id"].as_str().unwrap().starts_with("RES-"));
}

#[tokio::test]
async fn register_rescuer_empty_name_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/rescuers",
            rescuer_payload("  ", 16.46, 107.59, "boat", 4),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rescuer_zero_capacity_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/rescuers",
            rescuer_payload("Team Zero", 16.46, 107.59, "boat", 0),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rescuer_bad_coordinate_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/rescuers",
            rescuer_payload("Team Lost", 97.0, 107.59, "boat", 4),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_ticket_starts_open() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/tickets",
            ticket_payload(16.0, 107.0, 4, 3),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "Open");
    assert!(body["assigned_rescuer_id"].is_null());
    assert_eq!(body["location"]["address"], "Phu Vang district");
    assert!(body["id"].as_str().unwrap().starts_with("SOS-"));
}

#[tokio::test]
async fn create_ticket_priority_out_of_range_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/tickets",
            ticket_payload(16.0, 107.0, 6, 3),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_ticket_zero_people_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/tickets",
            ticket_payload(16.0, 107.0, 3, 0),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_nonexistent_ticket_returns_404() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(get_request("/tickets/SOS-MISSING"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_rescue_flow() {
    let app = setup_with_engine();

    let rescuer_id = register_rescuer(
        &app,
        rescuer_payload("Song Huong Team", 16.018, 107.0, "cano", 6),
    )
    .await;
    let ticket_id = create_ticket(&app, ticket_payload(16.0, 107.0, 5, 4)).await;

    settle().await;

    let ticket = ticket_status(&app, &ticket_id).await;
    assert_eq!(ticket["status"], "Assigned");
    assert_eq!(ticket["assigned_rescuer_id"], rescuer_id);

    let res = app.clone().oneshot(get_request("/dispatches")).await.unwrap();
    let dispatches = body_json(res).await;
    let list = dispatches.as_array().unwrap();
    assert_eq!(list.len(), 1);
    let record = &list[0];
    assert_eq!(record["ticket_id"], ticket_id);
    assert_eq!(record["rescuer_id"], rescuer_id);
    assert!(record["score"].as_i64().unwrap() > 0);
    assert_eq!(record["radius_km"], 5.0);
    assert!(record["score_breakdown"]["vehicle_score"].as_f64().unwrap() > 0.0);

    let res = app
        .clone()
        .oneshot(post_request(&format!("/tickets/{ticket_id}/progress")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "InProgress");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/tickets/{ticket_id}/verification"),
            json!({ "is_valid": true, "confidence": 0.92, "metadata_valid": true }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let completed = body_json(res).await;
    assert_eq!(completed["status"], "Completed");
    assert!(completed["assigned_rescuer_id"].is_null());
    assert_eq!(completed["completed_by"], rescuer_id);

    let res = app.oneshot(get_request("/rescuers")).await.unwrap();
    let rescuers = body_json(res).await;
    let rescuer = &rescuers.as_array().unwrap()[0];
    assert_eq!(rescuer["status"], "Idle");
    assert_eq!(rescuer["completed_missions"], 1);
}

#[tokio::test]
async fn capacity_filter_picks_the_bigger_boat() {
    let app = setup_with_engine();

    // A: cano, 4 seats, ~2 km out. B: boat, 2 seats, ~1 km out. Three
    // victims, so B never qualifies.
    let winner_id = register_rescuer(
        &app,
        rescuer_payload("Team A", 16.018, 107.0, "cano", 4),
    )
    .await;
    register_rescuer(&app, rescuer_payload("Team B", 16.009, 107.0, "boat", 2)).await;

    let ticket_id = create_ticket(&app, ticket_payload(16.0, 107.0, 5, 3)).await;
    settle().await;

    let ticket = ticket_status(&app, &ticket_id).await;
    assert_eq!(ticket["status"], "Assigned");
    assert_eq!(ticket["assigned_rescuer_id"], winner_id);
}

#[tokio::test]
async fn exhausted_search_keeps_ticket_open() {
    let app = setup_with_engine();

    // ~22 km out: beyond the 15 km ladder cap.
    register_rescuer(&app, rescuer_payload("Team Far", 16.198, 107.0, "boat", 6)).await;

    let ticket_id = create_ticket(&app, ticket_payload(16.0, 107.0, 4, 2)).await;
    settle().await;

    let ticket = ticket_status(&app, &ticket_id).await;
    assert_eq!(ticket["status"], "Open");

    // The retry-later path reports exhaustion rather than failing.
    let res = app
        .oneshot(post_request(&format!("/tickets/{ticket_id}/dispatch")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["outcome"], "exhausted");
    assert_eq!(body["detail"]["searched_km"], 15.0);
}

#[tokio::test]
async fn failed_verification_keeps_mission_running() {
    let app = setup_with_engine();

    register_rescuer(&app, rescuer_payload("Team A", 16.009, 107.0, "boat", 4)).await;
    let ticket_id = create_ticket(&app, ticket_payload(16.0, 107.0, 3, 2)).await;
    settle().await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/tickets/{ticket_id}/progress")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // 50% confidence is below the 65% threshold.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/tickets/{ticket_id}/verification"),
            json!({ "is_valid": true, "confidence": 0.5, "metadata_valid": true }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let ticket = ticket_status(&app, &ticket_id).await;
    assert_eq!(ticket["status"], "InProgress");
}

#[tokio::test]
async fn repeated_verification_does_not_double_credit() {
    let app = setup_with_engine();

    register_rescuer(&app, rescuer_payload("Team A", 16.009, 107.0, "cano", 4)).await;
    let ticket_id = create_ticket(&app, ticket_payload(16.0, 107.0, 2, 1)).await;
    settle().await;

    app.clone()
        .oneshot(post_request(&format!("/tickets/{ticket_id}/progress")))
        .await
        .unwrap();

    let verdict = json!({ "is_valid": true, "confidence": 0.9, "metadata_valid": true });
    for _ in 0..2 {
        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/tickets/{ticket_id}/verification"),
                verdict.clone(),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "Completed");
    }

    let res = app.oneshot(get_request("/rescuers")).await.unwrap();
    let rescuers = body_json(res).await;
    assert_eq!(rescuers.as_array().unwrap()[0]["completed_missions"], 1);
}

#[tokio::test]
async fn cancelling_an_assigned_ticket_frees_the_rescuer() {
    let app = setup_with_engine();

    register_rescuer(&app, rescuer_payload("Team A", 16.009, 107.0, "boat", 4)).await;
    let ticket_id = create_ticket(&app, ticket_payload(16.0, 107.0, 3, 2)).await;
    settle().await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/tickets/{ticket_id}/cancel")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "Cancelled");
    assert!(body["assigned_rescuer_id"].is_null());

    let res = app.oneshot(get_request("/rescuers")).await.unwrap();
    let rescuers = body_json(res).await;
    let rescuer = &rescuers.as_array().unwrap()[0];
    assert_eq!(rescuer["status"], "Idle");
    assert_eq!(rescuer["completed_missions"], 0);
}

#[tokio::test]
async fn suspended_rescuer_is_never_dispatched() {
    let app = setup_with_engine();

    let rescuer_id =
        register_rescuer(&app, rescuer_payload("Team A", 16.009, 107.0, "cano", 4)).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/rescuers/{rescuer_id}/registration"),
            json!({ "registration": "Suspended" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let ticket_id = create_ticket(&app, ticket_payload(16.0, 107.0, 5, 2)).await;
    settle().await;

    let ticket = ticket_status(&app, &ticket_id).await;
    assert_eq!(ticket["status"], "Open");
}

#[tokio::test]
async fn manual_status_update_cannot_enter_mission_state() {
    let app = setup_with_engine();

    let rescuer_id =
        register_rescuer(&app, rescuer_payload("Team A", 16.009, 107.0, "boat", 4)).await;

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/rescuers/{rescuer_id}/status"),
            json!({ "status": "OnMission" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn second_ticket_waits_when_the_only_rescuer_is_claimed() {
    let app = setup_with_engine();

    register_rescuer(&app, rescuer_payload("Team Only", 16.009, 107.0, "cano", 6)).await;

    let first = create_ticket(&app, ticket_payload(16.0, 107.0, 5, 2)).await;
    let second = create_ticket(&app, ticket_payload(16.001, 107.0, 5, 2)).await;
    settle().await;

    let first_status = ticket_status(&app, &first).await["status"].clone();
    let second_status = ticket_status(&app, &second).await["status"].clone();

    let statuses = [first_status.as_str().unwrap(), second_status.as_str().unwrap()];
    assert_eq!(statuses.iter().filter(|s| **s == "Assigned").count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == "Open").count(), 1);
}
