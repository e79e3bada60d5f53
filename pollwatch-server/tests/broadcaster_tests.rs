//! Integration tests for realtime fan-out
//!
//! Events are published by the submission and verification services after
//! their writes commit; these tests drive the HTTP API and observe what
//! registry clients receive.

mod helpers;

use std::time::Duration;

use helpers::{TestApp, ADMIN_TOKEN, CITIZEN_TOKEN};
use pollwatch_common::{EventType, Topic};
use pollwatch_server::broadcaster::{ClientConnection, Delivery};
use serde_json::{json, Value};

async fn next_delivery(client: &mut ClientConnection) -> Delivery {
    tokio::time::timeout(Duration::from_secs(1), client.recv())
        .await
        .expect("timed out waiting for event")
        .expect("client was disconnected")
}

async fn assert_nothing_queued(client: &mut ClientConnection) {
    let result = tokio::time::timeout(Duration::from_millis(50), client.recv()).await;
    assert!(result.is_err(), "unexpected event delivered");
}

fn wire(delivery: &Delivery) -> Value {
    serde_json::from_str(&delivery.to_json().unwrap()).unwrap()
}

#[tokio::test]
async fn test_election_event_reaches_election_and_global_subscribers_only() {
    let app = TestApp::new().await;
    let broadcaster = &app.state.broadcaster;

    let mut election = broadcaster.connect();
    election.subscribe(Topic::Election(app.election_id));
    let mut global = broadcaster.connect();
    global.subscribe(Topic::Global);
    let mut other = broadcaster.connect();
    other.subscribe(Topic::Election(app.other_election_id));

    let id = app.create_station_update(Some(CITIZEN_TOKEN)).await;

    let delivery = next_delivery(&mut election).await;
    assert_eq!(delivery.topic, Topic::Election(app.election_id));
    assert_eq!(delivery.event.event_type, EventType::Created);
    assert_eq!(delivery.event.record.id, id);

    let delivery = next_delivery(&mut global).await;
    assert_eq!(delivery.topic, Topic::Global);
    assert_eq!(delivery.event.record.id, id);

    assert_nothing_queued(&mut other).await;
}

#[tokio::test]
async fn test_incident_topic_and_single_delivery_per_client() {
    let app = TestApp::new().await;
    let broadcaster = &app.state.broadcaster;

    let mut incidents = broadcaster.connect();
    incidents.subscribe(Topic::Incidents);
    let mut both = broadcaster.connect();
    both.subscribe(Topic::Election(app.election_id));
    both.subscribe(Topic::Incidents);

    let id = app.create_incident(None, json!({})).await;
    app.create_station_update(None).await;

    let delivery = next_delivery(&mut incidents).await;
    assert_eq!(delivery.topic, Topic::Incidents);
    assert_eq!(delivery.event.record.id, id);
    assert_nothing_queued(&mut incidents).await;

    // One delivery per event even when several subscriptions match
    let first = next_delivery(&mut both).await;
    assert_eq!(first.event.record.id, id);
    let second = next_delivery(&mut both).await;
    assert_eq!(second.event.kind.as_str(), "station_update");
    assert_nothing_queued(&mut both).await;
}

#[tokio::test]
async fn test_status_change_event_follows_creation_in_order() {
    let app = TestApp::new().await;
    let mut client = app.state.broadcaster.connect();
    client.subscribe(Topic::Global);

    let id = app.create_incident(None, json!({})).await;
    app.post(
        &format!("/api/submissions/incident/{}/verify", id),
        Some(ADMIN_TOKEN),
        json!({"status": "verified"}),
    )
    .await;

    let created = wire(&next_delivery(&mut client).await);
    assert_eq!(created["type"], "created");
    assert_eq!(created["kind"], "incident");
    assert_eq!(created["topic"], "global");
    assert_eq!(created["record"]["verification_status"], "pending");

    let changed = wire(&next_delivery(&mut client).await);
    assert_eq!(changed["type"], "status_changed");
    assert_eq!(changed["record"]["id"], id);
    assert_eq!(changed["record"]["verification_status"], "verified");
    assert!(changed["timestamp"].is_string());
}

#[tokio::test]
async fn test_anonymous_payload_has_no_submitter() {
    let app = TestApp::new().await;
    let mut client = app.state.broadcaster.connect();
    client.subscribe(Topic::Election(app.election_id));

    app.create_incident(Some(CITIZEN_TOKEN), json!({"is_anonymous": true})).await;

    let event = wire(&next_delivery(&mut client).await);
    assert_eq!(event["record"]["is_anonymous"], true);
    assert!(event["record"].get("submitted_by").is_none(), "leaked: {}", event);
}

#[tokio::test]
async fn test_failed_writes_publish_nothing() {
    let app = TestApp::new().await;
    let mut client = app.state.broadcaster.connect();
    client.subscribe(Topic::Global);

    app.post(
        "/api/submissions/incident",
        None,
        json!({"election": app.election_id, "incident_type": "other"}),
    )
    .await;
    app.post(
        "/api/submissions/incident/999/verify",
        Some(ADMIN_TOKEN),
        json!({"status": "verified"}),
    )
    .await;

    assert_nothing_queued(&mut client).await;
}

#[tokio::test]
async fn test_disconnected_client_does_not_block_others() {
    let app = TestApp::new().await;
    let broadcaster = &app.state.broadcaster;

    let mut stays = broadcaster.connect();
    stays.subscribe(Topic::Global);
    let leaves = broadcaster.connect();
    leaves.subscribe(Topic::Global);
    drop(leaves);

    let id = app.create_incident(None, json!({})).await;
    assert_eq!(next_delivery(&mut stays).await.event.record.id, id);
    assert_eq!(broadcaster.client_count(), 1);

    let (_, stats) = app.get("/api/realtime/stats", None).await;
    assert_eq!(stats["clients"], 1);
    assert_eq!(stats["subscriptions"], 1);
}

#[tokio::test]
async fn test_sse_endpoint_registers_client() {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::util::ServiceExt;

    let app = TestApp::new().await;

    let (status, json) = app.get("/api/events?topic=results", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["field"], "topic");

    let request = Request::builder()
        .uri(format!("/api/events?topic=election:{}", app.election_id))
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(app.state.broadcaster.client_count(), 1);

    drop(response);
    assert_eq!(app.state.broadcaster.client_count(), 0);
}
