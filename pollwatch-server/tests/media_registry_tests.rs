//! Integration tests for the media and live-stream registry
//!
//! Tests cover:
//! - Registering media with and without a submission association
//! - Moderation and what non-administrators can see
//! - Live-stream lifecycle: start, pause, end (idempotent), heartbeats
//! - Stream key disclosure and control permissions

mod helpers;

use axum::http::StatusCode;
use helpers::{TestApp, ADMIN_TOKEN, CITIZEN_TOKEN, OBSERVER_TOKEN};
use serde_json::{json, Value};

// =============================================================================
// Media
// =============================================================================

#[tokio::test]
async fn test_register_media_for_submission() {
    let app = TestApp::new().await;
    let incident = app.create_incident(Some(CITIZEN_TOKEN), json!({})).await;

    let (status, asset) = app
        .post(
            "/api/media",
            Some(CITIZEN_TOKEN),
            json!({
                "file_ref": "s3://pollwatch-media/incidents/ab12.jpg",
                "media_type": "photo",
                "mime_type": "image/jpeg",
                "file_size": 482113,
                "submission_kind": "incident",
                "submission_id": incident,
                "latitude": -0.0917,
                "longitude": 34.768,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(asset["media_type"], "photo");
    assert_eq!(asset["submission"]["kind"], "incident");
    assert_eq!(asset["submission"]["id"], incident);
    assert_eq!(asset["is_approved"], true);
    assert_eq!(asset["is_moderated"], false);
    assert_eq!(asset["uploaded_by"]["username"], "citizen");

    let (_, list) = app
        .get(
            &format!("/api/media?submission_kind=incident&submission_id={}", incident),
            None,
        )
        .await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_media_validation() {
    let app = TestApp::new().await;

    let cases = [
        (json!({"media_type": "photo"}), StatusCode::BAD_REQUEST, "file_ref"),
        (json!({"file_ref": "x.mp4"}), StatusCode::BAD_REQUEST, "media_type"),
        (json!({"file_ref": "x.mp4", "media_type": "hologram"}), StatusCode::BAD_REQUEST, "media_type"),
        (json!({"file_ref": "x.mp4", "media_type": "video", "submission_id": 1}), StatusCode::BAD_REQUEST, "submission_kind"),
        (json!({"file_ref": "x.mp4", "media_type": "video", "file_size": -1}), StatusCode::BAD_REQUEST, "file_size"),
    ];
    for (body, expected, field) in cases {
        let (status, json) = app.post("/api/media", Some(OBSERVER_TOKEN), body).await;
        assert_eq!(status, expected, "{}", json);
        assert_eq!(json["error"]["field"], field);
    }

    let (status, _) = app
        .post(
            "/api/media",
            Some(OBSERVER_TOKEN),
            json!({"file_ref": "x.mp4", "media_type": "video", "submission_kind": "incident", "submission_id": 77}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rejected_media_hidden_from_public() {
    let app = TestApp::new().await;

    let (_, asset) = app
        .post("/api/media", None, json!({"file_ref": "clip.mp4", "media_type": "video"}))
        .await;
    assert_eq!(asset["is_anonymous"], true);
    let id = asset["id"].as_i64().unwrap();
    let uri = format!("/api/media/{}", id);

    let (status, _) = app
        .post(&format!("{}/moderate", uri), Some(OBSERVER_TOKEN), json!({"approved": false}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, moderated) = app
        .post(
            &format!("{}/moderate", uri),
            Some(ADMIN_TOKEN),
            json!({"approved": false, "notes": "Shows a voter's ballot"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moderated["is_moderated"], true);
    assert_eq!(moderated["is_approved"], false);

    let (status, _) = app.get(&uri, Some(CITIZEN_TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&uri, Some(ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = app.get("/api/media", None).await;
    assert_eq!(list["count"], 0);
    assert!(list["results"].as_array().unwrap().is_empty());
    let (_, list) = app.get("/api/media", Some(ADMIN_TOKEN)).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["results"].as_array().unwrap().len(), 1);
}

// =============================================================================
// Live streams
// =============================================================================

async fn create_stream(app: &TestApp, token: &str, extra: Value) -> Value {
    let mut body = json!({"title": "Tallying at Bomas", "election": app.election_id});
    if let (Some(target), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            target.insert(k.clone(), v.clone());
        }
    }
    let (status, stream) = app.post("/api/livestreams", Some(token), body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", stream);
    stream
}

#[tokio::test]
async fn test_stream_key_only_in_creation_response() {
    let app = TestApp::new().await;
    let stream = create_stream(&app, OBSERVER_TOKEN, json!({})).await;

    let key = stream["stream_key"].as_str().unwrap();
    assert!(key.starts_with("live_"));
    assert_eq!(stream["state"], "created");

    let (status, fetched) = app
        .get(&format!("/api/livestreams/{}", stream["id"]), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(fetched.get("stream_key").is_none());
    assert_eq!(fetched["created_by"]["username"], "observer");
}

#[tokio::test]
async fn test_stream_lifecycle() {
    let app = TestApp::new().await;
    let stream = create_stream(&app, OBSERVER_TOKEN, json!({})).await;
    let base = format!("/api/livestreams/{}", stream["id"]);

    let (status, json) = app.post(&format!("{}/pause", base), Some(OBSERVER_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "cannot pause before going live: {}", json);

    let (status, live) = app.post(&format!("{}/start", base), Some(OBSERVER_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["state"], "live");
    let started_at = live["started_at"].clone();
    assert!(started_at.is_string());

    let (_, active) = app.get("/api/livestreams/active", None).await;
    assert_eq!(active.as_array().unwrap().len(), 1);

    let (_, paused) = app.post(&format!("{}/pause", base), Some(OBSERVER_TOKEN), json!({})).await;
    assert_eq!(paused["state"], "paused");

    let (_, resumed) = app.post(&format!("{}/start", base), Some(OBSERVER_TOKEN), json!({})).await;
    assert_eq!(resumed["state"], "live");
    assert_eq!(resumed["started_at"], started_at, "resuming keeps the first start time");

    let (status, ended) = app.post(&format!("{}/end", base), Some(OBSERVER_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["state"], "ended");
    assert!(ended["ended_at"].is_string());

    let (status, json) = app.post(&format!("{}/start", base), Some(OBSERVER_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "INVALID_STATE");

    let (_, active) = app.get("/api/livestreams/active", None).await;
    assert!(active.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_end_stream_twice_is_idempotent() {
    let app = TestApp::new().await;
    let stream = create_stream(&app, OBSERVER_TOKEN, json!({})).await;
    let uri = format!("/api/livestreams/{}/end", stream["id"]);

    let (status, first) = app.post(&uri, Some(OBSERVER_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, second) = app.post(&uri, Some(ADMIN_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["state"], "ended");
    assert_eq!(second["ended_at"], first["ended_at"]);
}

#[tokio::test]
async fn test_heartbeat_updates_viewers() {
    let app = TestApp::new().await;
    let stream = create_stream(&app, OBSERVER_TOKEN, json!({})).await;
    let base = format!("/api/livestreams/{}", stream["id"]);
    app.post(&format!("{}/start", base), Some(OBSERVER_TOKEN), json!({})).await;

    let (status, beat) = app
        .post(&format!("{}/heartbeat", base), None, json!({"viewer_count": 40}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(beat["viewer_count"], 40);
    assert_eq!(beat["peak_viewers"], 40);
    assert!(beat["last_heartbeat_at"].is_string());
    assert_eq!(beat["stale"], false);

    let (_, beat) = app
        .post(&format!("{}/heartbeat", base), None, json!({"viewer_count": 25}))
        .await;
    assert_eq!(beat["viewer_count"], 25);
    assert_eq!(beat["peak_viewers"], 40);

    // Audience gone: the count drops to zero, the peak stays
    let (status, beat) = app
        .post(&format!("{}/heartbeat", base), None, json!({"viewer_count": 0}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(beat["viewer_count"], 0);
    assert_eq!(beat["peak_viewers"], 40);
    assert_eq!(beat["total_views"], 2);

    // No count given: only the heartbeat time moves
    let (_, beat) = app.post(&format!("{}/heartbeat", base), None, json!({})).await;
    assert_eq!(beat["viewer_count"], 0);

    let (status, _) = app
        .post(&format!("{}/heartbeat", base), None, json!({"viewer_count": -3}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.post(&format!("{}/end", base), Some(OBSERVER_TOKEN), json!({})).await;
    let (status, json) = app
        .post(&format!("{}/heartbeat", base), None, json!({"viewer_count": 10}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn test_stream_statistics() {
    let app = TestApp::new().await;
    let live = create_stream(&app, OBSERVER_TOKEN, json!({})).await;
    create_stream(&app, OBSERVER_TOKEN, json!({})).await;

    let base = format!("/api/livestreams/{}", live["id"]);
    app.post(&format!("{}/start", base), Some(OBSERVER_TOKEN), json!({})).await;
    app.post(&format!("{}/heartbeat", base), None, json!({"viewer_count": 12}))
        .await;

    let (status, stats) = app.get("/api/livestreams/statistics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_streams"], 2);
    assert_eq!(stats["active_streams"], 1);
    assert_eq!(stats["total_viewers"], 12);
}

#[tokio::test]
async fn test_stream_control_permissions() {
    let app = TestApp::new().await;
    let stream = create_stream(&app, CITIZEN_TOKEN, json!({"is_anonymous": true})).await;
    let base = format!("/api/livestreams/{}", stream["id"]);

    let (status, _) = app.post(&format!("{}/start", base), Some(OBSERVER_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post(&format!("{}/start", base), None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post(&format!("{}/start", base), Some(ADMIN_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    // Anonymous streams hide their creator from everyone but administrators
    let (_, public) = app.get(&base, Some(OBSERVER_TOKEN)).await;
    assert!(public.get("created_by").is_none());
    let (_, admin) = app.get(&base, Some(ADMIN_TOKEN)).await;
    assert_eq!(admin["created_by"]["username"], "citizen");

    let (status, _) = app
        .post("/api/livestreams", Some(CITIZEN_TOKEN), json!({"title": "x", "election": 999}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post("/api/livestreams", Some(CITIZEN_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
