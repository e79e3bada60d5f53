//! Test Helper Utilities
//!
//! Shared setup for pollwatch-server integration tests: a temporary
//! database seeded with one user per role, an active election with a
//! polling station, and a request helper driving the router in-process.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use pollwatch_common::config::ServerConfig;
use pollwatch_common::db::init_database;
use pollwatch_common::models::{Actor, ElectionType, Role};
use pollwatch_server::db::{elections, users};
use pollwatch_server::{build_router, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

pub const ADMIN_TOKEN: &str = "admin-token-0001";
pub const OBSERVER_TOKEN: &str = "observer-token-0001";
pub const CITIZEN_TOKEN: &str = "citizen-token-0001";

pub struct TestApp {
    pub state: AppState,
    pub admin: Actor,
    pub observer: Actor,
    pub citizen: Actor,
    pub election_id: i64,
    pub other_election_id: i64,
    pub station_id: i64,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("pollwatch.db")).await.unwrap();

        let admin = users::insert_user(&pool, "admin", Role::Admin, "IEBC", ADMIN_TOKEN)
            .await
            .unwrap();
        let observer = users::insert_user(&pool, "observer", Role::Observer, "ELOG", OBSERVER_TOKEN)
            .await
            .unwrap();
        let citizen = users::insert_user(&pool, "citizen", Role::Citizen, "", CITIZEN_TOKEN)
            .await
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2027, 8, 10).unwrap();
        let election = elections::insert_election(
            &pool,
            "General Election 2027",
            date,
            ElectionType::General,
            "",
            true,
        )
        .await
        .unwrap();
        let other = elections::insert_election(
            &pool,
            "Kibra By-Election",
            date,
            ElectionType::ByElection,
            "",
            true,
        )
        .await
        .unwrap();
        let station = elections::insert_station(
            &pool,
            "Olympic Primary School",
            "047-281-1453-001",
            "Kibra",
            "Nairobi",
            None,
            700,
        )
        .await
        .unwrap();

        let config = ServerConfig {
            client_buffer: 16,
            ..ServerConfig::default()
        };

        Self {
            state: AppState::new(pool, config),
            admin,
            observer,
            citizen,
            election_id: election.id,
            other_election_id: other.id,
            station_id: station.id,
            _dir: dir,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Send a request; returns status and parsed JSON body (Null if empty)
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Should parse JSON")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, token, Some(body)).await
    }

    /// Create an incident through the API and return its id
    pub async fn create_incident(&self, token: Option<&str>, extra: Value) -> i64 {
        let mut body = serde_json::json!({
            "election": self.election_id,
            "incident_type": "irregularity",
            "severity": "high",
            "description": "Ballot boxes arrived unsealed",
        });
        if let (Some(target), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                target.insert(k.clone(), v.clone());
            }
        }

        let (status, json) = self.post("/api/submissions/incident", token, body).await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", json);
        json["id"].as_i64().unwrap()
    }

    /// Create a station update through the API and return its id
    pub async fn create_station_update(&self, token: Option<&str>) -> i64 {
        let body = serde_json::json!({
            "election": self.election_id,
            "polling_station": self.station_id,
            "update_type": "opening",
            "opening_time": "06:05",
        });

        let (status, json) = self.post("/api/submissions/station_update", token, body).await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", json);
        json["id"].as_i64().unwrap()
    }
}
