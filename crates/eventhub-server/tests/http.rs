#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use eventhub_crypto::SignatureEngine;
use eventhub_server::auth::{JwtManager, Role};
use eventhub_server::http::{AppState, build_router};
use eventhub_server::storage::{EventDatabase, NewEvent, NewUser};

struct TestApp {
    router: axum::Router,
    jwt: Arc<JwtManager>,
    db: EventDatabase,
}

async fn app() -> TestApp {
    let db = EventDatabase::open_in_memory().await.unwrap();
    for (id, role) in [("admin", "admin"), ("u1", "student"), ("s1", "student")] {
        db.create_user(&NewUser {
            id,
            external_id: &format!("ext-{id}"),
            name: id,
            email: &format!("{id}@uni.example.edu"),
            role,
        })
        .await
        .unwrap();
    }
    db.create_event(&NewEvent {
        id: "e1",
        title: "Rust Workshop",
        description: "",
        venue: Some("Hall A"),
        starts_at: 1_800_000_000_000,
        created_by: "admin",
    })
    .await
    .unwrap();
    db.register_for_event("r1", "u1", "e1").await.unwrap();
    db.create_hackathon("h1", "Spring Hack", 1_800_000_000_000, "admin")
        .await
        .unwrap();
    db.create_team("t1", "h1", "Crabs").await.unwrap();
    db.add_team_member("m1", "t1", "s1").await.unwrap();
    db.create_schedule("sch1", "h1", "Day 1 morning", 1_800_000_000_000)
        .await
        .unwrap();

    let engine = Arc::new(SignatureEngine::new(b"http-test-qr-secret").unwrap());
    let jwt = Arc::new(JwtManager::new(b"http-test-jwt-secret", 3600));
    let state = AppState::new(
        db.clone(),
        engine,
        Arc::clone(&jwt),
        "https://events.example.edu",
    );

    TestApp {
        router: build_router(state),
        jwt,
        db,
    }
}

impl TestApp {
    fn token(&self, user_id: &str, role: Role) -> String {
        self.jwt.issue_access_token(user_id, role).unwrap().0
    }

    /// Send a request and return (status, JSON body).
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let resp = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn issuance_requires_a_token() {
    let app = app().await;
    let (status, body) = app
        .send(Method::POST, "/api/qr/users/u1", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let (status, _) = app
        .send(Method::POST, "/api/qr/users/u1", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn student_may_issue_own_code_only() {
    let app = app().await;
    let student = app.token("u1", Role::Student);

    let (status, own) = app
        .send(Method::POST, "/api/qr/users/u1", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["variant"], "secure");
    assert!(!own["qrCode"].as_str().unwrap().is_empty());

    let (status, _) = app
        .send(Method::POST, "/api/qr/users/s1", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::POST, "/api/qr/events/e1", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn issue_and_scan_end_to_end() {
    let app = app().await;
    let admin = app.token("admin", Role::Admin);
    let student = app.token("u1", Role::Student);

    let (_, issued) = app
        .send(Method::POST, "/api/qr/users/u1", Some(&student), None)
        .await;
    let qr_data = issued["qrCodeData"].as_str().unwrap().to_string();
    let scan_body = json!({ "qrData": qr_data, "eventId": "e1" });

    let (status, first) = app
        .send(Method::POST, "/api/qr/scan", Some(&admin), Some(scan_body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["type"], "user");
    assert_eq!(first["user"]["id"], "u1");
    assert_eq!(first["checkIn"]["status"], "checkedInNow");
    assert!(first["scannedAt"].as_i64().unwrap() > 0);

    let (status, second) = app
        .send(Method::POST, "/api/qr/scan", Some(&admin), Some(scan_body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["checkIn"]["status"], "alreadyCheckedIn");
    assert_eq!(
        second["checkIn"]["registration"]["checkedInAt"],
        first["checkIn"]["registration"]["checkedInAt"]
    );

    let reg = app.db.get_registration("u1", "e1").await.unwrap().unwrap();
    assert!(reg.attended);
}

#[tokio::test]
async fn student_scanner_is_forbidden() {
    let app = app().await;
    let student = app.token("u1", Role::Student);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/qr/scan",
            Some(&student),
            Some(json!({ "qrData": "not a code" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);
}

#[tokio::test]
async fn tampered_code_gets_generic_message() {
    let app = app().await;
    let admin = app.token("admin", Role::Admin);

    let (_, issued) = app
        .send(Method::POST, "/api/qr/users/u1", Some(&admin), None)
        .await;
    let tampered = issued["qrCodeData"]
        .as_str()
        .unwrap()
        .replace("ext-u1", "ext-s1");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/qr/scan",
            Some(&admin),
            Some(json!({ "qrData": tampered, "eventId": "e1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired QR code");
}

#[tokio::test]
async fn quick_access_is_public_and_unsigned() {
    let app = app().await;
    let (status, body) = app
        .send(Method::GET, "/api/qr/events/e1/quick", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["variant"], "quickAccess");
    assert_eq!(body["qrCodeData"], "https://events.example.edu/events/e1");

    let (status, _) = app
        .send(Method::GET, "/api/qr/hackathons/missing/quick", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hackathon_check_in_and_manual_marks() {
    let app = app().await;
    let admin = app.token("admin", Role::Master);

    let (status, issued) = app
        .send(
            Method::POST,
            "/api/qr/hackathons/h1/teams/t1/members/s1?persist=true",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let qr_data = issued["qrCodeData"].as_str().unwrap().to_string();

    let (status, event_desk) = app
        .send(
            Method::POST,
            "/api/qr/scan",
            Some(&admin),
            Some(json!({ "qrData": qr_data, "eventId": "e1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(event_desk["error"].as_str().unwrap().contains("teamMember"));

    let (status, checked) = app
        .send(
            Method::POST,
            "/api/hackathons/schedules/sch1/check-in",
            Some(&admin),
            Some(json!({ "qrData": qr_data })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(checked["checkedInNow"], true);
    assert_eq!(checked["record"]["isPresent"], true);

    let (status, marked) = app
        .send(
            Method::PUT,
            "/api/hackathons/schedules/sch1/attendance/m1",
            Some(&admin),
            Some(json!({ "isPresent": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["isPresent"], false);

    let (status, bulk) = app
        .send(
            Method::POST,
            "/api/hackathons/schedules/sch1/attendance",
            Some(&admin),
            Some(json!({ "entries": [{ "teamMemberId": "m1", "isPresent": true }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bulk["written"], 1);

    let (status, list) = app
        .send(
            Method::GET,
            "/api/hackathons/schedules/sch1/attendance",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["isPresent"], true);
}

#[tokio::test]
async fn empty_bulk_request_is_rejected() {
    let app = app().await;
    let admin = app.token("admin", Role::Admin);
    let (status, _) = app
        .send(
            Method::POST,
            "/api/hackathons/schedules/sch1/attendance",
            Some(&admin),
            Some(json!({ "entries": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_body_gets_error_envelope() {
    let app = app().await;
    let admin = app.token("admin", Role::Admin);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/qr/scan")
        .header("authorization", format!("Bearer {admin}"))
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let resp = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], 400);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn missing_body_field_gets_error_envelope() {
    let app = app().await;
    let admin = app.token("admin", Role::Admin);

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/hackathons/schedules/sch1/attendance/m1",
            Some(&admin),
            Some(json!({ "present": true })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn bad_query_string_gets_error_envelope() {
    let app = app().await;
    let admin = app.token("admin", Role::Admin);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/qr/hackathons/h1/teams/t1/members/s1?persist=maybe",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["error"].is_string());
}
