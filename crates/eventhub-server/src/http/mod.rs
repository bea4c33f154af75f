//! HTTP surface of the `EventHub` server.

pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use eventhub_crypto::SignatureEngine;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;
use crate::qr::{HackathonAttendanceService, IssuanceService, ScanService};
use crate::storage::EventDatabase;

pub use error::ApiError;
pub use extract::AuthUser;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub issuance: IssuanceService,
    pub scan: ScanService,
    pub hackathon: HackathonAttendanceService,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    /// Wire every service to the same pool and signing engine.
    pub fn new(
        db: EventDatabase,
        engine: Arc<SignatureEngine>,
        jwt: Arc<JwtManager>,
        public_base_url: &str,
    ) -> Self {
        Self {
            issuance: IssuanceService::new(db.clone(), Arc::clone(&engine), public_base_url),
            scan: ScanService::new(db.clone(), Arc::clone(&engine)),
            hackathon: HackathonAttendanceService::new(db, engine),
            jwt,
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let qr = Router::new()
        .route("/users/{user_id}", post(routes::issue_for_user))
        .route(
            "/users/{user_id}/regenerate",
            post(routes::regenerate_for_user),
        )
        .route("/events/{event_id}", post(routes::issue_for_event))
        .route(
            "/events/{event_id}/regenerate",
            post(routes::regenerate_for_event),
        )
        .route("/events/{event_id}/quick", get(routes::quick_access_for_event))
        .route(
            "/hackathons/{hackathon_id}/quick",
            get(routes::quick_access_for_hackathon),
        )
        .route(
            "/hackathons/{hackathon_id}/teams/{team_id}/members/{user_id}",
            post(routes::issue_for_team_member),
        )
        .route("/scan", post(routes::scan));

    let hackathons = Router::new()
        .route(
            "/schedules/{schedule_id}/check-in",
            post(routes::hackathon_check_in),
        )
        .route(
            "/schedules/{schedule_id}/attendance",
            post(routes::mark_bulk).get(routes::list_attendance),
        )
        .route(
            "/schedules/{schedule_id}/attendance/{team_member_id}",
            put(routes::mark_manual),
        );

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api/qr", qr)
        .nest("/api/hackathons", hackathons)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
