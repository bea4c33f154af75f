//! Request handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use super::extract::AuthUser;
use crate::qr::{HackathonCheckIn, IssuedQr, ScanContext, ScanResult};
use crate::storage::{AttendanceMark, AttendanceRecord};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub qr_data: String,
    #[serde(default)]
    pub event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub qr_data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub is_present: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMarkEntry {
    pub team_member_id: String,
    pub is_present: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMarkRequest {
    pub entries: Vec<BulkMarkEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMarkResponse {
    pub written: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PersistQuery {
    #[serde(default)]
    pub persist: bool,
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// `POST /api/qr/users/{user_id}`
pub async fn issue_for_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<IssuedQr> {
    auth.require_self_or_elevated(&user_id)?;
    Ok(Json(state.issuance.issue_for_user(&user_id).await?))
}

/// `POST /api/qr/users/{user_id}/regenerate`
pub async fn regenerate_for_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<IssuedQr> {
    auth.require_elevated()?;
    Ok(Json(state.issuance.regenerate_for_user(&user_id).await?))
}

/// `POST /api/qr/events/{event_id}`
pub async fn issue_for_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<String>,
) -> ApiResult<IssuedQr> {
    auth.require_elevated()?;
    Ok(Json(state.issuance.issue_for_event(&event_id).await?))
}

/// `POST /api/qr/events/{event_id}/regenerate`
pub async fn regenerate_for_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<String>,
) -> ApiResult<IssuedQr> {
    auth.require_elevated()?;
    Ok(Json(state.issuance.regenerate_for_event(&event_id).await?))
}

/// `GET /api/qr/events/{event_id}/quick`
pub async fn quick_access_for_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<IssuedQr> {
    Ok(Json(state.issuance.quick_access_for_event(&event_id).await?))
}

/// `GET /api/qr/hackathons/{hackathon_id}/quick`
pub async fn quick_access_for_hackathon(
    State(state): State<AppState>,
    Path(hackathon_id): Path<String>,
) -> ApiResult<IssuedQr> {
    Ok(Json(
        state
            .issuance
            .quick_access_for_hackathon(&hackathon_id)
            .await?,
    ))
}

/// `POST /api/qr/hackathons/{hackathon_id}/teams/{team_id}/members/{user_id}`
pub async fn issue_for_team_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((hackathon_id, team_id, user_id)): Path<(String, String, String)>,
    query: Result<Query<PersistQuery>, QueryRejection>,
) -> ApiResult<IssuedQr> {
    auth.require_elevated()?;
    let Query(query) = query?;
    Ok(Json(
        state
            .issuance
            .issue_for_team_member(&user_id, &team_id, &hackathon_id, query.persist)
            .await?,
    ))
}

/// `POST /api/qr/scan`
pub async fn scan(
    State(state): State<AppState>,
    auth: AuthUser,
    req: Result<Json<ScanRequest>, JsonRejection>,
) -> ApiResult<ScanResult> {
    auth.require_elevated()?;
    let Json(req) = req?;
    let ctx = ScanContext {
        actor_id: auth.user_id,
        role: auth.role,
        event_id: req.event_id,
    };
    Ok(Json(state.scan.scan(&req.qr_data, &ctx).await?))
}

/// `POST /api/hackathons/schedules/{schedule_id}/check-in`
pub async fn hackathon_check_in(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(schedule_id): Path<String>,
    req: Result<Json<CheckInRequest>, JsonRejection>,
) -> ApiResult<HackathonCheckIn> {
    auth.require_elevated()?;
    let Json(req) = req?;
    let ctx = ScanContext {
        actor_id: auth.user_id,
        role: auth.role,
        event_id: None,
    };
    Ok(Json(
        state
            .hackathon
            .check_in(&req.qr_data, &schedule_id, &ctx)
            .await?,
    ))
}

/// `PUT /api/hackathons/schedules/{schedule_id}/attendance/{team_member_id}`
pub async fn mark_manual(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((schedule_id, team_member_id)): Path<(String, String)>,
    req: Result<Json<MarkRequest>, JsonRejection>,
) -> ApiResult<AttendanceRecord> {
    auth.require_elevated()?;
    let Json(req) = req?;
    let mark = AttendanceMark {
        team_member_id,
        is_present: req.is_present,
    };
    Ok(Json(
        state
            .hackathon
            .mark_manual(&schedule_id, &mark, &auth.user_id, auth.role)
            .await?,
    ))
}

/// `POST /api/hackathons/schedules/{schedule_id}/attendance`
pub async fn mark_bulk(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(schedule_id): Path<String>,
    req: Result<Json<BulkMarkRequest>, JsonRejection>,
) -> ApiResult<BulkMarkResponse> {
    auth.require_elevated()?;
    let Json(req) = req?;
    if req.entries.is_empty() {
        return Err(ApiError::BadRequest("entries must not be empty".into()));
    }
    let marks: Vec<AttendanceMark> = req
        .entries
        .into_iter()
        .map(|e| AttendanceMark {
            team_member_id: e.team_member_id,
            is_present: e.is_present,
        })
        .collect();

    let written = state
        .hackathon
        .mark_bulk(&schedule_id, &marks, &auth.user_id, auth.role)
        .await?;
    Ok(Json(BulkMarkResponse { written }))
}

/// `GET /api/hackathons/schedules/{schedule_id}/attendance`
pub async fn list_attendance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(schedule_id): Path<String>,
) -> ApiResult<Vec<AttendanceRecord>> {
    auth.require_elevated()?;
    Ok(Json(state.hackathon.list_for_schedule(&schedule_id).await?))
}
