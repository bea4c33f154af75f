//! Mapping from service errors to HTTP responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::qr::{INVALID_CODE_MESSAGE, QrError};

/// Error returned by every handler.
///
/// The body is always `{"error": message, "status": code}`. Internal causes
/// are logged, never sent to the client.
#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(&'static str),
    BadRequest(String),
    Qr(QrError),
}

impl From<QrError> for ApiError {
    fn from(e: QrError) -> Self {
        Self::Qr(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl ApiError {
    pub const fn forbidden() -> Self {
        Self::Qr(QrError::Forbidden("admin or master role required"))
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, (*msg).to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Qr(e) => match e {
                QrError::InvalidCode => (StatusCode::BAD_REQUEST, INVALID_CODE_MESSAGE.to_string()),
                QrError::Forbidden(_) => (StatusCode::FORBIDDEN, e.to_string()),
                QrError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
                QrError::Conflict(_) => (StatusCode::CONFLICT, e.to_string()),
                QrError::WrongCheckpoint(_) | QrError::HackathonMismatch => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                QrError::Encoding(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate QR code".to_string(),
                ),
                QrError::Database(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = ?self, "Request failed");
        } else if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            warn!(status = status.as_u16(), "Request rejected");
        }

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventhub_core::db::DatabaseError;

    fn status_of(e: ApiError) -> StatusCode {
        e.into_response().status()
    }

    #[test]
    fn qr_errors_map_to_expected_statuses() {
        assert_eq!(status_of(QrError::InvalidCode.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ApiError::forbidden()), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(QrError::NotFound("User u1".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(QrError::Conflict("dup".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(QrError::WrongCheckpoint("teamMember").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(QrError::HackathonMismatch.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(QrError::Encoding("too long".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ApiError::Unauthenticated("Missing authorization header")),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let (_, message) =
            ApiError::from(QrError::Database(DatabaseError::Query("secret sql".into())))
                .status_and_message();
        assert!(!message.contains("secret sql"));
    }
}
