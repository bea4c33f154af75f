//! Bearer-token extractor for the acting user.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::AppState;
use super::error::ApiError;
use crate::auth::Role;

/// The authenticated caller, taken from a validated access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require_elevated(&self) -> Result<(), ApiError> {
        if self.role.is_elevated() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    /// The caller may act on `user_id` if it is themselves or they are staff.
    pub fn require_self_or_elevated(&self, user_id: &str) -> Result<(), ApiError> {
        if self.user_id == user_id {
            return Ok(());
        }
        self.require_elevated()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthenticated("Missing authorization header"))?;

        let claims = state
            .jwt
            .validate(token)
            .map_err(|_| ApiError::Unauthenticated("Invalid token"))?;

        if !claims.is_access() {
            return Err(ApiError::Unauthenticated("Not an access token"));
        }

        Ok(Self {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}
