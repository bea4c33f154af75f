//! JWT claims consumed by the `EventHub` server.

use serde::{Deserialize, Serialize};

/// Account role, as carried in the `role` claim and the `users.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
    Master,
}

impl Role {
    /// Admins and masters may scan, regenerate and mark attendance.
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::Admin | Self::Master)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Admin => "admin",
            Self::Master => "master",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "admin" => Ok(Self::Admin),
            "master" => Ok(Self::Master),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (internal user ID).
    pub sub: String,
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    /// Token type; only "access" tokens are accepted by the API.
    pub token_type: String,
}

impl Claims {
    pub fn is_access(&self) -> bool {
        self.token_type == "access"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_and_master_are_elevated() {
        assert!(!Role::Student.is_elevated());
        assert!(Role::Admin.is_elevated());
        assert!(Role::Master.is_elevated());
    }

    #[test]
    fn role_parses_and_serializes_lowercase() {
        assert_eq!("master".parse::<Role>().unwrap(), Role::Master);
        assert!("Admin".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);
    }
}
