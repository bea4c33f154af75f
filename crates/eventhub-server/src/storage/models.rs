//! Data models for `EventHub` storage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub qr_code: Option<String>,
    pub qr_code_data: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub venue: Option<String>,
    pub starts_at: i64,
    pub created_by: String,
    pub qr_code: Option<String>,
    pub qr_code_data: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistration {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub attended: bool,
    pub checked_in_at: Option<i64>,
    pub checked_in_by: Option<String>,
    pub registered_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Hackathon {
    pub id: String,
    pub title: String,
    pub starts_at: i64,
    pub created_by: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub hackathon_id: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    pub team_id: String,
    pub user_id: String,
    pub qr_code: Option<String>,
    pub qr_code_data: Option<String>,
    pub joined_at: i64,
}

/// A hackathon check-in slot, e.g. "Day 1, 9am".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSchedule {
    pub id: String,
    pub hackathon_id: String,
    pub label: String,
    pub scheduled_at: i64,
}

/// Presence of one team member at one schedule slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub attendance_schedule_id: String,
    pub team_member_id: String,
    pub is_present: bool,
    pub checked_in_at: Option<i64>,
    pub checked_in_by: Option<String>,
}

/// An issued QR code: the base64 PNG and the exact string it encodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrArtifact {
    pub qr_code: String,
    pub qr_code_data: String,
}

impl QrArtifact {
    /// Artifact stored on a row, if one has been issued.
    pub fn from_columns(qr_code: Option<&str>, qr_code_data: Option<&str>) -> Option<Self> {
        match qr_code {
            Some(code) if !code.is_empty() => Some(Self {
                qr_code: code.to_string(),
                qr_code_data: qr_code_data.unwrap_or_default().to_string(),
            }),
            _ => None,
        }
    }
}

/// Tables that own a QR artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrOwner {
    User,
    Event,
    TeamMember,
}

impl QrOwner {
    pub(crate) const fn table(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Event => "events",
            Self::TeamMember => "team_members",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Event => "event",
            Self::TeamMember => "team_member",
        }
    }
}

impl User {
    pub fn qr_artifact(&self) -> Option<QrArtifact> {
        QrArtifact::from_columns(self.qr_code.as_deref(), self.qr_code_data.as_deref())
    }
}

impl Event {
    pub fn qr_artifact(&self) -> Option<QrArtifact> {
        QrArtifact::from_columns(self.qr_code.as_deref(), self.qr_code_data.as_deref())
    }
}

impl TeamMember {
    pub fn qr_artifact(&self) -> Option<QrArtifact> {
        QrArtifact::from_columns(self.qr_code.as_deref(), self.qr_code_data.as_deref())
    }
}
