//! Typed QR payloads and their wire format.
//!
//! The wire format is a flat JSON object kept compatible with codes that are
//! already printed or persisted:
//!
//! ```text
//! { id, type: "user"|"event"|"teamMember", userId, eventId?, teamId?,
//!   hackathonId?, timestamp, signature }
//! ```
//!
//! Inside the server a payload is a [`QrPayload`] whose [`QrSubject`] carries
//! exactly the identifiers its kind needs.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{PayloadError, SignerError};
use crate::signer::{SignatureEngine, SignedFields};

/// Discriminator carried in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayloadType {
    User,
    Event,
    TeamMember,
}

impl PayloadType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Event => "event",
            Self::TeamMember => "teamMember",
        }
    }
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload exactly as serialized into a QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WirePayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PayloadType,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hackathon_id: Option<String>,
    pub timestamp: i64,
    pub signature: String,
}

/// Who or what a QR code identifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrSubject {
    /// An attendee; `user_id` is the user's external identity.
    User { user_id: String },
    /// An event; `created_by` is the issuing organiser.
    Event { event_id: String, created_by: String },
    /// A hackathon participant; `user_id` is the internal user id.
    TeamMember {
        user_id: String,
        team_id: String,
        hackathon_id: String,
    },
}

impl QrSubject {
    pub const fn kind(&self) -> PayloadType {
        match self {
            Self::User { .. } => PayloadType::User,
            Self::Event { .. } => PayloadType::Event,
            Self::TeamMember { .. } => PayloadType::TeamMember,
        }
    }

    /// Value carried in the wire `userId` field.
    pub fn subject_id(&self) -> &str {
        match self {
            Self::User { user_id } | Self::TeamMember { user_id, .. } => user_id,
            Self::Event { created_by, .. } => created_by,
        }
    }
}

/// A signed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPayload {
    pub id: String,
    /// Creation time in epoch milliseconds. Recorded for audit; codes do not
    /// expire.
    pub timestamp: i64,
    pub subject: QrSubject,
    pub signature: String,
}

impl QrPayload {
    /// Sign `subject` with the given id and timestamp.
    pub fn sign(
        engine: &SignatureEngine,
        id: String,
        timestamp: i64,
        subject: QrSubject,
    ) -> Result<Self, SignerError> {
        let signature = engine.sign(&SignedFields::from_parts(&id, timestamp, &subject))?;
        Ok(Self {
            id,
            timestamp,
            subject,
            signature,
        })
    }

    pub fn to_wire(&self) -> WirePayload {
        let mut wire = WirePayload {
            id: self.id.clone(),
            kind: self.subject.kind(),
            user_id: self.subject.subject_id().to_string(),
            event_id: None,
            team_id: None,
            hackathon_id: None,
            timestamp: self.timestamp,
            signature: self.signature.clone(),
        };
        match &self.subject {
            QrSubject::User { .. } => {}
            QrSubject::Event { event_id, .. } => wire.event_id = Some(event_id.clone()),
            QrSubject::TeamMember {
                team_id,
                hackathon_id,
                ..
            } => {
                wire.team_id = Some(team_id.clone());
                wire.hackathon_id = Some(hackathon_id.clone());
            }
        }
        wire
    }

    /// JSON string that goes into the QR image.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_wire())
    }
}

impl TryFrom<WirePayload> for QrPayload {
    type Error = PayloadError;

    fn try_from(wire: WirePayload) -> Result<Self, Self::Error> {
        let kind = wire.kind.as_str();
        let forbid = |value: &Option<String>, field: &'static str| match value {
            Some(_) => Err(PayloadError::UnexpectedField { kind, field }),
            None => Ok(()),
        };
        let require = |value: Option<String>, field: &'static str| {
            value.ok_or(PayloadError::MissingField { kind, field })
        };

        let subject = match wire.kind {
            PayloadType::User => {
                forbid(&wire.event_id, "eventId")?;
                forbid(&wire.team_id, "teamId")?;
                forbid(&wire.hackathon_id, "hackathonId")?;
                QrSubject::User {
                    user_id: wire.user_id,
                }
            }
            PayloadType::Event => {
                forbid(&wire.team_id, "teamId")?;
                forbid(&wire.hackathon_id, "hackathonId")?;
                QrSubject::Event {
                    event_id: require(wire.event_id, "eventId")?,
                    created_by: wire.user_id,
                }
            }
            PayloadType::TeamMember => {
                forbid(&wire.event_id, "eventId")?;
                QrSubject::TeamMember {
                    user_id: wire.user_id,
                    team_id: require(wire.team_id, "teamId")?,
                    hackathon_id: require(wire.hackathon_id, "hackathonId")?,
                }
            }
        };

        Ok(Self {
            id: wire.id,
            timestamp: wire.timestamp,
            subject,
            signature: wire.signature,
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn sign_fresh(engine: &SignatureEngine, subject: QrSubject) -> Result<QrPayload, SignerError> {
    QrPayload::sign(
        engine,
        uuid::Uuid::new_v4().to_string(),
        now_millis(),
        subject,
    )
}

/// Build a signed attendee payload.
pub fn build_user_payload(
    engine: &SignatureEngine,
    subject_id: &str,
) -> Result<QrPayload, SignerError> {
    sign_fresh(
        engine,
        QrSubject::User {
            user_id: subject_id.to_string(),
        },
    )
}

/// Build a signed event payload.
pub fn build_event_payload(
    engine: &SignatureEngine,
    event_id: &str,
    created_by_id: &str,
) -> Result<QrPayload, SignerError> {
    sign_fresh(
        engine,
        QrSubject::Event {
            event_id: event_id.to_string(),
            created_by: created_by_id.to_string(),
        },
    )
}

/// Build a signed hackathon team-member payload.
pub fn build_team_member_payload(
    engine: &SignatureEngine,
    subject_id: &str,
    team_id: &str,
    hackathon_id: &str,
) -> Result<QrPayload, SignerError> {
    sign_fresh(
        engine,
        QrSubject::TeamMember {
            user_id: subject_id.to_string(),
            team_id: team_id.to_string(),
            hackathon_id: hackathon_id.to_string(),
        },
    )
}
