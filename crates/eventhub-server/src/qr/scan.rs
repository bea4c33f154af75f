//! Scan-time verification and event check-in.
//!
//! The scanner is authorized before the code is even parsed, so a
//! non-elevated caller learns nothing about the validity of what they hold.

use std::sync::Arc;

use eventhub_core::db::unix_timestamp_millis;
use eventhub_crypto::{PayloadType, QrSubject, SignatureEngine};
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::error::QrError;
use super::{record_outcome, require_elevated, verify_code};
use crate::auth::Role;
use crate::storage::{Event, EventDatabase, EventRegistration, User};

/// Who is scanning, and at which event desk.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub actor_id: String,
    pub role: Role,
    /// When set, a scanned attendee is checked in to this event.
    pub event_id: Option<String>,
}

/// Public profile of a scanned attendee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedUser {
    pub id: String,
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<User> for ScannedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            external_id: user.external_id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Outcome of checking a scanned attendee in to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CheckIn {
    /// This scan flipped the registration to attended.
    CheckedInNow { registration: EventRegistration },
    /// An earlier scan already did; its time and scanner are kept.
    AlreadyCheckedIn { registration: EventRegistration },
    NotRegistered { event_id: String },
}

impl CheckIn {
    pub const fn checked_in_now(&self) -> bool {
        matches!(self, Self::CheckedInNow { .. })
    }
}

/// Successful scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ScanResult {
    User {
        user: ScannedUser,
        #[serde(skip_serializing_if = "Option::is_none")]
        check_in: Option<CheckIn>,
        scanned_at: i64,
    },
    Event {
        event: Event,
        scanned_at: i64,
    },
}

impl ScanResult {
    pub const fn scanned_at(&self) -> i64 {
        match self {
            Self::User { scanned_at, .. } | Self::Event { scanned_at, .. } => *scanned_at,
        }
    }
}

/// Verifies scanned codes and records event attendance.
#[derive(Clone)]
pub struct ScanService {
    db: EventDatabase,
    engine: Arc<SignatureEngine>,
}

impl ScanService {
    pub const fn new(db: EventDatabase, engine: Arc<SignatureEngine>) -> Self {
        Self { db, engine }
    }

    /// Verify `raw` and act on it.
    #[instrument(skip(self, raw), fields(actor = %ctx.actor_id, event_id = ?ctx.event_id))]
    pub async fn scan(&self, raw: &str, ctx: &ScanContext) -> Result<ScanResult, QrError> {
        require_elevated(ctx.role, "scan")?;
        let payload = verify_code(&self.engine, raw, "scan")?;
        let scanned_at = unix_timestamp_millis();

        match payload.subject {
            QrSubject::User { user_id } => {
                let user = self.db.get_user_by_external_id(&user_id).await?;
                let check_in = match ctx.event_id.as_deref() {
                    Some(event_id) => {
                        Some(self.check_in(&user, event_id, scanned_at, ctx).await?)
                    }
                    None => None,
                };
                record_outcome(
                    "scan",
                    match &check_in {
                        Some(CheckIn::CheckedInNow { .. }) => "checked_in",
                        Some(CheckIn::AlreadyCheckedIn { .. }) => "already_checked_in",
                        Some(CheckIn::NotRegistered { .. }) => "not_registered",
                        None => "user",
                    },
                );
                Ok(ScanResult::User {
                    user: user.into(),
                    check_in,
                    scanned_at,
                })
            }
            QrSubject::Event { event_id, .. } => {
                let event = self.db.get_event(&event_id).await?;
                debug!(event_id = %event.id, "Event code scanned");
                record_outcome("scan", "event");
                Ok(ScanResult::Event { event, scanned_at })
            }
            QrSubject::TeamMember { .. } => {
                record_outcome("scan", "wrong_checkpoint");
                Err(QrError::WrongCheckpoint(PayloadType::TeamMember.as_str()))
            }
        }
    }

    async fn check_in(
        &self,
        user: &User,
        event_id: &str,
        scanned_at: i64,
        ctx: &ScanContext,
    ) -> Result<CheckIn, QrError> {
        let event = self.db.get_event(event_id).await?;
        if self.db.get_registration(&user.id, &event.id).await?.is_none() {
            return Ok(CheckIn::NotRegistered { event_id: event.id });
        }

        let flipped = self
            .db
            .mark_registration_attended(&user.id, &event.id, scanned_at, &ctx.actor_id)
            .await?;
        let registration = self
            .db
            .get_registration(&user.id, &event.id)
            .await?
            .ok_or_else(|| QrError::NotFound(format!("Registration of {} for {}", user.id, event.id)))?;

        if flipped {
            info!(user_id = %user.id, event_id = %event.id, "Attendee checked in");
            Ok(CheckIn::CheckedInNow { registration })
        } else {
            debug!(user_id = %user.id, event_id = %event.id, "Attendee already checked in");
            Ok(CheckIn::AlreadyCheckedIn { registration })
        }
    }
}

impl std::fmt::Debug for ScanService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanService").finish_non_exhaustive()
    }
}
