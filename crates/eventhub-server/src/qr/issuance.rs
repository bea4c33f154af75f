//! QR code issuance: build, sign, render and persist against the owning row.
//!
//! Secure codes are generated at most once per owner. A second request
//! returns the stored artifact without signing anything; only the explicit
//! regenerate path replaces it.

use std::sync::Arc;

use eventhub_crypto::{
    QrPayload, SignatureEngine, build_event_payload, build_team_member_payload,
    build_user_payload,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::error::QrError;
use super::image;
use super::record_outcome;
use crate::storage::{EventDatabase, QrArtifact, QrOwner};

/// Which kind of code an artifact carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QrVariant {
    /// Signed JSON payload, verifiable at scan time.
    Secure,
    /// Bare public URL. Carries no signature and grants nothing.
    QuickAccess,
}

/// Result of an issuance call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedQr {
    pub variant: QrVariant,
    pub qr_code: String,
    pub qr_code_data: String,
    /// `false` when a previously stored artifact was returned.
    pub newly_issued: bool,
}

impl IssuedQr {
    fn secure(artifact: QrArtifact, newly_issued: bool) -> Self {
        Self {
            variant: QrVariant::Secure,
            qr_code: artifact.qr_code,
            qr_code_data: artifact.qr_code_data,
            newly_issued,
        }
    }
}

/// Issues QR codes for users, events and hackathon team members.
#[derive(Clone)]
pub struct IssuanceService {
    db: EventDatabase,
    engine: Arc<SignatureEngine>,
    public_base_url: String,
}

impl IssuanceService {
    pub fn new(db: EventDatabase, engine: Arc<SignatureEngine>, public_base_url: &str) -> Self {
        Self {
            db,
            engine,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Issue (or return) the attendee code for a user.
    ///
    /// The payload subject is the user's external identity.
    #[instrument(skip(self), fields(owner = "user"))]
    pub async fn issue_for_user(&self, user_id: &str) -> Result<IssuedQr, QrError> {
        let user = self.db.get_user(user_id).await?;
        if let Some(existing) = user.qr_artifact() {
            record_outcome("issue_user", "existing");
            return Ok(IssuedQr::secure(existing, false));
        }

        let artifact = render(&build_user_payload(&self.engine, &user.external_id)?)?;
        self.persist_once(QrOwner::User, &user.id, artifact, "issue_user")
            .await
    }

    /// Issue (or return) the informational code for an event.
    #[instrument(skip(self), fields(owner = "event"))]
    pub async fn issue_for_event(&self, event_id: &str) -> Result<IssuedQr, QrError> {
        let event = self.db.get_event(event_id).await?;
        if let Some(existing) = event.qr_artifact() {
            record_outcome("issue_event", "existing");
            return Ok(IssuedQr::secure(existing, false));
        }

        let artifact = render(&build_event_payload(
            &self.engine,
            &event.id,
            &event.created_by,
        )?)?;
        self.persist_once(QrOwner::Event, &event.id, artifact, "issue_event")
            .await
    }

    /// Issue the check-in code for a hackathon participant.
    ///
    /// A code already stored on the membership row is always returned as is.
    /// Otherwise a new one is built, and written only when `persist` is set.
    #[instrument(skip(self), fields(owner = "team_member"))]
    pub async fn issue_for_team_member(
        &self,
        user_id: &str,
        team_id: &str,
        hackathon_id: &str,
        persist: bool,
    ) -> Result<IssuedQr, QrError> {
        let team = self.db.get_team(team_id).await?;
        if team.hackathon_id != hackathon_id {
            return Err(QrError::NotFound(format!(
                "Team {team_id} in hackathon {hackathon_id}"
            )));
        }
        let member = self.db.get_team_member_by_user(team_id, user_id).await?;

        if let Some(existing) = member.qr_artifact() {
            record_outcome("issue_team_member", "existing");
            return Ok(IssuedQr::secure(existing, false));
        }

        let payload = build_team_member_payload(&self.engine, user_id, team_id, hackathon_id)?;
        let artifact = render(&payload)?;

        if !persist {
            record_outcome("issue_team_member", "transient");
            return Ok(IssuedQr::secure(artifact, true));
        }
        self.persist_once(
            QrOwner::TeamMember,
            &member.id,
            artifact,
            "issue_team_member",
        )
        .await
    }

    /// Replace a user's code with a freshly signed one.
    #[instrument(skip(self), fields(owner = "user"))]
    pub async fn regenerate_for_user(&self, user_id: &str) -> Result<IssuedQr, QrError> {
        let user = self.db.get_user(user_id).await?;
        let artifact = render(&build_user_payload(&self.engine, &user.external_id)?)?;

        self.db
            .replace_qr(QrOwner::User, &user.id, &artifact)
            .await?;
        info!(user_id = %user.id, "User QR code regenerated");
        record_outcome("regenerate_user", "replaced");
        Ok(IssuedQr::secure(artifact, true))
    }

    /// Replace an event's code with a freshly signed one.
    #[instrument(skip(self), fields(owner = "event"))]
    pub async fn regenerate_for_event(&self, event_id: &str) -> Result<IssuedQr, QrError> {
        let event = self.db.get_event(event_id).await?;
        let artifact = render(&build_event_payload(
            &self.engine,
            &event.id,
            &event.created_by,
        )?)?;

        self.db
            .replace_qr(QrOwner::Event, &event.id, &artifact)
            .await?;
        info!(event_id = %event.id, "Event QR code regenerated");
        record_outcome("regenerate_event", "replaced");
        Ok(IssuedQr::secure(artifact, true))
    }

    /// Unsigned link to the public event page. Never persisted.
    pub async fn quick_access_for_event(&self, event_id: &str) -> Result<IssuedQr, QrError> {
        let event = self.db.get_event(event_id).await?;
        self.quick_access(&format!("{}/events/{}", self.public_base_url, event.id))
    }

    /// Unsigned link to the public hackathon page. Never persisted.
    pub async fn quick_access_for_hackathon(
        &self,
        hackathon_id: &str,
    ) -> Result<IssuedQr, QrError> {
        let hackathon = self.db.get_hackathon(hackathon_id).await?;
        self.quick_access(&format!(
            "{}/hackathons/{}",
            self.public_base_url, hackathon.id
        ))
    }

    fn quick_access(&self, url: &str) -> Result<IssuedQr, QrError> {
        let qr_code = image::encode(url)?;
        record_outcome("quick_access", "issued");
        Ok(IssuedQr {
            variant: QrVariant::QuickAccess,
            qr_code,
            qr_code_data: url.to_string(),
            newly_issued: true,
        })
    }

    /// Store `artifact` unless another request stored one first, in which
    /// case the winner's artifact is returned.
    async fn persist_once(
        &self,
        owner: QrOwner,
        id: &str,
        artifact: QrArtifact,
        operation: &'static str,
    ) -> Result<IssuedQr, QrError> {
        if self.db.set_qr_if_absent(owner, id, &artifact).await? {
            info!(owner = owner.as_str(), id, "QR code issued");
            record_outcome(operation, "issued");
            return Ok(IssuedQr::secure(artifact, true));
        }

        let stored = match owner {
            QrOwner::User => self.db.get_user(id).await?.qr_artifact(),
            QrOwner::Event => self.db.get_event(id).await?.qr_artifact(),
            QrOwner::TeamMember => self.db.get_team_member(id).await?.qr_artifact(),
        };
        stored.map_or_else(
            || {
                warn!(owner = owner.as_str(), id, "QR code vanished after losing issue race");
                Err(QrError::Conflict(format!("{} {id}", owner.as_str())))
            },
            |winner| {
                record_outcome(operation, "existing");
                Ok(IssuedQr::secure(winner, false))
            },
        )
    }
}

impl std::fmt::Debug for IssuanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceService")
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

fn render(payload: &QrPayload) -> Result<QrArtifact, QrError> {
    let qr_code_data = payload
        .to_json()
        .map_err(|e| QrError::Encoding(e.to_string()))?;
    let qr_code = image::encode(&qr_code_data)?;
    Ok(QrArtifact {
        qr_code,
        qr_code_data,
    })
}
