//! Hackathon attendance: team-member QR check-in and manual marking.

use std::sync::Arc;

use eventhub_core::db::unix_timestamp_millis;
use eventhub_crypto::{QrSubject, SignatureEngine};
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::error::QrError;
use super::scan::ScanContext;
use super::{record_outcome, require_elevated, verify_code};
use crate::auth::Role;
use crate::storage::{AttendanceMark, AttendanceRecord, AttendanceSchedule, EventDatabase};

/// Result of a team-member check-in scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HackathonCheckIn {
    pub record: AttendanceRecord,
    pub user_id: String,
    pub team_id: String,
    /// `true` only for the scan that marked the member present.
    pub checked_in_now: bool,
    pub scanned_at: i64,
}

#[derive(Clone)]
pub struct HackathonAttendanceService {
    db: EventDatabase,
    engine: Arc<SignatureEngine>,
}

impl HackathonAttendanceService {
    pub const fn new(db: EventDatabase, engine: Arc<SignatureEngine>) -> Self {
        Self { db, engine }
    }

    /// Check a participant in to a schedule slot from their team-member code.
    ///
    /// The first successful scan wins; later scans report the existing
    /// record unchanged.
    #[instrument(skip(self, raw), fields(actor = %ctx.actor_id))]
    pub async fn check_in(
        &self,
        raw: &str,
        schedule_id: &str,
        ctx: &ScanContext,
    ) -> Result<HackathonCheckIn, QrError> {
        require_elevated(ctx.role, "hackathon_check_in")?;
        let payload = verify_code(&self.engine, raw, "hackathon_check_in")?;
        let kind = payload.subject.kind();

        let QrSubject::TeamMember {
            user_id,
            team_id,
            hackathon_id,
        } = payload.subject
        else {
            record_outcome("hackathon_check_in", "wrong_checkpoint");
            return Err(QrError::WrongCheckpoint(kind.as_str()));
        };

        let schedule = self.db.get_schedule(schedule_id).await?;
        let team = self.db.get_team(&team_id).await?;
        if schedule.hackathon_id != hackathon_id || team.hackathon_id != hackathon_id {
            record_outcome("hackathon_check_in", "mismatch");
            return Err(QrError::HackathonMismatch);
        }
        let member = self.db.get_team_member_by_user(&team.id, &user_id).await?;

        let scanned_at = unix_timestamp_millis();
        let checked_in_now = self
            .db
            .check_in_team_member(&schedule.id, &member.id, scanned_at, &ctx.actor_id)
            .await?;
        let record = self
            .db
            .get_attendance(&schedule.id, &member.id)
            .await?
            .ok_or_else(|| QrError::NotFound(format!("Attendance for {}", member.id)))?;

        if checked_in_now {
            info!(team_member_id = %member.id, schedule_id = %schedule.id, "Team member checked in");
            record_outcome("hackathon_check_in", "checked_in");
        } else {
            debug!(team_member_id = %member.id, schedule_id = %schedule.id, "Team member already checked in");
            record_outcome("hackathon_check_in", "already_checked_in");
        }

        Ok(HackathonCheckIn {
            record,
            user_id,
            team_id,
            checked_in_now,
            scanned_at,
        })
    }

    /// Set one member's presence, overwriting any earlier mark.
    #[instrument(skip(self))]
    pub async fn mark_manual(
        &self,
        schedule_id: &str,
        mark: &AttendanceMark,
        actor_id: &str,
        role: Role,
    ) -> Result<AttendanceRecord, QrError> {
        require_elevated(role, "mark_manual")?;
        let schedule = self.db.get_schedule(schedule_id).await?;
        self.ensure_member_of(&schedule, &mark.team_member_id).await?;

        let record = self
            .db
            .upsert_attendance(&schedule.id, mark, unix_timestamp_millis(), actor_id)
            .await?;
        info!(
            team_member_id = %mark.team_member_id,
            is_present = mark.is_present,
            "Attendance marked"
        );
        record_outcome("mark_manual", "marked");
        Ok(record)
    }

    /// Apply a batch of marks for one slot in a single transaction.
    ///
    /// Every entry is validated before anything is written.
    #[instrument(skip(self, marks), fields(count = marks.len()))]
    pub async fn mark_bulk(
        &self,
        schedule_id: &str,
        marks: &[AttendanceMark],
        actor_id: &str,
        role: Role,
    ) -> Result<u64, QrError> {
        require_elevated(role, "mark_bulk")?;
        let schedule = self.db.get_schedule(schedule_id).await?;
        for mark in marks {
            self.ensure_member_of(&schedule, &mark.team_member_id).await?;
        }

        let written = self
            .db
            .upsert_attendance_bulk(&schedule.id, marks, unix_timestamp_millis(), actor_id)
            .await?;
        info!(schedule_id = %schedule.id, written, "Bulk attendance marked");
        record_outcome("mark_bulk", "marked");
        Ok(written)
    }

    /// Attendance records for a slot.
    pub async fn list_for_schedule(
        &self,
        schedule_id: &str,
    ) -> Result<Vec<AttendanceRecord>, QrError> {
        let schedule = self.db.get_schedule(schedule_id).await?;
        Ok(self.db.list_attendance(&schedule.id).await?)
    }

    async fn ensure_member_of(
        &self,
        schedule: &AttendanceSchedule,
        team_member_id: &str,
    ) -> Result<(), QrError> {
        let member = self.db.get_team_member(team_member_id).await?;
        let team = self.db.get_team(&member.team_id).await?;
        if team.hackathon_id != schedule.hackathon_id {
            return Err(QrError::HackathonMismatch);
        }
        Ok(())
    }
}

impl std::fmt::Debug for HackathonAttendanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HackathonAttendanceService")
            .finish_non_exhaustive()
    }
}
