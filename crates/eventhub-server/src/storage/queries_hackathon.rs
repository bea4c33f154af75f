//! Hackathon, team and attendance queries.

use eventhub_core::db::{DatabaseError, unix_timestamp_millis};

use super::db::EventDatabase;
use super::models::{AttendanceRecord, AttendanceSchedule, Hackathon, Team, TeamMember};

/// One entry of a manual or bulk attendance update.
#[derive(Debug, Clone)]
pub struct AttendanceMark {
    pub team_member_id: String,
    pub is_present: bool,
}

const UPSERT_ATTENDANCE: &str = "INSERT INTO hackathon_attendance (id, attendance_schedule_id, team_member_id, is_present, checked_in_at, checked_in_by) \
     VALUES (?, ?, ?, ?, ?, ?) \
     ON CONFLICT (attendance_schedule_id, team_member_id) DO UPDATE SET \
     is_present = excluded.is_present, checked_in_at = excluded.checked_in_at, checked_in_by = excluded.checked_in_by";

impl EventDatabase {
    // =========================================================================
    // Hackathon and team queries
    // =========================================================================

    /// Create a hackathon.
    pub async fn create_hackathon(
        &self,
        id: &str,
        title: &str,
        starts_at: i64,
        created_by: &str,
    ) -> Result<Hackathon, DatabaseError> {
        let now = unix_timestamp_millis();

        sqlx::query(
            "INSERT INTO hackathons (id, title, starts_at, created_by, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(title)
        .bind(starts_at)
        .bind(created_by)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_hackathon(id).await
    }

    /// Get a hackathon by ID.
    pub async fn get_hackathon(&self, id: &str) -> Result<Hackathon, DatabaseError> {
        sqlx::query_as::<_, Hackathon>("SELECT * FROM hackathons WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Hackathon {id}")))
    }

    /// Create a team within a hackathon.
    pub async fn create_team(
        &self,
        id: &str,
        hackathon_id: &str,
        name: &str,
    ) -> Result<Team, DatabaseError> {
        let now = unix_timestamp_millis();

        sqlx::query("INSERT INTO teams (id, hackathon_id, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(hackathon_id)
            .bind(name)
            .bind(now)
            .execute(self.pool())
            .await?;

        self.get_team(id).await
    }

    /// Get a team by ID.
    pub async fn get_team(&self, id: &str) -> Result<Team, DatabaseError> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Team {id}")))
    }

    /// Add a user to a team.
    pub async fn add_team_member(
        &self,
        id: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<TeamMember, DatabaseError> {
        let now = unix_timestamp_millis();

        sqlx::query("INSERT INTO team_members (id, team_id, user_id, joined_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(team_id)
            .bind(user_id)
            .bind(now)
            .execute(self.pool())
            .await?;

        self.get_team_member(id).await
    }

    /// Get a team membership by ID.
    pub async fn get_team_member(&self, id: &str) -> Result<TeamMember, DatabaseError> {
        sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Team member {id}")))
    }

    /// Get the membership of `user_id` in `team_id`.
    pub async fn get_team_member_by_user(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<TeamMember, DatabaseError> {
        sqlx::query_as::<_, TeamMember>(
            "SELECT * FROM team_members WHERE team_id = ? AND user_id = ?",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User {user_id} in team {team_id}")))
    }

    // =========================================================================
    // Attendance schedule queries
    // =========================================================================

    /// Create a check-in slot for a hackathon.
    pub async fn create_schedule(
        &self,
        id: &str,
        hackathon_id: &str,
        label: &str,
        scheduled_at: i64,
    ) -> Result<AttendanceSchedule, DatabaseError> {
        sqlx::query(
            "INSERT INTO attendance_schedules (id, hackathon_id, label, scheduled_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(hackathon_id)
        .bind(label)
        .bind(scheduled_at)
        .execute(self.pool())
        .await?;

        self.get_schedule(id).await
    }

    /// Get a check-in slot by ID.
    pub async fn get_schedule(&self, id: &str) -> Result<AttendanceSchedule, DatabaseError> {
        sqlx::query_as::<_, AttendanceSchedule>("SELECT * FROM attendance_schedules WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Attendance schedule {id}")))
    }

    // =========================================================================
    // Attendance record queries
    // =========================================================================

    /// Record a scan check-in for a member at a slot.
    ///
    /// Inserts the record, or flips an existing absent record to present.
    /// For a record that is already present `false` is returned, and only
    /// an earlier check-in time replaces the stored one.
    pub async fn check_in_team_member(
        &self,
        schedule_id: &str,
        team_member_id: &str,
        checked_in_at: i64,
        checked_in_by: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO hackathon_attendance (id, attendance_schedule_id, team_member_id, is_present, checked_in_at, checked_in_by) \
             VALUES (?, ?, ?, 1, ?, ?) \
             ON CONFLICT (attendance_schedule_id, team_member_id) DO UPDATE SET \
             is_present = 1, checked_in_at = excluded.checked_in_at, checked_in_by = excluded.checked_in_by \
             WHERE hackathon_attendance.is_present = 0",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(schedule_id)
        .bind(team_member_id)
        .bind(checked_in_at)
        .bind(checked_in_by)
        .execute(self.pool())
        .await?;
        let flipped = result.rows_affected() > 0;

        if !flipped {
            sqlx::query(
                "UPDATE hackathon_attendance SET checked_in_at = ?, checked_in_by = ? \
                 WHERE attendance_schedule_id = ? AND team_member_id = ? AND is_present = 1 \
                 AND (checked_in_at IS NULL OR checked_in_at > ?)",
            )
            .bind(checked_in_at)
            .bind(checked_in_by)
            .bind(schedule_id)
            .bind(team_member_id)
            .bind(checked_in_at)
            .execute(self.pool())
            .await?;
        }

        Ok(flipped)
    }

    /// Set a member's presence at a slot, overwriting any previous mark.
    pub async fn upsert_attendance(
        &self,
        schedule_id: &str,
        mark: &AttendanceMark,
        marked_at: i64,
        marked_by: &str,
    ) -> Result<AttendanceRecord, DatabaseError> {
        sqlx::query(UPSERT_ATTENDANCE)
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(schedule_id)
            .bind(&mark.team_member_id)
            .bind(mark.is_present)
            .bind(mark.is_present.then_some(marked_at))
            .bind(marked_by)
            .execute(self.pool())
            .await?;

        self.get_attendance(schedule_id, &mark.team_member_id)
            .await?
            .ok_or_else(|| {
                DatabaseError::NotFound(format!(
                    "Attendance for {} at {schedule_id}",
                    mark.team_member_id
                ))
            })
    }

    /// Apply several marks for one slot atomically.
    pub async fn upsert_attendance_bulk(
        &self,
        schedule_id: &str,
        marks: &[AttendanceMark],
        marked_at: i64,
        marked_by: &str,
    ) -> Result<u64, DatabaseError> {
        let mut tx = self.pool().begin().await?;
        let mut written = 0;

        for mark in marks {
            let result = sqlx::query(UPSERT_ATTENDANCE)
                .bind(uuid::Uuid::new_v4().to_string())
                .bind(schedule_id)
                .bind(&mark.team_member_id)
                .bind(mark.is_present)
                .bind(mark.is_present.then_some(marked_at))
                .bind(marked_by)
                .execute(&mut *tx)
                .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Get the record for a member at a slot, if any.
    pub async fn get_attendance(
        &self,
        schedule_id: &str,
        team_member_id: &str,
    ) -> Result<Option<AttendanceRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT * FROM hackathon_attendance WHERE attendance_schedule_id = ? AND team_member_id = ?",
        )
        .bind(schedule_id)
        .bind(team_member_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(record)
    }

    /// List all records for a slot.
    pub async fn list_attendance(
        &self,
        schedule_id: &str,
    ) -> Result<Vec<AttendanceRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT * FROM hackathon_attendance WHERE attendance_schedule_id = ? ORDER BY team_member_id",
        )
        .bind(schedule_id)
        .fetch_all(self.pool())
        .await?;

        Ok(records)
    }
}
