//! User, event, registration and QR artifact queries.

use eventhub_core::db::unix_timestamp_millis;

use super::db::EventDatabase;
use super::models::{Event, EventRegistration, QrArtifact, QrOwner, User};
use eventhub_core::db::DatabaseError;

/// Parameters for creating a user.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub external_id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub role: &'a str,
}

/// Parameters for creating an event.
pub struct NewEvent<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub venue: Option<&'a str>,
    pub starts_at: i64,
    pub created_by: &'a str,
}

impl EventDatabase {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a new user.
    pub async fn create_user(&self, params: &NewUser<'_>) -> Result<User, DatabaseError> {
        let now = unix_timestamp_millis();

        sqlx::query(
            "INSERT INTO users (id, external_id, name, email, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.id)
        .bind(params.external_id)
        .bind(params.name)
        .bind(params.email)
        .bind(params.role)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(params.id).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Get a user by external identity (the subject of attendee QR codes).
    pub async fn get_user_by_external_id(&self, external_id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with external id {external_id}")))
    }

    // =========================================================================
    // Event queries
    // =========================================================================

    /// Create a new event.
    pub async fn create_event(&self, params: &NewEvent<'_>) -> Result<Event, DatabaseError> {
        let now = unix_timestamp_millis();

        sqlx::query(
            "INSERT INTO events (id, title, description, venue, starts_at, created_by, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.id)
        .bind(params.title)
        .bind(params.description)
        .bind(params.venue)
        .bind(params.starts_at)
        .bind(params.created_by)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_event(params.id).await
    }

    /// Get an event by ID.
    pub async fn get_event(&self, id: &str) -> Result<Event, DatabaseError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Event {id}")))
    }

    // =========================================================================
    // Registration queries
    // =========================================================================

    /// Register a user for an event. A second registration is a `Conflict`.
    pub async fn register_for_event(
        &self,
        id: &str,
        user_id: &str,
        event_id: &str,
    ) -> Result<EventRegistration, DatabaseError> {
        let now = unix_timestamp_millis();

        sqlx::query(
            "INSERT INTO event_registrations (id, user_id, event_id, registered_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(event_id)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_registration(user_id, event_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Registration {id}")))
    }

    /// Get a user's registration for an event.
    pub async fn get_registration(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<Option<EventRegistration>, DatabaseError> {
        let registration = sqlx::query_as::<_, EventRegistration>(
            "SELECT * FROM event_registrations WHERE user_id = ? AND event_id = ?",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(registration)
    }

    /// Mark a registration attended unless it already is.
    ///
    /// Returns `true` only for the call that flipped the flag. When the
    /// registration is already attended with a later check-in time, the
    /// earlier time and its scanner replace it.
    pub async fn mark_registration_attended(
        &self,
        user_id: &str,
        event_id: &str,
        checked_in_at: i64,
        checked_in_by: &str,
    ) -> Result<bool, DatabaseError> {
        let flipped = sqlx::query(
            "UPDATE event_registrations SET attended = 1, checked_in_at = ?, checked_in_by = ? WHERE user_id = ? AND event_id = ? AND attended = 0",
        )
        .bind(checked_in_at)
        .bind(checked_in_by)
        .bind(user_id)
        .bind(event_id)
        .execute(self.pool())
        .await?
        .rows_affected()
            > 0;

        if !flipped {
            sqlx::query(
                "UPDATE event_registrations SET checked_in_at = ?, checked_in_by = ? WHERE user_id = ? AND event_id = ? AND attended = 1 AND (checked_in_at IS NULL OR checked_in_at > ?)",
            )
            .bind(checked_in_at)
            .bind(checked_in_by)
            .bind(user_id)
            .bind(event_id)
            .bind(checked_in_at)
            .execute(self.pool())
            .await?;
        }

        Ok(flipped)
    }

    // =========================================================================
    // QR artifact queries
    // =========================================================================

    /// Store an artifact on a row that has none yet.
    ///
    /// Returns `false` when the row already carries an artifact (or does not
    /// exist); the caller should re-read and use the stored one.
    pub async fn set_qr_if_absent(
        &self,
        owner: QrOwner,
        id: &str,
        artifact: &QrArtifact,
    ) -> Result<bool, DatabaseError> {
        let sql = format!(
            "UPDATE {} SET qr_code = ?, qr_code_data = ? WHERE id = ? AND (qr_code IS NULL OR qr_code = '')",
            owner.table()
        );
        let result = sqlx::query(&sql)
            .bind(&artifact.qr_code)
            .bind(&artifact.qr_code_data)
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Unconditionally replace a row's artifact.
    pub async fn replace_qr(
        &self,
        owner: QrOwner,
        id: &str,
        artifact: &QrArtifact,
    ) -> Result<(), DatabaseError> {
        let sql = format!(
            "UPDATE {} SET qr_code = ?, qr_code_data = ? WHERE id = ?",
            owner.table()
        );
        let result = sqlx::query(&sql)
            .bind(&artifact.qr_code)
            .bind(&artifact.qr_code_data)
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("{} {id}", owner.as_str())));
        }
        Ok(())
    }
}
