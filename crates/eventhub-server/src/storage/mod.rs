//! SQLite storage for the `EventHub` server.
//!
//! Provides persistence for users, events, registrations, hackathons, teams,
//! attendance schedules and attendance records. Every "mark" operation is a
//! single conditional statement so that concurrent writers are serialized
//! by the store.

mod db;
mod models;
mod queries;
mod queries_hackathon;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;

pub use db::EventDatabase;
pub use eventhub_core::db::DatabaseError;
pub use models::*;
pub use queries::{NewEvent, NewUser};
pub use queries_hackathon::AttendanceMark;
