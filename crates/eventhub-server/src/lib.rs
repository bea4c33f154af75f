//! `EventHub` server library.
//!
//! QR identity codes for attendees, events and hackathon participants,
//! scan-time verification, and idempotent attendance marking.

pub mod auth;
pub mod http;
pub mod qr;
pub mod storage;
