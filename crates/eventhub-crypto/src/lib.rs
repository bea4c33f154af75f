//! `EventHub` QR Signing Library
//!
//! Produces and checks the tamper-evident payloads embedded in attendee,
//! event and team-member QR codes.
//!
//! ## Primitives
//!
//! - **MAC**: HMAC-SHA256 keyed by a server-side secret, hex encoded
//! - **Canonical form**: compact JSON of the non-signature fields with keys
//!   in sorted order and absent optional fields omitted
//! - **Payload**: a sum type over the three subject kinds, carried on the
//!   wire as a flat camelCase JSON object
//!
//! ## Migrating existing codes
//!
//! Codes signed over the fields in declaration order (for a user code
//! `{"id","type","userId","timestamp"}`) do not verify under the sorted
//! canonical form. Deployments carrying such codes must clear the stored
//! artifacts and re-issue them (or regenerate per owner) after switching.

pub mod error;
pub mod payload;
pub mod signer;

pub use error::{PayloadError, SignerError};
pub use payload::{
    PayloadType, QrPayload, QrSubject, WirePayload, build_event_payload,
    build_team_member_payload, build_user_payload,
};
pub use signer::{SignatureEngine, SignedFields};
