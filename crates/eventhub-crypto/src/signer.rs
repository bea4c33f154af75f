//! HMAC-SHA256 signature engine for QR payloads.
//!
//! The secret is injected once at construction; the engine is cheap to clone
//! and is shared read-only across request handlers.

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::error::SignerError;
use crate::payload::{PayloadType, QrPayload, QrSubject, WirePayload};

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex encoded HMAC-SHA256 tag.
pub const SIGNATURE_HEX_LEN: usize = 64;

/// The fields covered by the MAC.
///
/// Field order is the canonical (sorted) key order; absent optional fields
/// are omitted so that each payload type has exactly one serialization.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedFields<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hackathon_id: Option<&'a str>,
    pub id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<&'a str>,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: PayloadType,
    pub user_id: &'a str,
}

impl<'a> SignedFields<'a> {
    /// Signed view of a payload as received on the wire.
    pub fn of(wire: &'a WirePayload) -> Self {
        Self {
            event_id: wire.event_id.as_deref(),
            hackathon_id: wire.hackathon_id.as_deref(),
            id: &wire.id,
            team_id: wire.team_id.as_deref(),
            timestamp: wire.timestamp,
            kind: wire.kind,
            user_id: &wire.user_id,
        }
    }

    /// Signed view of a typed subject.
    pub fn from_parts(id: &'a str, timestamp: i64, subject: &'a QrSubject) -> Self {
        let mut fields = Self {
            event_id: None,
            hackathon_id: None,
            id,
            team_id: None,
            timestamp,
            kind: subject.kind(),
            user_id: subject.subject_id(),
        };
        match subject {
            QrSubject::User { .. } => {}
            QrSubject::Event { event_id, .. } => fields.event_id = Some(event_id.as_str()),
            QrSubject::TeamMember {
                team_id,
                hackathon_id,
                ..
            } => {
                fields.team_id = Some(team_id.as_str());
                fields.hackathon_id = Some(hackathon_id.as_str());
            }
        }
        fields
    }

    /// Canonical byte string fed to the MAC.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, SignerError> {
        serde_json::to_vec(self).map_err(|e| SignerError::Canonicalization(e.to_string()))
    }
}

/// Computes and checks payload signatures with a fixed server secret.
#[derive(Clone)]
pub struct SignatureEngine {
    mac: HmacSha256,
}

impl std::fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEngine")
            .field("algorithm", &"HMAC-SHA256")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl SignatureEngine {
    /// Create an engine keyed by `secret`. An empty secret is rejected.
    pub fn new(secret: &[u8]) -> Result<Self, SignerError> {
        if secret.is_empty() {
            return Err(SignerError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| SignerError::EmptySecret)?;
        Ok(Self { mac })
    }

    /// Sign the given fields, returning a lowercase hex tag.
    pub fn sign(&self, fields: &SignedFields<'_>) -> Result<String, SignerError> {
        let canonical = fields.canonical_bytes()?;
        let mut mac = self.mac.clone();
        mac.update(&canonical);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a received payload's signature.
    ///
    /// Returns `false` for any mismatch or malformed signature; the
    /// comparison itself is constant time.
    pub fn verify(&self, payload: &WirePayload) -> bool {
        let sig = payload.signature.as_bytes();
        if sig.len() != SIGNATURE_HEX_LEN || !sig.iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return false;
        }
        let Ok(expected) = hex::decode(sig) else {
            return false;
        };
        let Ok(canonical) = SignedFields::of(payload).canonical_bytes() else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(&canonical);
        mac.verify_slice(&expected).is_ok()
    }

    /// Parse a scanned string and return the typed payload only if it is
    /// well formed and correctly signed.
    pub fn verify_str(&self, raw: &str) -> Option<QrPayload> {
        let wire: WirePayload = serde_json::from_str(raw.trim()).ok()?;
        if !self.verify(&wire) {
            return None;
        }
        QrPayload::try_from(wire).ok()
    }
}
