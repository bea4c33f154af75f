//! QR issuance, scan verification and attendance marking.

pub mod error;
pub mod hackathon;
pub mod image;
pub mod issuance;
pub mod scan;


pub use error::{INVALID_CODE_MESSAGE, QrError};
pub use hackathon::{HackathonAttendanceService, HackathonCheckIn};
pub use issuance::{IssuanceService, IssuedQr, QrVariant};
pub use scan::{CheckIn, ScanContext, ScanResult, ScanService, ScannedUser};

use eventhub_crypto::{QrPayload, SignatureEngine};
use tracing::debug;

use crate::auth::Role;

fn require_elevated(role: Role, operation: &'static str) -> Result<(), QrError> {
    if role.is_elevated() {
        return Ok(());
    }
    record_outcome(operation, "forbidden");
    Err(QrError::Forbidden("admin or master role required"))
}

fn verify_code(
    engine: &SignatureEngine,
    raw: &str,
    operation: &'static str,
) -> Result<QrPayload, QrError> {
    engine.verify_str(raw).ok_or_else(|| {
        debug!(operation, len = raw.len(), "Rejected QR code");
        record_outcome(operation, "invalid");
        QrError::InvalidCode
    })
}

#[cfg(feature = "metrics")]
fn record_outcome(operation: &'static str, outcome: &'static str) {
    eventhub_core::metrics::record_qr_event(operation, outcome);
}

#[cfg(not(feature = "metrics"))]
const fn record_outcome(_operation: &'static str, _outcome: &'static str) {}
