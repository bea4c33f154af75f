//! Renders text into a base64 encoded PNG QR code.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use super::error::QrError;

/// Pixels per module.
pub const MODULE_PX: u32 = 8;

/// Encode `text` as a black-on-white PNG QR code, returned base64 encoded.
///
/// Error correction is level M with the standard 4-module quiet zone.
/// Input too long for any QR version is an [`QrError::Encoding`].
pub fn encode(text: &str) -> Result<String, QrError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M)
        .map_err(|e| QrError::Encoding(e.to_string()))?;

    let image = code
        .render::<Luma<u8>>()
        .dark_color(Luma([0]))
        .light_color(Luma([255]))
        .quiet_zone(true)
        .module_dimensions(MODULE_PX, MODULE_PX)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| QrError::Encoding(e.to_string()))?;

    if png.is_empty() {
        return Err(QrError::Encoding("encoder produced no image".into()));
    }

    Ok(STANDARD.encode(png))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn encodes_short_url_as_png() {
        let b64 = encode("https://events.example.edu/events/e1").unwrap();
        let png = STANDARD.decode(b64).unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);
    }

    #[test]
    fn encodes_large_json_payload() {
        let json = format!(
            r#"{{"id":"{}","type":"teamMember","userId":"{}","teamId":"{}","hackathonId":"{}","timestamp":1700000000000,"signature":"{}"}}"#,
            "a".repeat(36),
            "b".repeat(120),
            "c".repeat(120),
            "d".repeat(120),
            "e".repeat(64),
        );
        assert!(json.len() >= 500);

        let png = STANDARD.decode(encode(&json).unwrap()).unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width() % MODULE_PX, 0);
    }

    #[test]
    fn oversized_input_is_an_encoding_error() {
        let too_long = "x".repeat(8_000);
        assert!(matches!(encode(&too_long), Err(QrError::Encoding(_))));
    }
}
