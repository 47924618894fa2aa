//! SMS deep links and their QR rendering.

use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::{FlyerError, Result};

/// Pixels per QR module in the offscreen raster.
pub const MODULE_PIXELS: u32 = 4;
/// Light modules around the symbol.
pub const QUIET_ZONE: u32 = 4;

/// Build the pre-filled text-message link for a phone number and message.
///
/// The phone number is inserted as-is; the message body is escaped with
/// [`encode_uri_component`].
///
/// ```
/// use flyerpress::flyer::qr::sms_link;
///
/// assert_eq!(sms_link("5551234567", "Hi there!"), "sms:5551234567?&body=Hi%20there!");
/// ```
pub fn sms_link(phone: &str, message: &str) -> String {
    format!("sms:{}?&body={}", phone, encode_uri_component(message))
}

/// Percent-encode every byte of the UTF-8 input except the unreserved set
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, like ECMAScript `encodeURIComponent`.
pub fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Render `data` as a QR code (error level M) into a black-on-white raster.
///
/// Each module is [`MODULE_PIXELS`] wide, with a [`QUIET_ZONE`]-module
/// light border.
pub fn render_qr(data: &str) -> Result<GrayImage> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| FlyerError::Qr(e.to_string()))?;

    let modules = code.width() as u32;
    let colors = code.to_colors();
    let side = (modules + 2 * QUIET_ZONE) * MODULE_PIXELS;

    let mut img = GrayImage::from_pixel(side, side, Luma([255]));
    for (i, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let mx = i as u32 % modules + QUIET_ZONE;
        let my = i as u32 / modules + QUIET_ZONE;
        for dy in 0..MODULE_PIXELS {
            for dx in 0..MODULE_PIXELS {
                img.put_pixel(mx * MODULE_PIXELS + dx, my * MODULE_PIXELS + dy, Luma([0]));
            }
        }
    }

    Ok(img)
}
