//! Fixed placement of the flyer layers on the template.
//!
//! Defaults reproduce the positions the flyers were designed around
//! (a 30px phone line above a 250px QR code, logo in header and footer).

use serde::{Deserialize, Serialize};

/// A destination rectangle in template pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Where and how the phone number is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    /// Left edge of the first glyph.
    pub x: i64,
    /// Alphabetic baseline.
    pub baseline: i64,
    /// Pixel height of the font.
    pub size: f32,
    /// RGB fill colour.
    pub color: [u8; 3],
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            x: 300,
            baseline: 398,
            size: 30.0,
            color: [255, 255, 255],
        }
    }
}

/// Placement of every layer drawn over the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyerLayout {
    pub phone: TextStyle,
    pub qr: Rect,
    pub header_logo: Rect,
    pub footer_logo: Rect,
}

impl Default for FlyerLayout {
    fn default() -> Self {
        Self {
            phone: TextStyle::default(),
            qr: Rect::new(280, 460, 250, 250),
            header_logo: Rect::new(60, 350, 125, 48),
            footer_logo: Rect::new(460, 730, 125, 48),
        }
    }
}
