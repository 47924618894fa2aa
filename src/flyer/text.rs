//! Text drawing onto RGBA flyers.
//!
//! The built-in face is Spleen 12x24 (embedded by `spleen-font`), scaled with
//! nearest-neighbour sampling to the requested pixel height. A TTF/OTF file
//! can be loaded instead; it is rasterised anti-aliased through `ab_glyph`.

use ab_glyph::{Font, FontArc, ScaleFont};
use image::{Rgba, RgbaImage};
use spleen_font::{FONT_12X24, PSF2Font};
use std::fmt;
use std::path::Path;

use crate::error::{FlyerError, Result};

const SPLEEN_WIDTH: usize = 12;
const SPLEEN_HEIGHT: usize = 24;
/// Rows above the baseline in Spleen 12x24.
const SPLEEN_ASCENT: usize = 19;

/// Font used for the phone line.
#[derive(Clone, Default)]
pub enum FlyerFont {
    /// Embedded Spleen bitmap font.
    #[default]
    Spleen,
    /// A user-supplied outline font.
    Ttf(FontArc),
}

impl fmt::Debug for FlyerFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlyerFont::Spleen => f.write_str("Spleen"),
            FlyerFont::Ttf(_) => f.write_str("Ttf"),
        }
    }
}

impl FlyerFont {
    /// Load a TTF/OTF font file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| FlyerError::Config(format!("Invalid font {}: {}", path.display(), e)))?;
        Ok(FlyerFont::Ttf(font))
    }

    /// Draw `text` with its baseline at `baseline` and left edge at `x`.
    pub fn draw_text(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: i64,
        baseline: i64,
        pixel_height: f32,
        color: [u8; 3],
    ) {
        match self {
            FlyerFont::Spleen => draw_spleen(canvas, text, x, baseline, pixel_height, color),
            FlyerFont::Ttf(font) => draw_ttf(canvas, font, text, x, baseline, pixel_height, color),
        }
    }
}

/// Blend `color` over the pixel at (x, y) with the given coverage.
fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: [u8; 3], coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage <= 0.0 {
        return;
    }
    let px = canvas.get_pixel_mut(x as u32, y as u32);
    let Rgba([r, g, b, a]) = *px;
    let mix = |dst: u8, src: u8| -> u8 {
        (dst as f32 + (src as f32 - dst as f32) * coverage).round() as u8
    };
    let alpha = (a as f32 + (255.0 - a as f32) * coverage).round() as u8;
    *px = Rgba([mix(r, color[0]), mix(g, color[1]), mix(b, color[2]), alpha]);
}

/// Rasterise one Spleen glyph into a 12x24 on/off mask.
fn spleen_mask(font: &mut PSF2Font, ch: char) -> Option<Vec<bool>> {
    let utf8 = ch.to_string();
    let glyph = font.glyph_for_utf8(utf8.as_bytes())?;
    let mut mask = vec![false; SPLEEN_WIDTH * SPLEEN_HEIGHT];
    for (row_y, row) in glyph.enumerate() {
        for (col_x, on) in row.enumerate() {
            let idx = row_y * SPLEEN_WIDTH + col_x;
            if idx < mask.len() {
                mask[idx] = on;
            }
        }
    }
    Some(mask)
}

fn draw_spleen(
    canvas: &mut RgbaImage,
    text: &str,
    x: i64,
    baseline: i64,
    pixel_height: f32,
    color: [u8; 3],
) {
    let Ok(mut font) = PSF2Font::new(FONT_12X24) else {
        return;
    };

    let scale = (pixel_height / SPLEEN_HEIGHT as f32).max(0.01);
    let cell_w = (SPLEEN_WIDTH as f32 * scale).round().max(1.0) as i64;
    let cell_h = (SPLEEN_HEIGHT as f32 * scale).round().max(1.0) as i64;
    let top = baseline - (SPLEEN_ASCENT as f32 * scale).round() as i64;

    let mut caret = x;
    for ch in text.chars() {
        if let Some(mask) = spleen_mask(&mut font, ch) {
            for dy in 0..cell_h {
                let sy = ((dy as f32 / scale) as usize).min(SPLEEN_HEIGHT - 1);
                for dx in 0..cell_w {
                    let sx = ((dx as f32 / scale) as usize).min(SPLEEN_WIDTH - 1);
                    if mask[sy * SPLEEN_WIDTH + sx] {
                        blend_pixel(canvas, caret + dx, top + dy, color, 1.0);
                    }
                }
            }
        }
        caret += cell_w;
    }
}

fn draw_ttf(
    canvas: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    x: i64,
    baseline: i64,
    pixel_height: f32,
    color: [u8; 3],
) {
    let scaled = font.as_scaled(pixel_height);

    let mut caret_x = 0.0f32;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        let glyph = glyph_id.with_scale_and_position(
            pixel_height,
            ab_glyph::point(x as f32 + caret_x, baseline as f32),
        );
        caret_x += scaled.h_advance(glyph_id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let gx = px as i64 + bounds.min.x as i64;
                let gy = py as i64 + bounds.min.y as i64;
                blend_pixel(canvas, gx, gy, color, coverage);
            });
        }
    }
}
