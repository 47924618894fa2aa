//! # Flyer Compositor
//!
//! Renders one [`Record`] into one RGBA raster the size of the template.
//!
//! ## Layers (in order)
//!
//! | Step | Layer | Source |
//! |------|-------|--------|
//! | 1-2 | Background | template image, defines output size |
//! | 3 | Phone number | record `phone`, [`FlyerLayout::phone`] |
//! | 4-5 | QR code | `sms:` link of `phone` + `message`, [`FlyerLayout::qr`] |
//! | 6 | Header logo | record `logo` via [`AssetResolver`] |
//! | 7 | Footer logo | same asset |
//!
//! Every asset load goes through the resolver, which bounds it with the
//! load timeout and reports failures as `AssetUnavailable`. The same record
//! and registry snapshot always produce the same pixels.

pub mod layout;
pub mod qr;
pub mod text;

pub use layout::{FlyerLayout, Rect, TextStyle};
pub use text::FlyerFont;

use image::{DynamicImage, RgbaImage, imageops, imageops::FilterType};
use std::path::{Path, PathBuf};

use crate::assets::AssetResolver;
use crate::error::Result;
use crate::record::Record;

/// Composes flyers from a template, a layout and a font.
#[derive(Debug, Clone)]
pub struct FlyerCompositor {
    template: PathBuf,
    layout: FlyerLayout,
    font: FlyerFont,
}

impl FlyerCompositor {
    pub fn new(template: impl Into<PathBuf>, layout: FlyerLayout, font: FlyerFont) -> Self {
        Self {
            template: template.into(),
            layout,
            font,
        }
    }

    pub fn template(&self) -> &Path {
        &self.template
    }

    pub fn layout(&self) -> &FlyerLayout {
        &self.layout
    }

    /// Render one record.
    pub async fn compose(&self, record: &Record, resolver: &AssetResolver) -> Result<RgbaImage> {
        let template = resolver.load_path(&self.template).await?;
        let mut canvas = template.to_rgba8();

        let phone = &self.layout.phone;
        self.font.draw_text(
            &mut canvas,
            record.phone(),
            phone.x,
            phone.baseline,
            phone.size,
            phone.color,
        );

        let link = qr::sms_link(record.phone(), record.message());
        let code = qr::render_qr(&link)?;
        draw_into(
            &mut canvas,
            &DynamicImage::ImageLuma8(code),
            self.layout.qr,
            FilterType::Nearest,
        );

        let logo = resolver.load_logo(record.logo()).await?;
        draw_into(&mut canvas, &logo, self.layout.header_logo, FilterType::Triangle);
        draw_into(&mut canvas, &logo, self.layout.footer_logo, FilterType::Triangle);

        Ok(canvas)
    }
}

/// Stretch `img` to `rect` and alpha-blend it onto the canvas.
fn draw_into(canvas: &mut RgbaImage, img: &DynamicImage, rect: Rect, filter: FilterType) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let scaled = img.resize_exact(rect.width, rect.height, filter).to_rgba8();
    imageops::overlay(canvas, &scaled, rect.x, rect.y);
}
