//! # Document Exporter
//!
//! Turns a rendered flyer into a single-page PDF and hands it to a
//! [`DocumentSink`].
//!
//! The page is exactly the raster size (1 pixel = 1 pt) and holds a single
//! Flate-compressed RGB image drawn at full size from the origin. Non-opaque
//! rasters get a grayscale soft mask so transparency survives.
//!
//! ## Sinks
//!
//! | Sink | Used by |
//! |------|---------|
//! | [`DirectorySink`] | CLI `generate`, one file per record |
//! | [`ZipSink`] | HTTP "save all", one archive per batch |
//! | [`MemorySink`] | tests and single-document responses |

use flate2::{Compression, write::ZlibEncoder};
use image::{ImageFormat, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::{FileOptions, ZipWriter};

use crate::error::{FlyerError, Result};
use crate::record::Record;

/// Encode a flyer as a one-page PDF sized to the raster.
pub fn encode_pdf(flyer: &RgbaImage) -> Result<Vec<u8>> {
    let (width, height) = flyer.dimensions();
    if width == 0 || height == 0 {
        return Err(FlyerError::Pdf("cannot export an empty raster".to_string()));
    }

    let pixel_count = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut opaque = true;
    for px in flyer.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
        opaque &= px.0[3] == 255;
    }

    let w = Object::Integer(width as i64);
    let h = Object::Integer(height as i64);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => w.clone(),
        "Height" => h.clone(),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if !opaque {
        let smask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w.clone(),
                "Height" => h.clone(),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            deflate(&alpha)?,
        ));
        image_dict.set("SMask", smask_id);
    }
    let image_id = doc.add_object(Stream::new(image_dict, deflate(&rgb)?));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![w.clone(), 0.into(), 0.into(), h.clone(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let media_box: Vec<Object> = vec![0.into(), 0.into(), w, h];
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

/// Encode a flyer as PNG (previews).
pub fn encode_png(flyer: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    flyer.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Export filename for the record at `position` (1-indexed).
///
/// `<customer>.pdf`, or `Flyer_<position>.pdf` when the record has no
/// customer name. Path separators and control characters become `_`.
pub fn flyer_filename(record: &Record, position: usize) -> String {
    match record.customer() {
        Some(customer) => format!("{}.pdf", sanitize_stem(customer)),
        None => format!("Flyer_{}.pdf", position),
    }
}

fn sanitize_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Hands out filenames, de-duplicating repeats as `name (2).pdf`, `name (3).pdf`, ...
#[derive(Debug, Default)]
pub struct UniqueNames {
    seen: HashMap<String, usize>,
}

impl UniqueNames {
    pub fn claim(&mut self, filename: &str) -> String {
        let count = self.seen.entry(filename.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            return filename.to_string();
        }
        let (stem, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) => (stem, format!(".{}", ext)),
            None => (filename, String::new()),
        };
        let candidate = format!("{} ({}){}", stem, count, ext);
        // A literal "name (2).pdf" from an earlier record also counts as taken.
        if self.seen.contains_key(&candidate) {
            return self.claim(&candidate);
        }
        self.seen.insert(candidate.clone(), 1);
        candidate
    }
}

/// Destination for exported documents.
pub trait DocumentSink: Send {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<()>;
}

/// Writes each document into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create the sink, creating the directory if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DocumentSink for DirectorySink {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<()> {
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)
            .map_err(|e| FlyerError::Sink(format!("Failed to write {}: {}", path.display(), e)))?;
        tracing::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

/// Collects documents into an in-memory zip archive.
pub struct ZipSink {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl Default for ZipSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipSink {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Finish the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        let cursor = self.zip.finish()?;
        Ok(cursor.into_inner())
    }
}

impl DocumentSink for ZipSink {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<()> {
        self.zip.start_file::<_, ()>(filename, FileOptions::default())?;
        self.zip.write_all(bytes)?;
        Ok(())
    }
}

/// Keeps documents in memory, in delivery order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub documents: Vec<(String, Vec<u8>)>,
}

impl DocumentSink for MemorySink {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<()> {
        self.documents.push((filename.to_string(), bytes.to_vec()));
        Ok(())
    }
}
