//! # Error Types
//!
//! This module defines error types used throughout the flyerpress library.

use thiserror::Error;

/// Main error type for flyerpress operations
#[derive(Debug, Error)]
pub enum FlyerError {
    /// CSV reader errors (header row unreadable, I/O while reading)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An image asset (template or logo) could not be read, decoded,
    /// or did not arrive within the load timeout.
    #[error("Asset unavailable: {asset} ({reason})")]
    AssetUnavailable { asset: String, reason: String },

    /// QR code encoding error
    #[error("QR code error: {0}")]
    Qr(String),

    /// Image processing error
    #[error("Image error: {0}")]
    Image(String),

    /// PDF assembly error
    #[error("PDF error: {0}")]
    Pdf(String),

    /// A document sink refused or failed to store an export
    #[error("Export sink error: {0}")]
    Sink(String),

    /// Invalid or unreadable configuration
    #[error("Config error: {0}")]
    Config(String),

    /// No record at the requested position
    #[error("Not found: {0}")]
    NotFound(String),

    /// Action not valid for the current session state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlyerError {
    pub(crate) fn asset(asset: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        FlyerError::AssetUnavailable {
            asset: asset.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn no_record(position: usize, loaded: usize) -> Self {
        FlyerError::NotFound(format!(
            "no record at position {} ({} loaded)",
            position, loaded
        ))
    }

    /// True when the error is a missing/undecodable/timed-out asset.
    pub fn is_asset_unavailable(&self) -> bool {
        matches!(self, FlyerError::AssetUnavailable { .. })
    }
}

impl From<lopdf::Error> for FlyerError {
    fn from(e: lopdf::Error) -> Self {
        FlyerError::Pdf(e.to_string())
    }
}

impl From<zip::result::ZipError> for FlyerError {
    fn from(e: zip::result::ZipError) -> Self {
        FlyerError::Sink(format!("zip: {}", e))
    }
}

impl From<image::ImageError> for FlyerError {
    fn from(e: image::ImageError) -> Self {
        FlyerError::Image(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FlyerError>;
