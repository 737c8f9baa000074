//! Output format selection
//!
//! Parsing requested formats and mapping them to extensions and MIME types.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Encodings the service can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG (no transparency)
    Jpeg,
    /// PNG with alpha channel transparency (lossless)
    Png,
    /// Lossy WebP with alpha channel transparency
    WebP,
    /// AVIF with alpha channel transparency
    Avif,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(OutputFormatHandler::get_extension(*self))
    }
}

/// Service for format related lookups
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Parse a requested format, falling back to WebP for anything unrecognised
    ///
    /// # Examples
    /// ```rust
    /// use product_studio::services::{OutputFormat, OutputFormatHandler};
    ///
    /// assert_eq!(OutputFormatHandler::parse_lenient("JPG"), OutputFormat::Jpeg);
    /// assert_eq!(OutputFormatHandler::parse_lenient("gif"), OutputFormat::WebP);
    /// ```
    #[must_use]
    pub fn parse_lenient(requested: &str) -> OutputFormat {
        match requested.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => OutputFormat::Jpeg,
            "png" => OutputFormat::Png,
            "webp" => OutputFormat::WebP,
            "avif" => OutputFormat::Avif,
            other => {
                log::debug!("Unrecognised output format '{}', falling back to webp", other);
                OutputFormat::WebP
            },
        }
    }

    /// Map a detected input format onto an output format we can re-emit unchanged
    #[must_use]
    pub fn from_image_format(format: ImageFormat) -> Option<OutputFormat> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            ImageFormat::Avif => Some(OutputFormat::Avif),
            _ => None,
        }
    }

    /// Get the file extension for a given output format (without the dot)
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    /// MIME type served for a given output format
    #[must_use]
    pub fn get_mime_type(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Avif => "image/avif",
        }
    }

    /// Check if a format supports transparency (alpha channel)
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png | OutputFormat::WebP | OutputFormat::Avif => true,
            OutputFormat::Jpeg => false,
        }
    }

    /// Whether the format is lossy, i.e. `quality` trades size for fidelity
    #[must_use]
    pub fn is_lossy(format: OutputFormat) -> bool {
        !matches!(format, OutputFormat::Png)
    }
}
