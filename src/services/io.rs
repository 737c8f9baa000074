//! Image codec service
//!
//! Decoding from memory and encoding to each [`OutputFormat`] with a quality setting.
//! Everything here is synchronous and CPU-bound; async callers run it on the blocking pool.

use crate::{
    error::{ImagingError, Result},
    services::format::{OutputFormat, OutputFormatHandler},
    types::EncodedImage,
};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{DynamicImage, ImageEncoder, ImageFormat};

/// Run CPU-bound image work on the blocking thread pool
///
/// # Errors
/// - Whatever the closure returns
/// - `Internal` if the blocking task panicked or was cancelled
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ImagingError::internal(format!("Image task failed: {e}")))?
}

/// rav1e speed preset used for AVIF output (1 = slowest, 10 = fastest)
const AVIF_SPEED: u8 = 6;

/// Service for converting between encoded bytes and decoded images
pub struct ImageCodec;

impl ImageCodec {
    /// Decode an image from memory, detecting the format from its content
    ///
    /// # Errors
    /// - Unrecognised or corrupt image data (`TransformFailure`)
    pub fn decode(data: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(data).map_err(|e| {
            ImagingError::transform(format!(
                "Failed to decode image ({} bytes): {}",
                data.len(),
                e
            ))
        })
    }

    /// Detect the container format of encoded data without decoding it
    #[must_use]
    pub fn detect_format(data: &[u8]) -> Option<ImageFormat> {
        image::guess_format(data).ok()
    }

    /// Encode an image into the requested format
    ///
    /// `quality` (0-100) applies to the lossy formats. PNG is lossless, so quality
    /// only chooses the compression effort.
    ///
    /// # Errors
    /// - Encoder failures from the underlying codec (`TransformFailure`)
    pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<EncodedImage> {
        let quality = quality.min(100);
        let data = match format {
            OutputFormat::Jpeg => Self::encode_jpeg(image, quality)?,
            OutputFormat::Png => Self::encode_png(image, quality)?,
            OutputFormat::WebP => Self::encode_webp(image, quality)?,
            OutputFormat::Avif => Self::encode_avif(image, quality)?,
        };

        log::debug!(
            "Encoded {}x{} image as {} ({} bytes, quality {})",
            image.width(),
            image.height(),
            format,
            data.len(),
            quality
        );

        Ok(EncodedImage::new(data, format))
    }

    /// Encode as PNG with default compression
    ///
    /// # Errors
    /// - PNG encoder failures
    pub fn encode_png_default(image: &DynamicImage) -> Result<EncodedImage> {
        Ok(EncodedImage::new(
            Self::encode_png_with(image, CompressionType::Default)?,
            OutputFormat::Png,
        ))
    }

    fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        // JPEG has no alpha channel
        let rgb = image.to_rgb8();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality.max(1))
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| ImagingError::transform(format!("Failed to encode JPEG: {e}")))?;
        Ok(buffer)
    }

    fn encode_png(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let compression = match quality {
            90..=100 => CompressionType::Best,
            0..=30 => CompressionType::Fast,
            _ => CompressionType::Default,
        };
        Self::encode_png_with(image, compression)
    }

    fn encode_png_with(image: &DynamicImage, compression: CompressionType) -> Result<Vec<u8>> {
        let rgba = image.to_rgba8();
        let mut buffer = Vec::new();
        PngEncoder::new_with_quality(&mut buffer, compression, PngFilterType::Adaptive)
            .write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| ImagingError::transform(format!("Failed to encode PNG: {e}")))?;
        Ok(buffer)
    }

    fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        // The image crate only writes lossless WebP; lossy output goes through libwebp
        let rgba = image.to_rgba8();
        let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
        let memory = encoder
            .encode_simple(false, f32::from(quality))
            .map_err(|e| {
                ImagingError::transform(format!(
                    "Failed to encode {}x{} image as WebP: {:?}",
                    rgba.width(),
                    rgba.height(),
                    e
                ))
            })?;
        Ok(memory.to_vec())
    }

    fn encode_avif(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let rgba = image.to_rgba8();
        let mut buffer = Vec::new();
        AvifEncoder::new_with_speed_quality(&mut buffer, AVIF_SPEED, quality.max(1))
            .write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| ImagingError::transform(format!("Failed to encode AVIF: {e}")))?;
        Ok(buffer)
    }

    /// Re-encode arbitrary input bytes as PNG, the format removal providers exchange
    ///
    /// # Errors
    /// - Input cannot be decoded or PNG encoding fails
    pub fn normalize_to_png(data: &[u8]) -> Result<EncodedImage> {
        let image = Self::decode(data)?;
        Self::encode_png_default(&image)
    }

    /// Content type to declare when forwarding encoded bytes
    #[must_use]
    pub fn mime_type_of(data: &[u8]) -> &'static str {
        Self::detect_format(data)
            .and_then(OutputFormatHandler::from_image_format)
            .map_or("application/octet-stream", OutputFormatHandler::get_mime_type)
    }
}
