//! Image Transform Gateway
//!
//! A stateless mapping from `(input bytes, TransformRequest)` to encoded output bytes.
//! Parameters are validated before the input is decoded, so invalid requests fail
//! with `InvalidParameters` without touching the image library.
//!
//! Every call here is CPU-bound and synchronous. The processor runs it on
//! `tokio::task::spawn_blocking`.

pub mod operations;
pub mod params;

pub use params::{AdjustParams, Fit, HeroParams, IsometricParams, OptimizeParams, ResizeParams};

use crate::{
    error::{ImagingError, Result},
    services::ImageCodec,
    types::{EncodedImage, OperationKind, TransformRequest},
};
use image::DynamicImage;

/// A transform whose parameters have been parsed and checked
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedTransform {
    Resize(ResizeParams),
    Adjust(AdjustParams),
    Optimize(OptimizeParams),
    Hero(HeroParams),
    Isometric(IsometricParams),
}

/// Entry point for all single-image transforms
pub struct ImageTransformGateway;

impl ImageTransformGateway {
    /// Parse and check the parameters of a single-image transform
    ///
    /// # Errors
    /// - `InvalidParameters` for bad or missing fields
    /// - `InvalidParameters` for kinds that are not single-image transforms
    ///   (`create-lifestyle` needs two inputs, `remove-background` needs a provider)
    pub fn validate(request: &TransformRequest) -> Result<ValidatedTransform> {
        let params = &request.params;
        match request.kind {
            OperationKind::Resize => ResizeParams::from_params(params).map(ValidatedTransform::Resize),
            OperationKind::Adjust => AdjustParams::from_params(params).map(ValidatedTransform::Adjust),
            OperationKind::Optimize => {
                OptimizeParams::from_params(params).map(ValidatedTransform::Optimize)
            },
            OperationKind::CompositeHero => Ok(ValidatedTransform::Hero(HeroParams::from_params(params))),
            OperationKind::Isometric => {
                IsometricParams::from_params(params).map(ValidatedTransform::Isometric)
            },
            OperationKind::CompositeLifestyle | OperationKind::RemoveBackground => {
                Err(ImagingError::invalid_parameters(format!(
                    "'{}' is not a single-image transform",
                    request.kind
                )))
            },
        }
    }

    /// Apply one transform to encoded input bytes
    ///
    /// Resize, adjust, hero and isometric produce PNG; optimize produces the requested format.
    ///
    /// # Errors
    /// - `InvalidParameters` (see [`Self::validate`])
    /// - `TransformFailure` when decoding, processing or encoding fails
    pub fn transform(input: &[u8], request: &TransformRequest) -> Result<EncodedImage> {
        let validated = Self::validate(request)?;
        Self::apply(input, &validated)
    }

    /// Apply an already validated transform
    ///
    /// # Errors
    /// - `TransformFailure` when decoding, processing or encoding fails
    pub fn apply(input: &[u8], transform: &ValidatedTransform) -> Result<EncodedImage> {
        let image = ImageCodec::decode(input)?;

        match transform {
            ValidatedTransform::Resize(params) => {
                let resized = operations::resize(&image, params);
                log::debug!(
                    "Resized {}x{} -> {}x{} ({})",
                    image.width(),
                    image.height(),
                    resized.width(),
                    resized.height(),
                    params.fit
                );
                ImageCodec::encode_png_default(&resized)
            },
            ValidatedTransform::Adjust(params) => {
                ImageCodec::encode_png_default(&operations::adjust(&image, params))
            },
            ValidatedTransform::Optimize(params) => {
                ImageCodec::encode(&image, params.format, params.quality)
            },
            ValidatedTransform::Hero(params) => {
                tracing::debug!(
                    title = ?params.title,
                    description = ?params.description,
                    price = ?params.price,
                    brand_color = %params.brand_color,
                    template_id = %params.template_id,
                    "Hero text fields received; text rendering is not supported"
                );
                ImageCodec::encode_png_default(&DynamicImage::ImageRgba8(operations::hero(&image)))
            },
            ValidatedTransform::Isometric(params) => {
                tracing::debug!(
                    width = params.width,
                    height = params.height,
                    depth = params.depth,
                    unit = %params.unit,
                    "Isometric dimensions received; rendering placeholder view"
                );
                ImageCodec::encode_png_default(&DynamicImage::ImageRgba8(operations::isometric(
                    &image,
                )))
            },
        }
    }

    /// Composite a product over a background scene, always as PNG
    ///
    /// # Errors
    /// - `TransformFailure` when either input cannot be decoded or encoding fails
    pub fn composite_lifestyle(product: &[u8], background: &[u8]) -> Result<EncodedImage> {
        let product = ImageCodec::decode(product)?;
        let background = ImageCodec::decode(background)?;
        let composite = operations::lifestyle(&product, &background);
        ImageCodec::encode_png_default(&DynamicImage::ImageRgba8(composite))
    }
}
