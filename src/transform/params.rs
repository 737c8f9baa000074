//! Typed, validated parameters for each transform.
//!
//! Raw [`TransformParams`] arrive from form fields or batch JSON as loosely typed values.
//! Each operation parses them into one of the structs below before any pixel work starts,
//! so a bad request never reaches the image library.

use crate::{
    error::{ImagingError, Result},
    services::{OutputFormat, OutputFormatHandler},
    types::TransformParams,
};
use std::fmt;
use std::str::FromStr;

/// Largest width or height accepted for a resize target
pub const MAX_DIMENSION: u32 = 10_000;

/// Default quality for `optimize`
pub const DEFAULT_QUALITY: u8 = 80;

/// Resize strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fit {
    /// Scale to fit inside the box, pad the rest with transparency
    #[default]
    Contain,
    /// Scale to cover the box, crop the overflow around the center
    Cover,
    /// Stretch to the exact box, ignoring aspect ratio
    Fill,
}

impl FromStr for Fit {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contain" => Ok(Self::Contain),
            "cover" => Ok(Self::Cover),
            "fill" => Ok(Self::Fill),
            other => Err(ImagingError::invalid_parameters(format!(
                "Unknown fit '{other}' (expected contain, cover or fill)"
            ))),
        }
    }
}

impl fmt::Display for Fit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Contain => "contain",
            Self::Cover => "cover",
            Self::Fill => "fill",
        })
    }
}

/// Parameters for `resize`: at least one dimension is present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Fit,
}

impl ResizeParams {
    /// # Errors
    /// - Neither `width` nor `height` given
    /// - Non-numeric or out-of-range dimensions, unknown `fit`
    pub fn from_params(params: &TransformParams) -> Result<Self> {
        let width = dimension(params, "width")?;
        let height = dimension(params, "height")?;
        if width.is_none() && height.is_none() {
            return Err(ImagingError::invalid_parameters(
                "Either width or height is required",
            ));
        }
        let fit = params
            .text("fit")
            .map(|f| f.parse::<Fit>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self { width, height, fit })
    }
}

fn dimension(params: &TransformParams, name: &str) -> Result<Option<u32>> {
    match params.integer(name)? {
        None => Ok(None),
        Some(value) if (1..=i64::from(MAX_DIMENSION)).contains(&value) => Ok(Some(value as u32)),
        Some(value) => Err(ImagingError::parameter_range_error(
            name,
            value,
            &format!("1-{MAX_DIMENSION}"),
        )),
    }
}

/// Parameters for `optimize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeParams {
    pub quality: u8,
    pub format: OutputFormat,
}

impl Default for OptimizeParams {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            format: OutputFormat::WebP,
        }
    }
}

impl OptimizeParams {
    /// Unrecognised formats fall back to WebP rather than failing
    ///
    /// # Errors
    /// - `quality` non-numeric or outside 0-100
    pub fn from_params(params: &TransformParams) -> Result<Self> {
        let quality = match params.integer("quality")? {
            None => DEFAULT_QUALITY,
            Some(q) if (0..=100).contains(&q) => q as u8,
            Some(q) => return Err(ImagingError::parameter_range_error("quality", q, "0-100")),
        };
        let format = params
            .text("format")
            .map_or(OutputFormat::WebP, |f| OutputFormatHandler::parse_lenient(&f));

        Ok(Self { quality, format })
    }
}

/// Parameters for `adjust`, applied as modulate -> sharpen -> gamma
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustParams {
    /// Brightness multiplier
    pub brightness: f32,
    /// Saturation multiplier
    pub saturation: f32,
    /// Hue rotation in degrees
    pub hue: i32,
    /// Sharpen sigma
    pub sharpness: f32,
    /// Gamma
    pub contrast: f32,
}

impl Default for AdjustParams {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            saturation: 1.0,
            hue: 0,
            sharpness: 1.0,
            contrast: 1.0,
        }
    }
}

impl AdjustParams {
    /// # Errors
    /// - Non-numeric values
    /// - Negative brightness or saturation, sharpness outside (0, 10], contrast outside 1.0-3.0
    pub fn from_params(params: &TransformParams) -> Result<Self> {
        let defaults = Self::default();

        let brightness = params.number("brightness")?.map_or(defaults.brightness, |v| v as f32);
        if brightness < 0.0 {
            return Err(ImagingError::parameter_range_error("brightness", brightness, ">= 0"));
        }

        let saturation = params.number("saturation")?.map_or(defaults.saturation, |v| v as f32);
        if saturation < 0.0 {
            return Err(ImagingError::parameter_range_error("saturation", saturation, ">= 0"));
        }

        // Fractional hues are truncated to whole degrees
        let hue = params
            .number("hue")?
            .map_or(defaults.hue, |v| (v.trunc() % 360.0) as i32);

        let sharpness = params.number("sharpness")?.map_or(defaults.sharpness, |v| v as f32);
        if sharpness <= 0.0 || sharpness > 10.0 {
            return Err(ImagingError::parameter_range_error("sharpness", sharpness, "(0, 10]"));
        }

        let contrast = params.number("contrast")?.map_or(defaults.contrast, |v| v as f32);
        if !(1.0..=3.0).contains(&contrast) {
            return Err(ImagingError::parameter_range_error("contrast", contrast, "1.0-3.0"));
        }

        Ok(Self {
            brightness,
            saturation,
            hue,
            sharpness,
            contrast,
        })
    }
}

/// Marketing fields accepted by `create-hero`
///
/// Text rendering is not implemented; the fields are only recorded in the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroParams {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub brand_color: String,
    pub template_id: String,
}

impl HeroParams {
    #[must_use]
    pub fn from_params(params: &TransformParams) -> Self {
        Self {
            title: params.text("title"),
            description: params.text("description"),
            price: params.text("price"),
            brand_color: params
                .text("brandColor")
                .unwrap_or_else(|| "#000000".to_string()),
            template_id: params
                .text("templateId")
                .unwrap_or_else(|| "default".to_string()),
        }
    }
}

/// Physical product dimensions for `create-isometric`
#[derive(Debug, Clone, PartialEq)]
pub struct IsometricParams {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub unit: String,
}

impl IsometricParams {
    /// # Errors
    /// - Any of `width`, `height`, `depth` missing, non-numeric or not positive
    pub fn from_params(params: &TransformParams) -> Result<Self> {
        let required = |name: &str| -> Result<f64> {
            match params.number(name)? {
                Some(v) if v > 0.0 => Ok(v),
                Some(v) => Err(ImagingError::parameter_range_error(name, v, "> 0")),
                None => Err(ImagingError::invalid_parameters(
                    "Product dimensions (width, height, depth) are required",
                )),
            }
        };

        Ok(Self {
            width: required("width")?,
            height: required("height")?,
            depth: required("depth")?,
            unit: params.text("unit").unwrap_or_else(|| "cm".to_string()),
        })
    }
}
