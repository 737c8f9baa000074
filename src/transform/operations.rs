//! Pixel operations backing each transform.
//!
//! All functions are pure: they take decoded images and return new ones. Resampling
//! uses Lanczos3 throughout.

use super::params::{AdjustParams, Fit, ResizeParams};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

/// Hero banner canvas
pub const HERO_WIDTH: u32 = 1200;
pub const HERO_HEIGHT: u32 = 628;

/// Lifestyle product box and background canvas
pub const LIFESTYLE_PRODUCT_SIZE: u32 = 800;
pub const LIFESTYLE_WIDTH: u32 = 1920;
pub const LIFESTYLE_HEIGHT: u32 = 1080;

/// Isometric placeholder canvas
pub const ISOMETRIC_WIDTH: u32 = 800;
pub const ISOMETRIC_HEIGHT: u32 = 600;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Resize according to the requested fit
///
/// With a single dimension the other one follows the aspect ratio, whatever the fit.
#[must_use]
pub fn resize(image: &DynamicImage, params: &ResizeParams) -> DynamicImage {
    let (width, height) = match (params.width, params.height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, scaled(image.height(), w, image.width())),
        (None, Some(h)) => (scaled(image.width(), h, image.height()), h),
        (None, None) => return image.clone(),
    };

    if params.width.is_none() || params.height.is_none() {
        return image.resize_exact(width, height, FilterType::Lanczos3);
    }

    match params.fit {
        Fit::Contain => DynamicImage::ImageRgba8(contain(image, width, height)),
        Fit::Cover => image.resize_to_fill(width, height, FilterType::Lanczos3),
        Fit::Fill => image.resize_exact(width, height, FilterType::Lanczos3),
    }
}

/// `value * target / reference`, rounded, at least 1
fn scaled(value: u32, target: u32, reference: u32) -> u32 {
    if reference == 0 {
        return target.max(1);
    }
    let result = (f64::from(value) * f64::from(target) / f64::from(reference)).round();
    (result as u32).max(1)
}

/// Scale to fit inside `width` x `height`, centered on a transparent canvas of exactly that size
#[must_use]
pub fn contain(image: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    let fitted = image.resize(width, height, FilterType::Lanczos3).to_rgba8();
    let mut canvas = RgbaImage::from_pixel(width, height, TRANSPARENT);
    let x = i64::from((width - fitted.width().min(width)) / 2);
    let y = i64::from((height - fitted.height().min(height)) / 2);
    imageops::replace(&mut canvas, &fitted, x, y);
    canvas
}

/// Brightness and saturation multipliers plus a hue rotation in degrees
#[must_use]
pub fn modulate(image: &DynamicImage, brightness: f32, saturation: f32, hue: i32) -> DynamicImage {
    let mut rgba = image.to_rgba8();

    if (brightness - 1.0).abs() > f32::EPSILON || (saturation - 1.0).abs() > f32::EPSILON {
        for pixel in rgba.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
            let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
            let channel = |c: f32| {
                ((luma + (c - luma) * saturation) * brightness)
                    .round()
                    .clamp(0.0, 255.0) as u8
            };
            pixel.0 = [channel(r), channel(g), channel(b), a];
        }
    }

    if hue != 0 {
        rgba = imageops::huerotate(&rgba, hue);
    }

    DynamicImage::ImageRgba8(rgba)
}

/// Unsharp mask with the given sigma
#[must_use]
pub fn sharpen(image: &DynamicImage, sigma: f32) -> DynamicImage {
    image.unsharpen(sigma, 0)
}

/// Gamma correction of the color channels, alpha untouched
#[must_use]
pub fn gamma(image: &DynamicImage, gamma: f32) -> DynamicImage {
    let mut rgba = image.to_rgba8();
    if (gamma - 1.0).abs() <= f32::EPSILON {
        return DynamicImage::ImageRgba8(rgba);
    }

    let exponent = 1.0 / gamma;
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = ((i as f32 / 255.0).powf(exponent) * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    for pixel in rgba.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        pixel.0 = [lut[r as usize], lut[g as usize], lut[b as usize], a];
    }
    DynamicImage::ImageRgba8(rgba)
}

/// Full adjust chain: modulate, then sharpen, then gamma
#[must_use]
pub fn adjust(image: &DynamicImage, params: &AdjustParams) -> DynamicImage {
    let modulated = modulate(image, params.brightness, params.saturation, params.hue);
    let sharpened = sharpen(&modulated, params.sharpness);
    gamma(&sharpened, params.contrast)
}

/// 1200x628 banner: product letterboxed into the left half, blank white right panel
#[must_use]
pub fn hero(image: &DynamicImage) -> RgbaImage {
    let half = HERO_WIDTH / 2;
    let product = contain(image, half, HERO_HEIGHT);
    let mut canvas = RgbaImage::from_pixel(HERO_WIDTH, HERO_HEIGHT, WHITE);
    imageops::overlay(&mut canvas, &product, 0, 0);
    canvas
}

/// Product contained in 800x800, blended centered over a 1920x1080 cover-cropped background
#[must_use]
pub fn lifestyle(product: &DynamicImage, background: &DynamicImage) -> RgbaImage {
    let product = contain(product, LIFESTYLE_PRODUCT_SIZE, LIFESTYLE_PRODUCT_SIZE);
    let mut canvas = background
        .resize_to_fill(LIFESTYLE_WIDTH, LIFESTYLE_HEIGHT, FilterType::Lanczos3)
        .to_rgba8();

    let x = i64::from((LIFESTYLE_WIDTH - LIFESTYLE_PRODUCT_SIZE) / 2);
    let y = i64::from((LIFESTYLE_HEIGHT - LIFESTYLE_PRODUCT_SIZE) / 2);
    imageops::overlay(&mut canvas, &product, x, y);
    canvas
}

/// Placeholder for the isometric view: the product contained in 800x600
#[must_use]
pub fn isometric(image: &DynamicImage) -> RgbaImage {
    contain(image, ISOMETRIC_WIDTH, ISOMETRIC_HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    fn resize_params(width: Option<u32>, height: Option<u32>, fit: Fit) -> ResizeParams {
        ResizeParams { width, height, fit }
    }

    #[test]
    fn test_resize_fit_modes() {
        let image = solid(400, 200, [200, 10, 10, 255]);

        let contained = resize(&image, &resize_params(Some(100), Some(100), Fit::Contain));
        assert_eq!((contained.width(), contained.height()), (100, 100));
        // Letterbox rows are transparent, the middle is the product
        let rgba = contained.to_rgba8();
        assert_eq!(rgba.get_pixel(50, 5)[3], 0);
        assert_eq!(rgba.get_pixel(50, 50)[3], 255);

        let covered = resize(&image, &resize_params(Some(100), Some(100), Fit::Cover));
        assert_eq!((covered.width(), covered.height()), (100, 100));

        let filled = resize(&image, &resize_params(Some(120), Some(30), Fit::Fill));
        assert_eq!((filled.width(), filled.height()), (120, 30));
    }

    #[test]
    fn test_resize_single_dimension_keeps_aspect() {
        let image = solid(400, 200, [0, 0, 0, 255]);

        let by_width = resize(&image, &resize_params(Some(100), None, Fit::Cover));
        assert_eq!((by_width.width(), by_width.height()), (100, 50));

        let by_height = resize(&image, &resize_params(None, Some(100), Fit::Fill));
        assert_eq!((by_height.width(), by_height.height()), (200, 100));
    }

    #[test]
    fn test_modulate_identity_and_brightness() {
        let image = solid(4, 4, [100, 50, 25, 255]);
        let same = modulate(&image, 1.0, 1.0, 0);
        assert_eq!(same.to_rgba8().get_pixel(0, 0).0, [100, 50, 25, 255]);

        let brighter = modulate(&image, 2.0, 1.0, 0);
        assert_eq!(brighter.to_rgba8().get_pixel(0, 0).0, [200, 100, 50, 255]);

        let grey = modulate(&image, 1.0, 0.0, 0);
        let [r, g, b, _] = grey.to_rgba8().get_pixel(0, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn test_gamma_brightens_midtones_and_keeps_alpha() {
        let image = solid(2, 2, [128, 128, 128, 77]);
        let corrected = gamma(&image, 2.2).to_rgba8();
        let pixel = corrected.get_pixel(0, 0);
        assert!(pixel[0] > 128);
        assert_eq!(pixel[3], 77);
    }

    #[test]
    fn test_hero_layout() {
        let banner = hero(&solid(300, 300, [255, 0, 0, 255]));
        assert_eq!(banner.dimensions(), (HERO_WIDTH, HERO_HEIGHT));
        // Right panel is blank white
        assert_eq!(banner.get_pixel(900, 300).0, [255, 255, 255, 255]);
        // Product sits in the left half
        assert_eq!(banner.get_pixel(300, 314).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_lifestyle_transparent_product_shows_background() {
        let product = solid(100, 100, [0, 0, 0, 0]);
        let background = solid(640, 360, [20, 120, 220, 255]);

        let composite = lifestyle(&product, &background);
        assert_eq!(composite.dimensions(), (LIFESTYLE_WIDTH, LIFESTYLE_HEIGHT));
        assert_eq!(composite.get_pixel(560, 140).0, [20, 120, 220, 255]);
        assert_eq!(composite.get_pixel(960, 540).0, [20, 120, 220, 255]);
    }

    #[test]
    fn test_isometric_placeholder_size() {
        let view = isometric(&solid(50, 80, [1, 2, 3, 255]));
        assert_eq!(view.dimensions(), (ISOMETRIC_WIDTH, ISOMETRIC_HEIGHT));
    }
}
