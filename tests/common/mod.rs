//! Shared fixtures for the integration tests

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use product_studio::{Application, ImagingProcessor, ServerConfig, ServerConfigBuilder};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A server backed by throwaway upload and processed directories
pub struct TestApp {
    pub server: TestServer,
    pub dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|builder| builder)
    }

    /// Start a server after customising the default test configuration
    pub fn with_config<F>(customize: F) -> Self
    where
        F: FnOnce(ServerConfigBuilder) -> ServerConfigBuilder,
    {
        let dir = TempDir::new().unwrap();
        let builder = ServerConfig::builder()
            .uploads_dir(dir.path().join("uploads"))
            .processed_dir(dir.path().join("processed"))
            .local_program("definitely-not-a-real-rembg-binary");
        let config = customize(builder).build().unwrap();

        let processor = ImagingProcessor::new(config).unwrap();
        let server = TestServer::new(Application::with_processor(processor).router()).unwrap();
        Self { server, dir }
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.dir.path().join("processed")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    /// Map a public path such as `/processed/resized-<id>.png` to the file on disk
    pub fn file_for(&self, public_path: &str) -> PathBuf {
        self.dir.path().join(public_path.trim_start_matches('/'))
    }
}

/// Solid-color RGBA image
pub fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
}

/// Two-axis gradient, so resized and compressed output is not trivially uniform
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgba([r, g, 128, 255])
    });
    DynamicImage::ImageRgba8(image)
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut buffer, format)
            .unwrap(),
        _ => image.write_to(&mut buffer, format).unwrap(),
    }
    buffer.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Jpeg)
}

/// A multipart part carrying an image file
pub fn image_part(file_name: &str, data: Vec<u8>) -> Part {
    let mime = if file_name.ends_with(".jpg") || file_name.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        "image/png"
    };
    Part::bytes(data).file_name(file_name.to_string()).mime_type(mime)
}

/// A form with a single `image` field
pub fn image_form(file_name: &str, data: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part("image", image_part(file_name, data))
}

pub fn load(path: &Path) -> DynamicImage {
    image::open(path).unwrap()
}

/// Sorted names of the files in a directory, hidden partial files included
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(std::result::Result::ok)
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
