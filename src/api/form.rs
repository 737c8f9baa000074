//! Multipart form collection
//!
//! Files and text fields are read fully into memory. File parts are size-checked
//! while their chunks stream in so an oversized upload is rejected early.

use crate::{
    error::{ImagingError, Result},
    types::{TransformParams, UploadedImage},
};
use axum::extract::multipart::{Field, Multipart, MultipartError, MultipartRejection};
use axum::http::StatusCode;
use bytes::BytesMut;
use std::collections::HashMap;

/// The multipart extractor, with its rejection kept for the handler to answer
pub type MultipartBody = std::result::Result<Multipart, MultipartRejection>;

/// Collected contents of a multipart request
#[derive(Debug, Default)]
pub struct FormData {
    files: HashMap<String, Vec<UploadedImage>>,
    fields: HashMap<String, String>,
}

impl FormData {
    /// Read every part of the request
    ///
    /// # Errors
    /// - `PayloadTooLarge` when a file exceeds `max_file_bytes` or the body limit is hit
    /// - `InvalidParameters` when the multipart stream is malformed
    ///
    /// A body that is not `multipart/form-data` at all carries no files, so it collects
    /// into an empty form and the handler reports the missing upload.
    pub async fn collect(multipart: MultipartBody, max_file_bytes: usize) -> Result<Self> {
        let mut form = Self::default();
        let mut multipart = match multipart {
            Ok(multipart) => multipart,
            Err(rejection) => {
                log::debug!("Request is not multipart form data: {}", rejection.body_text());
                return Ok(form);
            },
        };

        while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e, max_file_bytes))? {
            let name = normalize_name(field.name().unwrap_or_default());

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let mime_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = read_file(field, &file_name, max_file_bytes).await?;

                    // Browsers send an empty part for an unselected file input
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }

                    log::debug!("Received file '{}' in field '{}' ({} bytes)", file_name, name, data.len());
                    form.files
                        .entry(name.clone())
                        .or_default()
                        .push(UploadedImage::new(name, file_name, mime_type, data.freeze()));
                },
                None => {
                    let value = field.text().await.map_err(|e| multipart_error(&e, max_file_bytes))?;
                    form.fields.insert(name, value);
                },
            }
        }

        Ok(form)
    }

    /// Take the first file uploaded in `field`
    ///
    /// # Errors
    /// - `MissingInput` when no file was uploaded in that field
    pub fn take_file(&mut self, field: &str) -> Result<UploadedImage> {
        self.files
            .get_mut(field)
            .filter(|files| !files.is_empty())
            .map(|files| files.remove(0))
            .ok_or_else(|| ImagingError::missing_input(field))
    }

    /// Take every file uploaded in `field`, in upload order
    pub fn take_files(&mut self, field: &str) -> Vec<UploadedImage> {
        self.files.remove(field).unwrap_or_default()
    }

    /// A text field, if present
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// All text fields as operation parameters
    #[must_use]
    pub fn params(&self) -> TransformParams {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect()
    }
}

/// `images[]` and `images` name the same field
fn normalize_name(name: &str) -> String {
    name.strip_suffix("[]").unwrap_or(name).to_string()
}

async fn read_file(mut field: Field<'_>, file_name: &str, limit: usize) -> Result<BytesMut> {
    let mut data = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(&e, limit))? {
        if data.len() + chunk.len() > limit {
            tracing::warn!(file = file_name, limit, "Upload size limit exceeded, aborting");
            return Err(ImagingError::PayloadTooLarge {
                file_name: file_name.to_string(),
                limit,
            });
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

fn multipart_error(err: &MultipartError, limit: usize) -> ImagingError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ImagingError::PayloadTooLarge {
            file_name: "request body".to_string(),
            limit,
        }
    } else {
        ImagingError::invalid_parameters(format!("Failed to parse multipart data: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("images[]"), "images");
        assert_eq!(normalize_name("image"), "image");
    }

    #[test]
    fn test_take_file_and_params() {
        let mut form = FormData::default();
        form.files.insert(
            "image".to_string(),
            vec![UploadedImage::new("image", "a.png", "image/png", bytes::Bytes::from_static(b"x"))],
        );
        form.fields.insert("width".to_string(), "120".to_string());

        assert_eq!(form.params().integer("width").unwrap(), Some(120));
        assert_eq!(form.text("width"), Some("120"));
        assert_eq!(form.take_file("image").unwrap().file_name, "a.png");
        assert!(matches!(
            form.take_file("image"),
            Err(ImagingError::MissingInput { .. })
        ));
        assert!(form.take_files("images").is_empty());
    }
}
