//! PhotoRoom background removal
//!
//! The original upload is sent untouched as multipart field `imageFile`. The API key is
//! picked by environment (sandbox or production) and the remaining-credits header is
//! passed back to the caller.

use super::{
    transport_error, ApiEnvironment, BackgroundRemovalProvider, ProviderKind, RemovalInput, RemovalOutput,
    RemovalTimings,
};
use crate::{
    config::PhotoRoomConfig,
    error::{ImagingError, Result},
    services::ImageCodec,
};
use async_trait::async_trait;
use instant::Instant;
use reqwest::multipart::{Form, Part};

const PROVIDER: &str = "photoroom";
const API_KEY_HEADER: &str = "x-api-key";
const MODEL_VERSION_HEADER: &str = "pr-background-removal-model-version";
const CREDITS_HEADER: &str = "x-credits-remaining";

/// PhotoRoom API client
#[derive(Debug, Clone)]
pub struct PhotoRoomProvider {
    config: PhotoRoomConfig,
    client: reqwest::Client,
}

impl PhotoRoomProvider {
    /// # Errors
    /// - HTTP client construction failure
    pub fn new(config: PhotoRoomConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ImagingError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn api_key(&self, environment: ApiEnvironment) -> Result<&str> {
        let key = match environment {
            ApiEnvironment::Sandbox => self.config.sandbox_api_key.as_deref(),
            ApiEnvironment::Production => self.config.production_api_key.as_deref(),
        };
        key.ok_or_else(|| ImagingError::ProviderNotConfigured(format!("{PROVIDER} ({environment})")))
    }
}

#[async_trait]
impl BackgroundRemovalProvider for PhotoRoomProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::PhotoRoom
    }

    async fn remove_background(&self, input: &RemovalInput) -> Result<RemovalOutput> {
        let key = self.api_key(input.environment)?;
        let image = &input.image;

        // Trust the declared type only when it names an image
        let mime = if image.mime_type.starts_with("image/") {
            image.mime_type.as_str()
        } else {
            ImageCodec::mime_type_of(&image.data)
        };
        let part = Part::bytes(image.data.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(mime)
            .map_err(|e| ImagingError::invalid_parameters(format!("Invalid content type '{mime}': {e}")))?;
        let form = Form::new().part("imageFile", part);

        let removal_start = Instant::now();
        tracing::debug!(
            request_id = %input.request_id,
            environment = %input.environment,
            model_version = %self.config.model_version,
            "Calling PhotoRoom"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(API_KEY_HEADER, key)
            .header(MODEL_VERSION_HEADER, &self.config.model_version)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, self.config.request_timeout, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImagingError::provider_response(PROVIDER, status.as_u16(), body));
        }

        let credits_remaining = response
            .headers()
            .get(CREDITS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let image = response
            .bytes()
            .await
            .map_err(|e| transport_error(PROVIDER, self.config.request_timeout, &e))?
            .to_vec();

        Ok(RemovalOutput {
            image,
            timings: RemovalTimings {
                removal: removal_start.elapsed(),
                ..RemovalTimings::default()
            },
            credits_remaining,
            model_version: Some(self.config.model_version.clone()),
        })
    }
}
