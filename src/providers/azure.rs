//! Azure Computer Vision background removal
//!
//! The image is normalised to PNG and posted as a raw body to the
//! `imageanalysis:segment` endpoint in `backgroundRemoval` mode.

use super::{
    transport_error, BackgroundRemovalProvider, ProviderKind, RemovalInput, RemovalOutput,
    RemovalTimings,
};
use crate::{
    config::AzureConfig,
    error::{ImagingError, Result},
    services::{run_blocking, ImageCodec},
};
use async_trait::async_trait;
use instant::Instant;
use reqwest::header::CONTENT_TYPE;

const PROVIDER: &str = "azure";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const EXPECTED_CONTENT_TYPE: &str = "image/png";

/// Azure segmentation client
#[derive(Debug, Clone)]
pub struct AzureProvider {
    config: AzureConfig,
    client: reqwest::Client,
}

impl AzureProvider {
    /// # Errors
    /// - HTTP client construction failure
    pub fn new(config: AzureConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ImagingError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Full segmentation URL for an endpoint
    #[must_use]
    pub fn segment_url(&self, endpoint: &str) -> String {
        format!(
            "{}/computervision/imageanalysis:segment?api-version={}&mode=backgroundRemoval",
            endpoint.trim_end_matches('/'),
            self.config.api_version
        )
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.config.endpoint.as_deref(), self.config.api_key.as_deref()) {
            (Some(endpoint), Some(key)) if self.config.is_configured() => Ok((endpoint, key)),
            _ => Err(ImagingError::ProviderNotConfigured(PROVIDER.to_string())),
        }
    }
}

#[async_trait]
impl BackgroundRemovalProvider for AzureProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    async fn remove_background(&self, input: &RemovalInput) -> Result<RemovalOutput> {
        let (endpoint, key) = self.credentials()?;

        let preprocess_start = Instant::now();
        let data = input.image.data.clone();
        let png = run_blocking(move || ImageCodec::normalize_to_png(&data)).await?;
        let preprocessing = preprocess_start.elapsed();

        let removal_start = Instant::now();
        let url = self.segment_url(endpoint);
        tracing::debug!(request_id = %input.request_id, url = %url, bytes = png.data.len(), "Calling Azure segmentation");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(SUBSCRIPTION_KEY_HEADER, key)
            .body(png.data)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, self.config.request_timeout, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImagingError::provider_response(PROVIDER, status.as_u16(), body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if content_type != EXPECTED_CONTENT_TYPE {
            let body = response.text().await.unwrap_or_default();
            return Err(ImagingError::provider_response(
                PROVIDER,
                status.as_u16(),
                format!("unexpected content type '{content_type}': {body}"),
            ));
        }

        let image = response
            .bytes()
            .await
            .map_err(|e| transport_error(PROVIDER, self.config.request_timeout, &e))?
            .to_vec();

        Ok(RemovalOutput {
            image,
            timings: RemovalTimings {
                preprocessing,
                removal: removal_start.elapsed(),
                ..RemovalTimings::default()
            },
            credits_remaining: None,
            model_version: Some(self.config.api_version.clone()),
        })
    }
}
