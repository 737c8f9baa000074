//! Background removal providers
//!
//! Three interchangeable implementations sit behind [`BackgroundRemovalProvider`]:
//!
//! - [`local::LocalCliProvider`]: an external command-line tool run against temp files
//! - [`azure::AzureProvider`]: Azure Computer Vision segmentation
//! - [`photoroom::PhotoRoomProvider`]: PhotoRoom image editing API
//!
//! The caller picks a provider by name. There is no failover between providers.

pub mod azure;
pub mod local;
pub mod photoroom;

#[cfg(test)]
pub mod test_utils;

use crate::{
    config::ServerConfig,
    error::{ImagingError, Result},
    tracing_config::spans,
    types::{BackgroundRemovalJob, IntermediateFiles, UploadedImage},
};
use async_trait::async_trait;
use instant::Duration;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Instrument, Span};

pub use azure::AzureProvider;
pub use local::LocalCliProvider;
pub use photoroom::PhotoRoomProvider;

/// The closed set of removal providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Local command-line tool
    Local,
    /// Azure Computer Vision
    Azure,
    /// PhotoRoom API
    PhotoRoom,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Azure => "azure",
            Self::PhotoRoom => "photoroom",
        }
    }

    /// Filename prefix for artifacts produced by this provider
    #[must_use]
    pub fn artifact_prefix(self) -> &'static str {
        match self {
            Self::Local => "nobg",
            Self::Azure => "azure",
            Self::PhotoRoom => "photoroom",
        }
    }

    #[must_use]
    pub fn all() -> [Self; 3] {
        [Self::Local, Self::Azure, Self::PhotoRoom]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "rembg" => Ok(Self::Local),
            "azure" => Ok(Self::Azure),
            "photoroom" => Ok(Self::PhotoRoom),
            other => Err(ImagingError::invalid_parameters(format!(
                "Unknown provider '{other}' (expected local, azure or photoroom)"
            ))),
        }
    }
}

/// Which set of credentials a cloud provider should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl ApiEnvironment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for ApiEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiEnvironment {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(ImagingError::invalid_parameters(format!(
                "Unknown mode '{other}' (expected sandbox or production)"
            ))),
        }
    }
}

/// Everything a provider needs for one call
#[derive(Debug, Clone)]
pub struct RemovalInput {
    pub request_id: String,
    pub image: UploadedImage,
    pub environment: ApiEnvironment,
}

impl RemovalInput {
    #[must_use]
    pub fn new<S: Into<String>>(request_id: S, image: UploadedImage) -> Self {
        Self {
            request_id: request_id.into(),
            image,
            environment: ApiEnvironment::default(),
        }
    }

    #[must_use]
    pub fn with_environment(mut self, environment: ApiEnvironment) -> Self {
        self.environment = environment;
        self
    }
}

/// Phase timings reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalTimings {
    /// Input normalisation and temp file preparation
    pub preprocessing: Duration,
    /// The external call itself
    pub removal: Duration,
    /// Temp file release
    pub cleanup: Duration,
}

/// Result of a successful removal
#[derive(Debug, Clone, Default)]
pub struct RemovalOutput {
    /// PNG bytes with the background removed
    pub image: Vec<u8>,
    pub timings: RemovalTimings,
    /// Advisory remaining-credits counter, forwarded as-is
    pub credits_remaining: Option<String>,
    /// Model version the provider was asked to use
    pub model_version: Option<String>,
}

/// A finished provider call, with the job record and the span it ran under
#[derive(Debug)]
pub struct TrackedRemoval {
    pub output: RemovalOutput,
    pub job: BackgroundRemovalJob,
    pub span: Span,
}

/// Call `provider` inside a `provider_call` span and record it as a [`BackgroundRemovalJob`]
///
/// On failure the job is marked failed, the provider's intermediate files are released
/// and the error is logged with the elapsed time. The job of a successful call is left
/// running so the caller can include persistence in it.
///
/// # Errors
/// - Any provider failure, unchanged
pub async fn remove_tracked(
    provider: &dyn BackgroundRemovalProvider,
    input: &RemovalInput,
) -> Result<TrackedRemoval> {
    let kind = provider.kind();
    let request_id = input.request_id.as_str();
    let mut job = BackgroundRemovalJob::start(request_id, kind)
        .with_intermediate_files(provider.intermediate_files(request_id));

    let span = spans::provider_call(request_id, kind.as_str());
    span.in_scope(|| {
        tracing::info!(
            environment = %input.environment,
            bytes = input.image.size(),
            "Starting background removal"
        );
    });

    match provider.remove_background(input).instrument(span.clone()).await {
        Ok(output) => Ok(TrackedRemoval { output, job, span }),
        Err(e) => {
            if let Some(files) = &job.intermediate_files {
                files.remove_all(request_id);
            }
            job.fail(&e);
            span.in_scope(|| {
                tracing::error!(
                    elapsed_ms = job.elapsed().as_millis() as u64,
                    error = %e,
                    "Background removal failed"
                );
            });
            Err(e)
        },
    }
}

/// A background removal capability
#[async_trait]
pub trait BackgroundRemovalProvider: Send + Sync {
    /// Which provider this is
    fn kind(&self) -> ProviderKind;

    /// Temp files this provider would use for a request, if it uses any
    fn intermediate_files(&self, _request_id: &str) -> Option<IntermediateFiles> {
        None
    }

    /// Remove the background from one image
    ///
    /// # Errors
    /// - `ProviderTimeout`, `ProviderExecutionError`, `OutputMissing` (local tool)
    /// - `ProviderResponseError`, `ProviderNotConfigured` (cloud APIs)
    /// - `TransformFailure` when the input cannot be normalised
    async fn remove_background(&self, input: &RemovalInput) -> Result<RemovalOutput>;
}

/// Map a transport-level failure (no usable HTTP response)
///
/// Timeouts become `ProviderTimeout`; anything else is reported as a 502 from the provider.
pub(crate) fn transport_error(
    provider: &str,
    timeout: Duration,
    err: &reqwest::Error,
) -> ImagingError {
    if err.is_timeout() {
        ImagingError::ProviderTimeout {
            provider: provider.to_string(),
            timeout,
        }
    } else {
        ImagingError::provider_response(
            provider,
            err.status().map_or(502, |s| s.as_u16()),
            err.to_string(),
        )
    }
}

/// Registry of the configured providers
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn BackgroundRemovalProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build all three providers from the service configuration
    ///
    /// Cloud providers without credentials are still registered; they report
    /// `ProviderNotConfigured` when called.
    ///
    /// # Errors
    /// - HTTP client construction failure
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let registry = Self::new()
            .with_provider(Arc::new(LocalCliProvider::new(
                config.local.clone(),
                config.local_work_dir(),
            )))
            .with_provider(Arc::new(AzureProvider::new(config.azure.clone())?))
            .with_provider(Arc::new(PhotoRoomProvider::new(config.photoroom.clone())?));

        log::debug!(
            "Provider registry ready (azure configured: {}, photoroom sandbox: {}, photoroom production: {})",
            config.azure.is_configured(),
            config.photoroom.sandbox_api_key.is_some(),
            config.photoroom.production_api_key.is_some()
        );
        Ok(registry)
    }

    /// Register a provider, replacing any previous one of the same kind
    pub fn register(&mut self, provider: Arc<dyn BackgroundRemovalProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn BackgroundRemovalProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Look up a provider
    ///
    /// # Errors
    /// - `ProviderNotConfigured` when no provider of that kind is registered
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn BackgroundRemovalProvider>> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| ImagingError::ProviderNotConfigured(kind.to_string()))
    }
}
