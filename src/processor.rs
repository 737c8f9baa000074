//! Unified product image processor
//!
//! [`ImagingProcessor`] owns the result store and the provider registry and carries
//! every operation the HTTP layer exposes: raw uploads, background removal, single
//! image transforms, lifestyle compositing and batches. Handlers stay thin and only
//! translate between multipart forms and these calls.

use crate::{
    batch::{BatchItemResult, BatchPipeline, BatchPlan},
    config::ServerConfig,
    error::{ImagingError, Result},
    providers::{
        remove_tracked, ApiEnvironment, ProviderKind, ProviderRegistry, RemovalInput, RemovalTimings,
        TrackedRemoval,
    },
    services::{run_blocking, ImageCodec, OutputFormat, OutputFormatHandler, ResultStore},
    transform::ImageTransformGateway,
    types::{OperationKind, ProcessedArtifact, TransformRequest, UploadedImage},
};
use instant::{Duration, Instant};
use tracing::instrument;
use uuid::Uuid;

/// Maximum length of a client-supplied extension kept on raw uploads
const MAX_EXTENSION_LEN: usize = 8;

/// Result of storing a raw upload
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub artifact: ProcessedArtifact,
    pub original_name: String,
    pub mime_type: String,
}

/// Result of a successful background removal
#[derive(Debug, Clone)]
pub struct RemovalOutcome {
    pub artifact: ProcessedArtifact,
    pub provider: ProviderKind,
    pub timings: RemovalTimings,
    /// Wall time of the whole job, provider call included
    pub total: Duration,
    pub credits_remaining: Option<String>,
    pub model_version: Option<String>,
    pub original_size: usize,
    pub processed_size: usize,
}

/// Result of a single image transform
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub artifact: ProcessedArtifact,
    pub kind: OperationKind,
    pub format: OutputFormat,
    pub original_size: usize,
    pub processed_size: usize,
    pub processing_time: Duration,
}

/// Orchestrates storage, transforms and removal providers
#[derive(Debug, Clone)]
pub struct ImagingProcessor {
    config: ServerConfig,
    store: ResultStore,
    providers: ProviderRegistry,
}

impl ImagingProcessor {
    /// Create a processor with providers built from the configuration
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Storage directories cannot be created
    /// - HTTP client construction failure
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let store = ResultStore::open(&config.processed_dir, &config.uploads_dir)?;
        let providers = ProviderRegistry::from_config(&config)?;
        Ok(Self::with_parts(config, store, providers))
    }

    /// Create a processor from pre-built parts (custom providers, test stores)
    #[must_use]
    pub fn with_parts(config: ServerConfig, store: ResultStore, providers: ProviderRegistry) -> Self {
        Self {
            config,
            store,
            providers,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Time-ordered unique id for requests and artifacts
    #[must_use]
    pub fn new_request_id() -> String {
        Uuid::now_v7().to_string()
    }

    /// Store a raw upload under `/uploads`
    ///
    /// The client's extension is kept when it is short and alphanumeric, otherwise the
    /// detected format's extension is used.
    ///
    /// # Errors
    /// - `InvalidParameters` when the bytes are not a recognised image
    /// - Storage failures
    #[instrument(skip(self, image), fields(file = %image.file_name, bytes = image.size()))]
    pub async fn upload(&self, request_id: &str, image: &UploadedImage) -> Result<UploadOutcome> {
        let detected = ImageCodec::detect_format(&image.data).ok_or_else(|| {
            ImagingError::invalid_parameters(format!(
                "Uploaded file '{}' is not a supported image",
                image.file_name
            ))
        })?;

        let extension = sanitized_extension(&image.file_name).unwrap_or_else(|| {
            detected
                .extensions_str()
                .first()
                .copied()
                .unwrap_or("bin")
                .to_string()
        });

        let artifact = self
            .store
            .persist_upload(request_id, &extension, &image.data)
            .await?;
        log::info!("Stored upload {} ({} bytes)", artifact.file_name, artifact.size_bytes);

        Ok(UploadOutcome {
            artifact,
            original_name: image.file_name.clone(),
            mime_type: detected.to_mime_type().to_string(),
        })
    }

    /// Remove the background with the selected provider and persist `<prefix>-<id>.png`
    ///
    /// Intermediate files are released on every path, and nothing is persisted on failure.
    ///
    /// # Errors
    /// - `ProviderNotConfigured` for a provider without credentials
    /// - Any provider failure, unchanged
    /// - Storage failures
    pub async fn remove_background(
        &self,
        request_id: &str,
        kind: ProviderKind,
        image: UploadedImage,
        environment: ApiEnvironment,
    ) -> Result<RemovalOutcome> {
        let provider = self.providers.get(kind)?;
        let original_size = image.size();
        let input = RemovalInput::new(request_id, image).with_environment(environment);

        let TrackedRemoval {
            output,
            mut job,
            span,
        } = remove_tracked(provider.as_ref(), &input).await?;

        let artifact = self
            .store
            .persist_processed(
                kind.artifact_prefix(),
                request_id,
                OutputFormatHandler::get_extension(OutputFormat::Png),
                &output.image,
            )
            .await?;
        job.succeed();

        let total = job.elapsed();
        span.in_scope(|| {
            tracing::info!(
                elapsed_ms = total.as_millis() as u64,
                artifact = %artifact.file_name,
                "Background removal completed"
            );
        });

        Ok(RemovalOutcome {
            processed_size: output.image.len(),
            artifact,
            provider: kind,
            timings: output.timings,
            total,
            credits_remaining: output.credits_remaining,
            model_version: output.model_version,
            original_size,
        })
    }

    /// Validate, apply and persist a single image transform
    ///
    /// Parameters are validated before the image is decoded.
    ///
    /// # Errors
    /// - `InvalidParameters` for bad parameters
    /// - `TransformFailure` when the image cannot be processed
    /// - Storage failures
    #[instrument(skip(self, image, request), fields(operation = %request.kind, bytes = image.size()))]
    pub async fn transform(
        &self,
        request_id: &str,
        image: &UploadedImage,
        request: &TransformRequest,
    ) -> Result<TransformOutcome> {
        let validated = ImageTransformGateway::validate(request)?;
        let start = Instant::now();

        let data = image.data.clone();
        let encoded = run_blocking(move || ImageTransformGateway::apply(&data, &validated)).await?;

        self.persist_transform(request_id, request.kind, image.size(), encoded.data, encoded.format, start)
            .await
    }

    /// Place a product onto a lifestyle background and persist the composite
    ///
    /// # Errors
    /// - `TransformFailure` when either image cannot be decoded
    /// - Storage failures
    #[instrument(skip(self, product, background), fields(product_bytes = product.size(), background_bytes = background.size()))]
    pub async fn create_lifestyle(
        &self,
        request_id: &str,
        product: &UploadedImage,
        background: &UploadedImage,
    ) -> Result<TransformOutcome> {
        let start = Instant::now();
        let product_data = product.data.clone();
        let background_data = background.data.clone();
        let encoded = run_blocking(move || {
            ImageTransformGateway::composite_lifestyle(&product_data, &background_data)
        })
        .await?;

        self.persist_transform(
            request_id,
            OperationKind::CompositeLifestyle,
            product.size(),
            encoded.data,
            encoded.format,
            start,
        )
        .await
    }

    async fn persist_transform(
        &self,
        request_id: &str,
        kind: OperationKind,
        original_size: usize,
        data: Vec<u8>,
        format: OutputFormat,
        start: Instant,
    ) -> Result<TransformOutcome> {
        let artifact = self
            .store
            .persist_processed(
                kind.artifact_prefix(),
                request_id,
                OutputFormatHandler::get_extension(format),
                &data,
            )
            .await?;

        let processing_time = start.elapsed();
        tracing::info!(
            artifact = %artifact.file_name,
            original_size,
            processed_size = data.len(),
            elapsed_ms = processing_time.as_millis() as u64,
            "Transform completed"
        );

        Ok(TransformOutcome {
            artifact,
            kind,
            format,
            original_size,
            processed_size: data.len(),
            processing_time,
        })
    }

    /// Run a batch: every image through every operation, one artifact per image
    ///
    /// # Errors
    /// - `InvalidBatchRequest` for no images, too many images, a missing or
    ///   malformed operations list
    /// - The first per-image failure
    pub async fn batch(
        &self,
        batch_id: &str,
        images: Vec<UploadedImage>,
        operations: Option<&str>,
    ) -> Result<Vec<BatchItemResult>> {
        if images.is_empty() {
            return Err(ImagingError::invalid_batch("No images uploaded"));
        }
        if images.len() > self.config.max_batch_images {
            return Err(ImagingError::invalid_batch(format!(
                "Too many images: {} (maximum {})",
                images.len(),
                self.config.max_batch_images
            )));
        }
        let operations = operations
            .filter(|ops| !ops.trim().is_empty())
            .ok_or_else(|| ImagingError::invalid_batch("Missing operations field"))?;

        let plan = BatchPlan::parse(operations)?;
        BatchPipeline::new(&self.providers, &self.store)
            .run(batch_id, images, &plan)
            .await
    }
}

/// Lowercased client extension, if short and alphanumeric
fn sanitized_extension(file_name: &str) -> Option<String> {
    let (_, extension) = file_name.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    let valid = !extension.is_empty()
        && extension.len() <= MAX_EXTENSION_LEN
        && extension.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(extension)
}
