//! Batch Pipeline
//!
//! Each uploaded image is folded through an ordered list of operations: the output of
//! step `i` is the input of step `i + 1`, and only the final buffer is persisted.
//! The operation list is parsed and validated before any image is touched. Entries
//! with an unknown or missing `type` are skipped with a warning.
//!
//! The first per-image failure aborts the batch. Artifacts already written by the
//! batch are discarded so a failed batch leaves nothing referenced behind.

use crate::{
    error::{ImagingError, Result},
    providers::{
        remove_tracked, ApiEnvironment, ProviderKind, ProviderRegistry, RemovalInput, TrackedRemoval,
    },
    services::{run_blocking, ImageCodec, OutputFormat, OutputFormatHandler, ResultStore},
    tracing_config::spans,
    transform::{ImageTransformGateway, ValidatedTransform},
    types::{OperationKind, ParamValue, ProcessedArtifact, TransformParams, TransformRequest, UploadedImage},
};
use bytes::Bytes;
use serde::Serialize;
use tracing::Instrument;

/// Filename prefix for batch artifacts
pub const BATCH_PREFIX: &str = "batch";

/// One validated step of a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchStep {
    Transform {
        kind: OperationKind,
        transform: ValidatedTransform,
    },
    RemoveBackground {
        provider: ProviderKind,
        environment: ApiEnvironment,
    },
}

impl BatchStep {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Transform { kind, .. } => *kind,
            Self::RemoveBackground { .. } => OperationKind::RemoveBackground,
        }
    }
}

/// The validated, ordered operation list of a batch request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchPlan {
    steps: Vec<BatchStep>,
    skipped: usize,
}

impl BatchPlan {
    /// Parse the `operations` JSON array
    ///
    /// # Errors
    /// - `InvalidBatchRequest` when the value is not a JSON array or a recognised
    ///   operation carries invalid parameters
    pub fn parse(operations: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(operations)
            .map_err(|e| ImagingError::invalid_batch(format!("operations is not valid JSON: {e}")))?;
        let entries = value
            .as_array()
            .ok_or_else(|| ImagingError::invalid_batch("operations must be a JSON array"))?;

        let mut plan = Self::default();
        for (index, entry) in entries.iter().enumerate() {
            match parse_step(index, entry)? {
                Some(step) => plan.steps.push(step),
                None => plan.skipped += 1,
            }
        }

        log::debug!(
            "Batch plan: {} step(s), {} skipped",
            plan.steps.len(),
            plan.skipped
        );
        Ok(plan)
    }

    #[must_use]
    pub fn steps(&self) -> &[BatchStep] {
        &self.steps
    }

    /// Number of entries ignored because their type is unknown
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

fn parse_step(index: usize, entry: &serde_json::Value) -> Result<Option<BatchStep>> {
    let Some(object) = entry.as_object() else {
        tracing::warn!(index, "Skipping batch operation that is not an object");
        return Ok(None);
    };
    let Some(type_name) = object.get("type").and_then(serde_json::Value::as_str) else {
        tracing::warn!(index, "Skipping batch operation without a type");
        return Ok(None);
    };

    let kind = match type_name.parse::<OperationKind>() {
        Ok(kind @ (OperationKind::Resize
        | OperationKind::Optimize
        | OperationKind::Adjust
        | OperationKind::RemoveBackground)) => kind,
        _ => {
            tracing::warn!(index, operation = type_name, "Skipping unsupported batch operation");
            return Ok(None);
        },
    };

    let mut params = TransformParams::new();
    for (key, value) in object {
        if key == "type" {
            continue;
        }
        let value = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::Bool(b) => ParamValue::Bool(*b),
            serde_json::Value::Number(n) => ParamValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => ParamValue::Text(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(ImagingError::invalid_batch(format!(
                    "operation {index} ({kind}): parameter '{key}' must be a string or number"
                )));
            },
        };
        params.insert(key.as_str(), value);
    }

    let step = if kind == OperationKind::RemoveBackground {
        let provider = params
            .text("provider")
            .map(|p| p.parse::<ProviderKind>())
            .transpose()
            .and_then(|p| {
                let environment = params
                    .text("mode")
                    .map(|m| m.parse::<ApiEnvironment>())
                    .transpose()?;
                Ok((p.unwrap_or(ProviderKind::Local), environment.unwrap_or_default()))
            });
        match provider {
            Ok((provider, environment)) => BatchStep::RemoveBackground {
                provider,
                environment,
            },
            Err(e) => return Err(batch_param_error(index, kind, &e)),
        }
    } else {
        let request = TransformRequest::new(kind, params);
        match ImageTransformGateway::validate(&request) {
            Ok(transform) => BatchStep::Transform { kind, transform },
            Err(e) => return Err(batch_param_error(index, kind, &e)),
        }
    };
    Ok(Some(step))
}

fn batch_param_error(index: usize, kind: OperationKind, err: &ImagingError) -> ImagingError {
    let message = match err {
        ImagingError::InvalidParameters(msg) => msg.clone(),
        other => other.to_string(),
    };
    ImagingError::invalid_batch(format!("operation {index} ({kind}): {message}"))
}

/// Outcome for one image of a batch, in input order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub original_name: String,
    pub processed_path: String,
    #[serde(skip)]
    pub artifact: ProcessedArtifact,
}

/// Runs a [`BatchPlan`] over uploaded images
pub struct BatchPipeline<'a> {
    providers: &'a ProviderRegistry,
    store: &'a ResultStore,
}

impl<'a> BatchPipeline<'a> {
    #[must_use]
    pub fn new(providers: &'a ProviderRegistry, store: &'a ResultStore) -> Self {
        Self { providers, store }
    }

    /// Process every image sequentially and persist one artifact per image
    ///
    /// # Errors
    /// - `InvalidBatchRequest` when `images` is empty
    /// - The first transform, provider or storage error; earlier artifacts are discarded
    pub async fn run(
        &self,
        batch_id: &str,
        images: Vec<UploadedImage>,
        plan: &BatchPlan,
    ) -> Result<Vec<BatchItemResult>> {
        if images.is_empty() {
            return Err(ImagingError::invalid_batch("No images uploaded"));
        }

        let span = spans::batch(batch_id, images.len(), plan.steps().len());

        async move {
            let mut results: Vec<BatchItemResult> = Vec::with_capacity(images.len());
            for (index, image) in images.into_iter().enumerate() {
                match self.process_one(batch_id, index, image, plan).await {
                    Ok(result) => results.push(result),
                    Err(e) => {
                        tracing::error!(index, error = %e, "Batch item failed, aborting batch");
                        for written in &results {
                            self.store.discard(&written.artifact).await;
                        }
                        return Err(e);
                    },
                }
            }
            tracing::info!(processed = results.len(), "Batch completed");
            Ok(results)
        }
        .instrument(span)
        .await
    }

    async fn process_one(
        &self,
        batch_id: &str,
        index: usize,
        image: UploadedImage,
        plan: &BatchPlan,
    ) -> Result<BatchItemResult> {
        let original_name = image.file_name.clone();
        let mut data: Vec<u8> = image.data.to_vec();
        let mut format: Option<OutputFormat> =
            ImageCodec::detect_format(&data).and_then(OutputFormatHandler::from_image_format);

        for step in plan.steps() {
            tracing::debug!(index, operation = %step.kind(), "Applying batch operation");
            match step {
                BatchStep::Transform { transform, .. } => {
                    let transform = transform.clone();
                    let input = std::mem::take(&mut data);
                    let output =
                        run_blocking(move || ImageTransformGateway::apply(&input, &transform)).await?;
                    format = Some(output.format);
                    data = output.data;
                },
                BatchStep::RemoveBackground {
                    provider,
                    environment,
                } => {
                    let provider = self.providers.get(*provider)?;
                    let mime = ImageCodec::mime_type_of(&data);
                    let input = RemovalInput::new(
                        format!("{batch_id}-{index}"),
                        UploadedImage::new(
                            image.field.as_str(),
                            original_name.as_str(),
                            mime,
                            Bytes::from(std::mem::take(&mut data)),
                        ),
                    )
                    .with_environment(*environment);
                    let TrackedRemoval {
                        output,
                        mut job,
                        span,
                    } = remove_tracked(provider.as_ref(), &input).await?;
                    job.succeed();
                    span.in_scope(|| {
                        tracing::debug!(
                            elapsed_ms = job.elapsed().as_millis() as u64,
                            "Batch background removal finished"
                        );
                    });
                    format = Some(OutputFormat::Png);
                    data = output.image;
                },
            }
        }

        let format = match format {
            Some(format) => format,
            None => {
                // Input format we cannot re-emit as-is
                let input = std::mem::take(&mut data);
                let png = run_blocking(move || ImageCodec::normalize_to_png(&input)).await?;
                data = png.data;
                png.format
            },
        };

        let artifact = self
            .store
            .persist_processed(
                BATCH_PREFIX,
                &format!("{batch_id}-{index}"),
                OutputFormatHandler::get_extension(format),
                &data,
            )
            .await?;

        Ok(BatchItemResult {
            original_name,
            processed_path: artifact.public_path.clone(),
            artifact,
        })
    }
}
