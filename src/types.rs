//! Core data types flowing between the API, the transform gateway and the providers

use crate::{
    error::{ImagingError, Result},
    providers::ProviderKind,
    services::OutputFormat,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use instant::{Duration, Instant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// An image received in a multipart upload
///
/// Owned by the request that received it and dropped once the request completes.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Multipart field the file arrived in
    pub field: String,
    /// Original filename as declared by the client
    pub file_name: String,
    /// Declared MIME type
    pub mime_type: String,
    /// Raw file contents
    pub data: Bytes,
}

impl UploadedImage {
    pub fn new<S: Into<String>>(field: S, file_name: S, mime_type: S, data: Bytes) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Size of the upload in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Kind of transform an operation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Resize,
    Adjust,
    Optimize,
    #[serde(rename = "create-hero")]
    CompositeHero,
    #[serde(rename = "create-lifestyle")]
    CompositeLifestyle,
    #[serde(rename = "create-isometric")]
    Isometric,
    RemoveBackground,
}

impl OperationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resize => "resize",
            Self::Adjust => "adjust",
            Self::Optimize => "optimize",
            Self::CompositeHero => "create-hero",
            Self::CompositeLifestyle => "create-lifestyle",
            Self::Isometric => "create-isometric",
            Self::RemoveBackground => "remove-background",
        }
    }

    /// Filename prefix used for artifacts produced by this operation
    #[must_use]
    pub fn artifact_prefix(self) -> &'static str {
        match self {
            Self::Resize => "resized",
            Self::Adjust => "adjusted",
            Self::Optimize => "optimized",
            Self::CompositeHero => "hero",
            Self::CompositeLifestyle => "lifestyle",
            Self::Isometric => "isometric",
            Self::RemoveBackground => "nobg",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resize" => Ok(Self::Resize),
            "adjust" => Ok(Self::Adjust),
            "optimize" => Ok(Self::Optimize),
            "create-hero" | "composite-hero" | "hero" => Ok(Self::CompositeHero),
            "create-lifestyle" | "composite-lifestyle" | "lifestyle" => {
                Ok(Self::CompositeLifestyle)
            },
            "create-isometric" | "isometric" => Ok(Self::Isometric),
            "remove-background" => Ok(Self::RemoveBackground),
            other => Err(ImagingError::invalid_parameters(format!(
                "Unknown operation type '{other}'"
            ))),
        }
    }
}

/// A single named parameter as it arrives from a form field or a batch JSON entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

/// Named operation parameters with typed, validating accessors
///
/// Empty strings count as absent so that blank form fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformParams(BTreeMap<String, ParamValue>);

impl TransformParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with<K: Into<String>, V: Into<ParamValue>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<K: Into<String>, V: Into<ParamValue>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name).filter(|value| match value {
            ParamValue::Text(text) => !text.trim().is_empty(),
            _ => true,
        })
    }

    /// Text value of a parameter, numbers rendered without a trailing `.0`
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(|value| match value {
            ParamValue::Text(text) => text.trim().to_string(),
            ParamValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            ParamValue::Number(n) => n.to_string(),
            ParamValue::Bool(b) => b.to_string(),
        })
    }

    /// Numeric value of a parameter
    ///
    /// # Errors
    /// - Value present but not a finite number
    pub fn number(&self, name: &str) -> Result<Option<f64>> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let parsed = match value {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(text) => text.trim().parse::<f64>().ok(),
            ParamValue::Bool(_) => None,
        };
        match parsed {
            Some(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(ImagingError::invalid_parameters(format!(
                "Parameter '{name}' must be numeric"
            ))),
        }
    }

    /// Integer value of a parameter
    ///
    /// # Errors
    /// - Value present but not numeric, or numeric with a fractional part
    pub fn integer(&self, name: &str) -> Result<Option<i64>> {
        match self.number(name)? {
            None => Ok(None),
            Some(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Ok(Some(n as i64)),
            Some(n) => Err(ImagingError::invalid_parameters(format!(
                "Parameter '{name}' must be a whole number, got {n}"
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for TransformParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// An operation kind plus its raw parameters, validated per kind by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub kind: OperationKind,
    pub params: TransformParams,
}

impl TransformRequest {
    #[must_use]
    pub fn new(kind: OperationKind, params: TransformParams) -> Self {
        Self { kind, params }
    }
}

/// Encoded output of a transform together with the format it was encoded in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
}

impl EncodedImage {
    #[must_use]
    pub fn new(data: Vec<u8>, format: OutputFormat) -> Self {
        Self { data, format }
    }
}

/// A result written once to the result store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedArtifact {
    /// Unique filename inside the store
    pub file_name: String,
    /// Path under which the artifact is publicly served
    pub public_path: String,
    /// Location on disk
    #[serde(skip)]
    pub path: PathBuf,
    /// Size of the written file in bytes
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Input and output files the local provider exchanges with the external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateFiles {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl IntermediateFiles {
    /// Remove both files, logging (never propagating) failures
    ///
    /// A missing file is not a failure: the tool may not have produced output.
    pub fn remove_all(&self, request_id: &str) {
        for path in [&self.input, &self.output] {
            match std::fs::remove_file(path) {
                Ok(()) => {
                    tracing::debug!(request_id, path = %path.display(), "Removed intermediate file");
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => {
                    tracing::warn!(
                        request_id,
                        path = %path.display(),
                        error = %e,
                        "Failed to remove intermediate file"
                    );
                },
            }
        }
    }
}

/// Terminal state of a background removal job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Running,
    Succeeded,
    Failed(String),
}

/// Bookkeeping for one background removal call
#[derive(Debug, Clone)]
pub struct BackgroundRemovalJob {
    pub request_id: String,
    pub provider: ProviderKind,
    pub started_at: DateTime<Utc>,
    pub intermediate_files: Option<IntermediateFiles>,
    pub state: JobState,
    pub elapsed: Option<Duration>,
    start: Instant,
}

impl BackgroundRemovalJob {
    #[must_use]
    pub fn start(request_id: &str, provider: ProviderKind) -> Self {
        Self {
            request_id: request_id.to_string(),
            provider,
            started_at: Utc::now(),
            intermediate_files: None,
            state: JobState::Running,
            elapsed: None,
            start: Instant::now(),
        }
    }

    #[must_use]
    pub fn with_intermediate_files(mut self, files: Option<IntermediateFiles>) -> Self {
        self.intermediate_files = files;
        self
    }

    pub fn succeed(&mut self) {
        self.state = JobState::Succeeded;
        self.elapsed = Some(self.start.elapsed());
    }

    pub fn fail(&mut self, error: &ImagingError) {
        self.state = JobState::Failed(error.to_string());
        self.elapsed = Some(self.start.elapsed());
    }

    /// Elapsed time so far, or the final duration once terminal
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.start.elapsed())
    }
}
