//! Test utilities and mock providers
//!
//! [`MockProvider`] stands in for any of the three providers so orchestration and
//! batch logic can be tested without external tools or network access.

use super::{BackgroundRemovalProvider, ProviderKind, RemovalInput, RemovalOutput};
use crate::{
    error::{ImagingError, Result},
    services::ImageCodec,
    types::IntermediateFiles,
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Mock removal provider that records calls and echoes its input as PNG
#[derive(Debug, Clone)]
pub struct MockProvider {
    kind: ProviderKind,
    /// Request ids seen, in call order
    call_history: Arc<Mutex<Vec<String>>>,
    /// Whether to simulate a provider failure
    should_fail: bool,
    credits_remaining: Option<String>,
    /// When set, each call writes an input file here before answering
    work_dir: Option<PathBuf>,
}

impl MockProvider {
    #[must_use]
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            call_history: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
            credits_remaining: None,
            work_dir: None,
        }
    }

    /// Create a mock provider whose calls always fail
    #[must_use]
    pub fn new_failing(kind: ProviderKind) -> Self {
        let mut provider = Self::new(kind);
        provider.should_fail = true;
        provider
    }

    #[must_use]
    pub fn with_credits(mut self, credits: &str) -> Self {
        self.credits_remaining = Some(credits.to_string());
        self
    }

    /// Leave per-request temp files in `dir`, like the local provider does
    #[must_use]
    pub fn with_work_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackgroundRemovalProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn intermediate_files(&self, request_id: &str) -> Option<IntermediateFiles> {
        self.work_dir.as_ref().map(|dir| IntermediateFiles {
            input: dir.join(format!("mock-{request_id}.png")),
            output: dir.join(format!("mock-{request_id}-out.png")),
        })
    }

    async fn remove_background(&self, input: &RemovalInput) -> Result<RemovalOutput> {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(input.request_id.clone());
        }

        if let Some(files) = self.intermediate_files(&input.request_id) {
            std::fs::write(&files.input, &input.image.data)?;
        }

        if self.should_fail {
            return Err(ImagingError::provider_response(
                self.kind.as_str(),
                500,
                "mock provider failure",
            ));
        }

        let png = ImageCodec::normalize_to_png(&input.image.data)?;
        Ok(RemovalOutput {
            image: png.data,
            credits_remaining: self.credits_remaining.clone(),
            ..RemovalOutput::default()
        })
    }
}
