//! Local command-line removal provider
//!
//! The input is normalised to PNG and written to `temp-<id>.png`, the tool is run
//! against it with a wall-clock cutoff, and `temp-<id>-nobg.png` is read back.
//! Both temp files are released by a scope guard, so every exit path (error,
//! timeout, cancelled request) cleans up.

use super::{BackgroundRemovalProvider, ProviderKind, RemovalInput, RemovalOutput, RemovalTimings};
use crate::{
    config::LocalProviderConfig,
    error::{ImagingError, Result},
    services::{run_blocking, ImageCodec},
    types::IntermediateFiles,
};
use async_trait::async_trait;
use instant::{Duration, Instant};
use scopeguard::ScopeGuard;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

const PROVIDER: &str = "local";

/// Runs an external background removal executable
#[derive(Debug, Clone)]
pub struct LocalCliProvider {
    config: LocalProviderConfig,
    work_dir: PathBuf,
}

impl LocalCliProvider {
    #[must_use]
    pub fn new(config: LocalProviderConfig, work_dir: PathBuf) -> Self {
        Self { config, work_dir }
    }

    #[must_use]
    pub fn config(&self) -> &LocalProviderConfig {
        &self.config
    }

    fn files_for(&self, request_id: &str) -> IntermediateFiles {
        IntermediateFiles {
            input: self.work_dir.join(format!("temp-{request_id}.png")),
            output: self.work_dir.join(format!("temp-{request_id}-nobg.png")),
        }
    }

    /// Substitute `{input}` and `{output}` in the configured arguments
    fn command_args(&self, files: &IntermediateFiles) -> Vec<String> {
        let input = files.input.to_string_lossy();
        let output = files.output.to_string_lossy();
        self.config
            .args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }

    /// Run the tool once, enforcing the configured timeout
    async fn run_tool(&self, files: &IntermediateFiles, request_id: &str) -> Result<()> {
        let args = self.command_args(files);
        tracing::debug!(
            request_id,
            program = %self.config.program,
            args = ?args,
            "Starting background removal tool"
        );

        let child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ImagingError::ProviderExecutionError {
                provider: PROVIDER.to_string(),
                exit_code: None,
                stderr: format!("failed to start '{}': {}", self.config.program, e),
            })?;

        // On expiry the wait future is dropped, which kills the child
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ImagingError::ProviderTimeout {
                    provider: PROVIDER.to_string(),
                    timeout: self.config.timeout,
                });
            },
        };

        if !output.status.success() {
            return Err(ImagingError::ProviderExecutionError {
                provider: PROVIDER.to_string(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::trace!(request_id, stdout = %stdout.trim(), "Tool output");
        }
        Ok(())
    }

    /// Ask the tool for its version (`<program> --version`)
    ///
    /// # Errors
    /// - The tool cannot be started, exits non-zero, or exceeds `cutoff`
    pub async fn probe_version(&self, cutoff: Duration) -> Result<String> {
        let child = Command::new(&self.config.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ImagingError::ProviderExecutionError {
                provider: PROVIDER.to_string(),
                exit_code: None,
                stderr: format!("failed to start '{}': {}", self.config.program, e),
            })?;

        let output = tokio::time::timeout(cutoff, child.wait_with_output())
            .await
            .map_err(|_| ImagingError::ProviderTimeout {
                provider: PROVIDER.to_string(),
                timeout: cutoff,
            })??;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(ImagingError::ProviderExecutionError {
                provider: PROVIDER.to_string(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl BackgroundRemovalProvider for LocalCliProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn intermediate_files(&self, request_id: &str) -> Option<IntermediateFiles> {
        Some(self.files_for(request_id))
    }

    async fn remove_background(&self, input: &RemovalInput) -> Result<RemovalOutput> {
        let request_id = input.request_id.clone();
        let files = self.files_for(&request_id);
        let guard = scopeguard::guard(files, {
            let request_id = request_id.clone();
            move |files| files.remove_all(&request_id)
        });

        let preprocess_start = Instant::now();
        let data = input.image.data.clone();
        let png = run_blocking(move || ImageCodec::normalize_to_png(&data)).await?;
        tokio::fs::write(&guard.input, &png.data).await?;
        let preprocessing = preprocess_start.elapsed();

        let removal_start = Instant::now();
        self.run_tool(&guard, &request_id).await?;
        let image = match tokio::fs::read(&guard.output).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ImagingError::OutputMissing {
                    path: guard.output.display().to_string(),
                });
            },
            Err(e) => return Err(e.into()),
        };
        let removal = removal_start.elapsed();

        let cleanup_start = Instant::now();
        ScopeGuard::into_inner(guard).remove_all(&request_id);
        let cleanup = cleanup_start.elapsed();

        tracing::debug!(
            request_id = %request_id,
            preprocessing_ms = preprocessing.as_millis() as u64,
            removal_ms = removal.as_millis() as u64,
            cleanup_ms = cleanup.as_millis() as u64,
            output_bytes = image.len(),
            "Local background removal finished"
        );

        Ok(RemovalOutput {
            image,
            timings: RemovalTimings {
                preprocessing,
                removal,
                cleanup,
            },
            credits_remaining: None,
            model_version: None,
        })
    }
}
