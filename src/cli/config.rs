//! Conversion of CLI arguments into the service configuration

use crate::cli::main_impl::Cli;
use crate::config::ServerConfig;
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to `ServerConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build and validate a `ServerConfig` from CLI arguments
    pub(crate) fn from_cli(cli: &Cli) -> Result<ServerConfig> {
        Self::validate_cli(cli)?;

        let mut builder = ServerConfig::builder()
            .host(cli.host.clone())
            .port(cli.port)
            .uploads_dir(cli.uploads_dir.clone())
            .processed_dir(cli.processed_dir.clone())
            .max_upload_bytes(cli.max_upload_bytes)
            .max_batch_images(cli.max_batch_images)
            .local_program(cli.rembg_path.clone())
            .local_timeout(Duration::from_secs(cli.rembg_timeout_secs))
            .azure(cli.azure_endpoint.clone(), cli.azure_key.clone())
            .azure_api_version(cli.azure_api_version.clone())
            .photoroom_endpoint(cli.photoroom_endpoint.clone())
            .photoroom_keys(
                cli.photoroom_sandbox_key.clone(),
                cli.photoroom_production_key.clone(),
            )
            .photoroom_model_version(cli.photoroom_model_version.clone())
            .cloud_timeout(Duration::from_secs(cli.cloud_timeout_secs));

        if !cli.rembg_args.is_empty() {
            builder = builder.local_args(cli.rembg_args.iter().cloned());
        }
        if let Some(dir) = &cli.work_dir {
            builder = builder.local_work_dir(dir.clone());
        }

        builder.build().context("Invalid server configuration")
    }

    /// Checks that clap cannot express
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.rembg_timeout_secs == 0 {
            anyhow::bail!("--rembg-timeout-secs must be greater than zero");
        }
        if cli.cloud_timeout_secs == 0 {
            anyhow::bail!("--cloud-timeout-secs must be greater than zero");
        }
        if cli.max_upload_bytes == 0 {
            anyhow::bail!("--max-upload-bytes must be greater than zero");
        }
        Ok(())
    }
}
