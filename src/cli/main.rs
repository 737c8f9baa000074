//! Product studio server
//!
//! Parses arguments (with environment fallbacks), initialises tracing, probes the local
//! removal tool and serves the HTTP API until Ctrl+C or SIGTERM.

use super::config::CliConfigBuilder;
use crate::{
    config::ServerConfig,
    providers::LocalCliProvider,
    server::{shutdown_signal, Application},
    tracing_config::{TracingConfig, TracingFormat, TracingGuard},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Cutoff for the startup `--version` probe of the local tool
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP service for eCommerce product images
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(name = "product-studio")]
pub struct Cli {
    /// Interface to bind
    #[arg(long, env = "PRODUCT_STUDIO_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Directory for raw uploads
    #[arg(long, env = "PRODUCT_STUDIO_UPLOADS_DIR", default_value = "uploads")]
    pub uploads_dir: PathBuf,

    /// Directory for processed artifacts
    #[arg(long, env = "PRODUCT_STUDIO_PROCESSED_DIR", default_value = "processed")]
    pub processed_dir: PathBuf,

    /// Per-file upload limit in bytes
    #[arg(long, env = "PRODUCT_STUDIO_MAX_UPLOAD_BYTES", default_value_t = crate::config::DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Maximum number of images per batch request
    #[arg(long, env = "PRODUCT_STUDIO_MAX_BATCH_IMAGES", default_value_t = crate::config::DEFAULT_MAX_BATCH_IMAGES)]
    pub max_batch_images: usize,

    /// Local background removal executable
    #[arg(long, env = "REMBG_PATH", default_value = "rembg")]
    pub rembg_path: String,

    /// Arguments for the local tool; `{input}` and `{output}` are substituted
    #[arg(long = "rembg-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub rembg_args: Vec<String>,

    /// Cutoff for one local tool invocation, in seconds
    #[arg(long, env = "REMBG_TIMEOUT_SECS", default_value_t = 30)]
    pub rembg_timeout_secs: u64,

    /// Directory for the local tool's temp files [default: uploads directory]
    #[arg(long, env = "PRODUCT_STUDIO_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Azure Computer Vision endpoint
    #[arg(long, env = "AZURE_VISION_ENDPOINT")]
    pub azure_endpoint: Option<String>,

    /// Azure Computer Vision subscription key
    #[arg(long, env = "AZURE_VISION_KEY", hide_env_values = true)]
    pub azure_key: Option<String>,

    /// Azure segmentation API version
    #[arg(long, env = "AZURE_VISION_API_VERSION", default_value = "2023-02-01-preview")]
    pub azure_api_version: String,

    /// PhotoRoom edit endpoint
    #[arg(long, env = "PHOTOROOM_ENDPOINT", default_value = "https://image-api.photoroom.com/v2/edit")]
    pub photoroom_endpoint: String,

    /// PhotoRoom sandbox API key
    #[arg(long, env = "PHOTOROOM_SANDBOX_KEY", hide_env_values = true)]
    pub photoroom_sandbox_key: Option<String>,

    /// PhotoRoom production API key
    #[arg(long, env = "PHOTOROOM_PRODUCTION_KEY", hide_env_values = true)]
    pub photoroom_production_key: Option<String>,

    /// PhotoRoom background removal model version
    #[arg(long, env = "PHOTOROOM_MODEL_VERSION", default_value = "2024-09-26")]
    pub photoroom_model_version: String,

    /// Request timeout for both cloud providers, in seconds
    #[arg(long, env = "PRODUCT_STUDIO_CLOUD_TIMEOUT_SECS", default_value_t = 60)]
    pub cloud_timeout_secs: u64,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, env = "PRODUCT_STUDIO_LOG_FORMAT", default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Also write logs to this file (rotated daily)
    #[cfg(feature = "tracing-files")]
    #[arg(long, env = "PRODUCT_STUDIO_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Skip the startup probe of the local tool
    #[arg(long)]
    pub no_probe: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    pub validate: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CliConfigBuilder::from_cli(&cli).context("Invalid configuration")?;
    if cli.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    let _guard = init_tracing(&cli).context("Failed to initialize tracing")?;
    tracing::debug!(
        host = %config.host,
        port = config.port,
        local_program = %config.local.program,
        "Loaded configuration"
    );

    if !cli.no_probe {
        probe_local_tool(&config).await;
    }

    let app = Application::new(config).context("Failed to start application")?;
    app.serve(shutdown_signal()).await.context("Server error")?;
    Ok(())
}

fn init_tracing(cli: &Cli) -> Result<TracingGuard> {
    let format = match cli.log_format {
        CliLogFormat::Console => TracingFormat::Console,
        CliLogFormat::Compact => TracingFormat::Compact,
        #[cfg(feature = "tracing-json")]
        CliLogFormat::Json => TracingFormat::Json,
    };

    #[allow(unused_mut)]
    let mut config = TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(format)
        .with_session_id(uuid::Uuid::new_v4().to_string());

    #[cfg(feature = "tracing-files")]
    if let Some(path) = &cli.log_file {
        config = config.with_output(crate::tracing_config::TracingOutput::Both(path.clone()));
    }

    config.init()
}

/// Check that the local tool answers; the server starts either way
async fn probe_local_tool(config: &ServerConfig) {
    let provider = LocalCliProvider::new(config.local.clone(), config.local_work_dir());
    match provider.probe_version(PROBE_TIMEOUT).await {
        Ok(version) => {
            tracing::info!(program = %config.local.program, version = %version, "Local removal tool available");
        },
        Err(e) => {
            tracing::warn!(
                program = %config.local.program,
                error = %e,
                "Local removal tool not available; /api/remove-background will fail until it is installed"
            );
        },
    }
}
