#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Product Studio
//!
//! An HTTP service that turns raw product photos into eCommerce-ready assets: background
//! removal through a local tool or one of two cloud providers, resizing, banner and
//! lifestyle composites, isometric previews, optimization, tonal adjustments and batch
//! pipelines.
//!
//! Every route accepts a multipart upload, writes its result into the processed store and
//! answers with JSON describing the artifact.
//!
//! ## Features
//!
//! - **Three removal providers**: local `rembg`-style CLI, Azure Computer Vision segmentation
//!   and PhotoRoom (sandbox or production keys)
//! - **Pure Rust transforms**: resize with fit modes, hero banners, lifestyle composites,
//!   isometric previews, brightness/contrast/saturation/sharpness adjustments
//! - **Output formats**: JPEG, PNG, WebP and AVIF
//! - **Batch pipelines**: an ordered list of operations applied to up to ten images
//! - **CLI Integration**: server binary with environment fallbacks (enable with `cli` feature)
//!
//! ## Embedding the router
//!
//! ```rust,no_run
//! use product_studio::{Application, ServerConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::builder()
//!     .port(8080)
//!     .uploads_dir("/var/lib/studio/uploads")
//!     .processed_dir("/var/lib/studio/processed")
//!     .build()?;
//!
//! let app = Application::new(config)?;
//! app.serve(product_studio::server::shutdown_signal()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Library-only usage
//!
//! ```rust,no_run
//! use product_studio::{ImagingProcessor, OperationKind, ServerConfig, TransformParams, TransformRequest};
//!
//! # async fn example(bytes: Vec<u8>) -> anyhow::Result<()> {
//! let processor = ImagingProcessor::new(ServerConfig::default())?;
//! let image = product_studio::UploadedImage::new("image", "shoe.jpg", "image/jpeg", bytes.into());
//! let mut params = TransformParams::default();
//! params.insert("width", "400");
//! let request = TransformRequest::new(OperationKind::Resize, params);
//! let outcome = processor
//!     .transform(&ImagingProcessor::new_request_id(), &image, &request)
//!     .await?;
//! println!("{}", outcome.artifact.public_path);
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): `product-studio` server binary with argument parsing and log setup
//! - `tracing-json`: JSON log output
//! - `tracing-files`: daily-rotated log files

pub mod api;
pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod processor;
pub mod providers;
pub mod server;
pub mod services;
pub mod tracing_config;
pub mod transform;
pub mod types;

pub use api::{router, AppState, Endpoint};
pub use batch::{BatchItemResult, BatchPlan, BatchStep};
pub use config::{AzureConfig, LocalProviderConfig, PhotoRoomConfig, ServerConfig, ServerConfigBuilder};
pub use error::{ImagingError, Result};
pub use processor::{ImagingProcessor, RemovalOutcome, TransformOutcome, UploadOutcome};
pub use providers::{
    ApiEnvironment, AzureProvider, BackgroundRemovalProvider, LocalCliProvider, PhotoRoomProvider,
    ProviderKind, ProviderRegistry, RemovalInput, RemovalOutput,
};
pub use server::Application;
pub use services::{ImageCodec, OutputFormat, ResultStore};
pub use tracing_config::{spans, TracingConfig, TracingFormat, TracingGuard, TracingOutput};
pub use transform::{ImageTransformGateway, ValidatedTransform};
pub use types::{
    EncodedImage, OperationKind, ParamValue, ProcessedArtifact, TransformParams, TransformRequest,
    UploadedImage,
};
