//! HTTP surface
//!
//! Every route is a `POST` taking `multipart/form-data`. Handlers collect the form,
//! hand the files to [`ImagingProcessor`] and wrap the outcome in the endpoint's JSON
//! envelope. Failures become [`ApiError`] responses.

pub mod error;
pub mod form;
pub mod handlers;
pub mod responses;

use crate::processor::ImagingProcessor;
use axum::{extract::DefaultBodyLimit, routing::post, Router};
use std::fmt;
use std::sync::Arc;

pub use error::{ApiError, ErrorBody};
pub use form::FormData;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub processor: Arc<ImagingProcessor>,
}

impl AppState {
    #[must_use]
    pub fn new(processor: ImagingProcessor) -> Self {
        Self {
            processor: Arc::new(processor),
        }
    }
}

/// The routes the service exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Upload,
    RemoveBackground,
    RemoveBackgroundAzure,
    RemoveBackgroundPhotoRoom,
    Resize,
    CreateHero,
    CreateLifestyle,
    CreateIsometric,
    Optimize,
    Adjust,
    BatchProcess,
}

impl Endpoint {
    /// Short name used in logs and spans
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::RemoveBackground => "remove-background",
            Self::RemoveBackgroundAzure => "remove-background-azure",
            Self::RemoveBackgroundPhotoRoom => "remove-background-photoroom",
            Self::Resize => "resize",
            Self::CreateHero => "create-hero",
            Self::CreateLifestyle => "create-lifestyle",
            Self::CreateIsometric => "create-isometric",
            Self::Optimize => "optimize",
            Self::Adjust => "adjust",
            Self::BatchProcess => "batch-process",
        }
    }

    #[must_use]
    pub fn path(self) -> String {
        format!("/api/{}", self.name())
    }

    /// Top-level message of a 5xx response
    #[must_use]
    pub fn failure_summary(self) -> &'static str {
        match self {
            Self::Upload => "Failed to store upload",
            Self::RemoveBackground => "Failed to process image",
            Self::RemoveBackgroundAzure => "Failed to process image with Azure",
            Self::RemoveBackgroundPhotoRoom => "Failed to process image with PhotoRoom",
            Self::Resize => "Failed to resize image",
            Self::CreateHero => "Failed to create hero image",
            Self::CreateLifestyle => "Failed to create lifestyle image",
            Self::CreateIsometric => "Failed to create isometric image",
            Self::Optimize => "Failed to optimize image",
            Self::Adjust => "Failed to apply adjustments",
            Self::BatchProcess => "Failed to process batch",
        }
    }

    #[must_use]
    pub fn all() -> [Self; 11] {
        [
            Self::Upload,
            Self::RemoveBackground,
            Self::RemoveBackgroundAzure,
            Self::RemoveBackgroundPhotoRoom,
            Self::Resize,
            Self::CreateHero,
            Self::CreateLifestyle,
            Self::CreateIsometric,
            Self::Optimize,
            Self::Adjust,
            Self::BatchProcess,
        ]
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.processor.config().body_limit();

    Router::new()
        .route(&Endpoint::Upload.path(), post(handlers::upload))
        .route(&Endpoint::RemoveBackground.path(), post(handlers::remove_background))
        .route(
            &Endpoint::RemoveBackgroundAzure.path(),
            post(handlers::remove_background_azure),
        )
        .route(
            &Endpoint::RemoveBackgroundPhotoRoom.path(),
            post(handlers::remove_background_photoroom),
        )
        .route(&Endpoint::Resize.path(), post(handlers::resize))
        .route(&Endpoint::CreateHero.path(), post(handlers::create_hero))
        .route(&Endpoint::CreateLifestyle.path(), post(handlers::create_lifestyle))
        .route(&Endpoint::CreateIsometric.path(), post(handlers::create_isometric))
        .route(&Endpoint::Optimize.path(), post(handlers::optimize))
        .route(&Endpoint::Adjust.path(), post(handlers::adjust))
        .route(&Endpoint::BatchProcess.path(), post(handlers::batch_process))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
