//! Route handlers
//!
//! Each handler runs inside a `request{request_id, endpoint}` span. The image field is
//! checked before any parameter so a request without an image is always answered with
//! `400 No image uploaded`.

use super::{
    error::ApiError,
    form::{FormData, MultipartBody},
    responses::{
        ArtifactResponse, AzureRemovalResponse, BatchResponse, OptimizeResponse,
        PhotoRoomRemovalResponse, RemovalResponse, UploadResponse,
    },
    AppState, Endpoint,
};
use crate::{
    error::Result,
    processor::{ImagingProcessor, TransformOutcome},
    providers::{ApiEnvironment, ProviderKind},
    tracing_config::spans,
    types::{OperationKind, TransformRequest},
};
use axum::{
    extract::State,
    Json,
};
use instant::Instant;
use std::future::Future;
use tracing::Instrument;

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Run one request under its span and map the outcome to a response
async fn run<T, F, Fut>(endpoint: Endpoint, work: F) -> ApiResult<T>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let request_id = ImagingProcessor::new_request_id();
    let span = spans::request(&request_id, endpoint.name());
    let start = Instant::now();

    let result = work(request_id.clone()).instrument(span.clone()).await;
    match result {
        Ok(body) => {
            span.in_scope(|| {
                tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "Request completed");
            });
            Ok(Json(body))
        },
        Err(e) => Err(ApiError::new(e, endpoint).with_request(&request_id, start.elapsed())),
    }
}

async fn collect(state: &AppState, multipart: MultipartBody) -> Result<FormData> {
    FormData::collect(multipart, state.processor.config().max_upload_bytes).await
}

async fn transform(
    state: &AppState,
    multipart: MultipartBody,
    request_id: &str,
    kind: OperationKind,
) -> Result<TransformOutcome> {
    let mut form = collect(state, multipart).await?;
    let image = form.take_file("image")?;
    let request = TransformRequest::new(kind, form.params());
    state.processor.transform(request_id, &image, &request).await
}

pub async fn upload(State(state): State<AppState>, multipart: MultipartBody) -> ApiResult<UploadResponse> {
    run(Endpoint::Upload, move |request_id| async move {
        let mut form = collect(&state, multipart).await?;
        let image = form.take_file("image")?;
        let outcome = state.processor.upload(&request_id, &image).await?;
        Ok(UploadResponse::from(outcome))
    })
    .await
}

pub async fn remove_background(
    State(state): State<AppState>,
    multipart: MultipartBody,
) -> ApiResult<RemovalResponse> {
    run(Endpoint::RemoveBackground, move |request_id| async move {
        let mut form = collect(&state, multipart).await?;
        let image = form.take_file("image")?;
        let outcome = state
            .processor
            .remove_background(&request_id, ProviderKind::Local, image, ApiEnvironment::default())
            .await?;
        Ok(RemovalResponse::from(outcome))
    })
    .await
}

pub async fn remove_background_azure(
    State(state): State<AppState>,
    multipart: MultipartBody,
) -> ApiResult<AzureRemovalResponse> {
    run(Endpoint::RemoveBackgroundAzure, move |request_id| async move {
        let mut form = collect(&state, multipart).await?;
        let image = form.take_file("image")?;
        let outcome = state
            .processor
            .remove_background(&request_id, ProviderKind::Azure, image, ApiEnvironment::default())
            .await?;
        Ok(AzureRemovalResponse::from(outcome))
    })
    .await
}

pub async fn remove_background_photoroom(
    State(state): State<AppState>,
    multipart: MultipartBody,
) -> ApiResult<PhotoRoomRemovalResponse> {
    run(Endpoint::RemoveBackgroundPhotoRoom, move |request_id| async move {
        let mut form = collect(&state, multipart).await?;
        let image = form.take_file("image")?;
        let environment = form
            .text("mode")
            .filter(|mode| !mode.trim().is_empty())
            .map(str::parse::<ApiEnvironment>)
            .transpose()?
            .unwrap_or_default();
        let outcome = state
            .processor
            .remove_background(&request_id, ProviderKind::PhotoRoom, image, environment)
            .await?;
        Ok(PhotoRoomRemovalResponse::from(outcome))
    })
    .await
}

pub async fn resize(State(state): State<AppState>, multipart: MultipartBody) -> ApiResult<ArtifactResponse> {
    run(Endpoint::Resize, move |request_id| async move {
        let outcome = transform(&state, multipart, &request_id, OperationKind::Resize).await?;
        Ok(ArtifactResponse::new(&outcome, "Image resized successfully"))
    })
    .await
}

pub async fn create_hero(
    State(state): State<AppState>,
    multipart: MultipartBody,
) -> ApiResult<ArtifactResponse> {
    run(Endpoint::CreateHero, move |request_id| async move {
        let outcome = transform(&state, multipart, &request_id, OperationKind::CompositeHero).await?;
        Ok(ArtifactResponse::new(&outcome, "Hero image created successfully"))
    })
    .await
}

pub async fn create_lifestyle(
    State(state): State<AppState>,
    multipart: MultipartBody,
) -> ApiResult<ArtifactResponse> {
    run(Endpoint::CreateLifestyle, move |request_id| async move {
        let mut form = collect(&state, multipart).await?;
        let product = form.take_file("product")?;
        let background = form.take_file("background")?;
        let outcome = state
            .processor
            .create_lifestyle(&request_id, &product, &background)
            .await?;
        Ok(ArtifactResponse::new(&outcome, "Lifestyle image created successfully"))
    })
    .await
}

pub async fn create_isometric(
    State(state): State<AppState>,
    multipart: MultipartBody,
) -> ApiResult<ArtifactResponse> {
    run(Endpoint::CreateIsometric, move |request_id| async move {
        let outcome = transform(&state, multipart, &request_id, OperationKind::Isometric).await?;
        Ok(ArtifactResponse::new(&outcome, "Isometric image created successfully"))
    })
    .await
}

pub async fn optimize(State(state): State<AppState>, multipart: MultipartBody) -> ApiResult<OptimizeResponse> {
    run(Endpoint::Optimize, move |request_id| async move {
        let outcome = transform(&state, multipart, &request_id, OperationKind::Optimize).await?;
        Ok(OptimizeResponse::from(outcome))
    })
    .await
}

pub async fn adjust(State(state): State<AppState>, multipart: MultipartBody) -> ApiResult<ArtifactResponse> {
    run(Endpoint::Adjust, move |request_id| async move {
        let outcome = transform(&state, multipart, &request_id, OperationKind::Adjust).await?;
        Ok(ArtifactResponse::new(&outcome, "Adjustments applied successfully"))
    })
    .await
}

pub async fn batch_process(
    State(state): State<AppState>,
    multipart: MultipartBody,
) -> ApiResult<BatchResponse> {
    run(Endpoint::BatchProcess, move |request_id| async move {
        let mut form = collect(&state, multipart).await?;
        let images = form.take_files("images");
        let results = state
            .processor
            .batch(&request_id, images, form.text("operations"))
            .await?;
        Ok(BatchResponse::from(results))
    })
    .await
}
