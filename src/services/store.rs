//! Write-once result store
//!
//! Processed artifacts and raw uploads live in two flat directories on disk. Each file
//! is written under a fresh unique name and never modified afterwards; serving them is
//! left to whatever static file server fronts the service.

use crate::{
    error::{ImagingError, Result},
    types::ProcessedArtifact,
};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Public URL prefix for processed artifacts
pub const PROCESSED_PREFIX: &str = "/processed";
/// Public URL prefix for raw uploads
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Filesystem-backed store for processed images and uploads
#[derive(Debug, Clone)]
pub struct ResultStore {
    processed_dir: PathBuf,
    uploads_dir: PathBuf,
}

impl ResultStore {
    /// Open the store, creating both directories if needed
    ///
    /// # Errors
    /// - Either directory cannot be created
    pub fn open<P: Into<PathBuf>, Q: Into<PathBuf>>(processed_dir: P, uploads_dir: Q) -> Result<Self> {
        let processed_dir = processed_dir.into();
        let uploads_dir = uploads_dir.into();

        for dir in [&processed_dir, &uploads_dir] {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    ImagingError::internal(format!(
                        "Failed to create store directory '{}': {}",
                        dir.display(),
                        e
                    ))
                })?;
                log::info!("Created store directory {}", dir.display());
            }
        }

        Ok(Self {
            processed_dir,
            uploads_dir,
        })
    }

    #[must_use]
    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    #[must_use]
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Build the artifact filename `<prefix>-<id>.<extension>`
    #[must_use]
    pub fn artifact_name(prefix: &str, id: &str, extension: &str) -> String {
        format!("{prefix}-{id}.{extension}")
    }

    /// Persist a processed result under `/processed/<prefix>-<id>.<extension>`
    ///
    /// # Errors
    /// - The file cannot be written or renamed into place
    pub async fn persist_processed(
        &self,
        prefix: &str,
        id: &str,
        extension: &str,
        data: &[u8],
    ) -> Result<ProcessedArtifact> {
        let file_name = Self::artifact_name(prefix, id, extension);
        write_atomic(&self.processed_dir, &file_name, data).await?;
        Ok(artifact(&self.processed_dir, PROCESSED_PREFIX, file_name, data.len()))
    }

    /// Persist a raw upload under `/uploads/<id>.<extension>`
    ///
    /// # Errors
    /// - The file cannot be written or renamed into place
    pub async fn persist_upload(
        &self,
        id: &str,
        extension: &str,
        data: &[u8],
    ) -> Result<ProcessedArtifact> {
        let file_name = format!("{id}.{extension}");
        write_atomic(&self.uploads_dir, &file_name, data).await?;
        Ok(artifact(&self.uploads_dir, UPLOADS_PREFIX, file_name, data.len()))
    }

    /// Remove an artifact that must not be referenced after all (best-effort)
    pub async fn discard(&self, artifact: &ProcessedArtifact) {
        if let Err(e) = tokio::fs::remove_file(&artifact.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %artifact.path.display(),
                    error = %e,
                    "Failed to discard artifact"
                );
            }
        } else {
            tracing::debug!(file = %artifact.file_name, "Discarded artifact");
        }
    }
}

fn artifact(dir: &Path, public_prefix: &str, file_name: String, size: usize) -> ProcessedArtifact {
    ProcessedArtifact {
        public_path: format!("{public_prefix}/{file_name}"),
        path: dir.join(&file_name),
        file_name,
        size_bytes: size as u64,
        created_at: Utc::now(),
    }
}

/// Write into a hidden partial file, then rename it into place
async fn write_atomic(dir: &Path, file_name: &str, data: &[u8]) -> Result<()> {
    let target = dir.join(file_name);
    let partial = dir.join(format!(".{file_name}.partial"));

    if let Err(e) = tokio::fs::write(&partial, data).await {
        remove_partial(&partial).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&partial, &target).await {
        remove_partial(&partial).await;
        return Err(e.into());
    }

    log::debug!("Persisted {} ({} bytes)", target.display(), data.len());
    Ok(())
}

async fn remove_partial(partial: &Path) {
    if let Err(e) = tokio::fs::remove_file(partial).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %partial.display(), error = %e, "Failed to remove partial file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ResultStore) {
        let dir = TempDir::new().unwrap();
        let store =
            ResultStore::open(dir.path().join("processed"), dir.path().join("uploads")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_directories() {
        let (_dir, store) = store();
        assert!(store.processed_dir().is_dir());
        assert!(store.uploads_dir().is_dir());
    }

    #[tokio::test]
    async fn test_persist_processed() {
        let (_dir, store) = store();
        let artifact = store
            .persist_processed("resized", "abc", "png", b"pixels")
            .await
            .unwrap();

        assert_eq!(artifact.file_name, "resized-abc.png");
        assert_eq!(artifact.public_path, "/processed/resized-abc.png");
        assert_eq!(artifact.size_bytes, 6);
        assert_eq!(std::fs::read(&artifact.path).unwrap(), b"pixels");

        let leftovers: Vec<_> = std::fs::read_dir(store.processed_dir())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_persist_upload_and_discard() {
        let (_dir, store) = store();
        let artifact = store.persist_upload("xyz", "jpg", b"jpeg").await.unwrap();
        assert_eq!(artifact.public_path, "/uploads/xyz.jpg");
        assert!(artifact.path.exists());

        store.discard(&artifact).await;
        assert!(!artifact.path.exists());

        // Discarding twice is harmless
        store.discard(&artifact).await;
    }

    #[tokio::test]
    async fn test_write_failure_is_io_error() {
        let (dir, store) = store();
        std::fs::remove_dir_all(dir.path().join("processed")).unwrap();

        let result = store.persist_processed("resized", "abc", "png", b"x").await;
        assert!(matches!(result, Err(ImagingError::Io(_))));
    }
}
