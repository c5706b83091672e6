/// Media store collaborator
///
/// Profile handlers hand staged upload paths to the store and persist the
/// returned URL. The default implementation moves files into a local media
/// directory; object-storage backends implement the same trait.
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A stored media object
#[derive(Debug, Clone)]
pub struct MediaObject {
    pub url: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Move a staged upload into the store, returning its public URL
    async fn upload(&self, local_path: &Path) -> ApiResult<MediaObject>;
}

/// Local-disk media store
pub struct DiskMediaStore {
    root: PathBuf,
}

impl DiskMediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl MediaStore for DiskMediaStore {
    async fn upload(&self, local_path: &Path) -> ApiResult<MediaObject> {
        let extension = local_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let name = format!("{}.{}", Uuid::new_v4(), extension);

        tokio::fs::create_dir_all(&self.root).await?;

        let destination = self.root.join(&name);
        tokio::fs::copy(local_path, &destination)
            .await
            .map_err(|e| ApiError::Validation(format!("error while uploading file: {}", e)))?;

        // The staged file has served its purpose
        if let Err(e) = tokio::fs::remove_file(local_path).await {
            tracing::debug!("failed to remove staged upload {:?}: {}", local_path, e);
        }

        Ok(MediaObject {
            url: format!("/media/{}", name),
        })
    }
}
