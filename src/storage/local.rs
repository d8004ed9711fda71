use crate::{
    config::StorageConfig,
    error::{FluxError, Result},
    models::storage::{SideloadFile, StoredAsset},
    storage::traits::AssetStorage,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Keeps assets as plain files under a media directory.
pub struct LocalAssetStorage {
    media_dir: PathBuf,
    base_url: String,
}

impl LocalAssetStorage {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.media_dir)
            .await
            .map_err(|e| {
                FluxError::StorageError(format!(
                    "Unable to create media directory {}: {}",
                    config.media_dir.display(),
                    e
                ))
            })?;

        let storage = Self {
            media_dir: config.media_dir.clone(),
            base_url: config.media_base_url.trim_end_matches('/').to_string(),
        };

        storage.health_check().await?;

        Ok(storage)
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }
}

#[async_trait]
impl AssetStorage for LocalAssetStorage {
    async fn sideload(&self, file: SideloadFile<'_>) -> Result<StoredAsset> {
        let id = Uuid::new_v4().to_string();
        let stored_name = format!("{}-{}", id, file.file_name);
        let destination = self.media_dir.join(&stored_name);

        tokio::fs::copy(file.path, &destination)
            .await
            .map_err(|e| FluxError::StorageError(format!("Unable to store image: {}", e)))?;

        log::debug!("Stored asset {} at {}", id, destination.display());

        Ok(StoredAsset {
            id,
            url: format!("{}/{}", self.base_url, stored_name),
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let probe = self.media_dir.join(format!(".probe-{}", Uuid::new_v4()));
        tokio::fs::write(&probe, b"ok").await.map_err(|e| {
            FluxError::StorageError(format!(
                "Media directory {} is not writable: {}",
                self.media_dir.display(),
                e
            ))
        })?;
        tokio::fs::remove_file(&probe).await?;
        Ok(true)
    }
}
