pub mod download;
pub mod local;
pub mod traits;

use crate::{
    config::StorageConfig,
    error::{FluxError, Result},
    models::storage::{SideloadFile, StoredAsset},
};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;

pub use local::LocalAssetStorage;
pub use traits::AssetStorage;

/// Front door to the asset store: turns a remote image reference into a
/// stored asset.
pub struct AssetStorageManager {
    backend: Arc<dyn AssetStorage>,
    http: Client,
    temp_dir: Option<PathBuf>,
}

impl AssetStorageManager {
    pub fn new(backend: Arc<dyn AssetStorage>) -> Self {
        Self {
            backend,
            http: Client::new(),
            temp_dir: None,
        }
    }

    /// Local filesystem backend configured from `config`.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        let backend = LocalAssetStorage::new(config).await?;
        let mut manager = Self::new(Arc::new(backend));
        manager.temp_dir = config.temp_dir.clone();
        Ok(manager)
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn storage(&self) -> &Arc<dyn AssetStorage> {
        &self.backend
    }

    /// Downloads `reference` into a temporary file, hands it to the backend
    /// and deletes the temporary file on every exit path.
    pub async fn import_from_url(&self, reference: &str) -> Result<StoredAsset> {
        let temp = self.temp_file()?;

        {
            let mut file = tokio::fs::File::create(temp.path()).await?;
            download::download_to(&self.http, reference, &mut file)
                .await
                .map_err(|e| FluxError::StorageError(format!("Failed to download image: {}", e)))?;
        }

        let file_name = download::file_name_from_reference(reference);
        let asset = self
            .backend
            .sideload(SideloadFile {
                file_name: &file_name,
                path: temp.path(),
            })
            .await;

        if let Err(e) = temp.close() {
            log::warn!("⚠️  Failed to remove temporary download: {}", e);
        }

        let asset = asset?;
        log::info!("🖼️  Imported asset {} from remote reference", asset.id);
        Ok(asset)
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }

    fn temp_file(&self) -> Result<NamedTempFile> {
        let temp = match &self.temp_dir {
            Some(dir) => tempfile::Builder::new()
                .prefix("flux-download-")
                .tempfile_in(dir),
            None => tempfile::Builder::new().prefix("flux-download-").tempfile(),
        };
        temp.map_err(|e| FluxError::StorageError(format!("Unable to create temporary file: {}", e)))
    }
}
