use crate::{
    error::Result,
    models::storage::{SideloadFile, StoredAsset},
};
use async_trait::async_trait;

/// The asset store that owns imported images.
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Takes ownership of the bytes at `file.path` (by copying them) and
    /// returns the new asset. The caller deletes `file.path` afterwards.
    async fn sideload(&self, file: SideloadFile<'_>) -> Result<StoredAsset>;

    async fn health_check(&self) -> Result<bool>;
}
