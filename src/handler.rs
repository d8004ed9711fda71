use crate::{
    config::ConfigStore,
    error::HandlerError,
    flux::ImageClient,
    logger,
    models::{CallerIdentity, Capability, RawInput, SuccessResponse},
    storage::AssetStorageManager,
    validation,
};
use reqwest::Client;
use std::sync::Arc;

/// Orchestrates one generation request from caller input to stored asset.
///
/// Holds no per-request state; concurrent calls are independent.
pub struct GenerationHandler {
    config_store: Arc<dyn ConfigStore>,
    storage: Arc<AssetStorageManager>,
    http: Client,
}

impl GenerationHandler {
    pub fn new(config_store: Arc<dyn ConfigStore>, storage: Arc<AssetStorageManager>) -> Self {
        Self {
            config_store,
            storage,
            http: Client::new(),
        }
    }

    pub fn storage(&self) -> &Arc<AssetStorageManager> {
        &self.storage
    }

    pub async fn handle(
        &self,
        caller: &CallerIdentity,
        raw: &RawInput,
    ) -> Result<SuccessResponse, HandlerError> {
        let _timer = logger::timer("generate_image");

        if !caller.can(Capability::Upload) {
            log::warn!(
                "⚠️  Image generation refused for caller {}",
                caller.user_id.as_deref().unwrap_or("anonymous")
            );
            return Err(HandlerError::PermissionDenied);
        }

        let request = validation::validate(raw)?;

        let service = self
            .config_store
            .service_config()
            .ok_or(HandlerError::NotConfigured)?;

        let client = ImageClient::with_http_client(service, self.http.clone());
        let result = client
            .generate(&request)
            .await
            .map_err(HandlerError::GenerationFailed)?;

        let asset = self
            .storage
            .import_from_url(&result.image_reference)
            .await
            .map_err(|e| {
                log::error!("❌ Failed to import generated image: {}", e);
                HandlerError::StorageFailed(e)
            })?;

        Ok(SuccessResponse {
            image_id: asset.id,
            image_url: asset.url,
        })
    }
}
