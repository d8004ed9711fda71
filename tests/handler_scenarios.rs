//! End-to-end runs of the generation handler against a mocked Flux API.

use async_trait::async_trait;
use fluxgen::{
    models::SideloadFile, AssetStorage, AssetStorageManager, CallerIdentity, Capability,
    ErrorKind, ErrorResponse, FailureKind, FluxError, GenerationHandler, HandlerError, RawInput,
    StaticConfigStore, StoredAsset,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_PATH: &str = "/v1/flux-pro-1.1";

/// Asset store double that counts imports and returns a fixed asset.
struct FakeAssetStore {
    sideloads: AtomicUsize,
    fail_with: Option<String>,
}

impl FakeAssetStore {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            sideloads: AtomicUsize::new(0),
            fail_with: None,
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            sideloads: AtomicUsize::new(0),
            fail_with: Some(message.to_string()),
        })
    }

    fn sideloads(&self) -> usize {
        self.sideloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetStorage for FakeAssetStore {
    async fn sideload(&self, file: SideloadFile<'_>) -> fluxgen::Result<StoredAsset> {
        self.sideloads.fetch_add(1, Ordering::SeqCst);
        assert!(file.path.exists(), "temp download must exist during sideload");
        match &self.fail_with {
            Some(message) => Err(FluxError::StorageError(message.clone())),
            None => Ok(StoredAsset {
                id: "1234".into(),
                url: format!("https://blog.example.com/uploads/{}", file.file_name),
            }),
        }
    }

    async fn health_check(&self) -> fluxgen::Result<bool> {
        Ok(true)
    }
}

struct Harness {
    api: MockServer,
    temp_dir: TempDir,
    store: Arc<FakeAssetStore>,
}

impl Harness {
    async fn new(store: Arc<FakeAssetStore>) -> Self {
        Self {
            api: MockServer::start().await,
            temp_dir: TempDir::new().unwrap(),
            store,
        }
    }

    fn handler(&self, api_key: Option<&str>) -> GenerationHandler {
        let mut config =
            StaticConfigStore::new().with_endpoint(format!("{}{}", self.api.uri(), API_PATH));
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        let storage =
            AssetStorageManager::new(self.store.clone()).with_temp_dir(self.temp_dir.path());
        GenerationHandler::new(Arc::new(config), Arc::new(storage))
    }

    fn image_url(&self) -> String {
        format!("{}/renders/fox.png", self.api.uri())
    }

    async fn serve_image(&self) {
        Mock::given(method("GET"))
            .and(path("/renders/fox.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG fox".to_vec()))
            .mount(&self.api)
            .await;
    }

    fn temp_dir_is_empty(&self) -> bool {
        std::fs::read_dir(self.temp_dir.path()).unwrap().next().is_none()
    }
}

fn uploader() -> CallerIdentity {
    CallerIdentity::new("editor").with_capability(Capability::Upload)
}

#[tokio::test]
async fn invalid_enums_are_coerced_before_the_api_call() {
    let harness = Harness::new(FakeAssetStore::succeeding()).await;
    harness.serve_image().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_json(json!({
            "prompt": "a red fox",
            "style": "photorealistic",
            "resolution": "1024x1024",
            "num_images": 1
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "images": [harness.image_url()] })),
        )
        .expect(1)
        .mount(&harness.api)
        .await;

    let raw = RawInput::new()
        .with("prompt", "a red fox")
        .with("style", "oil-painting")
        .with("resolution", "999x999");

    harness
        .handler(Some("test-api-key"))
        .handle(&uploader(), &raw)
        .await
        .unwrap();
}

#[tokio::test]
async fn empty_images_fail_without_storage_import() {
    let harness = Harness::new(FakeAssetStore::succeeding()).await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": [] })))
        .expect(1)
        .mount(&harness.api)
        .await;

    let err = harness
        .handler(Some("test-api-key"))
        .handle(&uploader(), &RawInput::new().with("prompt", "a red fox"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::GenerationFailed);
    assert_eq!(err.failure_kind(), Some(FailureKind::EmptyResult));
    assert_eq!(harness.store.sideloads(), 0);
}

#[tokio::test]
async fn successful_generation_returns_stored_asset() {
    let harness = Harness::new(FakeAssetStore::succeeding()).await;
    harness.serve_image().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(header("Authorization", "Bearer test-api-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "images": [harness.image_url()] })),
        )
        .expect(1)
        .mount(&harness.api)
        .await;

    let success = harness
        .handler(Some("test-api-key"))
        .handle(&uploader(), &RawInput::new().with("prompt", "a red fox"))
        .await
        .unwrap();

    assert_eq!(success.image_id, "1234");
    assert_eq!(success.image_url, "https://blog.example.com/uploads/fox.png");
    assert_eq!(harness.store.sideloads(), 1);
    assert!(harness.temp_dir_is_empty());
}

#[tokio::test]
async fn caller_without_upload_capability_never_reaches_the_api() {
    let harness = Harness::new(FakeAssetStore::succeeding()).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": ["x"] })))
        .expect(0)
        .mount(&harness.api)
        .await;

    let err = harness
        .handler(Some("test-api-key"))
        .handle(
            &CallerIdentity::new("viewer"),
            &RawInput::new().with("prompt", "a red fox"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, HandlerError::PermissionDenied));
    assert_eq!(
        ErrorResponse::from(&err),
        ErrorResponse {
            message: "Insufficient permissions".into(),
            kind: ErrorKind::PermissionDenied,
            detail: None,
        }
    );
}

#[tokio::test]
async fn missing_api_key_never_reaches_the_api() {
    let harness = Harness::new(FakeAssetStore::succeeding()).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": ["x"] })))
        .expect(0)
        .mount(&harness.api)
        .await;

    for key in [None, Some(""), Some("  ")] {
        let err = harness
            .handler(key)
            .handle(&uploader(), &RawInput::new().with("prompt", "a red fox"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
        assert_eq!(err.to_string(), "Flux A.I. API key is not configured");
    }
}

#[tokio::test]
async fn blank_prompt_is_invalid_input() {
    let harness = Harness::new(FakeAssetStore::succeeding()).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.api)
        .await;

    let err = harness
        .handler(Some("test-api-key"))
        .handle(&uploader(), &RawInput::new().with("prompt", "   "))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(err.to_string(), "Prompt is required");
}

#[tokio::test]
async fn server_error_is_transport_failure() {
    let harness = Harness::new(FakeAssetStore::succeeding()).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
        .expect(1)
        .mount(&harness.api)
        .await;

    let err = harness
        .handler(Some("test-api-key"))
        .handle(&uploader(), &RawInput::new().with("prompt", "a red fox"))
        .await
        .unwrap_err();

    assert_eq!(err.failure_kind(), Some(FailureKind::Transport));
    assert_eq!(err.to_string(), "Failed to generate image");
    assert_eq!(harness.store.sideloads(), 0);
}

#[tokio::test]
async fn storage_failure_surfaces_collaborator_message() {
    let store = FakeAssetStore::failing("Sorry, you are not allowed to upload this file type.");
    let harness = Harness::new(store).await;
    harness.serve_image().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "images": [harness.image_url()] })),
        )
        .mount(&harness.api)
        .await;

    let err = harness
        .handler(Some("test-api-key"))
        .handle(&uploader(), &RawInput::new().with("prompt", "a red fox"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StorageFailed);
    assert_eq!(
        err.to_string(),
        "Sorry, you are not allowed to upload this file type."
    );
    assert!(harness.temp_dir_is_empty());
}

#[tokio::test]
async fn unreachable_image_is_storage_failure() {
    let harness = Harness::new(FakeAssetStore::succeeding()).await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "images": [format!("{}/renders/missing.png", harness.api.uri())]
        })))
        .mount(&harness.api)
        .await;

    let err = harness
        .handler(Some("test-api-key"))
        .handle(&uploader(), &RawInput::new().with("prompt", "a red fox"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StorageFailed);
    assert!(err.to_string().starts_with("Failed to download image"));
    assert_eq!(harness.store.sideloads(), 0);
    assert!(harness.temp_dir_is_empty());
}
