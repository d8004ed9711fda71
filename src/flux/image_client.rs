use crate::{
    config::ServiceConfig,
    error::{FailureKind, FluxError, GenerationFailure},
    logger::{self, LogLevel},
    models::{FluxImageResponse, GenerationRequest, GenerationResult},
    storage::download,
};
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fixed budget for one call to the remote API. There are no retries.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_ERROR_BODY_CHARS: usize = 200;

const MAX_NAME_ATTEMPTS: u32 = 1000;

const SUCCESS_AUDIT: (LogLevel, &str) = (LogLevel::Info, "Image generated successfully");

/// Client for the Flux A.I. text-to-image endpoint.
///
/// Every call makes exactly one HTTP attempt and reports failures as
/// [`GenerationFailure`] values. Each outcome is written to the audit log
/// together with the request parameters; the API key never is.
pub struct ImageClient {
    http: Client,
    config: ServiceConfig,
}

impl ImageClient {
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_http_client(config, Client::new())
    }

    /// Reuses an existing connection pool.
    pub fn with_http_client(config: ServiceConfig, http: Client) -> Self {
        Self { http, config }
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationFailure> {
        let args = audit_args(request);

        match self.send(request).await {
            Ok(result) => {
                let (level, message) = SUCCESS_AUDIT;
                logger::audit(level, message, &args);
                Ok(result)
            }
            Err(failure) => {
                let (level, message) = failure_audit(failure.kind);
                logger::audit(level, message, &failure_context(&failure, args));
                Err(failure)
            }
        }
    }

    /// Generates an image and writes it straight to
    /// `output_dir/generated_image_<unix-ts>.png`, bypassing the asset store.
    pub async fn generate_to_file(
        &self,
        request: &GenerationRequest,
        output_dir: &Path,
    ) -> Result<PathBuf, GenerationFailure> {
        let result = self.generate(request).await?;

        tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
            GenerationFailure::unexpected(format!(
                "Unable to create {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        let (output_file, mut file) =
            create_output_file(output_dir, chrono::Utc::now().timestamp())
                .await
                .map_err(|e| {
                    GenerationFailure::unexpected(format!("Unable to save the image: {}", e))
                })?;

        let outcome = download::download_to(&self.http, &result.image_reference, &mut file).await;
        drop(file);

        match outcome {
            Ok(bytes) => {
                log::info!(
                    "💾 Image saved to {} ({} bytes)",
                    output_file.display(),
                    bytes
                );
                Ok(output_file)
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&output_file).await;
                let failure = match err {
                    FluxError::IoError(e) => {
                        GenerationFailure::unexpected(format!("Unable to save the image: {}", e))
                    }
                    other => GenerationFailure::transport(format!(
                        "Unable to download the image: {}",
                        other
                    )),
                };
                log::error!("❌ {}", failure);
                Err(failure)
            }
        }
    }

    async fn send(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationFailure> {
        let response = self
            .http
            .post(self.config.endpoint())
            .bearer_auth(self.config.api_key())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationFailure::transport(format!(
                "HTTP {}: {}",
                status,
                truncate(&body, MAX_ERROR_BODY_CHARS)
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GenerationFailure::transport(format!("Failed to read response: {}", e)))?;

        // A 2xx body that is not the expected JSON counts as "no image".
        let parsed = serde_json::from_slice::<FluxImageResponse>(&body).ok();
        match parsed.as_ref().and_then(FluxImageResponse::first_image) {
            Some(image) => Ok(GenerationResult {
                image_reference: image.to_string(),
            }),
            None => Err(GenerationFailure::empty_result(
                "Response contained no images",
            )),
        }
    }
}

/// Opens a fresh `generated_image_<ts>[-n].png`; never reuses an existing file.
async fn create_output_file(
    output_dir: &Path,
    timestamp: i64,
) -> std::io::Result<(PathBuf, tokio::fs::File)> {
    let mut attempt = 0;
    loop {
        let name = if attempt == 0 {
            format!("generated_image_{}.png", timestamp)
        } else {
            format!("generated_image_{}-{}.png", timestamp, attempt)
        };
        let path = output_dir.join(name);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e)
                if e.kind() == std::io::ErrorKind::AlreadyExists
                    && attempt < MAX_NAME_ATTEMPTS =>
            {
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn failure_audit(kind: FailureKind) -> (LogLevel, &'static str) {
    match kind {
        FailureKind::EmptyResult => (LogLevel::Warn, "No image generated"),
        FailureKind::Transport => (LogLevel::Error, "API Request Failed"),
        FailureKind::Unexpected => (LogLevel::Critical, "Unexpected error"),
    }
}

fn failure_context(failure: &GenerationFailure, args: Value) -> Value {
    json!({ "message": failure.message, "args": args })
}

fn classify_send_error(err: reqwest::Error) -> GenerationFailure {
    if err.is_builder() {
        GenerationFailure::unexpected(err.to_string())
    } else {
        GenerationFailure::transport(err.to_string())
    }
}

fn audit_args(request: &GenerationRequest) -> Value {
    json!({
        "prompt": request.prompt,
        "style": request.style,
        "resolution": request.resolution,
        "num_images": request.num_images,
    })
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
