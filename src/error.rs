use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FluxError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FluxError>;

/// Why a single call to the remote image API produced no image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Timeout, connection error or non-2xx status.
    Transport,
    /// 2xx response without a usable `images[0]`.
    EmptyResult,
    Unexpected,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::EmptyResult => "empty_result",
            FailureKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    pub fn empty_result(message: impl Into<String>) -> Self {
        Self::new(FailureKind::EmptyResult, message)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unexpected, message)
    }
}

/// Machine-readable code attached to every error payload sent to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    InvalidInput,
    NotConfigured,
    GenerationFailed,
    StorageFailed,
}

/// Terminal outcome of a rejected generation request.
///
/// The `Display` text is exactly what the caller sees.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Insufficient permissions")]
    PermissionDenied,
    #[error("Prompt is required")]
    InvalidInput,
    #[error("Flux A.I. API key is not configured")]
    NotConfigured,
    #[error("Failed to generate image")]
    GenerationFailed(GenerationFailure),
    #[error("{}", storage_message(.0))]
    StorageFailed(FluxError),
}

// Storage failures surface the collaborator's own message, without our prefix.
fn storage_message(err: &FluxError) -> String {
    match err {
        FluxError::StorageError(msg) => msg.clone(),
        other => other.to_string(),
    }
}

impl HandlerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandlerError::PermissionDenied => ErrorKind::PermissionDenied,
            HandlerError::InvalidInput => ErrorKind::InvalidInput,
            HandlerError::NotConfigured => ErrorKind::NotConfigured,
            HandlerError::GenerationFailed(_) => ErrorKind::GenerationFailed,
            HandlerError::StorageFailed(_) => ErrorKind::StorageFailed,
        }
    }

    /// The remote failure kind, only present for `GenerationFailed`.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            HandlerError::GenerationFailed(failure) => Some(failure.kind),
            _ => None,
        }
    }
}
