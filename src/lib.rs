//! Prompt-to-asset image generation through the Flux A.I. API.
//!
//! Input is validated by [`validation`], sent once to the remote API by
//! [`flux::ImageClient`] and the resulting image is imported into an
//! asset store by [`storage::AssetStorageManager`]. [`GenerationHandler`]
//! ties these steps together for one caller request.

pub mod config;
pub mod error;
pub mod flux;
pub mod handler;
pub mod logger;
pub mod models;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;
pub mod validation;

pub use config::{
    Config, ConfigStore, EnvConfigStore, ServerConfig, ServiceConfig, StaticConfigStore,
    StorageConfig,
};
pub use error::{
    ErrorKind, FailureKind, FluxError, GenerationFailure, HandlerError, Result,
};
pub use flux::ImageClient;
pub use handler::GenerationHandler;
pub use models::*;
pub use storage::{AssetStorage, AssetStorageManager, LocalAssetStorage};
pub use validation::{validate, ValidationError};
