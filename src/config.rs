use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_ENDPOINT: &str = "https://api.bfl.ml/v1/flux-pro-1.1";
pub const DEFAULT_MEDIA_DIR: &str = "media";
pub const DEFAULT_MEDIA_BASE_URL: &str = "/media";
pub const DEFAULT_PORT: u16 = 8080;

pub const API_KEY_VAR: &str = "FLUX_AI_API_KEY";
pub const ENDPOINT_VAR: &str = "FLUX_AI_ENDPOINT";

/// Credentials and endpoint for the remote image API.
///
/// Immutable once handed to an [`ImageClient`](crate::flux::ImageClient).
#[derive(Debug)]
pub struct ServiceConfig {
    api_key: SecretString,
    endpoint: String,
}

impl ServiceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.expose_secret().trim().is_empty()
    }
}

/// Where the API key and endpoint live between requests.
///
/// Read once per handled request, so a key saved by an operator takes
/// effect on the next call.
pub trait ConfigStore: Send + Sync {
    fn api_key(&self) -> Option<String>;

    fn endpoint(&self) -> String {
        DEFAULT_ENDPOINT.to_string()
    }

    /// `None` when no usable API key is stored.
    fn service_config(&self) -> Option<ServiceConfig> {
        let api_key = self.api_key()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(ServiceConfig::new(api_key).with_endpoint(self.endpoint()))
    }
}

/// Reads `FLUX_AI_API_KEY` and `FLUX_AI_ENDPOINT` from the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvConfigStore;

impl EnvConfigStore {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigStore for EnvConfigStore {
    fn api_key(&self) -> Option<String> {
        env::var(API_KEY_VAR).ok()
    }

    fn endpoint(&self) -> String {
        env::var(ENDPOINT_VAR)
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }
}

#[derive(Debug, Default)]
pub struct StaticConfigStore {
    api_key: Option<SecretString>,
    endpoint: Option<String>,
}

impl StaticConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

impl ConfigStore for StaticConfigStore {
    fn api_key(&self) -> Option<String> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret().to_string())
    }

    fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub media_dir: PathBuf,
    pub media_base_url: String,
    pub temp_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            media_base_url: DEFAULT_MEDIA_BASE_URL.to_string(),
            temp_dir: None,
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let media_dir = env::var("FLUX_MEDIA_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or(defaults.media_dir);
        let media_base_url = env::var("FLUX_MEDIA_BASE_URL")
            .ok()
            .unwrap_or(defaults.media_base_url);
        let temp_dir = env::var("FLUX_TEMP_DIR").ok().map(PathBuf::from);

        StorageConfig {
            media_dir,
            media_base_url,
            temp_dir,
        }
    }

    pub fn with_media_dir(mut self, media_dir: impl Into<PathBuf>) -> Self {
        self.media_dir = media_dir.into();
        self
    }

    pub fn with_media_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.media_base_url = base_url.into();
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }
}

#[derive(Debug, Default)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub admin_token: Option<SecretString>,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let admin_token = env::var("FLUX_ADMIN_TOKEN")
            .ok()
            .filter(|token| !token.is_empty())
            .map(SecretString::from);

        ServerConfig { port, admin_token }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// False whenever no admin token is configured. Compares SHA-256
    /// digests in constant time.
    pub fn token_matches(&self, presented: &str) -> bool {
        match &self.admin_token {
            Some(token) if !presented.is_empty() => {
                let expected = Sha256::digest(token.expose_secret().as_bytes());
                let actual = Sha256::digest(presented.as_bytes());
                expected
                    .iter()
                    .zip(actual.iter())
                    .fold(0u8, |diff, (a, b)| diff | (a ^ b))
                    == 0
            }
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct Config {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub log_file: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Config {
            storage: StorageConfig::from_env(),
            server: ServerConfig::from_env(),
            log_file: env::var("FLUX_LOG_FILE").ok().filter(|path| !path.is_empty()),
        }
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }
}
