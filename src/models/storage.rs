use serde::{Deserialize, Serialize};

/// An image owned by the asset store; this crate only keeps the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAsset {
    pub id: String,
    pub url: String,
}

/// A downloaded file waiting to be handed to a storage backend.
#[derive(Debug, Clone, Copy)]
pub struct SideloadFile<'a> {
    /// Name suggested by the remote reference, already sanitized.
    pub file_name: &'a str,
    pub path: &'a std::path::Path,
}
