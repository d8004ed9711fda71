use crate::error::{ErrorKind, FailureKind, HandlerError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Upload,
}

/// Who is asking, as established by the calling framework.
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity {
    pub user_id: Option<String>,
    pub capabilities: HashSet<Capability>,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            capabilities: HashSet::new(),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Untrusted key-value input exactly as the caller sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput(Map<String, Value>);

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl From<Map<String, Value>> for RawInput {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<HashMap<String, String>> for RawInput {
    fn from(fields: HashMap<String, String>) -> Self {
        Self(
            fields
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub image_id: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<FailureKind>,
}

impl From<&HandlerError> for ErrorResponse {
    fn from(err: &HandlerError) -> Self {
        ErrorResponse {
            message: err.to_string(),
            kind: err.kind(),
            detail: err.failure_kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationFailure;
    use serde_json::json;

    #[test]
    fn caller_capabilities() {
        let caller = CallerIdentity::new("7").with_capability(Capability::Upload);
        assert!(caller.can(Capability::Upload));
        assert!(!CallerIdentity::anonymous().can(Capability::Upload));
    }

    #[test]
    fn raw_input_from_form_fields() {
        let mut fields = HashMap::new();
        fields.insert("prompt".to_string(), "a cat".to_string());
        let raw = RawInput::from(fields);
        assert_eq!(raw.get("prompt"), Some(&json!("a cat")));
        assert_eq!(raw.get("style"), None);
    }

    #[test]
    fn error_response_carries_kind_and_detail() {
        let err = HandlerError::GenerationFailed(GenerationFailure::transport("timed out"));
        let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(
            body,
            json!({
                "message": "Failed to generate image",
                "kind": "generation_failed",
                "detail": "transport"
            })
        );

        let body = serde_json::to_value(ErrorResponse::from(&HandlerError::PermissionDenied))
            .unwrap();
        assert_eq!(
            body,
            json!({"message": "Insufficient permissions", "kind": "permission_denied"})
        );
    }
}
