use serde::{Deserialize, Serialize};

/// Error body the backend attaches to non-2xx responses. Every field is
/// optional in practice; older deployments return plain text bodies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Best-effort extraction of a human-readable message from a raw
    /// response body, falling back to the body text itself.
    pub fn message_from_body(body: &str) -> Option<String> {
        if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
            return parsed.message.filter(|message| !message.is_empty());
        }
        let trimmed = body.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}
