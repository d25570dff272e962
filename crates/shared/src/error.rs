use serde::{Deserialize, Serialize};

/// Failure body returned by the service.
///
/// The proxy endpoints answer `{"error": ...}` while the log endpoint answers
/// `{"detail": ...}`; both shapes decode into this type. Other keys are
/// ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiError {
    pub fn message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.detail.as_deref())
            .filter(|message| !message.trim().is_empty())
    }

    /// Best-effort decode of an error body; `None` when it is not a known shape.
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(|err| err.message().is_some())
    }
}
