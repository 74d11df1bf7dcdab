use serde::{Deserialize, Serialize};

/// Error payload returned by the hosted auth and table endpoints.
///
/// The auth API and the table API disagree on field names, so every known
/// spelling is optional and [`ServiceErrorBody::message`] picks the most
/// descriptive one present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,
}

impl ServiceErrorBody {
    pub fn message(&self) -> Option<&str> {
        [
            &self.error_description,
            &self.msg,
            &self.message,
            &self.error,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|text| !text.trim().is_empty())
    }

    /// Best-effort decode of a raw response body; falls back to `fallback`
    /// when the body is not JSON or carries no message.
    pub fn message_from_bytes(body: &[u8], fallback: &str) -> String {
        serde_json::from_slice::<ServiceErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.message().map(str::to_string))
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
