use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EXECUTE_PATH: &str = "/execute";
pub const EXPORT_PATH: &str = "/ai-export";
pub const AI_FEATURES_PATH: &str = "/ai-features";
pub const GEMINI_FEATURES_PATH: &str = "/gemini-features";
pub const SMART_COMMAND_PATH: &str = "/smart-command";
pub const CHAT_PATH: &str = "/chat";
pub const LOGIN_PATH: &str = "/login";
pub const LOGOUT_PATH: &str = "/logout";

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub session_id: String,
    pub command: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureRequest {
    pub ai_data: Value,
    pub feature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiRequest {
    pub ai_data: Value,
    pub feature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SmartCommandRequest {
    pub ai_data: Value,
    pub smart_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub ai_data: Value,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub session_id: String,
}

/// The `{success, output|data|response, error}` body every endpoint returns.
///
/// Error statuses from the backend carry only `{error}`, so a missing
/// `success` reads as `false`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    /// The backend's error message, or `fallback` when it sent none.
    pub fn error_or(&self, fallback: &str) -> String {
        match &self.error {
            Some(Value::String(msg)) if !msg.trim().is_empty() => msg.clone(),
            Some(Value::Null) | None => fallback.to_string(),
            Some(Value::String(_)) => fallback.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// The `output` field normalized to display text.
    pub fn output_text(&self) -> String {
        match &self.output {
            Some(value) => output_text(value),
            None => NO_OUTPUT.to_string(),
        }
    }

    /// The chat `response` field as text.
    pub fn response_text(&self) -> String {
        match &self.response {
            Some(Value::String(text)) if !text.is_empty() => text.clone(),
            Some(Value::String(_)) | Some(Value::Null) | None => NO_RESPONSE.to_string(),
            Some(other) => output_text(other),
        }
    }
}

const NO_OUTPUT: &str = "No output";
const NO_RESPONSE: &str = "No response";

/// Normalizes an `output` value into plain text.
///
/// Strings pass through. Objects carrying a string `content` yield that
/// string verbatim; a structured `content` (the backend's `json` output type)
/// and objects without `content` are pretty-printed.
pub fn output_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => NO_OUTPUT.to_string(),
        Value::Object(map) => match map.get("content") {
            Some(Value::String(content)) => content.clone(),
            Some(Value::Null) | None => pretty(value),
            Some(content) => pretty(content),
        },
        other => pretty(other),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn output_content_field_is_taken_verbatim() {
        let value = json!({"type": "table", "content": "│ CSE101 │ 92 │"});
        assert_eq!(output_text(&value), "│ CSE101 │ 92 │");
    }

    #[test]
    fn plain_string_output_passes_through() {
        assert_eq!(output_text(&json!("CGPA: 8.5")), "CGPA: 8.5");
    }

    #[test]
    fn structured_content_is_pretty_printed() {
        let value = json!({"type": "json", "content": {"cgpa": 8.5}});
        assert_eq!(output_text(&value), "{\n  \"cgpa\": 8.5\n}");
    }

    #[test]
    fn envelope_without_success_reads_as_failure() {
        let envelope: Envelope =
            serde_json::from_value(json!({"error": "Unknown feature: nope"})).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.error_or("AI failed"), "Unknown feature: nope");
    }

    #[test]
    fn null_error_falls_back() {
        let envelope: Envelope =
            serde_json::from_value(json!({"success": false, "error": null})).unwrap();
        assert_eq!(envelope.error_or("Gemini failed"), "Gemini failed");
    }

    #[test]
    fn gemini_request_omits_absent_mode() {
        let request = GeminiRequest {
            ai_data: json!({}),
            feature: "insights".to_string(),
            mode: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"ai_data": {}, "feature": "insights"}));
    }

    #[test]
    fn empty_chat_response_reads_as_no_response() {
        let envelope: Envelope =
            serde_json::from_value(json!({"success": true, "response": ""})).unwrap();
        assert_eq!(envelope.response_text(), "No response");
    }
}
