//! Typed wrappers for the server messages the proxy inspects.
//!
//! Only what the proxy needs to route or rewrite is parsed: JSON-RPC responses, diagnostics,
//! and `window/*` messages that end up in front of the user.

use crate::lsp_sync::LspRange;
use serde_json::{Map, Value, json};

/// LSP `MessageType` used by `window/showMessage` and `window/logMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LspMessageType {
    /// An error message.
    Error,
    /// A warning message.
    Warning,
    /// An informational message.
    Info,
    /// A log message (lowest severity).
    Log,
}

impl LspMessageType {
    /// Convert the numeric LSP `MessageType` into an enum.
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Info),
            4 => Some(Self::Log),
            _ => None,
        }
    }
}

/// A message the host should show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    /// Severity.
    pub typ: LspMessageType,
    /// Text to display.
    pub message: String,
}

impl UserMessage {
    /// An error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            typ: LspMessageType::Error,
            message: message.into(),
        }
    }
}

/// Severity levels for `textDocument/publishDiagnostics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LspDiagnosticSeverity {
    /// Error diagnostics.
    Error,
    /// Warning diagnostics.
    Warning,
    /// Informational diagnostics.
    Information,
    /// Hint diagnostics.
    Hint,
}

impl LspDiagnosticSeverity {
    /// Convert the numeric LSP `DiagnosticSeverity` into an enum.
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }

    /// Numeric LSP value.
    pub fn to_u64(self) -> u64 {
        match self {
            Self::Error => 1,
            Self::Warning => 2,
            Self::Information => 3,
            Self::Hint => 4,
        }
    }
}

/// A single LSP diagnostic item.
#[derive(Debug, Clone, PartialEq)]
pub struct LspDiagnostic {
    /// Diagnostic range.
    pub range: LspRange,
    /// Optional severity.
    pub severity: Option<LspDiagnosticSeverity>,
    /// Optional diagnostic code (number or string).
    pub code: Option<Value>,
    /// Optional diagnostic source (e.g. "pyright").
    pub source: Option<String>,
    /// Diagnostic message.
    pub message: String,
    /// Optional related information (server-specific JSON).
    pub related_information: Option<Value>,
    /// Optional extra data (server-specific JSON).
    pub data: Option<Value>,
}

impl LspDiagnostic {
    /// Parse a `Diagnostic`-shaped JSON value.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            range: LspRange::from_value(value.get("range")?)?,
            severity: value
                .get("severity")
                .and_then(Value::as_u64)
                .and_then(LspDiagnosticSeverity::from_u64),
            code: value.get("code").cloned(),
            source: value
                .get("source")
                .and_then(Value::as_str)
                .map(str::to_string),
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            related_information: value.get("relatedInformation").cloned(),
            data: value.get("data").cloned(),
        })
    }

    /// Serialize back into a `Diagnostic` JSON value.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("range".to_string(), self.range.to_value());
        out.insert("message".to_string(), Value::from(self.message.as_str()));
        if let Some(severity) = self.severity {
            out.insert("severity".to_string(), Value::from(severity.to_u64()));
        }
        if let Some(code) = &self.code {
            out.insert("code".to_string(), code.clone());
        }
        if let Some(source) = &self.source {
            out.insert("source".to_string(), Value::from(source.as_str()));
        }
        if let Some(related) = &self.related_information {
            out.insert("relatedInformation".to_string(), related.clone());
        }
        if let Some(data) = &self.data {
            out.insert("data".to_string(), data.clone());
        }
        Value::Object(out)
    }
}

/// Parameters for `textDocument/publishDiagnostics`.
#[derive(Debug, Clone, PartialEq)]
pub struct LspPublishDiagnosticsParams {
    /// Document URI.
    pub uri: String,
    /// Diagnostics for the document.
    pub diagnostics: Vec<LspDiagnostic>,
    /// Optional document version.
    pub version: Option<i32>,
}

impl LspPublishDiagnosticsParams {
    /// Parse the `params` of a `textDocument/publishDiagnostics` notification.
    pub fn from_value(params: &Value) -> Option<Self> {
        let uri = params.get("uri")?.as_str()?.to_string();
        let version = params
            .get("version")
            .and_then(Value::as_i64)
            .map(|v| v as i32);
        let diagnostics = params
            .get("diagnostics")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(LspDiagnostic::from_value).collect())
            .unwrap_or_default();
        Some(Self {
            uri,
            diagnostics,
            version,
        })
    }

    /// Serialize as notification `params`.
    pub fn to_value(&self) -> Value {
        let diagnostics: Vec<Value> = self.diagnostics.iter().map(LspDiagnostic::to_value).collect();
        let mut params = json!({ "uri": self.uri, "diagnostics": diagnostics });
        if let Some(version) = self.version {
            params["version"] = Value::from(version);
        }
        params
    }
}

/// A typed subset of server->client notifications.
#[derive(Debug, Clone)]
pub enum LspNotification {
    /// `window/showMessage`
    ShowMessage(UserMessage),
    /// `window/logMessage`
    LogMessage(UserMessage),
    /// `textDocument/publishDiagnostics`
    PublishDiagnostics(LspPublishDiagnosticsParams),
}

impl LspNotification {
    /// Parse a notification by method name and `params` payload.
    pub fn from_method_and_params(method: &str, params: &Value) -> Option<Self> {
        let user_message = || {
            let typ = params
                .get("type")?
                .as_u64()
                .and_then(LspMessageType::from_u64)?;
            let message = params.get("message")?.as_str()?.to_string();
            Some(UserMessage { typ, message })
        };
        match method {
            "window/showMessage" => user_message().map(Self::ShowMessage),
            "window/logMessage" => user_message().map(Self::LogMessage),
            "textDocument/publishDiagnostics" => {
                LspPublishDiagnosticsParams::from_value(params).map(Self::PublishDiagnostics)
            }
            _ => None,
        }
    }
}

/// A JSON-RPC response error object.
#[derive(Debug, Clone, PartialEq)]
pub struct LspResponseError {
    /// Error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured error data.
    pub data: Option<Value>,
}

impl LspResponseError {
    /// Parse an `error` object.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            code: value.get("code")?.as_i64()?,
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            data: value.get("data").cloned(),
        })
    }
}

/// A parsed JSON-RPC response message.
#[derive(Debug, Clone, PartialEq)]
pub struct LspResponse {
    /// Response id (matches the request id).
    pub id: u64,
    /// Result payload (if successful).
    pub result: Option<Value>,
    /// Error payload (if failed).
    pub error: Option<LspResponseError>,
}

impl LspResponse {
    /// Parse a raw JSON-RPC response message.
    pub fn from_json(msg: &Value) -> Option<Self> {
        let id = msg.get("id")?.as_u64()?;
        if msg.get("method").is_some() {
            return None;
        }
        Some(Self {
            id,
            result: msg.get("result").cloned(),
            error: msg.get("error").and_then(LspResponseError::from_value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_diagnostics_keeps_server_fields() {
        let params = json!({
            "uri": "file:///nb.ipynb.py",
            "version": 4,
            "diagnostics": [{
                "range": { "start": { "line": 3, "character": 0 }, "end": { "line": 3, "character": 5 } },
                "severity": 1,
                "code": "E999",
                "source": "pyflakes",
                "message": "undefined name",
                "data": { "fix": true }
            }, { "message": "no range" }]
        });
        let parsed = LspPublishDiagnosticsParams::from_value(&params).unwrap();
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(
            parsed.diagnostics[0].severity,
            Some(LspDiagnosticSeverity::Error)
        );
        assert_eq!(parsed.to_value()["diagnostics"][0], {
            let mut expected = params["diagnostics"][0].clone();
            expected["severity"] = json!(1);
            expected
        });
        assert_eq!(parsed.to_value()["version"], 4);
    }

    #[test]
    fn test_response_with_error() {
        let msg = json!({
            "jsonrpc": "2.0",
            "id": 7,
            "error": { "code": -32601, "message": "method not found" }
        });
        let response = LspResponse::from_json(&msg).unwrap();
        assert_eq!(response.id, 7);
        assert_eq!(response.result, None);
        assert_eq!(response.error.unwrap().message, "method not found");
    }

    #[test]
    fn test_server_request_is_not_a_response() {
        let msg = json!({ "id": 1, "method": "workspace/configuration", "params": {} });
        assert_eq!(LspResponse::from_json(&msg), None);
    }

    #[test]
    fn test_show_message_notification() {
        let params = json!({ "type": 2, "message": "slow" });
        let Some(LspNotification::ShowMessage(message)) =
            LspNotification::from_method_and_params("window/showMessage", &params)
        else {
            panic!("expected showMessage");
        };
        assert_eq!(message.typ, LspMessageType::Warning);
    }
}
