//! Shadow document lifecycle on the language server.

use crate::lsp_sync::ShadowMirror;
use crate::lsp_uri::DocumentUris;
use notebook_core::BufferEdit;
use serde_json::{Value, json};

/// A client-to-server notification.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingNotification {
    /// JSON-RPC method.
    pub method: String,
    /// JSON-RPC params.
    pub params: Value,
}

impl OutgoingNotification {
    /// Full JSON-RPC message.
    pub fn to_json(&self) -> Value {
        json!({ "jsonrpc": "2.0", "method": self.method, "params": self.params })
    }
}

/// A Shadow document as the server knows it.
#[derive(Debug, Clone)]
pub struct ShadowDocument {
    path: String,
    uris: DocumentUris,
    version: i32,
    mirror: ShadowMirror,
}

impl ShadowDocument {
    /// Start tracking a Shadow opened with `text`.
    pub fn new(path: impl Into<String>, uris: DocumentUris, text: &str) -> Self {
        Self {
            path: path.into(),
            uris,
            version: 0,
            mirror: ShadowMirror::from_text(text),
        }
    }

    /// Notebook path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Identifiers of the notebook.
    pub fn uris(&self) -> &DocumentUris {
        &self.uris
    }

    /// Last version sent.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Text the server currently holds.
    pub fn text(&self) -> String {
        self.mirror.text()
    }

    /// `textDocument/didOpen` for the current text.
    pub fn did_open(&self, language_id: &str) -> OutgoingNotification {
        OutgoingNotification {
            method: "textDocument/didOpen".to_string(),
            params: json!({
                "textDocument": {
                    "uri": self.uris.shadow,
                    "languageId": language_id,
                    "version": self.version,
                    "text": self.mirror.text(),
                }
            }),
        }
    }

    /// `textDocument/didChange` for buffer deltas, or `None` when there are none.
    pub fn did_change(&mut self, edits: &[BufferEdit]) -> Option<OutgoingNotification> {
        if edits.is_empty() {
            return None;
        }
        let changes: Vec<Value> = self
            .mirror
            .changes_for_edits(edits)
            .iter()
            .map(|change| change.to_value())
            .collect();
        self.version += 1;
        Some(OutgoingNotification {
            method: "textDocument/didChange".to_string(),
            params: json!({
                "textDocument": { "uri": self.uris.shadow, "version": self.version },
                "contentChanges": changes,
            }),
        })
    }

    /// `textDocument/didClose`.
    pub fn did_close(&self) -> OutgoingNotification {
        OutgoingNotification {
            method: "textDocument/didClose".to_string(),
            params: json!({ "textDocument": { "uri": self.uris.shadow } }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;

    #[test]
    fn test_versions_increase_per_flush() {
        let uris = DocumentUris::for_path("/nb.ipynb", &ProxyConfig::default());
        let mut doc = ShadowDocument::new("/nb.ipynb", uris, "\nx\n\n");
        let open = doc.did_open("python");
        assert_eq!(open.params["textDocument"]["version"], 0);
        assert_eq!(open.params["textDocument"]["text"], "\nx\n\n");

        assert_eq!(doc.did_change(&[]), None);
        let change = doc
            .did_change(&[BufferEdit {
                start: 1,
                deleted_text: "x".to_string(),
                inserted_text: "y".to_string(),
            }])
            .unwrap();
        assert_eq!(change.params["textDocument"]["version"], 1);
        assert_eq!(change.params["contentChanges"][0]["text"], "y");
        assert_eq!(doc.text(), "\ny\n\n");
        assert_eq!(doc.did_close().method, "textDocument/didClose");
    }
}
