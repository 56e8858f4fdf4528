//! Proxy configuration.

use serde::Deserialize;
use std::time::Duration;

/// Tunables for a [`ProtocolProxy`](crate::ProtocolProxy).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Scheme of read-only preview URIs (`scheme://filename`).
    pub synthetic_scheme: String,
    /// Extension appended to the notebook path to name its Shadow document.
    pub shadow_extension: String,
    /// `languageId` announced in `textDocument/didOpen`.
    pub language_id: String,
    /// Delay before a hover request is sent.
    pub hover_delay_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            synthetic_scheme: "ipynb".to_string(),
            shadow_extension: "py".to_string(),
            language_id: "python".to_string(),
            hover_delay_ms: 150,
        }
    }
}

impl ProxyConfig {
    /// Hover delay as a [`Duration`].
    pub fn hover_delay(&self) -> Duration {
        Duration::from_millis(self.hover_delay_ms)
    }
}
