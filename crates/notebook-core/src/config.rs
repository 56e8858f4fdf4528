//! Engine configuration.

use crate::cell::CellKind;
use serde::Deserialize;

/// Maps each public global to its type name.
const DEFAULT_NAMESPACE_EXPRESSION: &str =
    "{k: type(v).__name__ for k, v in list(globals().items()) if not k.startswith('_')}";

/// Tunables for a [`NotebookState`](crate::NotebookState).
///
/// Hosts typically deserialize this from their own settings file; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotebookConfig {
    /// Tag embedded in the cell delimiters (`# <<tag:code>>` / `# <</tag>>`).
    pub marker_tag: String,
    /// Maximum number of undo steps kept for the Facade.
    pub max_undo: usize,
    /// Kernel language assumed when the notebook metadata does not name one.
    pub default_language: String,
    /// Expression the kernel evaluates after each execution to summarize the namespace.
    /// `None` turns namespace capture off.
    pub namespace_expression: Option<String>,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            marker_tag: "ipynb".to_string(),
            max_undo: 1000,
            default_language: "python".to_string(),
            namespace_expression: Some(DEFAULT_NAMESPACE_EXPRESSION.to_string()),
        }
    }
}

impl NotebookConfig {
    /// Start delimiter for a cell of the given kind.
    pub fn start_marker(&self, kind: CellKind) -> String {
        format!("# <<{}:{}>>", self.marker_tag, kind.as_str())
    }

    /// Uniform end delimiter.
    pub fn end_marker(&self) -> String {
        format!("# <</{}>>", self.marker_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: NotebookConfig = serde_json::from_str(r#"{ "marker_tag": "nb" }"#).unwrap();
        assert_eq!(config.marker_tag, "nb");
        assert_eq!(config.max_undo, 1000);
        assert!(config.namespace_expression.is_some());
        assert_eq!(config.start_marker(CellKind::Markdown), "# <<nb:markdown>>");
        assert_eq!(config.end_marker(), "# <</nb>>");
    }
}
