//! Cell data model.
//!
//! A [`Cell`] is the unit the rest of the engine reasons about. Other components never hold
//! references into cells; they keep a [`CellId`] (stable across re-parses) or an index into the
//! [`CellStore`](crate::CellStore) that is only valid until the next structural change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Stable opaque cell identifier.
///
/// Ids are generated once and never reused within a notebook. They are the join key used to
/// re-associate cells after the Facade is fully re-parsed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    /// Wrap an existing identifier (e.g. one loaded from disk).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cell type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// Executable source; the only kind mirrored into the Shadow surface.
    Code,
    /// Markdown prose.
    Markdown,
    /// Raw, uninterpreted text.
    Raw,
}

impl CellKind {
    /// Name used in persisted notebooks and in start markers.
    pub fn as_str(self) -> &'static str {
        match self {
            CellKind::Code => "code",
            CellKind::Markdown => "markdown",
            CellKind::Raw => "raw",
        }
    }

    /// Inverse of [`CellKind::as_str`].
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "code" => Some(CellKind::Code),
            "markdown" => Some(CellKind::Markdown),
            "raw" => Some(CellKind::Raw),
            _ => None,
        }
    }

    /// Whether cells of this kind are forwarded to the language server.
    pub fn is_code(self) -> bool {
        matches!(self, CellKind::Code)
    }
}

/// Kernel execution state of a code cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionState {
    /// Not running and not scheduled.
    #[default]
    Idle,
    /// Submitted to the kernel, waiting to start.
    Queued,
    /// Currently executing.
    Busy,
}

/// A single persisted output entry.
///
/// Only `output_type` is interpreted; every other field is kept verbatim so that outputs
/// round-trip losslessly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// `stream`, `execute_result`, `display_data` or `error`.
    pub output_type: String,
    /// Remaining output fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Output {
    /// Plain-text preview lines for this output.
    ///
    /// Binary payloads (images etc.) render as a single placeholder line naming the mime type.
    pub fn preview_lines(&self) -> Vec<String> {
        match self.output_type.as_str() {
            "stream" => self
                .fields
                .get("text")
                .map(multiline_text)
                .map(|text| split_preview(&text))
                .unwrap_or_default(),
            "execute_result" | "display_data" => {
                let Some(data) = self.fields.get("data").and_then(Value::as_object) else {
                    return Vec::new();
                };
                if let Some(text) = data.get("text/plain") {
                    return split_preview(&multiline_text(text));
                }
                data.keys()
                    .next()
                    .map(|mime| vec![format!("<{mime}>")])
                    .unwrap_or_default()
            }
            "error" => {
                let ename = self
                    .fields
                    .get("ename")
                    .and_then(Value::as_str)
                    .unwrap_or("Error");
                let evalue = self
                    .fields
                    .get("evalue")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                vec![format!("{ename}: {evalue}")]
            }
            _ => Vec::new(),
        }
    }
}

fn multiline_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

fn split_preview(text: &str) -> Vec<String> {
    let trimmed = text.strip_suffix('\n').unwrap_or(text);
    trimmed.split('\n').map(str::to_string).collect()
}

/// One notebook cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Stable identifier.
    pub id: CellId,
    /// Cell type.
    pub kind: CellKind,
    /// Cell text, lines joined with `\n`.
    pub source: String,
    /// Outputs (code cells only).
    pub outputs: Vec<Output>,
    /// Last execution count reported by the kernel.
    pub execution_count: Option<u64>,
    /// Live execution state; not persisted.
    pub execution_state: ExecutionState,
    /// Cell-level metadata, preserved verbatim.
    pub metadata: Map<String, Value>,
    /// Any other persisted fields this engine does not interpret.
    pub extra: Map<String, Value>,
}

impl Cell {
    /// Create a fresh cell with no outputs or metadata.
    pub fn new(id: CellId, kind: CellKind, source: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            source: source.into(),
            outputs: Vec::new(),
            execution_count: None,
            execution_state: ExecutionState::Idle,
            metadata: Map::new(),
            extra: Map::new(),
        }
    }

    /// Number of content lines this cell renders to.
    pub fn line_count(&self) -> usize {
        content_line_count(&self.source)
    }

    /// Number of Facade lines this cell occupies, delimiters included.
    pub fn rendered_line_count(&self) -> usize {
        2 + self.line_count()
    }

    /// Source split into content lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.source.split('\n')
    }
}

/// Number of newline-separated segments in `source`; an empty source counts as one line.
pub fn content_line_count(source: &str) -> usize {
    source.split('\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_line_count() {
        assert_eq!(content_line_count(""), 1);
        assert_eq!(content_line_count("x = 1"), 1);
        assert_eq!(content_line_count("x = 1\ny = 2"), 2);
        assert_eq!(content_line_count("x = 1\n"), 2);
    }

    #[test]
    fn test_output_preview_stream_and_error() {
        let stream: Output = serde_json::from_value(json!({
            "output_type": "stream",
            "name": "stdout",
            "text": ["a\n", "b\n"]
        }))
        .unwrap();
        assert_eq!(stream.preview_lines(), vec!["a", "b"]);

        let error: Output = serde_json::from_value(json!({
            "output_type": "error",
            "ename": "NameError",
            "evalue": "x is not defined",
            "traceback": []
        }))
        .unwrap();
        assert_eq!(error.preview_lines(), vec!["NameError: x is not defined"]);
    }

    #[test]
    fn test_output_preview_binary_placeholder() {
        let image: Output = serde_json::from_value(json!({
            "output_type": "display_data",
            "data": { "image/png": "iVBOR..." },
            "metadata": {}
        }))
        .unwrap();
        assert_eq!(image.preview_lines(), vec!["<image/png>"]);
    }
}
