//! Persisted notebook (`.ipynb` JSON) codec.
//!
//! Only the fields the engine needs are interpreted. Everything else (document metadata,
//! unknown cell keys, output payloads) is carried through verbatim so a load/save cycle is
//! lossless.

use crate::cell::{Cell, CellId, CellKind, ExecutionState, Output};
use crate::error::PersistError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Cell source as stored on disk: a single string or a list of lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultilineText {
    /// One string.
    Text(String),
    /// Lines, each but the last ending with `\n`.
    Lines(Vec<String>),
}

impl MultilineText {
    /// Join into a single string.
    pub fn into_string(self) -> String {
        match self {
            MultilineText::Text(text) => text,
            MultilineText::Lines(lines) => lines.concat(),
        }
    }

    /// Split `text` into the on-disk line array form.
    pub fn from_source(text: &str) -> Self {
        MultilineText::Lines(text.split_inclusive('\n').map(str::to_string).collect())
    }
}

impl Default for MultilineText {
    fn default() -> Self {
        MultilineText::Lines(Vec::new())
    }
}

/// One cell as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookCell {
    /// Cell id (nbformat >= 4.5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `code`, `markdown` or `raw`.
    pub cell_type: String,
    /// Cell metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Cell source.
    #[serde(default)]
    pub source: MultilineText,
    /// Outputs (code cells).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<Output>>,
    /// Execution count (code cells); written as `null` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_count: Option<Value>,
    /// Fields this engine does not interpret (e.g. `attachments`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_nbformat() -> u32 {
    4
}

fn default_nbformat_minor() -> u32 {
    5
}

/// A whole notebook document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    /// Ordered cells.
    pub cells: Vec<NotebookCell>,
    /// Document metadata (kernelspec, language_info, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Major format version.
    #[serde(default = "default_nbformat")]
    pub nbformat: u32,
    /// Minor format version.
    #[serde(default = "default_nbformat_minor")]
    pub nbformat_minor: u32,
    /// Other top-level fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notebook {
    /// Empty notebook with default format versions.
    pub fn empty() -> Self {
        Self {
            cells: Vec::new(),
            metadata: Map::new(),
            nbformat: default_nbformat(),
            nbformat_minor: default_nbformat_minor(),
            extra: Map::new(),
        }
    }

    /// Decode a notebook. Malformed input is an error; nothing is silently dropped.
    pub fn from_json(text: &str) -> Result<Self, PersistError> {
        let notebook: Notebook = serde_json::from_str(text)?;
        for (index, cell) in notebook.cells.iter().enumerate() {
            if CellKind::parse(&cell.cell_type).is_none() {
                return Err(PersistError::UnsupportedCellType {
                    index,
                    kind: cell.cell_type.clone(),
                });
            }
        }
        Ok(notebook)
    }

    /// Encode with one-space indentation and a trailing newline, as Jupyter writes it.
    pub fn to_json(&self) -> Result<String, PersistError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        let mut text = String::from_utf8_lossy(&buf).into_owned();
        text.push('\n');
        Ok(text)
    }

    /// Kernel language named in the metadata, if any.
    pub fn language(&self) -> Option<&str> {
        self.metadata
            .get("language_info")
            .and_then(|info| info.get("name"))
            .or_else(|| {
                self.metadata
                    .get("kernelspec")
                    .and_then(|spec| spec.get("language"))
            })
            .and_then(Value::as_str)
    }

    /// Convert on-disk cells into engine cells. Missing ids stay empty and are assigned by the
    /// [`CellStore`](crate::CellStore).
    pub fn take_cells(&mut self) -> Result<Vec<Cell>, PersistError> {
        std::mem::take(&mut self.cells)
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let kind = CellKind::parse(&raw.cell_type).ok_or_else(|| {
                    PersistError::UnsupportedCellType {
                        index,
                        kind: raw.cell_type.clone(),
                    }
                })?;
                Ok(Cell {
                    id: CellId::new(raw.id.unwrap_or_default()),
                    kind,
                    source: raw.source.into_string(),
                    outputs: raw.outputs.unwrap_or_default(),
                    execution_count: raw.execution_count.as_ref().and_then(Value::as_u64),
                    execution_state: ExecutionState::Idle,
                    metadata: raw.metadata,
                    extra: raw.extra,
                })
            })
            .collect()
    }

    /// Build a document from engine cells, reusing this notebook's document-level fields.
    pub fn with_cells<'a, I>(&self, cells: I) -> Notebook
    where
        I: IntoIterator<Item = &'a Cell>,
    {
        let cells = cells
            .into_iter()
            .map(|cell| {
                let code = cell.kind.is_code();
                NotebookCell {
                    id: Some(cell.id.as_str().to_string()),
                    cell_type: cell.kind.as_str().to_string(),
                    metadata: cell.metadata.clone(),
                    source: MultilineText::from_source(&cell.source),
                    outputs: code.then(|| cell.outputs.clone()),
                    execution_count: code
                        .then(|| cell.execution_count.map(Value::from).unwrap_or(Value::Null)),
                    extra: cell.extra.clone(),
                }
            })
            .collect();
        Notebook {
            cells,
            metadata: self.metadata.clone(),
            nbformat: self.nbformat,
            nbformat_minor: self.nbformat_minor,
            extra: self.extra.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "cells": [
                {
                    "cell_type": "markdown",
                    "id": "m1",
                    "metadata": {},
                    "source": ["# Title\n", "text"],
                    "attachments": { "a.png": {} }
                },
                {
                    "cell_type": "code",
                    "id": "c1",
                    "metadata": { "tags": ["x"] },
                    "source": "x = 1",
                    "outputs": [{ "output_type": "stream", "name": "stdout", "text": "1\n" }],
                    "execution_count": 3
                }
            ],
            "metadata": { "kernelspec": { "language": "python", "name": "python3" } },
            "nbformat": 4,
            "nbformat_minor": 5,
            "x-custom": true
        })
    }

    #[test]
    fn test_load_interprets_known_fields() {
        let mut notebook = Notebook::from_json(&sample().to_string()).unwrap();
        assert_eq!(notebook.language(), Some("python"));
        let cells = notebook.take_cells().unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].source, "# Title\ntext");
        assert_eq!(cells[0].kind, CellKind::Markdown);
        assert_eq!(cells[1].execution_count, Some(3));
        assert_eq!(cells[1].outputs.len(), 1);
        assert!(cells[0].extra.contains_key("attachments"));
    }

    #[test]
    fn test_save_roundtrip_is_lossless() {
        let mut notebook = Notebook::from_json(&sample().to_string()).unwrap();
        let cells = notebook.take_cells().unwrap();
        let saved = notebook.with_cells(&cells).to_json().unwrap();
        let value: Value = serde_json::from_str(&saved).unwrap();

        let mut expected = sample();
        expected["cells"][1]["source"] = json!(["x = 1"]);
        assert_eq!(value, expected);
    }

    #[test]
    fn test_malformed_input_fails_loudly() {
        assert!(Notebook::from_json("{ not json").is_err());
        assert!(Notebook::from_json(r#"{ "metadata": {} }"#).is_err());
        let bad = json!({ "cells": [{ "cell_type": "sql", "source": "" }] });
        assert!(matches!(
            Notebook::from_json(&bad.to_string()),
            Err(PersistError::UnsupportedCellType { index: 0, .. })
        ));
    }

    #[test]
    fn test_source_lines_only_last_lacks_newline() {
        assert_eq!(
            MultilineText::from_source("a\nb"),
            MultilineText::Lines(vec!["a\n".to_string(), "b".to_string()])
        );
        assert_eq!(MultilineText::from_source(""), MultilineText::Lines(vec![]));
    }
}
