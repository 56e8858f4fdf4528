//! Minimal helpers for turning LSP `TextEdit` / `WorkspaceEdit` structures into Facade edits.
//!
//! Only the subset needed for formatting and rename is parsed. Edits come back in Shadow
//! coordinates, which equal Facade coordinates line for line; only the UTF-16 columns need
//! converting to characters.

use crate::lsp_sync::{LspCoordinateConverter, LspRange};
use notebook_core::{FacadeEdit, TextBuffer};
use serde_json::Value;
use std::cmp::Reverse;

/// A minimal representation of an LSP `TextEdit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LspTextEdit {
    /// The range to replace (UTF-16 based line/character positions).
    pub range: LspRange,
    /// Replacement text (may contain newlines).
    pub new_text: String,
}

impl LspTextEdit {
    /// Parse a `TextEdit`-shaped JSON value.
    pub fn from_value(value: &Value) -> Option<Self> {
        let range = LspRange::from_value(value.get("range")?)?;
        let new_text = value
            .get("newText")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        Some(Self { range, new_text })
    }
}

/// Parse a JSON array of `TextEdit` values.
pub fn text_edits_from_value(value: &Value) -> Vec<LspTextEdit> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(LspTextEdit::from_value)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

/// Extract all `TextEdit`s in a `WorkspaceEdit` for the given `uri`.
///
/// Handles both:
/// - `workspaceEdit.changes[uri]`
/// - `workspaceEdit.documentChanges[]` containing `TextDocumentEdit`
pub fn workspace_edit_text_edits_for_uri(workspace_edit: &Value, uri: &str) -> Vec<LspTextEdit> {
    let mut out = Vec::<LspTextEdit>::new();

    if let Some(changes) = workspace_edit.get("changes").and_then(Value::as_object)
        && let Some(edits) = changes.get(uri)
    {
        out.extend(text_edits_from_value(edits));
    }

    if let Some(document_changes) = workspace_edit
        .get("documentChanges")
        .and_then(Value::as_array)
    {
        for change in document_changes {
            // TextDocumentEdit: { textDocument: { uri, version? }, edits: [...] }
            let Some(change_uri) = change
                .get("textDocument")
                .and_then(|doc| doc.get("uri"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if change_uri != uri {
                continue;
            }
            if let Some(edits) = change.get("edits") {
                out.extend(text_edits_from_value(edits));
            }
        }
    }

    out
}

/// Every document URI a `WorkspaceEdit` touches.
pub fn workspace_edit_uris(workspace_edit: &Value) -> Vec<String> {
    let mut uris = Vec::new();
    if let Some(changes) = workspace_edit.get("changes").and_then(Value::as_object) {
        uris.extend(changes.keys().cloned());
    }
    if let Some(document_changes) = workspace_edit
        .get("documentChanges")
        .and_then(Value::as_array)
    {
        uris.extend(document_changes.iter().filter_map(|change| {
            change
                .get("textDocument")
                .and_then(|doc| doc.get("uri"))
                .and_then(Value::as_str)
                .map(str::to_string)
        }));
    }
    uris.sort();
    uris.dedup();
    uris
}

/// Document versions a `WorkspaceEdit` names for `uri` in `documentChanges`.
///
/// `changes` entries and `TextDocumentEdit`s with a null version carry none.
pub fn workspace_edit_versions_for_uri(workspace_edit: &Value, uri: &str) -> Vec<i64> {
    workspace_edit
        .get("documentChanges")
        .and_then(Value::as_array)
        .map(|changes| {
            changes
                .iter()
                .filter_map(|change| change.get("textDocument"))
                .filter(|doc| doc.get("uri").and_then(Value::as_str) == Some(uri))
                .filter_map(|doc| doc.get("version").and_then(Value::as_i64))
                .collect()
        })
        .unwrap_or_default()
}

/// Convert LSP edits into Facade edits, sorted bottom to top and right to left.
pub fn facade_edits(facade: &TextBuffer, edits: &[LspTextEdit]) -> Vec<FacadeEdit> {
    let column = |line: u32, character: u32| {
        let text = facade.line(line as usize).unwrap_or_default();
        LspCoordinateConverter::lsp_to_char_offset(&text, character)
    };
    let mut out: Vec<FacadeEdit> = edits
        .iter()
        .map(|edit| {
            let (start, end) = (edit.range.start, edit.range.end);
            FacadeEdit::new(
                (start.line as usize, column(start.line, start.character)),
                (end.line as usize, column(end.line, end.character)),
                edit.new_text.clone(),
            )
        })
        .collect();
    out.sort_by_key(|edit| Reverse(edit.start));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn edit(line: u32, from: u32, to: u32, text: &str) -> Value {
        json!({
            "range": {
                "start": { "line": line, "character": from },
                "end": { "line": line, "character": to }
            },
            "newText": text
        })
    }

    #[test]
    fn test_workspace_edit_changes_and_document_changes() {
        let uri = "file:///nb.ipynb.py";
        let workspace_edit = json!({
            "changes": { uri: [edit(1, 0, 1, "a")] },
            "documentChanges": [
                { "textDocument": { "uri": uri, "version": 3 }, "edits": [edit(5, 0, 1, "b")] },
                { "textDocument": { "uri": "file:///other.py" }, "edits": [edit(0, 0, 0, "c")] }
            ]
        });
        let edits = workspace_edit_text_edits_for_uri(&workspace_edit, uri);
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[1].new_text, "b");
        assert_eq!(
            workspace_edit_uris(&workspace_edit),
            vec!["file:///nb.ipynb.py".to_string(), "file:///other.py".to_string()]
        );
    }

    #[test]
    fn test_document_change_versions() {
        let uri = "file:///nb.ipynb.py";
        let workspace_edit = json!({
            "changes": { uri: [edit(1, 0, 1, "a")] },
            "documentChanges": [
                { "textDocument": { "uri": uri, "version": 3 }, "edits": [] },
                { "textDocument": { "uri": uri, "version": null }, "edits": [] },
                { "textDocument": { "uri": "file:///other.py", "version": 9 }, "edits": [] }
            ]
        });
        assert_eq!(workspace_edit_versions_for_uri(&workspace_edit, uri), vec![3]);
        assert!(workspace_edit_versions_for_uri(&json!({ "changes": {} }), uri).is_empty());
    }

    #[test]
    fn test_facade_edits_are_bottom_up_with_char_columns() {
        let facade = TextBuffer::new("s = '👋' + x\nx = 1");
        let edits = text_edits_from_value(&json!([edit(1, 0, 1, "y"), edit(0, 11, 12, "y")]));
        let out = facade_edits(&facade, &edits);
        assert_eq!(
            out,
            vec![
                FacadeEdit::new((1, 0), (1, 1), "y"),
                FacadeEdit::new((0, 10), (0, 11), "y"),
            ]
        );
    }
}
