//! Rename and format results applied to a notebook.
//!
//! Server edits target the Shadow, whose lines equal Facade lines. They are never applied as a
//! whole-document edit: rename goes through a validated Facade batch followed by a re-parse,
//! and formatting goes through [`NotebookState::apply_cell_edits`], which re-checks that the
//! cell still sits where it was when the request was sent.

use crate::error::ProxyError;
use crate::lsp_sync::{LspCoordinateConverter, LspPosition, LspRange};
use crate::lsp_text_edits::{
    LspTextEdit, facade_edits, workspace_edit_text_edits_for_uri, workspace_edit_uris,
};
use notebook_core::{CellId, CellRange, FacadeEdit, NotebookError, NotebookState, UndoJoin};
use serde_json::Value;
use tracing::{debug, warn};

const RENAME_OUTSIDE_CODE: &str =
    "Rename was not applied: the server proposed edits outside of code cells.";
const FORMAT_SPANS_CELLS: &str =
    "Range formatting must stay inside a single code cell. Select lines of one code cell and try again.";
const FORMAT_NOT_CODE: &str = "Formatting is only available in code cells.";

/// Code cell whose content lines hold `line`.
fn code_cell_at(state: &NotebookState, line: usize) -> Option<(CellId, CellRange)> {
    let index = state.cell_at(line)?;
    let cell = state.cells().get(index)?;
    let range = state.range_of(index)?;
    (cell.kind.is_code() && range.contains_content(line)).then(|| (cell.id.clone(), range))
}

/// Apply a rename `WorkspaceEdit` to the notebook as one undo step.
///
/// Only edits for `shadow_uri` are considered. Every edit must stay inside the content of a
/// single code cell, otherwise nothing is applied. Returns the number of edits applied; an
/// empty or null edit set is a no-op.
pub fn apply_rename(
    state: &mut NotebookState,
    shadow_uri: &str,
    workspace_edit: &Value,
) -> Result<usize, ProxyError> {
    for uri in workspace_edit_uris(workspace_edit) {
        if uri != shadow_uri {
            warn!(%uri, "rename edits for another document ignored");
        }
    }
    let edits = workspace_edit_text_edits_for_uri(workspace_edit, shadow_uri);
    if edits.is_empty() {
        debug!("rename returned no edits");
        return Ok(0);
    }

    let edits = facade_edits(state.facade(), &edits);
    for edit in &edits {
        let inside = code_cell_at(state, edit.start.0)
            .is_some_and(|(_, range)| range.contains_content(edit.end.0));
        if !inside {
            return Err(ProxyError::cross_boundary(RENAME_OUTSIDE_CODE));
        }
    }
    state.edit_facade(&edits, UndoJoin::Break)?;
    Ok(edits.len())
}

/// Apply formatting edits to one code cell.
///
/// `expected` is the cell's range when the request was sent; if the cell has moved or changed
/// size since, [`NotebookError::StaleCellRange`] is returned and nothing changes. An edit that
/// ends at the start of the end marker line is clipped to the end of the last content line.
pub fn apply_cell_format(
    state: &mut NotebookState,
    cell: &CellId,
    expected: CellRange,
    edits: &[LspTextEdit],
) -> Result<usize, ProxyError> {
    if edits.is_empty() {
        return Ok(0);
    }
    let last_line = expected.content_end() - 1;
    let last_len = state.facade().line_len_chars(last_line);
    let mut clipped = Vec::with_capacity(edits.len());
    for edit in facade_edits(state.facade(), edits) {
        if edit.end != (expected.content_end(), 0) {
            clipped.push(edit);
            continue;
        }
        let Some(text) = edit.text.strip_suffix('\n') else {
            return Err(ProxyError::cross_boundary(FORMAT_SPANS_CELLS));
        };
        clipped.push(FacadeEdit::new(edit.start, (last_line, last_len), text));
    }

    match state.apply_cell_edits(cell, expected, &clipped) {
        Ok(()) => Ok(clipped.len()),
        Err(NotebookError::EditOutsideCell { .. }) => {
            Err(ProxyError::cross_boundary(FORMAT_SPANS_CELLS))
        }
        Err(err) => Err(err.into()),
    }
}

/// The cell a range-format request is confined to.
///
/// The range may end at the start of the end marker line (a whole-line selection).
pub fn format_target(
    state: &NotebookState,
    range: LspRange,
) -> Result<(CellId, CellRange), ProxyError> {
    let start = range.start.line as usize;
    let end = range.end.line as usize;
    let Some((id, cell_range)) = code_cell_at(state, start) else {
        return Err(ProxyError::cross_boundary(FORMAT_NOT_CODE));
    };
    let ends_inside = cell_range.contains_content(end)
        || (end == cell_range.content_end() && range.end.character == 0);
    if !ends_inside {
        return Err(ProxyError::cross_boundary(FORMAT_SPANS_CELLS));
    }
    Ok((id, cell_range))
}

/// LSP range covering a cell's content lines.
pub fn cell_content_range(state: &NotebookState, range: CellRange) -> LspRange {
    let last = range.content_end() - 1;
    let text = state.facade().line(last).unwrap_or_default();
    LspRange::new(
        LspPosition::new(range.content_start() as u32, 0),
        LspPosition::new(
            last as u32,
            LspCoordinateConverter::utf8_to_utf16_len(&text) as u32,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp_text_edits::text_edits_from_value;
    use notebook_core::{Cell, CellKind, NotebookConfig};
    use serde_json::json;

    const SHADOW: &str = "file:///nb.ipynb.py";

    fn state() -> NotebookState {
        // Lines: 0 code start, 1 "x = 1", 2 end, 3 blank, 4 md start, 5 "text", 6 end,
        // 7 blank, 8 code start, 9 "y = x", 10 "print(y)", 11 end, 12 blank
        NotebookState::from_cells(
            vec![
                Cell::new(CellId::new("a"), CellKind::Code, "x = 1"),
                Cell::new(CellId::new("m"), CellKind::Markdown, "text"),
                Cell::new(CellId::new("b"), CellKind::Code, "y = x\nprint(y)"),
            ],
            NotebookConfig::default(),
        ).unwrap()
    }

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
    fn test_rename_rejects_edits_on_markers() {
        let mut state = state();
        let before = state.facade().text();
        let workspace_edit = json!({ "changes": { SHADOW: [edit(0, 0, 1, "z")] } });
        let err = apply_rename(&mut state, SHADOW, &workspace_edit).unwrap_err();
        assert!(matches!(err, ProxyError::CrossBoundary { .. }));
        assert_eq!(state.facade().text(), before);
    }

    #[test]
    fn test_format_target_validation() {
        let state = state();
        let range = |a: (u32, u32), b: (u32, u32)| {
            LspRange::new(LspPosition::new(a.0, a.1), LspPosition::new(b.0, b.1))
        };
        let (id, _) = format_target(&state, range((9, 0), (10, 8))).unwrap();
        assert_eq!(id, CellId::new("b"));
        assert!(format_target(&state, range((9, 0), (11, 0))).is_ok());
        assert!(matches!(
            format_target(&state, range((1, 0), (9, 0))),
            Err(ProxyError::CrossBoundary { .. })
        ));
        assert!(matches!(
            format_target(&state, range((5, 0), (5, 2))),
            Err(ProxyError::CrossBoundary { .. })
        ));
    }

    #[test]
    fn test_cell_format_clips_whole_line_replacement() {
        let mut state = state();
        let range = state.range_of(2).unwrap();
        assert_eq!(
            cell_content_range(&state, range),
            LspRange::new(LspPosition::new(9, 0), LspPosition::new(10, 8))
        );
        let edits = text_edits_from_value(&json!([{
            "range": {
                "start": { "line": 9, "character": 0 },
                "end": { "line": 11, "character": 0 }
            },
            "newText": "y = x\nprint( y )\n"
        }]));
        let applied = apply_cell_format(&mut state, &CellId::new("b"), range, &edits).unwrap();
        assert_eq!(applied, 1);
        assert_eq!(state.cells().get(2).unwrap().source, "y = x\nprint( y )");
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_cell_format_detects_moved_cell() {
        let mut state = state();
        let range = state.range_of(2).unwrap();
        state.insert_cell(0, CellKind::Code, "import os").unwrap();
        let edits = text_edits_from_value(&json!([edit(9, 0, 1, "Y")]));
        let err = apply_cell_format(&mut state, &CellId::new("b"), range, &edits).unwrap_err();
        assert!(matches!(
            err,
            ProxyError::Notebook(NotebookError::StaleCellRange(_))
        ));
        assert_eq!(state.cells().get(3).unwrap().source, "y = x\nprint(y)");
    }
}
