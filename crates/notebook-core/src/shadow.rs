//! Shadow surface: the Facade with everything but code blanked out.
//!
//! The Shadow has exactly as many lines as the Facade. A line inside a code cell holds the same
//! text as the Facade line; every other line (delimiters, separators, markdown and raw content)
//! is empty. That makes Facade and Shadow coordinates interchangeable, which is what lets the
//! language server see plain code while the user edits the rendered notebook.
//!
//! The Shadow has no undo history; it is always derived. Once a language server knows about it,
//! its edits are tracked so the protocol proxy can forward them as incremental `didChange`
//! notifications.

use crate::boundary::CellRange;
use crate::buffer::{TextBuffer, UndoJoin};
use crate::cell::Cell;
use crate::store::CellStore;

/// Shadow lines for one cell's content.
pub fn shadow_content_lines(cell: &Cell) -> Vec<String> {
    if cell.kind.is_code() {
        cell.lines().map(str::to_string).collect()
    } else {
        vec![String::new(); cell.line_count()]
    }
}

/// Complete Shadow text lines for `cells`.
pub fn shadow_lines(cells: &CellStore) -> Vec<String> {
    let mut out = Vec::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(String::new());
        }
        out.push(String::new());
        out.extend(shadow_content_lines(cell));
        out.push(String::new());
    }
    out.push(String::new());
    out
}

/// The code-only mirror document.
#[derive(Debug)]
pub struct Shadow {
    buffer: TextBuffer,
}

impl Shadow {
    /// Build the Shadow for `cells`.
    pub fn new(cells: &CellStore) -> Self {
        let text = shadow_lines(cells).join("\n");
        Self {
            buffer: TextBuffer::new(&text),
        }
    }

    /// Underlying buffer.
    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Full text.
    pub fn text(&self) -> String {
        self.buffer.text()
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    /// Bring the whole Shadow in line with `cells`, touching only the lines that differ.
    pub fn refresh(&mut self, cells: &CellStore) -> bool {
        self.buffer.set_lines(&shadow_lines(cells), UndoJoin::Break)
    }

    /// Re-mirror one cell whose content lines used to occupy `old` (Facade coordinates before
    /// the edit).
    ///
    /// Non-code cells only touch the Shadow when their line count changed.
    pub fn patch_cell(&mut self, old: CellRange, cell: &Cell) {
        if !cell.kind.is_code() && old.content_len() == cell.line_count() {
            return;
        }
        let lines = shadow_content_lines(cell);
        let current = self.buffer.lines_in(old.content_start(), old.content_end());
        if current == lines {
            return;
        }
        self.buffer
            .replace_lines(old.content_start(), old.content_end(), &lines, UndoJoin::Break);
    }

    /// Start or stop recording edits for `didChange`; pending edits are dropped either way.
    pub fn set_tracking(&mut self, enabled: bool) {
        self.buffer.set_edit_tracking(enabled);
    }

    /// Whether edits are being recorded.
    pub fn is_tracking(&self) -> bool {
        self.buffer.is_tracking_edits()
    }

    /// Drain edits made since the last call, for `didChange`.
    pub fn take_pending_edits(&mut self) -> Vec<crate::buffer::BufferEdit> {
        self.buffer.take_pending_edits()
    }
}
