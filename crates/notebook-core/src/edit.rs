//! Edit Surface: a transient buffer holding one cell's content.

use crate::boundary::CellRange;
use crate::buffer::{TextBuffer, UndoJoin};
use crate::cell::CellId;

/// The cell being edited and the bookkeeping needed to sync it back.
#[derive(Debug)]
pub struct EditSurface {
    cell: CellId,
    generation: u64,
    range: CellRange,
    buffer: TextBuffer,
    last_revision: u64,
}

impl EditSurface {
    pub(crate) fn new(cell: CellId, generation: u64, range: CellRange, source: &str) -> Self {
        let buffer = TextBuffer::new(source);
        let last_revision = buffer.revision();
        Self {
            cell,
            generation,
            range,
            buffer,
            last_revision,
        }
    }

    /// Cell being edited.
    pub fn cell(&self) -> &CellId {
        &self.cell
    }

    /// Distinguishes successive edit sessions; a handle from a closed session never matches
    /// the current one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Facade range of the cell as of the last sync.
    pub fn range(&self) -> CellRange {
        self.range
    }

    /// Facade line of the Edit Surface's line 0.
    pub fn line_offset(&self) -> usize {
        self.range.content_start()
    }

    /// The edit buffer.
    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Mutable edit buffer; call [`NotebookState::sync_edit`](crate::NotebookState::sync_edit)
    /// after changing it.
    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    /// Whether the buffer changed since the last sync.
    pub fn is_dirty(&self) -> bool {
        self.buffer.revision() != self.last_revision
    }

    pub(crate) fn mark_synced(&mut self, range: CellRange) {
        self.range = range;
        self.last_revision = self.buffer.revision();
    }

    /// Replace the buffer content from the cell without producing a sync back to the Facade.
    pub(crate) fn reload(&mut self, source: &str, range: CellRange) {
        self.buffer.set_text(source, UndoJoin::Break);
        self.mark_synced(range);
    }
}
