//! Boundary Tracker: cell index <-> Facade line range.
//!
//! Each cell's start marker line carries an anchor in the Facade [`TextBuffer`]. Anchors move
//! with edits made above them and disappear when their line is deleted, so after any edit the
//! tracker can still answer "where is cell N" without re-parsing. Anchors are re-placed from
//! the layout after every structural change.

use crate::buffer::TextBuffer;
use crate::error::InvariantViolation;
use crate::format::{Markers, layout_start_lines};
use crate::store::CellStore;

/// Inclusive Facade line range of one cell, delimiters included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    /// Start marker line.
    pub start: usize,
    /// End marker line.
    pub end: usize,
}

impl CellRange {
    /// First content line.
    pub fn content_start(&self) -> usize {
        self.start + 1
    }

    /// Exclusive end of the content lines (the end marker line).
    pub fn content_end(&self) -> usize {
        self.end
    }

    /// Number of content lines.
    pub fn content_len(&self) -> usize {
        self.end - self.start - 1
    }

    /// Whether `line` is one of the cell's content lines.
    pub fn contains_content(&self, line: usize) -> bool {
        line > self.start && line < self.end
    }
}

/// Anchor bookkeeping over a Facade buffer.
pub struct BoundaryTracker;

impl BoundaryTracker {
    /// Re-bind one anchor per cell at the line the layout puts its start marker on.
    pub fn place(cells: &CellStore, facade: &mut TextBuffer) {
        facade.clear_anchors();
        for (cell, line) in cells.iter().zip(layout_start_lines(cells.iter())) {
            facade.bind_anchor(cell.id.clone(), line);
        }
    }

    /// Current line range of the cell at `index`.
    ///
    /// `None` if the index is out of range, the cell's anchor was invalidated, or the range no
    /// longer fits in the buffer.
    pub fn range_of(cells: &CellStore, facade: &TextBuffer, index: usize) -> Option<CellRange> {
        let cell = cells.get(index)?;
        let start = facade.anchor_line(&cell.id)?;
        let end = start + cell.rendered_line_count() - 1;
        (end < facade.line_count()).then_some(CellRange { start, end })
    }

    /// Index of the last cell whose start anchor is at or before `line`.
    pub fn cell_at(cells: &CellStore, facade: &TextBuffer, line: usize) -> Option<usize> {
        (0..cells.len()).rev().find(|&index| {
            cells
                .get(index)
                .and_then(|cell| facade.anchor_line(&cell.id))
                .is_some_and(|start| start <= line)
        })
    }

    /// Check every anchor and delimiter line against the layout.
    pub fn verify(
        cells: &CellStore,
        facade: &TextBuffer,
        markers: &Markers,
    ) -> Result<(), InvariantViolation> {
        for (cell, expected) in cells.iter().zip(layout_start_lines(cells.iter())) {
            let actual = facade
                .anchor_line(&cell.id)
                .ok_or_else(|| InvariantViolation::MissingAnchor(cell.id.clone()))?;
            if actual != expected {
                return Err(InvariantViolation::AnchorDrift {
                    id: cell.id.clone(),
                    actual,
                    expected,
                });
            }

            let start_marker = markers.start_marker(cell.kind);
            if facade.line(expected).as_deref() != Some(start_marker.as_str()) {
                return Err(InvariantViolation::MarkerMismatch {
                    line: expected,
                    expected: start_marker,
                });
            }
            let end = expected + cell.rendered_line_count() - 1;
            if facade.line(end).as_deref() != Some(markers.end_marker()) {
                return Err(InvariantViolation::MarkerMismatch {
                    line: end,
                    expected: markers.end_marker().to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::UndoJoin;
    use crate::cell::CellKind;
    use crate::config::NotebookConfig;

    fn setup() -> (CellStore, TextBuffer, Markers) {
        let mut cells = CellStore::new();
        cells.insert(0, CellKind::Markdown, "# a").unwrap();
        cells.insert(1, CellKind::Code, "x = 1\ny = 2").unwrap();
        cells.insert(2, CellKind::Code, "").unwrap();
        let markers = Markers::new(&NotebookConfig::default());
        let mut facade = TextBuffer::new(&markers.render(cells.iter()));
        BoundaryTracker::place(&cells, &mut facade);
        (cells, facade, markers)
    }

    #[test]
    fn test_range_of_and_cell_at() {
        let (cells, facade, markers) = setup();
        assert_eq!(
            BoundaryTracker::range_of(&cells, &facade, 1),
            Some(CellRange { start: 4, end: 7 })
        );
        assert_eq!(BoundaryTracker::cell_at(&cells, &facade, 0), Some(0));
        assert_eq!(BoundaryTracker::cell_at(&cells, &facade, 3), Some(0));
        assert_eq!(BoundaryTracker::cell_at(&cells, &facade, 5), Some(1));
        assert_eq!(BoundaryTracker::cell_at(&cells, &facade, 11), Some(2));
        assert_eq!(BoundaryTracker::range_of(&cells, &facade, 3), None);
        assert!(BoundaryTracker::verify(&cells, &facade, &markers).is_ok());
    }

    #[test]
    fn test_anchor_follows_edit_above() {
        let (cells, mut facade, _) = setup();
        // Add a content line to the markdown cell.
        facade.replace_lines(2, 2, &["more"], UndoJoin::Break);
        assert_eq!(
            BoundaryTracker::range_of(&cells, &facade, 1),
            Some(CellRange { start: 5, end: 8 })
        );
    }

    #[test]
    fn test_deleted_marker_invalidates_anchor() {
        let (cells, mut facade, markers) = setup();
        facade.replace_lines(4, 5, &Vec::<String>::new(), UndoJoin::Break);
        assert_eq!(BoundaryTracker::range_of(&cells, &facade, 1), None);
        assert!(matches!(
            BoundaryTracker::verify(&cells, &facade, &markers),
            Err(InvariantViolation::MissingAnchor(_))
        ));
    }
}
