//! Cell decorations (virtual text) derived from notebook state.
//!
//! Decorations never modify the Facade text. Hosts draw them over or between Facade lines:
//! borders replace the delimiter lines visually, the execution label sits on the start border,
//! and output previews are virtual lines below the end border.

use crate::boundary::CellRange;
use crate::cell::{Cell, ExecutionState};
use unicode_width::UnicodeWidthStr;

/// Narrowest border drawn, in terminal columns.
const MIN_BORDER_WIDTH: usize = 40;
/// Output preview lines shown per cell before truncation.
const MAX_OUTPUT_LINES: usize = 10;

/// Where to render a decoration relative to its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationPlacement {
    /// Drawn over the line, hiding its text.
    Overlay,
    /// Rendered after the line's text.
    EndOfLine,
    /// Virtual lines inserted below the line.
    BelowLine,
}

/// A coarse decoration kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DecorationKind {
    /// Cell border over a delimiter line.
    Border,
    /// `[n]`, `[*]` or `[ ]` execution label.
    ExecutionLabel,
    /// Output preview text.
    Output,
}

/// A single decoration item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    /// Facade line the decoration is attached to.
    pub line: usize,
    /// Placement relative to `line`.
    pub placement: DecorationPlacement,
    /// Decoration kind.
    pub kind: DecorationKind,
    /// Text to draw; may span several lines for [`DecorationPlacement::BelowLine`].
    pub lines: Vec<String>,
}

/// Execution label for a code cell.
pub fn execution_label(cell: &Cell) -> String {
    match cell.execution_state {
        ExecutionState::Busy | ExecutionState::Queued => "[*]".to_string(),
        ExecutionState::Idle => match cell.execution_count {
            Some(count) => format!("[{count}]"),
            None => "[ ]".to_string(),
        },
    }
}

/// Decorations for one cell at `range`.
pub fn cell_decorations(cell: &Cell, range: CellRange) -> Vec<Decoration> {
    let width = cell
        .lines()
        .map(UnicodeWidthStr::width)
        .max()
        .unwrap_or(0)
        .max(MIN_BORDER_WIDTH);

    let title = format!("─ {} ", cell.kind.as_str());
    let fill = width.saturating_sub(title.width());
    let mut out = vec![
        Decoration {
            line: range.start,
            placement: DecorationPlacement::Overlay,
            kind: DecorationKind::Border,
            lines: vec![format!("╭{title}{}", "─".repeat(fill))],
        },
        Decoration {
            line: range.end,
            placement: DecorationPlacement::Overlay,
            kind: DecorationKind::Border,
            lines: vec![format!("╰{}", "─".repeat(width))],
        },
    ];

    if !cell.kind.is_code() {
        return out;
    }
    out.push(Decoration {
        line: range.start,
        placement: DecorationPlacement::EndOfLine,
        kind: DecorationKind::ExecutionLabel,
        lines: vec![execution_label(cell)],
    });

    let mut preview: Vec<String> = cell
        .outputs
        .iter()
        .flat_map(|output| output.preview_lines())
        .collect();
    if preview.is_empty() {
        return out;
    }
    if preview.len() > MAX_OUTPUT_LINES {
        let hidden = preview.len() - MAX_OUTPUT_LINES;
        preview.truncate(MAX_OUTPUT_LINES);
        preview.push(format!("… {hidden} more lines"));
    }
    out.push(Decoration {
        line: range.end,
        placement: DecorationPlacement::BelowLine,
        kind: DecorationKind::Output,
        lines: preview,
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellId, CellKind, Output};
    use serde_json::json;

    #[test]
    fn test_code_cell_decorations() {
        let mut cell = Cell::new(CellId::new("c"), CellKind::Code, "print('漢字')");
        cell.execution_count = Some(4);
        cell.outputs.push(
            serde_json::from_value::<Output>(json!({
                "output_type": "stream", "name": "stdout", "text": "漢字\n"
            }))
            .unwrap(),
        );
        let decorations = cell_decorations(&cell, CellRange { start: 4, end: 6 });

        assert_eq!(decorations.len(), 4);
        assert_eq!(decorations[0].line, 4);
        assert!(decorations[0].lines[0].starts_with("╭─ code "));
        assert_eq!(decorations[0].lines[0].width(), MIN_BORDER_WIDTH + 1);
        assert_eq!(decorations[2].lines, vec!["[4]"]);
        assert_eq!(decorations[3].line, 6);
        assert_eq!(decorations[3].lines, vec!["漢字"]);
    }

    #[test]
    fn test_output_preview_truncates() {
        let mut cell = Cell::new(CellId::new("c"), CellKind::Code, "");
        let text: String = (0..15).map(|i| format!("{i}\n")).collect();
        cell.outputs.push(
            serde_json::from_value::<Output>(json!({
                "output_type": "stream", "name": "stdout", "text": text
            }))
            .unwrap(),
        );
        let decorations = cell_decorations(&cell, CellRange { start: 0, end: 2 });
        let output = decorations
            .iter()
            .find(|d| d.kind == DecorationKind::Output)
            .unwrap();
        assert_eq!(output.lines.len(), MAX_OUTPUT_LINES + 1);
        assert_eq!(output.lines.last().unwrap(), "… 5 more lines");
    }

    #[test]
    fn test_markdown_cell_has_only_borders() {
        let cell = Cell::new(CellId::new("m"), CellKind::Markdown, "# hi");
        let decorations = cell_decorations(&cell, CellRange { start: 0, end: 2 });
        assert!(decorations.iter().all(|d| d.kind == DecorationKind::Border));
    }
}
