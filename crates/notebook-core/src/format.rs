//! Rendered (Facade) text format.
//!
//! ```text
//! # <<ipynb:markdown>>
//! # heading
//! # <</ipynb>>
//!
//! # <<ipynb:code>>
//! x = 1
//! # <</ipynb>>
//!
//! ```
//!
//! Each cell is a start marker naming its type, its content lines (an empty source renders as
//! one blank line), and a uniform end marker. One blank line separates cells and one trailing
//! blank line follows the last cell. Inside a cell every line except the end marker is content,
//! so a source line that looks like a start marker survives a round trip. A source line equal
//! to the end marker cannot be represented and is refused by [`Markers::check_source`].
//! [`Markers::parse`] inverts [`Markers::render`] exactly for every source that check accepts.

use crate::cell::{Cell, CellKind};
use crate::config::NotebookConfig;
use crate::error::ParseError;
use regex::Regex;

/// A cell recovered from rendered text; identity is assigned later by
/// [`CellStore::reconcile`](crate::CellStore::reconcile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCell {
    /// Cell type from the start marker.
    pub kind: CellKind,
    /// Content lines joined with `\n`.
    pub source: String,
}

impl From<&Cell> for ParsedCell {
    fn from(cell: &Cell) -> Self {
        Self {
            kind: cell.kind,
            source: cell.source.clone(),
        }
    }
}

/// Compiled delimiter set.
#[derive(Debug, Clone)]
pub struct Markers {
    tag: String,
    start: Regex,
    end: String,
}

impl Markers {
    /// Build the delimiter set for `config.marker_tag`.
    pub fn new(config: &NotebookConfig) -> Self {
        let pattern = format!(r"^# <<{}:([A-Za-z]+)>>$", regex::escape(&config.marker_tag));
        Self {
            tag: config.marker_tag.clone(),
            // The pattern is built from an escaped literal and always compiles.
            start: Regex::new(&pattern).unwrap_or_else(|_| unreachable!("escaped marker regex")),
            end: config.end_marker(),
        }
    }

    /// Start delimiter for `kind`.
    pub fn start_marker(&self, kind: CellKind) -> String {
        format!("# <<{}:{}>>", self.tag, kind.as_str())
    }

    /// End delimiter.
    pub fn end_marker(&self) -> &str {
        &self.end
    }

    /// If `line` is a start delimiter, the type name it carries.
    pub fn start_kind<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.start
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Whether `line` is the end delimiter.
    pub fn is_end(&self, line: &str) -> bool {
        line == self.end
    }

    /// Reject a cell source that cannot be rendered unambiguously.
    pub fn check_source(&self, source: &str) -> Result<(), ParseError> {
        match source.split('\n').position(|line| self.is_end(line)) {
            Some(line) => Err(ParseError::EndMarkerInSource {
                line,
                marker: self.end.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Render a single cell block (delimiters included).
    pub fn render_cell(&self, kind: CellKind, source: &str, out: &mut Vec<String>) {
        out.push(self.start_marker(kind));
        out.extend(source.split('\n').map(str::to_string));
        out.push(self.end.clone());
    }

    /// Render cells to Facade lines.
    pub fn render_lines<'a, I>(&self, cells: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a Cell>,
    {
        let mut out = Vec::new();
        for (i, cell) in cells.into_iter().enumerate() {
            if i > 0 {
                out.push(String::new());
            }
            self.render_cell(cell.kind, &cell.source, &mut out);
        }
        out.push(String::new());
        out
    }

    /// Render cells to Facade text.
    pub fn render<'a, I>(&self, cells: I) -> String
    where
        I: IntoIterator<Item = &'a Cell>,
    {
        self.render_lines(cells).join("\n")
    }

    /// Parse Facade text back into cells.
    pub fn parse(&self, text: &str) -> Result<Vec<ParsedCell>, ParseError> {
        self.parse_lines(text.split('\n'))
    }

    /// Parse Facade lines back into cells.
    pub fn parse_lines<'a, I>(&self, lines: I) -> Result<Vec<ParsedCell>, ParseError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut cells = Vec::new();
        // (start line, kind, content lines)
        let mut open: Option<(usize, CellKind, Vec<&str>)> = None;

        for (line_no, line) in lines.into_iter().enumerate() {
            if let Some(name) = self.start_kind(line)
                && open.is_none()
            {
                let kind = CellKind::parse(name).ok_or_else(|| ParseError::UnknownKind {
                    line: line_no,
                    kind: name.to_string(),
                })?;
                open = Some((line_no, kind, Vec::new()));
                continue;
            }

            if self.is_end(line) {
                let Some((_, kind, content)) = open.take() else {
                    return Err(ParseError::UnmatchedEnd { line: line_no });
                };
                cells.push(ParsedCell {
                    kind,
                    source: content.join("\n"),
                });
                continue;
            }

            match &mut open {
                Some((_, _, content)) => content.push(line),
                None if line.trim().is_empty() => {}
                None => return Err(ParseError::StrayText { line: line_no }),
            }
        }

        if let Some((line, _, _)) = open {
            return Err(ParseError::Unterminated { line });
        }
        Ok(cells)
    }
}

/// Facade start line of every cell, given the cells' rendered line counts.
pub fn layout_start_lines<'a, I>(cells: I) -> Vec<usize>
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut line = 0;
    cells
        .into_iter()
        .map(|cell| {
            let start = line;
            line += cell.rendered_line_count() + 1;
            start
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellId;
    use pretty_assertions::assert_eq;

    fn cells() -> Vec<Cell> {
        vec![
            Cell::new(CellId::new("a"), CellKind::Markdown, "# heading"),
            Cell::new(CellId::new("b"), CellKind::Code, ""),
            Cell::new(CellId::new("c"), CellKind::Raw, "one\ntwo\n"),
        ]
    }

    #[test]
    fn test_render_layout() {
        let markers = Markers::new(&NotebookConfig::default());
        let text = markers.render(&cells());
        assert_eq!(
            text,
            "# <<ipynb:markdown>>\n# heading\n# <</ipynb>>\n\n\
             # <<ipynb:code>>\n\n# <</ipynb>>\n\n\
             # <<ipynb:raw>>\none\ntwo\n\n# <</ipynb>>\n"
        );
        assert_eq!(layout_start_lines(&cells()), vec![0, 4, 8]);
    }

    #[test]
    fn test_roundtrip_preserves_kind_and_source() {
        let markers = Markers::new(&NotebookConfig::default());
        let cells = cells();
        let parsed = markers.parse(&markers.render(&cells)).unwrap();
        let expected: Vec<ParsedCell> = cells.iter().map(ParsedCell::from).collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_roundtrip_empty_notebook() {
        let markers = Markers::new(&NotebookConfig::default());
        let text = markers.render(&Vec::<Cell>::new());
        assert_eq!(text, "");
        assert!(markers.parse(&text).unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        let markers = Markers::new(&NotebookConfig::default());
        assert_eq!(
            markers.parse("# <<ipynb:code>>\nx\n"),
            Err(ParseError::Unterminated { line: 0 })
        );
        assert_eq!(
            markers.parse("x = 1\n"),
            Err(ParseError::StrayText { line: 0 })
        );
        assert_eq!(
            markers.parse("# <</ipynb>>"),
            Err(ParseError::UnmatchedEnd { line: 0 })
        );
        assert_eq!(
            markers.parse("# <<ipynb:sql>>\n# <</ipynb>>"),
            Err(ParseError::UnknownKind {
                line: 0,
                kind: "sql".to_string()
            })
        );
    }

    #[test]
    fn test_start_marker_line_is_content_inside_cell() {
        let markers = Markers::new(&NotebookConfig::default());
        let cells = vec![
            Cell::new(CellId::new("a"), CellKind::Code, "# <<ipynb:code>>"),
            Cell::new(CellId::new("b"), CellKind::Markdown, "text\n# <<ipynb:raw>>\nmore"),
        ];
        let parsed = markers.parse(&markers.render(&cells)).unwrap();
        let expected: Vec<ParsedCell> = cells.iter().map(ParsedCell::from).collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_end_marker_source_is_refused() {
        let markers = Markers::new(&NotebookConfig::default());
        assert!(markers.check_source("x = 1\n# <<ipynb:code>>").is_ok());
        assert_eq!(
            markers.check_source("x = 1\n# <</ipynb>>"),
            Err(ParseError::EndMarkerInSource {
                line: 1,
                marker: "# <</ipynb>>".to_string()
            })
        );
    }
}
