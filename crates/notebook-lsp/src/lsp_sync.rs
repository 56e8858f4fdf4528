//! LSP Sync Layer
//!
//! UTF-16 coordinate conversion and the Shadow mirror that turns Shadow buffer deltas into
//! incremental `textDocument/didChange` content changes.

use notebook_core::BufferEdit;
use serde_json::{Value, json};

fn split_lines_preserve_trailing(text: &str) -> Vec<String> {
    // N newlines => N+1 lines; a trailing '\r' is stripped.
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// LSP Position (based on UTF-16 code units)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LspPosition {
    /// Line number (0-based)
    pub line: u32,
    /// Character offset (UTF-16 code units, 0-based)
    pub character: u32,
}

impl LspPosition {
    /// Create a new LSP position (UTF-16 based).
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// Parse a `Position`-shaped JSON value.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            line: value.get("line")?.as_u64()? as u32,
            character: value.get("character")?.as_u64()? as u32,
        })
    }

    /// Serialize as a `Position` JSON value.
    pub fn to_value(self) -> Value {
        json!({ "line": self.line, "character": self.character })
    }
}

/// LSP Range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LspRange {
    /// Range start position (inclusive).
    pub start: LspPosition,
    /// Range end position (exclusive).
    pub end: LspPosition,
}

impl LspRange {
    /// Create a new LSP range.
    pub fn new(start: LspPosition, end: LspPosition) -> Self {
        Self { start, end }
    }

    /// Parse a `Range`-shaped JSON value.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            start: LspPosition::from_value(value.get("start")?)?,
            end: LspPosition::from_value(value.get("end")?)?,
        })
    }

    /// Serialize as a `Range` JSON value.
    pub fn to_value(self) -> Value {
        json!({ "start": self.start.to_value(), "end": self.end.to_value() })
    }
}

/// Text change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    /// Range of the change
    pub range: LspRange,
    /// New text content
    pub text: String,
}

impl TextChange {
    /// Serialize as a `TextDocumentContentChangeEvent`.
    pub fn to_value(&self) -> Value {
        json!({ "range": self.range.to_value(), "text": self.text })
    }
}

/// LSP coordinate converter
///
/// Handles conversions between character offsets and LSP Position (UTF-16)
pub struct LspCoordinateConverter;

impl LspCoordinateConverter {
    /// Convert UTF-8 string to UTF-16 code unit count
    pub fn utf8_to_utf16_len(text: &str) -> usize {
        text.encode_utf16().count()
    }

    /// Convert character offset to UTF-16 code unit offset
    pub fn char_offset_to_utf16(text: &str, char_offset: usize) -> usize {
        text.chars().take(char_offset).map(|c| c.len_utf16()).sum()
    }

    /// Convert UTF-16 code unit offset to character offset
    pub fn utf16_to_char_offset(text: &str, utf16_offset: usize) -> usize {
        let mut current_utf16 = 0;
        let mut char_count = 0;

        for ch in text.chars() {
            if current_utf16 >= utf16_offset {
                break;
            }
            current_utf16 += ch.len_utf16();
            char_count += 1;
        }

        char_count
    }

    /// Convert line and column (character offset) to LSP Position
    pub fn position_to_lsp(line_text: &str, line: usize, char_in_line: usize) -> LspPosition {
        let utf16_offset = Self::char_offset_to_utf16(line_text, char_in_line);
        LspPosition::new(line as u32, utf16_offset as u32)
    }

    /// Convert LSP Position to character offset
    pub fn lsp_to_char_offset(line_text: &str, character: u32) -> usize {
        Self::utf16_to_char_offset(line_text, character as usize)
    }
}

/// Line mirror of a Shadow document as the language server last saw it.
///
/// Shadow buffer deltas are expressed in character offsets against the document at the time
/// each delta was applied. The mirror replays them in order, producing one UTF-16 based
/// [`TextChange`] per delta.
#[derive(Debug, Clone, Default)]
pub struct ShadowMirror {
    lines: Vec<String>,
}

impl ShadowMirror {
    /// Initialize from text
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: split_lines_preserve_trailing(text),
        }
    }

    /// Get text of specified line
    pub fn get_line(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(|s| s.as_str())
    }

    /// Number of mirrored lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Mirrored text.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Line and character of a character offset, clamped to the end of the document.
    pub fn position_for_char_offset(&self, offset: usize) -> (usize, usize) {
        let mut remaining = offset;
        for (index, line) in self.lines.iter().enumerate() {
            let len = line.chars().count();
            if remaining <= len {
                return (index, remaining);
            }
            remaining -= len + 1;
        }
        let last = self.lines.len().saturating_sub(1);
        (last, self.get_line(last).map_or(0, |l| l.chars().count()))
    }

    /// Calculate change for replace operation
    pub fn calculate_replace_change(
        &self,
        start: (usize, usize),
        end: (usize, usize),
        new_text: &str,
    ) -> TextChange {
        let start_line_text = self.get_line(start.0).unwrap_or("");
        let end_line_text = self.get_line(end.0).unwrap_or("");

        let start_pos = LspCoordinateConverter::position_to_lsp(start_line_text, start.0, start.1);
        let end_pos = LspCoordinateConverter::position_to_lsp(end_line_text, end.0, end.1);

        TextChange {
            range: LspRange::new(start_pos, end_pos),
            text: new_text.to_string(),
        }
    }

    /// Convert buffer deltas into content changes, updating the mirror as it goes.
    pub fn changes_for_edits(&mut self, edits: &[BufferEdit]) -> Vec<TextChange> {
        let mut changes = Vec::with_capacity(edits.len());
        for edit in edits {
            let start = self.position_for_char_offset(edit.start);
            let end = self.position_for_char_offset(edit.end());
            let change = self.calculate_replace_change(start, end, &edit.inserted_text);
            self.apply_change(&change);
            changes.push(change);
        }
        changes
    }

    /// Apply change and update internal state
    pub fn apply_change(&mut self, change: &TextChange) {
        fn char_index_to_byte_offset(text: &str, char_index: usize) -> usize {
            if char_index == 0 {
                return 0;
            }

            text.char_indices()
                .nth(char_index)
                .map(|(byte_idx, _)| byte_idx)
                .unwrap_or(text.len())
        }

        let start_line = change.range.start.line as usize;
        let end_line = change.range.end.line as usize;

        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        if end_line.max(start_line) >= self.lines.len() {
            self.lines.resize(end_line.max(start_line) + 1, String::new());
        }

        let start_line_text = self.lines[start_line].clone();
        let end_line_text = self.lines[end_line].clone();

        let start_char =
            LspCoordinateConverter::lsp_to_char_offset(&start_line_text, change.range.start.character);
        let end_char =
            LspCoordinateConverter::lsp_to_char_offset(&end_line_text, change.range.end.character);

        let start_byte = char_index_to_byte_offset(&start_line_text, start_char);
        let end_byte = char_index_to_byte_offset(&end_line_text, end_char);

        let mut replacement = String::with_capacity(
            start_byte + change.text.len() + end_line_text.len().saturating_sub(end_byte),
        );
        replacement.push_str(&start_line_text[..start_byte]);
        replacement.push_str(&change.text);
        replacement.push_str(&end_line_text[end_byte..]);

        self.lines
            .splice(start_line..=end_line, split_lines_preserve_trailing(&replacement));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_to_utf16_len() {
        assert_eq!(LspCoordinateConverter::utf8_to_utf16_len("hello"), 5);
        assert_eq!(LspCoordinateConverter::utf8_to_utf16_len("你好"), 2);
        assert_eq!(LspCoordinateConverter::utf8_to_utf16_len("👋"), 2);
    }

    #[test]
    fn test_utf16_round_trip_with_emoji() {
        let line_text = "a = '👋' + b";
        let pos = LspCoordinateConverter::position_to_lsp(line_text, 3, 7);
        assert_eq!(pos, LspPosition::new(3, 8));
        assert_eq!(
            LspCoordinateConverter::lsp_to_char_offset(line_text, pos.character),
            7
        );
    }

    #[test]
    fn test_range_value_shape() {
        let range = LspRange::new(LspPosition::new(1, 2), LspPosition::new(3, 4));
        let value = range.to_value();
        assert_eq!(value["start"]["line"], 1);
        assert_eq!(value["end"]["character"], 4);
        assert_eq!(LspRange::from_value(&value), Some(range));
    }

    #[test]
    fn test_mirror_converts_sequential_edits() {
        let mut mirror = ShadowMirror::from_text("\nx = 1\n\n");
        let edits = vec![
            // Replace "1" with "42" on line 1.
            BufferEdit {
                start: 5,
                deleted_text: "1".to_string(),
                inserted_text: "42".to_string(),
            },
            // Then insert a new line after it.
            BufferEdit {
                start: 7,
                deleted_text: String::new(),
                inserted_text: "\ny = 2".to_string(),
            },
        ];
        let changes = mirror.changes_for_edits(&edits);

        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[0].range,
            LspRange::new(LspPosition::new(1, 4), LspPosition::new(1, 5))
        );
        assert_eq!(changes[0].text, "42");
        assert_eq!(
            changes[1].range,
            LspRange::new(LspPosition::new(1, 6), LspPosition::new(1, 6))
        );
        assert_eq!(mirror.text(), "\nx = 42\ny = 2\n\n");
        assert_eq!(mirror.line_count(), 5);
    }

    #[test]
    fn test_position_for_offset_clamps_past_end() {
        let mirror = ShadowMirror::from_text("ab\ncd");
        assert_eq!(mirror.position_for_char_offset(3), (1, 0));
        assert_eq!(mirror.position_for_char_offset(99), (1, 2));
    }
}
