//! Rope-backed line buffer with anchors, grouped undo and pending-edit tracking.
//!
//! Every surface (Facade, Shadow, Edit) is a [`TextBuffer`]. Lines are separated by `\n` only,
//! so a buffer holding `"a\n"` has two lines (`"a"` and `""`), matching how the rendered format
//! ends with a trailing blank line.
//!
//! Anchors are stored as character offsets of a line start. Each mutation shifts anchors that
//! sit after the edited span and drops anchors whose line start was deleted; the Boundary
//! Tracker treats a dropped anchor as "cell removed".

use crate::cell::CellId;
use crate::undo::UndoHistory;
use ropey::Rope;
use std::collections::HashMap;

/// A single text replacement expressed in character offsets.
///
/// `start` is relative to the document at the time the edit is applied; edits in a sequence must
/// be replayed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEdit {
    /// Start character offset.
    pub start: usize,
    /// Exact deleted text (may be empty).
    pub deleted_text: String,
    /// Exact inserted text (may be empty).
    pub inserted_text: String,
}

impl BufferEdit {
    /// Length of `deleted_text` in characters.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Length of `inserted_text` in characters.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// Exclusive end of the deleted span in the pre-edit document.
    pub fn end(&self) -> usize {
        self.start + self.deleted_len()
    }
}

/// How a mutation participates in undo grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoJoin {
    /// Soft join: extend the currently open group, opening one if needed.
    Join,
    /// A standalone undo step; closes any open group.
    Break,
    /// Extend the newest undo group, open or closed, keeping its open state.
    Amend,
}

/// A line-oriented text document.
#[derive(Debug)]
pub struct TextBuffer {
    rope: Rope,
    revision: u64,
    history: Option<UndoHistory>,
    anchors: HashMap<CellId, usize>,
    pending: Option<Vec<BufferEdit>>,
}

impl TextBuffer {
    /// Create a buffer without undo history or edit tracking.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            revision: 0,
            history: None,
            anchors: HashMap::new(),
            pending: None,
        }
    }

    /// Enable undo history holding at most `max_undo` steps.
    pub fn with_history(mut self, max_undo: usize) -> Self {
        self.history = Some(UndoHistory::new(max_undo));
        self
    }

    /// Record every mutation so it can be drained with [`TextBuffer::take_pending_edits`].
    pub fn with_edit_tracking(mut self) -> Self {
        self.pending = Some(Vec::new());
        self
    }

    /// Start or stop recording mutations. Either way the recorded edits are dropped.
    pub fn set_edit_tracking(&mut self, enabled: bool) {
        self.pending = enabled.then(Vec::new);
    }

    /// Whether mutations are being recorded.
    pub fn is_tracking_edits(&self) -> bool {
        self.pending.is_some()
    }

    /// Monotonic revision; bumps on every mutation, including undo and redo.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of lines (always at least one).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Total characters.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Text of `line` without its newline.
    pub fn line(&self, line: usize) -> Option<String> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let mut text = self.rope.line(line).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        Some(text)
    }

    /// Character length of `line` without its newline.
    pub fn line_len_chars(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return 0;
        }
        let slice = self.rope.line(line);
        let len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    /// Lines in `range` (clamped), without newlines.
    pub fn lines_in(&self, start: usize, end: usize) -> Vec<String> {
        let end = end.min(self.line_count());
        (start.min(end)..end)
            .filter_map(|line| self.line(line))
            .collect()
    }

    /// All lines.
    pub fn lines(&self) -> Vec<String> {
        self.lines_in(0, self.line_count())
    }

    /// Whole text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Character offset of `(line, column)`, clamping the column to the line length.
    pub fn position_to_char(&self, line: usize, column: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.rope.line_to_char(line) + column.min(self.line_len_chars(line))
    }

    /// Replace the character span `start..end` with `text`.
    pub fn replace(&mut self, start: usize, end: usize, text: &str, join: UndoJoin) {
        let edit = self.apply(start, end, text);
        if let Some(history) = &mut self.history {
            history.push(vec![edit], join);
        }
    }

    /// Replace the span between two `(line, column)` positions.
    pub fn replace_range(
        &mut self,
        start: (usize, usize),
        end: (usize, usize),
        text: &str,
        join: UndoJoin,
    ) {
        let a = self.position_to_char(start.0, start.1);
        let b = self.position_to_char(end.0, end.1);
        self.replace(a.min(b), a.max(b), text, join);
    }

    /// Replace lines `start..end` (exclusive, clamped) with `lines`.
    pub fn replace_lines<S: AsRef<str>>(
        &mut self,
        start: usize,
        end: usize,
        lines: &[S],
        join: UndoJoin,
    ) {
        let count = self.line_count();
        let end = end.min(count);
        let start = start.min(end);
        if start == end && lines.is_empty() {
            return;
        }

        if end < count {
            // Whole lines followed by more text: each new line carries its own newline.
            let a = self.rope.line_to_char(start);
            let b = self.rope.line_to_char(end);
            let text: String = lines
                .iter()
                .map(|l| format!("{}\n", AsRef::<str>::as_ref(l)))
                .collect();
            self.replace(a, b, &text, join);
        } else if start > 0 {
            // Tail of the document: the preceding newline is part of the replaced span.
            let a = if start == count {
                self.rope.len_chars()
            } else {
                self.rope.line_to_char(start) - 1
            };
            let b = self.rope.len_chars();
            let text: String = lines
                .iter()
                .map(|l| format!("\n{}", AsRef::<str>::as_ref(l)))
                .collect();
            self.replace(a, b, &text, join);
        } else {
            let text = lines
                .iter()
                .map(AsRef::<str>::as_ref)
                .collect::<Vec<_>>()
                .join("\n");
            let b = self.rope.len_chars();
            self.replace(0, b, &text, join);
        }
    }

    /// Replace the whole content with `lines`, touching only the span that differs.
    ///
    /// Returns `false` (and records nothing) when the content is already equal.
    pub fn set_lines<S: AsRef<str>>(&mut self, lines: &[S], join: UndoJoin) -> bool {
        let old = self.lines();
        let prefix = old
            .iter()
            .zip(lines)
            .take_while(|(a, b)| a.as_str() == AsRef::<str>::as_ref(*b))
            .count();
        if prefix == old.len() && prefix == lines.len() {
            return false;
        }
        let max_suffix = old.len().min(lines.len()) - prefix;
        let suffix = old
            .iter()
            .rev()
            .zip(lines.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a.as_str() == AsRef::<str>::as_ref(*b))
            .count();

        let old_end = old.len() - suffix;
        let new_end = lines.len() - suffix;
        if old_end == prefix && new_end == prefix {
            return false;
        }
        self.replace_lines(prefix, old_end, &lines[prefix..new_end], join);
        true
    }

    /// Replace the whole content with `text`.
    pub fn set_text(&mut self, text: &str, join: UndoJoin) -> bool {
        let lines: Vec<&str> = text.split('\n').collect();
        self.set_lines(&lines, join)
    }

    /// Close the open soft-join group, if any.
    pub fn end_undo_group(&mut self) {
        if let Some(history) = &mut self.history {
            history.end_group();
        }
    }

    /// Whether a soft-join group is currently open.
    pub fn has_open_undo_group(&self) -> bool {
        self.history
            .as_ref()
            .is_some_and(|h| h.open_group().is_some())
    }

    /// Whether there is anything to undo.
    pub fn can_undo(&self) -> bool {
        self.history.as_ref().is_some_and(UndoHistory::can_undo)
    }

    /// Whether there is anything to redo.
    pub fn can_redo(&self) -> bool {
        self.history.as_ref().is_some_and(UndoHistory::can_redo)
    }

    /// Number of recorded undo steps (a group may span several).
    pub fn undo_depth(&self) -> usize {
        self.history.as_ref().map_or(0, UndoHistory::undo_depth)
    }

    /// Revert the newest undo group. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(steps) = self.history.as_mut().and_then(UndoHistory::pop_undo_group) else {
            return false;
        };
        for step in &steps {
            for edit in step.edits.iter().rev() {
                let end = edit.start + edit.inserted_len();
                self.apply(edit.start, end, &edit.deleted_text);
            }
        }
        if let Some(history) = &mut self.history {
            history.push_redo(steps);
        }
        true
    }

    /// Re-apply the most recently undone group. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(steps) = self.history.as_mut().and_then(UndoHistory::pop_redo_group) else {
            return false;
        };
        for step in &steps {
            for edit in &step.edits {
                self.apply(edit.start, edit.end(), &edit.inserted_text);
            }
        }
        if let Some(history) = &mut self.history {
            history.push_undo(steps);
        }
        true
    }

    /// Drain the edits recorded since the last call (empty unless edit tracking is enabled).
    pub fn take_pending_edits(&mut self) -> Vec<BufferEdit> {
        self.pending.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Bind the anchor `id` to the start of `line` (clamped to the last line).
    pub fn bind_anchor(&mut self, id: CellId, line: usize) {
        let line = line.min(self.line_count().saturating_sub(1));
        let offset = self.rope.line_to_char(line);
        self.anchors.insert(id, offset);
    }

    /// Line the anchor `id` currently sits on, or `None` if it was never bound or its line was
    /// deleted.
    pub fn anchor_line(&self, id: &CellId) -> Option<usize> {
        let offset = *self.anchors.get(id)?;
        (offset <= self.rope.len_chars()).then(|| self.rope.char_to_line(offset))
    }

    /// Drop every anchor.
    pub fn clear_anchors(&mut self) {
        self.anchors.clear();
    }

    /// Number of live anchors.
    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    fn apply(&mut self, start: usize, end: usize, text: &str) -> BufferEdit {
        let len = self.rope.len_chars();
        let end = end.min(len);
        let start = start.min(end);

        let deleted_text = self.rope.slice(start..end).to_string();
        if start < end {
            self.rope.remove(start..end);
        }
        if !text.is_empty() {
            self.rope.insert(start, text);
        }

        let inserted_len = text.chars().count();
        self.anchors.retain(|_, offset| {
            if *offset >= end {
                *offset = *offset - (end - start) + inserted_len;
                true
            } else {
                *offset < start
            }
        });

        self.revision += 1;
        let edit = BufferEdit {
            start,
            deleted_text,
            inserted_text: text.to_string(),
        };
        if let Some(pending) = &mut self.pending {
            pending.push(edit.clone());
        }
        edit
    }
}
