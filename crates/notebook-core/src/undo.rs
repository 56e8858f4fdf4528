//! Grouped undo/redo history for a [`TextBuffer`](crate::TextBuffer).
//!
//! Every buffer mutation becomes one [`UndoStep`]. Steps pushed with soft join share the open
//! group id, so a typing burst undoes as a single unit. Amended steps join the newest group
//! even after it was closed, which lets a follow-up normalization undo together with the edit
//! that caused it. Anything else starts (and closes) its own group. Undo/redo always move
//! whole groups.

use crate::buffer::{BufferEdit, UndoJoin};

#[derive(Debug, Clone)]
pub(crate) struct UndoStep {
    pub(crate) group_id: usize,
    pub(crate) edits: Vec<BufferEdit>,
}

#[derive(Debug)]
pub(crate) struct UndoHistory {
    undo_stack: Vec<UndoStep>,
    redo_stack: Vec<UndoStep>,
    max_undo: usize,
    next_group_id: usize,
    open_group_id: Option<usize>,
}

impl UndoHistory {
    pub(crate) fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo: max_undo.max(1),
            next_group_id: 0,
            open_group_id: None,
        }
    }

    pub(crate) fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub(crate) fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub(crate) fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub(crate) fn open_group(&self) -> Option<usize> {
        self.open_group_id
    }

    pub(crate) fn end_group(&mut self) {
        self.open_group_id = None;
    }

    /// Record a new step in the group selected by `join`.
    pub(crate) fn push(&mut self, edits: Vec<BufferEdit>, join: UndoJoin) {
        self.redo_stack.clear();

        if self.undo_stack.len() >= self.max_undo {
            self.undo_stack.remove(0);
        }

        let group_id = match (join, self.open_group_id, self.undo_stack.last()) {
            (UndoJoin::Join, Some(open), _) => open,
            (UndoJoin::Amend, _, Some(last)) => last.group_id,
            _ => {
                let id = self.next_group_id;
                self.next_group_id = self.next_group_id.wrapping_add(1);
                id
            }
        };
        self.open_group_id = match join {
            UndoJoin::Join => Some(group_id),
            UndoJoin::Amend => self.open_group_id.filter(|open| *open == group_id),
            UndoJoin::Break => None,
        };

        self.undo_stack.push(UndoStep { group_id, edits });
    }

    /// Pop the newest group, newest step first.
    pub(crate) fn pop_undo_group(&mut self) -> Option<Vec<UndoStep>> {
        self.open_group_id = None;
        pop_group(&mut self.undo_stack)
    }

    /// Pop the most recently undone group, oldest step first.
    pub(crate) fn pop_redo_group(&mut self) -> Option<Vec<UndoStep>> {
        self.open_group_id = None;
        pop_group(&mut self.redo_stack)
    }

    /// Park undone steps (given newest first) so they can be redone oldest first.
    pub(crate) fn push_redo(&mut self, steps: Vec<UndoStep>) {
        self.redo_stack.extend(steps);
    }

    /// Return redone steps (given oldest first) to the undo stack.
    pub(crate) fn push_undo(&mut self, steps: Vec<UndoStep>) {
        self.undo_stack.extend(steps);
    }
}

fn pop_group(stack: &mut Vec<UndoStep>) -> Option<Vec<UndoStep>> {
    let group_id = stack.last().map(|s| s.group_id)?;
    let mut steps = Vec::new();
    while stack.last().is_some_and(|s| s.group_id == group_id) {
        if let Some(step) = stack.pop() {
            steps.push(step);
        }
    }
    Some(steps)
}
