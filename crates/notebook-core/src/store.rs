//! Cell Store: the authoritative ordered cell list.
//!
//! All structural changes (insert/delete/move/retype) go through [`CellStore`] first; the
//! surfaces are re-rendered from it afterwards. When the Facade is re-parsed wholesale (undo,
//! redo, rename), [`CellStore::reconcile`] maps the parsed cells back onto existing identities
//! so outputs and execution history survive.

use crate::cell::{Cell, CellId, CellKind};
use crate::error::NotebookError;
use crate::format::ParsedCell;
use std::collections::{HashSet, VecDeque};

/// How many removed cells are remembered for identity recovery.
const GRAVEYARD_LIMIT: usize = 256;

/// Ordered, identity-stable cell storage.
#[derive(Debug, Clone, Default)]
pub struct CellStore {
    cells: Vec<Cell>,
    /// Every id ever handed out or loaded; ids are never reissued.
    issued: HashSet<CellId>,
    next_id: u64,
    /// Recently removed cells, newest last. Undoing a deletion re-parses the cell back into
    /// existence, and matching against these restores its id and outputs.
    graveyard: VecDeque<Cell>,
}

impl CellStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from loaded cells.
    ///
    /// Duplicate or empty ids are replaced with fresh ones.
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        let mut store = Self::new();
        for mut cell in cells {
            if cell.id.as_str().is_empty() || store.issued.contains(&cell.id) {
                cell.id = store.generate_id();
            } else {
                store.issued.insert(cell.id.clone());
            }
            store.cells.push(cell);
        }
        store
    }

    /// Allocate an id that has never been used in this store.
    pub fn generate_id(&mut self) -> CellId {
        loop {
            let candidate = CellId::new(format!("{:08x}", self.next_id));
            self.next_id = self.next_id.wrapping_add(1);
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the notebook has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells in order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Iterate cells in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.cells.iter()
    }

    /// Cell at `index`.
    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Cell> {
        self.cells.get_mut(index)
    }

    /// Current index of the cell with `id`.
    pub fn index_of(&self, id: &CellId) -> Option<usize> {
        self.cells.iter().position(|cell| &cell.id == id)
    }

    /// Cell with `id`.
    pub fn by_id(&self, id: &CellId) -> Option<&Cell> {
        self.cells.iter().find(|cell| &cell.id == id)
    }

    fn check_index(&self, index: usize) -> Result<(), NotebookError> {
        if index < self.cells.len() {
            Ok(())
        } else {
            Err(NotebookError::IndexOutOfRange {
                index,
                len: self.cells.len(),
            })
        }
    }

    /// Insert a new cell so that it ends up at `index` (`index == len` appends).
    pub fn insert(
        &mut self,
        index: usize,
        kind: CellKind,
        source: impl Into<String>,
    ) -> Result<CellId, NotebookError> {
        if index > self.cells.len() {
            return Err(NotebookError::IndexOutOfRange {
                index,
                len: self.cells.len(),
            });
        }
        let id = self.generate_id();
        self.cells.insert(index, Cell::new(id.clone(), kind, source));
        Ok(id)
    }

    /// Remove the cell at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Cell, NotebookError> {
        self.check_index(index)?;
        let cell = self.cells.remove(index);
        self.bury(cell.clone());
        Ok(cell)
    }

    /// Move the cell at `from` so that it ends up at `to`.
    pub fn move_cell(&mut self, from: usize, to: usize) -> Result<(), NotebookError> {
        self.check_index(from)?;
        self.check_index(to)?;
        let cell = self.cells.remove(from);
        self.cells.insert(to, cell);
        Ok(())
    }

    /// Change a cell's type. Non-code cells lose their outputs and execution count.
    pub fn set_kind(&mut self, index: usize, kind: CellKind) -> Result<(), NotebookError> {
        self.check_index(index)?;
        let cell = &mut self.cells[index];
        cell.kind = kind;
        if !kind.is_code() {
            cell.outputs.clear();
            cell.execution_count = None;
        }
        Ok(())
    }

    /// Replace a cell's source. Returns the previous source.
    pub fn set_source(
        &mut self,
        index: usize,
        source: impl Into<String>,
    ) -> Result<String, NotebookError> {
        self.check_index(index)?;
        Ok(std::mem::replace(
            &mut self.cells[index].source,
            source.into(),
        ))
    }

    fn bury(&mut self, cell: Cell) {
        if self.graveyard.len() >= GRAVEYARD_LIMIT {
            self.graveyard.pop_front();
        }
        self.graveyard.push_back(cell);
    }

    /// Replace the cell list with a freshly parsed one, recovering identities.
    ///
    /// Matching order:
    /// 1. exact `(kind, source)` equality against live cells, first unused match wins, then
    ///    against recently removed cells (newest first);
    /// 2. same position with the same kind;
    /// 3. a fresh id.
    ///
    /// Matched cells keep their id, outputs, execution data and metadata; only the source is
    /// taken from the parse. Live cells left unmatched are remembered as removed.
    pub fn reconcile(&mut self, parsed: Vec<ParsedCell>) {
        let old = std::mem::take(&mut self.cells);
        let mut used = vec![false; old.len()];
        let mut assigned: Vec<Option<Cell>> = vec![None; parsed.len()];

        for (slot, new) in assigned.iter_mut().zip(&parsed) {
            if let Some(i) = old.iter().enumerate().position(|(i, cell)| {
                !used[i] && cell.kind == new.kind && cell.source == new.source
            }) {
                used[i] = true;
                *slot = Some(old[i].clone());
                continue;
            }
            if let Some(i) = self
                .graveyard
                .iter()
                .rposition(|cell| cell.kind == new.kind && cell.source == new.source)
            {
                *slot = self.graveyard.remove(i);
            }
        }

        for (index, (slot, new)) in assigned.iter_mut().zip(&parsed).enumerate() {
            if slot.is_some() {
                continue;
            }
            if let Some(cell) = old.get(index)
                && !used[index]
                && cell.kind == new.kind
            {
                used[index] = true;
                let mut cell = cell.clone();
                cell.source = new.source.clone();
                *slot = Some(cell);
            }
        }

        let mut cells = Vec::with_capacity(parsed.len());
        for (slot, new) in assigned.into_iter().zip(parsed) {
            let cell = match slot {
                Some(cell) => cell,
                None => Cell::new(self.generate_id(), new.kind, new.source),
            };
            cells.push(cell);
        }

        for (cell, was_used) in old.into_iter().zip(used) {
            if !was_used {
                self.bury(cell);
            }
        }
        self.cells = cells;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Output;
    use serde_json::Map;

    fn parsed(kind: CellKind, source: &str) -> ParsedCell {
        ParsedCell {
            kind,
            source: source.to_string(),
        }
    }

    fn sample() -> CellStore {
        let mut store = CellStore::new();
        store.insert(0, CellKind::Markdown, "# heading").unwrap();
        store.insert(1, CellKind::Code, "x = 1").unwrap();
        store.insert(2, CellKind::Code, "y = 2").unwrap();
        store
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut store = sample();
        let removed = store.remove(1).unwrap();
        let fresh = store.insert(1, CellKind::Code, "x = 1").unwrap();
        assert_ne!(removed.id, fresh);
    }

    #[test]
    fn test_from_cells_replaces_duplicate_ids() {
        let a = Cell::new(CellId::new("same"), CellKind::Code, "a");
        let b = Cell::new(CellId::new("same"), CellKind::Code, "b");
        let store = CellStore::from_cells(vec![a, b]);
        assert_eq!(store.get(0).unwrap().id.as_str(), "same");
        assert_ne!(store.get(1).unwrap().id.as_str(), "same");
    }

    #[test]
    fn test_reconcile_exact_match_preserves_outputs() {
        let mut store = sample();
        store.get_mut(1).unwrap().outputs.push(Output {
            output_type: "stream".to_string(),
            fields: Map::new(),
        });
        let ids: Vec<CellId> = store.iter().map(|c| c.id.clone()).collect();

        // Order swapped: exact matching follows content, not position.
        store.reconcile(vec![
            parsed(CellKind::Markdown, "# heading"),
            parsed(CellKind::Code, "y = 2"),
            parsed(CellKind::Code, "x = 1"),
        ]);

        assert_eq!(store.get(1).unwrap().id, ids[2]);
        assert_eq!(store.get(2).unwrap().id, ids[1]);
        assert_eq!(store.get(2).unwrap().outputs.len(), 1);
    }

    #[test]
    fn test_reconcile_positional_fallback_keeps_id_for_edited_cell() {
        let mut store = sample();
        let id = store.get(1).unwrap().id.clone();

        store.reconcile(vec![
            parsed(CellKind::Markdown, "# heading"),
            parsed(CellKind::Code, "x = 10"),
            parsed(CellKind::Code, "y = 2"),
        ]);

        assert_eq!(store.get(1).unwrap().id, id);
        assert_eq!(store.get(1).unwrap().source, "x = 10");
    }

    #[test]
    fn test_reconcile_positional_fallback_requires_same_kind() {
        let mut store = sample();
        let id = store.get(1).unwrap().id.clone();

        store.reconcile(vec![
            parsed(CellKind::Markdown, "# heading"),
            parsed(CellKind::Raw, "changed"),
            parsed(CellKind::Code, "y = 2"),
        ]);

        assert_ne!(store.get(1).unwrap().id, id);
    }

    #[test]
    fn test_reconcile_recovers_removed_cell() {
        let mut store = sample();
        let removed = store.remove(1).unwrap();

        store.reconcile(vec![
            parsed(CellKind::Markdown, "# heading"),
            parsed(CellKind::Code, "x = 1"),
            parsed(CellKind::Code, "y = 2"),
        ]);

        assert_eq!(store.get(1).unwrap().id, removed.id);
    }

    #[test]
    fn test_reconcile_duplicates_first_match_wins() {
        let mut store = CellStore::new();
        let first = store.insert(0, CellKind::Code, "pass").unwrap();
        let second = store.insert(1, CellKind::Code, "pass").unwrap();

        store.reconcile(vec![parsed(CellKind::Code, "pass")]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().id, first);
        assert_ne!(store.get(0).unwrap().id, second);
    }

    #[test]
    fn test_set_kind_drops_outputs_for_non_code() {
        let mut store = sample();
        store.get_mut(1).unwrap().execution_count = Some(3);
        store.set_kind(1, CellKind::Markdown).unwrap();
        assert_eq!(store.get(1).unwrap().execution_count, None);
        assert!(store.set_kind(9, CellKind::Code).is_err());
    }
}
