//! Per-notebook state: the Cell Store and the three surfaces kept in lock-step.
//!
//! Two synchronization paths keep the surfaces consistent:
//!
//! - **Structural** (insert/delete/move/retype, undo/redo, direct Facade edits): update or
//!   re-derive the Cell Store, re-render the Facade, re-place every anchor and refresh the
//!   Shadow.
//! - **Incremental** (typing in the Edit Surface, formatting one cell): replace only the cell's
//!   content lines in the Facade and the Shadow; anchors are re-placed only when the cell's
//!   line count changed.
//!
//! After every mutation the coordinate invariants are checked. A violation is logged and
//! answered with [`NotebookState::repair`], a full re-render from the Cell Store.

use crate::boundary::{BoundaryTracker, CellRange};
use crate::buffer::{TextBuffer, UndoJoin};
use crate::cell::{Cell, CellId, CellKind, ExecutionState};
use crate::config::NotebookConfig;
use crate::decorations::{Decoration, cell_decorations};
use crate::edit::EditSurface;
use crate::error::{InvariantViolation, NotebookError};
use crate::format::Markers;
use crate::kernel::{ExecuteCommand, ExecutionTicket, KernelEvent, KernelOutcome};
use crate::persist::Notebook;
use crate::shadow::{Shadow, shadow_lines};
use crate::store::CellStore;
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// A text replacement between two `(line, column)` positions, columns in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeEdit {
    /// Start position.
    pub start: (usize, usize),
    /// End position (exclusive).
    pub end: (usize, usize),
    /// Replacement text.
    pub text: String,
}

impl FacadeEdit {
    /// Create an edit.
    pub fn new(start: (usize, usize), end: (usize, usize), text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// One open notebook.
#[derive(Debug)]
pub struct NotebookState {
    config: NotebookConfig,
    markers: Markers,
    /// Document-level fields of the loaded file; its cell list is always empty.
    document: Notebook,
    cells: CellStore,
    facade: TextBuffer,
    shadow: Shadow,
    edit: Option<EditSurface>,
    edit_generation: u64,
    executions: HashMap<ExecutionTicket, CellId>,
    next_ticket: u64,
    namespaces: HashMap<CellId, String>,
}

impl NotebookState {
    /// Load a notebook from its persisted JSON.
    ///
    /// Fails if the JSON is malformed or a cell source cannot be rendered.
    pub fn open(json: &str, config: NotebookConfig) -> Result<Self, NotebookError> {
        let mut document = Notebook::from_json(json)?;
        let cells = document.take_cells()?;
        Self::build(document, cells, config)
    }

    /// Create a notebook from cells.
    pub fn from_cells(cells: Vec<Cell>, config: NotebookConfig) -> Result<Self, NotebookError> {
        Self::build(Notebook::empty(), cells, config)
    }

    fn build(
        document: Notebook,
        cells: Vec<Cell>,
        config: NotebookConfig,
    ) -> Result<Self, NotebookError> {
        let markers = Markers::new(&config);
        for cell in &cells {
            markers.check_source(&cell.source)?;
        }
        let cells = CellStore::from_cells(cells);
        let mut facade =
            TextBuffer::new(&markers.render(cells.iter())).with_history(config.max_undo);
        BoundaryTracker::place(&cells, &mut facade);
        let shadow = Shadow::new(&cells);
        debug!(cells = cells.len(), "notebook opened");
        Ok(Self {
            config,
            markers,
            document,
            cells,
            facade,
            shadow,
            edit: None,
            edit_generation: 0,
            executions: HashMap::new(),
            next_ticket: 0,
            namespaces: HashMap::new(),
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &NotebookConfig {
        &self.config
    }

    /// Delimiters in use.
    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Kernel language from the notebook metadata, or the configured default.
    pub fn language(&self) -> &str {
        self.document
            .language()
            .unwrap_or(self.config.default_language.as_str())
    }

    /// The Cell Store.
    pub fn cells(&self) -> &CellStore {
        &self.cells
    }

    /// The Facade buffer.
    pub fn facade(&self) -> &TextBuffer {
        &self.facade
    }

    /// The Shadow surface.
    pub fn shadow(&self) -> &Shadow {
        &self.shadow
    }

    /// Start or stop recording Shadow edits for [`NotebookState::take_shadow_edits`].
    ///
    /// Recording is off until a language server is told about the Shadow.
    pub fn track_shadow_edits(&mut self, enabled: bool) {
        self.shadow.set_tracking(enabled);
    }

    /// Drain Shadow edits recorded since the last call.
    pub fn take_shadow_edits(&mut self) -> Vec<crate::buffer::BufferEdit> {
        self.shadow.take_pending_edits()
    }

    /// The open Edit Surface, if any.
    pub fn edit(&self) -> Option<&EditSurface> {
        self.edit.as_ref()
    }

    /// Mutable Edit Surface; follow changes with [`NotebookState::sync_edit`].
    pub fn edit_mut(&mut self) -> Option<&mut EditSurface> {
        self.edit.as_mut()
    }

    /// Namespace summary reported after the cell's last execution.
    pub fn namespace(&self, id: &CellId) -> Option<&str> {
        self.namespaces.get(id).map(String::as_str)
    }

    /// Current Facade range of the cell at `index`.
    pub fn range_of(&self, index: usize) -> Option<CellRange> {
        BoundaryTracker::range_of(&self.cells, &self.facade, index)
    }

    /// Index of the cell whose block contains (or last precedes) Facade `line`.
    pub fn cell_at(&self, line: usize) -> Option<usize> {
        BoundaryTracker::cell_at(&self.cells, &self.facade, line)
    }

    /// Insert a cell at `index`.
    pub fn insert_cell(
        &mut self,
        index: usize,
        kind: CellKind,
        source: impl Into<String>,
    ) -> Result<CellId, NotebookError> {
        self.sync_edit_if_dirty()?;
        let source = source.into();
        self.markers.check_source(&source)?;
        let id = self.cells.insert(index, kind, source)?;
        debug!(%id, index, "cell inserted");
        self.rerender(UndoJoin::Break);
        Ok(id)
    }

    /// Delete the cell at `index`.
    pub fn delete_cell(&mut self, index: usize) -> Result<Cell, NotebookError> {
        self.sync_edit_if_dirty()?;
        let cell = self.cells.remove(index)?;
        debug!(id = %cell.id, index, "cell deleted");
        self.rerender(UndoJoin::Break);
        Ok(cell)
    }

    /// Move the cell at `from` to `to`.
    pub fn move_cell(&mut self, from: usize, to: usize) -> Result<(), NotebookError> {
        self.sync_edit_if_dirty()?;
        self.cells.move_cell(from, to)?;
        debug!(from, to, "cell moved");
        self.rerender(UndoJoin::Break);
        Ok(())
    }

    /// Change the type of the cell at `index`.
    pub fn set_cell_kind(&mut self, index: usize, kind: CellKind) -> Result<(), NotebookError> {
        self.sync_edit_if_dirty()?;
        self.cells.set_kind(index, kind)?;
        self.rerender(UndoJoin::Break);
        Ok(())
    }

    /// Replace the source of the cell at `index` as one undo step.
    pub fn set_cell_source(
        &mut self,
        index: usize,
        source: impl Into<String>,
    ) -> Result<(), NotebookError> {
        self.sync_edit_if_dirty()?;
        let source = source.into();
        let lines: Vec<&str> = source.split('\n').collect();
        self.write_cell_lines(index, &lines, UndoJoin::Break)?;
        self.reload_edit();
        self.ensure_invariants();
        Ok(())
    }

    /// Apply edits to one cell's content, provided the cell still occupies `expected`.
    ///
    /// Edits are in Facade coordinates, must stay within the cell's content lines, and are
    /// applied bottom to top. The whole batch is one undo step.
    pub fn apply_cell_edits(
        &mut self,
        id: &CellId,
        expected: CellRange,
        edits: &[FacadeEdit],
    ) -> Result<(), NotebookError> {
        self.sync_edit_if_dirty()?;
        let index = self
            .cells
            .index_of(id)
            .ok_or_else(|| NotebookError::CellNotFound(id.clone()))?;
        let range = self
            .range_of(index)
            .ok_or_else(|| InvariantViolation::MissingAnchor(id.clone()))?;
        if range != expected {
            debug!(%id, ?range, ?expected, "cell moved since edits were computed");
            return Err(NotebookError::StaleCellRange(id.clone()));
        }
        for edit in edits {
            for line in [edit.start.0, edit.end.0] {
                if !range.contains_content(line) {
                    return Err(NotebookError::EditOutsideCell {
                        id: id.clone(),
                        line,
                    });
                }
            }
        }
        let Some(cell) = self.cells.get(index) else {
            return Err(NotebookError::CellNotFound(id.clone()));
        };

        let mut scratch = TextBuffer::new(&cell.source);
        let base = range.content_start();
        for edit in sorted_bottom_up(edits) {
            scratch.replace_range(
                (edit.start.0 - base, edit.start.1),
                (edit.end.0 - base, edit.end.1),
                &edit.text,
                UndoJoin::Break,
            );
        }
        if scratch.text() == cell.source {
            return Ok(());
        }
        self.write_cell_lines(index, &scratch.lines(), UndoJoin::Break)?;
        self.reload_edit();
        self.ensure_invariants();
        Ok(())
    }

    /// Apply edits directly to the Facade and re-derive the cells from it.
    ///
    /// Edits are applied bottom to top. With [`UndoJoin::Break`] the batch forms its own undo
    /// group; with [`UndoJoin::Join`] it extends the open typing burst. Re-rendering the parsed
    /// cells (dropping an extra blank line between cells, say) lands in that same group.
    ///
    /// If the edited text no longer parses, nothing is applied and the parse error is
    /// returned. A batch that only changes layout is a no-op.
    pub fn edit_facade(
        &mut self,
        edits: &[FacadeEdit],
        join: UndoJoin,
    ) -> Result<(), NotebookError> {
        self.sync_edit_if_dirty()?;
        if edits.is_empty() {
            return Ok(());
        }
        let mut scratch = TextBuffer::new(&self.facade.text());
        for edit in sorted_bottom_up(edits) {
            scratch.replace_range(edit.start, edit.end, &edit.text, UndoJoin::Break);
        }
        let lines = scratch.lines();
        let parsed = self
            .markers
            .parse_lines(lines.iter().map(String::as_str))
            .inspect_err(|err| warn!(%err, "facade edit rejected; it would not parse"))?;
        let unchanged = parsed.len() == self.cells.len()
            && parsed
                .iter()
                .zip(self.cells.iter())
                .all(|(new, old)| new.kind == old.kind && new.source == old.source);
        if unchanged {
            debug!("facade edit only changes layout");
            return Ok(());
        }

        if join == UndoJoin::Break {
            self.facade.end_undo_group();
        }
        for edit in sorted_bottom_up(edits) {
            self.facade
                .replace_range(edit.start, edit.end, &edit.text, UndoJoin::Join);
        }
        if join == UndoJoin::Break {
            self.facade.end_undo_group();
        }
        self.cells.reconcile(parsed);
        self.rerender(UndoJoin::Amend);
        Ok(())
    }

    /// Open the Edit Surface on the cell at `index`, closing any previous one.
    ///
    /// Returns the session generation.
    pub fn open_edit(&mut self, index: usize) -> Result<u64, NotebookError> {
        self.close_edit();
        let range = self.range_or_repair(index)?;
        let Some(cell) = self.cells.get(index) else {
            return Err(NotebookError::IndexOutOfRange {
                index,
                len: self.cells.len(),
            });
        };
        self.edit_generation += 1;
        self.edit = Some(EditSurface::new(
            cell.id.clone(),
            self.edit_generation,
            range,
            &cell.source,
        ));
        debug!(id = %cell.id, generation = self.edit_generation, "edit surface opened");
        Ok(self.edit_generation)
    }

    /// Commit and close the Edit Surface.
    pub fn close_edit(&mut self) {
        if self.edit.is_none() {
            return;
        }
        if let Err(err) = self.commit_edit() {
            warn!(%err, "edit surface closed with unsynced changes");
        }
        self.edit = None;
    }

    /// Flush pending Edit Surface changes and end the typing burst.
    pub fn commit_edit(&mut self) -> Result<(), NotebookError> {
        self.sync_edit_if_dirty()?;
        self.facade.end_undo_group();
        Ok(())
    }

    /// Push Edit Surface changes into the Facade, Cell Store and Shadow.
    ///
    /// Returns `false` when there was nothing new to sync.
    pub fn sync_edit(&mut self) -> Result<bool, NotebookError> {
        let edit = self.edit.as_ref().ok_or(NotebookError::NoEditSession)?;
        if !edit.is_dirty() {
            debug!("edit surface unchanged since last sync");
            return Ok(false);
        }
        let id = edit.cell().clone();
        let lines = edit.buffer().lines();
        let Some(index) = self.cells.index_of(&id) else {
            warn!(%id, "edit surface refers to a deleted cell; dropping its changes");
            self.edit = None;
            return Err(NotebookError::CellNotFound(id));
        };

        let range = self.write_cell_lines(index, &lines, UndoJoin::Join)?;
        if let Some(edit) = &mut self.edit {
            edit.mark_synced(range);
        }
        self.ensure_invariants();
        Ok(true)
    }

    fn sync_edit_if_dirty(&mut self) -> Result<(), NotebookError> {
        if self.edit.as_ref().is_some_and(EditSurface::is_dirty) {
            self.sync_edit()?;
        }
        Ok(())
    }

    /// Undo the newest Facade undo group. Returns `false` if nothing changed.
    pub fn undo(&mut self) -> Result<bool, NotebookError> {
        self.sync_edit_if_dirty()?;
        let before = self.facade.revision();
        if !self.facade.undo() || self.facade.revision() == before {
            return Ok(false);
        }
        self.sync_from_facade()?;
        Ok(true)
    }

    /// Redo the most recently undone group. Returns `false` if nothing changed.
    pub fn redo(&mut self) -> Result<bool, NotebookError> {
        self.sync_edit_if_dirty()?;
        let before = self.facade.revision();
        if !self.facade.redo() || self.facade.revision() == before {
            return Ok(false);
        }
        self.sync_from_facade()?;
        Ok(true)
    }

    /// Re-derive the Cell Store from the Facade text.
    ///
    /// Identities are recovered with [`CellStore::reconcile`]. Any re-rendering joins the
    /// newest undo group. If the Facade no longer parses it is re-rendered from the Cell Store
    /// and the parse error is returned.
    pub fn sync_from_facade(&mut self) -> Result<(), NotebookError> {
        let lines = self.facade.lines();
        let parsed = match self.markers.parse_lines(lines.iter().map(String::as_str)) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%err, "facade no longer parses; re-rendering from the cell store");
                self.repair();
                return Err(err.into());
            }
        };
        self.cells.reconcile(parsed);
        self.rerender(UndoJoin::Amend);
        Ok(())
    }

    /// Queue the code cell at `index` for execution.
    ///
    /// Clears its outputs, marks it queued, and returns the command to send to the kernel
    /// bridge. Events for the execution are matched back through the command's ticket, which
    /// stays valid until the cell is queued again so a late namespace report still lands.
    pub fn queue_execution(&mut self, index: usize) -> Result<ExecuteCommand, NotebookError> {
        self.sync_edit_if_dirty()?;
        let len = self.cells.len();
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(NotebookError::IndexOutOfRange { index, len })?;
        if !cell.kind.is_code() {
            return Err(NotebookError::NotExecutable(cell.id.clone()));
        }
        cell.outputs.clear();
        cell.execution_state = ExecutionState::Queued;

        let ticket = ExecutionTicket(self.next_ticket);
        self.next_ticket += 1;
        let id = cell.id.clone();
        let mut command = ExecuteCommand::new(cell.source.clone(), ticket);
        if let Some(expression) = &self.config.namespace_expression {
            command = command.with_namespace_capture(expression.clone());
        }
        self.executions.retain(|_, queued| *queued != id);
        debug!(%id, ticket = ticket.0, "execution queued");
        self.executions.insert(ticket, id);
        Ok(command)
    }

    /// Return every cell with an execution in flight to idle.
    fn settle_executions(&mut self) {
        for id in self.executions.values() {
            if let Some(index) = self.cells.index_of(id)
                && let Some(cell) = self.cells.get_mut(index)
            {
                cell.execution_state = ExecutionState::Idle;
            }
        }
    }

    /// Apply one kernel bridge event.
    ///
    /// Events for executions whose cell has since been deleted are discarded.
    pub fn apply_kernel_event(&mut self, event: KernelEvent) -> KernelOutcome {
        let Some(ticket) = event.ticket() else {
            return match event {
                KernelEvent::Shutdown | KernelEvent::Restarted => {
                    self.settle_executions();
                    self.executions.clear();
                    let notice = if event == KernelEvent::Shutdown {
                        "kernel shut down"
                    } else {
                        "kernel restarted"
                    };
                    KernelOutcome::Notice(notice.to_string())
                }
                KernelEvent::Interrupted => {
                    self.settle_executions();
                    KernelOutcome::Notice("kernel interrupted".to_string())
                }
                KernelEvent::Error { error, .. } => KernelOutcome::Notice(error),
                _ => KernelOutcome::Ignored,
            };
        };

        let Some(id) = self.executions.get(&ticket).cloned() else {
            debug!(ticket = ticket.0, "kernel event for an unknown execution");
            return KernelOutcome::Discarded;
        };
        let Some(index) = self.cells.index_of(&id) else {
            warn!(%id, ticket = ticket.0, "kernel event for a deleted cell; discarding");
            self.executions.remove(&ticket);
            return KernelOutcome::Discarded;
        };
        let Some(cell) = self.cells.get_mut(index) else {
            return KernelOutcome::Discarded;
        };

        match event {
            KernelEvent::Status { state, .. } => match state.as_str() {
                "busy" => cell.execution_state = ExecutionState::Busy,
                "idle" => cell.execution_state = ExecutionState::Idle,
                _ => return KernelOutcome::Ignored,
            },
            KernelEvent::ExecuteRequest { .. } => cell.execution_state = ExecutionState::Queued,
            KernelEvent::ExecuteInput {
                execution_count, ..
            } => {
                cell.execution_state = ExecutionState::Busy;
                if execution_count.is_some() {
                    cell.execution_count = execution_count;
                }
            }
            KernelEvent::Output { output, .. } => {
                if let Some(count) = output
                    .fields
                    .get("execution_count")
                    .and_then(serde_json::Value::as_u64)
                {
                    cell.execution_count = Some(count);
                }
                cell.outputs.push(output);
            }
            KernelEvent::Namespace { namespace_repr, .. } => {
                self.namespaces.insert(id.clone(), namespace_repr);
                self.executions.remove(&ticket);
            }
            KernelEvent::Error { error, .. } => {
                cell.execution_state = ExecutionState::Idle;
                return KernelOutcome::Notice(error);
            }
            _ => return KernelOutcome::Ignored,
        }
        KernelOutcome::Applied(id)
    }

    /// Decorations for every cell at its current range.
    pub fn decorations(&self) -> Vec<Decoration> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| {
                self.range_of(index)
                    .map(|range| cell_decorations(cell, range))
            })
            .flatten()
            .collect()
    }

    /// Persisted form of the notebook.
    pub fn to_notebook(&self) -> Notebook {
        self.document.with_cells(self.cells.iter())
    }

    /// Persisted JSON of the notebook.
    pub fn to_json(&self) -> Result<String, NotebookError> {
        Ok(self.to_notebook().to_json()?)
    }

    /// Check the coordinate invariants.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let facade = self.facade.lines();
        let rendered = self.markers.render_lines(self.cells.iter());
        if let Some(line) = first_difference(&facade, &rendered) {
            return Err(InvariantViolation::FacadeContent { line });
        }
        BoundaryTracker::verify(&self.cells, &self.facade, &self.markers)?;

        let shadow = self.shadow.buffer().lines();
        if shadow.len() != facade.len() {
            return Err(InvariantViolation::ShadowLineCount {
                facade: facade.len(),
                shadow: shadow.len(),
            });
        }
        if let Some(line) = first_difference(&shadow, &shadow_lines(&self.cells)) {
            return Err(InvariantViolation::ShadowContent { line });
        }
        Ok(())
    }

    /// Re-render every surface from the Cell Store and re-place all anchors.
    ///
    /// The Facade correction joins the newest undo group, so undoing it also undoes the change
    /// that broke the invariant.
    pub fn repair(&mut self) {
        let lines = self.markers.render_lines(self.cells.iter());
        self.facade.set_lines(&lines, UndoJoin::Amend);
        BoundaryTracker::place(&self.cells, &mut self.facade);
        self.shadow.refresh(&self.cells);
        self.reload_edit();
    }

    fn ensure_invariants(&mut self) {
        if let Err(violation) = self.check_invariants() {
            error!(%violation, "coordinate invariant violated; re-rendering");
            self.repair();
        }
    }

    fn rerender(&mut self, join: UndoJoin) {
        let lines = self.markers.render_lines(self.cells.iter());
        self.facade.set_lines(&lines, join);
        BoundaryTracker::place(&self.cells, &mut self.facade);
        self.shadow.refresh(&self.cells);
        self.reload_edit();
        self.ensure_invariants();
    }

    fn range_or_repair(&mut self, index: usize) -> Result<CellRange, NotebookError> {
        let Some(cell) = self.cells.get(index) else {
            return Err(NotebookError::IndexOutOfRange {
                index,
                len: self.cells.len(),
            });
        };
        if let Some(range) = self.range_of(index) {
            return Ok(range);
        }
        let id = cell.id.clone();
        error!(%id, "cell has no boundary anchor; re-rendering");
        self.repair();
        self.range_of(index)
            .ok_or_else(|| InvariantViolation::MissingAnchor(id).into())
    }

    /// Replace one cell's content lines in the Facade, Cell Store and Shadow.
    fn write_cell_lines<S: AsRef<str>>(
        &mut self,
        index: usize,
        lines: &[S],
        join: UndoJoin,
    ) -> Result<CellRange, NotebookError> {
        let mut lines: Vec<&str> = lines.iter().map(AsRef::<str>::as_ref).collect();
        if lines.is_empty() {
            lines.push("");
        }
        let source = lines.join("\n");
        self.markers.check_source(&source)?;
        let old = self.range_or_repair(index)?;

        self.facade
            .replace_lines(old.content_start(), old.content_end(), &lines, join);
        self.cells.set_source(index, source)?;
        if lines.len() != old.content_len() {
            BoundaryTracker::place(&self.cells, &mut self.facade);
        }
        if let Some(cell) = self.cells.get(index) {
            self.shadow.patch_cell(old, cell);
        }

        self.range_of(index).ok_or_else(|| {
            let id = self
                .cells
                .get(index)
                .map(|cell| cell.id.clone())
                .unwrap_or_else(|| CellId::new(""));
            InvariantViolation::MissingAnchor(id).into()
        })
    }

    /// Point the Edit Surface at its cell's current range and content, or close it if the
    /// cell is gone.
    fn reload_edit(&mut self) {
        let Some(edit) = self.edit.as_mut() else {
            return;
        };
        let current = self.cells.index_of(edit.cell()).and_then(|index| {
            let range = BoundaryTracker::range_of(&self.cells, &self.facade, index)?;
            Some((self.cells.get(index)?, range))
        });
        match current {
            Some((cell, range)) => {
                if edit.buffer().text() == cell.source {
                    edit.mark_synced(range);
                } else {
                    edit.reload(&cell.source, range);
                }
            }
            None => {
                debug!(id = %edit.cell(), "edited cell no longer exists; closing edit surface");
                self.edit = None;
            }
        }
    }
}

fn sorted_bottom_up(edits: &[FacadeEdit]) -> Vec<&FacadeEdit> {
    let mut sorted: Vec<&FacadeEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| b.start.cmp(&a.start));
    sorted
}

fn first_difference(a: &[String], b: &[String]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}
