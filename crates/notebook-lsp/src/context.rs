//! Per-call resolution of a surface handle.

use notebook_core::{CellId, NotebookId, NotebookRepository, SurfaceId, SurfaceKind};

/// What a surface handle means right now.
///
/// Built fresh for every proxy call and never stored: an Edit Surface may close or its cell
/// may move between a request and its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferContext {
    /// The resolved handle.
    pub surface: SurfaceId,
    /// Owning notebook.
    pub notebook: NotebookId,
    /// Surface kind.
    pub kind: SurfaceKind,
    /// Lines to add to surface-relative lines to get Facade/Shadow lines. Zero unless Edit.
    pub line_offset: usize,
    /// Cell shown by an Edit Surface.
    pub edit_cell: Option<CellId>,
}

impl BufferContext {
    /// Resolve `surface`, or `None` if it is no longer live.
    pub fn resolve(repo: &NotebookRepository, surface: SurfaceId) -> Option<Self> {
        let info = repo.resolve(surface)?;
        let (line_offset, edit_cell) = match info.kind {
            SurfaceKind::Edit => {
                let edit = repo.get(info.notebook).ok()?.edit()?;
                (edit.line_offset(), Some(edit.cell().clone()))
            }
            SurfaceKind::Facade | SurfaceKind::Shadow => (0, None),
        };
        Some(Self {
            surface,
            notebook: info.notebook,
            kind: info.kind,
            line_offset,
            edit_cell,
        })
    }

    /// Surface line to Shadow line.
    pub fn to_shadow_line(&self, line: u64) -> u64 {
        line + self.line_offset as u64
    }

    /// Shadow line to surface line, clamped at the surface's first line.
    pub fn from_shadow_line(&self, line: u64) -> u64 {
        line.saturating_sub(self.line_offset as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebook_core::{Cell, CellKind, NotebookConfig, NotebookState};

    fn repo_with_notebook() -> (NotebookRepository, NotebookId, SurfaceId) {
        let state = NotebookState::from_cells(
            vec![
                Cell::new(CellId::new("m"), CellKind::Markdown, "# title\ntext"),
                Cell::new(CellId::new("c"), CellKind::Code, "x = 1"),
            ],
            NotebookConfig::default(),
        ).unwrap();
        let mut repo = NotebookRepository::new();
        let handles = repo.insert("/nb.ipynb", state);
        (repo, handles.notebook, handles.facade)
    }

    #[test]
    fn test_facade_has_no_offset() {
        let (repo, notebook, facade) = repo_with_notebook();
        let ctx = BufferContext::resolve(&repo, facade).unwrap();
        assert_eq!(ctx.notebook, notebook);
        assert_eq!(ctx.kind, SurfaceKind::Facade);
        assert_eq!(ctx.line_offset, 0);
    }

    #[test]
    fn test_edit_offset_is_first_content_line() {
        let (mut repo, notebook, _) = repo_with_notebook();
        let edit = repo.open_edit(notebook, 1).unwrap();
        let ctx = BufferContext::resolve(&repo, edit).unwrap();
        // Markdown cell spans lines 0..=3, blank separator on 4, code start marker on 5.
        assert_eq!(ctx.line_offset, 6);
        assert_eq!(ctx.edit_cell, Some(CellId::new("c")));
        assert_eq!(ctx.to_shadow_line(0), 6);
        assert_eq!(ctx.from_shadow_line(2), 0);

        repo.close_edit(notebook).unwrap();
        assert_eq!(BufferContext::resolve(&repo, edit), None);
    }
}
