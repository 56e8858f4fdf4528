//! Notebook repository: open notebooks and their surface handles.
//!
//! The repository owns every [`NotebookState`] and hands out opaque handles:
//!
//! - [`NotebookId`] for a notebook
//! - [`SurfaceId`] for one of its surfaces (Facade, Shadow, or an Edit Surface session)
//!
//! Language-server requests remember the [`SurfaceId`] they originated from. When a response
//! arrives, [`NotebookRepository::resolve`] tells whether that surface is still live: a closed
//! notebook or a closed/replaced Edit Surface resolves to `None`.

use crate::config::NotebookConfig;
use crate::error::NotebookError;
use crate::state::NotebookState;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Opaque identifier for an open notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotebookId(u64);

impl NotebookId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Opaque identifier for a surface of an open notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Which surface a [`SurfaceId`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// The rendered notebook.
    Facade,
    /// The code-only mirror.
    Shadow,
    /// An Edit Surface session.
    Edit,
}

/// A resolved, live surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceInfo {
    /// Owning notebook.
    pub notebook: NotebookId,
    /// Surface kind.
    pub kind: SurfaceKind,
}

/// Handles created when a notebook is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenNotebookResult {
    /// The notebook.
    pub notebook: NotebookId,
    /// Its Facade.
    pub facade: SurfaceId,
    /// Its Shadow.
    pub shadow: SurfaceId,
}

#[derive(Debug, Clone, Copy)]
struct SurfaceEntry {
    notebook: NotebookId,
    kind: SurfaceKind,
    /// Edit session generation; unused for Facade and Shadow.
    generation: u64,
}

#[derive(Debug)]
struct NotebookEntry {
    path: String,
    state: NotebookState,
    facade: SurfaceId,
    shadow: SurfaceId,
    edit: Option<SurfaceId>,
}

/// All open notebooks.
#[derive(Debug, Default)]
pub struct NotebookRepository {
    next_id: u64,
    notebooks: BTreeMap<NotebookId, NotebookEntry>,
    surfaces: HashMap<SurfaceId, SurfaceEntry>,
    by_path: HashMap<String, NotebookId>,
}

impl NotebookRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Load the notebook at `path` from its JSON. Opening an already open path returns the
    /// existing handles.
    pub fn open(
        &mut self,
        path: impl Into<String>,
        json: &str,
        config: NotebookConfig,
    ) -> Result<OpenNotebookResult, NotebookError> {
        let path = path.into();
        if let Some(existing) = self.by_path.get(&path).copied() {
            return self.handles(existing);
        }
        let state = NotebookState::open(json, config)?;
        Ok(self.insert(path, state))
    }

    /// Register an already built notebook under `path`.
    pub fn insert(&mut self, path: impl Into<String>, state: NotebookState) -> OpenNotebookResult {
        let path = path.into();
        let notebook = NotebookId(self.next());
        let facade = SurfaceId(self.next());
        let shadow = SurfaceId(self.next());
        for (surface, kind) in [(facade, SurfaceKind::Facade), (shadow, SurfaceKind::Shadow)] {
            self.surfaces.insert(
                surface,
                SurfaceEntry {
                    notebook,
                    kind,
                    generation: 0,
                },
            );
        }
        debug!(notebook = notebook.0, %path, "notebook registered");
        self.by_path.insert(path.clone(), notebook);
        self.notebooks.insert(
            notebook,
            NotebookEntry {
                path,
                state,
                facade,
                shadow,
                edit: None,
            },
        );
        OpenNotebookResult {
            notebook,
            facade,
            shadow,
        }
    }

    /// Close a notebook, invalidating all of its surfaces.
    pub fn close(&mut self, id: NotebookId) -> Result<NotebookState, NotebookError> {
        let entry = self
            .notebooks
            .remove(&id)
            .ok_or(NotebookError::NotebookNotFound)?;
        self.surfaces.retain(|_, surface| surface.notebook != id);
        self.by_path.remove(&entry.path);
        debug!(notebook = id.0, "notebook closed");
        Ok(entry.state)
    }

    /// Handles of an open notebook.
    pub fn handles(&self, id: NotebookId) -> Result<OpenNotebookResult, NotebookError> {
        let entry = self
            .notebooks
            .get(&id)
            .ok_or(NotebookError::NotebookNotFound)?;
        Ok(OpenNotebookResult {
            notebook: id,
            facade: entry.facade,
            shadow: entry.shadow,
        })
    }

    /// Open notebook ids in creation order.
    pub fn notebook_ids(&self) -> Vec<NotebookId> {
        self.notebooks.keys().copied().collect()
    }

    /// Notebook opened from `path`.
    pub fn find_by_path(&self, path: &str) -> Option<NotebookId> {
        self.by_path.get(path).copied()
    }

    /// Path a notebook was opened from.
    pub fn path(&self, id: NotebookId) -> Option<&str> {
        self.notebooks.get(&id).map(|entry| entry.path.as_str())
    }

    /// Borrow a notebook.
    pub fn get(&self, id: NotebookId) -> Result<&NotebookState, NotebookError> {
        self.notebooks
            .get(&id)
            .map(|entry| &entry.state)
            .ok_or(NotebookError::NotebookNotFound)
    }

    /// Mutably borrow a notebook.
    pub fn get_mut(&mut self, id: NotebookId) -> Result<&mut NotebookState, NotebookError> {
        self.notebooks
            .get_mut(&id)
            .map(|entry| &mut entry.state)
            .ok_or(NotebookError::NotebookNotFound)
    }

    /// Open an Edit Surface on cell `index`, replacing any previous session.
    pub fn open_edit(&mut self, id: NotebookId, index: usize) -> Result<SurfaceId, NotebookError> {
        let surface = SurfaceId(self.next());
        let entry = self
            .notebooks
            .get_mut(&id)
            .ok_or(NotebookError::NotebookNotFound)?;
        let generation = entry.state.open_edit(index)?;
        if let Some(previous) = entry.edit.replace(surface) {
            self.surfaces.remove(&previous);
        }
        self.surfaces.insert(
            surface,
            SurfaceEntry {
                notebook: id,
                kind: SurfaceKind::Edit,
                generation,
            },
        );
        Ok(surface)
    }

    /// Commit and close the notebook's Edit Surface, if any.
    pub fn close_edit(&mut self, id: NotebookId) -> Result<(), NotebookError> {
        let entry = self
            .notebooks
            .get_mut(&id)
            .ok_or(NotebookError::NotebookNotFound)?;
        entry.state.close_edit();
        if let Some(surface) = entry.edit.take() {
            self.surfaces.remove(&surface);
        }
        Ok(())
    }

    /// The live Edit Surface of a notebook.
    pub fn edit_surface(&self, id: NotebookId) -> Option<SurfaceId> {
        let entry = self.notebooks.get(&id)?;
        let surface = entry.edit?;
        self.resolve(surface).map(|_| surface)
    }

    /// Resolve a surface handle, or `None` if it is no longer live.
    pub fn resolve(&self, surface: SurfaceId) -> Option<SurfaceInfo> {
        let entry = self.surfaces.get(&surface)?;
        let notebook = self.notebooks.get(&entry.notebook)?;
        if entry.kind == SurfaceKind::Edit
            && notebook.state.edit().map(|edit| edit.generation()) != Some(entry.generation)
        {
            return None;
        }
        Some(SurfaceInfo {
            notebook: entry.notebook,
            kind: entry.kind,
        })
    }
}
