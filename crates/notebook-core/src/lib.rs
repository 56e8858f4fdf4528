#![warn(missing_docs)]
//! Notebook Core - Headless Notebook Editing Engine
//!
//! # Overview
//!
//! `notebook-core` lets a plain-text editor edit Jupyter-style notebooks. A notebook is kept as
//! an ordered list of cells and exposed through three text surfaces that always agree on line
//! coordinates:
//!
//! - **Facade**: the whole notebook rendered as one text document, cells framed by delimiter
//!   lines. It carries the notebook's undo history.
//! - **Shadow**: same line count as the Facade, code cell lines only, everything else blank.
//!   This is the document a language server sees.
//! - **Edit Surface**: one cell's content, for focused editing.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  NotebookRepository (handles, staleness)    │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  NotebookState (sync paths, kernel events)  │  ← Orchestration
//! ├─────────────────────────────────────────────┤
//! │  Facade / Shadow / Edit Surface             │  ← Surfaces
//! ├─────────────────────────────────────────────┤
//! │  Boundary Tracker (anchors)                 │  ← Coordinates
//! ├─────────────────────────────────────────────┤
//! │  TextBuffer (rope, undo groups)             │  ← Text Storage
//! ├─────────────────────────────────────────────┤
//! │  Cell Store + rendered format + .ipynb      │  ← Data Model
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use notebook_core::{Cell, CellId, CellKind, NotebookConfig, NotebookState, UndoJoin};
//!
//! let mut state = NotebookState::from_cells(
//!     vec![
//!         Cell::new(CellId::new("intro"), CellKind::Markdown, "# Intro"),
//!         Cell::new(CellId::new("code"), CellKind::Code, "x = 1"),
//!     ],
//!     NotebookConfig::default(),
//! ).unwrap();
//!
//! // Edit the code cell through an Edit Surface.
//! state.open_edit(1).unwrap();
//! let edit = state.edit_mut().unwrap();
//! let end = edit.buffer().len_chars();
//! edit.buffer_mut().replace(end, end, "\ny = 2", UndoJoin::Join);
//! state.sync_edit().unwrap();
//! state.commit_edit().unwrap();
//!
//! assert_eq!(state.cells().get(1).unwrap().source, "x = 1\ny = 2");
//! assert_eq!(state.facade().line_count(), state.shadow().line_count());
//!
//! state.undo().unwrap();
//! assert_eq!(state.cells().get(1).unwrap().source, "x = 1");
//! ```
//!
//! # Module Description
//!
//! - [`cell`] - cell data model
//! - [`store`] - authoritative cell list and identity reconciliation
//! - [`format`] - rendered Facade text format
//! - [`buffer`] - rope-backed text buffer with anchors and undo groups
//! - [`boundary`] - cell index to Facade line range mapping
//! - [`shadow`] - code-only mirror surface
//! - [`edit`] - single-cell Edit Surface
//! - [`state`] - per-notebook orchestration
//! - [`repository`] - open notebooks and surface handles
//! - [`persist`] - `.ipynb` JSON codec
//! - [`kernel`] - kernel bridge messages
//! - [`decorations`] - borders, execution labels and output previews

pub mod boundary;
pub mod buffer;
pub mod cell;
pub mod config;
pub mod decorations;
pub mod edit;
pub mod error;
pub mod format;
pub mod kernel;
pub mod persist;
pub mod repository;
pub mod shadow;
pub mod state;
pub mod store;
mod undo;

pub use boundary::{BoundaryTracker, CellRange};
pub use buffer::{BufferEdit, TextBuffer, UndoJoin};
pub use cell::{Cell, CellId, CellKind, ExecutionState, Output, content_line_count};
pub use config::NotebookConfig;
pub use decorations::{Decoration, DecorationKind, DecorationPlacement};
pub use edit::EditSurface;
pub use error::{InvariantViolation, NotebookError, ParseError, PersistError};
pub use format::{Markers, ParsedCell, layout_start_lines};
pub use kernel::{
    ExecuteCommand, ExecutionTicket, KernelEvent, KernelOutcome, NAMESPACE_EXPRESSION_KEY,
};
pub use persist::Notebook;
pub use repository::{
    NotebookId, NotebookRepository, OpenNotebookResult, SurfaceId, SurfaceInfo, SurfaceKind,
};
pub use shadow::Shadow;
pub use state::{FacadeEdit, NotebookState};
pub use store::CellStore;
