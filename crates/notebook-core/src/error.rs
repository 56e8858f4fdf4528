//! Error types.

use crate::cell::CellId;
use thiserror::Error;

/// Rendered (Facade) text could not be split back into cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A start marker names an unknown cell type.
    #[error("line {line}: unknown cell type `{kind}` in start marker")]
    UnknownKind {
        /// 0-based line.
        line: usize,
        /// The unrecognized type name.
        kind: String,
    },
    /// An end marker appeared with no open cell.
    #[error("line {line}: end marker without a matching start marker")]
    UnmatchedEnd {
        /// 0-based line.
        line: usize,
    },
    /// Text outside of any cell.
    #[error("line {line}: text outside of a cell")]
    StrayText {
        /// 0-based line.
        line: usize,
    },
    /// A cell source contains a line identical to the end marker.
    #[error("source line {line} is the cell end marker `{marker}`; change or indent that line")]
    EndMarkerInSource {
        /// 0-based line within the source.
        line: usize,
        /// The end marker.
        marker: String,
    },
    /// The document ended inside a cell.
    #[error("cell starting at line {line} is never closed")]
    Unterminated {
        /// 0-based line of the start marker.
        line: usize,
    },
}

/// A persisted notebook could not be decoded or encoded.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Invalid JSON or a structurally invalid notebook.
    #[error("malformed notebook: {0}")]
    Json(#[from] serde_json::Error),
    /// A cell has a `cell_type` this engine does not know.
    #[error("cell {index}: unsupported cell type `{kind}`")]
    UnsupportedCellType {
        /// Position in the cell array.
        index: usize,
        /// The offending type.
        kind: String,
    },
}

/// A coordinate invariant failed to hold.
///
/// These indicate a defect in a synchronization path. Callers answer them with a full re-render
/// ([`NotebookState::repair`](crate::NotebookState::repair)) rather than continuing on stale
/// coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A live cell has no valid anchor in the Facade.
    #[error("cell {0} has no boundary anchor")]
    MissingAnchor(CellId),
    /// An anchor does not sit on the expected line.
    #[error("cell {id}: anchor at line {actual}, expected line {expected}")]
    AnchorDrift {
        /// Cell id.
        id: CellId,
        /// Line the anchor resolves to.
        actual: usize,
        /// Line the layout requires.
        expected: usize,
    },
    /// A delimiter line does not contain the expected marker.
    #[error("line {line}: expected delimiter `{expected}`")]
    MarkerMismatch {
        /// 0-based Facade line.
        line: usize,
        /// Expected marker text.
        expected: String,
    },
    /// A Facade line differs from the rendering of the cell store.
    #[error("facade line {line} does not match the cell store")]
    FacadeContent {
        /// 0-based line.
        line: usize,
    },
    /// Facade and Shadow line counts differ.
    #[error("shadow has {shadow} lines but facade has {facade}")]
    ShadowLineCount {
        /// Facade line count.
        facade: usize,
        /// Shadow line count.
        shadow: usize,
    },
    /// A Shadow line does not mirror the Facade.
    #[error("shadow line {line} does not mirror the facade")]
    ShadowContent {
        /// 0-based line.
        line: usize,
    },
}

/// Errors returned by [`NotebookState`](crate::NotebookState) and
/// [`NotebookRepository`](crate::NotebookRepository) operations.
#[derive(Debug, Error)]
pub enum NotebookError {
    /// A cell index was out of range.
    #[error("cell index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of cells.
        len: usize,
    },
    /// A cell id is not (or no longer) present.
    #[error("cell {0} not found")]
    CellNotFound(CellId),
    /// An operation required an open Edit Surface.
    #[error("no cell is open for editing")]
    NoEditSession,
    /// The notebook handle is unknown (closed or never opened).
    #[error("notebook not found")]
    NotebookNotFound,
    /// The surface handle is unknown or no longer live.
    #[error("surface not found")]
    SurfaceNotFound,
    /// Only code cells can be executed.
    #[error("cell {0} is not a code cell")]
    NotExecutable(CellId),
    /// A cell moved or changed size since its range was captured.
    #[error("cell {0} changed since the edit was computed")]
    StaleCellRange(CellId),
    /// An edit reaches outside the content lines of its cell.
    #[error("edit at line {line} falls outside cell {id}")]
    EditOutsideCell {
        /// Cell the edit was meant for.
        id: CellId,
        /// Offending Facade line.
        line: usize,
    },
    /// Rendered text failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The persisted notebook is malformed.
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// A coordinate invariant failed.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
