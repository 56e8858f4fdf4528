//! Diagnostics publisher: Shadow diagnostics re-targeted at the Facade and the Edit Surface.
//!
//! Incoming sets are coalesced per notebook; only the newest set survives until the next
//! [`DiagnosticsPublisher::drain`]. Draining works on a snapshot of the queue, so sets
//! scheduled while results are being published wait for the following drain.

use crate::lsp_events::{LspDiagnostic, LspPublishDiagnosticsParams};
use notebook_core::{NotebookId, NotebookRepository, NotebookState, SurfaceId};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Where a published set belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticsTarget {
    /// The notebook's Facade; ranges are Facade lines.
    Facade(NotebookId),
    /// An open Edit Surface; ranges are relative to the cell's first content line.
    Edit(SurfaceId),
}

/// A diagnostics set ready for the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedDiagnostics {
    /// Destination surface.
    pub target: DiagnosticsTarget,
    /// Diagnostics, with `uri` set to the Facade document.
    pub params: LspPublishDiagnosticsParams,
}

/// Coalescing queue of Shadow diagnostics.
#[derive(Debug, Default)]
pub struct DiagnosticsPublisher {
    latest: HashMap<NotebookId, LspPublishDiagnosticsParams>,
    queue: VecDeque<NotebookId>,
}

impl DiagnosticsPublisher {
    /// Create an empty publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the newest Shadow diagnostics of `notebook` and queue it for publishing.
    pub fn schedule(&mut self, notebook: NotebookId, params: LspPublishDiagnosticsParams) {
        self.latest.insert(notebook, params);
        self.enqueue(notebook);
    }

    /// Queue the last known diagnostics of `notebook` again, e.g. after an Edit Surface opens.
    ///
    /// Returns `false` if nothing was ever received for it.
    pub fn refresh(&mut self, notebook: NotebookId) -> bool {
        if !self.latest.contains_key(&notebook) {
            return false;
        }
        self.enqueue(notebook);
        true
    }

    /// Drop everything known about `notebook`.
    pub fn forget(&mut self, notebook: NotebookId) {
        self.latest.remove(&notebook);
        self.queue.retain(|queued| *queued != notebook);
    }

    /// Number of notebooks waiting to be published.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn enqueue(&mut self, notebook: NotebookId) {
        if !self.queue.contains(&notebook) {
            self.queue.push_back(notebook);
        }
    }

    /// Publish every queued set.
    ///
    /// `facade_uri` names each notebook's Facade document; notebooks it does not know are
    /// skipped. Each notebook yields a Facade set and, with an Edit Surface open, an Edit set.
    pub fn drain(
        &mut self,
        repo: &NotebookRepository,
        facade_uri: impl Fn(NotebookId) -> Option<String>,
    ) -> Vec<PublishedDiagnostics> {
        let snapshot: Vec<NotebookId> = self.queue.drain(..).collect();
        let mut out = Vec::with_capacity(snapshot.len());
        for notebook in snapshot {
            let (Some(raw), Ok(state), Some(uri)) = (
                self.latest.get(&notebook),
                repo.get(notebook),
                facade_uri(notebook),
            ) else {
                debug!(notebook = notebook.get(), "diagnostics for a closed notebook dropped");
                continue;
            };

            let in_code: Vec<LspDiagnostic> = raw
                .diagnostics
                .iter()
                .filter(|diagnostic| in_code_cell(state, diagnostic))
                .cloned()
                .collect();

            if let (Some(surface), Some(edit)) = (repo.edit_surface(notebook), state.edit()) {
                let range = edit.range();
                let offset = edit.line_offset() as u32;
                let diagnostics = in_code
                    .iter()
                    .filter(|d| range.contains_content(d.range.start.line as usize))
                    .map(|d| {
                        let mut shifted = d.clone();
                        shifted.range.start.line -= offset;
                        shifted.range.end.line = shifted.range.end.line.saturating_sub(offset);
                        shifted
                    })
                    .collect();
                out.push(PublishedDiagnostics {
                    target: DiagnosticsTarget::Edit(surface),
                    params: LspPublishDiagnosticsParams {
                        uri: uri.clone(),
                        diagnostics,
                        version: None,
                    },
                });
            }

            out.push(PublishedDiagnostics {
                target: DiagnosticsTarget::Facade(notebook),
                params: LspPublishDiagnosticsParams {
                    uri,
                    diagnostics: in_code,
                    version: None,
                },
            });
        }
        out
    }
}

fn in_code_cell(state: &NotebookState, diagnostic: &LspDiagnostic) -> bool {
    let line = diagnostic.range.start.line as usize;
    let Some(index) = state.cell_at(line) else {
        return false;
    };
    let (Some(cell), Some(range)) = (state.cells().get(index), state.range_of(index)) else {
        return false;
    };
    cell.kind.is_code() && range.contains_content(line)
}
