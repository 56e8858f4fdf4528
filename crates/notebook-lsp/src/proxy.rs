//! Protocol Proxy: language-server traffic routed through Shadow documents.
//!
//! The proxy sits between the host's LSP client and the server. The host hands every request
//! that concerns a notebook surface to [`ProtocolProxy::outbound_request`] and every server
//! message back to [`ProtocolProxy::inbound_response`] or
//! [`ProtocolProxy::inbound_notification`]. The transport itself stays with the host.
//!
//! # Coordinates
//!
//! The Shadow has the Facade's line numbering, so only Edit Surface traffic is translated: the
//! cell's line offset is added on the way out and subtracted from bare ranges on the way back.
//! Columns are UTF-16 on every surface and never change.
//!
//! # Identifiers
//!
//! Outbound, the document identifier becomes the Shadow URI. Inbound, the Shadow URI becomes
//! the Facade URI for navigation requests and the synthetic preview URI for everything else.
//! Rename and formatting results are not rewritten at all: they are applied to the notebook
//! by [`crate::appliers`]. A rename answer is dropped when the notebook changed after the
//! request was sent.
//!
//! # Flushing
//!
//! The server must see the current Shadow before it answers: send the `didChange` of
//! [`ProtocolProxy::flush_shadow_changes`] ahead of every request, or let
//! [`ProtocolProxy::request_with_flush`] produce both.

use crate::appliers::{apply_cell_format, apply_rename, cell_content_range, format_target};
use crate::config::ProxyConfig;
use crate::context::BufferContext;
use crate::diagnostics::{DiagnosticsPublisher, PublishedDiagnostics};
use crate::error::ProxyError;
use crate::lsp_events::{LspNotification, LspResponse, UserMessage};
use crate::lsp_sync::LspRange;
use crate::lsp_locations::{NavigationTarget, navigation_targets};
use crate::lsp_text_edits::{text_edits_from_value, workspace_edit_versions_for_uri};
use crate::lsp_uri::{DocumentUris, notebook_file_name, synthetic_file_name, synthetic_path};
use crate::shadow_sync::{OutgoingNotification, ShadowDocument};
use notebook_core::{
    CellId, CellRange, NotebookError, NotebookId, NotebookRepository, NotebookState, SurfaceId,
};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Requests whose targets must open the real notebook document.
const NAVIGATION_METHODS: [&str; 4] = [
    "textDocument/definition",
    "textDocument/declaration",
    "textDocument/implementation",
    "textDocument/typeDefinition",
];

const REQUEST_CANCELLED: i64 = -32800;
const CONTENT_MODIFIED: i64 = -32801;

/// A client-to-server request, ready to be framed by the host's transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    /// JSON-RPC id assigned by the proxy.
    pub id: u64,
    /// JSON-RPC method.
    pub method: String,
    /// Rewritten params.
    pub params: Value,
}

impl OutgoingRequest {
    /// Full JSON-RPC message.
    pub fn to_json(&self) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": self.id,
            "method": self.method,
            "params": self.params,
        })
    }
}

/// What to do with a server response.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    /// Rewritten result for the request's original handler.
    Result {
        /// Surface the request came from.
        origin: SurfaceId,
        /// Request method.
        method: String,
        /// Result in the origin's coordinates and identifiers.
        result: Value,
        /// Jump targets of a navigation request, tied to their cells; empty otherwise.
        targets: Vec<NavigationTarget>,
    },
    /// Edits were applied to the notebook.
    Applied {
        /// Edited notebook.
        notebook: NotebookId,
        /// Number of text edits applied.
        edits: usize,
    },
    /// The next step of a whole-document format; send it.
    FollowUp(OutgoingRequest),
    /// Show this to the user.
    Notify(UserMessage),
    /// The response no longer applies (closed surface, moved cell, cancelled request).
    Discarded,
}

/// What to do with a server notification.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationOutcome {
    /// Shadow diagnostics were queued; call [`ProtocolProxy::drain_diagnostics`].
    DiagnosticsQueued(NotebookId),
    /// `window/showMessage` to show to the user.
    Notify(UserMessage),
    /// `window/logMessage` for the host's log.
    Log(UserMessage),
    /// Anything else, with Shadow identifiers rewritten to preview identifiers.
    Passthrough {
        /// Notification method.
        method: String,
        /// Rewritten params.
        params: Value,
    },
}

#[derive(Debug, Clone)]
struct FormatJob {
    cell: CellId,
    range: CellRange,
    /// Cells still to format, top to bottom; the next one is popped from the end.
    remaining: Vec<CellId>,
    options: Value,
    applied: usize,
}

#[derive(Debug, Clone)]
enum PendingKind {
    Rewrite,
    /// Facade revision and Shadow version the server was asked about.
    Rename { revision: u64, version: i32 },
    RangeFormat { cell: CellId, range: CellRange },
    DocumentFormat(FormatJob),
}

#[derive(Debug, Clone)]
struct PendingRequest {
    method: String,
    origin: SurfaceId,
    notebook: NotebookId,
    kind: PendingKind,
}

/// Routes language-server traffic for every registered notebook.
#[derive(Debug, Default)]
pub struct ProtocolProxy {
    config: ProxyConfig,
    next_request_id: u64,
    pending: HashMap<u64, PendingRequest>,
    documents: HashMap<NotebookId, ShadowDocument>,
    diagnostics: DiagnosticsPublisher,
}

impl ProtocolProxy {
    /// Create a proxy.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Proxy configuration.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Identifiers of a registered notebook.
    pub fn uris(&self, notebook: NotebookId) -> Option<&DocumentUris> {
        self.documents.get(&notebook).map(ShadowDocument::uris)
    }

    /// The Shadow document as the server knows it.
    pub fn shadow_document(&self, notebook: NotebookId) -> Option<&ShadowDocument> {
        self.documents.get(&notebook)
    }

    /// Registered notebook addressed by a Facade, Shadow or preview URI.
    pub fn notebook_for_uri(&self, uri: &str) -> Option<NotebookId> {
        self.documents.iter().find_map(|(id, doc)| {
            let uris = doc.uris();
            (uris.facade == uri || uris.shadow == uri || uris.synthetic == uri).then_some(*id)
        })
    }

    /// Number of requests awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Register a notebook's Shadow with the server.
    ///
    /// Shadow deltas are recorded from here on; earlier ones are discarded since the
    /// notification carries the full text.
    pub fn shadow_did_open(
        &mut self,
        repo: &mut NotebookRepository,
        notebook: NotebookId,
    ) -> Result<OutgoingNotification, ProxyError> {
        let path = repo
            .path(notebook)
            .ok_or(NotebookError::NotebookNotFound)?
            .to_string();
        let state = repo.get_mut(notebook)?;
        state.track_shadow_edits(true);
        let uris = DocumentUris::for_path(&path, &self.config);
        let document = ShadowDocument::new(path, uris, &state.shadow().text());
        let open = document.did_open(&self.config.language_id);
        debug!(notebook = notebook.get(), uri = %document.uris().shadow, "shadow opened");
        self.documents.insert(notebook, document);
        Ok(open)
    }

    /// Send the Shadow changes made since the last flush as one `didChange`.
    pub fn flush_shadow_changes(
        &mut self,
        repo: &mut NotebookRepository,
        notebook: NotebookId,
    ) -> Result<Option<OutgoingNotification>, ProxyError> {
        let document = self
            .documents
            .get_mut(&notebook)
            .ok_or(ProxyError::NotRegistered)?;
        let edits = repo.get_mut(notebook)?.take_shadow_edits();
        Ok(document.did_change(&edits))
    }

    /// Unregister a notebook's Shadow and stop recording its deltas. Responses still in
    /// flight for it are dropped.
    pub fn shadow_did_close(
        &mut self,
        repo: &mut NotebookRepository,
        notebook: NotebookId,
    ) -> Option<OutgoingNotification> {
        let document = self.documents.remove(&notebook)?;
        if let Ok(state) = repo.get_mut(notebook) {
            state.track_shadow_edits(false);
        }
        self.pending.retain(|_, pending| pending.notebook != notebook);
        self.diagnostics.forget(notebook);
        debug!(notebook = notebook.get(), "shadow closed");
        Some(document.did_close())
    }

    fn register(
        &mut self,
        method: &str,
        params: Value,
        origin: SurfaceId,
        notebook: NotebookId,
        kind: PendingKind,
    ) -> OutgoingRequest {
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.pending.insert(
            id,
            PendingRequest {
                method: method.to_string(),
                origin,
                notebook,
                kind,
            },
        );
        OutgoingRequest {
            id,
            method: method.to_string(),
            params,
        }
    }

    /// Rewrite a request from `origin` so that it addresses the Shadow.
    ///
    /// `textDocument/formatting` is decomposed into one `textDocument/rangeFormatting` per
    /// code cell, bottom to top; the first is returned here, the rest come back as
    /// [`InboundOutcome::FollowUp`]. Returns `Ok(None)` when there is nothing to send.
    ///
    /// Takes the repository by shared reference and so cannot flush: send the output of
    /// [`Self::flush_shadow_changes`] first, or use [`Self::request_with_flush`].
    pub fn outbound_request(
        &mut self,
        repo: &NotebookRepository,
        origin: SurfaceId,
        method: &str,
        mut params: Value,
    ) -> Result<Option<OutgoingRequest>, ProxyError> {
        let ctx = BufferContext::resolve(repo, origin).ok_or(ProxyError::SurfaceNotLive)?;
        let document = self
            .documents
            .get(&ctx.notebook)
            .ok_or(ProxyError::NotRegistered)?;
        let shadow_uri = document.uris().shadow.clone();
        let shadow_version = document.version();
        let state = repo.get(ctx.notebook)?;

        if method == "textDocument/formatting" {
            let mut remaining: Vec<CellId> = match &ctx.edit_cell {
                Some(id) => vec![id.clone()],
                None => state
                    .cells()
                    .iter()
                    .filter(|cell| cell.kind.is_code())
                    .map(|cell| cell.id.clone())
                    .collect(),
            };
            let options = params.get("options").cloned().unwrap_or(Value::Null);
            let request = self.next_format_request(
                state,
                &ctx,
                &shadow_uri,
                &mut remaining,
                options,
                0,
            );
            return Ok(request);
        }

        rewrite_outbound(&mut params, &shadow_uri, ctx.line_offset as u64);
        let kind = match method {
            "textDocument/rangeFormatting" => {
                let range = params
                    .get("range")
                    .and_then(LspRange::from_value)
                    .ok_or_else(|| ProxyError::Malformed {
                        method: method.to_string(),
                    })?;
                let (cell, range) = format_target(state, range)?;
                PendingKind::RangeFormat { cell, range }
            }
            "textDocument/rename" => PendingKind::Rename {
                revision: state.facade().revision(),
                version: shadow_version,
            },
            _ => PendingKind::Rewrite,
        };
        Ok(Some(self.register(
            method,
            params,
            origin,
            ctx.notebook,
            kind,
        )))
    }

    /// Sync a dirty Edit Surface, flush the Shadow, then rewrite the request.
    ///
    /// The `didChange`, when there is one, must reach the server before the request.
    pub fn request_with_flush(
        &mut self,
        repo: &mut NotebookRepository,
        origin: SurfaceId,
        method: &str,
        params: Value,
    ) -> Result<(Option<OutgoingNotification>, Option<OutgoingRequest>), ProxyError> {
        let ctx = BufferContext::resolve(repo, origin).ok_or(ProxyError::SurfaceNotLive)?;
        let state = repo.get_mut(ctx.notebook)?;
        if state.edit().is_some_and(|edit| edit.is_dirty()) {
            state.sync_edit()?;
        }
        let change = self.flush_shadow_changes(repo, ctx.notebook)?;
        let request = self.outbound_request(repo, origin, method, params)?;
        Ok((change, request))
    }

    fn next_format_request(
        &mut self,
        state: &NotebookState,
        ctx: &BufferContext,
        shadow_uri: &str,
        remaining: &mut Vec<CellId>,
        options: Value,
        applied: usize,
    ) -> Option<OutgoingRequest> {
        while let Some(cell) = remaining.pop() {
            let Some(range) = state
                .cells()
                .index_of(&cell)
                .and_then(|index| state.range_of(index))
            else {
                debug!(%cell, "cell gone before it could be formatted");
                continue;
            };
            let params = json!({
                "textDocument": { "uri": shadow_uri },
                "range": cell_content_range(state, range).to_value(),
                "options": options,
            });
            let job = FormatJob {
                cell,
                range,
                remaining: std::mem::take(remaining),
                options,
                applied,
            };
            return Some(self.register(
                "textDocument/rangeFormatting",
                params,
                ctx.surface,
                ctx.notebook,
                PendingKind::DocumentFormat(job),
            ));
        }
        None
    }

    /// Route a server response (a raw JSON-RPC message).
    pub fn inbound_response(
        &mut self,
        repo: &mut NotebookRepository,
        message: &Value,
    ) -> Result<InboundOutcome, ProxyError> {
        let response = LspResponse::from_json(message).ok_or_else(|| ProxyError::Malformed {
            method: "response".to_string(),
        })?;
        let Some(pending) = self.pending.remove(&response.id) else {
            debug!(id = response.id, "response to an unknown request dropped");
            return Ok(InboundOutcome::Discarded);
        };
        let Some(ctx) = BufferContext::resolve(repo, pending.origin) else {
            debug!(id = response.id, method = %pending.method, "origin surface closed; response dropped");
            return Ok(InboundOutcome::Discarded);
        };
        let Some(uris) = self.uris(ctx.notebook).cloned() else {
            debug!(id = response.id, "shadow closed; response dropped");
            return Ok(InboundOutcome::Discarded);
        };

        if let Some(error) = response.error {
            if matches!(error.code, REQUEST_CANCELLED | CONTENT_MODIFIED) {
                debug!(method = %pending.method, code = error.code, "request dropped by the server");
                return Ok(InboundOutcome::Discarded);
            }
            debug!(method = %pending.method, code = error.code, message = %error.message, "server error");
            return Ok(InboundOutcome::Notify(UserMessage::error(format!(
                "{}: {}",
                pending.method, error.message
            ))));
        }
        let mut result = response.result.unwrap_or(Value::Null);

        match pending.kind {
            PendingKind::Rewrite => {
                let navigation = NAVIGATION_METHODS.contains(&pending.method.as_str());
                let target = if navigation {
                    &uris.facade
                } else {
                    &uris.synthetic
                };
                rewrite_inbound(
                    &mut result,
                    &uris.shadow,
                    target,
                    ctx.line_offset as u64,
                    ctx.line_offset > 0,
                );
                let targets = if navigation {
                    navigation_targets(&result, &uris.facade, repo.get(ctx.notebook)?)
                } else {
                    Vec::new()
                };
                Ok(InboundOutcome::Result {
                    origin: pending.origin,
                    method: pending.method,
                    result,
                    targets,
                })
            }
            PendingKind::Rename { revision, version } => {
                let state = repo.get_mut(ctx.notebook)?;
                let edit_dirty = state.edit().is_some_and(|edit| edit.is_dirty());
                let version_moved = workspace_edit_versions_for_uri(&result, &uris.shadow)
                    .into_iter()
                    .any(|sent| sent != i64::from(version));
                if state.facade().revision() != revision || edit_dirty || version_moved {
                    debug!(
                        id = response.id,
                        revision,
                        version,
                        "notebook changed since the rename was requested; result dropped"
                    );
                    return Ok(InboundOutcome::Discarded);
                }
                match apply_rename(state, &uris.shadow, &result) {
                    Ok(edits) => Ok(InboundOutcome::Applied {
                        notebook: ctx.notebook,
                        edits,
                    }),
                    Err(ProxyError::CrossBoundary { message }) => {
                        Ok(InboundOutcome::Notify(UserMessage::error(message)))
                    }
                    Err(err) => Err(err),
                }
            }
            PendingKind::RangeFormat { cell, range } => {
                let edits = text_edits_from_value(&result);
                let state = repo.get_mut(ctx.notebook)?;
                match apply_cell_format(state, &cell, range, &edits) {
                    Ok(edits) => Ok(InboundOutcome::Applied {
                        notebook: ctx.notebook,
                        edits,
                    }),
                    Err(ProxyError::CrossBoundary { message }) => {
                        Ok(InboundOutcome::Notify(UserMessage::error(message)))
                    }
                    Err(ProxyError::Notebook(
                        NotebookError::StaleCellRange(_) | NotebookError::CellNotFound(_),
                    )) => {
                        debug!(%cell, "cell changed while formatting; result dropped");
                        Ok(InboundOutcome::Discarded)
                    }
                    Err(err) => Err(err),
                }
            }
            PendingKind::DocumentFormat(mut job) => {
                let edits = text_edits_from_value(&result);
                let state = repo.get_mut(ctx.notebook)?;
                match apply_cell_format(state, &job.cell, job.range, &edits) {
                    Ok(count) => job.applied += count,
                    Err(ProxyError::CrossBoundary { .. }) => {
                        warn!(cell = %job.cell, "formatter edits leave the cell; cell skipped");
                    }
                    Err(ProxyError::Notebook(
                        NotebookError::StaleCellRange(_) | NotebookError::CellNotFound(_),
                    )) => {
                        debug!(cell = %job.cell, "cell changed while formatting; cell skipped");
                    }
                    Err(err) => return Err(err),
                }
                let state = repo.get(ctx.notebook)?;
                match self.next_format_request(
                    state,
                    &ctx,
                    &uris.shadow,
                    &mut job.remaining,
                    job.options,
                    job.applied,
                ) {
                    Some(request) => Ok(InboundOutcome::FollowUp(request)),
                    None => Ok(InboundOutcome::Applied {
                        notebook: ctx.notebook,
                        edits: job.applied,
                    }),
                }
            }
        }
    }

    /// Route a server notification.
    pub fn inbound_notification(&mut self, method: &str, mut params: Value) -> NotificationOutcome {
        match LspNotification::from_method_and_params(method, &params) {
            Some(LspNotification::PublishDiagnostics(diagnostics)) => {
                if let Some(notebook) = self.notebook_for_uri(&diagnostics.uri) {
                    self.diagnostics.schedule(notebook, diagnostics);
                    return NotificationOutcome::DiagnosticsQueued(notebook);
                }
            }
            Some(LspNotification::ShowMessage(message)) => {
                return NotificationOutcome::Notify(message);
            }
            Some(LspNotification::LogMessage(message)) => return NotificationOutcome::Log(message),
            None => {}
        }
        for document in self.documents.values() {
            let uris = document.uris();
            rewrite_inbound(&mut params, &uris.shadow, &uris.synthetic, 0, false);
        }
        NotificationOutcome::Passthrough {
            method: method.to_string(),
            params,
        }
    }

    /// Publish queued diagnostics against Facades and open Edit Surfaces.
    pub fn drain_diagnostics(&mut self, repo: &NotebookRepository) -> Vec<PublishedDiagnostics> {
        let documents = &self.documents;
        self.diagnostics.drain(repo, |notebook| {
            documents
                .get(&notebook)
                .map(|document| document.uris().facade.clone())
        })
    }

    /// Queue the last known diagnostics of `notebook` again.
    pub fn refresh_diagnostics(&mut self, notebook: NotebookId) -> bool {
        self.diagnostics.refresh(notebook)
    }

    /// Contents of a read-only preview document.
    ///
    /// The URI's `path` query names the notebook exactly. Without it, the file name must match
    /// exactly one open notebook, registered or not.
    pub fn read_synthetic(&self, repo: &NotebookRepository, uri: &str) -> Option<String> {
        let scheme = &self.config.synthetic_scheme;
        let file_name = synthetic_file_name(uri, scheme)?;
        let notebook = match synthetic_path(uri, scheme) {
            Some(path) => repo.find_by_path(&path)?,
            None => {
                let mut matches = repo.notebook_ids().into_iter().filter(|id| {
                    repo.path(*id)
                        .is_some_and(|path| notebook_file_name(path) == file_name)
                });
                let notebook = matches.next()?;
                if matches.next().is_some() {
                    warn!(%uri, "preview identifier names more than one notebook");
                    return None;
                }
                notebook
            }
        };
        repo.get(notebook).ok().map(|state| state.facade().text())
    }
}

fn as_position(map: &Map<String, Value>) -> Option<u64> {
    map.get("character").filter(|c| c.is_u64())?;
    map.get("line").and_then(Value::as_u64)
}

/// Point the request at the Shadow and move Edit-relative lines to Shadow lines.
fn rewrite_outbound(value: &mut Value, shadow_uri: &str, offset: u64) {
    match value {
        Value::Object(map) => {
            if let Some(Value::Object(document)) = map.get_mut("textDocument") {
                document.insert("uri".to_string(), Value::from(shadow_uri));
            }
            if offset > 0
                && let Some(line) = as_position(map)
            {
                map.insert("line".to_string(), Value::from(line + offset));
            }
            for child in map.values_mut() {
                rewrite_outbound(child, shadow_uri, offset);
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_outbound(item, shadow_uri, offset);
            }
        }
        _ => {}
    }
}

/// Replace Shadow identifiers with `target` and, when `shift` holds, move bare positions back
/// into Edit coordinates. Positions inside located objects (`uri`/`targetUri`) stay absolute,
/// except a link's `originSelectionRange`, which belongs to the requesting document.
fn rewrite_inbound(value: &mut Value, shadow_uri: &str, target: &str, offset: u64, shift: bool) {
    match value {
        Value::Object(map) => {
            if let Some(edits) = map.remove(shadow_uri) {
                map.insert(target.to_string(), edits);
            }
            let mut located = false;
            for key in ["uri", "targetUri"] {
                if let Some(Value::String(uri)) = map.get_mut(key) {
                    located = true;
                    if *uri == shadow_uri {
                        *uri = target.to_string();
                    }
                }
            }
            if shift
                && !located
                && let Some(line) = as_position(map)
            {
                map.insert("line".to_string(), Value::from(line.saturating_sub(offset)));
            }
            for (key, child) in map.iter_mut() {
                let child_shift = if located {
                    shift && key == "originSelectionRange"
                } else {
                    shift
                };
                rewrite_inbound(child, shadow_uri, target, offset, child_shift);
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_inbound(item, shadow_uri, target, offset, shift);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHADOW: &str = "file:///nb.ipynb.py";

    #[test]
    fn test_outbound_rewrite_shifts_positions_only_with_offset() {
        let mut params = json!({
            "textDocument": { "uri": "untitled:edit" },
            "position": { "line": 2, "character": 5 },
            "context": { "triggerKind": 1 }
        });
        rewrite_outbound(&mut params, SHADOW, 10);
        assert_eq!(
            params,
            json!({
                "textDocument": { "uri": SHADOW },
                "position": { "line": 12, "character": 5 },
                "context": { "triggerKind": 1 }
            })
        );
    }

    #[test]
    fn test_inbound_rewrite_is_deep_and_keeps_foreign_locations() {
        let mut result = json!({
            "items": [
                { "uri": SHADOW, "range": { "start": { "line": 14, "character": 0 }, "end": { "line": 14, "character": 3 } } },
                { "uri": "file:///lib.py", "range": { "start": { "line": 1, "character": 0 }, "end": { "line": 1, "character": 3 } } }
            ],
            "range": { "start": { "line": 11, "character": 2 }, "end": { "line": 11, "character": 4 } }
        });
        rewrite_inbound(&mut result, SHADOW, "ipynb://nb.ipynb", 10, true);
        assert_eq!(result["items"][0]["uri"], "ipynb://nb.ipynb");
        assert_eq!(result["items"][0]["range"]["start"]["line"], 14);
        assert_eq!(result["items"][1]["uri"], "file:///lib.py");
        assert_eq!(result["range"]["start"]["line"], 1);
    }

    #[test]
    fn test_inbound_rewrite_location_link_origin_range() {
        let mut result = json!([{
            "targetUri": SHADOW,
            "targetRange": { "start": { "line": 3, "character": 0 }, "end": { "line": 3, "character": 1 } },
            "originSelectionRange": { "start": { "line": 12, "character": 0 }, "end": { "line": 12, "character": 1 } }
        }]);
        rewrite_inbound(&mut result, SHADOW, "file:///nb.ipynb", 10, true);
        assert_eq!(result[0]["targetUri"], "file:///nb.ipynb");
        assert_eq!(result[0]["targetRange"]["start"]["line"], 3);
        assert_eq!(result[0]["originSelectionRange"]["start"]["line"], 2);
    }

    #[test]
    fn test_workspace_edit_keys_are_renamed() {
        let mut result = json!({ "changes": { SHADOW: [] } });
        rewrite_inbound(&mut result, SHADOW, "ipynb://nb.ipynb", 0, false);
        assert_eq!(result, json!({ "changes": { "ipynb://nb.ipynb": [] } }));
    }
}
