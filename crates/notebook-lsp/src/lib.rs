#![warn(missing_docs)]
//! `notebook-lsp` - language-server support for `notebook-core`.
//!
//! A language server only understands plain source files. This crate lets it work on a
//! notebook anyway: it talks to the server about each notebook's Shadow document (code lines
//! only, line-aligned with the Facade) and translates everything that comes back.
//!
//! - [`ProtocolProxy`] rewrites request/response identifiers and positions, keeps the Shadow
//!   in sync on the server (`didOpen`/`didChange`/`didClose`), and intercepts rename and
//!   formatting so their edits are applied cell by cell.
//! - [`DiagnosticsPublisher`] re-targets Shadow diagnostics at the Facade and the open Edit
//!   Surface.
//! - [`lsp_sync`], [`lsp_uri`], [`lsp_text_edits`], [`lsp_locations`] and [`lsp_events`] hold
//!   the small LSP data helpers the proxy is built on.
//!
//! The JSON-RPC transport belongs to the host.

pub mod appliers;
pub mod config;
pub mod context;
pub mod debounce;
pub mod diagnostics;
pub mod error;
pub mod lsp_events;
pub mod lsp_locations;
pub mod lsp_sync;
pub mod lsp_text_edits;
pub mod lsp_uri;
pub mod proxy;
pub mod shadow_sync;

pub use appliers::{apply_cell_format, apply_rename, cell_content_range, format_target};
pub use config::ProxyConfig;
pub use context::BufferContext;
pub use debounce::Debounce;
pub use diagnostics::{DiagnosticsPublisher, DiagnosticsTarget, PublishedDiagnostics};
pub use error::ProxyError;
pub use lsp_events::{
    LspDiagnostic, LspDiagnosticSeverity, LspMessageType, LspNotification,
    LspPublishDiagnosticsParams, LspResponse, LspResponseError, UserMessage,
};
pub use lsp_locations::{LspLocation, NavigationTarget, locations_from_value, navigation_targets};
pub use lsp_sync::{LspCoordinateConverter, LspPosition, LspRange, ShadowMirror, TextChange};
pub use lsp_text_edits::{
    LspTextEdit, facade_edits, text_edits_from_value, workspace_edit_text_edits_for_uri,
    workspace_edit_uris, workspace_edit_versions_for_uri,
};
pub use lsp_uri::{
    DocumentUris, file_uri_to_path, notebook_file_name, path_to_file_uri, percent_decode_path,
    percent_encode_path, synthetic_file_name, synthetic_path, synthetic_uri,
};
pub use proxy::{InboundOutcome, NotificationOutcome, OutgoingRequest, ProtocolProxy};
pub use shadow_sync::{OutgoingNotification, ShadowDocument};
