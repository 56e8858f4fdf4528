//! Proxy errors.

use notebook_core::NotebookError;
use thiserror::Error;

/// Errors returned by [`ProtocolProxy`](crate::ProtocolProxy) and the appliers.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The request would edit across cell boundaries or outside code cells.
    ///
    /// `message` is meant to be shown to the user as is.
    #[error("{message}")]
    CrossBoundary {
        /// User-facing explanation.
        message: String,
    },
    /// The originating surface is unknown or no longer live.
    #[error("surface is not live")]
    SurfaceNotLive,
    /// The notebook is not registered with the proxy (no `didOpen` sent).
    #[error("notebook is not open on the language server")]
    NotRegistered,
    /// A request or response did not have the shape its method requires.
    #[error("malformed {method} message")]
    Malformed {
        /// Request method.
        method: String,
    },
    /// The underlying notebook operation failed.
    #[error(transparent)]
    Notebook(#[from] NotebookError),
}

impl ProxyError {
    pub(crate) fn cross_boundary(message: impl Into<String>) -> Self {
        Self::CrossBoundary {
            message: message.into(),
        }
    }
}
