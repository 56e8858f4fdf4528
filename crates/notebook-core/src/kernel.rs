//! Kernel bridge messages.
//!
//! The kernel bridge is an external process speaking newline-delimited JSON. Messages that
//! concern a cell carry the `cell_idx` the execution was submitted with; the engine hands out
//! that value as an [`ExecutionTicket`] and resolves it back to a [`CellId`](crate::CellId), so
//! events still land on the right cell after cells are moved or inserted above it.

use crate::cell::Output;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `user_expressions` key whose value the bridge reports back as a `namespace` event.
pub const NAMESPACE_EXPRESSION_KEY: &str = "__ns__";

/// Value sent to the bridge as `cell_idx` when queueing an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTicket(pub u64);

/// One message from the kernel bridge.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelEvent {
    /// The bridge started and is ready for commands.
    Ready,
    /// A kernel process was started.
    KernelStarted,
    /// Kernel busy/idle transitions, optionally tied to an execution.
    Status {
        /// `busy`, `idle` or `starting`.
        state: String,
        /// Ticket of the execution this status belongs to.
        #[serde(default)]
        cell_idx: Option<ExecutionTicket>,
    },
    /// The bridge accepted an execution request.
    ExecuteRequest {
        /// Ticket of the execution.
        #[serde(default)]
        cell_idx: Option<ExecutionTicket>,
        /// Kernel message id.
        #[serde(default)]
        msg_id: Option<String>,
    },
    /// Execution started with the given count.
    ExecuteInput {
        /// Ticket of the execution.
        #[serde(default)]
        cell_idx: Option<ExecutionTicket>,
        /// Execution count assigned by the kernel.
        #[serde(default)]
        execution_count: Option<u64>,
    },
    /// An output produced by an execution.
    Output {
        /// Ticket of the execution.
        #[serde(default)]
        cell_idx: Option<ExecutionTicket>,
        /// The output in persisted form.
        output: Output,
    },
    /// Namespace snapshot captured after an execution.
    Namespace {
        /// Ticket of the execution.
        #[serde(default)]
        cell_idx: Option<ExecutionTicket>,
        /// Printable namespace summary.
        namespace_repr: String,
    },
    /// Bridge-level failure.
    Error {
        /// Error text.
        error: String,
        /// Ticket of the execution, if the failure is tied to one.
        #[serde(default)]
        cell_idx: Option<ExecutionTicket>,
    },
    /// The kernel was interrupted; running executions stop.
    Interrupted,
    /// The kernel restarted; every pending execution is gone.
    Restarted,
    /// The kernel shut down.
    Shutdown,
    /// Any message type this engine does not act on.
    #[serde(other)]
    Unknown,
}

impl KernelEvent {
    /// Decode one line of bridge output.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }

    /// Execution ticket carried by this event, if any.
    pub fn ticket(&self) -> Option<ExecutionTicket> {
        match self {
            KernelEvent::Status { cell_idx, .. }
            | KernelEvent::ExecuteRequest { cell_idx, .. }
            | KernelEvent::ExecuteInput { cell_idx, .. }
            | KernelEvent::Output { cell_idx, .. }
            | KernelEvent::Namespace { cell_idx, .. }
            | KernelEvent::Error { cell_idx, .. } => *cell_idx,
            _ => None,
        }
    }
}

/// Command sent to the bridge to run a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteCommand {
    /// Always `execute`.
    pub action: &'static str,
    /// Code to run.
    pub code: String,
    /// Ticket echoed back on every related event.
    pub cell_idx: ExecutionTicket,
    /// Expressions evaluated after the code; only [`NAMESPACE_EXPRESSION_KEY`] is reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_expressions: Option<BTreeMap<String, String>>,
}

impl ExecuteCommand {
    /// Build an execute command.
    pub fn new(code: impl Into<String>, ticket: ExecutionTicket) -> Self {
        Self {
            action: "execute",
            code: code.into(),
            cell_idx: ticket,
            user_expressions: None,
        }
    }

    /// Ask the bridge to evaluate `expression` after the code and report it as the cell's
    /// namespace.
    pub fn with_namespace_capture(mut self, expression: impl Into<String>) -> Self {
        self.user_expressions
            .get_or_insert_with(BTreeMap::new)
            .insert(NAMESPACE_EXPRESSION_KEY.to_string(), expression.into());
        self
    }

    /// Encode as one line of bridge input (no trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// What applying a [`KernelEvent`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelOutcome {
    /// The event updated the given cell.
    Applied(crate::cell::CellId),
    /// The event referred to an execution or cell that no longer exists and was dropped.
    Discarded,
    /// Not tied to a cell; the host may want to show `message`.
    Notice(String),
    /// Nothing to do.
    Ignored,
}
