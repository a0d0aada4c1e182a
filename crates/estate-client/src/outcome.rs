//! Terminal result of one orchestrated call.
//!
//! Every client operation resolves to an [`Outcome`]: either the success payload
//! or an [`ActionFailure`] carrying a kind and a message fit for display. Callers
//! show the message and leave the user free to retry; nothing here is fatal.

use serde::Serialize;
use std::fmt;

/// `Success(payload)` or `Failure(reason)`.
pub type Outcome<T> = Result<T, ActionFailure>;

/// Where a failure originated. Callers should not need to branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A required field or file was missing; no request was sent.
    Validation,
    /// No response was received (connection, timeout).
    Transport,
    /// HTTP error status or a body that marks failure.
    Server,
    /// The response body could not be understood.
    Parse,
    /// The response was fine but the session record could not be saved.
    Storage,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Transport => "transport",
            FailureKind::Server => "server",
            FailureKind::Parse => "parse",
            FailureKind::Storage => "storage",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ActionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ActionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    pub fn is_validation(&self) -> bool {
        self.kind == FailureKind::Validation
    }
}
