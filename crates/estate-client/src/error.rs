use crate::config::ConfigError;
use crate::outcome::{ActionFailure, FailureKind};
use crate::session::StoreError;
use crate::telemetry::TelemetryError;
use reqwest::StatusCode;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Client(ClientError),
    Session(StoreError),
    Action(ActionFailure),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Client(err) => write!(f, "client error: {}", err),
            AppError::Session(err) => write!(f, "session error: {}", err),
            AppError::Action(failure) => write!(f, "{} failure: {}", failure.kind, failure),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Client(err) => Some(err),
            AppError::Session(err) => Some(err),
            AppError::Action(failure) => Some(failure),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ClientError> for AppError {
    fn from(value: ClientError) -> Self {
        Self::Client(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Session(value)
    }
}

impl From<ActionFailure> for AppError {
    fn from(value: ActionFailure) -> Self {
        Self::Action(value)
    }
}

/// Everything that can go wrong inside one orchestrated call.
///
/// Callers never see this type directly: [`ClientError::into_failure`] folds it
/// into the [`ActionFailure`] returned at the operation boundary.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("unable to read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("cannot build endpoint url: {0}")]
    Endpoint(String),
    #[error(
        "server rejected request{}: {}",
        .status.map(|status| format!(" ({status})")).unwrap_or_default(),
        .message.as_deref().unwrap_or("no message")
    )]
    Server {
        status: Option<StatusCode>,
        message: Option<String>,
    },
    #[error("malformed response body: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Validation(_) | ClientError::File { .. } => FailureKind::Validation,
            ClientError::Transport(_) | ClientError::Endpoint(_) => FailureKind::Transport,
            ClientError::Server { .. } => FailureKind::Server,
            ClientError::Parse(_) | ClientError::UnexpectedBody(_) => FailureKind::Parse,
            ClientError::Store(_) => FailureKind::Storage,
        }
    }

    /// Fold into a boundary failure, keeping validation text and any
    /// server-supplied message; everything else reads `fallback`.
    pub fn into_failure(self, fallback: &str) -> ActionFailure {
        let kind = self.kind();
        let message = match self {
            ClientError::Validation(message) => message,
            ClientError::File { path, .. } => format!("Unable to read {}", path.display()),
            ClientError::Server {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message,
            _ => fallback.to_string(),
        };
        ActionFailure::new(kind, message)
    }

    /// Like [`ClientError::into_failure`] but never surfaces server text.
    pub fn into_generic_failure(self, fallback: &str) -> ActionFailure {
        match self {
            ClientError::Validation(message) => ActionFailure::validation(message),
            other => ActionFailure::new(other.kind(), fallback),
        }
    }
}
