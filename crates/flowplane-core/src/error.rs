//! ---
//! fp_section: "02-workflow-lifecycle"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Caller-visible error taxonomy for the lifecycle manager."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collab::{EngineError, StoreError};

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Classification attached to every [`ManagerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NotFound,
    InvalidArgument,
    Unknown,
    /// The engine's watch feed failed while a stream was being delivered.
    Unavailable,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::Unknown => "unknown",
            ErrorCode::Unavailable => "unavailable",
        };
        f.write_str(label)
    }
}

/// Errors surfaced by the lifecycle manager. Raw collaborator errors never
/// cross this boundary except as the source of [`ManagerError::Stream`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManagerError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Unknown(String),
    /// Terminal engine error observed on an open watch; ends the stream.
    #[error("workflow stream interrupted: {0}")]
    Stream(#[source] EngineError),
}

impl ManagerError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ManagerError::NotFound(_) => ErrorCode::NotFound,
            ManagerError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ManagerError::Unknown(_) => ErrorCode::Unknown,
            ManagerError::Stream(_) => ErrorCode::Unavailable,
        }
    }

    /// Wrap a persistence failure as a user error prefixed with the resource kind.
    pub fn user_wrap(kind: &str, err: StoreError) -> Self {
        let message = format!("{}: {}", kind, err);
        match err {
            StoreError::Conflict(_) | StoreError::Archived(_) | StoreError::Invalid(_) => {
                Self::InvalidArgument(message)
            }
            StoreError::Backend(_) => Self::Unknown(message),
        }
    }

    /// Classify an engine failure for a request about `what`.
    pub fn from_engine(what: &str, err: EngineError) -> Self {
        match err {
            EngineError::NotFound { .. } => Self::NotFound(format!("{} not found.", what)),
            EngineError::InvalidManifest(reason) => Self::InvalidArgument(reason),
            EngineError::InvalidSelector(selector) => {
                Self::InvalidArgument(format!("Invalid label selector '{}'.", selector))
            }
            other => Self::Unknown(format!("{}: {}", what, other)),
        }
    }
}
