//! Categorized error type shared across the engine, the config loader, and
//! the HTTP front-end, so callers can branch on error *kind* instead of
//! matching on message text.

use std::fmt;

/// Coarse category attached to every [`EngineError`].
///
/// Most variants never reach the HTTP layer directly - they surface inside
/// an action's `Result::err` and halt the plan (see the scheduler's sticky
/// error handling). The control API instead renders every error the same
/// way regardless of `code` (see §4.11), so this carries no status-code
/// mapping of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    TypeMismatch,
    IndexOutOfRange,
    InvalidArgument,
    PathTraversal,
    Io,
    Config,
    Internal,
}

/// An error with a stable [`ErrorCode`] and a human-readable message.
///
/// Cheap to construct and clone-free (owns its message); leaf components
/// (the variable store, the ops module, the action set) return this type
/// directly rather than `anyhow::Error` so the scheduler can inspect
/// `.code` instead of downcasting.
#[derive(Debug, thiserror::Error)]
#[error("{msg}")]
pub struct EngineError {
    pub code: ErrorCode,
    pub msg: String,
}

impl EngineError {
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, msg)
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::TypeMismatch, msg)
    }

    pub fn index_out_of_range(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::IndexOutOfRange, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, msg)
    }

    pub fn path_traversal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::PathTraversal, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Io, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Config, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::TypeMismatch => "type_mismatch",
            ErrorCode::IndexOutOfRange => "index_out_of_range",
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::PathTraversal => "path_traversal",
            ErrorCode::Io => "io",
            ErrorCode::Config => "config",
            ErrorCode::Internal => "internal",
        };
        write!(f, "{s}")
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
