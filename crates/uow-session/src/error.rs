//! Error types for the session crate.

use std::fmt;

use uow_mapper::MapperError;

use crate::state::StateKind;

/// A state transition requested of an object state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Update,
    Delete,
    Forget,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Update => "updated",
            Self::Delete => "deleted",
            Self::Forget => "forgotten",
        };
        f.write_str(verb)
    }
}

/// An operation was invoked on a state that does not support it.
///
/// This is a contract violation by the caller. The session never catches it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{state} cannot be {operation}")]
pub struct StateError {
    pub state: StateKind,
    pub operation: Operation,
}

impl StateError {
    pub fn new(state: StateKind, operation: Operation) -> Self {
        Self { state, operation }
    }
}

/// Errors that can occur during session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Illegal lifecycle transition.
    #[error(transparent)]
    State(#[from] StateError),

    /// The object's key is not tracked by this session.
    #[error("object not tracked: {0}")]
    NotTracked(String),

    /// The object's key is already tracked by this session.
    #[error("object already tracked: {0}")]
    AlreadyTracked(String),

    /// The key was deleted in this session and re-insertion is disabled.
    #[error("object was deleted in this session: {0}")]
    Retired(String),

    /// The mapper failed to key, dump, or write an object.
    #[error("mapper error: {0}")]
    Mapper(#[from] MapperError),

    /// Session configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias for session results.
pub type SessionResult<T> = Result<T, SessionError>;
