//! Error types and result definitions for Heapscope.
//!
//! The engine has no recoverable errors: every failure is fatal to the
//! analysis that raised it. The three variants distinguish *who* is at
//! fault:
//!
//! - [`HeapScopeError::Precondition`]: the caller misused the API
//! - [`HeapScopeError::Snapshot`]: the heap-walker collaborator failed or
//!   returned malformed data
//! - [`HeapScopeError::Invariant`]: an internal consistency check failed,
//!   which indicates a bug in the engine itself

use thiserror::Error;

/// The unified result type used throughout Heapscope.
pub type HeapScopeResult<T> = Result<T, HeapScopeError>;

/// Fatal error conditions raised by the analysis engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapScopeError {
    /// API misuse by the calling program.
    #[error("precondition violated: {message}")]
    Precondition {
        /// Description of the violated precondition.
        message: String,
    },

    /// The heap snapshot collaborator failed or produced malformed data.
    #[error("heap snapshot error: {message}")]
    Snapshot {
        /// Description of the collaborator failure.
        message: String,
    },

    /// Internal consistency check failed. Always a bug.
    #[error("internal invariant violated: {message}")]
    Invariant {
        /// Description of the broken invariant.
        message: String,
    },
}

impl HeapScopeError {
    /// Construct a [`HeapScopeError::Precondition`].
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Construct a [`HeapScopeError::Snapshot`].
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }

    /// Construct a [`HeapScopeError::Invariant`].
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}
