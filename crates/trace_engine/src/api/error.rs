//! Engine-level errors
//!
//! Every engine call is checked: each error names the operation that failed
//! so a driver can fail fast with a useful message instead of rendering
//! from silently corrupt state.

use thiserror::Error;

/// Errors reported by engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// The device could not start; carries the status code the process
    /// should exit with
    #[error("device initialization failed: {reason} (code {code})")]
    InitFailed {
        /// Nonzero status code suitable for a process exit
        code: i32,
        /// Human-readable failure description
        reason: String,
    },

    /// An object constructor was given a type name the device does not know
    #[error("{operation}: unknown type \"{type_name}\"")]
    UnknownType {
        /// The failing operation
        operation: &'static str,
        /// The rejected type name
        type_name: String,
    },

    /// A parameter value was rejected at commit
    #[error("{operation}: parameter \"{name}\": {reason}")]
    InvalidParameter {
        /// The failing operation
        operation: &'static str,
        /// Parameter slot name
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A required parameter was never set
    #[error("{operation}: required parameter \"{name}\" is not set")]
    MissingParameter {
        /// The failing operation
        operation: &'static str,
        /// Parameter slot name
        name: &'static str,
    },

    /// A parameter was set with a different type than the slot expects
    #[error("{operation}: parameter \"{name}\" expects {expected}")]
    TypeMismatch {
        /// The failing operation
        operation: &'static str,
        /// Parameter slot name
        name: String,
        /// The expected type
        expected: &'static str,
    },

    /// An object was consumed before being committed
    #[error("{operation}: {object} has not been committed")]
    NotCommitted {
        /// The failing operation
        operation: &'static str,
        /// Kind of the uncommitted object
        object: &'static str,
    },

    /// The handle refers to an object that no longer exists
    #[error("{operation}: handle refers to a released object")]
    StaleHandle {
        /// The failing operation
        operation: &'static str,
    },

    /// A mutating operation ran while a framebuffer was mapped
    #[error("{operation}: a framebuffer is currently mapped")]
    FrameBufferMapped {
        /// The failing operation
        operation: &'static str,
    },

    /// The device has been shut down; no further calls are legal
    #[error("{operation}: device has been shut down")]
    Shutdown {
        /// The failing operation
        operation: &'static str,
    },

    /// Invariant violation inside the device
    #[error("{operation}: internal error: {reason}")]
    Internal {
        /// The failing operation
        operation: &'static str,
        /// Invariant description
        reason: String,
    },
}

impl EngineError {
    /// Status code for a process exiting on this error. Initialization
    /// failures propagate the device's own code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InitFailed { code, .. } => *code,
            _ => 1,
        }
    }
}
