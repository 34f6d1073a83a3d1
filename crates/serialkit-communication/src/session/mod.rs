//! Session control
//!
//! [`SessionController`] is the synchronous state machine that owns the
//! channel, counters, display log and buffers. [`SessionRuntime`] is the
//! single async loop that feeds it commands, timer ticks, read polls and
//! monitor cycles one at a time.

pub mod controller;
pub mod runtime;

pub use controller::SessionController;
pub use runtime::{RuntimeConfig, SessionCommand, SessionHandle, SessionRuntime};

use serialkit_core::{ConfigError, OpenError, ReadError, WriteError};
use thiserror::Error;

/// Errors the session surfaces to the user
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The port could not be opened
    #[error(transparent)]
    Open(#[from] OpenError),

    /// A send failed
    #[error(transparent)]
    Write(#[from] WriteError),

    /// The open device stopped responding to polls
    #[error(transparent)]
    Read(#[from] ReadError),

    /// A setting was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Port selection cannot change while the channel is open
    #[error("Close {port} before selecting another port")]
    SelectionLocked {
        /// The port currently open.
        port: String,
    },

    /// The session loop is no longer running
    #[error("Session stopped")]
    Stopped,
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
