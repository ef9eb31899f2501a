//! Error types used by the treevisor runtime and child processes.
//!
//! This module defines two main error enums:
//!
//! - [`TreeError`] — errors raised by the supervision tree itself.
//! - [`ChildError`] — termination causes reported by child processes.
//!
//! `TreeError` covers three tiers with different blast radii:
//!
//! - **Configuration errors** (`InvalidConfiguration`, `InvalidChildProcess`)
//!   are caller mistakes, surfaced by [`Tree::start`](crate::Tree::start) or
//!   the control API and never retried.
//! - **Runtime control errors** (`UnknownProcess`, `ProcessNotRunning`,
//!   `TreeNotRunning`, `ShutdownAborted`) are returned synchronously from the
//!   control API and do not affect tree health.
//! - **Supervision-fatal errors** (`TooManyFailures`, `NoChildProcessLeft`)
//!   terminate the whole tree: they are recorded once, the root token is
//!   canceled, and `start` returns them after draining.

use thiserror::Error;

/// # Errors produced by the supervision tree.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// Tree was built with invalid settings (e.g. `max_restarts < -1`).
    #[error("invalid tree configuration")]
    InvalidConfiguration,

    /// A child process handed to the tree was rejected at admission
    /// (empty name, or a nested tree that already halted).
    #[error("invalid child process")]
    InvalidChildProcess,

    /// Runtime operation referenced a child that is not registered.
    #[error("unknown process")]
    UnknownProcess,

    /// Caller tried to terminate a child that is not running.
    #[error("process not running")]
    ProcessNotRunning,

    /// The tree is halted (or was never started) and no longer accepts
    /// control operations.
    #[error("tree is not running")]
    TreeNotRunning,

    /// One of the children failed too often within the configured restart
    /// window and the tree decided to fully stop.
    #[error("too many failures")]
    TooManyFailures,

    /// Every child is done and there is nothing left to supervise.
    #[error("no child process left")]
    NoChildProcessLeft,

    /// A graceful shutdown was aborted by the caller's cancellation token
    /// before the drain completed.
    #[error("graceful shutdown aborted")]
    ShutdownAborted,
}

impl TreeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use treevisor::TreeError;
    ///
    /// assert_eq!(TreeError::TooManyFailures.as_label(), "tree_too_many_failures");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TreeError::InvalidConfiguration => "tree_invalid_configuration",
            TreeError::InvalidChildProcess => "tree_invalid_child_process",
            TreeError::UnknownProcess => "tree_unknown_process",
            TreeError::ProcessNotRunning => "tree_process_not_running",
            TreeError::TreeNotRunning => "tree_not_running",
            TreeError::TooManyFailures => "tree_too_many_failures",
            TreeError::NoChildProcessLeft => "tree_no_child_process_left",
            TreeError::ShutdownAborted => "tree_shutdown_aborted",
        }
    }

    /// True for the supervision-fatal tier: the errors that halt the whole
    /// tree and are returned from [`Tree::start`](crate::Tree::start).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TreeError::TooManyFailures | TreeError::NoChildProcessLeft
        )
    }
}

/// # Termination causes reported by child processes.
///
/// A child's `start` future resolves to `Result<(), ChildError>`. `Ok(())`
/// and [`ChildError::Canceled`] are "not a failure": they race the shutdown
/// signal and must not trip the restart budget on their own.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ChildError {
    /// Child execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Child observed its cancellation signal and exited early.
    #[error("child canceled")]
    Canceled,

    /// Child body panicked; the panic was caught and converted so that one
    /// misbehaving child cannot take down the control loop.
    #[error("child panicked: {info}")]
    Panicked {
        /// Rendered panic payload.
        info: String,
    },
}

impl ChildError {
    /// Shorthand for [`ChildError::Fail`] from anything displayable.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        ChildError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChildError::Fail { .. } => "child_failed",
            ChildError::Canceled => "child_canceled",
            ChildError::Panicked { .. } => "child_panicked",
        }
    }

    /// Whether this termination counts as an actual failure.
    ///
    /// [`ChildError::Canceled`] is a cooperative exit, not a failure.
    ///
    /// # Example
    /// ```
    /// use treevisor::ChildError;
    ///
    /// assert!(ChildError::fail("boom").is_failure());
    /// assert!(!ChildError::Canceled.is_failure());
    /// ```
    pub fn is_failure(&self) -> bool {
        !matches!(self, ChildError::Canceled)
    }
}
