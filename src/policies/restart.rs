//! # Restart policies for supervised children.
//!
//! [`Restart`] determines whether a child is relaunched after it terminates,
//! and whether that termination is charged against the tree's restart budget.
//!
//! - [`Restart::Permanent`] the child is always relaunched, even after a
//!   normal return.
//! - [`Restart::Transient`] the child is relaunched only when it terminated
//!   with an error.
//! - [`Restart::Temporary`] the child is never relaunched; its terminations
//!   never count against the restart budget and are never logged as faults.
//!
//! ## Choosing the right policy
//!
//! **Long-running daemons** (HTTP server, queue consumer):
//! ```text
//! Restart::Permanent        → any exit brings the child back
//! ```
//!
//! **Jobs that should retry on error only**:
//! ```text
//! Restart::Transient        → normal return ends the child for good
//! ```
//!
//! **One-shot, best-effort work**:
//! ```text
//! Restart::Temporary        → run once, outcome ignored by the tree
//! ```
//!
//! Note that a Permanent child whose body returns immediately produces a
//! tight relaunch loop; catching that is the restart-intensity limiter's
//! job, not this policy's.

use crate::error::ChildError;

/// Policy controlling whether a terminated child is relaunched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Restart {
    /// Always relaunch, regardless of how the child terminated.
    #[default]
    Permanent,
    /// Relaunch only when the child terminated with an error.
    ///
    /// [`ChildError::Canceled`] counts as an error here: a Transient child
    /// stopped by a sibling strategy must relaunch with its cohort.
    Transient,
    /// Never relaunch. Terminations are always treated as success and are
    /// exempt from restart-intensity accounting.
    Temporary,
}

impl Restart {
    /// Decides whether a termination leads to a relaunch.
    ///
    /// `err` is the termination cause of this incarnation only (`None` for a
    /// normal return). The policy sees no retry history; sliding-window
    /// accounting belongs to the restart bookkeeper.
    pub fn should_restart(&self, err: Option<&ChildError>) -> bool {
        match self {
            Restart::Permanent => true,
            Restart::Transient => err.is_some(),
            Restart::Temporary => false,
        }
    }

    /// Whether a termination under this policy is a fault worth reporting.
    ///
    /// Requires an actual failure ([`ChildError::Canceled`] is a cooperative
    /// exit, not a fault), and Temporary children are always considered
    /// successful whether they fail or not.
    pub fn counts_as_fault(&self, err: Option<&ChildError>) -> bool {
        err.is_some_and(|e| e.is_failure()) && !matches!(self, Restart::Temporary)
    }

    /// True for [`Restart::Temporary`].
    pub fn is_temporary(&self) -> bool {
        matches!(self, Restart::Temporary)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Restart::Permanent => "permanent",
            Restart::Transient => "transient",
            Restart::Temporary => "temporary",
        }
    }
}
