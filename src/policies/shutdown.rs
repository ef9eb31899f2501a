//! # Shutdown policies: how long to wait for a child to stop.
//!
//! [`Shutdown`] bounds the time the tree spends waiting for a child to exit
//! after its cancellation token fires.
//!
//! - [`Shutdown::Indefinite`] the stop callback waits for the child's exit
//!   with no deadline, and the child's task is tracked: `Tree::start` joins
//!   it on final drain.
//! - [`Shutdown::Timeout`] the stop callback waits at most the given
//!   deadline; past it the task is **detached**: the tree stops waiting,
//!   publishes [`EventKind::ShutdownTimedOut`](crate::EventKind), and moves
//!   on. Detached tasks are fire-and-forget and are never joined: an
//!   accepted, observable resource leak for children that refuse to
//!   terminate in time, trading the cleanliness of one stuck child for the
//!   liveness of the rest of the tree.
//!
//! A task cannot be killed, only asked to stop; the deadline is the only
//! defense against a child that ignores its token.

use std::time::Duration;

/// Policy bounding the wait for a child's cooperative exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Shutdown {
    /// Wait for the child's exit with no deadline; the task is tracked and
    /// joined when the tree drains.
    #[default]
    Indefinite,
    /// Wait at most this long, then detach the task and move on.
    Timeout(Duration),
}

impl Shutdown {
    /// The stop deadline, if any.
    pub fn deadline(&self) -> Option<Duration> {
        match self {
            Shutdown::Indefinite => None,
            Shutdown::Timeout(d) => Some(*d),
        }
    }

    /// Whether children under this policy run as detachable tasks.
    ///
    /// Detachable tasks are not joined on final drain; only their bounded
    /// stop wait is honored.
    pub fn is_detachable(&self) -> bool {
        matches!(self, Shutdown::Timeout(_))
    }
}
