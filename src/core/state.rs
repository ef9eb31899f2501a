//! # Per-child runtime state machine.
//!
//! One [`ChildState`] exists per registered specification. It tracks the
//! child's lifecycle and holds the stop callback captured at launch time.
//!
//! ```text
//! NotStarted ──launch──► Running ──normal return / Temporary──► Done
//!                           │
//!                           ├─failure under Permanent/Transient─► Failed
//!                           ├─strategy/drain mark──────────────► Failed
//!                           └─terminate (forced)───────────────► Done
//!
//! Failed + restartable policy ──next start phase──► Running (fresh launch)
//! ```
//!
//! `Done` and `Failed` are terminal for one incarnation; the tree's start
//! phase treats `Failed` as relaunchable.
//!
//! The state is serialized behind its own mutex, independent of the tree-wide
//! lock: querying one child's status never blocks on another child's work.
//! The stop callback is an `FnOnce` and is *consumed* by whoever stops the
//! child, so a prior incarnation's callback can never fire twice or leak into
//! the next incarnation.

use std::sync::{Mutex, MutexGuard};

use futures::future::BoxFuture;

/// Lifecycle of one child incarnation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Registered but never launched.
    NotStarted,
    /// Currently executing; a stop callback is captured.
    Running,
    /// Terminated and will not be relaunched.
    Done,
    /// Terminated (or marked by a strategy/drain) and eligible for relaunch.
    Failed,
}

/// Future returned by a stop callback: cancels the incarnation's token and
/// waits, bounded by the shutdown policy, for its exit.
pub(crate) type StopFuture = BoxFuture<'static, ()>;

/// Stop callback captured at launch time; consumed on use.
pub(crate) type StopFn = Box<dyn FnOnce() -> StopFuture + Send>;

struct Inner {
    lifecycle: Lifecycle,
    stop: Option<StopFn>,
}

/// Mutable runtime state paired with one child specification.
pub(crate) struct ChildState {
    inner: Mutex<Inner>,
}

impl ChildState {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                lifecycle: Lifecycle::NotStarted,
                stop: None,
            }),
        }
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        // A panicking writer cannot leave the two fields out of sync; the
        // poisoned guard is still coherent.
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Current lifecycle snapshot.
    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.locked().lifecycle
    }

    /// Marks the child Running and captures its stop callback.
    pub(crate) fn set_running(&self, stop: StopFn) {
        let mut inner = self.locked();
        inner.lifecycle = Lifecycle::Running;
        inner.stop = Some(stop);
    }

    /// Records the outcome of an incarnation that just returned.
    ///
    /// - From `Running`: `Failed` when the restart policy wants a relaunch,
    ///   `Done` otherwise.
    /// - From `Failed` (a strategy or drain already marked this incarnation
    ///   while it was being stopped): the mark is kept so the cohort
    ///   relaunches together; Temporary children are the exception and
    ///   settle to `Done`, since they are never relaunched.
    /// - From `Done` (forced termination): sticky; a terminated child never
    ///   relaunches.
    pub(crate) fn settle(&self, restart: bool, temporary: bool) {
        let mut inner = self.locked();
        match inner.lifecycle {
            Lifecycle::Running => {
                inner.lifecycle = if restart {
                    Lifecycle::Failed
                } else {
                    Lifecycle::Done
                };
            }
            Lifecycle::Failed if temporary => inner.lifecycle = Lifecycle::Done,
            _ => {}
        }
        inner.stop = None;
    }

    /// Marks the child Failed (relaunchable). `Done` children are exempt:
    /// a finished Temporary or terminated child stays finished.
    pub(crate) fn set_failed(&self) {
        let mut inner = self.locked();
        if inner.lifecycle != Lifecycle::Done {
            inner.lifecycle = Lifecycle::Failed;
        }
    }

    /// Forced termination: marks a Running child Done and yields its stop
    /// callback. Returns `None` when the child is not running.
    pub(crate) fn force_done(&self) -> Option<StopFn> {
        let mut inner = self.locked();
        if inner.lifecycle != Lifecycle::Running {
            return None;
        }
        inner.lifecycle = Lifecycle::Done;
        inner.stop.take()
    }

    /// Takes the stop callback, if one is still captured.
    pub(crate) fn take_stop(&self) -> Option<StopFn> {
        self.locked().stop.take()
    }
}
