//! # Runtime events emitted by the tree and its child tasks.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Child lifecycle**: launch and termination outcomes
//! - **Supervision**: strategy application, restart-budget overflow,
//!   nothing-left-to-supervise
//! - **Control API**: add / terminate / delete confirmations
//! - **Tree lifecycle**: drain progress
//!
//! Every restart, every strategy application and every detach-on-timeout is
//! published here; none of them aborts the process.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Child lifecycle ===
    /// Child began executing its body (after the start gate opened).
    ///
    /// Sets: `child`.
    ChildStarted,

    /// Child terminated and will not be relaunched (normal return, or any
    /// termination under a Temporary policy).
    ///
    /// Sets: `child`.
    ChildDone,

    /// Child terminated with an actual fault (error under Permanent or
    /// Transient policy).
    ///
    /// Sets: `child`, `reason`.
    ChildFailed,

    /// A stopped child exited within its shutdown bound.
    ///
    /// Sets: `child`.
    ChildStopped,

    /// A stopped child exceeded its shutdown bound; its task was detached
    /// and will never be joined.
    ///
    /// Sets: `child`.
    ShutdownTimedOut,

    // === Supervision ===
    /// A restart strategy was applied in response to a child failure.
    ///
    /// Sets: `child` (the failed child), `reason` (strategy label).
    StrategyApplied,

    /// The restart budget was exceeded; the tree is halting with
    /// `TooManyFailures`.
    TooManyRestarts,

    /// No child is left running and at least one ever started; the tree is
    /// halting with `NoChildProcessLeft` (suppressed by `never_halt`).
    NoChildLeft,

    // === Control API ===
    /// A child was registered (at build time or dynamically).
    ///
    /// Sets: `child`.
    ChildAdded,

    /// A child was deliberately terminated via the control API.
    ///
    /// Sets: `child`.
    ChildTerminated,

    /// A child was removed from the tree entirely.
    ///
    /// Sets: `child`.
    ChildRemoved,

    // === Tree lifecycle ===
    /// The tree began stopping its children in reverse declaration order.
    TreeDraining,

    /// The drain completed; the tree is permanently halted.
    TreeDrained,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the child, if applicable.
    pub child: Option<Arc<str>>,
    /// Human-readable reason (error messages, strategy labels).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            child: None,
            reason: None,
        }
    }

    /// Attaches a child name.
    #[inline]
    pub fn with_child(mut self, child: impl Into<Arc<str>>) -> Self {
        self.child = Some(child.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
