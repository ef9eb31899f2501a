//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! Enabled via the `logging` feature; primarily useful for development,
//! debugging, and the demo programs.
//!
//! ## Output format
//! ```text
//! [started] child=ticker
//! [failed] child=ticker reason="execution failed: connection refused"
//! [strategy] child=ticker reason=one_for_all
//! [shutdown-timeout] child=stuck
//! [tree-draining]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Simple stdout logging subscriber.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let child = e.child.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ChildStarted => println!("[started] child={child}"),
            EventKind::ChildDone => println!("[done] child={child}"),
            EventKind::ChildFailed => {
                println!("[failed] child={child} reason={:?}", e.reason)
            }
            EventKind::ChildStopped => println!("[stopped] child={child}"),
            EventKind::ShutdownTimedOut => println!("[shutdown-timeout] child={child}"),
            EventKind::StrategyApplied => {
                println!("[strategy] child={child} reason={:?}", e.reason)
            }
            EventKind::TooManyRestarts => println!("[too-many-restarts]"),
            EventKind::NoChildLeft => println!("[no-child-left]"),
            EventKind::ChildAdded => println!("[added] child={child}"),
            EventKind::ChildTerminated => println!("[terminated] child={child}"),
            EventKind::ChildRemoved => println!("[removed] child={child}"),
            EventKind::TreeDraining => println!("[tree-draining]"),
            EventKind::TreeDrained => println!("[tree-drained]"),
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
