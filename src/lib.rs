//! # treevisor
//!
//! **Treevisor** is a process supervision tree for tokio: it starts,
//! monitors, restarts and gracefully stops a set of independently failing
//! units of work, applying Erlang/OTP-style restart semantics.
//!
//! It exists to give long-running service daemons self-healing behavior:
//! when a child task crashes or returns an error, the tree consults the
//! declared policy and decides whether to restart it alone, restart its siblings
//! too, or escalate by shutting the whole tree down.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  ChildSpec   │   │  ChildSpec   │   │  ChildSpec   │
//!     │ (child #1)   │   │ (child #2)   │   │ (nested Tree)│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Tree (supervision orchestrator)                                  │
//! │  - ordered children map (declaration order, reverse-order drain)  │
//! │  - Strategy (one_for_one / one_for_all / rest_for_one / simple)   │
//! │  - Restarter (sliding-window restart intensity)                   │
//! │  - Bus (broadcast events) + SubscriberSet (fan-out)               │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────┐       ┌──────────┐       ┌──────────┐
//!   │child task│       │child task│       │child task│   (one per running
//!   └────┬─────┘       └────┬─────┘       └────┬─────┘    incarnation)
//!        │ failure notes    │                  │
//!        └──────────────────┴──────────────────┘
//!                           ▼
//!              control loop (single consumer)
//!         strategy → restart budget → relaunch / halt
//! ```
//!
//! ### Control loop
//! ```text
//! Tree::start(signal)
//!
//! loop {
//!   ├─► start phase: launch every child that is neither Running nor Done,
//!   │   behind one start gate (no partial-start races between siblings);
//!   │   nothing running && anything ever ran → NoChildProcessLeft
//!   │
//!   └─► wait phase: block until
//!        - root signal canceled → drain in reverse order, return
//!        - topology changed (add/terminate/delete) → re-evaluate
//!        - failure note → strategy + restart budget
//!                         over budget → TooManyFailures, cancel tree
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                         | Key types / traits                  |
//! |-------------------|---------------------------------------------------------------------|-------------------------------------|
//! | **Children**      | Define supervised units as trait objects, closures or nested trees. | [`Child`], [`ChildFn`], [`ChildSpec`], [`ChildProcess`] |
//! | **Policies**      | Restart/shutdown/strategy semantics per child and per tree.         | [`Restart`], [`Shutdown`], [`Strategy`] |
//! | **Supervision**   | The tree itself: start/wait loop, control API, graceful shutdown.   | [`Tree`], [`TreeBuilder`], [`TreeConfig`] |
//! | **Errors**        | Typed errors for the tree and for child terminations.               | [`TreeError`], [`ChildError`]       |
//! | **Observability** | Lifecycle events with fan-out to subscribers.                       | [`Event`], [`EventKind`], [`Bus`], [`Subscribe`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use treevisor::{ChildError, ChildSpec, Restart, Shutdown, Strategy, Tree, TreeConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), treevisor::TreeError> {
//!     let cfg = TreeConfig {
//!         strategy: Strategy::OneForOne,
//!         max_restarts: 5,
//!         restart_window: Duration::from_secs(10),
//!         ..TreeConfig::default()
//!     };
//!
//!     let tree = Tree::builder(cfg)
//!         .with_child(
//!             ChildSpec::from_fn("heartbeat", |signal: CancellationToken| async move {
//!                 loop {
//!                     if signal.is_cancelled() {
//!                         return Ok::<_, ChildError>(());
//!                     }
//!                     // do work...
//!                     tokio::time::sleep(Duration::from_millis(250)).await;
//!                 }
//!             })
//!             .with_restart(Restart::Permanent)
//!             .with_shutdown(Shutdown::Timeout(Duration::from_secs(5))),
//!         )
//!         .build();
//!
//!     // Blocks until the signal is canceled or the tree gives up.
//!     tree.start(CancellationToken::new()).await
//! }
//! ```

mod children;
mod core;
mod error;
mod events;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use children::{Child, ChildFn, ChildProcess, ChildRef, ChildSpec};
pub use crate::core::{ChildStatus, Lifecycle, Tree, TreeBuilder, TreeConfig};
pub use error::{ChildError, TreeError};
pub use events::{Bus, Event, EventKind};
pub use policies::{Restart, Shutdown, Strategy};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
