//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the tree and its child
//! tasks.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the tree's control loop (strategy, budget, drain,
//!   control API) and every child task (start/termination outcomes, detach
//!   on shutdown timeout).
//! - **Consumers**: the tree's subscriber listener (fans out to
//!   [`SubscriberSet`](crate::subscribers::SubscriberSet)) and any direct
//!   [`Bus::subscribe`] receiver (tests use this to assert on event order).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
