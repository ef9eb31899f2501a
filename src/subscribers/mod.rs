//! # Event subscribers for the treevisor runtime.
//!
//! This module provides the [`Subscribe`] trait and the fan-out machinery
//! that delivers runtime events to user code (logging, metrics, alerting).
//!
//! ## Architecture
//! ```text
//! Tree / child tasks ── publish(Event) ──► Bus ──► subscriber listener
//!                                                        │
//!                                                  SubscriberSet::emit
//!                                          ┌─────────────┼─────────────┐
//!                                          ▼             ▼             ▼
//!                                     [queue S1]    [queue S2]    [queue SN]
//!                                          │             │             │
//!                                     worker S1     worker S2     worker SN
//!                                          │             │             │
//!                                    s1.on_event    s2.on_event   sN.on_event
//! ```
//!
//! A slow subscriber only affects its own queue; overflow drops the event
//! for that subscriber alone, and panics inside a subscriber are caught.

mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
