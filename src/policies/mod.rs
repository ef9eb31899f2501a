//! Restart, shutdown and sibling-strategy policies.
//!
//! This module groups the declarative knobs that control how the tree reacts
//! when a child terminates.
//!
//! ## Contents
//! - [`Restart`] whether a terminated child is relaunched
//!   (permanent / transient / temporary)
//! - [`Shutdown`] how long the tree waits for a child to stop
//!   (indefinite / deadline-bounded + detach)
//! - [`Strategy`] which siblings are affected by one child's failure
//!   (one-for-one / one-for-all / rest-for-one / simple-one-for-one)
//!
//! ## Quick wiring
//! ```text
//! ChildSpec { restart: Restart, shutdown: Shutdown }
//!      └─► core::tree uses:
//!           - restart to decide Done vs Failed after each termination
//!           - shutdown to bound the stop callback and pick tracked/detached
//! TreeConfig { strategy: Strategy }
//!      └─► core::tree applies strategy.affected(..) on every failure
//! ```
//!
//! ## Defaults
//! - `Restart::Permanent` (a supervised daemon child should come back).
//! - `Shutdown::Indefinite` (wait for the child, however long it takes).
//! - `Strategy::OneForOne` (failures stay local).

mod restart;
mod shutdown;
mod strategy;

pub use restart::Restart;
pub use shutdown::Shutdown;
pub use strategy::Strategy;
