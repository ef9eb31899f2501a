//! # Tree configuration.
//!
//! Provides [`TreeConfig`], the explicit configuration struct for one
//! supervision tree: restart strategy, restart-intensity limits, the
//! never-halt toggle and the event-bus capacity. Defaults are applied at
//! construction and the struct is never mutated afterwards.
//!
//! ## Sentinel values
//! - `max_restarts = -1` → restart-rate limiting disabled
//! - `bus_capacity` is clamped to a minimum of 1 by the bus

use std::time::Duration;

use crate::error::TreeError;
use crate::policies::Strategy;

/// Configuration for a supervision tree.
///
/// ## Field semantics
/// - `strategy`: sibling scope applied on every child failure
/// - `max_restarts` / `restart_window`: restart intensity; more than
///   `max_restarts` restarts within the trailing `restart_window` halts the
///   tree with `TooManyFailures`; `-1` disables the limit
/// - `never_halt`: keep the tree alive when it runs out of children, so
///   dynamically added replacements can revive it
/// - `bus_capacity`: ring-buffer size of the event broadcast channel
#[derive(Clone, Copy, Debug)]
pub struct TreeConfig {
    /// Restart strategy applied when a child fails.
    pub strategy: Strategy,

    /// Maximum number of restarts tolerated within `restart_window`.
    ///
    /// `-1` disables the limit; `0` means any restart halts the tree.
    pub max_restarts: i32,

    /// Trailing window for restart-intensity accounting.
    pub restart_window: Duration,

    /// Suppress `NoChildProcessLeft`: a tree whose children are all done
    /// keeps waiting for dynamically added work instead of halting.
    pub never_halt: bool,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events
    /// observe `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl TreeConfig {
    /// Validates the configuration.
    pub(crate) fn validate(&self) -> Result<(), TreeError> {
        if self.max_restarts < -1 {
            return Err(TreeError::InvalidConfiguration);
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    /// Default configuration:
    ///
    /// - `strategy = Strategy::OneForOne` (failures stay local)
    /// - `max_restarts = 1`, `restart_window = 5s`
    /// - `never_halt = false`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            max_restarts: 1,
            restart_window: Duration::from_secs(5),
            never_halt: false,
            bus_capacity: 1024,
        }
    }
}
