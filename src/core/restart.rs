//! # Restart bookkeeper: sliding-window "failing too fast" detection.
//!
//! [`Restarter`] records the timestamp of every restartable termination and
//! judges whether the tree restarts too frequently: more than `intensity`
//! restarts within the trailing `period` means the whole tree must stop with
//! `TooManyFailures`.
//!
//! The vector only ever holds timestamps within the trailing period; older
//! entries are pruned on each check. An `intensity` of `-1` disables the
//! limit entirely.
//!
//! The bookkeeper is owned by the control loop and touched from nowhere
//! else, so it needs no locking of its own.

use std::time::Duration;

use tokio::time::Instant;

pub(crate) struct Restarter {
    intensity: i32,
    period: Duration,
    restarts: Vec<Instant>,
}

impl Restarter {
    pub(crate) fn new(intensity: i32, period: Duration) -> Self {
        Self {
            intensity,
            period,
            restarts: Vec::new(),
        }
    }

    /// Records a restart at `now` and reports whether the budget is blown.
    pub(crate) fn should_terminate(&mut self, now: Instant) -> bool {
        if self.intensity < 0 {
            return false;
        }
        self.restarts.push(now);
        let period = self.period;
        self.restarts
            .retain(|at| now.duration_since(*at) <= period);
        self.restarts.len() > self.intensity as usize
    }
}
