//! # Restart strategies: sibling-scoped reaction to one child's failure.
//!
//! [`Strategy`] decides which *other* children must be stopped and relaunched
//! when one child fails. The four standard Erlang/OTP semantics:
//!
//! ```text
//! children declared: [A, B, C], B fails
//!
//! OneForOne        → restart B              (A, C untouched)
//! OneForAll        → stop A and C, restart A, B, C in declared order
//! RestForOne       → stop C, restart B and C (A untouched)
//! SimpleOneForOne  → restart B              (dynamic-instance variant)
//! ```
//!
//! `SimpleOneForOne` shares `OneForOne`'s failure scope; the difference is
//! intent: all children are dynamic instances of one specification template,
//! added and removed at runtime rather than declared upfront.
//!
//! A strategy here is a pure scope computation. The tree applies it with its
//! exclusion lock held and failures are consumed one at a time by the single
//! control loop, so no two strategy applications ever run concurrently.

/// Sibling scope applied when one child fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Only the failed child is relaunched; siblings are untouched.
    #[default]
    OneForOne,
    /// Every other child is stopped, then the whole cohort is relaunched in
    /// declared order.
    OneForAll,
    /// Every sibling declared *after* the failed child is stopped and
    /// relaunched together with it; earlier siblings are untouched.
    RestForOne,
    /// One-for-one semantics for trees whose children are dynamic instances
    /// of a single specification template.
    SimpleOneForOne,
}

impl Strategy {
    /// Names of the siblings affected by `failed`'s failure, in declared
    /// order. The failed child itself is excluded: it has already
    /// terminated, and the start phase relaunches it from its Failed state.
    pub(crate) fn affected(&self, order: &[String], failed: &str) -> Vec<String> {
        match self {
            Strategy::OneForOne | Strategy::SimpleOneForOne => Vec::new(),
            Strategy::OneForAll => order.iter().filter(|n| *n != failed).cloned().collect(),
            Strategy::RestForOne => match order.iter().position(|n| n == failed) {
                Some(pos) => order[pos + 1..].to_vec(),
                None => Vec::new(),
            },
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Strategy::OneForOne => "one_for_one",
            Strategy::OneForAll => "one_for_all",
            Strategy::RestForOne => "rest_for_one",
            Strategy::SimpleOneForOne => "simple_one_for_one",
        }
    }
}
