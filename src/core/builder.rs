//! # Builder for constructing a supervision tree.
//!
//! [`TreeBuilder`] collects configuration, the initial child set and event
//! subscribers, then produces a [`Tree`].
//!
//! Construction itself never fails: invalid configuration or a rejected
//! initial child is recorded as the tree's terminal error and surfaced by
//! [`Tree::start`], which keeps the builder chainable and mirrors how the
//! control API reports caller mistakes.

use std::sync::Arc;

use crate::children::ChildProcess;
use crate::core::config::TreeConfig;
use crate::core::tree::{Tree, TreeInner};
use crate::error::TreeError;
use crate::subscribers::Subscribe;

/// Builder for a [`Tree`].
///
/// ## Example
/// ```
/// use treevisor::{ChildError, ChildSpec, Strategy, Tree, TreeConfig};
///
/// let cfg = TreeConfig {
///     strategy: Strategy::OneForAll,
///     ..TreeConfig::default()
/// };
///
/// let tree = Tree::builder(cfg)
///     .with_child(ChildSpec::from_fn("a", |signal| async move {
///         signal.cancelled().await;
///         Ok::<_, ChildError>(())
///     }))
///     .build();
/// ```
pub struct TreeBuilder {
    cfg: TreeConfig,
    children: Vec<ChildProcess>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl TreeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: TreeConfig) -> Self {
        Self {
            cfg,
            children: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Registers an initial child (spec, bare closure via
    /// [`ChildProcess::from_fn`], or nested tree).
    pub fn with_child(mut self, child: impl Into<ChildProcess>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Registers a batch of initial children.
    pub fn with_children(mut self, children: impl IntoIterator<Item = ChildProcess>) -> Self {
        self.children.extend(children);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (child lifecycle, strategy
    /// application, drain progress) through dedicated workers with bounded
    /// queues, wired up when the tree starts.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the tree.
    ///
    /// Registration is last-write-wins on duplicate names. The first
    /// configuration or admission error, if any, becomes the tree's
    /// terminal error and is returned by `start`.
    pub fn build(self) -> Tree {
        let mut terminal: Option<TreeError> = self.cfg.validate().err();
        let mut inner = TreeInner::default();
        for child in self.children {
            match inner.admit(child) {
                Ok(spec) => {
                    inner.register(spec);
                }
                Err(err) => terminal = terminal.or(Some(err)),
            }
        }
        Tree::from_parts(self.cfg, inner, terminal, self.subscribers)
    }
}
