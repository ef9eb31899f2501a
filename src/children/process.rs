//! # Admission boundary: the shapes a tree accepts as children.
//!
//! [`ChildProcess`] is the closed set of child shapes that can be handed to
//! [`TreeBuilder::with_child`](crate::TreeBuilder::with_child) and
//! [`Tree::add`](crate::Tree::add):
//!
//! - a full [`ChildSpec`]
//! - a bare start closure (policies default, name generated)
//! - a nested [`Tree`], enabling hierarchical supervision
//!
//! Each accepted shape is converted into a canonical [`ChildSpec`] before
//! admission; shapes that cannot be admitted (an empty name, a nested tree
//! that already halted) are rejected with
//! [`TreeError::InvalidChildProcess`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::children::{Child, ChildFn, ChildRef, ChildSpec};
use crate::core::Tree;
use crate::error::{ChildError, TreeError};

/// A child shape awaiting admission into a tree.
pub enum ChildProcess {
    /// A fully specified child.
    Spec(ChildSpec),
    /// A bare start body; admission generates a `child-N` name and applies
    /// default policies.
    Fn(ChildRef),
    /// A whole supervision tree run as one child (`subtree-N`), making the
    /// failure of the subtree a single unit from the parent's perspective.
    Tree(Arc<Tree>),
}

impl ChildProcess {
    /// Wraps a bare closure as an anonymous child.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ChildError>> + Send + 'static,
    {
        ChildProcess::Fn(ChildFn::arc(f))
    }

    /// Converts this shape into the canonical [`ChildSpec`], or rejects it.
    ///
    /// `seq` disambiguates generated names within one tree.
    pub(crate) fn admit(self, seq: u64) -> Result<ChildSpec, TreeError> {
        match self {
            ChildProcess::Spec(spec) => {
                if spec.name().is_empty() {
                    return Err(TreeError::InvalidChildProcess);
                }
                Ok(spec)
            }
            ChildProcess::Fn(start) => Ok(ChildSpec::new(format!("child-{seq}"), start)),
            ChildProcess::Tree(tree) => {
                if tree.is_halted() {
                    // A halted tree can never run again; admitting it would
                    // only produce a child that fails on every launch.
                    return Err(TreeError::InvalidChildProcess);
                }
                Ok(ChildSpec::new(
                    format!("subtree-{seq}"),
                    Arc::new(TreeChild { tree }),
                ))
            }
        }
    }
}

impl From<ChildSpec> for ChildProcess {
    fn from(spec: ChildSpec) -> Self {
        ChildProcess::Spec(spec)
    }
}

impl From<Arc<Tree>> for ChildProcess {
    fn from(tree: Arc<Tree>) -> Self {
        ChildProcess::Tree(tree)
    }
}

/// Adapter running a nested tree as a child body.
struct TreeChild {
    tree: Arc<Tree>,
}

#[async_trait]
impl Child for TreeChild {
    async fn start(&self, signal: CancellationToken) -> Result<(), ChildError> {
        self.tree.start(signal).await.map_err(ChildError::fail)
    }
}
