//! # Function-backed child (`ChildFn`)
//!
//! [`ChildFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a
//! fresh future per launch. Because the closure is `Fn` (not `FnMut`), there
//! is no hidden state mutated between restarts; share state explicitly with
//! an `Arc<...>` captured by the closure if the incarnations need it.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::children::child::{Child, ChildRef};
use crate::error::ChildError;

/// Function-backed child implementation.
///
/// Wraps a closure that *creates* a new future per launch.
///
/// ## Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use treevisor::{ChildError, ChildFn, ChildRef};
///
/// let worker: ChildRef = ChildFn::arc(|signal: CancellationToken| async move {
///     signal.cancelled().await;
///     Ok::<_, ChildError>(())
/// });
/// ```
pub struct ChildFn<F> {
    f: F,
}

impl<F> ChildFn<F> {
    /// Creates a new function-backed child.
    ///
    /// Prefer [`ChildFn::arc`] when you immediately need a [`ChildRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the child and returns it as a shared handle (`Arc<dyn Child>`).
    pub fn arc<Fut>(f: F) -> ChildRef
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ChildError>> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Child for ChildFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ChildError>> + Send + 'static,
{
    async fn start(&self, signal: CancellationToken) -> Result<(), ChildError> {
        (self.f)(signal).await
    }
}
