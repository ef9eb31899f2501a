//! # Child process specification.
//!
//! Defines [`ChildSpec`], the immutable description of one supervised unit:
//! a unique name, a start body, a restart policy and a shutdown policy.
//!
//! A spec can be created:
//! - **From a trait object** with [`ChildSpec::new`]
//! - **From a closure** with [`ChildSpec::from_fn`]
//!
//! Policies default to `Restart::Permanent` and `Shutdown::Indefinite` and
//! can be overridden with the `with_*` builders.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::children::{ChildFn, ChildRef};
use crate::error::ChildError;
use crate::policies::{Restart, Shutdown};

/// Specification for running a child under supervision.
///
/// Bundles together:
/// - A unique name (lookup key and failure-notification payload)
/// - The child body itself ([`ChildRef`])
/// - Restart policy ([`Restart`])
/// - Shutdown policy ([`Shutdown`])
///
/// The spec is immutable once registered; the tree owns it for its
/// registration lifetime.
///
/// ## Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use treevisor::{ChildError, ChildSpec, Restart, Shutdown};
/// use std::time::Duration;
///
/// let spec = ChildSpec::from_fn("ticker", |signal: CancellationToken| async move {
///     signal.cancelled().await;
///     Ok::<_, ChildError>(())
/// })
/// .with_restart(Restart::Transient)
/// .with_shutdown(Shutdown::Timeout(Duration::from_secs(5)));
///
/// assert_eq!(spec.name(), "ticker");
/// assert_eq!(spec.restart(), Restart::Transient);
/// ```
#[derive(Clone)]
pub struct ChildSpec {
    name: String,
    start: ChildRef,
    restart: Restart,
    shutdown: Shutdown,
}

impl ChildSpec {
    /// Creates a new specification with default policies
    /// (`Restart::Permanent`, `Shutdown::Indefinite`).
    pub fn new(name: impl Into<String>, start: ChildRef) -> Self {
        Self {
            name: name.into(),
            start,
            restart: Restart::default(),
            shutdown: Shutdown::default(),
        }
    }

    /// Creates a specification from a closure, wrapping it in a
    /// [`ChildFn`].
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ChildError>> + Send + 'static,
    {
        Self::new(name, ChildFn::arc(f))
    }

    /// Returns the child name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a shared handle to the child body.
    pub fn start(&self) -> &ChildRef {
        &self.start
    }

    /// Returns the restart policy.
    pub fn restart(&self) -> Restart {
        self.restart
    }

    /// Returns the shutdown policy.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown
    }

    /// Returns a new spec with an updated restart policy.
    pub fn with_restart(mut self, restart: Restart) -> Self {
        self.restart = restart;
        self
    }

    /// Returns a new spec with an updated shutdown policy.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }
}

impl std::fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildSpec")
            .field("name", &self.name)
            .field("restart", &self.restart)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}
