//! # Child abstraction: an asynchronous, cancelable unit of work.
//!
//! A [`Child`] is the body of one supervised process. It receives a
//! [`CancellationToken`] and must run until its job is done, fails, or the
//! token is canceled; honoring the token promptly is what makes graceful
//! shutdown and sibling strategies work.
//!
//! Each relaunch calls [`Child::start`] again with a **fresh** derived
//! token, so implementations must be reentrant across restarts.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::ChildError;

/// # Asynchronous, cancelable child body.
///
/// Implementors should regularly check cancellation and exit promptly during
/// shutdown. Returning `Ok(())` or [`ChildError::Canceled`] while the signal
/// is being canceled counts as a cooperative exit, not a failure.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use treevisor::{Child, ChildError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Child for Heartbeat {
///     async fn start(&self, signal: CancellationToken) -> Result<(), ChildError> {
///         while !signal.is_cancelled() {
///             // do work...
///             signal.cancelled().await;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Child: Send + Sync + 'static {
    /// Executes the child until completion, failure, or cancellation.
    ///
    /// Must not return before real work is either complete or the signal is
    /// canceled; a body that returns immediately under a Permanent restart
    /// policy produces a tight relaunch loop that only the tree's
    /// restart-intensity limiter will stop.
    async fn start(&self, signal: CancellationToken) -> Result<(), ChildError>;
}

/// Shared handle to a child body, suitable for relaunching across restarts.
pub type ChildRef = Arc<dyn Child>;
