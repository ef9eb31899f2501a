//! # Tree: the supervision orchestrator.
//!
//! [`Tree`] owns the ordered set of children, runs the start/wait loop,
//! routes failures through the configured [`Strategy`], consults the restart
//! bookkeeper, and exposes the runtime control API (add, terminate, delete,
//! children, graceful shutdown).
//!
//! ## Theory of operation
//!
//! The tree has one loop divided in two phases, repeated until its root
//! token is canceled:
//!
//! ```text
//! loop {
//!   ├─► start phase: for each child in declaration order
//!   │       Running      → skip
//!   │       Done         → skip permanently
//!   │       otherwise    → launch (fresh token, fresh stop callback)
//!   │     all launches of one phase share a start gate: no body runs
//!   │     before the whole phase finished registering
//!   │     nothing Running && anything ever started → NoChildProcessLeft
//!   │
//!   └─► wait phase: block until exactly one of
//!         - root token canceled        → drain (reverse order), return
//!         - topology changed           → re-enter start phase
//!         - failure note {name, restartable}
//!             restartable → apply strategy (tree lock held),
//!                           charge the restart bookkeeper,
//!                           over budget → TooManyFailures, cancel tree
//!             otherwise   → just re-enter start phase
//! }
//! ```
//!
//! Each launched child runs in its own task: it waits for its start gate,
//! executes the body (panics caught and converted to [`ChildError`]), records
//! the outcome in its [`ChildState`], and publishes a failure note naming
//! itself unless its own token was already canceled, which means the tree is
//! stopping it deliberately. Children under `Shutdown::Indefinite` are
//! tracked in a `JoinSet` and joined on final drain; children under
//! `Shutdown::Timeout` are detachable: fire-and-forget tasks the drain never
//! waits for beyond their stop bound.
//!
//! Failure notes are consumed one at a time by this single loop, so strategy
//! applications are serialized and a child mid-termination can never be
//! double-stopped.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::children::{ChildProcess, ChildRef, ChildSpec};
use crate::core::config::TreeConfig;
use crate::core::restart::Restarter;
use crate::core::state::{ChildState, Lifecycle, StopFn};
use crate::error::{ChildError, TreeError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Termination report published by a child task to the control loop.
struct FailureNote {
    /// Name of the child that terminated.
    name: String,
    /// Verdict computed at termination time: does the restart policy want
    /// this incarnation relaunched? Carried in the note so a late-consumed
    /// report can never be re-judged against a newer incarnation's state.
    restartable: bool,
}

/// Runtime pairing of one specification with its mutable state.
pub(crate) struct ChildHandle {
    pub(crate) spec: ChildSpec,
    pub(crate) state: Arc<ChildState>,
}

/// Point-in-time snapshot entry returned by [`Tree::children`].
#[derive(Clone, Debug)]
pub struct ChildStatus {
    /// Child name.
    pub name: String,
    /// Lifecycle at snapshot time. `Running` implies a captured stop
    /// callback (use [`Tree::terminate`] to invoke it).
    pub lifecycle: Lifecycle,
}

/// Children map plus declaration order; everything behind the tree lock.
#[derive(Default)]
pub(crate) struct TreeInner {
    children: HashMap<String, ChildHandle>,
    order: Vec<String>,
    ever_started: bool,
    anon_seq: u64,
}

impl TreeInner {
    /// Converts an accepted child shape into its canonical spec, handing out
    /// generated names to anonymous shapes.
    pub(crate) fn admit(&mut self, child: ChildProcess) -> Result<ChildSpec, TreeError> {
        let seq = self.anon_seq;
        self.anon_seq += 1;
        child.admit(seq)
    }

    /// Registers an admitted spec with a fresh state.
    ///
    /// Duplicate names are last-write-wins: the spec is replaced at its
    /// existing position in declaration order. Callers replacing a *running*
    /// registration must stop it first.
    pub(crate) fn register(&mut self, spec: ChildSpec) -> String {
        let name = spec.name().to_string();
        let handle = ChildHandle {
            spec,
            state: Arc::new(ChildState::new()),
        };
        if self.children.insert(name.clone(), handle).is_none() {
            self.order.push(name.clone());
        }
        name
    }
}

/// The supervision tree proper.
///
/// Built once via [`TreeBuilder`](crate::TreeBuilder), started once with
/// [`Tree::start`], and permanently inert after it drains: no further
/// `add`/`terminate`/`delete` succeeds (`TreeError::TreeNotRunning`).
///
/// ## Example
/// ```no_run
/// use tokio_util::sync::CancellationToken;
/// use treevisor::{ChildError, ChildSpec, Tree, TreeConfig};
///
/// # async fn run() -> Result<(), treevisor::TreeError> {
/// let tree = Tree::builder(TreeConfig::default())
///     .with_child(ChildSpec::from_fn("worker", |signal| async move {
///         signal.cancelled().await;
///         Ok::<_, ChildError>(())
///     }))
///     .build();
///
/// tree.start(CancellationToken::new()).await
/// # }
/// ```
pub struct Tree {
    cfg: TreeConfig,
    bus: Bus,

    /// Children map/order; held for all topology mutation.
    inner: Mutex<TreeInner>,

    /// Terminal error: set at most once, read many.
    terminal: OnceLock<TreeError>,
    /// Latch closed exactly once when draining completes.
    halted: AtomicBool,
    /// Cancel handle for the tree's own root token, captured at start.
    graceful: OnceLock<CancellationToken>,

    /// Topology-changed notification consumed by the wait phase.
    changed: Notify,
    failure_tx: mpsc::Sender<FailureNote>,
    /// Taken by `start`, which makes `start` one-shot.
    failure_rx: Mutex<Option<mpsc::Receiver<FailureNote>>>,

    /// Handed to the subscriber listener on start.
    subscribers: Mutex<Option<Vec<Arc<dyn Subscribe>>>>,
}

impl Tree {
    /// Starts building a tree with the given configuration.
    pub fn builder(cfg: TreeConfig) -> crate::core::builder::TreeBuilder {
        crate::core::builder::TreeBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        cfg: TreeConfig,
        inner: TreeInner,
        terminal: Option<TreeError>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let (failure_tx, failure_rx) = mpsc::channel(1);
        let tree = Self {
            bus: Bus::new(cfg.bus_capacity),
            cfg,
            inner: Mutex::new(inner),
            terminal: OnceLock::new(),
            halted: AtomicBool::new(false),
            graceful: OnceLock::new(),
            changed: Notify::new(),
            failure_tx,
            failure_rx: Mutex::new(Some(failure_rx)),
            subscribers: Mutex::new(Some(subscribers)),
        };
        if let Some(err) = terminal {
            tree.set_err(err);
        }
        tree
    }

    /// The tree's event bus. Subscribe directly for ad-hoc observation;
    /// prefer [`Subscribe`] implementations for anything long-lived.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Terminal error recorded by the tree, if any.
    pub fn err(&self) -> Option<TreeError> {
        self.terminal.get().copied()
    }

    fn set_err(&self, err: TreeError) {
        let _ = self.terminal.set(err);
    }

    pub(crate) fn is_halted(&self) -> bool {
        self.halted.load(AtomicOrdering::SeqCst)
    }

    fn refuse_when_stopped(&self) -> Result<(), TreeError> {
        if self.err().is_some() || self.is_halted() {
            return Err(TreeError::TreeNotRunning);
        }
        Ok(())
    }

    /// Ignites the supervision tree and blocks until it halts.
    ///
    /// Returns `Ok(())` when the tree was shut down by cancellation (the
    /// caller's `signal` or [`Tree::graceful_shutdown`]), or the recorded
    /// supervision-fatal error (`TooManyFailures`, `NoChildProcessLeft`) /
    /// configuration error otherwise. Tracked children are joined before
    /// returning; detachable children are not waited for.
    ///
    /// `start` is one-shot: a second call (including one racing the first)
    /// fails with `TreeNotRunning`, as does restarting a halted tree.
    pub async fn start(&self, signal: CancellationToken) -> Result<(), TreeError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        if self.is_halted() {
            return Err(TreeError::TreeNotRunning);
        }
        let mut failure_rx = self
            .failure_rx
            .lock()
            .await
            .take()
            .ok_or(TreeError::TreeNotRunning)?;

        let cancel = signal.child_token();
        let _ = self.graceful.set(cancel.clone());
        self.spawn_subscriber_listener().await;

        let mut restarter = Restarter::new(self.cfg.max_restarts, self.cfg.restart_window);
        let mut tracked = JoinSet::new();
        loop {
            if cancel.is_cancelled() {
                return self.drain(&mut tracked).await;
            }
            self.start_pending(&mut tracked, &cancel).await;
            self.wait_for_change(&cancel, &mut failure_rx, &mut restarter)
                .await;
        }
    }

    /// Forwards bus events to the registered subscribers (fire-and-forget).
    async fn spawn_subscriber_listener(&self) {
        let subs = self.subscribers.lock().await.take().unwrap_or_default();
        if subs.is_empty() {
            return;
        }
        let set = SubscriberSet::new(subs);
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        });
    }

    /// Start phase: launch every child that is neither Running nor Done.
    async fn start_pending(&self, tracked: &mut JoinSet<()>, cancel: &CancellationToken) {
        let mut inner = self.inner.lock().await;
        let (gate_tx, gate_rx) = watch::channel(false);
        let mut any_running = false;
        let mut launched_any = false;
        for name in inner.order.clone() {
            let Some(handle) = inner.children.get(&name) else {
                continue;
            };
            match handle.state.lifecycle() {
                Lifecycle::Running => any_running = true,
                Lifecycle::Done => {}
                Lifecycle::NotStarted | Lifecycle::Failed => {
                    any_running = true;
                    launched_any = true;
                    self.launch(tracked, cancel, handle, gate_rx.clone());
                }
            }
        }
        if launched_any {
            inner.ever_started = true;
        }
        let ever_started = inner.ever_started;
        drop(inner);
        // Open the gate only after the whole phase registered its launches:
        // no child body runs against a partially started sibling set.
        let _ = gate_tx.send(true);

        if !any_running && ever_started && !self.cfg.never_halt {
            self.bus.publish(Event::now(EventKind::NoChildLeft));
            self.set_err(TreeError::NoChildProcessLeft);
            cancel.cancel();
        }
    }

    /// Launches one incarnation of `handle` and captures its stop callback.
    fn launch(
        &self,
        tracked: &mut JoinSet<()>,
        cancel: &CancellationToken,
        handle: &ChildHandle,
        gate: watch::Receiver<bool>,
    ) {
        let name: Arc<str> = Arc::from(handle.spec.name());
        let body: ChildRef = Arc::clone(handle.spec.start());
        let restart = handle.spec.restart();
        let shutdown = handle.spec.shutdown();
        let state = Arc::clone(&handle.state);
        let bus = self.bus.clone();
        let failure_tx = self.failure_tx.clone();

        let child_token = cancel.child_token();
        let (exit_tx, exit_rx) = watch::channel(false);

        let stop: StopFn = {
            let bus = bus.clone();
            let name = Arc::clone(&name);
            let token = child_token.clone();
            let mut exit_rx = exit_rx;
            Box::new(move || {
                async move {
                    token.cancel();
                    match shutdown.deadline() {
                        None => {
                            let _ = exit_rx.wait_for(|exited| *exited).await;
                            bus.publish(Event::now(EventKind::ChildStopped).with_child(name));
                        }
                        Some(deadline) => {
                            tokio::select! {
                                _ = exit_rx.wait_for(|exited| *exited) => {
                                    bus.publish(Event::now(EventKind::ChildStopped).with_child(name));
                                }
                                _ = time::sleep(deadline) => {
                                    bus.publish(
                                        Event::now(EventKind::ShutdownTimedOut).with_child(name),
                                    );
                                }
                            }
                        }
                    }
                }
                .boxed()
            })
        };
        state.set_running(stop);

        let mut gate = gate;
        let task = async move {
            let _ = gate.wait_for(|open| *open).await;
            bus.publish(Event::now(EventKind::ChildStarted).with_child(Arc::clone(&name)));

            let err = match run_child(body, child_token.clone()).await {
                Ok(()) => None,
                Err(e) => Some(e),
            };
            let restartable = restart.should_restart(err.as_ref());
            let temporary = restart.is_temporary();
            state.settle(restartable, temporary);

            if restart.counts_as_fault(err.as_ref()) {
                let reason = err
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                bus.publish(
                    Event::now(EventKind::ChildFailed)
                        .with_child(Arc::clone(&name))
                        .with_reason(reason),
                );
            } else if !restartable {
                bus.publish(Event::now(EventKind::ChildDone).with_child(Arc::clone(&name)));
            }
            let _ = exit_tx.send(true);

            // Report only if this incarnation was not stopped deliberately:
            // an already-canceled token at report time means the tree is
            // doing the stopping. A genuine failure landing in the same
            // instant as the cancel is classified as a deliberate stop.
            if !child_token.is_cancelled() {
                let note = FailureNote {
                    name: name.to_string(),
                    restartable,
                };
                tokio::select! {
                    _ = child_token.cancelled() => {}
                    _ = failure_tx.send(note) => {}
                }
            }
        };
        if shutdown.is_detachable() {
            tokio::spawn(task);
        } else {
            tracked.spawn(task);
        }
    }

    /// Wait phase: block until cancellation, a topology change, or a
    /// failure note.
    async fn wait_for_change(
        &self,
        cancel: &CancellationToken,
        failure_rx: &mut mpsc::Receiver<FailureNote>,
        restarter: &mut Restarter,
    ) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = self.changed.notified() => {}
            Some(note) = failure_rx.recv() => {
                self.handle_failure(cancel, restarter, note).await;
            }
        }
    }

    /// Applies the strategy and the restart budget to one failure note.
    async fn handle_failure(
        &self,
        cancel: &CancellationToken,
        restarter: &mut Restarter,
        note: FailureNote,
    ) {
        if !note.restartable {
            // A terminal, non-restartable exit only wakes the loop so the
            // start phase can re-evaluate what is left to supervise.
            return;
        }
        {
            let inner = self.inner.lock().await;
            let Some(failed) = inner.children.get(&note.name) else {
                // Deleted while the note was in flight.
                return;
            };
            if failed.state.lifecycle() == Lifecycle::Done {
                // A forced termination raced the report; terminated children
                // never reach the strategy or the restart accounting.
                return;
            }
            self.bus.publish(
                Event::now(EventKind::StrategyApplied)
                    .with_child(note.name.clone())
                    .with_reason(self.cfg.strategy.as_label()),
            );
            let affected = self.cfg.strategy.affected(&inner.order, &note.name);
            for sibling in affected {
                if let Some(handle) = inner.children.get(&sibling) {
                    handle.state.set_failed();
                    if let Some(stop) = handle.state.take_stop() {
                        stop().await;
                    }
                }
            }
        }
        if restarter.should_terminate(Instant::now()) {
            self.bus.publish(Event::now(EventKind::TooManyRestarts));
            self.set_err(TreeError::TooManyFailures);
            cancel.cancel();
        }
    }

    /// Final drain: stop children in reverse declaration order, then join
    /// every tracked task.
    async fn drain(&self, tracked: &mut JoinSet<()>) -> Result<(), TreeError> {
        if self.halted.swap(true, AtomicOrdering::SeqCst) {
            return Err(TreeError::TreeNotRunning);
        }
        self.bus.publish(Event::now(EventKind::TreeDraining));
        {
            let inner = self.inner.lock().await;
            for name in inner.order.iter().rev() {
                if let Some(handle) = inner.children.get(name) {
                    handle.state.set_failed();
                    if let Some(stop) = handle.state.take_stop() {
                        stop().await;
                    }
                }
            }
        }
        while tracked.join_next().await.is_some() {}
        self.bus.publish(Event::now(EventKind::TreeDrained));
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Attaches a new child to the tree.
    ///
    /// Accepts a [`ChildSpec`], a nested `Arc<Tree>`, or anything else
    /// convertible into [`ChildProcess`]; rejected shapes fail with
    /// `InvalidChildProcess`. Registering a name that already exists is
    /// last-write-wins: the previous registration is stopped (if running)
    /// and replaced in place. Fails with `TreeNotRunning` once the tree has
    /// halted.
    pub async fn add(&self, child: impl Into<ChildProcess>) -> Result<(), TreeError> {
        self.refuse_when_stopped()?;
        let name = {
            let mut inner = self.inner.lock().await;
            let spec = inner.admit(child.into())?;
            // Last-write-wins: stop the incarnation being replaced before
            // the map entry is swapped out from under it.
            if let Some(existing) = inner.children.get(spec.name()) {
                if let Some(stop) = existing.state.force_done() {
                    stop().await;
                }
            }
            inner.register(spec)
        };
        self.bus
            .publish(Event::now(EventKind::ChildAdded).with_child(name));
        self.changed.notify_one();
        Ok(())
    }

    /// Deliberately stops the named child and removes it from supervision
    /// without unregistering it.
    ///
    /// Terminated children never route through the failure path: they do
    /// not trigger the strategy and never count toward restart intensity.
    /// If the tree thereby runs out of children to supervise, it halts with
    /// `NoChildProcessLeft` (unless `never_halt` is set).
    pub async fn terminate(&self, name: &str) -> Result<(), TreeError> {
        self.refuse_when_stopped()?;
        let stop = {
            let inner = self.inner.lock().await;
            let handle = inner.children.get(name).ok_or(TreeError::UnknownProcess)?;
            handle.state.force_done().ok_or(TreeError::ProcessNotRunning)?
        };
        stop().await;
        self.bus
            .publish(Event::now(EventKind::ChildTerminated).with_child(name.to_string()));
        self.changed.notify_one();
        Ok(())
    }

    /// Stops the named child (tolerating "already not running") and removes
    /// its specification from the tree entirely.
    pub async fn delete(&self, name: &str) -> Result<(), TreeError> {
        match self.terminate(name).await {
            Ok(()) | Err(TreeError::ProcessNotRunning) => {}
            Err(err) => return Err(err),
        }
        {
            let mut inner = self.inner.lock().await;
            inner.order.retain(|n| n != name);
            inner.children.remove(name);
        }
        self.bus
            .publish(Event::now(EventKind::ChildRemoved).with_child(name.to_string()));
        Ok(())
    }

    /// Returns a point-in-time snapshot of every registered child, taken
    /// under the tree lock, in declaration order.
    pub async fn children(&self) -> Vec<ChildStatus> {
        let inner = self.inner.lock().await;
        inner
            .order
            .iter()
            .filter_map(|name| {
                inner.children.get(name).map(|handle| ChildStatus {
                    name: name.clone(),
                    lifecycle: handle.state.lifecycle(),
                })
            })
            .collect()
    }

    /// Stops the tree in reverse declaration order, then cancels its root
    /// token so [`Tree::start`] returns.
    ///
    /// Aborts early with `ShutdownAborted` if `signal` is canceled
    /// mid-drain (the tree's own token is still canceled, so the remaining
    /// children are stopped by the final drain instead). Fails with
    /// `TreeNotRunning` when the tree was never started or already halted.
    pub async fn graceful_shutdown(&self, signal: CancellationToken) -> Result<(), TreeError> {
        let Some(cancel) = self.graceful.get().cloned() else {
            return Err(TreeError::TreeNotRunning);
        };
        self.refuse_when_stopped()?;
        {
            let inner = self.inner.lock().await;
            for name in inner.order.iter().rev() {
                if signal.is_cancelled() {
                    cancel.cancel();
                    return Err(TreeError::ShutdownAborted);
                }
                if let Some(handle) = inner.children.get(name) {
                    handle.state.set_failed();
                    if let Some(stop) = handle.state.take_stop() {
                        tokio::select! {
                            _ = stop() => {}
                            _ = signal.cancelled() => {
                                cancel.cancel();
                                return Err(TreeError::ShutdownAborted);
                            }
                        }
                    }
                }
            }
        }
        cancel.cancel();
        Ok(())
    }
}

/// Runs one incarnation of a child body, converting panics into
/// [`ChildError::Panicked`] so one misbehaving child cannot take down the
/// control loop's own task.
async fn run_child(body: ChildRef, signal: CancellationToken) -> Result<(), ChildError> {
    match AssertUnwindSafe(body.start(signal)).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(ChildError::Panicked {
            info: panic_info(panic),
        }),
    }
}

fn panic_info(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
