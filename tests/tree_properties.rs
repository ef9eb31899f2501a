//! Behavioral properties of the supervision tree: restart strategies,
//! restart-intensity accounting, terminate-vs-fail semantics, graceful
//! shutdown, detach-on-timeout, and dynamic topology mutation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use treevisor::{
    ChildError, ChildProcess, ChildSpec, Event, EventKind, Lifecycle, Restart, Shutdown, Strategy,
    Tree, TreeConfig, TreeError,
};

type Counter = Arc<AtomicUsize>;

fn counter() -> Counter {
    Arc::new(AtomicUsize::new(0))
}

/// A child that counts its launches and then runs until canceled.
fn running_child(name: &str, launches: Counter) -> ChildSpec {
    ChildSpec::from_fn(name, move |signal: CancellationToken| {
        let launches = launches.clone();
        async move {
            launches.fetch_add(1, Ordering::SeqCst);
            signal.cancelled().await;
            Ok(())
        }
    })
}

/// A child that fails its first `failures` launches, then runs until
/// canceled.
fn flaky_child(name: &str, launches: Counter, failures: usize) -> ChildSpec {
    ChildSpec::from_fn(name, move |signal: CancellationToken| {
        let launches = launches.clone();
        async move {
            let attempt = launches.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= failures {
                return Err(ChildError::fail("boom"));
            }
            signal.cancelled().await;
            Ok(())
        }
    })
}

fn spawn_start(tree: &Arc<Tree>) -> JoinHandle<Result<(), TreeError>> {
    let tree = Arc::clone(tree);
    tokio::spawn(async move { tree.start(CancellationToken::new()).await })
}

/// Waits (bounded) for the next event matching `pred`.
async fn next_event(
    rx: &mut broadcast::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> Event {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(ev) if pred(&ev) => return ev,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Polls (bounded) until `pred` holds.
async fn wait_until(pred: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !pred() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for condition")
}

fn lenient() -> TreeConfig {
    TreeConfig {
        max_restarts: 100,
        restart_window: Duration::from_secs(60),
        ..TreeConfig::default()
    }
}

// --- name uniqueness ------------------------------------------------------

#[tokio::test]
async fn duplicate_name_is_last_write_wins() {
    let (first, second) = (counter(), counter());
    let tree = Arc::new(
        Tree::builder(lenient())
            .with_child(running_child("dup", first.clone()))
            .with_child(running_child("dup", second.clone()))
            .build(),
    );
    let mut events = tree.bus().subscribe();
    let handle = spawn_start(&tree);

    next_event(&mut events, |e| {
        e.kind == EventKind::ChildStarted && e.child.as_deref() == Some("dup")
    })
    .await;

    let children = tree.children().await;
    assert_eq!(children.len(), 1, "exactly one winner remains registered");
    assert_eq!(children[0].name, "dup");
    wait_until(|| second.load(Ordering::SeqCst) == 1).await;
    assert_eq!(first.load(Ordering::SeqCst), 0, "loser never launches");

    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
}

#[tokio::test]
async fn dynamic_replacement_stops_the_prior_incarnation() {
    let (first, second) = (counter(), counter());
    let tree = Arc::new(
        Tree::builder(lenient())
            .with_child(running_child("w", first.clone()))
            .build(),
    );
    let handle = spawn_start(&tree);
    wait_until(|| first.load(Ordering::SeqCst) == 1).await;

    tree.add(running_child("w", second.clone()))
        .await
        .expect("replace w");
    wait_until(|| second.load(Ordering::SeqCst) == 1).await;
    assert_eq!(tree.children().await.len(), 1);
    assert_eq!(first.load(Ordering::SeqCst), 1, "old incarnation stays stopped");

    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
}

// --- strategy scoping -----------------------------------------------------

#[tokio::test]
async fn one_for_one_leaves_siblings_untouched() {
    let (a, b, c) = (counter(), counter(), counter());
    let cfg = TreeConfig {
        strategy: Strategy::OneForOne,
        ..lenient()
    };
    let tree = Arc::new(
        Tree::builder(cfg)
            .with_child(flaky_child("a", a.clone(), 1))
            .with_child(running_child("b", b.clone()))
            .with_child(running_child("c", c.clone()))
            .build(),
    );
    let handle = spawn_start(&tree);

    wait_until(|| a.load(Ordering::SeqCst) == 2).await;
    // give any misdirected restart a chance to show up
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(b.load(Ordering::SeqCst), 1, "b keeps its incarnation");
    assert_eq!(c.load(Ordering::SeqCst), 1, "c keeps its incarnation");

    let statuses = tree.children().await;
    assert!(statuses
        .iter()
        .all(|s| s.lifecycle == Lifecycle::Running));

    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
}

#[tokio::test]
async fn one_for_all_restarts_the_whole_cohort() {
    let (a, b, c) = (counter(), counter(), counter());
    let cfg = TreeConfig {
        strategy: Strategy::OneForAll,
        ..lenient()
    };
    let tree = Arc::new(
        Tree::builder(cfg)
            .with_child(flaky_child("a", a.clone(), 1))
            .with_child(running_child("b", b.clone()))
            .with_child(running_child("c", c.clone()))
            .build(),
    );
    let handle = spawn_start(&tree);

    wait_until(|| {
        a.load(Ordering::SeqCst) == 2
            && b.load(Ordering::SeqCst) == 2
            && c.load(Ordering::SeqCst) == 2
    })
    .await;

    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
}

#[tokio::test]
async fn rest_for_one_restarts_later_siblings_only() {
    let (a, b, c) = (counter(), counter(), counter());
    let cfg = TreeConfig {
        strategy: Strategy::RestForOne,
        ..lenient()
    };
    let tree = Arc::new(
        Tree::builder(cfg)
            .with_child(running_child("a", a.clone()))
            .with_child(flaky_child("b", b.clone(), 1))
            .with_child(running_child("c", c.clone()))
            .build(),
    );
    let handle = spawn_start(&tree);

    wait_until(|| b.load(Ordering::SeqCst) == 2 && c.load(Ordering::SeqCst) == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(a.load(Ordering::SeqCst), 1, "a's incarnation is untouched");

    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
}

// --- restart intensity ----------------------------------------------------

#[tokio::test(start_paused = true)]
async fn four_failures_within_the_window_halt_the_tree() {
    let cfg = TreeConfig {
        max_restarts: 3,
        restart_window: Duration::from_secs(1),
        ..TreeConfig::default()
    };
    let tree = Arc::new(
        Tree::builder(cfg)
            .with_child(ChildSpec::from_fn("crasher", |_signal| async {
                Err(ChildError::fail("always down"))
            }))
            .build(),
    );
    let handle = spawn_start(&tree);
    assert_eq!(handle.await.expect("join"), Err(TreeError::TooManyFailures));
    assert_eq!(tree.err(), Some(TreeError::TooManyFailures));
}

#[tokio::test(start_paused = true)]
async fn spaced_failures_never_trip_the_limiter() {
    let launches = counter();
    let cfg = TreeConfig {
        max_restarts: 3,
        restart_window: Duration::from_secs(1),
        ..TreeConfig::default()
    };
    let slow_flake = {
        let launches = launches.clone();
        ChildSpec::from_fn("slow-flake", move |signal: CancellationToken| {
            let launches = launches.clone();
            async move {
                let attempt = launches.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt <= 3 {
                    tokio::time::sleep(Duration::from_millis(1200)).await;
                    return Err(ChildError::fail("spaced failure"));
                }
                signal.cancelled().await;
                Ok(())
            }
        })
    };
    let tree = Arc::new(Tree::builder(cfg).with_child(slow_flake).build());
    let handle = spawn_start(&tree);

    wait_until(|| launches.load(Ordering::SeqCst) == 4).await;
    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
}

// --- temporary children are exempt from accounting ------------------------

#[tokio::test]
async fn temporary_failures_do_not_count_or_log_as_faults() {
    let cfg = TreeConfig {
        max_restarts: 1,
        restart_window: Duration::from_secs(60),
        ..TreeConfig::default()
    };
    let keeper = counter();
    let mut builder = Tree::builder(cfg).with_child(running_child("keeper", keeper.clone()));
    for i in 0..3 {
        builder = builder.with_child(
            ChildSpec::from_fn(format!("temp-{i}"), |_signal| async {
                Err(ChildError::fail("ignored"))
            })
            .with_restart(Restart::Temporary),
        );
    }
    let tree = Arc::new(builder.build());
    let mut events = tree.bus().subscribe();
    let handle = spawn_start(&tree);

    let mut done = 0;
    while done < 3 {
        let ev = next_event(&mut events, |e| {
            matches!(
                e.kind,
                EventKind::ChildDone | EventKind::ChildFailed | EventKind::TooManyRestarts
            )
        })
        .await;
        assert_eq!(
            ev.kind,
            EventKind::ChildDone,
            "temporary terminations must not surface as faults"
        );
        done += 1;
    }
    assert!(!handle.is_finished(), "tree survives the temporary failures");

    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
}

// --- nothing left to supervise --------------------------------------------

#[tokio::test]
async fn all_temporary_children_done_halts_the_tree() {
    let tree = Arc::new(
        Tree::builder(TreeConfig::default())
            .with_child(
                ChildSpec::from_fn("one", |_signal| async { Ok(()) })
                    .with_restart(Restart::Temporary),
            )
            .with_child(
                ChildSpec::from_fn("two", |_signal| async { Ok(()) })
                    .with_restart(Restart::Temporary),
            )
            .build(),
    );
    let handle = spawn_start(&tree);
    assert_eq!(
        handle.await.expect("join"),
        Err(TreeError::NoChildProcessLeft)
    );
}

#[tokio::test]
async fn never_halt_keeps_an_empty_tree_alive() {
    let cfg = TreeConfig {
        never_halt: true,
        ..TreeConfig::default()
    };
    let tree = Arc::new(
        Tree::builder(cfg)
            .with_child(
                ChildSpec::from_fn("one", |_signal| async { Ok(()) })
                    .with_restart(Restart::Temporary),
            )
            .build(),
    );
    let mut events = tree.bus().subscribe();
    let handle = spawn_start(&tree);

    next_event(&mut events, |e| e.kind == EventKind::ChildDone).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished(), "tree waits for replacements");

    // a dynamically added replacement revives supervision
    let revived = counter();
    tree.add(running_child("revived", revived.clone()))
        .await
        .expect("add replacement");
    wait_until(|| revived.load(Ordering::SeqCst) == 1).await;

    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
}

// --- terminate is not a failure -------------------------------------------

#[tokio::test]
async fn terminate_never_triggers_strategy_or_accounting() {
    let (a, b) = (counter(), counter());
    let cfg = TreeConfig {
        strategy: Strategy::OneForAll,
        max_restarts: 1,
        restart_window: Duration::from_secs(60),
        ..TreeConfig::default()
    };
    let tree = Arc::new(
        Tree::builder(cfg)
            .with_child(running_child("a", a.clone()))
            .with_child(running_child("b", b.clone()))
            .build(),
    );
    let mut events = tree.bus().subscribe();
    let handle = spawn_start(&tree);
    wait_until(|| a.load(Ordering::SeqCst) == 1 && b.load(Ordering::SeqCst) == 1).await;

    tree.terminate("a").await.expect("terminate a");
    next_event(&mut events, |e| e.kind == EventKind::ChildTerminated).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(a.load(Ordering::SeqCst), 1, "terminated child never relaunches");
    assert_eq!(b.load(Ordering::SeqCst), 1, "sibling untouched by termination");
    let statuses = tree.children().await;
    assert_eq!(statuses[0].lifecycle, Lifecycle::Done);
    assert_eq!(statuses[1].lifecycle, Lifecycle::Running);
    assert!(!handle.is_finished());

    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
}

#[tokio::test(start_paused = true)]
async fn an_equivalent_failure_does_count() {
    // Same budget as above, but the child actually fails: two failures
    // within the window blow a budget of 1.
    let cfg = TreeConfig {
        max_restarts: 1,
        restart_window: Duration::from_secs(60),
        ..TreeConfig::default()
    };
    let tree = Arc::new(
        Tree::builder(cfg)
            .with_child(ChildSpec::from_fn("crasher", |_signal| async {
                Err(ChildError::fail("down"))
            }))
            .build(),
    );
    let handle = spawn_start(&tree);
    assert_eq!(handle.await.expect("join"), Err(TreeError::TooManyFailures));
}

// --- graceful shutdown idempotency ----------------------------------------

#[tokio::test]
async fn graceful_shutdown_is_safe_to_race_and_to_repeat() {
    let launches = counter();
    let tree = Arc::new(
        Tree::builder(TreeConfig::default())
            .with_child(running_child("w", launches.clone()))
            .build(),
    );
    let handle = spawn_start(&tree);
    wait_until(|| launches.load(Ordering::SeqCst) == 1).await;

    let (left, right) = tokio::join!(
        tree.graceful_shutdown(CancellationToken::new()),
        tree.graceful_shutdown(CancellationToken::new()),
    );
    assert_eq!(left, Ok(()));
    assert_eq!(right, Ok(()));
    assert_eq!(handle.await.expect("join"), Ok(()));

    assert_eq!(
        tree.graceful_shutdown(CancellationToken::new()).await,
        Err(TreeError::TreeNotRunning),
        "a drained tree refuses further shutdowns"
    );
}

#[tokio::test]
async fn graceful_shutdown_honors_the_callers_token() {
    let launches = counter();
    let tree = Arc::new(
        Tree::builder(TreeConfig::default())
            .with_child(running_child("w", launches.clone()))
            .build(),
    );
    let handle = spawn_start(&tree);
    wait_until(|| launches.load(Ordering::SeqCst) == 1).await;

    let aborted = CancellationToken::new();
    aborted.cancel();
    assert_eq!(
        tree.graceful_shutdown(aborted).await,
        Err(TreeError::ShutdownAborted)
    );
    // the tree's own token was still canceled, so the final drain takes over
    assert_eq!(handle.await.expect("join"), Ok(()));
}

#[tokio::test]
async fn graceful_shutdown_before_start_is_refused() {
    let tree = Tree::builder(TreeConfig::default()).build();
    assert_eq!(
        tree.graceful_shutdown(CancellationToken::new()).await,
        Err(TreeError::TreeNotRunning)
    );
}

// --- Scenario: immediate-crash child under a tight budget ----------------

#[tokio::test(start_paused = true)]
async fn tight_budget_halts_an_immediately_crashing_child() {
    let cfg = TreeConfig {
        strategy: Strategy::OneForOne,
        max_restarts: 1,
        restart_window: Duration::from_millis(100),
        ..TreeConfig::default()
    };
    let tree = Arc::new(
        Tree::builder(cfg)
            .with_child(ChildSpec::from_fn("hopeless", |_signal| async {
                Err(ChildError::fail("instant crash"))
            }))
            .build(),
    );
    let handle = spawn_start(&tree);
    assert_eq!(handle.await.expect("join"), Err(TreeError::TooManyFailures));
}

// --- Detach on shutdown timeout ------------------------------------------

#[tokio::test(start_paused = true)]
async fn stuck_child_is_detached_past_its_shutdown_bound() {
    let stuck = ChildSpec::from_fn("stuck", |_signal| async {
        // deliberately ignores its token
        std::future::pending::<()>().await;
        Ok(())
    })
    .with_shutdown(Shutdown::Timeout(Duration::from_millis(100)));

    let tree = Arc::new(Tree::builder(TreeConfig::default()).with_child(stuck).build());
    let mut events = tree.bus().subscribe();
    let handle = spawn_start(&tree);
    next_event(&mut events, |e| e.kind == EventKind::ChildStarted).await;

    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    next_event(&mut events, |e| {
        e.kind == EventKind::ShutdownTimedOut && e.child.as_deref() == Some("stuck")
    })
    .await;
    assert_eq!(handle.await.expect("join"), Ok(()));
}

// --- Panic isolation ------------------------------------------------------

#[tokio::test]
async fn a_panicking_child_is_converted_to_a_failure() {
    let cfg = TreeConfig {
        max_restarts: 1,
        restart_window: Duration::from_secs(60),
        ..TreeConfig::default()
    };
    let tree = Arc::new(
        Tree::builder(cfg)
            .with_child(ChildSpec::from_fn("bomb", |_signal| async {
                if true {
                    panic!("kaboom");
                }
                Ok(())
            }))
            .build(),
    );
    let mut events = tree.bus().subscribe();
    let handle = spawn_start(&tree);

    let fault = next_event(&mut events, |e| e.kind == EventKind::ChildFailed).await;
    assert!(
        fault.reason.as_deref().unwrap_or("").contains("kaboom"),
        "panic payload survives into the fault report"
    );
    assert_eq!(handle.await.expect("join"), Err(TreeError::TooManyFailures));
}

// --- Dynamic topology ------------------------------------------------------

#[tokio::test]
async fn add_terminate_delete_at_runtime() {
    let (a, b) = (counter(), counter());
    let cfg = TreeConfig {
        never_halt: true,
        ..lenient()
    };
    let tree = Arc::new(
        Tree::builder(cfg)
            .with_child(running_child("a", a.clone()))
            .build(),
    );
    let handle = spawn_start(&tree);
    wait_until(|| a.load(Ordering::SeqCst) == 1).await;

    tree.add(running_child("b", b.clone())).await.expect("add b");
    wait_until(|| b.load(Ordering::SeqCst) == 1).await;
    assert_eq!(tree.children().await.len(), 2);

    tree.delete("a").await.expect("delete a");
    let names: Vec<String> = tree.children().await.into_iter().map(|s| s.name).collect();
    assert_eq!(names, ["b"]);

    tree.terminate("b").await.expect("terminate b");
    assert_eq!(
        tree.terminate("b").await,
        Err(TreeError::ProcessNotRunning),
        "terminating a stopped child is refused"
    );
    assert_eq!(
        tree.terminate("ghost").await,
        Err(TreeError::UnknownProcess)
    );

    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
}

#[tokio::test]
async fn control_api_is_refused_after_halt() {
    let tree = Arc::new(
        Tree::builder(TreeConfig::default())
            .with_child(
                ChildSpec::from_fn("once", |_signal| async { Ok(()) })
                    .with_restart(Restart::Temporary),
            )
            .build(),
    );
    let handle = spawn_start(&tree);
    assert_eq!(
        handle.await.expect("join"),
        Err(TreeError::NoChildProcessLeft)
    );

    let late = ChildSpec::from_fn("late", |_signal| async { Ok(()) });
    assert_eq!(tree.add(late).await, Err(TreeError::TreeNotRunning));
    assert_eq!(tree.terminate("once").await, Err(TreeError::TreeNotRunning));
    assert_eq!(tree.delete("once").await, Err(TreeError::TreeNotRunning));
}

// --- Nested trees -----------------------------------------------------------

#[tokio::test]
async fn a_nested_tree_runs_and_drains_with_its_parent() {
    let worker = counter();
    let subtree = Arc::new(
        Tree::builder(lenient())
            .with_child(running_child("inner", worker.clone()))
            .build(),
    );
    let parent = Arc::new(
        Tree::builder(lenient())
            .with_child(ChildProcess::from(Arc::clone(&subtree)))
            .build(),
    );
    let handle = spawn_start(&parent);
    wait_until(|| worker.load(Ordering::SeqCst) == 1).await;

    parent
        .graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
    assert_eq!(
        subtree.graceful_shutdown(CancellationToken::new()).await,
        Err(TreeError::TreeNotRunning),
        "the nested tree drained with its parent"
    );
}

// --- Construction and start-time errors -------------------------------------

#[tokio::test]
async fn invalid_configuration_surfaces_at_start() {
    let cfg = TreeConfig {
        max_restarts: -2,
        ..TreeConfig::default()
    };
    let tree = Tree::builder(cfg).build();
    assert_eq!(
        tree.start(CancellationToken::new()).await,
        Err(TreeError::InvalidConfiguration)
    );
}

#[tokio::test]
async fn empty_child_name_surfaces_at_start() {
    let tree = Tree::builder(TreeConfig::default())
        .with_child(ChildSpec::from_fn("", |_signal| async { Ok(()) }))
        .build();
    assert_eq!(
        tree.start(CancellationToken::new()).await,
        Err(TreeError::InvalidChildProcess)
    );
}

#[tokio::test]
async fn start_is_one_shot() {
    let launches = counter();
    let tree = Arc::new(
        Tree::builder(TreeConfig::default())
            .with_child(running_child("w", launches.clone()))
            .build(),
    );
    let handle = spawn_start(&tree);
    wait_until(|| launches.load(Ordering::SeqCst) == 1).await;

    assert_eq!(
        tree.start(CancellationToken::new()).await,
        Err(TreeError::TreeNotRunning),
        "a second start is refused while the first is running"
    );

    tree.graceful_shutdown(CancellationToken::new())
        .await
        .expect("graceful shutdown");
    assert_eq!(handle.await.expect("join"), Ok(()));
    assert_eq!(
        tree.start(CancellationToken::new()).await,
        Err(TreeError::TreeNotRunning),
        "a halted tree never runs again"
    );
}

// --- Root-signal cancellation ------------------------------------------------

#[tokio::test]
async fn canceling_the_root_signal_drains_cleanly() {
    let launches = counter();
    let tree = Arc::new(
        Tree::builder(TreeConfig::default())
            .with_child(running_child("w", launches.clone()))
            .build(),
    );
    let root = CancellationToken::new();
    let handle = {
        let tree = Arc::clone(&tree);
        let root = root.clone();
        tokio::spawn(async move { tree.start(root).await })
    };
    wait_until(|| launches.load(Ordering::SeqCst) == 1).await;

    root.cancel();
    assert_eq!(handle.await.expect("join"), Ok(()));
    let statuses = tree.children().await;
    assert_eq!(statuses.len(), 1);
    assert_ne!(statuses[0].lifecycle, Lifecycle::Running);
}
