//! # Demo: daemon
//!
//! The shape of a small service daemon: periodic maintenance children under
//! a never-halt tree, stopped by Ctrl-C.
//!
//! Each periodic child runs one round of work, sleeps until the next round,
//! then returns; its Permanent restart policy relaunches it for the next
//! cycle. The restart limiter is disabled because every cycle counts as a
//! restart by design.
//!
//! ## Run
//! ```bash
//! cargo run --example daemon --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use treevisor::{
    ChildError, ChildSpec, LogWriter, Restart, Shutdown, Strategy, Subscribe, Tree, TreeConfig,
};

fn periodic(name: &'static str, every: Duration) -> ChildSpec {
    ChildSpec::from_fn(name, move |signal: CancellationToken| async move {
        println!("[{name}] working...");
        tokio::select! {
            _ = tokio::time::sleep(every) => Ok::<(), ChildError>(()),
            _ = signal.cancelled() => Ok(()),
        }
    })
    .with_restart(Restart::Permanent)
    .with_shutdown(Shutdown::Timeout(Duration::from_secs(5)))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = TreeConfig {
        strategy: Strategy::OneForOne,
        // every periodic cycle is a relaunch; rate limiting is meaningless here
        max_restarts: -1,
        never_halt: true,
        ..TreeConfig::default()
    };

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let tree = Arc::new(
        Tree::builder(cfg)
            .with_child(periodic("vacuum", Duration::from_secs(6)))
            .with_child(periodic("restore-postponed", Duration::from_secs(9)))
            .with_subscribers(subs)
            .build(),
    );

    let runner = {
        let tree = Arc::clone(&tree);
        tokio::spawn(async move { tree.start(CancellationToken::new()).await })
    };

    tokio::signal::ctrl_c().await?;
    println!("[main] interrupt received, shutting down");
    tree.graceful_shutdown(CancellationToken::new()).await?;
    runner.await??;
    println!("[main] tree drained, bye");
    Ok(())
}
