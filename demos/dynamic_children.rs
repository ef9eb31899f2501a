//! # Demo: dynamic_children
//!
//! Dynamically add, terminate and delete children at runtime.
//!
//! Demonstrates how to:
//! - Start the tree (on a background task) with an initial child set.
//! - From another async task ("controller"), mutate the topology over time.
//! - Let `Tree::start()` return naturally once nothing is left to
//!   supervise (`NoChildProcessLeft`).
//!
//! ## Run
//! ```bash
//! cargo run --example dynamic_children
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use treevisor::{ChildError, ChildSpec, Restart, Tree, TreeConfig, TreeError};

fn ticker(name: &'static str, period: Duration) -> ChildSpec {
    ChildSpec::from_fn(name, move |signal: CancellationToken| async move {
        loop {
            if signal.is_cancelled() {
                return Ok::<(), ChildError>(());
            }
            println!("[{name}] tick");
            tokio::time::sleep(period).await;
        }
    })
}

fn oneshot(name: &'static str) -> ChildSpec {
    ChildSpec::from_fn(name, move |_signal: CancellationToken| async move {
        println!("[{name}] one-shot work...");
        tokio::time::sleep(Duration::from_millis(400)).await;
        println!("[{name}] done");
        Ok::<(), ChildError>(())
    })
    .with_restart(Restart::Temporary)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tree = Arc::new(
        Tree::builder(TreeConfig::default())
            .with_child(ticker("ticker-a", Duration::from_millis(500)))
            .build(),
    );

    let runner = {
        let tree = Arc::clone(&tree);
        tokio::spawn(async move { tree.start(CancellationToken::new()).await })
    };

    let controller = {
        let tree = Arc::clone(&tree);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            println!("[controller] add ticker-b");
            let _ = tree.add(ticker("ticker-b", Duration::from_millis(300))).await;

            tokio::time::sleep(Duration::from_secs(1)).await;
            println!("[controller] add oneshot");
            let _ = tree.add(oneshot("oneshot")).await;

            tokio::time::sleep(Duration::from_secs(1)).await;
            for status in tree.children().await {
                println!("[controller] {} is {:?}", status.name, status.lifecycle);
            }

            println!("[controller] delete ticker-a");
            let _ = tree.delete("ticker-a").await;

            tokio::time::sleep(Duration::from_secs(1)).await;
            println!("[controller] terminate ticker-b");
            let _ = tree.terminate("ticker-b").await;
            // nothing left to supervise: the tree halts on its own
        })
    };

    let _ = controller.await;
    match runner.await? {
        Err(TreeError::NoChildProcessLeft) => {
            println!("[main] tree ran out of children and stopped, as expected");
        }
        other => println!("[main] tree finished: {other:?}"),
    }
    Ok(())
}
