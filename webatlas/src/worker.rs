//! Worker Pool & Lifecycle (C10): N independent workers draining the
//! shared queue, signal-driven cooperative shutdown, and the stuck-lease
//! sweeper.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::context::CrawlerContext;
use crate::orchestrator::{cancellable_sleep, Orchestrator};

const BATCH_SIZE: i64 = 10;
const EMPTY_QUEUE_BACKOFF: Duration = Duration::from_secs(30);
const ITEM_HARD_TIMEOUT: Duration = Duration::from_secs(300);
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Run-loop policy shared by every worker in a pool.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPolicy {
    pub batch_size: i64,
    pub max_items: Option<u64>,
    /// If true, an empty lease ends the worker instead of backing off and
    /// retrying — used by `queue-processor`'s non-`--continuous` mode,
    /// which is meant to drain the queue once and exit.
    pub stop_on_empty: bool,
}

impl Default for WorkerPolicy {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            max_items: None,
            stop_on_empty: false,
        }
    }
}

/// One worker's run loop: lease a batch, process sequentially, repeat.
/// Runs until `ctx.cancel` fires, `policy.max_items` is exhausted, or (with
/// `policy.stop_on_empty`) the queue drains.
pub async fn run_worker(ctx: CrawlerContext, worker_id: usize, policy: WorkerPolicy) -> u64 {
    let cancel = ctx.cancel.clone();
    let mut orchestrator = Orchestrator::new(ctx);
    let mut processed: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }
        if let Some(max) = policy.max_items {
            if processed >= max {
                break;
            }
        }

        let batch_size = match policy.max_items {
            Some(max) => policy.batch_size.min((max - processed) as i64).max(1),
            None => policy.batch_size,
        };

        let batch = match orchestrator.context().queue.lease_batch(batch_size).await {
            Ok(b) => b,
            Err(e) => {
                warn!(target: "webatlas::worker", worker_id, error = %e, "lease_batch failed");
                cancellable_sleep(Duration::from_secs(5), &cancel).await;
                continue;
            }
        };

        if batch.is_empty() {
            if policy.stop_on_empty {
                break;
            }
            cancellable_sleep(EMPTY_QUEUE_BACKOFF, &cancel).await;
            continue;
        }

        for entry in batch {
            if cancel.is_cancelled() {
                if let Err(e) = orchestrator
                    .context()
                    .queue
                    .interrupt(entry.id, "worker shutting down")
                    .await
                {
                    warn!(target: "webatlas::worker", worker_id, error = %e, "failed to interrupt item on shutdown");
                }
                break;
            }

            let entry_id = entry.id;
            let url = entry.url.clone();
            let outcome = tokio::time::timeout(ITEM_HARD_TIMEOUT, orchestrator.process_entry(entry)).await;

            match outcome {
                Ok(Ok(())) => {
                    processed += 1;
                }
                Ok(Err(e)) => {
                    error!(target: "webatlas::worker", worker_id, entry_id, url, error = %e, "process_entry failed");
                }
                Err(_) => {
                    warn!(target: "webatlas::worker", worker_id, entry_id, url, "item exceeded hard timeout, marking failed");
                    if let Err(e) = orchestrator
                        .context()
                        .queue
                        .complete(entry_id, false, Some("timeout"))
                        .await
                    {
                        error!(target: "webatlas::worker", worker_id, error = %e, "failed to mark timed-out item");
                    }
                    processed += 1;
                }
            }

            if let Some(max) = policy.max_items {
                if processed >= max {
                    break;
                }
            }
        }
    }

    info!(target: "webatlas::worker", worker_id, processed, "worker exiting");
    processed
}

/// Releases leases this agent (or a prior instance of it) abandoned.
/// Called at startup and opportunistically on worker exit (§4.10).
pub async fn sweep_stuck_leases(ctx: &CrawlerContext) -> u64 {
    let threshold = ctx.config.stuck_lease_threshold();
    match ctx.queue.sweep_stuck(threshold).await {
        Ok(n) => {
            if n > 0 {
                info!(target: "webatlas::worker", recovered = n, "swept stuck leases");
            }
            n
        }
        Err(e) => {
            warn!(target: "webatlas::worker", error = %e, "stuck-lease sweep failed");
            0
        }
    }
}

/// Runs `count` workers concurrently and returns once every one of them has
/// exited (cooperative shutdown, or `max_items_per_worker` exhaustion).
/// A SIGINT/SIGTERM handler should call `ctx.cancel.cancel()`; this
/// function does not install one itself so binaries can layer their own
/// force-shutdown-after-N-signals policy on top.
pub async fn run_pool(ctx: CrawlerContext, count: usize, policy: WorkerPolicy) -> u64 {
    sweep_stuck_leases(&ctx).await;

    let mut handles = Vec::with_capacity(count);
    for worker_id in 0..count {
        let worker_ctx = ctx.clone();
        handles.push(tokio::spawn(run_worker(worker_ctx, worker_id, policy)));
    }

    let mut total = 0u64;
    for handle in handles {
        match handle.await {
            Ok(processed) => total += processed,
            Err(e) => error!(target: "webatlas::worker", error = %e, "worker task panicked"),
        }
    }

    sweep_stuck_leases(&ctx).await;
    total
}

/// Installs SIGINT/SIGTERM handling: the first signal cancels `token`
/// cooperatively; the `force_after`-th signal (default 3, per §6 CLI exit
/// codes) forces an immediate process exit with code 1 regardless of
/// in-flight work.
pub fn install_signal_handler(token: CancellationToken, force_after: u32) {
    let force_after = force_after.max(1);
    tokio::spawn(async move {
        let mut signal_count = 0u32;
        loop {
            wait_for_interrupt().await;
            signal_count += 1;
            if signal_count == 1 {
                warn!(target: "webatlas::worker", "shutdown signal received, finishing in-flight work");
                token.cancel();
            } else if signal_count >= force_after {
                error!(target: "webatlas::worker", signal_count, "forced shutdown threshold reached, exiting immediately");
                std::process::exit(1);
            }
        }
    });
}

#[cfg(unix)]
async fn wait_for_interrupt() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() {
    let _ = tokio::signal::ctrl_c().await;
}

/// After `cancel` fires, forces an immediate process exit if the pool
/// hasn't wound down within `grace`. A binary that finishes its own
/// shutdown first simply returns from `main` before this ever fires.
pub fn spawn_force_exit_after_grace(cancel: CancellationToken, grace: Duration) {
    tokio::spawn(async move {
        cancel.cancelled().await;
        tokio::time::sleep(grace).await;
        error!(target: "webatlas::worker", "grace period exceeded, forcing exit");
        std::process::exit(1);
    });
}
