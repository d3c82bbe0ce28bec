//! Single-worker CLI front-end to the crawl pipeline. Intended for manual
//! runs and small seed drains; `parallel-collector` is the multi-worker
//! equivalent for sustained operation.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use webatlas::config::Config;
use webatlas::context::CrawlerContext;
use webatlas::worker::{self, WorkerPolicy, SHUTDOWN_GRACE_PERIOD};

#[derive(Parser, Debug)]
#[command(name = "queue-processor", about = "Drain the discovery queue with a single worker")]
struct Args {
    /// Stop after processing this many items total.
    #[arg(long)]
    max_items: Option<u64>,

    /// Override COLLECTION_MAX_DEPTH for this run.
    #[arg(long)]
    max_depth: Option<i32>,

    /// Keep polling the queue forever instead of exiting once it drains.
    #[arg(long)]
    continuous: bool,

    /// Seed hosts to enqueue at depth 0 before processing starts.
    #[arg(long = "add-seeds", num_args = 0.., value_name = "HOST")]
    add_seeds: Vec<String>,

    /// Exit immediately on the Nth shutdown signal instead of the default 3rd.
    #[arg(long)]
    force_shutdown_after: Option<u32>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }

    let ctx = match CrawlerContext::new(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(target: "webatlas::queue_processor", error = %e, "failed to initialize");
            return std::process::ExitCode::FAILURE;
        }
    };

    if !args.add_seeds.is_empty() {
        if let Err(e) = seed(&ctx, &args.add_seeds).await {
            error!(target: "webatlas::queue_processor", error = %e, "failed to enqueue seeds");
            return std::process::ExitCode::FAILURE;
        }
    }

    let cancel: CancellationToken = ctx.cancel.clone();
    worker::install_signal_handler(cancel.clone(), args.force_shutdown_after.unwrap_or(3));
    worker::spawn_force_exit_after_grace(cancel, SHUTDOWN_GRACE_PERIOD);

    let policy = WorkerPolicy {
        max_items: args.max_items,
        stop_on_empty: !args.continuous,
        ..WorkerPolicy::default()
    };

    let processed = worker::run_worker(ctx, 0, policy).await;
    info!(target: "webatlas::queue_processor", processed, "run complete");
    std::process::ExitCode::SUCCESS
}

async fn seed(ctx: &CrawlerContext, hosts: &[String]) -> Result<(), webatlas::error::QueueError> {
    for host in hosts {
        let host = host.trim().trim_start_matches("www.").to_ascii_lowercase();
        if host.is_empty() {
            continue;
        }
        let url = format!("http://{host}/");
        ctx.queue.enqueue(&url, &host, None, 0, 100).await?;
        info!(target: "webatlas::queue_processor", host, "enqueued seed");
    }
    Ok(())
}
