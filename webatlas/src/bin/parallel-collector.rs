//! Multi-worker CLI front-end, the normal way to run sustained collection.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use webatlas::config::Config;
use webatlas::context::CrawlerContext;
use webatlas::worker::{self, WorkerPolicy, SHUTDOWN_GRACE_PERIOD};

#[derive(Parser, Debug)]
#[command(name = "parallel-collector", about = "Run N workers against the shared discovery queue")]
struct Args {
    /// Number of concurrent workers. Defaults to COLLECTION_PARALLEL_WORKERS.
    #[arg(long)]
    workers: Option<usize>,

    /// Items leased per batch per worker.
    #[arg(long, default_value_t = 10)]
    batch_size: i64,

    /// Override COLLECTION_MAX_DEPTH for this run.
    #[arg(long)]
    max_depth: Option<i32>,

    /// Keep polling the queue forever instead of exiting once it drains.
    #[arg(long)]
    continuous: bool,

    /// Run the crawl pipeline but skip writing newly discovered links back
    /// into the queue (useful for re-enriching existing domains only).
    #[arg(long)]
    no_discoveries: bool,

    /// Seed hosts to enqueue at depth 0 before processing starts.
    #[arg(long = "add-seeds", num_args = 0.., value_name = "HOST")]
    add_seeds: Vec<String>,
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
    config.disable_discovery = args.no_discoveries;
    let worker_count = args.workers.unwrap_or(config.parallel_workers).max(1);

    let ctx = match CrawlerContext::new(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(target: "webatlas::parallel_collector", error = %e, "failed to initialize");
            return std::process::ExitCode::FAILURE;
        }
    };

    if !args.add_seeds.is_empty() {
        if let Err(e) = seed(&ctx, &args.add_seeds).await {
            error!(target: "webatlas::parallel_collector", error = %e, "failed to enqueue seeds");
            return std::process::ExitCode::FAILURE;
        }
    }

    let cancel: CancellationToken = ctx.cancel.clone();
    worker::install_signal_handler(cancel.clone(), 3);
    worker::spawn_force_exit_after_grace(cancel, SHUTDOWN_GRACE_PERIOD);

    let policy = WorkerPolicy {
        batch_size: args.batch_size,
        stop_on_empty: !args.continuous,
        ..WorkerPolicy::default()
    };

    info!(target: "webatlas::parallel_collector", workers = worker_count, "starting pool");
    let processed = worker::run_pool(ctx, worker_count, policy).await;
    info!(target: "webatlas::parallel_collector", processed, "run complete");
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
        info!(target: "webatlas::parallel_collector", host, "enqueued seed");
    }
    Ok(())
}
