//! Operator tool for inspecting and recovering stuck queue leases (§4.10).

use clap::Parser;
use webatlas::config::Config;
use webatlas::context::CrawlerContext;

#[derive(Parser, Debug)]
#[command(name = "cleanup-stuck", about = "Inspect or recover `processing` entries abandoned by a dead worker")]
struct Args {
    /// List stuck entries without changing anything.
    #[arg(long)]
    dry_run: bool,

    /// Print queue status counts and exit without touching stuck leases.
    #[arg(long)]
    stats_only: bool,

    /// Minutes a `processing` entry may sit untouched before it's stuck.
    /// Defaults to the 5-minute threshold used by the background sweeper.
    #[arg(long)]
    timeout_minutes: Option<u64>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    let ctx = match CrawlerContext::new(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("failed to initialize: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let threshold = args
        .timeout_minutes
        .map(|m| std::time::Duration::from_secs(m * 60))
        .unwrap_or_else(|| ctx.config.stuck_lease_threshold());

    if args.stats_only {
        return match ctx.queue.stats().await {
            Ok(stats) => {
                for (status, count) in &stats.by_status {
                    println!("{status:<12} {count}");
                }
                std::process::ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed to read queue stats: {e}");
                std::process::ExitCode::FAILURE
            }
        };
    }

    if args.dry_run {
        return match ctx.queue.stuck_entries(threshold).await {
            Ok(entries) => {
                println!("{} stuck entries (threshold {:?})", entries.len(), threshold);
                for e in &entries {
                    println!("  #{} depth={} {}", e.id, e.depth, e.url);
                }
                std::process::ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed to list stuck entries: {e}");
                std::process::ExitCode::FAILURE
            }
        };
    }

    match ctx.queue.sweep_stuck(threshold).await {
        Ok(n) => {
            println!("recovered {n} stuck entries");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("sweep failed: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
