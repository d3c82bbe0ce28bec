//! Destructive reset: truncates every collection table. Requires `--force`.

use clap::Parser;
use webatlas::config::Config;
use webatlas_db::{tables, Db, DbConfig};

#[derive(Parser, Debug)]
#[command(name = "wipe", about = "Truncate all collection tables and reset auto-increment counters")]
struct Args {
    /// Required acknowledgement; the binary refuses to run without it.
    #[arg(long)]
    force: bool,
}

const TABLES_IN_FK_ORDER: &[&str] = &[
    tables::URL_PROCESSING_HISTORY,
    tables::COLLECTION_LOGS,
    tables::DISCOVERY_QUEUE,
    tables::RELATIONSHIPS,
    tables::DOMAINS,
];

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if !args.force {
        eprintln!("refusing to wipe the database without --force");
        return std::process::ExitCode::FAILURE;
    }

    let config = Config::from_env();
    let db_cfg = DbConfig {
        database_url: config.database_url,
        eager_init: true,
        ..DbConfig::default()
    };
    let db = Db::new(db_cfg);
    if let Err(e) = db.init().await {
        eprintln!("failed to connect: {e}");
        return std::process::ExitCode::FAILURE;
    }
    let pool = match db.get_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("failed to acquire pool: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    if let Err(e) = sqlx::query("SET FOREIGN_KEY_CHECKS = 0").execute(pool).await {
        eprintln!("failed to disable foreign key checks: {e}");
        return std::process::ExitCode::FAILURE;
    }

    for table in TABLES_IN_FK_ORDER {
        let sql = format!("TRUNCATE TABLE {table}");
        if let Err(e) = sqlx::query(&sql).execute(pool).await {
            eprintln!("failed to truncate {table}: {e}");
            let _ = sqlx::query("SET FOREIGN_KEY_CHECKS = 1").execute(pool).await;
            return std::process::ExitCode::FAILURE;
        }
        println!("truncated {table}");
    }

    if let Err(e) = sqlx::query("SET FOREIGN_KEY_CHECKS = 1").execute(pool).await {
        eprintln!("failed to re-enable foreign key checks: {e}");
        return std::process::ExitCode::FAILURE;
    }

    println!("wipe complete");
    std::process::ExitCode::SUCCESS
}
