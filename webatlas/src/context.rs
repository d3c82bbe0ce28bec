//! Bundles everything a worker needs into one handle (§9: "a `CrawlerContext`
//! holds configuration, DB pool, HTTP client, cancellation token, and logger
//! scope; it is constructed once per binary and passed explicitly to each
//! component's constructor").

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use webatlas_db::{Db, DbConfig, DbInitError};

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::scheduler::HostScheduler;
use crate::storage::{CollectionLog, DomainRepo, QueueStore};

/// Per-process shared state. Cheap to clone: every field is already a
/// pool/handle wrapper or an `Arc`.
#[derive(Clone)]
pub struct CrawlerContext {
    pub config: Config,
    pub queue: QueueStore,
    pub domains: DomainRepo,
    pub logs: CollectionLog,
    pub fetcher: Fetcher,
    pub scheduler: HostScheduler,
    pub cancel: CancellationToken,
    pub agent_name: String,
}

impl CrawlerContext {
    /// Connects eagerly (a crawler binary with no reachable database has
    /// nothing useful to do) and, if configured, runs migrations.
    pub async fn new(config: Config) -> Result<Self, DbInitError> {
        let db_cfg = DbConfig {
            database_url: config.database_url.clone(),
            eager_init: true,
            ..DbConfig::default()
        };
        let db = Db::new(db_cfg);
        db.init().await?;
        let pool = db.get_pool().await?.clone();

        let fetcher = Fetcher::new(&config.http_user_agent, config.collection_timeout);
        // One in-flight request per host keeps politeness pacing exact;
        // the global cap just bounds total concurrent connections.
        let scheduler = HostScheduler::new(config.parallel_workers.max(1) * 4, 1);

        Ok(Self {
            agent_name: config.internal_agent_name.clone(),
            queue: QueueStore::new(pool.clone()),
            domains: DomainRepo::new(pool.clone()),
            logs: CollectionLog::new(pool),
            fetcher,
            scheduler,
            cancel: CancellationToken::new(),
            config,
        })
    }
}
