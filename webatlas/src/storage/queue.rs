use std::collections::HashMap;
use std::time::Duration;

use sqlx::{MySqlPool, Row};
use tracing::warn;

use crate::error::QueueError;

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: i64,
    pub url: String,
    pub domain_name: Option<String>,
    pub source_domain_id: Option<i64>,
    pub priority: i32,
    pub status: String,
    pub depth: i32,
}

#[derive(Debug, Default, Clone)]
pub struct QueueStats {
    pub by_status: HashMap<String, i64>,
}

#[derive(Clone)]
pub struct QueueStore {
    pool: MySqlPool,
}

impl QueueStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Idempotent upsert keyed on canonical URL. On conflict, priority is
    /// raised to the max of old/new and depth is lowered to the min —
    /// never the reverse — and status is left untouched.
    pub async fn enqueue(
        &self,
        url: &str,
        domain_name: &str,
        source_domain_id: Option<i64>,
        depth: i32,
        priority: i32,
    ) -> Result<i64, QueueError> {
        let result = sqlx::query(
            "INSERT INTO discovery_queue (url, domain_name, source_domain_id, priority, depth)
             VALUES (?, ?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE
                priority = GREATEST(discovery_queue.priority, VALUES(priority)),
                depth = LEAST(discovery_queue.depth, VALUES(depth))",
        )
        .bind(url)
        .bind(domain_name)
        .bind(source_domain_id)
        .bind(priority)
        .bind(depth)
        .execute(&self.pool)
        .await?;

        let mut id = result.last_insert_id() as i64;
        if id == 0 {
            let row = sqlx::query("SELECT id FROM discovery_queue WHERE url = ?")
                .bind(url)
                .fetch_one(&self.pool)
                .await?;
            id = row.try_get::<i32, _>("id")? as i64;
        }
        Ok(id)
    }

    /// Atomically selects up to `n` pending entries ordered by priority
    /// desc, discovered_at asc, and transitions them to `processing`.
    /// Retries lock contention up to 3 times with a 100ms*attempt backoff;
    /// on exhaustion returns an empty batch rather than blocking forever.
    pub async fn lease_batch(&self, n: i64) -> Result<Vec<QueueEntry>, QueueError> {
        const MAX_RETRIES: u32 = 3;

        for attempt in 1..=MAX_RETRIES {
            match self.try_lease_batch(n).await {
                Ok(entries) => return Ok(entries),
                Err(e) => {
                    warn!(target: "webatlas::queue", attempt, error = %e, "lease_batch contention, retrying");
                    tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                }
            }
        }

        Err(QueueError::LeaseContention {
            attempts: MAX_RETRIES,
        })
    }

    async fn try_lease_batch(&self, n: i64) -> Result<Vec<QueueEntry>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            "SELECT id, url, domain_name, source_domain_id, priority, status, depth
               FROM discovery_queue
              WHERE status = 'pending'
              ORDER BY priority DESC, discovered_at ASC
              LIMIT ?
                FOR UPDATE",
        )
        .bind(n)
        .fetch_all(&mut *tx)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i32 = row.try_get("id")?;
            entries.push(QueueEntry {
                id: id as i64,
                url: row.try_get("url")?,
                domain_name: row.try_get("domain_name")?,
                source_domain_id: row.try_get::<Option<i32>, _>("source_domain_id")?.map(|v| v as i64),
                priority: row.try_get("priority")?,
                status: row.try_get("status")?,
                depth: row.try_get("depth")?,
            });
        }

        for e in &entries {
            sqlx::query(
                "UPDATE discovery_queue
                    SET status = 'processing', processed_at = CURRENT_TIMESTAMP
                  WHERE id = ?",
            )
            .bind(e.id as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(entries)
    }

    pub async fn complete(&self, id: i64, ok: bool, err: Option<&str>) -> Result<(), QueueError> {
        let status = if ok { "completed" } else { "failed" };
        sqlx::query(
            "UPDATE discovery_queue
                SET status = ?, processed_at = CURRENT_TIMESTAMP, error_message = ?
              WHERE id = ? AND status = 'processing'",
        )
        .bind(status)
        .bind(err)
        .bind(id as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn skip(&self, id: i64, reason: &str) -> Result<(), QueueError> {
        sqlx::query(
            "UPDATE discovery_queue
                SET status = 'skipped', processed_at = CURRENT_TIMESTAMP, error_message = ?
              WHERE id = ? AND status = 'processing'",
        )
        .bind(reason)
        .bind(id as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns an in-flight item to `pending` (e.g. on worker shutdown).
    pub async fn interrupt(&self, id: i64, reason: &str) -> Result<(), QueueError> {
        sqlx::query(
            "UPDATE discovery_queue
                SET status = 'pending', processed_at = NULL, error_message = ?
              WHERE id = ? AND status = 'processing'",
        )
        .bind(reason)
        .bind(id as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Releases every lease older than `threshold`, clearing it back to
    /// `pending`. Callable at startup and periodically by the sweeper.
    pub async fn sweep_stuck(&self, threshold: Duration) -> Result<u64, QueueError> {
        let threshold_secs = threshold.as_secs();
        let result = sqlx::query(
            "UPDATE discovery_queue
                SET status = 'pending', processed_at = NULL,
                    error_message = 'Recovered from stuck processing state'
              WHERE status = 'processing'
                AND processed_at < DATE_SUB(NOW(), INTERVAL ? SECOND)",
        )
        .bind(threshold_secs)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Lists (without mutating) every `processing` row older than
    /// `threshold`; backs `cleanup-stuck --dry-run`.
    pub async fn stuck_entries(&self, threshold: Duration) -> Result<Vec<QueueEntry>, QueueError> {
        let threshold_secs = threshold.as_secs();
        let rows = sqlx::query(
            "SELECT id, url, domain_name, source_domain_id, priority, status, depth
               FROM discovery_queue
              WHERE status = 'processing'
                AND processed_at < DATE_SUB(NOW(), INTERVAL ? SECOND)
              ORDER BY processed_at ASC",
        )
        .bind(threshold_secs)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i32 = row.try_get("id")?;
            entries.push(QueueEntry {
                id: id as i64,
                url: row.try_get("url")?,
                domain_name: row.try_get("domain_name")?,
                source_domain_id: row.try_get::<Option<i32>, _>("source_domain_id")?.map(|v| v as i64),
                priority: row.try_get("priority")?,
                status: row.try_get("status")?,
                depth: row.try_get("depth")?,
            });
        }
        Ok(entries)
    }

    pub async fn is_actively_queued(&self, url: &str, exclude_id: Option<i64>) -> Result<bool, QueueError> {
        let row = match exclude_id {
            Some(id) => {
                sqlx::query(
                    "SELECT COUNT(*) AS n FROM discovery_queue
                      WHERE url = ? AND status IN ('pending','processing') AND id != ?",
                )
                .bind(url)
                .bind(id as i32)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT COUNT(*) AS n FROM discovery_queue
                      WHERE url = ? AND status IN ('pending','processing')",
                )
                .bind(url)
                .fetch_one(&self.pool)
                .await?
            }
        };
        let n: i64 = row.try_get("n")?;
        Ok(n > 0)
    }

    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM discovery_queue GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        let mut by_status = HashMap::new();
        for row in rows {
            let status: String = row.try_get("status")?;
            let n: i64 = row.try_get("n")?;
            by_status.insert(status, n);
        }
        Ok(QueueStats { by_status })
    }
}
