use sqlx::MySqlPool;

use crate::error::RepoError;

/// Append-only record of one processed URL: status, timing, fan-out, and
/// which worker produced it. Never updated in place.
pub struct CollectionLogEntry<'a> {
    pub domain_name: &'a str,
    pub url: &'a str,
    pub agent_name: &'a str,
    pub status: &'a str,
    pub error_message: Option<&'a str>,
    pub processing_time_secs: f64,
    pub relationships_found: i32,
    pub urls_discovered: i32,
}

#[derive(Clone)]
pub struct CollectionLog {
    pool: MySqlPool,
}

impl CollectionLog {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, entry: &CollectionLogEntry<'_>) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO collection_logs (
                domain_name, url, agent_name, status, error_message,
                processing_time, relationships_found, urls_discovered
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.domain_name)
        .bind(entry.url)
        .bind(entry.agent_name)
        .bind(entry.status)
        .bind(entry.error_message)
        .bind(entry.processing_time_secs)
        .bind(entry.relationships_found)
        .bind(entry.urls_discovered)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
