use sqlx::{MySqlPool, Row};

use crate::error::RepoError;

/// Everything `upsertDomain` might have collected about a host. Every
/// field besides `domain_name` is optional: a minimal stub (all `None`)
/// is a valid and common insert, enriched opportunistically on later
/// visits.
#[derive(Debug, Clone, Default)]
pub struct DomainData {
    pub domain_name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub favicon_url: Option<String>,
    pub created_date: Option<chrono::NaiveDate>,
    pub expiry_date: Option<chrono::NaiveDate>,
    pub registrar: Option<String>,
    pub nameservers: Option<String>,
    pub asn: Option<String>,
    pub asn_description: Option<String>,
    pub ssl_valid: Option<bool>,
    pub ssl_expiry: Option<chrono::NaiveDate>,
    pub country: Option<String>,
    pub ip_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub screenshot_path: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
}

#[derive(Clone)]
pub struct DomainRepo {
    pool: MySqlPool,
}

impl DomainRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Upserts a domain row keyed on `domain_name`. A `None` field in
    /// `data` is a no-op for that column on conflict — `COALESCE(VALUES(x),
    /// x)` keeps whatever was already stored instead of blanking it out,
    /// so a later minimal stub (e.g. re-discovering an already-enriched
    /// domain as a link target) can never erase prior enrichment.
    /// `LAST_INSERT_ID()` is 0 on a pure update, so we re-select the id
    /// in that case.
    pub async fn upsert_domain(&self, data: &DomainData) -> Result<i64, RepoError> {
        let result = sqlx::query(
            "INSERT INTO domains (
                domain_name, title, description, favicon_url,
                created_date, expiry_date, registrar, nameservers,
                asn, asn_description, ssl_valid, ssl_expiry,
                country, ip_address, latitude, longitude,
                screenshot_path, category, tags
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE
                title = COALESCE(VALUES(title), title),
                description = COALESCE(VALUES(description), description),
                favicon_url = COALESCE(VALUES(favicon_url), favicon_url),
                created_date = COALESCE(VALUES(created_date), created_date),
                expiry_date = COALESCE(VALUES(expiry_date), expiry_date),
                registrar = COALESCE(VALUES(registrar), registrar),
                nameservers = COALESCE(VALUES(nameservers), nameservers),
                asn = COALESCE(VALUES(asn), asn),
                asn_description = COALESCE(VALUES(asn_description), asn_description),
                ssl_valid = COALESCE(VALUES(ssl_valid), ssl_valid),
                ssl_expiry = COALESCE(VALUES(ssl_expiry), ssl_expiry),
                country = COALESCE(VALUES(country), country),
                ip_address = COALESCE(VALUES(ip_address), ip_address),
                latitude = COALESCE(VALUES(latitude), latitude),
                longitude = COALESCE(VALUES(longitude), longitude),
                screenshot_path = COALESCE(VALUES(screenshot_path), screenshot_path),
                category = COALESCE(VALUES(category), category),
                tags = COALESCE(VALUES(tags), tags),
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(&data.domain_name)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.favicon_url)
        .bind(data.created_date)
        .bind(data.expiry_date)
        .bind(&data.registrar)
        .bind(&data.nameservers)
        .bind(&data.asn)
        .bind(&data.asn_description)
        .bind(data.ssl_valid)
        .bind(data.ssl_expiry)
        .bind(&data.country)
        .bind(&data.ip_address)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(&data.screenshot_path)
        .bind(&data.category)
        .bind(&data.tags)
        .execute(&self.pool)
        .await?;

        let mut id = result.last_insert_id() as i64;
        if id == 0 {
            let row = sqlx::query("SELECT id FROM domains WHERE domain_name = ?")
                .bind(&data.domain_name)
                .fetch_one(&self.pool)
                .await?;
            id = row.try_get::<i32, _>("id")? as i64;
        }
        Ok(id)
    }

    /// Minimal stub insert for a domain discovered but not yet visited.
    pub async fn upsert_stub(&self, domain_name: &str) -> Result<i64, RepoError> {
        self.upsert_domain(&DomainData {
            domain_name: domain_name.to_string(),
            ..Default::default()
        })
        .await
    }

    /// Unique on (source, target, label); text/href refreshed on conflict.
    pub async fn upsert_relationship(
        &self,
        source_domain_id: i64,
        target_domain_id: i64,
        label: &str,
        link_text: Option<&str>,
        link_url: Option<&str>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO relationships (source_domain_id, target_domain_id, relationship_type, link_text, link_url)
             VALUES (?, ?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE
                link_text = VALUES(link_text),
                link_url = VALUES(link_url)",
        )
        .bind(source_domain_id as i32)
        .bind(target_domain_id as i32)
        .bind(label)
        .bind(link_text)
        .bind(link_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Unique on URL; overwrites on conflict.
    pub async fn record_url_processing(
        &self,
        url: &str,
        domain_name: &str,
        status: &str,
        links_found: i32,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO url_processing_history (url, domain_name, status, links_found)
             VALUES (?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE
                processed_at = CURRENT_TIMESTAMP,
                status = VALUES(status),
                links_found = VALUES(links_found)",
        )
        .bind(url)
        .bind(domain_name)
        .bind(status)
        .bind(links_found)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// True iff `title`, `description`, and `ip_address` are all non-null.
    /// When true, the orchestrator skips per-domain enrichment but still
    /// runs relationship discovery.
    pub async fn is_domain_data_complete(&self, domain_name: &str) -> Result<bool, RepoError> {
        let row = sqlx::query(
            "SELECT title, description, ip_address FROM domains WHERE domain_name = ?",
        )
        .bind(domain_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            None => false,
            Some(row) => {
                let title: Option<String> = row.try_get("title")?;
                let description: Option<String> = row.try_get("description")?;
                let ip_address: Option<String> = row.try_get("ip_address")?;
                title.is_some() && description.is_some() && ip_address.is_some()
            }
        })
    }

    /// Backs the per-domain cap (C9 step 3) and the internal/external
    /// link caps (C9 step 8).
    pub async fn domain_processing_count(&self, domain_name: &str) -> Result<i64, RepoError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM url_processing_history WHERE domain_name = ?",
        )
        .bind(domain_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("n")?)
    }

    pub async fn domain_id(&self, domain_name: &str) -> Result<Option<i64>, RepoError> {
        let row = sqlx::query("SELECT id FROM domains WHERE domain_name = ?")
            .bind(domain_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.try_get::<i32, _>("id")).transpose()?.map(|v| v as i64))
    }
}
