use std::time::Duration;

/// Everything a binary needs, assembled once from the environment (after
/// optionally loading a `.env` file) and handed to a `CrawlerContext`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,

    pub collection_timeout: Duration,
    pub request_delay: Duration,
    pub max_links_per_page: usize,
    pub max_urls_per_domain: i64,
    pub max_depth: i32,
    pub http_user_agent: String,
    pub internal_agent_name: String,
    pub respect_robots_txt: bool,
    pub parallel_workers: usize,
    /// Set only by `parallel-collector --no-discoveries`; never read from
    /// the environment. Runs the full per-URL pipeline (fetch, enrich,
    /// classify existing stubs) but skips writing new links to the queue.
    pub disable_discovery: bool,

    pub collect_whois: bool,
    pub collect_ssl: bool,
    pub collect_geolocation: bool,
    pub collect_screenshots: bool,
    pub maxmind_db_path: String,
    pub ipinfo_fallback: bool,
    pub ipinfo_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            collection_timeout: Duration::from_secs(30),
            request_delay: Duration::from_secs(1),
            max_links_per_page: 50,
            max_urls_per_domain: 10,
            max_depth: 3,
            http_user_agent: "WebAtlas/1.0 (compatible)".to_string(),
            internal_agent_name: default_agent_name(),
            respect_robots_txt: true,
            parallel_workers: 1,
            disable_discovery: false,
            collect_whois: true,
            collect_ssl: true,
            collect_geolocation: true,
            collect_screenshots: false,
            maxmind_db_path: "./GeoLite2-City.mmdb".to_string(),
            ipinfo_fallback: true,
            ipinfo_token: None,
        }
    }
}

impl Config {
    /// Loads an optional `.env` first, then reads every variable named in
    /// the environment section of the design: `DB_*`, `COLLECTION_*`, `DATA_*`.
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();
        let mut cfg = Self::default();

        cfg.database_url = std::env::var("DATABASE_URL").ok().or_else(build_db_url);

        cfg.collection_timeout = env_secs("COLLECTION_TIMEOUT", cfg.collection_timeout);
        cfg.request_delay = env_secs_f64("COLLECTION_REQUEST_DELAY", cfg.request_delay);
        cfg.max_links_per_page = env_usize("COLLECTION_MAX_LINKS_PER_PAGE", cfg.max_links_per_page);
        cfg.max_urls_per_domain = env_i64("COLLECTION_MAX_URLS_PER_DOMAIN", cfg.max_urls_per_domain);
        cfg.max_depth = env_i32("COLLECTION_MAX_DEPTH", cfg.max_depth);

        if let Ok(ua) = std::env::var("COLLECTION_HTTP_USER_AGENT") {
            cfg.http_user_agent = ua;
        }
        if let Ok(name) = std::env::var("COLLECTION_INTERNAL_AGENT_NAME") {
            cfg.internal_agent_name = name;
        }

        cfg.respect_robots_txt = env_bool("COLLECTION_RESPECT_ROBOTS_TXT", cfg.respect_robots_txt);
        cfg.parallel_workers = env_usize("COLLECTION_PARALLEL_WORKERS", cfg.parallel_workers);

        cfg.collect_whois = env_bool("DATA_COLLECT_WHOIS", cfg.collect_whois);
        cfg.collect_ssl = env_bool("DATA_COLLECT_SSL", cfg.collect_ssl);
        cfg.collect_geolocation = env_bool("DATA_COLLECT_GEOLOCATION", cfg.collect_geolocation);
        cfg.collect_screenshots = env_bool("DATA_COLLECT_SCREENSHOTS", cfg.collect_screenshots);

        if let Ok(path) = std::env::var("MAXMIND_DB_PATH") {
            cfg.maxmind_db_path = path;
        }
        cfg.ipinfo_fallback = env_bool("DATA_COLLECT_IPINFO_FALLBACK", cfg.ipinfo_fallback);
        cfg.ipinfo_token = std::env::var("DATA_COLLECT_IPINFO_TOKEN").ok();

        cfg
    }

    pub fn stuck_lease_threshold(&self) -> Duration {
        Duration::from_secs(5 * 60)
    }

    pub fn item_hard_timeout(&self) -> Duration {
        Duration::from_secs(300)
    }
}

fn default_agent_name() -> String {
    let host = hostname_best_effort();
    format!("{}-{}", host, std::process::id())
}

fn hostname_best_effort() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "worker".to_string())
}

fn build_db_url() -> Option<String> {
    let host = std::env::var("DB_HOST").ok()?;
    let user = std::env::var("DB_USER").unwrap_or_else(|_| "root".to_string());
    let password = std::env::var("DB_PASSWORD").unwrap_or_default();
    let name = std::env::var("DB_NAME").unwrap_or_else(|_| "domain_network".to_string());
    let port = std::env::var("DB_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3306);
    Some(format!("mysql://{user}:{password}@{host}:{port}/{name}"))
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_secs_f64(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .map(Duration::from_secs_f64)
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.collection_timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_links_per_page, 50);
        assert_eq!(cfg.max_urls_per_domain, 10);
        assert_eq!(cfg.max_depth, 3);
        assert_eq!(cfg.parallel_workers, 1);
        assert!(cfg.respect_robots_txt);
    }
}
