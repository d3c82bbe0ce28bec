//! Crawl Orchestrator (C9): the per-URL pipeline — lease is handled by the
//! caller (worker.rs); this module covers gate → fetch → extract →
//! classify → persist → enqueue for one already-leased entry.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

use crate::canonical::{canonicalize, is_valid_domain, should_exclude};
use crate::categorize::{build_tags, categorize};
use crate::classify::{classify, registrable_domain};
use crate::context::CrawlerContext;
use crate::enrich::{self, WhoisData};
use crate::error::{QueueError, RepoError};
use crate::links::{extract_links, extract_meta, ExtractedLink};
use crate::robots::{is_allowed_with_robots, RobotsTxt};
use crate::storage::{CollectionLogEntry, DomainData, QueueEntry};

/// Internal/external link allocation for a single page (§4.9 step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutBudget {
    pub internal: usize,
    pub external: usize,
}

/// `internal = max(1, maxLinksPerPage / 4)`, `external = maxLinksPerPage - internal`.
pub fn fanout_budget(max_links_per_page: usize) -> FanoutBudget {
    let internal = (max_links_per_page / 4).max(1);
    let external = max_links_per_page.saturating_sub(internal);
    FanoutBudget { internal, external }
}

/// Sleeps `total`, checking `cancel` at 1-second granularity so a shutdown
/// signal interrupts the wait instead of blocking it out.
pub(crate) async fn cancellable_sleep(total: Duration, cancel: &CancellationToken) {
    let mut remaining = total;
    let tick = Duration::from_secs(1);
    while !remaining.is_zero() {
        let step = remaining.min(tick);
        tokio::select! {
            _ = tokio::time::sleep(step) => {}
            _ = cancel.cancelled() => return,
        }
        remaining = remaining.saturating_sub(step);
    }
}

/// Drives the per-URL pipeline for one worker. Caches robots.txt and WHOIS
/// lookups for the worker's lifetime (§5: robots cache is per-worker;
/// staleness is acceptable because policy is advisory).
pub struct Orchestrator {
    ctx: CrawlerContext,
    robots_cache: HashMap<String, Option<RobotsTxt>>,
    whois_cache: HashMap<String, Option<WhoisData>>,
}

impl Orchestrator {
    pub fn new(ctx: CrawlerContext) -> Self {
        Self {
            ctx,
            robots_cache: HashMap::new(),
            whois_cache: HashMap::new(),
        }
    }

    pub fn context(&self) -> &CrawlerContext {
        &self.ctx
    }

    async fn robots_for(&mut self, domain: &str) -> Option<RobotsTxt> {
        if !self.robots_cache.contains_key(domain) {
            let fetched = RobotsTxt::fetch_for_domain(self.ctx.fetcher.inner(), domain).await;
            self.robots_cache.insert(domain.to_string(), fetched);
        }
        self.robots_cache.get(domain).cloned().flatten()
    }

    async fn whois_for(&mut self, registrable: &str) -> Option<WhoisData> {
        if !self.whois_cache.contains_key(registrable) {
            let data = enrich::whois::lookup(registrable).await;
            self.whois_cache.insert(registrable.to_string(), data);
        }
        self.whois_cache.get(registrable).cloned().flatten()
    }

    /// Runs the full pipeline for one leased entry. Only a failure in a
    /// queue/repository write itself propagates to the caller; every
    /// crawl-level failure (fetch, enrichment, classification) is absorbed
    /// into a `skip`/`complete(!ok)` transition on `entry`.
    pub async fn process_entry(&mut self, entry: QueueEntry) -> Result<(), QueueError> {
        let start = Instant::now();

        let Some(domain) = entry.domain_name.clone() else {
            self.ctx.queue.skip(entry.id, "missing domain").await?;
            return Ok(());
        };

        if entry.depth > self.ctx.config.max_depth {
            self.ctx.queue.skip(entry.id, "max depth").await?;
            return Ok(());
        }

        if self
            .ctx
            .queue
            .is_actively_queued(&entry.url, Some(entry.id))
            .await?
        {
            self.ctx.queue.skip(entry.id, "already in queue").await?;
            return Ok(());
        }

        let processed = self.ctx.domains.domain_processing_count(&domain).await?;
        if processed >= self.ctx.config.max_urls_per_domain {
            self.ctx.queue.skip(entry.id, "domain cap").await?;
            return Ok(());
        }

        let robots = if self.ctx.config.respect_robots_txt {
            self.robots_for(&domain).await
        } else {
            None
        };
        if !is_allowed_with_robots(robots.as_ref(), &self.ctx.config.http_user_agent, "/") {
            if let Err(e) = self.ctx.domains.upsert_stub(&domain).await {
                warn!(target: "webatlas::orchestrator", error = %e, domain, "failed to stub robots-disallowed domain");
            }
            self.finish(&entry, &domain, true, None, 0, 0, start).await?;
            return Ok(());
        }

        let source_domain_id = match self.ensure_domain_enriched(&domain).await {
            Ok(id) => id,
            Err(e) => {
                let msg = e.to_string();
                self.ctx.queue.complete(entry.id, false, Some(&msg)).await?;
                self.log(&entry, &domain, "failed", Some(&msg), 0, 0, start).await;
                return Ok(());
            }
        };

        let (_g, _h) = self
            .ctx
            .scheduler
            .acquire_polite(&domain, Some(self.ctx.config.request_delay), &self.ctx.cancel)
            .await;
        let page = self.ctx.fetcher.get(&entry.url).await;
        drop((_g, _h));

        let page = match page {
            Ok(p) => p,
            Err(e) => {
                let msg = e.to_string();
                self.ctx.queue.complete(entry.id, false, Some(&msg)).await?;
                self.log(&entry, &domain, "failed", Some(&msg), 0, 0, start).await;
                return Ok(());
            }
        };

        let body = String::from_utf8_lossy(&page.body).into_owned();

        let (relationships_found, discovered) = if self.ctx.config.disable_discovery {
            (0, 0)
        } else {
            let links = extract_links(&page.final_url, &body);
            self.discover_links(&domain, source_domain_id, entry.depth, &links)
                .await
        };

        self.ctx
            .domains
            .record_url_processing(&entry.url, &domain, "success", relationships_found as i32)
            .await?;
        self.finish(&entry, &domain, true, None, relationships_found, discovered, start)
            .await?;
        Ok(())
    }

    /// Step 5: when the domain's title/description/ip_address aren't all
    /// populated yet, fetch its base URL, derive metadata and category,
    /// run enrichment adapters subject to config flags, and upsert.
    /// Otherwise just resolves and returns the existing domain id.
    async fn ensure_domain_enriched(&mut self, domain: &str) -> Result<i64, RepoError> {
        if self.ctx.domains.is_domain_data_complete(domain).await? {
            if let Some(id) = self.ctx.domains.domain_id(domain).await? {
                return Ok(id);
            }
        }

        let base_url = format!("http://{domain}/");
        let (_g, _h) = self
            .ctx
            .scheduler
            .acquire_polite(domain, Some(self.ctx.config.request_delay), &self.ctx.cancel)
            .await;
        let meta = match self.ctx.fetcher.get(&base_url).await {
            Ok(page) => {
                let body = String::from_utf8_lossy(&page.body).into_owned();
                Some(extract_meta(&page.final_url, &body))
            }
            Err(_) => None,
        };
        drop((_g, _h));

        let title = meta.as_ref().and_then(|m| m.title.clone());
        let description = meta.as_ref().and_then(|m| m.description.clone());
        let favicon_url = meta.as_ref().and_then(|m| m.favicon_url.clone());
        let keywords = meta.map(|m| m.keywords).unwrap_or_default();

        let category = categorize(title.as_deref(), description.as_deref(), domain);
        let tags = build_tags(domain, &category, &keywords).join(",");

        let mut data = DomainData {
            domain_name: domain.to_string(),
            title,
            description,
            favicon_url,
            category: Some(category),
            tags: Some(tags),
            ..Default::default()
        };

        let cfg = self.ctx.config.clone();
        if cfg.collect_whois {
            let reg = registrable_domain(domain);
            if let Some(whois) = self.whois_for(&reg).await {
                data.registrar = whois.registrar;
                data.created_date = whois.created_date;
                data.expiry_date = whois.expiry_date;
            }
        }

        if cfg.collect_ssl || cfg.collect_geolocation {
            let enrichment = enrich::collect(
                self.ctx.fetcher.inner(),
                domain,
                cfg.collect_ssl,
                cfg.collect_geolocation,
                &cfg.maxmind_db_path,
                cfg.ipinfo_fallback,
                cfg.ipinfo_token.as_deref(),
            )
            .await;

            data.nameservers = enrichment.dns.nameservers.map(|ns| ns.join(","));
            data.ip_address = enrichment
                .dns
                .ip_address
                .clone()
                .or_else(|| enrichment.geo.ip_address.clone());
            data.asn = enrichment.asn.as_ref().and_then(|a| a.asn.clone());
            data.asn_description = enrichment.asn.and_then(|a| a.description);
            data.ssl_valid = Some(enrichment.tls.ssl_valid);
            data.ssl_expiry = enrichment.tls.ssl_expiry;
            data.country = enrichment.geo.country;
            data.latitude = enrichment.geo.latitude;
            data.longitude = enrichment.geo.longitude;
        }

        self.ctx.domains.upsert_domain(&data).await
    }

    /// Steps 7-8: partition, cap, classify, persist, and enqueue outbound
    /// links. Returns (relationships written, new queue entries created).
    async fn discover_links(
        &mut self,
        source_domain: &str,
        source_domain_id: i64,
        depth: i32,
        links: &[ExtractedLink],
    ) -> (usize, usize) {
        let budget = fanout_budget(self.ctx.config.max_links_per_page);

        let mut internal: Vec<(Url, String)> = Vec::new();
        let mut external: Vec<(Url, String)> = Vec::new();
        let mut seen_internal_urls: HashSet<String> = HashSet::new();
        let mut seen_external_hosts: HashSet<String> = HashSet::new();

        for link in links {
            if internal.len() >= budget.internal && external.len() >= budget.external {
                break;
            }
            let Ok(raw) = Url::parse(&link.href) else { continue };
            if should_exclude(&raw, &link.text) {
                continue;
            }
            let Some(canon) = canonicalize(&raw) else { continue };
            let Some(host) = canon.host_str().map(|h| h.to_string()) else { continue };
            if !is_valid_domain(&host) {
                continue;
            }

            if host == source_domain {
                if internal.len() < budget.internal && seen_internal_urls.insert(canon.to_string()) {
                    internal.push((canon, link.text.clone()));
                }
            } else if external.len() < budget.external && seen_external_hosts.insert(host) {
                external.push((canon, link.text.clone()));
            }
        }

        let mut relationships_found = 0usize;
        let mut discovered = 0usize;

        for (canon, text) in internal.into_iter().chain(external) {
            let Some(target_host) = canon.host_str().map(|h| h.to_string()) else { continue };

            if let Ok(count) = self.ctx.domains.domain_processing_count(&target_host).await {
                if count >= self.ctx.config.max_urls_per_domain {
                    continue;
                }
            }

            let classification = classify(
                source_domain,
                &target_host,
                canon.as_str(),
                &self.ctx.fetcher,
                &self.ctx.scheduler,
                Some(self.ctx.config.request_delay),
                &self.ctx.cancel,
            )
            .await;

            let Ok(target_id) = self.ctx.domains.upsert_stub(&target_host).await else {
                continue;
            };

            if self
                .ctx
                .domains
                .upsert_relationship(
                    source_domain_id,
                    target_id,
                    classification.label.as_str(),
                    Some(&text),
                    Some(canon.as_str()),
                )
                .await
                .is_ok()
            {
                relationships_found += 1;
            }

            if let Some(final_host) = classification.redirect_target {
                if let Ok(redirect_id) = self.ctx.domains.upsert_stub(&final_host).await {
                    let _ = self
                        .ctx
                        .domains
                        .upsert_relationship(
                            source_domain_id,
                            redirect_id,
                            "redirect",
                            Some(&text),
                            Some(canon.as_str()),
                        )
                        .await;
                }
            }

            if self
                .ctx
                .queue
                .enqueue(canon.as_str(), &target_host, Some(source_domain_id), depth + 1, 1)
                .await
                .is_ok()
            {
                discovered += 1;
            }
        }

        (relationships_found, discovered)
    }

    async fn finish(
        &self,
        entry: &QueueEntry,
        domain: &str,
        ok: bool,
        err: Option<&str>,
        relationships_found: usize,
        discovered: usize,
        start: Instant,
    ) -> Result<(), QueueError> {
        self.ctx.queue.complete(entry.id, ok, err).await?;
        self.log(
            entry,
            domain,
            if ok { "success" } else { "failed" },
            err,
            relationships_found,
            discovered,
            start,
        )
        .await;
        cancellable_sleep(self.ctx.config.request_delay, &self.ctx.cancel).await;
        Ok(())
    }

    async fn log(
        &self,
        entry: &QueueEntry,
        domain: &str,
        status: &str,
        err: Option<&str>,
        relationships_found: usize,
        discovered: usize,
        start: Instant,
    ) {
        let record = CollectionLogEntry {
            domain_name: domain,
            url: &entry.url,
            agent_name: &self.ctx.agent_name,
            status,
            error_message: err,
            processing_time_secs: start.elapsed().as_secs_f64(),
            relationships_found: relationships_found as i32,
            urls_discovered: discovered as i32,
        };
        if let Err(e) = self.ctx.logs.record(&record).await {
            warn!(target: "webatlas::orchestrator", error = %e, "failed to append collection log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_budget_splits_quarter_internal() {
        let b = fanout_budget(50);
        assert_eq!(b.internal, 12);
        assert_eq!(b.external, 38);
        assert_eq!(b.internal + b.external, 50);
    }

    #[test]
    fn fanout_budget_internal_never_zero() {
        let b = fanout_budget(2);
        assert_eq!(b.internal, 1);
        assert_eq!(b.external, 1);
    }

    #[test]
    fn fanout_budget_handles_zero() {
        let b = fanout_budget(0);
        assert_eq!(b.internal, 1);
        assert_eq!(b.external, 0);
    }
}
