use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::fetch::Fetcher;
use crate::scheduler::HostScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipLabel {
    Link,
    Subdomain,
    Redirect,
}

impl RelationshipLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipLabel::Link => "link",
            RelationshipLabel::Subdomain => "subdomain",
            RelationshipLabel::Redirect => "redirect",
        }
    }
}

pub struct Classification {
    /// The nominal edge — always emitted.
    pub label: RelationshipLabel,
    /// An additional `redirect` edge to a different final host, emitted
    /// alongside the nominal edge.
    pub redirect_target: Option<String>,
}

/// eTLD+1 (registrable domain) for a host, via the embedded public suffix
/// list. Falls back to the host itself when it is already a bare suffix.
pub fn registrable_domain(host: &str) -> String {
    psl::domain_str(host).unwrap_or(host).to_string()
}

fn has_subdomain(host: &str, registrable: &str) -> bool {
    host != registrable
}

/// Classifies an (source_domain, target_href) pair. `target_domain` must
/// already be canonicalized (lowercased, no `www.`).
///
/// Rule order: subdomain check first (pure string comparison, no network);
/// then, unless the href is a fragment/mailto/non-http scheme, an optional
/// HEAD probe for a same-registrable-domain-spanning redirect. The HEAD
/// probe is paced through the same per-host politeness gate as GET, so it
/// cannot be used to flood a host faster than ordinary fetches would.
pub async fn classify(
    source_domain: &str,
    target_domain: &str,
    href: &str,
    fetcher: &Fetcher,
    scheduler: &HostScheduler,
    crawl_delay: Option<Duration>,
    cancel: &CancellationToken,
) -> Classification {
    let source_reg = registrable_domain(source_domain);
    let target_reg = registrable_domain(target_domain);

    if source_reg == target_reg
        && !has_subdomain(source_domain, &source_reg)
        && has_subdomain(target_domain, &target_reg)
    {
        return Classification {
            label: RelationshipLabel::Subdomain,
            redirect_target: None,
        };
    }

    if should_probe(href) {
        let (_g, _h) = scheduler.acquire_polite(target_domain, crawl_delay, cancel).await;
        if let Ok(head) = fetcher.head(href).await {
            if (300..400).contains(&head.status) {
                if let Some(final_host) = head.final_url.host_str() {
                    let final_host = strip_www(final_host);
                    let protocol_only = final_host == target_domain
                        && head.final_url.scheme() != scheme_of(href);
                    if final_host != target_domain && !protocol_only {
                        return Classification {
                            label: RelationshipLabel::Link,
                            redirect_target: Some(final_host.to_string()),
                        };
                    }
                }
            }
        }
    }

    Classification {
        label: RelationshipLabel::Link,
        redirect_target: None,
    }
}

fn should_probe(href: &str) -> bool {
    if href.starts_with('#') || href.starts_with("mailto:") {
        return false;
    }
    href.starts_with("http://") || href.starts_with("https://")
}

fn scheme_of(href: &str) -> &str {
    if href.starts_with("https://") {
        "https"
    } else {
        "http"
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_subdomain_relationship() {
        assert_eq!(registrable_domain("blog.example.com"), "example.com");
        assert_eq!(registrable_domain("example.com"), "example.com");
        assert!(has_subdomain("blog.example.com", "example.com"));
        assert!(!has_subdomain("example.com", "example.com"));
    }

    #[test]
    fn should_probe_skips_fragments_and_mailto() {
        assert!(!should_probe("#section"));
        assert!(!should_probe("mailto:a@b.com"));
        assert!(should_probe("http://example.com/x"));
        assert!(should_probe("https://example.com/x"));
    }
}
