//! DNS enrichment (C7): nameservers and the A record used to seed ASN/TLS/
//! GeoIP lookups. NXDOMAIN and timeouts leave fields `None` — DNS failure
//! never fails the crawl step.

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

#[derive(Debug, Clone, Default)]
pub struct DnsData {
    pub nameservers: Option<Vec<String>>,
    pub ip_address: Option<String>,
}

fn resolver() -> TokioAsyncResolver {
    TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
}

/// Resolves NS records and a single A record for `domain`.
pub async fn lookup(domain: &str) -> DnsData {
    let resolver = resolver();

    let nameservers = match resolver.ns_lookup(domain).await {
        Ok(ns) => {
            let names: Vec<String> = ns.iter().map(|n| n.to_string().trim_end_matches('.').to_string()).collect();
            if names.is_empty() {
                None
            } else {
                Some(names)
            }
        }
        Err(_) => None,
    };

    let ip_address = match resolver.lookup_ip(domain).await {
        Ok(lookup) => lookup.iter().next().map(|ip| ip.to_string()),
        Err(_) => None,
    };

    DnsData {
        nameservers,
        ip_address,
    }
}
