//! Enrichment adapters (C7): best-effort data collectors run against a
//! newly discovered domain before it is upserted. Each adapter returns
//! `None`/defaulted fields on failure rather than propagating an error —
//! a slow or broken WHOIS/DNS/TLS/GeoIP/ASN source must never abort the
//! crawl step for that domain.

pub mod asn;
pub mod dns;
pub mod geo;
pub mod tls;
pub mod whois;

pub use asn::AsnData;
pub use dns::DnsData;
pub use geo::GeoData;
pub use tls::TlsData;
pub use whois::WhoisData;

/// DNS/ASN/TLS/GeoIP results for one host. WHOIS is collected separately
/// by the caller, keyed on the registrable domain so subdomains can reuse
/// the same lookup instead of re-querying a WHOIS server per host.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentResult {
    pub dns: DnsData,
    pub asn: Option<AsnData>,
    pub tls: TlsData,
    pub geo: GeoData,
}

/// Runs the DNS/ASN/TLS/GeoIP adapters for `host`, feeding the resolved
/// IP into ASN and GeoIP. `collect_ssl`/`collect_geolocation` gate the TLS
/// and ASN+GeoIP adapters respectively; DNS always runs since every other
/// adapter in this group depends on it.
pub async fn collect(
    client: &reqwest::Client,
    host: &str,
    collect_ssl: bool,
    collect_geolocation: bool,
    maxmind_db_path: &str,
    ipinfo_fallback: bool,
    ipinfo_token: Option<&str>,
) -> EnrichmentResult {
    let dns = dns::lookup(host).await;

    let tls = if collect_ssl {
        tls::check(host).await
    } else {
        TlsData::default()
    };

    let (asn, geo) = match dns.ip_address.as_deref() {
        Some(ip) if collect_geolocation => {
            tokio::join!(
                asn::lookup(client, ip),
                geo::lookup(client, ip, maxmind_db_path, ipinfo_fallback, ipinfo_token),
            )
        }
        Some(ip) => (
            None,
            GeoData {
                ip_address: Some(ip.to_string()),
                ..Default::default()
            },
        ),
        None => (None, GeoData::default()),
    };

    EnrichmentResult { dns, asn, tls, geo }
}
