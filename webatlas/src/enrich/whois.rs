//! WHOIS enrichment (C7). Queries the well-known WHOIS server for a TLD
//! directly over TCP/43 — this crate has no bundled WHOIS client.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const WHOIS_TIMEOUT: Duration = Duration::from_secs(10);

/// TLD -> authoritative registry WHOIS server for a set of common TLDs.
/// Anything else falls back to IANA's root WHOIS server, which redirects
/// by referral in its response body (not followed here — a second hop is
/// out of scope for a best-effort adapter).
const WHOIS_SERVERS: &[(&str, &str)] = &[
    (".com", "whois.verisign-grs.com"),
    (".net", "whois.verisign-grs.com"),
    (".org", "whois.pir.org"),
    (".info", "whois.afilias.net"),
    (".biz", "whois.biz"),
    (".co", "whois.nic.co"),
    (".io", "whois.nic.io"),
    (".me", "whois.nic.me"),
    (".tv", "whois.nic.tv"),
    (".cc", "whois.nic.cc"),
];
const FALLBACK_SERVER: &str = "whois.iana.org";

#[derive(Debug, Clone, Default)]
pub struct WhoisData {
    pub registrar: Option<String>,
    pub created_date: Option<chrono::NaiveDate>,
    pub expiry_date: Option<chrono::NaiveDate>,
}

static REGISTRAR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^Registrar:\s*(.+)$",
        r"(?im)^Registrar Name:\s*(.+)$",
        r"(?im)^Sponsoring Registrar:\s*(.+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("registrar pattern compiles"))
    .collect()
});

static CREATED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^Creation Date:\s*(.+)$",
        r"(?im)^Created:\s*(.+)$",
        r"(?im)^Created Date:\s*(.+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("created pattern compiles"))
    .collect()
});

static EXPIRY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^Registry Expiry Date:\s*(.+)$",
        r"(?im)^Expiration Date:\s*(.+)$",
        r"(?im)^Expires:\s*(.+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("expiry pattern compiles"))
    .collect()
});

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y-%m-%dT%H:%M:%S", "%d-%b-%Y"];

fn parse_date(raw: &str) -> Option<chrono::NaiveDate> {
    let s = raw.trim();
    // Trim an RFC3339-style "Z" or offset suffix before matching the
    // plain formats above; a full RFC3339 parse isn't needed here.
    let s = s.split(|c| c == 'Z' || c == '+').next().unwrap_or(s).trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(text).map(|c| c[1].trim().to_string()))
}

fn server_for_tld(domain: &str) -> &'static str {
    let tld = domain.rsplit('.').next().map(|t| format!(".{t}"));
    tld.as_deref()
        .and_then(|t| WHOIS_SERVERS.iter().find(|(suffix, _)| *suffix == t))
        .map(|(_, server)| *server)
        .unwrap_or(FALLBACK_SERVER)
}

/// Looks up WHOIS data for a main domain (eTLD+1). Never fails the
/// caller: any connect/parse error yields `None`.
pub async fn lookup(domain: &str) -> Option<WhoisData> {
    let server = server_for_tld(domain);
    let query = format!("{domain}\r\n");

    let fut = async {
        let mut sock = TcpStream::connect((server, 43)).await.ok()?;
        sock.write_all(query.as_bytes()).await.ok()?;
        let mut buf = Vec::new();
        sock.read_to_end(&mut buf).await.ok()?;
        Some(String::from_utf8_lossy(&buf).into_owned())
    };

    let text = tokio::time::timeout(WHOIS_TIMEOUT, fut).await.ok().flatten()?;

    Some(WhoisData {
        registrar: first_match(&REGISTRAR_PATTERNS, &text),
        created_date: first_match(&CREATED_PATTERNS, &text).as_deref().and_then(parse_date),
        expiry_date: first_match(&EXPIRY_PATTERNS, &text).as_deref().and_then(parse_date),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_known_tld_server() {
        assert_eq!(server_for_tld("example.com"), "whois.verisign-grs.com");
        assert_eq!(server_for_tld("example.io"), "whois.nic.io");
        assert_eq!(server_for_tld("example.zzzzz"), FALLBACK_SERVER);
    }

    #[test]
    fn extracts_registrar_and_dates_from_whois_body() {
        let body = "\
Domain Name: EXAMPLE.COM
Registrar: Example Registrar, LLC
Creation Date: 1995-08-14T04:00:00Z
Registry Expiry Date: 2026-08-13T04:00:00Z
";
        let registrar = first_match(&REGISTRAR_PATTERNS, body);
        assert_eq!(registrar.as_deref(), Some("Example Registrar, LLC"));
        let created = first_match(&CREATED_PATTERNS, body).as_deref().and_then(parse_date);
        assert_eq!(created, chrono::NaiveDate::from_ymd_opt(1995, 8, 14));
        let expiry = first_match(&EXPIRY_PATTERNS, body).as_deref().and_then(parse_date);
        assert_eq!(expiry, chrono::NaiveDate::from_ymd_opt(2026, 8, 13));
    }
}
