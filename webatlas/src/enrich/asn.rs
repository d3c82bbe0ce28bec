//! ASN enrichment (C7): resolves the autonomous system for an IP via
//! ipinfo.io's free-tier JSON endpoint.

use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct AsnData {
    pub asn: Option<String>,
    pub description: Option<String>,
}

/// `org` on ipinfo.io looks like `"AS15169 Google LLC"`; the first
/// whitespace-delimited token is the ASN, the whole string is the
/// human-readable description.
fn parse_org(org: &str) -> AsnData {
    let asn = org.split_whitespace().next().map(|s| s.to_string());
    AsnData {
        asn,
        description: Some(org.to_string()),
    }
}

pub async fn lookup(client: &reqwest::Client, ip_address: &str) -> Option<AsnData> {
    let url = format!("https://ipinfo.io/{ip_address}/json");
    let resp = client
        .get(&url)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let body: serde_json::Value = resp.json().await.ok()?;
    let org = body.get("org")?.as_str()?;
    if org.is_empty() {
        return None;
    }
    Some(parse_org(org))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_asn_token_from_description() {
        let data = parse_org("AS15169 Google LLC");
        assert_eq!(data.asn.as_deref(), Some("AS15169"));
        assert_eq!(data.description.as_deref(), Some("AS15169 Google LLC"));
    }
}
