//! GeoIP enrichment (C7): local MaxMind database primary, optional
//! ipinfo.io HTTP fallback.

use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct GeoData {
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// `ip_address` must already be resolved (via [`super::dns::lookup`]).
/// Tries the local MaxMind DB first; on miss or error, optionally falls
/// back to ipinfo.io when `ipinfo_fallback` is set. On both failures,
/// only the IP is recorded.
pub async fn lookup(
    client: &reqwest::Client,
    ip_address: &str,
    maxmind_db_path: &str,
    ipinfo_fallback: bool,
    ipinfo_token: Option<&str>,
) -> GeoData {
    if let Some(geo) = lookup_maxmind(ip_address, maxmind_db_path) {
        return geo;
    }

    if ipinfo_fallback {
        if let Some(geo) = lookup_ipinfo(client, ip_address, ipinfo_token).await {
            return geo;
        }
    }

    GeoData {
        ip_address: Some(ip_address.to_string()),
        ..Default::default()
    }
}

fn lookup_maxmind(ip_address: &str, db_path: &str) -> Option<GeoData> {
    let reader: maxminddb::Reader<Vec<u8>> = maxminddb::Reader::open_readfile(db_path).ok()?;
    let ip: std::net::IpAddr = ip_address.parse().ok()?;
    let city: maxminddb::geoip2::City = reader.lookup(ip).ok()?;

    let latitude = city.location.as_ref().and_then(|l| l.latitude);
    let longitude = city.location.as_ref().and_then(|l| l.longitude);
    let country = city
        .country
        .as_ref()
        .and_then(|c| c.iso_code)
        .map(|s| s.to_string());

    Some(GeoData {
        ip_address: Some(ip_address.to_string()),
        country,
        latitude,
        longitude,
    })
}

async fn lookup_ipinfo(client: &reqwest::Client, ip_address: &str, token: Option<&str>) -> Option<GeoData> {
    let mut url = format!("https://ipinfo.io/{ip_address}/json");
    if let Some(token) = token {
        url.push_str(&format!("?token={token}"));
    }

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

    let loc = body.get("loc").and_then(|v| v.as_str()).unwrap_or_default();
    let mut parts = loc.splitn(2, ',');
    let latitude = parts.next().and_then(|s| s.parse::<f64>().ok());
    let longitude = parts.next().and_then(|s| s.parse::<f64>().ok());
    let country = body
        .get("country")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Some(GeoData {
        ip_address: Some(ip_address.to_string()),
        country,
        latitude,
        longitude,
    })
}
