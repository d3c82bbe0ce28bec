//! TLS enrichment (C7): opens a TLS connection to port 443 with SNI set
//! to the host. Validity is the handshake outcome; `notAfter` is pulled out of the
//! leaf certificate's DER without a full X.509 parser — this crate has
//! none in its stack, so the validity timestamp is found by scanning for
//! the two ASN.1 UTCTime/GeneralizedTime values the `Validity` sequence
//! always contains (notBefore, then notAfter) rather than decoding the
//! whole TBSCertificate.

use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

#[derive(Debug, Clone, Default)]
pub struct TlsData {
    pub ssl_valid: bool,
    pub ssl_expiry: Option<chrono::NaiveDate>,
}

fn client_config() -> ClientConfig {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth()
}

/// Best-effort handshake + leaf-cert validity scrape. Any failure
/// (connect, handshake, missing cert) yields `ssl_valid = false`.
pub async fn check(host: &str) -> TlsData {
    let fut = async {
        let config = Arc::new(client_config());
        let connector = TlsConnector::from(config);
        let server_name = ServerName::try_from(host.to_string()).ok()?;

        let tcp = TcpStream::connect((host, 443)).await.ok()?;
        let tls = connector.connect(server_name, tcp).await.ok()?;

        let (_, conn) = tls.get_ref();
        let cert = conn.peer_certificates()?.first()?.clone();
        Some(cert)
    };

    match tokio::time::timeout(Duration::from_secs(15), fut).await {
        Ok(Some(cert)) => TlsData {
            ssl_valid: true,
            ssl_expiry: not_after_from_der(cert.as_ref()),
        },
        _ => TlsData {
            ssl_valid: false,
            ssl_expiry: None,
        },
    }
}

/// Scans the DER for ASN.1 UTCTime (tag 0x17, 13-byte `YYMMDDHHMMSSZ`) or
/// GeneralizedTime (tag 0x18, 15-byte `YYYYMMDDHHMMSSZ`) values. A
/// certificate's `Validity` sequence is the only place these appear back
/// to back, so the second one found is `notAfter`.
fn not_after_from_der(der: &[u8]) -> Option<chrono::NaiveDate> {
    let mut found = Vec::new();
    let mut i = 0;
    while i + 2 <= der.len() {
        let tag = der[i];
        let len = der.get(i + 1).copied()? as usize;
        if (tag == 0x17 && len == 13) || (tag == 0x18 && len == 15) {
            let start = i + 2;
            let end = start + len;
            if end <= der.len() {
                if let Ok(s) = std::str::from_utf8(&der[start..end]) {
                    if let Some(date) = parse_asn1_time(tag, s) {
                        found.push(date);
                    }
                }
            }
        }
        i += 1;
    }
    found.get(1).or(found.first()).copied()
}

fn parse_asn1_time(tag: u8, s: &str) -> Option<chrono::NaiveDate> {
    let fmt = if tag == 0x17 { "%y%m%d%H%M%SZ" } else { "%Y%m%d%H%M%SZ" };
    chrono::NaiveDateTime::parse_from_str(s, fmt)
        .ok()
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_and_generalized_time() {
        assert_eq!(
            parse_asn1_time(0x17, "260813040000Z"),
            chrono::NaiveDate::from_ymd_opt(2026, 8, 13)
        );
        assert_eq!(
            parse_asn1_time(0x18, "20260813040000Z"),
            chrono::NaiveDate::from_ymd_opt(2026, 8, 13)
        );
    }
}
