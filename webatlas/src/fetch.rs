use std::time::Duration;

use crate::error::FetchError;

/// A single shared HTTP client per worker. Configured once from `Config`
/// and handed to every component that needs to speak HTTP.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    // Dedicated client with redirects disabled, so HEAD probes can observe
    // the first hop's status/Location instead of the fully-followed result.
    head_client: reqwest::Client,
    timeout: Duration,
}

pub struct FetchedPage {
    pub status: u16,
    pub final_url: reqwest::Url,
    pub body: Vec<u8>,
}

pub struct HeadResult {
    /// The redirect target (absolute), resolved from `Location` when the
    /// first hop is a 3xx. Equal to the request URL when there was none.
    pub final_url: reqwest::Url,
    pub status: u16,
}

impl Fetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("http client config is valid");
        let head_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("http client config is valid");
        Self {
            client,
            head_client,
            timeout,
        }
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET with redirects followed. Body is returned as raw bytes; decoding
    /// and parsing happens downstream in the link extractor.
    pub async fn get(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;
        let status = resp.status();
        let final_url = resp.url().clone();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.bytes().await.map_err(FetchError::from_reqwest)?.to_vec();
        Ok(FetchedPage {
            status: status.as_u16(),
            final_url,
            body,
        })
    }

    /// HEAD without following redirects. Used only for redirect-target
    /// classification (C6); callers are responsible for pacing it through
    /// the same politeness gate used for GET.
    pub async fn head(&self, url: &str) -> Result<HeadResult, FetchError> {
        let resp = self
            .head_client
            .head(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;
        let status = resp.status();
        let requested: reqwest::Url = resp.url().clone();

        let final_url = if (300..400).contains(&status.as_u16()) {
            resp.headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|loc| requested.join(loc).ok())
                .unwrap_or(requested)
        } else {
            requested
        };

        Ok(HeadResult {
            final_url,
            status: status.as_u16(),
        })
    }
}
