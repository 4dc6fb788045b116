//! HTTP fetching and the bulk page scraper.
//!
//! [`Fetcher`] wraps a configured `reqwest` client plus SSRF protection.
//! [`PageScraper`] fetches a whole URL list with bounded concurrency and
//! reports one [`ScrapeOutcome`] per input URL, in input order.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use tracktect_shared::{HttpConfig, Result, ScrapeOutcome, TracktectError};

use crate::extract;

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("TrackTect/", env!("CARGO_PKG_VERSION"));

/// Default number of pages fetched at once by [`PageScraper`].
const DEFAULT_CONCURRENCY: usize = 4;

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// HTTP client with the SSRF guard applied to every request.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_private_hosts: bool,
}

impl Fetcher {
    /// Create a fetcher from the `[http]` config section.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TracktectError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    /// Fetch a page body as text. Non-2xx responses are errors.
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)
            .map_err(|e| TracktectError::validation(format!("invalid URL '{url}': {e}")))?;

        if !self.allow_private_hosts && is_ssrf_target(&parsed) {
            warn!(%url, "SSRF protection: blocked");
            return Err(TracktectError::validation(format!(
                "{url}: refusing to fetch private or non-HTTP target"
            )));
        }

        debug!(%url, "fetching page");

        let response = self
            .client
            .get(parsed.as_str())
            .send()
            .await
            .map_err(|e| TracktectError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TracktectError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| TracktectError::Network(format!("{url}: body read failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// PageScraper
// ---------------------------------------------------------------------------

/// Fetches pages and extracts their readable text.
pub struct PageScraper {
    fetcher: Fetcher,
    concurrency: usize,
}

impl PageScraper {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Override how many pages are fetched at once (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Scrape every URL. The returned map has exactly one entry per distinct
    /// input URL, in input order; failures are [`ScrapeOutcome::Absent`].
    #[instrument(skip_all, fields(urls = urls.len()))]
    pub async fn scrape(&self, urls: &[String]) -> IndexMap<String, ScrapeOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            let fetcher = self.fetcher.clone();
            let sem = semaphore.clone();
            let url = url.clone();

            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await;
                let outcome = scrape_one(&fetcher, &url).await;
                (url, outcome)
            }));
        }

        // Awaiting in spawn order keeps the output in input order.
        let mut results = IndexMap::with_capacity(urls.len());
        for (url, handle) in urls.iter().zip(handles) {
            let outcome = match handle.await {
                Ok((_, outcome)) => outcome,
                Err(e) => ScrapeOutcome::absent(format!("scrape task failed: {e}")),
            };
            results.entry(url.clone()).or_insert(outcome);
        }

        let present = results
            .values()
            .filter(|o| matches!(o, ScrapeOutcome::Present(_)))
            .count();
        info!(present, absent = results.len() - present, "scrape completed");

        results
    }
}

async fn scrape_one(fetcher: &Fetcher, url: &str) -> ScrapeOutcome {
    match fetcher.fetch_html(url).await {
        Ok(html) => {
            let text = extract::page_text(&html);
            if text.is_empty() {
                ScrapeOutcome::absent("page has no readable text")
            } else {
                ScrapeOutcome::Present(text)
            }
        }
        Err(e) => {
            warn!(%url, error = %e, "scrape failed");
            ScrapeOutcome::absent(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

/// Compute SHA-256 hash of content.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
