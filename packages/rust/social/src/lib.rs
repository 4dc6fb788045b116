//! Social-media collectors.
//!
//! - [`TweetScraper`] reads a public timeline through an RSS bridge.
//! - [`YouTubeScraper`] reads a channel's upload feed and, when an API key is
//!   configured, the top comments of each video.
//!
//! Both cap results at the caller's maximum and keep feed order (newest first).

mod twitter;
mod youtube;

use std::time::Duration;

use reqwest::Client;
use tracktect_shared::{Result, TracktectError};

pub use twitter::TweetScraper;
pub use youtube::{YouTubeScraper, extract_channel_id};

/// User-Agent string for social requests.
const USER_AGENT: &str = concat!("TrackTect/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with appropriate settings.
fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TracktectError::Network(format!("failed to build HTTP client: {e}")))
}

/// GET a URL and return the body bytes, failing on non-2xx.
async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TracktectError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TracktectError::Network(format!("{url}: HTTP {status}")));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| TracktectError::Network(format!("{url}: failed to read body: {e}")))?;
    Ok(bytes.to_vec())
}

/// Parse an RSS/Atom document.
fn parse_feed(bytes: &[u8], source: &str) -> Result<feed_rs::model::Feed> {
    feed_rs::parser::parse(bytes)
        .map_err(|e| TracktectError::parse(format!("{source}: invalid feed: {e}")))
}
