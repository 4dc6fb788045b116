//! Social handle discovery.
//!
//! When no override is pinned for a URL, TrackTect looks at the site itself:
//! the homepage is fetched and its links are scanned for a Twitter/X profile
//! or a YouTube channel. Not finding one is a normal outcome (`Ok(None)`).

mod parser;

use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use tracktect_shared::{Result, TracktectError};

pub use parser::{
    find_twitter_handle, find_youtube_channel, twitter_handle_from_url, youtube_channel_from_url,
};

/// Maximum number of redirects to follow when fetching a homepage.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for homepage fetches.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// User-Agent string for discovery requests.
const USER_AGENT: &str = concat!("TrackTect/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for the discovery probes.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Which platform a probe looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Twitter,
    YouTube,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Twitter => f.write_str("twitter"),
            Self::YouTube => f.write_str("youtube"),
        }
    }
}

// ---------------------------------------------------------------------------
// SiteProbe
// ---------------------------------------------------------------------------

/// Fetches a site's homepage and looks for a linked profile on one platform.
#[derive(Clone)]
pub struct SiteProbe {
    client: Client,
    platform: Platform,
}

impl SiteProbe {
    pub fn new(platform: Platform, opts: &DiscoveryOptions) -> Result<Self> {
        Ok(Self {
            client: build_client(opts)?,
            platform,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Look for a profile linked from `url`.
    ///
    /// Returns the bare handle for Twitter/X and a canonical channel URL for
    /// YouTube. Fetch errors are returned; "nothing linked" is `Ok(None)`.
    #[instrument(skip_all, fields(url = %url, platform = %self.platform))]
    pub async fn discover(&self, url: &str) -> Result<Option<String>> {
        let base = Url::parse(url)
            .map_err(|e| TracktectError::validation(format!("invalid URL '{url}': {e}")))?;

        let html = fetch_homepage(&self.client, &base).await?;

        let found = match self.platform {
            Platform::Twitter => find_twitter_handle(&html, &base),
            Platform::YouTube => find_youtube_channel(&html, &base),
        };

        match &found {
            Some(handle) => info!(%handle, "profile discovered"),
            None => debug!("no profile link on page"),
        }

        Ok(found)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &DiscoveryOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| TracktectError::Network(format!("failed to build HTTP client: {e}")))
}

async fn fetch_homepage(client: &Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.as_str())
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
        .map_err(|e| TracktectError::Network(format!("{url}: failed to read body: {e}")))
}
