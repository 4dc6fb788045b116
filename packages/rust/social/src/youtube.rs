//! Recent uploads for a YouTube channel.
//!
//! Videos come from the public channel feed
//! (`/feeds/videos.xml?channel_id=UC…`). Channel URLs in `@name`, `/c/` or
//! `/user/` form are first resolved to a channel id by reading the channel
//! page. Comments need the Data API; without a key every video has none.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use tracktect_shared::{Result, TracktectError, Video};

use crate::{build_client, fetch_bytes, parse_feed};

/// A channel id: `UC` followed by 22 id characters.
static CHANNEL_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:channel/|channel_id=|"channelId":"|"externalId":")(UC[A-Za-z0-9_-]{22})"#)
        .expect("channel id regex")
});

/// Reads channel uploads and (optionally) top comments.
pub struct YouTubeScraper {
    client: Client,
    /// Base for channel pages and feeds (`https://www.youtube.com`).
    site_base: String,
    /// Base for the Data API (`https://www.googleapis.com/youtube/v3`).
    api_base: String,
    api_key: Option<String>,
    max_comments: usize,
}

impl YouTubeScraper {
    pub fn new(
        site_base: impl Into<String>,
        api_base: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            site_base: site_base.into().trim_end_matches('/').to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: None,
            max_comments: 5,
        })
    }

    /// Enable comment collection with a Data API key.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_max_comments(mut self, max_comments: usize) -> Self {
        self.max_comments = max_comments;
        self
    }

    /// Fetch up to `max` of the newest videos for a channel URL.
    #[instrument(skip(self))]
    pub async fn latest(&self, channel_url: &str, max: usize) -> Result<Vec<Video>> {
        let channel_id = self.resolve_channel_id(channel_url).await?;
        let feed_url = format!("{}/feeds/videos.xml?channel_id={channel_id}", self.site_base);

        let bytes = fetch_bytes(&self.client, &feed_url).await?;
        let feed = parse_feed(&bytes, &feed_url)?;

        let mut videos = Vec::new();
        for entry in feed.entries.into_iter().take(max) {
            let video_id = entry
                .id
                .strip_prefix("yt:video:")
                .unwrap_or(&entry.id)
                .to_string();
            let url = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={video_id}"));
            let description = entry
                .media
                .iter()
                .find_map(|m| m.description.as_ref().map(|d| d.content.clone()))
                .or_else(|| entry.summary.map(|s| s.content))
                .unwrap_or_default();

            let comments = self.comments(&video_id).await;

            videos.push(Video {
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                url,
                description,
                comments,
            });
        }

        info!(%channel_id, count = videos.len(), "videos collected");
        Ok(videos)
    }

    async fn resolve_channel_id(&self, channel_url: &str) -> Result<String> {
        if let Some(id) = extract_channel_id(channel_url) {
            return Ok(id);
        }

        // Handle-style URLs: read the channel page on the configured site base.
        let parsed = Url::parse(channel_url).map_err(|e| {
            TracktectError::validation(format!("invalid channel URL '{channel_url}': {e}"))
        })?;
        let page_url = format!("{}{}", self.site_base, parsed.path());
        let bytes = fetch_bytes(&self.client, &page_url).await?;
        let html = String::from_utf8_lossy(&bytes);

        extract_channel_id(&html).ok_or_else(|| {
            TracktectError::parse(format!("{channel_url}: channel id not found on page"))
        })
    }

    /// Top-level comments for a video. Failures yield an empty list.
    async fn comments(&self, video_id: &str) -> Vec<String> {
        let Some(key) = &self.api_key else {
            return Vec::new();
        };
        if self.max_comments == 0 {
            return Vec::new();
        }

        let url = format!("{}/commentThreads", self.api_base);
        let max_results = self.max_comments.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("videoId", video_id),
                ("maxResults", max_results.as_str()),
                ("order", "relevance"),
                ("textFormat", "plainText"),
                ("key", key.as_str()),
            ])
            .send()
            .await;

        let threads = match response {
            Ok(resp) if resp.status().is_success() => resp.json::<CommentThreads>().await,
            Ok(resp) => {
                warn!(video_id, status = %resp.status(), "comment fetch rejected");
                return Vec::new();
            }
            Err(e) => {
                warn!(video_id, error = %e, "comment fetch failed");
                return Vec::new();
            }
        };

        match threads {
            Ok(threads) => {
                let comments: Vec<String> = threads
                    .items
                    .into_iter()
                    .map(|t| t.snippet.top_level_comment.snippet.text_display)
                    .take(self.max_comments)
                    .collect();
                debug!(video_id, count = comments.len(), "comments collected");
                comments
            }
            Err(e) => {
                warn!(video_id, error = %e, "comment response unreadable");
                Vec::new()
            }
        }
    }
}

/// Find a `UC…` channel id in a URL or a channel page.
pub fn extract_channel_id(text: &str) -> Option<String> {
    CHANNEL_ID_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

// ---------------------------------------------------------------------------
// Data API response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CommentThreads {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_display: String,
}
