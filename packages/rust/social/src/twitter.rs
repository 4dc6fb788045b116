//! Recent posts for a Twitter/X handle, via an RSS bridge (`<base>/<handle>/rss`).

use reqwest::Client;
use tracing::{info, instrument};

use tracktect_shared::{Result, Tweet};

use crate::{build_client, fetch_bytes, parse_feed};

/// Reads a public timeline through a Nitter-compatible RSS bridge.
pub struct TweetScraper {
    client: Client,
    base_url: String,
}

impl TweetScraper {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch up to `max` of the newest posts for `handle` (with or without `@`).
    #[instrument(skip(self), fields(base = %self.base_url))]
    pub async fn latest(&self, handle: &str, max: usize) -> Result<Vec<Tweet>> {
        let handle = handle.trim_start_matches('@');
        let feed_url = format!("{}/{handle}/rss", self.base_url);

        let bytes = fetch_bytes(&self.client, &feed_url).await?;
        let feed = parse_feed(&bytes, &feed_url)?;

        let tweets: Vec<Tweet> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let text = entry
                    .title
                    .map(|t| t.content)
                    .or_else(|| entry.summary.map(|s| s.content))?;
                let text = text.trim();
                (!text.is_empty()).then(|| Tweet(text.to_string()))
            })
            .take(max)
            .collect();

        info!(handle, count = tweets.len(), "tweets collected");
        Ok(tweets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMELINE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Acme / @acme</title>
    <link>https://nitter.example/acme</link>
    <description>Twitter feed for: @acme.</description>
    <item><title>We just shipped v2!</title><link>https://nitter.example/acme/status/3</link></item>
    <item><title>Hiring engineers</title><link>https://nitter.example/acme/status/2</link></item>
    <item><title>Hello world</title><link>https://nitter.example/acme/status/1</link></item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn collects_newest_posts_up_to_max() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/acme/rss"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(TIMELINE))
            .mount(&server)
            .await;

        let scraper = TweetScraper::new(server.uri(), 5).unwrap();
        let tweets = scraper.latest("@acme", 2).await.unwrap();
        assert_eq!(
            tweets,
            vec![
                Tweet("We just shipped v2!".into()),
                Tweet("Hiring engineers".into())
            ]
        );
    }

    #[tokio::test]
    async fn unknown_handle_is_an_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/ghost/rss"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let scraper = TweetScraper::new(server.uri(), 5).unwrap();
        assert!(scraper.latest("ghost", 5).await.is_err());
    }
}
