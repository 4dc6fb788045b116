//! Production wiring of the collaborator traits.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{info, warn};

use tracktect_crawler::{Fetcher, LandingWatcher, PageScraper};
use tracktect_discovery::{DiscoveryOptions, Platform, SiteProbe};
use tracktect_shared::{
    AppConfig, LandingPageResult, Result, ScrapeOutcome, Tweet, Video,
};
use tracktect_social::{TweetScraper, YouTubeScraper};
use tracktect_storage::Storage;

use crate::collaborators::{
    Collaborators, HandleDiscovery, KnowledgeStore, LandingChecker, RunRecorder, Scraper,
    TweetSource, VideoSource,
};
use crate::llm::OpenRouterClient;
use crate::notion::NotionClient;

#[async_trait]
impl Scraper for PageScraper {
    async fn scrape(&self, urls: &[String]) -> IndexMap<String, ScrapeOutcome> {
        PageScraper::scrape(self, urls).await
    }
}

#[async_trait]
impl LandingChecker for LandingWatcher {
    async fn check(&self, urls: &[String]) -> IndexMap<String, LandingPageResult> {
        self.run(urls).await
    }
}

#[async_trait]
impl HandleDiscovery for SiteProbe {
    async fn discover(&self, url: &str) -> Option<String> {
        match SiteProbe::discover(self, url).await {
            Ok(found) => found,
            Err(e) => {
                warn!(%url, platform = %self.platform(), error = %e, "discovery failed");
                None
            }
        }
    }
}

#[async_trait]
impl TweetSource for TweetScraper {
    async fn collect(&self, handle: &str, max: usize) -> Result<Vec<Tweet>> {
        self.latest(handle, max).await
    }
}

#[async_trait]
impl VideoSource for YouTubeScraper {
    async fn collect(&self, channel: &str, max: usize) -> Result<Vec<Video>> {
        self.latest(channel, max).await
    }
}

#[async_trait]
impl RunRecorder for Storage {
    async fn run_started(&self, run_id: &str, url_count: usize) -> Result<()> {
        self.insert_run(run_id, url_count).await
    }

    async fn run_finished(&self, run_id: &str, status: &str) -> Result<()> {
        self.finish_run(run_id, status).await
    }
}

impl Collaborators {
    /// Build the live collaborator set from config.
    ///
    /// Secrets are read from the environment here, so a missing key fails the
    /// run before any stage starts. With `publish` off, no Notion credentials
    /// are needed.
    pub fn live(config: &AppConfig, storage: Arc<Storage>, publish: bool) -> Result<Self> {
        let timeout = config.http.timeout_secs;
        let fetcher = Fetcher::new(&config.http)?;

        let llm = Arc::new(OpenRouterClient::from_config(&config.openrouter, timeout)?);

        let discovery = DiscoveryOptions {
            timeout_secs: timeout,
        };

        let youtube_key = std::env::var(&config.social.youtube_api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        if youtube_key.is_none() {
            info!(
                env = %config.social.youtube_api_key_env,
                "no YouTube API key, video comments disabled"
            );
        }
        let videos = YouTubeScraper::new(
            &config.social.youtube_base_url,
            &config.social.youtube_api_base_url,
            timeout,
        )?
        .with_api_key(youtube_key)
        .with_max_comments(config.social.max_comments);

        let knowledge_store: Option<Arc<dyn KnowledgeStore>> = if publish {
            Some(Arc::new(NotionClient::from_config(&config.notion, timeout)?))
        } else {
            None
        };

        Ok(Self {
            scraper: Arc::new(PageScraper::new(fetcher.clone())),
            summarizer: llm.clone(),
            classifier: llm,
            landing: Arc::new(LandingWatcher::new(fetcher, storage.clone())),
            twitter_discovery: Arc::new(SiteProbe::new(Platform::Twitter, &discovery)?),
            youtube_discovery: Arc::new(SiteProbe::new(Platform::YouTube, &discovery)?),
            tweets: Arc::new(TweetScraper::new(&config.social.nitter_base_url, timeout)?),
            videos: Arc::new(videos),
            knowledge_store,
            run_recorder: Some(storage),
        })
    }
}
