//! Contracts for the external collaborators the pipeline sequences.
//!
//! Every stage of a run talks to the outside world only through these
//! traits. Live implementations live in [`crate::live`]; tests substitute
//! deterministic stubs.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use tracktect_shared::{ClassifiedItem, LandingPageResult, Result, ScrapeOutcome, Tweet, Video};

/// Fetches page text for a list of URLs.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// One outcome per URL. URLs missing from the map count as not attempted.
    async fn scrape(&self, urls: &[String]) -> IndexMap<String, ScrapeOutcome>;
}

/// Condenses page text into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, url: &str) -> Result<String>;
}

/// Splits a summary into categorized statements.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, summary: &str, url: &str) -> Result<Vec<ClassifiedItem>>;
}

/// Compares landing pages with their previously stored state.
#[async_trait]
pub trait LandingChecker: Send + Sync {
    async fn check(&self, urls: &[String]) -> IndexMap<String, LandingPageResult>;
}

/// Looks for a platform handle on a site. `None` means nothing was found.
#[async_trait]
pub trait HandleDiscovery: Send + Sync {
    async fn discover(&self, url: &str) -> Option<String>;
}

/// Collects recent posts for a handle.
#[async_trait]
pub trait TweetSource: Send + Sync {
    async fn collect(&self, handle: &str, max: usize) -> Result<Vec<Tweet>>;
}

/// Collects recent videos for a channel.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn collect(&self, channel: &str, max: usize) -> Result<Vec<Video>>;
}

/// Receives one textual update per domain.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn append_update(&self, title: &str, content: &str) -> Result<()>;
}

/// Records run start/finish for history.
#[async_trait]
pub trait RunRecorder: Send + Sync {
    async fn run_started(&self, run_id: &str, url_count: usize) -> Result<()>;
    async fn run_finished(&self, run_id: &str, status: &str) -> Result<()>;
}

/// Everything a [`crate::pipeline::Pipeline`] needs, injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub scraper: Arc<dyn Scraper>,
    pub summarizer: Arc<dyn Summarizer>,
    pub classifier: Arc<dyn Classifier>,
    pub landing: Arc<dyn LandingChecker>,
    pub twitter_discovery: Arc<dyn HandleDiscovery>,
    pub youtube_discovery: Arc<dyn HandleDiscovery>,
    pub tweets: Arc<dyn TweetSource>,
    pub videos: Arc<dyn VideoSource>,
    /// `None` disables the publish stage.
    pub knowledge_store: Option<Arc<dyn KnowledgeStore>>,
    pub run_recorder: Option<Arc<dyn RunRecorder>>,
}
