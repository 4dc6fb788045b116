//! End-to-end tracking run: scrape → summarize → classify → landing watch →
//! Twitter → YouTube → publish.
//!
//! Stages run strictly one after another and each finishes the whole URL set
//! before the next starts. Inside a stage, URLs are handled in input order,
//! so the progress log is a reproducible trace of the run.

use std::path::PathBuf;
use std::time::Instant;

use indexmap::{IndexMap, IndexSet};
use tracing::{info, instrument, warn};

use tracktect_shared::{
    AppConfig, ClassifiedMap, HandleOverrides, LandingPageResult, PipelineResult, PublishStatus,
    Result, RunId, ScrapeOutcome, domain_key,
};

use crate::aggregator::{self, Aggregate};
use crate::collaborators::Collaborators;
use crate::publisher;
use crate::resolver::{self, HandleSource};

/// Separator printed after each tweet and video in the log.
const SEPARATOR_WIDTH: usize = 40;

/// Tunables for a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Where the classification artifact is written.
    pub artifact_path: PathBuf,
    /// Maximum tweets per URL.
    pub max_tweets: usize,
    /// Maximum videos per URL.
    pub max_videos: usize,
    /// Description characters shown per video in the log.
    pub description_preview_chars: usize,
    /// Abort on the first knowledge-store failure.
    pub publish_fail_fast: bool,
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            artifact_path: PathBuf::from(&config.defaults.artifact_path),
            max_tweets: config.defaults.max_tweets,
            max_videos: config.defaults.max_videos,
            description_preview_chars: config.defaults.description_preview_chars,
            publish_fail_fast: config.publish.fail_fast,
        }
    }
}

/// What to track in one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    /// Web properties, in processing order.
    pub urls: Vec<String>,
    /// Pinned Twitter/X handles per URL.
    pub twitter_overrides: HandleOverrides,
    /// Pinned YouTube channels per URL.
    pub youtube_overrides: HandleOverrides,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn stage(&self, name: &str);
    /// Called for every line appended to the run log.
    fn log_line(&self, line: &str);
    /// Called when the run completes successfully.
    fn done(&self, result: &PipelineResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _name: &str) {}
    fn log_line(&self, _line: &str) {}
    fn done(&self, _result: &PipelineResult) {}
}

/// Append-only run log that mirrors every line to the progress reporter.
struct RunLog<'a> {
    lines: Vec<String>,
    progress: &'a dyn ProgressReporter,
}

impl<'a> RunLog<'a> {
    fn new(progress: &'a dyn ProgressReporter) -> Self {
        Self {
            lines: Vec::new(),
            progress,
        }
    }

    fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.progress.log_line(&line);
        self.lines.push(line);
    }

    fn stage(&mut self, name: &str, line: impl Into<String>) {
        self.progress.stage(name);
        self.push(line);
    }
}

/// The orchestrator. Holds injected collaborators and run options.
pub struct Pipeline {
    deps: Collaborators,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(deps: Collaborators, options: PipelineOptions) -> Self {
        Self { deps, options }
    }

    /// Run every stage over `input.urls` and assemble the result.
    ///
    /// Per-URL problems (scrape misses, failed landing checks, missing
    /// handles, social collection errors) are logged and the run continues.
    /// Summarizer, classifier and artifact-write errors abort the run, as do
    /// publish errors when fail-fast is on.
    #[instrument(skip_all, fields(urls = input.urls.len()))]
    pub async fn run(
        &self,
        input: &PipelineInput,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineResult> {
        // URLs are opaque keys; only exact repeats collapse.
        let urls: Vec<String> = input
            .urls
            .iter()
            .cloned()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();

        let run_id = RunId::new();
        let start = Instant::now();
        info!(%run_id, urls = urls.len(), "starting tracking run");

        if let Some(recorder) = &self.deps.run_recorder {
            if let Err(e) = recorder.run_started(&run_id.to_string(), urls.len()).await {
                warn!(error = %e, "could not record run start");
            }
        }

        let outcome = self.run_stages(run_id.clone(), &urls, input, progress).await;

        if let Some(recorder) = &self.deps.run_recorder {
            let status = match &outcome {
                Ok(result) => match result.notion_status {
                    PublishStatus::Partial { .. } => "partial",
                    _ => "success",
                },
                Err(_) => "failed",
            };
            if let Err(e) = recorder.run_finished(&run_id.to_string(), status).await {
                warn!(error = %e, "could not record run finish");
            }
        }

        let result = outcome?;
        progress.done(&result);

        info!(
            %run_id,
            domains = result.classified.len(),
            log_lines = result.log_lines.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "tracking run complete"
        );

        Ok(result)
    }

    async fn run_stages(
        &self,
        run_id: RunId,
        urls: &[String],
        input: &PipelineInput,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineResult> {
        let mut log = RunLog::new(progress);
        let mut agg = Aggregate::default();

        log.push(format!("Starting TrackTect run for {} URL(s)", urls.len()));

        let summaries = self.scrape_and_summarize(urls, &mut log).await?;
        agg.classified = self.classify(&summaries, &mut log).await?;

        let saved = aggregator::write_classified(&self.options.artifact_path, &agg.classified)?;
        log.push(format!("Classification results saved to: {}", saved.display()));

        agg.landing_changes = self.watch_landing_pages(urls, &mut log).await;
        self.collect_tweets(urls, &input.twitter_overrides, &mut agg, &mut log)
            .await;
        self.collect_videos(urls, &input.youtube_overrides, &mut agg, &mut log)
            .await;

        let status = self.publish(&agg.classified, &mut log).await?;

        log.push("All stages completed");
        Ok(agg.into_result(run_id, log.lines, status))
    }

    // -----------------------------------------------------------------------
    // Stages 1–2: scrape, summarize
    // -----------------------------------------------------------------------

    async fn scrape_and_summarize(
        &self,
        urls: &[String],
        log: &mut RunLog<'_>,
    ) -> Result<Vec<(String, String)>> {
        log.stage("Scraping", "Running scraper...");
        let mut scraped = self.deps.scraper.scrape(urls).await;

        let mut pages = Vec::new();
        for url in urls {
            match scraped.shift_remove(url) {
                Some(ScrapeOutcome::Present(text)) => pages.push((url.clone(), text)),
                Some(ScrapeOutcome::Absent { reason }) => {
                    log.push(format!("Skipping {url}: scrape failed ({reason})"));
                }
                None => log.push(format!("Skipping {url}: not scraped")),
            }
        }

        log.stage("Summarizing", "Running summarizer...");
        let mut summaries = Vec::with_capacity(pages.len());
        for (url, text) in pages {
            let summary = self.deps.summarizer.summarize(&text, &url).await?;
            summaries.push((url, summary));
        }

        Ok(summaries)
    }

    // -----------------------------------------------------------------------
    // Stage 3: classify
    // -----------------------------------------------------------------------

    async fn classify(
        &self,
        summaries: &[(String, String)],
        log: &mut RunLog<'_>,
    ) -> Result<ClassifiedMap> {
        log.stage("Classifying", "Running classifier...");
        let mut classified = ClassifiedMap::new();

        for (url, summary) in summaries {
            log.push(format!("\nURL: {url}"));
            log.push(format!("Summary:\n{summary}"));

            let items = self.deps.classifier.classify(summary, url).await?;
            for item in &items {
                log.push(publisher::bullet(item));
            }

            let domain = domain_key(url);
            if classified.insert(domain.clone(), items).is_some() {
                warn!(%domain, %url, "domain already classified, keeping latest");
            }
        }

        Ok(classified)
    }

    // -----------------------------------------------------------------------
    // Stage 4: landing pages
    // -----------------------------------------------------------------------

    async fn watch_landing_pages(
        &self,
        urls: &[String],
        log: &mut RunLog<'_>,
    ) -> IndexMap<String, LandingPageResult> {
        log.stage("Landing pages", "Running landing page change detector...");
        let mut reported = self.deps.landing.check(urls).await;

        let mut results = IndexMap::with_capacity(urls.len());
        for url in urls {
            let result = reported
                .shift_remove(url)
                .unwrap_or_else(|| LandingPageResult::Failed {
                    reason: "no result reported".into(),
                });

            log.push(format!("\nChecking landing page: {url}"));
            match &result {
                LandingPageResult::Changed { diff } => {
                    log.push("Messaging changes detected:");
                    for line in diff {
                        log.push(line.clone());
                    }
                }
                LandingPageResult::NoChange {} => {
                    log.push("No messaging changes since last check.");
                }
                LandingPageResult::Failed { reason } => {
                    log.push(format!("Failed to check {url}: {reason}"));
                }
            }

            results.insert(url.clone(), result);
        }

        results
    }

    // -----------------------------------------------------------------------
    // Stages 5–6: social collection
    // -----------------------------------------------------------------------

    async fn collect_tweets(
        &self,
        urls: &[String],
        overrides: &HandleOverrides,
        agg: &mut Aggregate,
        log: &mut RunLog<'_>,
    ) {
        log.stage("Twitter", "Running Twitter collector...");

        for url in urls {
            let mut tweets = Vec::new();

            match resolver::resolve(url, overrides, self.deps.twitter_discovery.as_ref()).await {
                Some(resolved) => {
                    log.push(format!(
                        "From {url} -> found Twitter: @{}{}",
                        resolved.handle,
                        source_note(resolved.source)
                    ));
                    match self
                        .deps
                        .tweets
                        .collect(&resolved.handle, self.options.max_tweets)
                        .await
                    {
                        Ok(collected) => {
                            tweets = collected;
                            tweets.truncate(self.options.max_tweets);
                            for (i, tweet) in tweets.iter().enumerate() {
                                log.push(format!(
                                    "Tweet {}:\n{tweet}\n{}",
                                    i + 1,
                                    "-".repeat(SEPARATOR_WIDTH)
                                ));
                            }
                        }
                        Err(e) => {
                            warn!(%url, handle = %resolved.handle, error = %e, "tweet collection failed");
                            log.push(format!(
                                "Could not collect tweets for @{}: {e}",
                                resolved.handle
                            ));
                        }
                    }
                }
                None => log.push(format!("No Twitter handle found on {url}")),
            }

            agg.tweets.insert(url.clone(), tweets);
        }
    }

    async fn collect_videos(
        &self,
        urls: &[String],
        overrides: &HandleOverrides,
        agg: &mut Aggregate,
        log: &mut RunLog<'_>,
    ) {
        log.stage("YouTube", "Running YouTube collector...");

        for url in urls {
            let mut videos = Vec::new();

            match resolver::resolve(url, overrides, self.deps.youtube_discovery.as_ref()).await {
                Some(resolved) => {
                    log.push(format!(
                        "From {url} -> found YouTube: {}{}",
                        resolved.handle,
                        source_note(resolved.source)
                    ));
                    match self
                        .deps
                        .videos
                        .collect(&resolved.handle, self.options.max_videos)
                        .await
                    {
                        Ok(collected) => {
                            videos = collected;
                            videos.truncate(self.options.max_videos);
                            for (i, video) in videos.iter().enumerate() {
                                log.push(format!("\nVideo {}: {}", i + 1, video.title));
                                log.push(video.url.clone());
                                log.push(format!(
                                    "Description: {}...",
                                    preview(&video.description, self.options.description_preview_chars)
                                ));
                                log.push("Comments:");
                                for comment in &video.comments {
                                    log.push(format!(" - {comment}"));
                                }
                                log.push("-".repeat(SEPARATOR_WIDTH));
                            }
                        }
                        Err(e) => {
                            warn!(%url, channel = %resolved.handle, error = %e, "video collection failed");
                            log.push(format!(
                                "Could not collect videos for {}: {e}",
                                resolved.handle
                            ));
                        }
                    }
                }
                None => log.push(format!("No YouTube channel found on {url}")),
            }

            agg.youtube.insert(url.clone(), videos);
        }
    }

    // -----------------------------------------------------------------------
    // Stage 7: publish
    // -----------------------------------------------------------------------

    async fn publish(
        &self,
        classified: &ClassifiedMap,
        log: &mut RunLog<'_>,
    ) -> Result<PublishStatus> {
        let Some(store) = &self.deps.knowledge_store else {
            log.stage("Publishing", "Knowledge store publishing skipped");
            return Ok(PublishStatus::Skipped);
        };

        log.stage("Publishing", "Pushing insights to knowledge store...");
        let status =
            publisher::publish_all(store.as_ref(), classified, self.options.publish_fail_fast)
                .await?;

        match &status {
            PublishStatus::Partial { failed } => log.push(format!(
                "Updates pushed to knowledge store, failed for: {}",
                failed.join(", ")
            )),
            _ => log.push(format!(
                "Updates pushed to knowledge store ({} domain(s))",
                classified.len()
            )),
        }

        Ok(status)
    }
}

fn source_note(source: HandleSource) -> &'static str {
    match source {
        HandleSource::Override => " (override)",
        HandleSource::Discovered => "",
    }
}

/// First `max_chars` characters of `text`.
fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tracktect_shared::{ClassifiedItem, TracktectError, Tweet, Video};
    use uuid::Uuid;

    use crate::collaborators::{
        Classifier, HandleDiscovery, KnowledgeStore, LandingChecker, RunRecorder, Scraper,
        Summarizer, TweetSource, VideoSource,
    };

    // -- Stubs ---------------------------------------------------------------

    struct StubScraper(HashMap<String, String>);

    #[async_trait]
    impl Scraper for StubScraper {
        async fn scrape(&self, urls: &[String]) -> IndexMap<String, ScrapeOutcome> {
            urls.iter()
                .filter_map(|u| {
                    self.0
                        .get(u)
                        .map(|text| (u.clone(), ScrapeOutcome::Present(text.clone())))
                })
                .collect()
        }
    }

    struct StubSummarizer;

    #[async_trait]
    impl Summarizer for StubSummarizer {
        async fn summarize(&self, text: &str, _url: &str) -> Result<String> {
            let mut chars = text.chars();
            let first = chars.next().map(|c| c.to_uppercase().collect::<String>());
            Ok(format!("{}{} summary", first.unwrap_or_default(), chars.as_str()))
        }
    }

    struct StubClassifier;

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn classify(&self, _summary: &str, _url: &str) -> Result<Vec<ClassifiedItem>> {
            Ok(vec![ClassifiedItem::new("Product", "X")])
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl Classifier for FailingClassifier {
        async fn classify(&self, _summary: &str, _url: &str) -> Result<Vec<ClassifiedItem>> {
            Err(TracktectError::Llm("model unavailable".into()))
        }
    }

    struct StubLanding(IndexMap<String, LandingPageResult>);

    #[async_trait]
    impl LandingChecker for StubLanding {
        async fn check(&self, _urls: &[String]) -> IndexMap<String, LandingPageResult> {
            self.0.clone()
        }
    }

    /// Discovery stub returning a fixed answer and recording calls.
    #[derive(Default)]
    struct StubDiscovery {
        answers: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HandleDiscovery for StubDiscovery {
        async fn discover(&self, url: &str) -> Option<String> {
            self.calls.lock().unwrap().push(url.to_string());
            self.answers.get(url).cloned()
        }
    }

    struct StubTweets;

    #[async_trait]
    impl TweetSource for StubTweets {
        async fn collect(&self, handle: &str, max: usize) -> Result<Vec<Tweet>> {
            if handle == "broken" {
                return Err(TracktectError::Network("HTTP 429".into()));
            }
            Ok((1..=10)
                .map(|i| Tweet(format!("{handle} post {i}")))
                .take(max)
                .collect())
        }
    }

    struct StubVideos;

    #[async_trait]
    impl VideoSource for StubVideos {
        async fn collect(&self, channel: &str, _max: usize) -> Result<Vec<Video>> {
            Ok(vec![Video {
                title: format!("{channel} launch"),
                url: "https://www.youtube.com/watch?v=1".into(),
                description: "é".repeat(300),
                comments: vec!["Nice".into()],
            }])
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        pushed: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl KnowledgeStore for RecordingStore {
        async fn append_update(&self, title: &str, content: &str) -> Result<()> {
            if self.fail {
                return Err(TracktectError::Network("HTTP 401".into()));
            }
            self.pushed
                .lock()
                .unwrap()
                .push((title.to_string(), content.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingRuns(Mutex<Vec<String>>);

    #[async_trait]
    impl RunRecorder for RecordingRuns {
        async fn run_started(&self, _run_id: &str, url_count: usize) -> Result<()> {
            self.0.lock().unwrap().push(format!("started:{url_count}"));
            Ok(())
        }
        async fn run_finished(&self, _run_id: &str, status: &str) -> Result<()> {
            self.0.lock().unwrap().push(format!("finished:{status}"));
            Ok(())
        }
    }

    // -- Fixtures ------------------------------------------------------------

    struct Fixture {
        deps: Collaborators,
        twitter_discovery: Arc<StubDiscovery>,
        youtube_discovery: Arc<StubDiscovery>,
        store: Arc<RecordingStore>,
        runs: Arc<RecordingRuns>,
        artifact_path: PathBuf,
    }

    fn fixture(scraped: &[(&str, &str)]) -> Fixture {
        let twitter_discovery = Arc::new(StubDiscovery::default());
        let youtube_discovery = Arc::new(StubDiscovery::default());
        let store = Arc::new(RecordingStore::default());
        let runs = Arc::new(RecordingRuns::default());

        let deps = Collaborators {
            scraper: Arc::new(StubScraper(
                scraped
                    .iter()
                    .map(|(u, t)| (u.to_string(), t.to_string()))
                    .collect(),
            )),
            summarizer: Arc::new(StubSummarizer),
            classifier: Arc::new(StubClassifier),
            landing: Arc::new(StubLanding(IndexMap::new())),
            twitter_discovery: twitter_discovery.clone(),
            youtube_discovery: youtube_discovery.clone(),
            tweets: Arc::new(StubTweets),
            videos: Arc::new(StubVideos),
            knowledge_store: Some(store.clone()),
            run_recorder: Some(runs.clone()),
        };

        Fixture {
            deps,
            twitter_discovery,
            youtube_discovery,
            store,
            runs,
            artifact_path: std::env::temp_dir()
                .join(format!("tt-pipeline-{}", Uuid::now_v7()))
                .join("output")
                .join("classified_results.json"),
        }
    }

    fn options(artifact_path: &PathBuf) -> PipelineOptions {
        PipelineOptions {
            artifact_path: artifact_path.clone(),
            max_tweets: 5,
            max_videos: 5,
            description_preview_chars: 200,
            publish_fail_fast: true,
        }
    }

    fn input(urls: &[&str]) -> PipelineInput {
        PipelineInput {
            urls: urls.iter().map(|u| u.to_string()).collect(),
            ..Default::default()
        }
    }

    fn cleanup(path: &PathBuf) {
        let _ = std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap());
    }

    // -- Tests ---------------------------------------------------------------

    #[tokio::test]
    async fn single_url_end_to_end() {
        let fx = fixture(&[("https://a.com", "hello")]);
        let pipeline = Pipeline::new(fx.deps.clone(), options(&fx.artifact_path));

        let result = pipeline
            .run(&input(&["https://a.com"]), &SilentProgress)
            .await
            .expect("run");

        let artifact: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&fx.artifact_path).unwrap()).unwrap();
        assert_eq!(
            artifact,
            serde_json::json!({"a_com": [{"category": "Product", "text": "X"}]})
        );

        assert_eq!(result.tweets["https://a.com"], Vec::<Tweet>::new());
        assert_eq!(result.youtube["https://a.com"], Vec::<Video>::new());
        assert!(result
            .log_lines
            .contains(&"No Twitter handle found on https://a.com".to_string()));
        assert!(result
            .log_lines
            .contains(&"No YouTube channel found on https://a.com".to_string()));
        assert!(result.log_lines.contains(&"\nURL: https://a.com".to_string()));
        assert!(result
            .log_lines
            .contains(&"Summary:\nHello summary".to_string()));
        assert!(result.log_lines.contains(&"- [Product] X".to_string()));
        assert_eq!(result.notion_status, PublishStatus::Success);

        let pushed = fx.store.pushed.lock().unwrap().clone();
        assert_eq!(
            pushed,
            vec![(
                "a_com".to_string(),
                "a.com — Latest classified updates:\n- [Product] X".to_string()
            )]
        );
        assert_eq!(
            *fx.runs.0.lock().unwrap(),
            vec!["started:1".to_string(), "finished:success".to_string()]
        );

        cleanup(&fx.artifact_path);
    }

    #[tokio::test]
    async fn every_url_gets_social_entries_even_when_scrape_fails() {
        let fx = fixture(&[("https://a.com", "alpha")]);
        let pipeline = Pipeline::new(fx.deps.clone(), options(&fx.artifact_path));

        let result = pipeline
            .run(&input(&["https://a.com", "https://b.com/x"]), &SilentProgress)
            .await
            .unwrap();

        let tweet_keys: Vec<&String> = result.tweets.keys().collect();
        let video_keys: Vec<&String> = result.youtube.keys().collect();
        assert_eq!(tweet_keys, vec!["https://a.com", "https://b.com/x"]);
        assert_eq!(video_keys, tweet_keys);

        let domains: Vec<&String> = result.classified.keys().collect();
        assert_eq!(domains, vec!["a_com"]);
        assert!(result
            .log_lines
            .contains(&"Skipping https://b.com/x: not scraped".to_string()));

        // Landing results cover the original input even without collaborator output.
        assert_eq!(result.landing_changes.len(), 2);

        cleanup(&fx.artifact_path);
    }

    #[tokio::test]
    async fn override_skips_discovery_for_that_url_only() {
        let mut fx = fixture(&[]);
        let twitter_discovery = Arc::new(StubDiscovery {
            answers: HashMap::from([("https://b.com".to_string(), "bee".to_string())]),
            calls: Mutex::new(Vec::new()),
        });
        fx.deps.twitter_discovery = twitter_discovery.clone();
        let pipeline = Pipeline::new(fx.deps.clone(), options(&fx.artifact_path));

        let mut run_input = input(&["https://a.com", "https://b.com"]);
        run_input
            .twitter_overrides
            .insert("https://a.com".into(), "acme".into());
        run_input
            .youtube_overrides
            .insert("https://b.com".into(), "https://www.youtube.com/@bee".into());

        let result = pipeline.run(&run_input, &SilentProgress).await.unwrap();

        assert_eq!(*twitter_discovery.calls.lock().unwrap(), vec!["https://b.com"]);
        assert_eq!(*fx.youtube_discovery.calls.lock().unwrap(), vec!["https://a.com"]);
        assert!(fx.twitter_discovery.calls.lock().unwrap().is_empty());

        assert_eq!(result.tweets["https://a.com"].len(), 5);
        assert_eq!(result.tweets["https://a.com"][0], Tweet("acme post 1".into()));
        assert_eq!(result.tweets["https://b.com"][0], Tweet("bee post 1".into()));
        assert!(result
            .log_lines
            .contains(&"From https://a.com -> found Twitter: @acme (override)".to_string()));
        assert!(result
            .log_lines
            .contains(&"From https://b.com -> found Twitter: @bee".to_string()));

        let videos = &result.youtube["https://b.com"];
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].description.chars().count(), 300);
        let preview_line = format!("Description: {}...", "é".repeat(200));
        assert!(result.log_lines.contains(&preview_line));

        cleanup(&fx.artifact_path);
    }

    #[tokio::test]
    async fn social_collection_errors_do_not_abort() {
        let fx = fixture(&[]);
        let pipeline = Pipeline::new(fx.deps.clone(), options(&fx.artifact_path));

        let mut run_input = input(&["https://a.com"]);
        run_input
            .twitter_overrides
            .insert("https://a.com".into(), "broken".into());

        let result = pipeline.run(&run_input, &SilentProgress).await.unwrap();
        assert!(result.tweets["https://a.com"].is_empty());
        assert!(result
            .log_lines
            .iter()
            .any(|l| l.starts_with("Could not collect tweets for @broken")));

        cleanup(&fx.artifact_path);
    }

    #[tokio::test]
    async fn landing_failures_are_logged_with_reason() {
        let mut fx = fixture(&[]);
        fx.deps.landing = Arc::new(StubLanding(IndexMap::from([
            (
                "https://a.com".to_string(),
                LandingPageResult::Failed {
                    reason: "HTTP 503".into(),
                },
            ),
            (
                "https://b.com".to_string(),
                LandingPageResult::Changed {
                    diff: vec!["- Old".into(), "+ New".into()],
                },
            ),
        ])));
        let pipeline = Pipeline::new(fx.deps.clone(), options(&fx.artifact_path));

        let result = pipeline
            .run(&input(&["https://a.com", "https://b.com"]), &SilentProgress)
            .await
            .unwrap();

        let logs = &result.log_lines;
        let a = logs
            .iter()
            .position(|l| l == "\nChecking landing page: https://a.com")
            .unwrap();
        assert_eq!(logs[a + 1], "Failed to check https://a.com: HTTP 503");
        assert_ne!(logs[a + 1], "Messaging changes detected:");

        let b = logs
            .iter()
            .position(|l| l == "\nChecking landing page: https://b.com")
            .unwrap();
        assert_eq!(
            &logs[b + 1..b + 4],
            &["Messaging changes detected:", "- Old", "+ New"]
        );

        cleanup(&fx.artifact_path);
    }

    #[tokio::test]
    async fn classifier_error_aborts_run() {
        let mut fx = fixture(&[("https://a.com", "alpha")]);
        fx.deps.classifier = Arc::new(FailingClassifier);
        let pipeline = Pipeline::new(fx.deps.clone(), options(&fx.artifact_path));

        let err = pipeline
            .run(&input(&["https://a.com"]), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, TracktectError::Llm(_)));
        assert!(!fx.artifact_path.exists());
        assert_eq!(
            fx.runs.0.lock().unwrap().last().map(String::as_str),
            Some("finished:failed")
        );
    }

    #[tokio::test]
    async fn publish_failure_is_fatal_by_default() {
        let mut fx = fixture(&[("https://a.com", "alpha")]);
        fx.deps.knowledge_store = Some(Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        }));
        let pipeline = Pipeline::new(fx.deps.clone(), options(&fx.artifact_path));

        let err = pipeline
            .run(&input(&["https://a.com"]), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, TracktectError::Publish { .. }));
        // The artifact is written before publishing.
        assert!(fx.artifact_path.exists());

        cleanup(&fx.artifact_path);
    }

    #[tokio::test]
    async fn publish_failure_isolated_when_fail_fast_off() {
        let mut fx = fixture(&[("https://a.com", "alpha")]);
        fx.deps.knowledge_store = Some(Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        }));
        let mut opts = options(&fx.artifact_path);
        opts.publish_fail_fast = false;
        let pipeline = Pipeline::new(fx.deps.clone(), opts);

        let result = pipeline
            .run(&input(&["https://a.com"]), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(
            result.notion_status,
            PublishStatus::Partial {
                failed: vec!["a_com".into()]
            }
        );
        assert_eq!(
            fx.runs.0.lock().unwrap().last().map(String::as_str),
            Some("finished:partial")
        );

        cleanup(&fx.artifact_path);
    }

    #[tokio::test]
    async fn no_store_means_skipped() {
        let mut fx = fixture(&[]);
        fx.deps.knowledge_store = None;
        let pipeline = Pipeline::new(fx.deps.clone(), options(&fx.artifact_path));

        let result = pipeline
            .run(&input(&["https://a.com"]), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(result.notion_status, PublishStatus::Skipped);

        cleanup(&fx.artifact_path);
    }

    #[tokio::test]
    async fn log_is_identical_across_runs() {
        let fx = fixture(&[("https://a.com", "alpha"), ("https://b.com", "beta")]);
        let pipeline = Pipeline::new(fx.deps.clone(), options(&fx.artifact_path));
        let urls = input(&["https://b.com", "https://a.com", "https://b.com"]);

        let first = pipeline.run(&urls, &SilentProgress).await.unwrap();
        let second = pipeline.run(&urls, &SilentProgress).await.unwrap();

        assert_eq!(first.log_lines, second.log_lines);
        assert_ne!(first.run_id, second.run_id);

        // Duplicates collapse; order follows first appearance.
        let keys: Vec<&String> = first.tweets.keys().collect();
        assert_eq!(keys, vec!["https://b.com", "https://a.com"]);
        let domains: Vec<&String> = first.classified.keys().collect();
        assert_eq!(domains, vec!["b_com", "a_com"]);

        cleanup(&fx.artifact_path);
    }

    #[tokio::test]
    async fn empty_input_runs_to_empty_result() {
        let fx = fixture(&[]);
        let pipeline = Pipeline::new(fx.deps.clone(), options(&fx.artifact_path));

        let result = pipeline.run(&input(&[]), &SilentProgress).await.unwrap();

        assert!(result.classified.is_empty());
        assert!(result.landing_changes.is_empty());
        assert!(result.tweets.is_empty());
        assert!(result.youtube.is_empty());
        assert_eq!(result.notion_status, PublishStatus::Success);
        assert_eq!(std::fs::read_to_string(&fx.artifact_path).unwrap(), "{}");
        assert!(fx.store.pushed.lock().unwrap().is_empty());

        cleanup(&fx.artifact_path);
    }

    #[tokio::test]
    async fn urls_are_used_verbatim_as_keys() {
        let fx = fixture(&[]);
        let pipeline = Pipeline::new(fx.deps.clone(), options(&fx.artifact_path));

        let mut run_input = input(&["https://a.com ", "https://a.com", "https://a.com"]);
        run_input
            .twitter_overrides
            .insert("https://a.com ".into(), "spaced".into());

        let result = pipeline.run(&run_input, &SilentProgress).await.unwrap();

        let keys: Vec<&String> = result.tweets.keys().collect();
        assert_eq!(keys, vec!["https://a.com ", "https://a.com"]);
        assert_eq!(result.tweets["https://a.com "][0], Tweet("spaced post 1".into()));
        assert!(result.tweets["https://a.com"].is_empty());
        assert_eq!(*fx.twitter_discovery.calls.lock().unwrap(), vec!["https://a.com"]);

        cleanup(&fx.artifact_path);
    }

    #[test]
    fn preview_is_char_safe() {
        assert_eq!(preview("héllo", 2), "hé");
        assert_eq!(preview("hi", 200), "hi");
    }
}
