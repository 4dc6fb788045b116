//! Core domain types for a TrackTect run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Domain keys
// ---------------------------------------------------------------------------

/// Turn a URL into a key-safe domain identifier.
///
/// The scheme is dropped, everything after the first `/` of the remainder is
/// dropped, and dots become underscores: `https://example.com/page` → `example_com`.
pub fn domain_key(url: &str) -> String {
    let rest = url.split_once("//").map(|(_, rest)| rest).unwrap_or(url);
    let host = rest.split('/').next().unwrap_or(rest);
    host.replace('.', "_")
}

/// Human-readable form of a domain key (`example_com` → `example.com`).
pub fn domain_title(key: &str) -> String {
    key.replace('_', ".")
}

// ---------------------------------------------------------------------------
// Per-stage values
// ---------------------------------------------------------------------------

/// Result of scraping one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// Extracted page text.
    Present(String),
    /// The page could not be scraped.
    Absent { reason: String },
}

impl ScrapeOutcome {
    pub fn absent(reason: impl Into<String>) -> Self {
        Self::Absent {
            reason: reason.into(),
        }
    }
}

/// One classified statement extracted from a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedItem {
    pub category: String,
    pub text: String,
}

impl ClassifiedItem {
    pub fn new(category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            text: text.into(),
        }
    }
}

/// Classified items grouped by domain key, in first-seen order.
pub type ClassifiedMap = IndexMap<String, Vec<ClassifiedItem>>;

/// Caller-supplied URL → handle table consulted before discovery.
pub type HandleOverrides = IndexMap<String, String>;

/// Outcome of a landing-page check for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LandingPageResult {
    /// Messaging differs from the previous snapshot.
    Changed { diff: Vec<String> },
    /// Messaging is identical to the previous snapshot (or this is the first one).
    NoChange {},
    /// The page could not be checked.
    Failed { reason: String },
}

/// A single collected post, kept as opaque text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tweet(pub String);

impl std::fmt::Display for Tweet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A collected video with its top comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub title: String,
    pub url: String,
    pub description: String,
    #[serde(default)]
    pub comments: Vec<String>,
}

// ---------------------------------------------------------------------------
// PipelineResult
// ---------------------------------------------------------------------------

/// Outcome of the knowledge-store publish stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishStatus {
    /// Every domain was pushed.
    Success,
    /// Publishing was disabled for this run.
    Skipped,
    /// Some domains failed; only reachable when fail-fast is off.
    Partial { failed: Vec<String> },
}

/// The terminal aggregate of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Identifier of this run.
    pub run_id: RunId,
    /// Human-readable progress log, in processing order.
    pub log_lines: Vec<String>,
    /// Classified items per domain key.
    pub classified: ClassifiedMap,
    /// Landing-page check result per input URL.
    pub landing_changes: IndexMap<String, LandingPageResult>,
    /// Collected posts per input URL (possibly empty).
    pub tweets: IndexMap<String, Vec<Tweet>>,
    /// Collected videos per input URL (possibly empty).
    pub youtube: IndexMap<String, Vec<Video>>,
    /// Knowledge-store publish outcome.
    pub notion_status: PublishStatus,
}
