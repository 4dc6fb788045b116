//! Landing-page change detection.
//!
//! Each check fetches the page independently of the scraper, extracts its
//! messaging lines, diffs them against the last stored snapshot, and then
//! replaces the snapshot. A page seen for the first time reports no change.

use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use similar::{ChangeTag, TextDiff};
use tracing::{info, instrument, warn};

use tracktect_shared::{LandingPageResult, Result};
use tracktect_storage::{LandingSnapshot, Storage};

use crate::engine::{Fetcher, compute_hash};
use crate::extract;

/// Watches landing pages for messaging changes between runs.
pub struct LandingWatcher {
    fetcher: Fetcher,
    storage: Arc<Storage>,
}

impl LandingWatcher {
    pub fn new(fetcher: Fetcher, storage: Arc<Storage>) -> Self {
        Self { fetcher, storage }
    }

    /// Check every URL, in input order. Failures are reported per URL.
    #[instrument(skip_all, fields(urls = urls.len()))]
    pub async fn run(&self, urls: &[String]) -> IndexMap<String, LandingPageResult> {
        let mut results = IndexMap::with_capacity(urls.len());

        for url in urls {
            if results.contains_key(url) {
                continue;
            }
            let result = match self.check(url).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(%url, error = %e, "landing check failed");
                    LandingPageResult::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            results.insert(url.clone(), result);
        }

        let changed = results
            .values()
            .filter(|r| matches!(r, LandingPageResult::Changed { .. }))
            .count();
        info!(changed, checked = results.len(), "landing checks completed");

        results
    }

    async fn check(&self, url: &str) -> Result<LandingPageResult> {
        let html = self.fetcher.fetch_html(url).await?;
        let lines = extract::messaging_lines(&html);
        let content_hash = compute_hash(&lines.join("\n"));

        let previous = self.storage.get_snapshot(url).await?;

        let result = match &previous {
            Some(prev) if prev.content_hash != content_hash => LandingPageResult::Changed {
                diff: diff_lines(&prev.lines, &lines),
            },
            _ => LandingPageResult::NoChange {},
        };

        if previous.as_ref().is_none_or(|p| p.content_hash != content_hash) {
            self.storage
                .upsert_snapshot(&LandingSnapshot {
                    url: url.to_string(),
                    lines,
                    content_hash,
                    captured_at: Utc::now(),
                })
                .await?;
        }

        Ok(result)
    }
}

/// Line diff between two snapshots: removed lines as `- …`, added as `+ …`.
pub fn diff_lines(old: &[String], new: &[String]) -> Vec<String> {
    let old_text = old.join("\n");
    let new_text = new.join("\n");
    let diff = TextDiff::from_lines(&old_text, &new_text);

    diff.iter_all_changes()
        .filter_map(|change| {
            let line = change.value().trim_end_matches('\n');
            match change.tag() {
                ChangeTag::Delete => Some(format!("- {line}")),
                ChangeTag::Insert => Some(format!("+ {line}")),
                ChangeTag::Equal => None,
            }
        })
        .collect()
}
