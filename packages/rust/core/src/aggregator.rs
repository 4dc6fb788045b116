//! Run aggregation and the classification artifact.
//!
//! [`Aggregate`] collects the per-stage mappings of one run and turns them
//! into the final [`PipelineResult`]. The classification mapping is also the
//! single artifact persisted to disk: pretty-printed UTF-8 JSON with
//! non-ASCII text left unescaped, overwritten on every run.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::info;

use tracktect_shared::{
    ClassifiedMap, LandingPageResult, PipelineResult, PublishStatus, Result, RunId,
    TracktectError, Tweet, Video,
};

/// Stage outputs accumulated during a run.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub classified: ClassifiedMap,
    pub landing_changes: IndexMap<String, LandingPageResult>,
    pub tweets: IndexMap<String, Vec<Tweet>>,
    pub youtube: IndexMap<String, Vec<Video>>,
}

impl Aggregate {
    /// Assemble the terminal result. Mappings are passed through untouched.
    pub fn into_result(
        self,
        run_id: RunId,
        log_lines: Vec<String>,
        notion_status: PublishStatus,
    ) -> PipelineResult {
        PipelineResult {
            run_id,
            log_lines,
            classified: self.classified,
            landing_changes: self.landing_changes,
            tweets: self.tweets,
            youtube: self.youtube,
            notion_status,
        }
    }
}

/// Write the classification mapping to `path`, creating parent directories.
///
/// Returns the absolute path written.
pub fn write_classified(path: &Path, classified: &ClassifiedMap) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TracktectError::io(parent, e))?;
    }

    // serde_json's pretty printer indents by two spaces and emits UTF-8 as-is.
    let json = serde_json::to_string_pretty(classified)
        .map_err(|e| TracktectError::validation(format!("failed to serialize results: {e}")))?;
    std::fs::write(path, json).map_err(|e| TracktectError::io(path, e))?;

    let written = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    info!(path = %written.display(), domains = classified.len(), "classification artifact written");
    Ok(written)
}

/// Read a classification artifact back.
pub fn read_classified(path: &Path) -> Result<ClassifiedMap> {
    let content = std::fs::read_to_string(path).map_err(|e| TracktectError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| TracktectError::parse(format!("{}: {e}", path.display())))
}
