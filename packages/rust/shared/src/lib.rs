//! Shared types, error model, and configuration for TrackTect.
//!
//! This crate is the foundation depended on by all other TrackTect crates.
//! It provides:
//! - [`TracktectError`] — the unified error type
//! - Domain types ([`ClassifiedItem`], [`LandingPageResult`], [`Video`], [`PipelineResult`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, HttpConfig, NotionConfig, OpenRouterConfig, OverridesConfig,
    PublishConfig, SocialConfig, config_dir, config_file_path, init_config, init_config_at,
    load_config, load_config_from, require_env,
};
pub use error::{Result, TracktectError};
pub use types::{
    ClassifiedItem, ClassifiedMap, HandleOverrides, LandingPageResult, PipelineResult,
    PublishStatus, RunId, ScrapeOutcome, Tweet, Video, domain_key, domain_title,
};
