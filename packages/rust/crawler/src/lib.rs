//! Page fetching, text extraction, and landing-page change detection.
//!
//! This crate provides:
//! - [`PageScraper`] — fetches a URL list and extracts readable page text
//! - [`LandingWatcher`] — diffs a page's messaging against its stored snapshot
//! - [`extract`] — HTML → text helpers shared by both

pub mod engine;
pub mod extract;
pub mod landing;

pub use engine::{Fetcher, PageScraper, compute_hash};
pub use landing::{LandingWatcher, diff_lines};
