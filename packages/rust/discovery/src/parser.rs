//! Social profile link extraction from homepage HTML.
//!
//! Scans every `<a href>` (resolved against the page URL) and returns the
//! first link that points at a real profile:
//! - Twitter/X: `twitter.com/<handle>` or `x.com/<handle>`, skipping
//!   intent/share/search style paths
//! - YouTube: `youtube.com/@name`, `/channel/<id>`, `/c/<name>`, `/user/<name>`

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Valid Twitter/X handle: 1–15 word characters.
static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,15}$").expect("handle regex"));

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector"));

/// First-path-segment values on twitter.com/x.com that are not profiles.
const TWITTER_RESERVED: &[&str] = &[
    "intent", "share", "home", "i", "search", "hashtag", "login", "signup", "explore",
    "privacy", "tos", "settings", "messages", "notifications",
];

const TWITTER_HOSTS: &[&str] = &[
    "twitter.com",
    "www.twitter.com",
    "mobile.twitter.com",
    "x.com",
    "www.x.com",
];

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com"];

/// Find the first Twitter/X handle linked from `html` (without the `@`).
pub fn find_twitter_handle(html: &str, base: &Url) -> Option<String> {
    resolved_links(html, base).find_map(|link| twitter_handle_from_url(&link))
}

/// Find the first YouTube channel linked from `html`, as a canonical channel URL.
pub fn find_youtube_channel(html: &str, base: &Url) -> Option<String> {
    resolved_links(html, base).find_map(|link| youtube_channel_from_url(&link))
}

/// Extract the handle from a profile URL, if it is one.
pub fn twitter_handle_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    if !TWITTER_HOSTS.contains(&host.as_str()) {
        return None;
    }

    let first = url.path_segments()?.next()?;
    let first = first.trim_start_matches('@');
    if TWITTER_RESERVED.contains(&first.to_ascii_lowercase().as_str()) {
        return None;
    }

    HANDLE_RE.is_match(first).then(|| first.to_string())
}

/// Normalize a YouTube channel link to `https://www.youtube.com/<channel path>`.
pub fn youtube_channel_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return None;
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let first = segments.next()?;

    let path = if first.starts_with('@') && first.len() > 1 {
        first.to_string()
    } else if matches!(first, "channel" | "c" | "user") {
        format!("{first}/{}", segments.next()?)
    } else {
        return None;
    };

    Some(format!("https://www.youtube.com/{path}"))
}

fn resolved_links<'a>(html: &'a str, base: &'a Url) -> impl Iterator<Item = Url> + 'a {
    let doc = Html::parse_document(html);
    let hrefs: Vec<String> = doc
        .select(&ANCHOR_SEL)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_string)
        .collect();

    hrefs.into_iter().filter_map(move |href| base.join(href.trim()).ok())
}
