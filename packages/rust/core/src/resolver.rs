//! Per-URL platform handle resolution.
//!
//! A non-empty override for the URL wins outright and discovery is never
//! called for it. Otherwise the platform's discovery probe is asked.

use tracktect_shared::HandleOverrides;

use crate::collaborators::HandleDiscovery;

/// Where a resolved handle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleSource {
    Override,
    Discovered,
}

/// A handle ready to be handed to a social collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHandle {
    pub handle: String,
    pub source: HandleSource,
}

/// Resolve the handle for `url`: override map first, then discovery.
pub async fn resolve(
    url: &str,
    overrides: &HandleOverrides,
    discovery: &dyn HandleDiscovery,
) -> Option<ResolvedHandle> {
    if let Some(pinned) = overrides.get(url).map(|h| h.trim()).filter(|h| !h.is_empty()) {
        return Some(ResolvedHandle {
            handle: pinned.to_string(),
            source: HandleSource::Override,
        });
    }

    discovery
        .discover(url)
        .await
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .map(|handle| ResolvedHandle {
            handle,
            source: HandleSource::Discovered,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Discovery stub that records every URL it is asked about.
    struct RecordingDiscovery {
        answer: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingDiscovery {
        fn new(answer: Option<&str>) -> Self {
            Self {
                answer: answer.map(String::from),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HandleDiscovery for RecordingDiscovery {
        async fn discover(&self, url: &str) -> Option<String> {
            self.calls.lock().unwrap().push(url.to_string());
            self.answer.clone()
        }
    }

    fn overrides(pairs: &[(&str, &str)]) -> HandleOverrides {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn override_bypasses_discovery() {
        let discovery = RecordingDiscovery::new(Some("discovered"));
        let map = overrides(&[("https://a.com", "pinned")]);

        let resolved = resolve("https://a.com", &map, &discovery).await;

        assert_eq!(
            resolved,
            Some(ResolvedHandle {
                handle: "pinned".into(),
                source: HandleSource::Override
            })
        );
        assert!(discovery.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_override_falls_back_to_discovery() {
        let discovery = RecordingDiscovery::new(Some("found"));
        let map = overrides(&[("https://a.com", "  ")]);

        let resolved = resolve("https://a.com", &map, &discovery).await.unwrap();

        assert_eq!(resolved.handle, "found");
        assert_eq!(resolved.source, HandleSource::Discovered);
        assert_eq!(discovery.calls(), vec!["https://a.com"]);
    }

    #[tokio::test]
    async fn missing_everywhere_is_none() {
        let discovery = RecordingDiscovery::new(None);
        let map = overrides(&[("https://other.com", "x")]);

        assert_eq!(resolve("https://a.com", &map, &discovery).await, None);
        assert_eq!(discovery.calls(), vec!["https://a.com"]);
    }
}
