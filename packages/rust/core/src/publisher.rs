//! Knowledge-store publishing.
//!
//! Each domain becomes one textual update: a title line followed by one
//! `- [category] text` bullet per classified item.

use tracing::{error, info};

use tracktect_shared::{
    ClassifiedItem, ClassifiedMap, PublishStatus, Result, TracktectError, domain_title,
};

use crate::collaborators::KnowledgeStore;

/// Suffix appended to the restored domain name in the title line.
pub const TITLE_SUFFIX: &str = " \u{2014} Latest classified updates:";

/// Render the update text for one domain key.
pub fn render_update(domain: &str, items: &[ClassifiedItem]) -> String {
    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(format!("{}{TITLE_SUFFIX}", domain_title(domain)));
    lines.extend(items.iter().map(bullet));
    lines.join("\n")
}

/// `- [category] text`
pub fn bullet(item: &ClassifiedItem) -> String {
    format!("- [{}] {}", item.category, item.text)
}

/// Push one update per domain, in mapping order.
///
/// With `fail_fast`, the first failure is returned and later domains are not
/// attempted; earlier pushes stay in place. Without it, failures are
/// collected and reported as [`PublishStatus::Partial`].
pub async fn publish_all(
    store: &dyn KnowledgeStore,
    classified: &ClassifiedMap,
    fail_fast: bool,
) -> Result<PublishStatus> {
    let mut failed = Vec::new();

    for (domain, items) in classified {
        let content = render_update(domain, items);
        match store.append_update(domain, &content).await {
            Ok(()) => info!(%domain, items = items.len(), "update published"),
            Err(e) if fail_fast => {
                error!(%domain, error = %e, "publish failed, aborting run");
                return Err(TracktectError::publish(domain.as_str(), e.to_string()));
            }
            Err(e) => {
                error!(%domain, error = %e, "publish failed, continuing");
                failed.push(domain.clone());
            }
        }
    }

    if failed.is_empty() {
        Ok(PublishStatus::Success)
    } else {
        Ok(PublishStatus::Partial { failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Store stub that fails for one title and records the rest.
    struct FlakyStore {
        fail_on: Option<String>,
        pushed: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl KnowledgeStore for FlakyStore {
        async fn append_update(&self, title: &str, content: &str) -> Result<()> {
            if self.fail_on.as_deref() == Some(title) {
                return Err(TracktectError::Network("HTTP 502".into()));
            }
            self.pushed
                .lock()
                .unwrap()
                .push((title.to_string(), content.to_string()));
            Ok(())
        }
    }

    fn classified() -> ClassifiedMap {
        let mut map = ClassifiedMap::new();
        map.insert(
            "a_com".into(),
            vec![
                ClassifiedItem::new("Product", "X"),
                ClassifiedItem::new("Pricing", "Y"),
            ],
        );
        map.insert("b_io".into(), vec![ClassifiedItem::new("Hiring", "Z")]);
        map.insert("c_dev".into(), vec![]);
        map
    }

    #[test]
    fn renders_title_and_bullets() {
        let text = render_update("www_a_com", &[ClassifiedItem::new("Product", "X")]);
        assert_eq!(
            text,
            "www.a.com — Latest classified updates:\n- [Product] X"
        );
    }

    #[tokio::test]
    async fn publishes_every_domain_in_order() {
        let store = FlakyStore {
            fail_on: None,
            pushed: Mutex::new(Vec::new()),
        };
        let status = publish_all(&store, &classified(), true).await.unwrap();
        assert_eq!(status, PublishStatus::Success);

        let pushed = store.pushed.lock().unwrap();
        let titles: Vec<&str> = pushed.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(titles, vec!["a_com", "b_io", "c_dev"]);
        assert_eq!(pushed[2].1, "c.dev — Latest classified updates:");
    }

    #[tokio::test]
    async fn fail_fast_stops_after_partial_pushes() {
        let store = FlakyStore {
            fail_on: Some("b_io".into()),
            pushed: Mutex::new(Vec::new()),
        };
        let err = publish_all(&store, &classified(), true).await.unwrap_err();
        assert!(matches!(err, TracktectError::Publish { ref domain, .. } if domain == "b_io"));
        assert_eq!(store.pushed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn isolated_failures_report_partial() {
        let store = FlakyStore {
            fail_on: Some("b_io".into()),
            pushed: Mutex::new(Vec::new()),
        };
        let status = publish_all(&store, &classified(), false).await.unwrap();
        assert_eq!(
            status,
            PublishStatus::Partial {
                failed: vec!["b_io".into()]
            }
        );
        assert_eq!(store.pushed.lock().unwrap().len(), 2);
    }
}
