//! Notion knowledge store.
//!
//! Each update is appended to a parent page as a `heading_2` block followed
//! by one block per content line: `- ` lines become bulleted list items,
//! everything else a paragraph.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use tracktect_shared::{NotionConfig, Result, TracktectError, domain_title};

use crate::collaborators::KnowledgeStore;

const NOTION_VERSION: &str = "2022-06-28";

/// Notion caps rich-text content at this many characters.
const MAX_TEXT_CHARS: usize = 2000;

pub struct NotionClient {
    http: Client,
    token: String,
    parent_page_id: String,
    base_url: String,
}

impl NotionClient {
    pub fn new(
        token: impl Into<String>,
        parent_page_id: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TracktectError::Network(e.to_string()))?;

        Ok(Self {
            http,
            token: token.into(),
            parent_page_id: parent_page_id.into(),
            base_url: "https://api.notion.com/v1".to_string(),
        })
    }

    /// Build from config. Both the token and the parent page are required.
    pub fn from_config(config: &NotionConfig, timeout_secs: u64) -> Result<Self> {
        if config.parent_page_id.trim().is_empty() {
            return Err(TracktectError::config(
                "notion.parent_page_id is not set. Add it to the config file or run with --no-publish.",
            ));
        }
        let token = tracktect_shared::require_env(&config.token_env, "Notion integration token")?;
        Ok(Self::new(token, config.parent_page_id.trim(), timeout_secs)?
            .with_base_url(&config.base_url))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl KnowledgeStore for NotionClient {
    #[instrument(skip(self, content))]
    async fn append_update(&self, title: &str, content: &str) -> Result<()> {
        let url = format!("{}/blocks/{}/children", self.base_url, self.parent_page_id);
        let body = json!({ "children": update_blocks(title, content) });

        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| TracktectError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, error = %text, "Notion rejected update");
            return Err(TracktectError::Network(format!("Notion HTTP {status}: {text}")));
        }

        info!(title, "Notion update appended");
        Ok(())
    }
}

/// Blocks for one update: a heading, then one block per non-empty line.
pub fn update_blocks(title: &str, content: &str) -> Vec<Value> {
    let mut blocks = vec![block("heading_2", &domain_title(title))];

    for line in content.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
        match line.strip_prefix("- ") {
            Some(item) => blocks.push(block("bulleted_list_item", item)),
            None => blocks.push(block("paragraph", line)),
        }
    }

    blocks
}

fn block(kind: &str, text: &str) -> Value {
    let content: String = text.chars().take(MAX_TEXT_CHARS).collect();
    json!({
        "object": "block",
        "type": kind,
        kind: {
            "rich_text": [{ "type": "text", "text": { "content": content } }]
        }
    })
}
