//! OpenRouter-backed summarizer and classifier.
//!
//! Both talk to the OpenAI-compatible `/chat/completions` endpoint and take
//! the first choice's message content as the answer.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use tracktect_shared::{ClassifiedItem, OpenRouterConfig, Result, TracktectError};

use crate::collaborators::{Classifier, Summarizer};

/// Page text beyond this many characters is not sent to the model.
const MAX_INPUT_CHARS: usize = 12_000;

const SUMMARIZE_PROMPT: &str = "You summarize company web pages for a competitive \
intelligence tracker. Write a concise summary (at most 8 sentences) of the product \
offering, pricing, positioning, announcements, and hiring signals on the page. \
Plain text only.";

const CLASSIFY_PROMPT: &str = "You classify statements from a company page summary. \
Split the summary into short factual statements and assign each one a category such as \
Product, Pricing, Positioning, Announcement, Partnership, Hiring, or Other. \
Respond with only a JSON array of objects with string fields \"category\" and \"text\".";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Minimal OpenRouter chat-completions client.
#[derive(Clone)]
pub struct OpenRouterClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TracktectError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
        })
    }

    /// Build from config, reading the API key from the configured env var.
    pub fn from_config(config: &OpenRouterConfig, timeout_secs: u64) -> Result<Self> {
        let api_key = tracktect_shared::require_env(&config.api_key_env, "OpenRouter API key")?;
        Ok(Self::new(api_key, &config.model, timeout_secs)?.with_base_url(&config.base_url))
    }

    /// Point at a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send one system + user exchange and return the reply text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenRouter request failed");
                TracktectError::Llm(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, error = %body, "OpenRouter API error");
            return Err(TracktectError::Llm(format!("HTTP {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TracktectError::Llm(format!("unreadable response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| TracktectError::Llm("empty response from model".into()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis(),
            "chat completion"
        );
        Ok(content)
    }
}

#[async_trait]
impl Summarizer for OpenRouterClient {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn summarize(&self, text: &str, url: &str) -> Result<String> {
        let user = format!("URL: {url}\n\nPage text:\n{}", truncate_chars(text, MAX_INPUT_CHARS));
        self.complete(SUMMARIZE_PROMPT, &user).await
    }
}

#[async_trait]
impl Classifier for OpenRouterClient {
    #[instrument(skip(self, summary))]
    async fn classify(&self, summary: &str, url: &str) -> Result<Vec<ClassifiedItem>> {
        let user = format!("URL: {url}\n\nSummary:\n{summary}");
        let reply = self.complete(CLASSIFY_PROMPT, &user).await?;
        parse_classification(&reply)
    }
}

/// Parse a model reply into classified items.
///
/// Accepts a bare JSON array or one wrapped in prose or a fenced code block;
/// the outermost `[...]` is what gets parsed.
pub fn parse_classification(reply: &str) -> Result<Vec<ClassifiedItem>> {
    let start = reply.find('[');
    let end = reply.rfind(']');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => {
            return Err(TracktectError::Llm(format!(
                "classifier reply has no JSON array: {}",
                truncate_chars(reply, 120)
            )));
        }
    };

    let items: Vec<ClassifiedItem> = serde_json::from_str(json)
        .map_err(|e| TracktectError::Llm(format!("classifier reply is not valid items: {e}")))?;

    Ok(items
        .into_iter()
        .filter(|i| !i.text.trim().is_empty())
        .collect())
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "gen-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
    }

    async fn client_for(server: &MockServer) -> OpenRouterClient {
        OpenRouterClient::new("sk-test", "openai/gpt-4o-mini", 5)
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn parses_fenced_array() {
        let reply = "Here you go:\n```json\n[{\"category\": \"Product\", \"text\": \"Launched X\"}]\n```";
        let items = parse_classification(reply).unwrap();
        assert_eq!(items, vec![ClassifiedItem::new("Product", "Launched X")]);
    }

    #[test]
    fn rejects_reply_without_array() {
        let err = parse_classification("I cannot help with that.").unwrap_err();
        assert!(matches!(err, TracktectError::Llm(_)));
    }

    #[test]
    fn drops_blank_items() {
        let items =
            parse_classification(r#"[{"category":"Other","text":" "},{"category":"Hiring","text":"3 roles"}]"#)
                .unwrap();
        assert_eq!(items, vec![ClassifiedItem::new("Hiring", "3 roles")]);
    }

    #[tokio::test]
    async fn summarize_sends_bearer_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("  Acme sells X.  ")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let summary = client.summarize("page text", "https://a.com").await.unwrap();
        assert_eq!(summary, "Acme sells X.");
    }

    #[tokio::test]
    async fn classify_parses_model_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                r#"[{"category":"Pricing","text":"Pro plan is $20"}]"#,
            )))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let items = client.classify("summary", "https://a.com").await.unwrap();
        assert_eq!(items, vec![ClassifiedItem::new("Pricing", "Pro plan is $20")]);
    }

    #[tokio::test]
    async fn api_errors_surface_as_llm_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.summarize("text", "https://a.com").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }
}
