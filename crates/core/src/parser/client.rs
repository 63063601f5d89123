//! Messages-API client that extracts recipes with a language model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use restaurantek_shared::LlmConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::ParserError;
use super::prompt::build_prompt;
use super::response::{ParsedRecipe, parse_response};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Longest upstream error body kept in [`ParserError::Upstream`].
const MAX_ERROR_BODY: usize = 500;

/// Turns document text into a structured recipe.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecipeExtractor: Send + Sync {
    /// Extracts a recipe from an already validated document.
    async fn extract(&self, document: &str) -> Result<ParsedRecipe, ParserError>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
    }
}

/// [`RecipeExtractor`] backed by a Messages-style HTTP API.
#[derive(Clone)]
pub struct LlmRecipeExtractor {
    http: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for LlmRecipeExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmRecipeExtractor")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl LlmRecipeExtractor {
    /// Builds a client from configuration.
    pub fn new(config: &LlmConfig) -> Result<Self, ParserError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("restaurantek/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ParserError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String, ParserError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let res = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => {
                let body: MessagesResponse = res
                    .json()
                    .await
                    .map_err(|e| ParserError::InvalidResponse(e.to_string()))?;
                body.text().map(str::to_string).ok_or_else(|| {
                    ParserError::InvalidResponse("no text content in response".to_string())
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ParserError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(ParserError::RateLimited),
            s => {
                let status = s.as_u16();
                let body: String = res
                    .text()
                    .await
                    .unwrap_or_default()
                    .chars()
                    .take(MAX_ERROR_BODY)
                    .collect();
                warn!(status, "recipe parser request failed");
                Err(ParserError::Upstream { status, body })
            }
        }
    }
}

#[async_trait]
impl RecipeExtractor for LlmRecipeExtractor {
    async fn extract(&self, document: &str) -> Result<ParsedRecipe, ParserError> {
        let prompt = build_prompt(document);
        let reply = self.complete(&prompt).await?;
        debug!(reply_len = reply.len(), "recipe parser replied");
        parse_response(&reply)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ParserError {
    if e.is_timeout() {
        ParserError::Timeout
    } else {
        ParserError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_skips_other_blocks() {
        let body: MessagesResponse = serde_json::from_str(
            r#"{"content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "{}"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(body.text(), Some("{}"));

        let empty: MessagesResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn test_request_shape() {
        let request = MessagesRequest {
            model: "test-model",
            max_tokens: 100,
            messages: [Message {
                role: "user",
                content: "hello",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_debug_hides_key() {
        let extractor = LlmRecipeExtractor::new(&LlmConfig {
            api_url: "http://localhost:9".to_string(),
            api_key: "sk-secret".to_string(),
            model: "m".to_string(),
            max_tokens: 10,
            timeout_secs: 1,
        })
        .unwrap();
        assert!(!format!("{extractor:?}").contains("sk-secret"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let extractor = LlmRecipeExtractor::new(&LlmConfig {
            api_url: "http://127.0.0.1:9/v1/messages".to_string(),
            api_key: "k".to_string(),
            model: "m".to_string(),
            max_tokens: 10,
            timeout_secs: 2,
        })
        .unwrap();
        let err = extractor.extract("Soup\n1 cup water").await.unwrap_err();
        assert!(matches!(err, ParserError::Transport(_) | ParserError::Timeout));
    }
}
