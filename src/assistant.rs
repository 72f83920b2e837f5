//! Code-generation assistant backed by an OpenAI-compatible chat API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AssistantConfig;
use crate::error::{Error, Result};
use crate::secrets::{api_key_sources, Secret, API_KEY_ENV};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 2000;

const SYSTEM_PROMPT: &str = "You are an expert in web scraping with Python. \
Generate clean, efficient code that follows best practices. \
Always include error handling and respect robots.txt and rate limits.";

/// Generates scraper source code from a natural-language prompt.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Returns generated source text. Failures are errors, never empty output.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Assistant calling `POST {base_url}/v1/chat/completions`.
pub struct OpenAiAssistant {
    client: Client,
    api_key: Secret,
    model: String,
    base_url: String,
}

impl OpenAiAssistant {
    /// Creates an assistant with an explicit key.
    pub fn new(config: &AssistantConfig, api_key: Secret) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| Error::CodeGeneration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates an assistant resolving the key from the environment or the
    /// configured key file.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let sources = api_key_sources(config.api_key_file.clone());
        let api_key = Secret::resolve(API_KEY_ENV, &sources)
            .map_err(|e| Error::CodeGeneration(e.to_string()))?;
        Self::new(config, api_key)
    }

    /// Returns the model in use.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CodeGenerator for OpenAiAssistant {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(Error::CodeGeneration("prompt cannot be empty".to_string()));
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        tracing::info!(model = %self.model, "requesting code generation");

        let url = format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::CodeGeneration(self.api_key.redact(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "code generation request rejected");
            return Err(Error::CodeGeneration(format!(
                "API returned {}: {}",
                status,
                self.api_key.redact(body.trim())
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::CodeGeneration(format!("invalid response: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| strip_code_fence(&content))
            .filter(|code| !code.is_empty())
            .ok_or_else(|| Error::CodeGeneration("response contained no code".to_string()))?;

        Ok(content)
    }
}

/// Trims the text and removes a surrounding Markdown code fence.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);

    // A multi-line fence carries an info string (e.g. "python") on its
    // opening line; a single-line fence is all code.
    match rest.find('\n') {
        Some(idx) => rest[idx + 1..].trim().to_string(),
        None => rest.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn assistant_for(server: &MockServer) -> OpenAiAssistant {
        let config = AssistantConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        OpenAiAssistant::new(&config, Secret::new(API_KEY_ENV, "sk-test")).unwrap()
    }

    #[test]
    fn strips_fenced_code() {
        let text = "```python\nprint('hi')\n```\n";
        assert_eq!(strip_code_fence(text), "print('hi')");
    }

    #[test]
    fn keeps_unfenced_code() {
        assert_eq!(strip_code_fence("  print('hi')\n"), "print('hi')");
    }

    #[test]
    fn single_line_fence_keeps_code() {
        assert_eq!(strip_code_fence("```print(1)```"), "print(1)");
    }

    #[test]
    fn unterminated_fence_keeps_body() {
        assert_eq!(strip_code_fence("```\nimport json"), "import json");
    }

    #[tokio::test]
    async fn generate_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4",
                "temperature": 0.3,
                "max_tokens": 2000
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "```python\nimport requests\n```"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let code = assistant_for(&server)
            .generate("scrape quotes.toscrape.com")
            .await
            .unwrap();

        assert_eq!(code, "import requests");
    }

    #[tokio::test]
    async fn generate_accepts_single_line_fenced_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "```print(1)```"}}]
            })))
            .mount(&server)
            .await;

        let code = assistant_for(&server).generate("print one").await.unwrap();

        assert_eq!(code, "print(1)");
    }

    #[tokio::test]
    async fn api_error_is_reported_and_redacted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string("invalid key sk-test"),
            )
            .mount(&server)
            .await;

        let err = assistant_for(&server).generate("anything").await.unwrap_err();

        let msg = err.to_string();
        assert!(matches!(err, Error::CodeGeneration(_)));
        assert!(msg.contains("401"));
        assert!(!msg.contains("sk-test"));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let result = assistant_for(&server).generate("anything").await;

        assert!(matches!(result, Err(Error::CodeGeneration(_))));
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = assistant_for(&server).generate("   ").await;

        assert!(matches!(result, Err(Error::CodeGeneration(_))));
    }
}
