use crate::config::toml_config::LlmConfig;
use crate::domain::ports::LlmClient;
use crate::utils::error::{RagError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Google Gemini `generateContent` client.
#[derive(Debug)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request(prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }]
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = self.generate_url();
        tracing::debug!("Calling {} ({} prompt chars)", self.model, prompt.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_request(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RagError::ApiResponseError {
                status: response.status().as_u16(),
                url,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(RagError::LlmContractError {
                message: "model returned no text".to_string(),
            });
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config(base_url: String) -> LlmConfig {
        LlmConfig {
            base_url,
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_complete_joins_parts() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash-lite:generateContent")
                .header("x-goog-api-key", "test-key");
            then.status(200).json_body(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "{\"synthesis\": "}, {"text": "\"ok\"}"}]}
                }]
            }));
        });

        let client = GeminiClient::new(&config(server.base_url()), "test-key").unwrap();
        let text = client.complete("prompt").await.unwrap();

        mock.assert();
        assert_eq!(text, "{\"synthesis\": \"ok\"}");
    }

    #[tokio::test]
    async fn test_quota_status_is_surfaced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(429).body("RESOURCE_EXHAUSTED");
        });

        let client = GeminiClient::new(&config(server.base_url()), "k").unwrap();
        let err = client.complete("prompt").await.unwrap_err();
        assert!(err.is_quota_exceeded());
    }

    #[tokio::test]
    async fn test_empty_candidates_violate_contract() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(serde_json::json!({"candidates": []}));
        });

        let client = GeminiClient::new(&config(server.base_url()), "k").unwrap();
        let err = client.complete("prompt").await.unwrap_err();
        assert!(matches!(err, RagError::LlmContractError { .. }));
    }
}
