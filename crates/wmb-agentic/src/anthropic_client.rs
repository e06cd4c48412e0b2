//! Anthropic Client
//!
//! LLM client implementation for the Anthropic messages API.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::llm_client::{LlmClient, ToolCallResult, ToolDefinition};

/// Default Anthropic model
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API client
#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl AnthropicClient {
    /// Create a client; `model` falls back to the provider default
    pub fn new(api_key: String, model: Option<&str>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        }
    }

    /// Create with the API key from `ANTHROPIC_API_KEY`
    pub fn from_env(model: Option<&str>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, model))
    }

    async fn post(&self, body: serde_json::Value) -> Result<ApiResponse> {
        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Anthropic API error {}: {}", status, body));
        }

        let text = response.text().await?;
        tracing::debug!("Anthropic raw response: {}", text.chars().take(1000).collect::<String>());
        serde_json::from_str(&text).map_err(|e| anyhow!("Failed to parse Anthropic response: {}", e))
    }
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    input: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

fn first_tool_use(response: ApiResponse) -> Option<ToolCallResult> {
    response
        .content
        .into_iter()
        .find(|block| block.kind == "tool_use")
        .and_then(|block| {
            let name = block.name?;
            let input = block.input.unwrap_or(serde_json::Value::Null);
            Some(ToolCallResult {
                tool_name: name,
                arguments: input.to_string(),
            })
        })
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn call_tools(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tools: &[ToolDefinition],
    ) -> Result<Option<ToolCallResult>> {
        let tools: Vec<_> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": &t.name,
                    "description": &t.description,
                    "input_schema": &t.parameters
                })
            })
            .collect();

        let response = self
            .post(serde_json::json!({
                "model": &self.model,
                "max_tokens": 1024,
                "system": system_prompt,
                "messages": [{"role": "user", "content": user_prompt}],
                "tools": tools,
                "tool_choice": {"type": "auto"}
            }))
            .await?;

        Ok(first_tool_use(response))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }
}
