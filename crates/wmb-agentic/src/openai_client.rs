//! OpenAI Client
//!
//! LLM client implementation for the OpenAI chat completions API.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::llm_client::{LlmClient, ToolCallResult, ToolDefinition};

/// Default OpenAI model
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl OpenAiClient {
    /// Create a client; `model` falls back to the provider default
    pub fn new(api_key: String, model: Option<&str>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        }
    }

    /// Create with the API key from `OPENAI_API_KEY`
    pub fn from_env(model: Option<&str>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, model))
    }

    async fn post(&self, body: serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error {}: {}", status, body));
        }

        Ok(response.text().await?)
    }
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    // OpenAI returns arguments as a JSON string
    arguments: String,
}

#[derive(Deserialize)]
struct Message {
    function_call: Option<FunctionCall>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

fn parse_function_call(response_text: &str) -> Result<Option<ToolCallResult>> {
    let api_response: ApiResponse = serde_json::from_str(response_text)
        .map_err(|e| anyhow!("Failed to parse OpenAI response: {}", e))?;

    let message = api_response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| anyhow!("OpenAI returned no choices"))?;

    Ok(message.function_call.map(|fc| ToolCallResult {
        tool_name: fc.name,
        arguments: fc.arguments,
    }))
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn call_tools(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tools: &[ToolDefinition],
    ) -> Result<Option<ToolCallResult>> {
        let functions: Vec<_> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": &t.name,
                    "description": &t.description,
                    "parameters": &t.parameters
                })
            })
            .collect();

        let response_text = self
            .post(serde_json::json!({
                "model": &self.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt}
                ],
                "temperature": 0.1,
                "functions": functions,
                "function_call": "auto"
            }))
            .await?;

        tracing::debug!(
            "OpenAI raw response: {}",
            response_text.chars().take(1000).collect::<String>()
        );

        parse_function_call(&response_text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}
