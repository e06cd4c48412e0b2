//! LLM client construction

use anyhow::Result;
use std::sync::Arc;

use crate::anthropic_client::AnthropicClient;
use crate::backend::AgentBackend;
use crate::llm_client::LlmClient;
use crate::openai_client::OpenAiClient;

/// Create the client for `backend`, reading its API key from the environment
///
/// `model` overrides the provider's default model.
pub fn create_llm_client(backend: AgentBackend, model: Option<&str>) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match backend {
        AgentBackend::OpenAi => Arc::new(OpenAiClient::from_env(model)?),
        AgentBackend::Anthropic => Arc::new(AnthropicClient::from_env(model)?),
    };
    tracing::info!(
        "LLM client ready: {} ({})",
        client.provider_name(),
        client.model_name()
    );
    Ok(client)
}
