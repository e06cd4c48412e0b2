//! LLM Client Trait
//!
//! Unified interface for LLM providers (OpenAI, Anthropic).

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Tool/function definition offered to the model
///
/// - OpenAI: maps to the `functions` array with `function_call: "auto"`
/// - Anthropic: maps to the `tools` array with `tool_choice: auto`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name (e.g., "make_cell_scatter_plot")
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the function's parameters
    pub parameters: serde_json::Value,
}

/// The function the model chose to call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Name of the function that was called
    pub tool_name: String,
    /// Raw JSON argument text, exactly as the provider returned it
    pub arguments: String,
}

/// Unified LLM client interface for both OpenAI and Anthropic
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Offer a set of functions and let the model pick at most one
    ///
    /// Returns `Ok(None)` when the model answered in prose instead.
    async fn call_tools(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tools: &[ToolDefinition],
    ) -> Result<Option<ToolCallResult>>;

    /// Get the model name for logging
    fn model_name(&self) -> &str;

    /// Get the provider name for logging
    fn provider_name(&self) -> &str;
}
