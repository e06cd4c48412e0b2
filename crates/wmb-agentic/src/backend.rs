//! Backend Selection
//!
//! Enum for selecting between LLM providers (OpenAI, Anthropic).

use serde::Deserialize;
use std::str::FromStr;

/// LLM backend provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum AgentBackend {
    /// OpenAI GPT (default)
    #[default]
    #[serde(rename = "openai", alias = "gpt")]
    OpenAi,
    /// Anthropic Claude
    #[serde(rename = "anthropic", alias = "claude")]
    Anthropic,
}

impl AgentBackend {
    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            AgentBackend::OpenAi => "OpenAI",
            AgentBackend::Anthropic => "Anthropic",
        }
    }
}

/// Error type for parsing AgentBackend
#[derive(Debug)]
pub struct ParseBackendError(String);

impl std::fmt::Display for ParseBackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseBackendError {}

impl FromStr for AgentBackend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "gpt" => Ok(AgentBackend::OpenAi),
            "anthropic" | "claude" => Ok(AgentBackend::Anthropic),
            other => Err(ParseBackendError(format!(
                "Unknown LLM backend '{}'. Valid values: openai, gpt, anthropic, claude",
                other
            ))),
        }
    }
}

impl std::fmt::Display for AgentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
