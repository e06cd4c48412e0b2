//! wmb-agentic: natural-language fallback for WMB panel specs
//!
//! Offers two function schemas (cell scatter, HiGlass browser) to an LLM and
//! normalizes the returned function call into a [`panel_dsl::PanelSpec`].
//!
//! API keys:
//! - [`AgentBackend::OpenAi`] (default) reads `OPENAI_API_KEY`
//! - [`AgentBackend::Anthropic`] reads `ANTHROPIC_API_KEY`

pub mod alias;
pub mod anthropic_client;
pub mod backend;
pub mod client_factory;
pub mod llm_client;
pub mod openai_client;
pub mod schemas;
pub mod translator;

pub use alias::AliasTable;
pub use backend::{AgentBackend, ParseBackendError};
pub use client_factory::create_llm_client;
pub use llm_client::{LlmClient, ToolCallResult, ToolDefinition};
pub use schemas::SchemaContext;
pub use translator::{
    function_call_to_spec, LlmTranslator, SpecTranslator, TranslationError, DEFAULT_TIMEOUT,
};
