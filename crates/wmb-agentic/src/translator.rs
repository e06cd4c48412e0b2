//! Natural-language fallback translator
//!
//! When a spec line does not parse, the raw text can be sent to an LLM with
//! the two function schemas from [`crate::schemas`]. The function call that
//! comes back is normalized into the same [`PanelSpec`] the parser produces.
//!
//! ```text
//! "show Gad1 mCH on the tsne"
//!     → make_cell_scatter_plot {coord, color: "mch:Gad1", scatter_type}
//!     → cemba_cell,continuous_scatter,coord=l1_tsne,color=gene_mch:Gad1
//! ```
//!
//! Every failure (network, timeout, schema violation) is a single
//! [`TranslationError`]; a partial spec is never returned.

use async_trait::async_trait;
use panel_dsl::{DatasetName, KwArgs, PanelSpec, ParseError, PlotType, LIST_SEPARATOR};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::alias::AliasTable;
use crate::llm_client::{LlmClient, ToolCallResult, ToolDefinition};
use crate::schemas::{
    function_tools, SchemaContext, BROWSER_FUNCTION, BROWSER_REQUIRED, DEFAULT_REGION,
    MODALITIES_1D, MODALITIES_2D, SCATTER_FUNCTION, SCATTER_REQUIRED,
};

/// Default upper bound on one LLM round trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "You turn requests about a whole mouse brain methylation and \
3D genome atlas into exactly one function call. Use the provided functions only.";

const GENE_VALUE_PREFIXES: [&str; 3] = ["mch:", "mcg:", "rna:"];

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("LLM service call failed: {0}")]
    Service(String),

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    #[error("LLM did not call any function")]
    NoFunctionCall,

    #[error("LLM called unsupported function '{0}'")]
    UnknownFunction(String),

    #[error("function arguments are not valid JSON: {0}")]
    InvalidJson(String),

    #[error("function arguments must be a JSON object")]
    NotAnObject,

    #[error("function arguments missing required key '{0}'")]
    MissingKey(String),

    #[error("argument '{key}' must be {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("layout '{layout}' needs at least {needed} cell type(s)")]
    NotEnoughCellTypes { layout: String, needed: usize },

    #[error("translated call is not a valid panel: {0}")]
    InvalidSpec(#[from] ParseError),
}

/// Anything that can turn free text into a [`PanelSpec`]
#[async_trait]
pub trait SpecTranslator: Send + Sync {
    async fn translate(&self, line: &str) -> Result<PanelSpec, TranslationError>;
}

/// [`SpecTranslator`] backed by an LLM function-calling API
pub struct LlmTranslator {
    client: Arc<dyn LlmClient>,
    tools: Vec<ToolDefinition>,
    timeout: Duration,
}

impl LlmTranslator {
    pub fn new(client: Arc<dyn LlmClient>, ctx: &SchemaContext) -> Self {
        Self {
            client,
            tools: function_tools(ctx),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SpecTranslator for LlmTranslator {
    async fn translate(&self, line: &str) -> Result<PanelSpec, TranslationError> {
        tracing::info!(
            "Translating spec line via {} ({}): {}",
            self.client.provider_name(),
            self.client.model_name(),
            line
        );

        let call = tokio::time::timeout(
            self.timeout,
            self.client.call_tools(SYSTEM_PROMPT, line, &self.tools),
        )
        .await
        .map_err(|_| TranslationError::Timeout(self.timeout))?
        .map_err(|e| TranslationError::Service(e.to_string()))?
        .ok_or(TranslationError::NoFunctionCall)?;

        let spec = function_call_to_spec(&call)?;
        tracing::info!("Translated '{}' -> {}", line, spec);
        Ok(spec)
    }
}

// ============================================================================
// Function call -> PanelSpec
// ============================================================================

/// Normalize one function call into a panel spec
pub fn function_call_to_spec(call: &ToolCallResult) -> Result<PanelSpec, TranslationError> {
    let args = match serde_json::from_str::<Value>(&call.arguments) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(TranslationError::NotAnObject),
        Err(e) => return Err(TranslationError::InvalidJson(e.to_string())),
    };

    match call.tool_name.as_str() {
        SCATTER_FUNCTION => scatter_spec(args),
        BROWSER_FUNCTION => browser_spec(args),
        other => Err(TranslationError::UnknownFunction(other.to_string())),
    }
}

fn scatter_spec(mut args: Map<String, Value>) -> Result<PanelSpec, TranslationError> {
    require_keys(&args, &SCATTER_REQUIRED)?;
    let alias = AliasTable::scatter();

    let scatter_type = take_string(&mut args, "scatter_type")?;
    let plot_type: PlotType = format!("{}_scatter", scatter_type.to_lowercase()).parse()?;

    let coord = alias.resolve(&take_string(&mut args, "coord")?);
    let color = alias.resolve(&gene_value_address(&take_string(&mut args, "color")?));

    for ignored in args.keys() {
        tracing::debug!("Ignoring extra scatter argument '{}'", ignored);
    }

    let mut kwargs = KwArgs::new();
    kwargs.insert("coord", sanitize(&coord));
    kwargs.insert("color", sanitize(&color));
    Ok(PanelSpec::new(DatasetName::CembaCell, plot_type, vec![], kwargs)?)
}

fn browser_spec(mut args: Map<String, Value>) -> Result<PanelSpec, TranslationError> {
    require_keys(&args, &BROWSER_REQUIRED)?;
    let alias = AliasTable::browser();

    let plot_type: PlotType = take_string(&mut args, "browser_type")?.parse()?;
    let cell_types = take_string_list(&mut args, "cell_types")?;
    let modalities = match args.contains_key("modalities") {
        true => take_string_list(&mut args, "modalities")?,
        false => Vec::new(),
    };
    let region = match args.remove("region") {
        None | Some(Value::Null) => DEFAULT_REGION.to_string(),
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(TranslationError::WrongType {
                key: "region".into(),
                expected: "a string",
            })
        }
    };

    // Bucket on raw names, then alias to track labels
    let modality_1d: Vec<String> = modalities
        .iter()
        .filter(|m| MODALITIES_1D.contains(&m.as_str()))
        .map(|m| alias.resolve(m))
        .collect();
    let modality_2d: Option<String> = modalities
        .iter()
        .find(|m| MODALITIES_2D.contains(&m.as_str()))
        .map(|m| alias.resolve(m));

    let cell_types: Vec<String> = cell_types.iter().map(|c| alias.resolve(c)).collect();
    let region = sanitize(&alias.resolve(&region));

    let mut kwargs = KwArgs::new();
    match plot_type {
        PlotType::TwoCellTypeDiff => {
            let [first, second, ..] = cell_types.as_slice() else {
                return Err(not_enough(plot_type, 2));
            };
            kwargs.insert("cell_type_1", sanitize(first));
            kwargs.insert("cell_type_2", sanitize(second));
        }
        PlotType::LoopZoomIn => {
            let first = cell_types.first().ok_or_else(|| not_enough(plot_type, 1))?;
            kwargs.insert("cell_type", sanitize(first));
        }
        _ => {
            if cell_types.is_empty() {
                return Err(not_enough(plot_type, 1));
            }
            kwargs.insert("cell_types", join_list(&cell_types));
        }
    }

    if plot_type == PlotType::MultiCellType1d {
        kwargs.insert("region", region);
        if !modality_1d.is_empty() {
            kwargs.insert("modalities", join_list(&modality_1d));
        }
    } else {
        kwargs.insert("region1", region);
        if !modality_1d.is_empty() {
            kwargs.insert("modality_1d", join_list(&modality_1d));
        }
        if let Some(m2d) = modality_2d {
            kwargs.insert("modality_2d", sanitize(&m2d));
        }
    }

    Ok(PanelSpec::new(DatasetName::Higlass, plot_type, vec![], kwargs)?)
}

/// `mch:Gad1` -> `gene_mch:Gad1`
fn gene_value_address(color: &str) -> String {
    let lowered = color.to_lowercase();
    match GENE_VALUE_PREFIXES.iter().find(|p| lowered.starts_with(*p)) {
        Some(prefix) => format!("gene_{}{}", prefix, &color[prefix.len()..]),
        None => color.to_string(),
    }
}

fn require_keys(args: &Map<String, Value>, required: &[&str]) -> Result<(), TranslationError> {
    match required.iter().find(|k| !args.contains_key(**k)) {
        Some(missing) => Err(TranslationError::MissingKey(missing.to_string())),
        None => Ok(()),
    }
}

fn take_string(args: &mut Map<String, Value>, key: &str) -> Result<String, TranslationError> {
    match args.remove(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(TranslationError::WrongType {
            key: key.to_string(),
            expected: "a string",
        }),
        None => Err(TranslationError::MissingKey(key.to_string())),
    }
}

/// A list of strings; a bare string counts as a one-item list
fn take_string_list(
    args: &mut Map<String, Value>,
    key: &str,
) -> Result<Vec<String>, TranslationError> {
    let wrong_type = || TranslationError::WrongType {
        key: key.to_string(),
        expected: "a list of strings",
    };
    match args.remove(key) {
        Some(Value::String(s)) => Ok(vec![s]),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                _ => Err(wrong_type()),
            })
            .collect(),
        Some(Value::Null) => Ok(Vec::new()),
        Some(_) => Err(wrong_type()),
        None => Err(TranslationError::MissingKey(key.to_string())),
    }
}

/// Strip characters the spec-line grammar reserves
fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(*c, ',' | '=' | '?' | '\n' | '\r' | LIST_SEPARATOR))
        .collect::<String>()
        .trim()
        .to_string()
}

fn join_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| sanitize(s))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

fn not_enough(plot_type: PlotType, needed: usize) -> TranslationError {
    TranslationError::NotEnoughCellTypes {
        layout: plot_type.to_string(),
        needed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;

    fn call(name: &str, arguments: &str) -> ToolCallResult {
        ToolCallResult {
            tool_name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_scatter_gene_color_rewrite() {
        let spec = function_call_to_spec(&call(
            SCATTER_FUNCTION,
            r#"{"coord":"l1_tsne","color":"mch:Gad1","scatter_type":"continuous"}"#,
        ))
        .unwrap();

        assert_eq!(
            spec.to_spec_string(),
            "cemba_cell,continuous_scatter,coord=l1_tsne,color=gene_mch:Gad1"
        );
    }

    #[test]
    fn test_scatter_alias_applied() {
        let spec = function_call_to_spec(&call(
            SCATTER_FUNCTION,
            r#"{"coord":"HPF_mr_tsne","color":"Cell Subclass","scatter_type":"categorical"}"#,
        ))
        .unwrap();

        assert_eq!(spec.plot_type, PlotType::CategoricalScatter);
        assert_eq!(spec.kwargs.get("color"), Some("CellSubClass"));
    }

    #[test]
    fn test_scatter_missing_key() {
        let err = function_call_to_spec(&call(SCATTER_FUNCTION, r#"{"coord":"l1_tsne"}"#))
            .unwrap_err();
        assert!(matches!(err, TranslationError::MissingKey(k) if k == "scatter_type"));
    }

    #[test]
    fn test_scatter_bad_type_is_invalid_spec() {
        let err = function_call_to_spec(&call(
            SCATTER_FUNCTION,
            r#"{"coord":"l1_tsne","color":"CellClass","scatter_type":"violin"}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, TranslationError::InvalidSpec(_)));
    }

    #[test]
    fn test_browser_two_cell_type_diff() {
        let spec = function_call_to_spec(&call(
            BROWSER_FUNCTION,
            r#"{"cell_types":["CA3 Glut","Sst Gaba","Oligo NN"],
                "modalities":["mCGFrac","ImputeChrom10KMatrix","ATAC"],
                "browser_type":"two_cell_type_diff","region":"chr1:2,000,000-2,100,000"}"#,
        ))
        .unwrap();

        assert_eq!(
            spec.to_spec_string(),
            "higlass,two_cell_type_diff,cell_type_1=CA3 Glut,cell_type_2=Sst Gaba,\
             region1=chr1:2000000-2100000,modality_1d=mCG Frac|ATAC CPM,modality_2d=Impute 10K"
        );
    }

    #[test]
    fn test_browser_multi_1d_uses_region_and_modalities() {
        let spec = function_call_to_spec(&call(
            BROWSER_FUNCTION,
            r#"{"cell_types":["Pvalb Gaba"],"modalities":["mCHFrac","RawChrom100KMatrix"],
                "browser_type":"multi_cell_type_1d"}"#,
        ))
        .unwrap();

        assert_eq!(spec.kwargs.get("cell_types"), Some("Pvalb Gaba"));
        assert_eq!(spec.kwargs.get("region"), Some(DEFAULT_REGION));
        assert_eq!(spec.kwargs.get("modalities"), Some("mCH Frac"));
        assert!(!spec.kwargs.contains_key("modality_2d"));
    }

    #[test]
    fn test_browser_loop_zoom_in_takes_first_cell_type() {
        let spec = function_call_to_spec(&call(
            BROWSER_FUNCTION,
            r#"{"cell_types":"CA3 Glut","browser_type":"loop_zoom_in","region":"Gad1"}"#,
        ))
        .unwrap();

        assert_eq!(spec.plot_type, PlotType::LoopZoomIn);
        assert_eq!(spec.kwargs.get("cell_type"), Some("CA3 Glut"));
        assert_eq!(spec.kwargs.get("region1"), Some("Gad1"));
    }

    #[test]
    fn test_browser_diff_needs_two_cell_types() {
        let err = function_call_to_spec(&call(
            BROWSER_FUNCTION,
            r#"{"cell_types":["CA3 Glut"],"browser_type":"two_cell_type_diff"}"#,
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            TranslationError::NotEnoughCellTypes { needed: 2, .. }
        ));
    }

    #[test]
    fn test_unusable_responses() {
        assert!(matches!(
            function_call_to_spec(&call("plot_everything", "{}")),
            Err(TranslationError::UnknownFunction(_))
        ));
        assert!(matches!(
            function_call_to_spec(&call(SCATTER_FUNCTION, "{not json")),
            Err(TranslationError::InvalidJson(_))
        ));
        assert!(matches!(
            function_call_to_spec(&call(SCATTER_FUNCTION, "[1,2]")),
            Err(TranslationError::NotAnObject)
        ));
        assert!(matches!(
            function_call_to_spec(&call(
                BROWSER_FUNCTION,
                r#"{"cell_types":[1],"browser_type":"multi_cell_type_2d"}"#
            )),
            Err(TranslationError::WrongType { .. })
        ));
    }

    struct StubClient {
        reply: Option<ToolCallResult>,
        fail: bool,
        delay: Duration,
    }

    #[async_trait]
    impl LlmClient for StubClient {
        async fn call_tools(
            &self,
            _system: &str,
            _user: &str,
            tools: &[ToolDefinition],
        ) -> anyhow::Result<Option<ToolCallResult>> {
            assert_eq!(tools.len(), 2);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(anyhow!("connection refused"));
            }
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "stub"
        }

        fn provider_name(&self) -> &str {
            "Stub"
        }
    }

    fn translator(reply: Option<ToolCallResult>, fail: bool, delay: Duration) -> LlmTranslator {
        LlmTranslator::new(
            Arc::new(StubClient { reply, fail, delay }),
            &SchemaContext::default(),
        )
        .with_timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_translate_success() {
        let t = translator(
            Some(call(
                SCATTER_FUNCTION,
                r#"{"coord":"l1_umap","color":"rna:Rorb","scatter_type":"continuous"}"#,
            )),
            false,
            Duration::ZERO,
        );
        let spec = t.translate("Rorb expression on umap").await.unwrap();
        assert_eq!(spec.kwargs.get("color"), Some("gene_rna:Rorb"));
    }

    #[tokio::test]
    async fn test_translate_failures_are_single_error() {
        let none = translator(None, false, Duration::ZERO);
        assert!(matches!(
            none.translate("hello").await,
            Err(TranslationError::NoFunctionCall)
        ));

        let broken = translator(None, true, Duration::ZERO);
        assert!(matches!(
            broken.translate("hello").await,
            Err(TranslationError::Service(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_translate_timeout() {
        let slow = translator(None, false, Duration::from_secs(5));
        assert!(matches!(
            slow.translate("hello").await,
            Err(TranslationError::Timeout(_))
        ));
    }
}
