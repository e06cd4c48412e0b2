//! Error taxonomy for the WMB browser
//!
//! Per-line failures ([`PanelError`]) are recoverable: the batch pipeline logs
//! them and skips the line. Startup failures ([`ConfigError`],
//! [`RegistryError`], [`DatasetError`] while loading) abort the process.

use panel_dsl::ParseError;
use thiserror::Error;
use wmb_agentic::TranslationError;

/// Why one spec line did not become a panel
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("Unknown dataset or plot type: {dataset}/{plot_type}")]
    UnknownDatasetOrPlotType { dataset: String, plot_type: String },

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Raised by a rendering adapter for arguments it cannot use
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("expected at most {expected} positional argument(s), found {found}")]
    TooManyPositional { expected: usize, found: usize },

    #[error("unknown argument '{0}'")]
    UnknownArgument(String),

    #[error("argument '{0}' given more than once")]
    DuplicateArgument(String),

    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    #[error("argument '{param}' must be a number, got '{value}'")]
    InvalidNumber { param: String, value: String },

    #[error("argument '{param}' must be one of {allowed:?}, got '{value}'")]
    InvalidChoice {
        param: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("no track for cell type '{cell_type}' and modality '{modality}'")]
    MissingTrack { cell_type: String, modality: String },

    #[error("no observations left to plot for '{0}'")]
    EmptyPlot(String),

    #[error("color '{0}' is not a continuous variable")]
    NotContinuous(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Registry construction failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("dataset '{dataset}' has no handler for plot type '{plot_type}'")]
    MissingHandler { dataset: String, plot_type: String },

    #[error("plot type '{plot_type}' does not belong to dataset '{dataset}'")]
    ForeignPlotType { dataset: String, plot_type: String },

    #[error("failed to load dataset: {0}")]
    Dataset(#[from] DatasetError),
}

/// Dataset lookups and bundle loading
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("coordinates '{0}' not found")]
    UnknownCoords(String),

    #[error("metadata '{0}' not found")]
    UnknownMetadata(String),

    #[error("variable set '{0}' not found")]
    UnknownVarSet(String),

    #[error("variable '{var}' not found in variable set '{set}'")]
    UnknownVariable { set: String, var: String },

    #[error("gene '{0}' not found")]
    UnknownGene(String),

    #[error("chromosome '{0}' not found")]
    UnknownChrom(String),

    #[error("invalid region '{0}', expected CHROM:START-END or a gene name")]
    InvalidRegion(String),

    #[error("failed to read dataset bundle {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid dataset bundle: {0}")]
    Bundle(String),
}

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },

    #[error("invalid public base URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Session operations addressed at a panel that is not live
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("panel '{0}' is not live in this session")]
    UnknownPanel(String),

    #[error(transparent)]
    Panel(#[from] PanelError),
}
