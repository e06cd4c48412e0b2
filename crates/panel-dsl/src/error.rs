//! Parse errors for spec lines

use thiserror::Error;

/// Why a spec line could not be turned into a [`crate::PanelSpec`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty spec line")]
    Empty,

    #[error("cannot parse field '{field}': more than one '='")]
    AmbiguousField { field: String },

    #[error("keyword field '{field}' has an empty key")]
    EmptyKey { field: String },

    #[error("expected dataset and plot type, found {found} positional field(s)")]
    MissingPositional { found: usize },

    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("unknown plot type '{0}'")]
    UnknownPlotType(String),

    #[error("plot type '{plot_type}' is not offered by dataset '{dataset}'")]
    PlotTypeNotInDataset { dataset: String, plot_type: String },

    #[error("syntax error: {0}")]
    Syntax(String),
}
