//! panel-dsl: spec-line parser, AST, and layout codec for the WMB browser
//!
//! This crate contains the pure panel-language logic with NO I/O:
//! - AST types (PanelSpec, DatasetName, PlotType, KwArgs)
//! - Nom-based comma/equals field parser
//! - LayoutConfig and its newline / URL-query codec
//!
//! Rendering, dispatch, and session state live in `wmb-browser`.

pub mod ast;
pub mod error;
pub mod layout;
pub mod parser;

// Re-export commonly used types
pub use ast::{DatasetName, KwArgs, PanelSpec, PlotType, LIST_SEPARATOR};
pub use error::ParseError;
pub use layout::{decode, decode_query, encode, share_url, LayoutConfig, LayoutEntry, LayoutSeparator};
pub use parser::{normalize_line, parse_spec_line, trim_boundaries};
