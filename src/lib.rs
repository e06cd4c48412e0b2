//! wmb-browser: dynamic panel browser for the whole mouse brain atlas
//!
//! Users describe panels as spec lines (`dataset,plot_type,args...,k=v...`).
//! Each line goes through:
//!
//! ```text
//! parse_spec_line ──(fallback)──► SpecTranslator
//!        │                              │
//!        └──────────► PanelSpec ◄───────┘
//!                        │
//!                  PlotRegistry ──► ScatterRenderer / HiglassRenderer
//!                        │
//!                  PanelSession ──► Patch + LayoutConfig
//! ```
//!
//! The `server` feature adds the axum REST API in [`api`].

pub mod config;
pub mod dataset;
pub mod error;
pub mod registry;
pub mod render;
pub mod session;

#[cfg(feature = "server")]
pub mod api;

pub use config::{BrowserConfig, DEFAULT_MAX_PANELS};
pub use dataset::{Dataset, DatasetBundle, GenomeRef, InMemoryDataset};
pub use error::{ConfigError, DatasetError, PanelError, RegistryError, RenderError, SessionError};
pub use registry::{Catalog, PanelView, PanelWidth, PlotRegistry};
pub use render::{HiglassRenderer, PanelContent, RenderedPanel, ScatterRenderer, TrackTable};
pub use session::{
    BatchOutcome, BatchPipeline, PanelRecord, PanelSession, Patch, PatchOp, SessionSnapshot,
};

pub use panel_dsl::{parse_spec_line, LayoutConfig, PanelSpec};
