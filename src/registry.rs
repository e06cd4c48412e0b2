//! Plot registry
//!
//! Maps `(dataset, plot type)` to a rendering handler. The handler table is
//! fixed at construction and checked to be exhaustive: every plot type a
//! dataset declares has a handler, and no handler sits under a dataset that
//! does not declare its plot type.

use panel_dsl::{DatasetName, PanelSpec, PlotType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::dataset::{DatasetBundle, GenomeRef, InMemoryDataset};
use crate::error::{PanelError, RegistryError, RenderError};
use crate::render::{
    HiglassRenderer, PanelContent, PanelControls, RenderedPanel, ScatterRenderer, TrackTable,
};

/// Palette the browser layouts use for `colorby=subclass`
pub const SUBCLASS_PALETTE: &str = "CellSubClass";

pub type PlotHandler =
    Arc<dyn Fn(&str, &PanelSpec) -> Result<RenderedPanel, RenderError> + Send + Sync>;

/// Grid width class of a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelWidth {
    /// Genome browsers take the full row
    Full,
    /// Scatter plots take a third
    Third,
}

impl PanelWidth {
    pub fn for_plot_type(plot_type: PlotType) -> Self {
        if plot_type.is_browser() {
            PanelWidth::Full
        } else {
            PanelWidth::Third
        }
    }
}

/// A rendered panel ready to show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelView {
    pub title: String,
    pub width: PanelWidth,
    pub content: PanelContent,
    pub controls: PanelControls,
}

/// Datasets, plot types and example lines offered to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub datasets: Vec<CatalogDataset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDataset {
    pub name: String,
    pub plot_types: Vec<CatalogPlotType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPlotType {
    pub name: String,
    pub display_name: String,
    pub example: String,
}

pub fn example_line(plot_type: PlotType) -> &'static str {
    match plot_type {
        PlotType::ContinuousScatter => "cemba_cell,continuous_scatter,l1_tsne,gene_mch:Gad1",
        PlotType::CategoricalScatter => "cemba_cell,categorical_scatter,l1_tsne,CellSubClass",
        PlotType::MultiCellType2d => {
            "higlass,multi_cell_type_2d,cell_types=CA3 Glut|Sst Gaba,region1=chr1:10000000-10200000"
        }
        PlotType::MultiCellType1d => {
            "higlass,multi_cell_type_1d,cell_types=CA3 Glut|Sst Gaba|Pvalb Gaba,region=Gad1"
        }
        PlotType::TwoCellTypeDiff => {
            "higlass,two_cell_type_diff,cell_type_1=CA3 Glut,cell_type_2=Sst Gaba,region1=Foxp2"
        }
        PlotType::LoopZoomIn => {
            "higlass,loop_zoom_in,cell_type=Pvalb Gaba,region1=chr2:70500000-70700000"
        }
    }
}

#[derive(Default)]
pub struct PlotRegistryBuilder {
    handlers: HashMap<(DatasetName, PlotType), PlotHandler>,
}

impl PlotRegistryBuilder {
    pub fn handler<F>(mut self, dataset: DatasetName, plot_type: PlotType, handler: F) -> Self
    where
        F: Fn(&str, &PanelSpec) -> Result<RenderedPanel, RenderError> + Send + Sync + 'static,
    {
        self.handlers.insert((dataset, plot_type), Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<PlotRegistry, RegistryError> {
        if let Some((dataset, plot_type)) = self
            .handlers
            .keys()
            .find(|(dataset, plot_type)| !dataset.supports(*plot_type))
        {
            return Err(RegistryError::ForeignPlotType {
                dataset: dataset.to_string(),
                plot_type: plot_type.to_string(),
            });
        }
        for dataset in DatasetName::ALL {
            for &plot_type in dataset.plot_types() {
                if !self.handlers.contains_key(&(dataset, plot_type)) {
                    return Err(RegistryError::MissingHandler {
                        dataset: dataset.to_string(),
                        plot_type: plot_type.to_string(),
                    });
                }
            }
        }
        tracing::info!("Plot registry built with {} handlers", self.handlers.len());
        Ok(PlotRegistry {
            handlers: self.handlers,
        })
    }
}

pub struct PlotRegistry {
    handlers: HashMap<(DatasetName, PlotType), PlotHandler>,
}

impl PlotRegistry {
    pub fn builder() -> PlotRegistryBuilder {
        PlotRegistryBuilder::default()
    }

    /// Every plot type wired to the scatter and HiGlass renderers
    pub fn standard(
        scatter: Arc<ScatterRenderer>,
        higlass: Arc<HiglassRenderer>,
    ) -> Result<Self, RegistryError> {
        let continuous = Arc::clone(&scatter);
        let categorical = scatter;
        let (h2d, h1d, diff, zoom) = (
            Arc::clone(&higlass),
            Arc::clone(&higlass),
            Arc::clone(&higlass),
            higlass,
        );
        Self::builder()
            .handler(
                DatasetName::CembaCell,
                PlotType::ContinuousScatter,
                move |key, spec| continuous.continuous_scatter(key, spec),
            )
            .handler(
                DatasetName::CembaCell,
                PlotType::CategoricalScatter,
                move |key, spec| categorical.categorical_scatter(key, spec),
            )
            .handler(
                DatasetName::Higlass,
                PlotType::MultiCellType2d,
                move |key, spec| h2d.multi_cell_type_2d(key, spec),
            )
            .handler(
                DatasetName::Higlass,
                PlotType::MultiCellType1d,
                move |key, spec| h1d.multi_cell_type_1d(key, spec),
            )
            .handler(
                DatasetName::Higlass,
                PlotType::TwoCellTypeDiff,
                move |key, spec| diff.two_cell_type_diff(key, spec),
            )
            .handler(
                DatasetName::Higlass,
                PlotType::LoopZoomIn,
                move |key, spec| zoom.loop_zoom_in(key, spec),
            )
            .build()
    }

    /// Standard registry over one loaded bundle
    pub fn from_bundle(
        bundle: DatasetBundle,
        higlass_server: &str,
    ) -> Result<Self, RegistryError> {
        let genome = Arc::new(GenomeRef::from_bundle(bundle.genome));
        let subclass_palette = bundle
            .cells
            .palettes
            .get(SUBCLASS_PALETTE)
            .cloned()
            .unwrap_or_default();
        let cells = InMemoryDataset::from_bundle(bundle.cells, Arc::clone(&genome))?;

        let scatter = ScatterRenderer::new(Arc::new(cells));
        let higlass = HiglassRenderer::new(higlass_server, TrackTable::new(bundle.tracks), genome)
            .with_subclass_palette(subclass_palette);
        Self::standard(Arc::new(scatter), Arc::new(higlass))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn try_render(&self, panel_key: &str, spec: &PanelSpec) -> Result<PanelView, PanelError> {
        let handler = self
            .handlers
            .get(&(spec.dataset, spec.plot_type))
            .ok_or_else(|| PanelError::UnknownDatasetOrPlotType {
                dataset: spec.dataset.to_string(),
                plot_type: spec.plot_type.to_string(),
            })?;
        let panel = handler(panel_key, spec)?;
        Ok(PanelView {
            title: format!("{}: {}", spec.plot_type.display_name(), panel.subject),
            width: PanelWidth::for_plot_type(spec.plot_type),
            content: panel.content,
            controls: panel.controls,
        })
    }

    /// Render, logging and swallowing any failure
    pub fn render(&self, panel_key: &str, spec: &PanelSpec) -> Option<PanelView> {
        match self.try_render(panel_key, spec) {
            Ok(view) => Some(view),
            Err(e) => {
                tracing::warn!("{}: failed to render '{}': {}", panel_key, spec, e);
                None
            }
        }
    }

    pub fn catalog(&self) -> Catalog {
        let datasets = DatasetName::ALL
            .iter()
            .map(|dataset| CatalogDataset {
                name: dataset.to_string(),
                plot_types: dataset
                    .plot_types()
                    .iter()
                    .filter(|pt| self.handlers.contains_key(&(*dataset, **pt)))
                    .map(|pt| CatalogPlotType {
                        name: pt.to_string(),
                        display_name: pt.display_name().to_string(),
                        example: example_line(*pt).to_string(),
                    })
                    .collect(),
            })
            .collect();
        Catalog { datasets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_dsl::parse_spec_line;

    fn stub(subject: &'static str) -> impl Fn(&str, &PanelSpec) -> Result<RenderedPanel, RenderError> {
        move |_, _| {
            Ok(RenderedPanel {
                subject: subject.to_string(),
                content: PanelContent::Html {
                    html: String::new(),
                    height: 10,
                },
                controls: PanelControls::default(),
            })
        }
    }

    fn full_builder() -> PlotRegistryBuilder {
        let mut builder = PlotRegistry::builder();
        for dataset in DatasetName::ALL {
            for &plot_type in dataset.plot_types() {
                builder = builder.handler(dataset, plot_type, stub("x"));
            }
        }
        builder
    }

    #[test]
    fn test_build_rejects_missing_handler() {
        let err = PlotRegistry::builder()
            .handler(DatasetName::CembaCell, PlotType::ContinuousScatter, stub("x"))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::MissingHandler { .. }));
    }

    #[test]
    fn test_build_rejects_foreign_plot_type() {
        let err = full_builder()
            .handler(DatasetName::CembaCell, PlotType::LoopZoomIn, stub("x"))
            .build()
            .err()
            .unwrap();
        assert_eq!(
            err,
            RegistryError::ForeignPlotType {
                dataset: "cemba_cell".into(),
                plot_type: "loop_zoom_in".into()
            }
        );
    }

    #[test]
    fn test_render_titles_and_widths() {
        let registry = full_builder().build().unwrap();
        assert_eq!(registry.len(), 6);

        let spec = parse_spec_line("higlass,loop_zoom_in,CA3 Glut,chr1:1-2").unwrap();
        let view = registry.render("1-0", &spec).unwrap();
        assert_eq!(view.title, "Loop Zoom In: x");
        assert_eq!(view.width, PanelWidth::Full);

        let spec = parse_spec_line("cemba_cell,categorical_scatter,l1_tsne,CellClass").unwrap();
        assert_eq!(registry.render("1-1", &spec).unwrap().width, PanelWidth::Third);
    }

    #[test]
    fn test_render_swallows_handler_error() {
        let registry = full_builder()
            .handler(DatasetName::CembaCell, PlotType::ContinuousScatter, |_, _| {
                Err(RenderError::EmptyPlot("x".into()))
            })
            .build()
            .unwrap();
        let spec = parse_spec_line("cemba_cell,continuous_scatter,l1_tsne,x").unwrap();
        assert!(registry.render("1-0", &spec).is_none());
        assert!(matches!(
            registry.try_render("1-0", &spec),
            Err(PanelError::Render(RenderError::EmptyPlot(_)))
        ));
    }

    #[test]
    fn test_catalog_lists_examples_that_parse() {
        let catalog = full_builder().build().unwrap().catalog();
        assert_eq!(catalog.datasets.len(), 2);
        for dataset in &catalog.datasets {
            for pt in &dataset.plot_types {
                let spec = parse_spec_line(&pt.example).unwrap();
                assert_eq!(spec.plot_type.to_string(), pt.name);
            }
        }
    }
}
