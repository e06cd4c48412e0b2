//! Cell scatter plots as Plotly figure JSON
//!
//! `continuous_scatter` colors points by a numeric variable on a fixed
//! viridis range; `categorical_scatter` draws one trace per category using
//! the dataset palette when it has one.

use panel_dsl::PanelSpec;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::args::{bind, BoundArgs, Param};
use super::{auto_size, PanelContent, PanelControls, RenderedPanel};
use crate::dataset::{Dataset, Series};
use crate::error::RenderError;

pub const SCATTER_PARAMS: [Param; 3] = [
    Param::required("coord"),
    Param::required("color"),
    Param::with_default("sample", "10000"),
];

pub const MARKER_SCALE: f64 = 3.0;
pub const CONTINUOUS_RANGE: (f64, f64) = (0.5, 2.0);

pub struct ScatterRenderer {
    dataset: Arc<dyn Dataset>,
}

impl ScatterRenderer {
    pub fn new(dataset: Arc<dyn Dataset>) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &Arc<dyn Dataset> {
        &self.dataset
    }

    pub fn continuous_scatter(
        &self,
        panel_key: &str,
        spec: &PanelSpec,
    ) -> Result<RenderedPanel, RenderError> {
        let args = bind(&SCATTER_PARAMS, &spec.args, &spec.kwargs)?;
        let (coord, color, sample) = Self::common_args(&args)?;

        let values = self.dataset.get_color_values(color)?;
        let Series::Numeric(values) = values.as_ref() else {
            return Err(RenderError::NotContinuous(color.to_string()));
        };
        let points = self.joined_points(coord, values, sample)?;
        if points.is_empty() {
            return Err(RenderError::EmptyPlot(color.to_string()));
        }
        tracing::debug!("{}: continuous scatter of {} points", panel_key, points.len());

        let (x, y, c) = unzip3(points);
        let figure = json!({
            "data": [{
                "type": "scattergl",
                "mode": "markers",
                "x": x,
                "y": y,
                "hoverinfo": "skip",
                "marker": {
                    "size": auto_size(c.len(), MARKER_SCALE),
                    "color": c,
                    "colorscale": "Viridis",
                    "cmin": CONTINUOUS_RANGE.0,
                    "cmax": CONTINUOUS_RANGE.1,
                    "showscale": true,
                    "colorbar": {"thickness": 10, "len": 0.2, "y": 0.5, "title": null}
                }
            }],
            "layout": common_layout(),
        });

        Ok(RenderedPanel {
            subject: color.replace(':', " "),
            content: PanelContent::Figure { figure },
            controls: self.controls(coord, color, sample),
        })
    }

    pub fn categorical_scatter(
        &self,
        panel_key: &str,
        spec: &PanelSpec,
    ) -> Result<RenderedPanel, RenderError> {
        let args = bind(&SCATTER_PARAMS, &spec.args, &spec.kwargs)?;
        let (coord, color, sample) = Self::common_args(&args)?;

        // Numeric values are plotted as their string form
        let labels: BTreeMap<String, String> = match self.dataset.get_color_values(color)?.as_ref()
        {
            Series::Categorical(m) => m.clone(),
            Series::Numeric(m) => m.iter().map(|(k, v)| (k.clone(), v.to_string())).collect(),
        };
        let points = self.joined_points(coord, &labels, sample)?;
        if points.is_empty() {
            return Err(RenderError::EmptyPlot(color.to_string()));
        }
        tracing::debug!("{}: categorical scatter of {} points", panel_key, points.len());

        let size = auto_size(points.len(), MARKER_SCALE);
        let palette = self.dataset.palette(color).unwrap_or_default();

        let mut groups: BTreeMap<String, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for (x, y, label) in points {
            let group = groups.entry(label).or_default();
            group.0.push(x);
            group.1.push(y);
        }

        let traces: Vec<Value> = groups
            .into_iter()
            .map(|(label, (x, y))| {
                let mut marker = json!({"size": size});
                if let Some(c) = palette.get(&label) {
                    marker["color"] = json!(c);
                }
                json!({
                    "type": "scattergl",
                    "mode": "markers",
                    "name": label,
                    "x": x,
                    "y": y,
                    "hoverinfo": "name",
                    "showlegend": false,
                    "marker": marker,
                })
            })
            .collect();

        Ok(RenderedPanel {
            subject: color.to_string(),
            content: PanelContent::Figure {
                figure: json!({"data": traces, "layout": common_layout()}),
            },
            controls: self.controls(coord, color, sample),
        })
    }

    fn common_args(args: &BoundArgs) -> Result<(&str, &str, usize), RenderError> {
        let coord = args.require("coord")?;
        let color = args.require("color")?;
        let sample = args.get_usize("sample")?.unwrap_or(10_000);
        Ok((coord, color, sample))
    }

    /// Points that have a color value, down-sampled to at most `sample`
    fn joined_points<T: Clone>(
        &self,
        coord: &str,
        values: &BTreeMap<String, T>,
        sample: usize,
    ) -> Result<Vec<(f64, f64, T)>, RenderError> {
        let coords = self.dataset.get_coords(coord)?;
        let joined: Vec<(f64, f64, T)> = coords
            .points
            .iter()
            .filter_map(|(id, &(x, y))| values.get(id).map(|v| (x, y, v.clone())))
            .collect();
        Ok(downsample(joined, sample))
    }

    fn controls(&self, coord: &str, color: &str, sample: usize) -> PanelControls {
        PanelControls::default()
            .select("coord", "Coordinates", coord, self.dataset.coord_names())
            .field("color", "Color by", color)
            .field("sample", "Max points", sample.to_string())
    }
}

/// Evenly spaced subset of at most `sample` items, order preserved
pub fn downsample<T>(items: Vec<T>, sample: usize) -> Vec<T> {
    let n = items.len();
    if n <= sample {
        return items;
    }
    items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| (i * sample) % n < sample)
        .map(|(_, item)| item)
        .collect()
}

fn unzip3(points: Vec<(f64, f64, f64)>) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut x = Vec::with_capacity(points.len());
    let mut y = Vec::with_capacity(points.len());
    let mut c = Vec::with_capacity(points.len());
    for (px, py, pc) in points {
        x.push(px);
        y.push(py);
        c.push(pc);
    }
    (x, y, c)
}

fn common_layout() -> Value {
    let axis = json!({"showgrid": false, "zeroline": false, "showticklabels": false, "title": ""});
    json!({
        "xaxis": axis.clone(),
        "yaxis": axis,
        "plot_bgcolor": "white",
        "paper_bgcolor": "white",
        "margin": {"l": 10, "r": 10, "t": 10, "b": 10},
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{GenomeRef, InMemoryDataset};
    use panel_dsl::parse_spec_line;

    fn renderer() -> ScatterRenderer {
        let mut ds = InMemoryDataset::new("cemba_cell", Arc::new(GenomeRef::default()));
        let points = (0..10)
            .map(|i| (format!("c{}", i), (i as f64, -(i as f64))))
            .collect();
        ds.add_coords("l1_tsne", points);
        ds.add_metadata(
            "CellClass",
            Series::Categorical(
                (0..10)
                    .map(|i| (format!("c{}", i), if i < 4 { "Glut" } else { "Gaba" }.to_string()))
                    .collect(),
            ),
        );
        // c9 has no value and is dropped
        ds.add_metadata(
            "mCHFrac",
            Series::Numeric((0..9).map(|i| (format!("c{}", i), 0.5 + i as f64 / 10.0)).collect()),
        );
        ds.add_palette("CellClass", [("Glut".to_string(), "#ff0000".to_string())].into());
        ScatterRenderer::new(Arc::new(ds))
    }

    fn spec(line: &str) -> PanelSpec {
        parse_spec_line(line).unwrap()
    }

    #[test]
    fn test_continuous_scatter_drops_missing_values() {
        let panel = renderer()
            .continuous_scatter("1-0", &spec("cemba_cell,continuous_scatter,l1_tsne,mCHFrac"))
            .unwrap();
        let PanelContent::Figure { figure } = panel.content else {
            panic!("expected figure");
        };
        assert_eq!(figure["data"][0]["x"].as_array().unwrap().len(), 9);
        assert_eq!(figure["data"][0]["marker"]["cmax"], 2.0);
        assert_eq!(panel.subject, "mCHFrac");
    }

    #[test]
    fn test_categorical_scatter_one_trace_per_category() {
        let panel = renderer()
            .categorical_scatter(
                "1-0",
                &spec("cemba_cell,categorical_scatter,l1_tsne,color=CellClass"),
            )
            .unwrap();
        let PanelContent::Figure { figure } = panel.content else {
            panic!("expected figure");
        };
        let traces = figure["data"].as_array().unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0]["name"], "Gaba");
        assert!(traces[0]["marker"].get("color").is_none());
        assert_eq!(traces[1]["marker"]["color"], "#ff0000");
        assert_eq!(panel.controls.fields[0].options, vec!["l1_tsne"]);
    }

    #[test]
    fn test_sample_limits_points() {
        let panel = renderer()
            .continuous_scatter(
                "1-0",
                &spec("cemba_cell,continuous_scatter,l1_tsne,mCHFrac,sample=3"),
            )
            .unwrap();
        let PanelContent::Figure { figure } = panel.content else {
            panic!("expected figure");
        };
        assert_eq!(figure["data"][0]["x"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_errors() {
        let r = renderer();
        assert!(matches!(
            r.continuous_scatter("1-0", &spec("cemba_cell,continuous_scatter,l1_tsne,CellClass")),
            Err(RenderError::NotContinuous(_))
        ));
        assert!(matches!(
            r.continuous_scatter("1-0", &spec("cemba_cell,continuous_scatter,l1_umap,mCHFrac")),
            Err(RenderError::Dataset(_))
        ));
        assert!(matches!(
            r.categorical_scatter("1-0", &spec("cemba_cell,categorical_scatter,l1_tsne")),
            Err(RenderError::MissingArgument(_))
        ));
    }

    #[test]
    fn test_downsample() {
        let items: Vec<usize> = (0..10).collect();
        assert_eq!(downsample(items.clone(), 20), items);
        let picked = downsample(items, 4);
        assert_eq!(picked.len(), 4);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
    }
}
