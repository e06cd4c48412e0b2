//! HiGlass genome-browser panels
//!
//! Four layouts, each built as a HiGlass view config and wrapped in an HTML
//! fragment with an explicit pixel height:
//!
//! | Layout | Views |
//! |--------|-------|
//! | `multi_cell_type_2d` | one 2-D view per cell type, locked together |
//! | `multi_cell_type_1d` | one view of stacked 1-D tracks |
//! | `two_cell_type_diff` | cell type 1, log ratio, cell type 2 |
//! | `loop_zoom_in` | overview with a projection of the zoomed view |
//!
//! Cell-type tilesets come from a [`TrackTable`] keyed `"<cell type> <modality>"`.

use panel_dsl::PanelSpec;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::args::{bind, BoundArgs, Param};
use super::{PanelContent, PanelControls, RenderedPanel};
use crate::dataset::genome::DEFAULT_EXTEND_FOLD;
use crate::dataset::GenomeRef;
use crate::error::RenderError;

pub const PUBLIC_SERVER: &str = "http://higlass.io/api/v1";

pub const ALL_MODALITY_1D: [&str; 5] = [
    "ATAC CPM",
    "mCH Frac",
    "mCG Frac",
    "Domain Boundary",
    "Compartment Score",
];
pub const ALL_MODALITY_2D: [&str; 3] = ["Impute 100K", "Impute 10K", "Raw 100K"];

const GRID_COLUMNS: u32 = 12;
const POSITIONS: [&str; 5] = ["top", "bottom", "left", "right", "center"];

const HGLIB_CSS: &str = "https://unpkg.com/higlass@1.11/dist/hglib.css";
const HGLIB_JS: &str = "https://unpkg.com/higlass@1.11/dist/hglib.min.js";
const REACT_JS: &str = "https://unpkg.com/react@17/umd/react.production.min.js";
const REACT_DOM_JS: &str = "https://unpkg.com/react-dom@17/umd/react-dom.production.min.js";

const MULTI_2D_PARAMS: [Param; 6] = [
    Param::required("cell_types"),
    Param::optional("modality_2d"),
    Param::optional("modality_1d"),
    Param::optional("region1"),
    Param::optional("region2"),
    Param::with_default("add_genome_track", "true"),
];

const MULTI_1D_PARAMS: [Param; 6] = [
    Param::required("cell_types"),
    Param::optional("modalities"),
    Param::optional("region"),
    Param::with_default("colorby", "modality"),
    Param::with_default("groupby", "modality"),
    Param::with_default("add_genome_track", "true"),
];

const DIFF_PARAMS: [Param; 7] = [
    Param::required("cell_type_1"),
    Param::required("cell_type_2"),
    Param::optional("region1"),
    Param::optional("region2"),
    Param::optional("modality_2d"),
    Param::optional("modality_1d"),
    Param::with_default("add_genome_track", "true"),
];

const LOOP_PARAMS: [Param; 6] = [
    Param::required("cell_type"),
    Param::required("region1"),
    Param::optional("region2"),
    Param::optional("modality_2d"),
    Param::optional("modality_1d"),
    Param::with_default("add_genome_track", "true"),
];

// ============================================================================
// Track table
// ============================================================================

/// Tileset uuids keyed by track name
#[derive(Debug, Clone, Default)]
pub struct TrackTable {
    tracks: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tile {
    name: String,
    uid: String,
}

impl TrackTable {
    pub fn new(tracks: BTreeMap<String, String>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Cell types that have at least one track
    pub fn cell_types(&self) -> Vec<String> {
        let mut cell_types: Vec<String> = self
            .tracks
            .keys()
            .filter_map(|name| {
                ALL_MODALITY_1D
                    .iter()
                    .chain(ALL_MODALITY_2D.iter())
                    .find_map(|m| name.strip_suffix(m))
                    .map(|ct| ct.trim_end().to_string())
            })
            .collect();
        cell_types.dedup();
        cell_types
    }

    /// A full track name wins over `"<cell type> <modality>"`
    fn lookup(&self, cell_type: &str, modality: &str) -> Result<Tile, RenderError> {
        if let Some(uid) = self.tracks.get(cell_type) {
            return Ok(Tile {
                name: cell_type.to_string(),
                uid: uid.clone(),
            });
        }
        let name = format!("{} {}", cell_type, modality);
        match self.tracks.get(&name) {
            Some(uid) => Ok(Tile {
                uid: uid.clone(),
                name,
            }),
            None => Err(RenderError::MissingTrack {
                cell_type: cell_type.to_string(),
                modality: modality.to_string(),
            }),
        }
    }
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone)]
struct View {
    uid: String,
    width: u32,
    tracks: BTreeMap<&'static str, Vec<Value>>,
    next_track: usize,
    x_domain: Option<(f64, f64)>,
    y_domain: Option<(f64, f64)>,
}

impl View {
    fn new(uid: String, width: u32) -> Self {
        Self {
            uid,
            width,
            tracks: BTreeMap::new(),
            next_track: 0,
            x_domain: None,
            y_domain: None,
        }
    }

    fn push(&mut self, position: &'static str, mut track: Value) {
        track["uid"] = json!(format!("{}-t{}", self.uid, self.next_track));
        self.next_track += 1;
        self.tracks.entry(position).or_default().push(track);
    }

    fn set_domain(&mut self, x: (f64, f64), y: Option<(f64, f64)>) {
        self.x_domain = Some(x);
        self.y_domain = y;
    }

    /// Stacked 1-D heights plus the tallest center track
    fn height(&self) -> u32 {
        let sum = |pos: &str| -> u32 {
            self.tracks
                .get(pos)
                .map(|ts| ts.iter().map(track_height).sum())
                .unwrap_or(0)
        };
        let center = self
            .tracks
            .get("center")
            .and_then(|ts| ts.iter().map(track_height).max())
            .unwrap_or(0);
        sum("top") + sum("bottom") + center
    }
}

fn track_height(track: &Value) -> u32 {
    track["height"].as_u64().unwrap_or(0) as u32
}

/// Views plus everything the panel needs besides the view config
struct BrowserLayout {
    views: Vec<View>,
    lock: bool,
    subject: String,
    controls: PanelControls,
}

pub fn auto_view_width(n_cell_types: usize) -> u32 {
    match n_cell_types {
        0 | 1 => 12,
        2 => 6,
        3 => 4,
        _ => 3,
    }
}

// ============================================================================
// Renderer
// ============================================================================

#[derive(Debug, Clone)]
struct HiglassOptions {
    /// Where 1-D tracks go on 2-D views
    pos_1d: &'static str,
    height_1d: u32,
    height_2d: u32,
    default_modality_2d: String,
    default_modality_1d: Vec<String>,
    show_tooltip: bool,
    show_mouse_position: bool,
    position_search_box: bool,
}

impl Default for HiglassOptions {
    fn default() -> Self {
        Self {
            pos_1d: "top",
            height_1d: 25,
            height_2d: 500,
            default_modality_2d: "Impute 10K".to_string(),
            default_modality_1d: vec!["mCH Frac".into(), "mCG Frac".into(), "ATAC CPM".into()],
            show_tooltip: true,
            show_mouse_position: true,
            position_search_box: true,
        }
    }
}

pub struct HiglassRenderer {
    server: String,
    tracks: TrackTable,
    genome: Arc<GenomeRef>,
    options: HiglassOptions,
    subclass_palette: BTreeMap<String, String>,
}

impl HiglassRenderer {
    pub fn new(server: impl Into<String>, tracks: TrackTable, genome: Arc<GenomeRef>) -> Self {
        Self {
            server: server.into(),
            tracks,
            genome,
            options: HiglassOptions::default(),
            subclass_palette: BTreeMap::new(),
        }
    }

    pub fn with_subclass_palette(mut self, palette: BTreeMap<String, String>) -> Self {
        self.subclass_palette = palette;
        self
    }

    pub fn tracks(&self) -> &TrackTable {
        &self.tracks
    }

    pub fn multi_cell_type_2d(
        &self,
        panel_key: &str,
        spec: &PanelSpec,
    ) -> Result<RenderedPanel, RenderError> {
        let layout = self.multi_cell_type_2d_layout(panel_key, spec)?;
        Ok(self.render_layout(panel_key, layout))
    }

    pub fn multi_cell_type_1d(
        &self,
        panel_key: &str,
        spec: &PanelSpec,
    ) -> Result<RenderedPanel, RenderError> {
        let layout = self.multi_cell_type_1d_layout(panel_key, spec)?;
        Ok(self.render_layout(panel_key, layout))
    }

    pub fn two_cell_type_diff(
        &self,
        panel_key: &str,
        spec: &PanelSpec,
    ) -> Result<RenderedPanel, RenderError> {
        let layout = self.two_cell_type_diff_layout(panel_key, spec)?;
        Ok(self.render_layout(panel_key, layout))
    }

    pub fn loop_zoom_in(
        &self,
        panel_key: &str,
        spec: &PanelSpec,
    ) -> Result<RenderedPanel, RenderError> {
        let layout = self.loop_zoom_in_layout(panel_key, spec)?;
        Ok(self.render_layout(panel_key, layout))
    }

    // ------------------------------------------------------------------------
    // Layouts
    // ------------------------------------------------------------------------

    fn multi_cell_type_2d_layout(
        &self,
        panel_key: &str,
        spec: &PanelSpec,
    ) -> Result<BrowserLayout, RenderError> {
        let args = bind(&MULTI_2D_PARAMS, &spec.args, &spec.kwargs)?;
        let cell_types = cell_type_list(&args, "cell_types")?;
        let modality_2d = self.modality_2d(&args)?;
        let modality_1d = self.modality_1d(&args, "modality_1d")?;
        let genome_tracks = args.get_bool("add_genome_track")?.unwrap_or(true);
        let domains = self.domains(args.get("region1"), args.get("region2"))?;

        let width = auto_view_width(cell_types.len());
        let mut views = Vec::with_capacity(cell_types.len());
        for (i, cell_type) in cell_types.iter().enumerate() {
            let mut view = View::new(format!("{}-v{}", panel_key, i), width);

            let center = self.tracks.lookup(cell_type, &modality_2d)?;
            view.push("center", self.tileset_track("heatmap", &center, self.options.height_2d));
            if genome_tracks {
                for track in self.genome_tracks() {
                    view.push("top", track);
                }
            }
            for modality in &modality_1d {
                let tile = self.tracks.lookup(cell_type, modality)?;
                let track = self.tileset_track(bar_type(modality), &tile, self.options.height_1d);
                view.push(self.options.pos_1d, track);
            }
            if let Some((x, y)) = domains {
                view.set_domain(x, Some(y));
            }
            views.push(view);
        }

        let controls = PanelControls::default()
            .field("cell_types", "Cell types", cell_types.join("|"))
            .field("region1", "Region", args.get("region1").unwrap_or_default())
            .select("modality_2d", "2-D modality", &modality_2d, strings(&ALL_MODALITY_2D))
            .field("modality_1d", "1-D modalities", modality_1d.join("|"));

        Ok(BrowserLayout {
            views,
            lock: true,
            subject: cell_types.join(", "),
            controls,
        })
    }

    fn multi_cell_type_1d_layout(
        &self,
        panel_key: &str,
        spec: &PanelSpec,
    ) -> Result<BrowserLayout, RenderError> {
        let args = bind(&MULTI_1D_PARAMS, &spec.args, &spec.kwargs)?;
        let cell_types = cell_type_list(&args, "cell_types")?;
        let modalities = self.modality_1d(&args, "modalities")?;
        let colorby = args
            .get_choice("colorby", &["modality", "subclass"])?
            .unwrap_or_else(|| "modality".to_string());
        let groupby = args
            .get_choice("groupby", &["modality", "cell_type"])?
            .unwrap_or_else(|| "modality".to_string());
        let genome_tracks = args.get_bool("add_genome_track")?.unwrap_or(true);

        let groups: Vec<(&String, &String)> = if groupby == "modality" {
            modalities
                .iter()
                .flat_map(|m| cell_types.iter().map(move |ct| (ct, m)))
                .collect()
        } else {
            cell_types
                .iter()
                .flat_map(|ct| modalities.iter().map(move |m| (ct, m)))
                .collect()
        };

        let mut view = View::new(format!("{}-v0", panel_key), GRID_COLUMNS);
        if genome_tracks {
            for track in self.genome_tracks() {
                view.push("top", track);
            }
        }
        for (cell_type, modality) in groups {
            let tile = self.tracks.lookup(cell_type, modality)?;
            let mut track = self.tileset_track(bar_type(modality), &tile, self.options.height_1d);
            let colors = if colorby == "modality" {
                modality_colors(modality)
            } else {
                self.subclass_colors(cell_type, modality)
            };
            for (key, color) in colors {
                track["options"][key] = json!(color);
            }
            view.push("top", track);
        }
        if let Some(region) = args.get("region") {
            view.set_domain(self.domain(region)?, None);
        }

        let controls = PanelControls::default()
            .field("cell_types", "Cell types", cell_types.join("|"))
            .field("region", "Region", args.get("region").unwrap_or_default())
            .field("modalities", "Modalities", modalities.join("|"))
            .select("colorby", "Color by", &colorby, strings(&["modality", "subclass"]));

        Ok(BrowserLayout {
            views: vec![view],
            lock: false,
            subject: cell_types.join(", "),
            controls,
        })
    }

    fn two_cell_type_diff_layout(
        &self,
        panel_key: &str,
        spec: &PanelSpec,
    ) -> Result<BrowserLayout, RenderError> {
        let args = bind(&DIFF_PARAMS, &spec.args, &spec.kwargs)?;
        let cell_type_1 = args.require("cell_type_1")?;
        let cell_type_2 = args.require("cell_type_2")?;
        let modality_2d = self.modality_2d(&args)?;
        let modality_1d = self.modality_1d(&args, "modality_1d")?;
        let genome_tracks = args.get_bool("add_genome_track")?.unwrap_or(true);
        let domains = self.domains(args.get("region1"), args.get("region2"))?;

        let mut left = View::new(format!("{}-v0", panel_key), 4);
        let mut ratio = View::new(format!("{}-v1", panel_key), 4);
        let mut right = View::new(format!("{}-v2", panel_key), 4);

        let tile_1 = self.tracks.lookup(cell_type_1, &modality_2d)?;
        let tile_2 = self.tracks.lookup(cell_type_2, &modality_2d)?;
        let h2d = self.options.height_2d;
        left.push("center", self.tileset_track("heatmap", &tile_1, h2d));
        right.push("center", self.tileset_track("heatmap", &tile_2, h2d));
        ratio.push(
            "center",
            self.divided_track(
                "heatmap",
                (&tile_1, &tile_2),
                format!("{} (left / right) - log scale", modality_2d),
                h2d,
                json!({"colorRange": ["blue", "white", "red"], "valueScaleMin": 0.1, "valueScaleMax": 10}),
            ),
        );

        if genome_tracks {
            for view in [&mut left, &mut ratio, &mut right] {
                for track in self.genome_tracks() {
                    view.push("top", track);
                }
            }
        }

        let h1d = self.options.height_1d;
        for modality in &modality_1d {
            let a = self.tracks.lookup(cell_type_1, modality)?;
            let b = self.tracks.lookup(cell_type_2, modality)?;
            left.push(self.options.pos_1d, self.tileset_track("bar", &a, h1d));
            right.push(self.options.pos_1d, self.tileset_track("bar", &b, h1d));
            ratio.push(
                self.options.pos_1d,
                self.divided_track(
                    "divergent-bar",
                    (&a, &b),
                    format!("{} (left / right) - log scale", modality),
                    h1d,
                    json!({"valueScaleMin": 0.1, "valueScaleMax": 10, "valueScaling": "log"}),
                ),
            );
        }

        if let Some((x, y)) = domains {
            for view in [&mut left, &mut ratio, &mut right] {
                view.set_domain(x, Some(y));
            }
        }

        let controls = PanelControls::default()
            .field("cell_type_1", "Cell type 1", cell_type_1)
            .field("cell_type_2", "Cell type 2", cell_type_2)
            .field("region1", "Region", args.get("region1").unwrap_or_default())
            .select("modality_2d", "2-D modality", &modality_2d, strings(&ALL_MODALITY_2D));

        Ok(BrowserLayout {
            views: vec![left, ratio, right],
            lock: true,
            subject: format!("{} vs {}", cell_type_1, cell_type_2),
            controls,
        })
    }

    fn loop_zoom_in_layout(
        &self,
        panel_key: &str,
        spec: &PanelSpec,
    ) -> Result<BrowserLayout, RenderError> {
        let args = bind(&LOOP_PARAMS, &spec.args, &spec.kwargs)?;
        let cell_type = args.require("cell_type")?;
        let region1 = args.require("region1")?;
        let region2 = args.get("region2").unwrap_or(region1);
        let modality_2d = self.modality_2d(&args)?;
        let modality_1d = self.modality_1d(&args, "modality_1d")?;
        let genome_tracks = args.get_bool("add_genome_track")?.unwrap_or(true);

        let domain_x = self.domain(region1)?;
        let domain_y = self.domain(region2)?;
        let overview = (domain_x.0.min(domain_y.0), domain_x.1.max(domain_y.1));

        let mut global = View::new(format!("{}-v0", panel_key), 6);
        let mut zoom = View::new(format!("{}-v1", panel_key), 6);

        let center = self.tracks.lookup(cell_type, &modality_2d)?;
        let h2d = self.options.height_2d;
        global.push("center", self.tileset_track("heatmap", &center, h2d));
        zoom.push("center", self.tileset_track("heatmap", &center, h2d));

        if genome_tracks {
            for track in self.genome_tracks() {
                global.push("top", track.clone());
                global.push("left", track.clone());
                zoom.push("top", track);
            }
        }

        let h1d = self.options.height_1d;
        for modality in &modality_1d {
            let tile = self.tracks.lookup(cell_type, modality)?;
            let bar = self.tileset_track("bar", &tile, h1d);
            global.push("top", bar.clone());
            zoom.push("top", bar.clone());
            global.push("left", bar.clone());
            zoom.push("right", bar);
        }

        // Genome tracks outermost on the right
        if genome_tracks {
            for track in self.genome_tracks().into_iter().rev() {
                zoom.push("right", track);
            }
        }

        global.push(
            "center",
            json!({
                "type": "viewport-projection-center",
                "fromViewUid": zoom.uid,
                "options": {
                    "projectionFillColor": "#777",
                    "projectionStrokeColor": "#777",
                    "projectionFillOpacity": 0.3,
                    "strokeWidth": 1
                }
            }),
        );
        global.set_domain(overview, Some(overview));
        zoom.set_domain(domain_x, Some(domain_y));

        let controls = PanelControls::default()
            .field("cell_type", "Cell type", cell_type)
            .field("region1", "Region 1", region1)
            .field("region2", "Region 2", region2)
            .select("modality_2d", "2-D modality", &modality_2d, strings(&ALL_MODALITY_2D));

        Ok(BrowserLayout {
            views: vec![global, zoom],
            lock: false,
            subject: cell_type.to_string(),
            controls,
        })
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn modality_2d(&self, args: &BoundArgs) -> Result<String, RenderError> {
        Ok(args
            .get_choice("modality_2d", &ALL_MODALITY_2D)?
            .unwrap_or_else(|| self.options.default_modality_2d.clone()))
    }

    fn modality_1d(&self, args: &BoundArgs, name: &str) -> Result<Vec<String>, RenderError> {
        let modalities = args
            .get_list(name)
            .unwrap_or_else(|| self.options.default_modality_1d.clone());
        match modalities
            .iter()
            .find(|m| !ALL_MODALITY_1D.contains(&m.as_str()))
        {
            Some(bad) => Err(RenderError::InvalidChoice {
                param: name.to_string(),
                value: bad.clone(),
                allowed: strings(&ALL_MODALITY_1D),
            }),
            None => Ok(modalities),
        }
    }

    fn domain(&self, region_or_gene: &str) -> Result<(f64, f64), RenderError> {
        let region = self.genome.resolve_region(region_or_gene)?;
        Ok(self.genome.region_to_global(&region, DEFAULT_EXTEND_FOLD)?)
    }

    /// x from `region1`, y from `region2` falling back to `region1`
    #[allow(clippy::type_complexity)]
    fn domains(
        &self,
        region1: Option<&str>,
        region2: Option<&str>,
    ) -> Result<Option<((f64, f64), (f64, f64))>, RenderError> {
        let Some(region1) = region1 else {
            return Ok(None);
        };
        let x = self.domain(region1)?;
        let y = match region2 {
            Some(region2) => self.domain(region2)?,
            None => x,
        };
        Ok(Some((x, y)))
    }

    fn track_options(&self, name: &str) -> Value {
        json!({
            "name": name,
            "showTooltip": self.options.show_tooltip,
            "showMousePosition": self.options.show_mouse_position,
        })
    }

    fn tileset_track(&self, track_type: &str, tile: &Tile, height: u32) -> Value {
        json!({
            "type": track_type,
            "server": self.server,
            "tilesetUid": tile.uid,
            "height": height,
            "options": self.track_options(&tile.name),
        })
    }

    fn divided_track(
        &self,
        track_type: &str,
        (numerator, denominator): (&Tile, &Tile),
        name: String,
        height: u32,
        extra_options: Value,
    ) -> Value {
        let mut options = self.track_options(&name);
        if let (Some(opts), Value::Object(extra)) = (options.as_object_mut(), extra_options) {
            opts.extend(extra);
        }
        json!({
            "type": track_type,
            "height": height,
            "data": {
                "type": "divided",
                "children": [
                    {"server": self.server, "tilesetUid": numerator.uid},
                    {"server": self.server, "tilesetUid": denominator.uid}
                ]
            },
            "options": options,
        })
    }

    fn genome_tracks(&self) -> Vec<Value> {
        vec![
            json!({
                "type": "chromosome-labels",
                "server": PUBLIC_SERVER,
                "tilesetUid": "EtrWT0VtScixmsmwFSd7zg",
                "height": 25,
                "options": self.track_options("mm10 Chrom Sizes"),
            }),
            json!({
                "type": "gene-annotations",
                "server": PUBLIC_SERVER,
                "tilesetUid": "QDutvmyiSrec5nX4pA5WGQ",
                "height": 100,
                "options": self.track_options("mm10 Gene Annotations"),
            }),
        ]
    }

    fn subclass_colors(&self, cell_type: &str, modality: &str) -> Vec<(&'static str, String)> {
        match self.subclass_palette.get(cell_type) {
            Some(color) if modality == "Compartment Score" => vec![
                ("barFillColorTop", color.clone()),
                ("barFillColorBottom", color.clone()),
            ],
            Some(color) => vec![("barFillColor", color.clone())],
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // View config and HTML
    // ------------------------------------------------------------------------

    /// View config and total pixel height; views wrap onto rows of 12 columns
    fn assemble(&self, layout: &BrowserLayout) -> (Value, u32) {
        let mut json_views = Vec::with_capacity(layout.views.len());
        let (mut x, mut row, mut row_height, mut total) = (0u32, 0u32, 0u32, 0u32);

        for view in &layout.views {
            if x > 0 && x + view.width > GRID_COLUMNS {
                total += row_height;
                row += 1;
                x = 0;
                row_height = 0;
            }
            row_height = row_height.max(view.height());
            json_views.push(self.view_json(view, x, row));
            x += view.width;
        }
        total += row_height;

        let uids: Vec<&str> = layout.views.iter().map(|v| v.uid.as_str()).collect();
        let locks = |kind: &str| {
            if layout.lock {
                view_locks(kind, &uids)
            } else {
                empty_locks()
            }
        };

        let viewconf = json!({
            "editable": true,
            "trackSourceServers": [self.server, PUBLIC_SERVER],
            "views": json_views,
            "zoomLocks": locks("zoom"),
            "locationLocks": locks("location"),
            "valueScaleLocks": empty_locks(),
        });
        (viewconf, total)
    }

    fn view_json(&self, view: &View, x: u32, row: u32) -> Value {
        let tracks: Map<String, Value> = POSITIONS
            .iter()
            .map(|pos| {
                let list = view.tracks.get(pos).cloned().unwrap_or_default();
                (pos.to_string(), Value::Array(list))
            })
            .collect();

        let mut json_view = json!({
            "uid": view.uid,
            "layout": {"x": x, "y": row * GRID_COLUMNS, "w": view.width, "h": GRID_COLUMNS},
            "tracks": tracks,
        });
        if let Some((a, b)) = view.x_domain {
            json_view["initialXDomain"] = json!([a, b]);
        }
        if let Some((a, b)) = view.y_domain {
            json_view["initialYDomain"] = json!([a, b]);
        }
        if self.options.position_search_box {
            json_view["genomePositionSearchBoxVisible"] = json!(true);
            json_view["genomePositionSearchBox"] = json!({
                "autocompleteServer": PUBLIC_SERVER,
                "chromInfoServer": PUBLIC_SERVER,
                "visible": true,
                "chromInfoId": "mm10",
            });
        }
        json_view
    }

    fn render_layout(&self, panel_key: &str, layout: BrowserLayout) -> RenderedPanel {
        let (viewconf, height) = self.assemble(&layout);
        let html = render_html(panel_key, &viewconf, height);
        tracing::debug!(
            "{}: HiGlass panel with {} view(s), {}px",
            panel_key,
            layout.views.len(),
            height
        );
        RenderedPanel {
            subject: layout.subject,
            content: PanelContent::Html { html, height },
            controls: layout.controls,
        }
    }
}

fn render_html(panel_key: &str, viewconf: &Value, height: u32) -> String {
    // Keep the JSON from closing the script element
    let conf = viewconf.to_string().replace("</", "<\\/");
    format!(
        r#"<link rel="stylesheet" href="{css}">
<script src="{react}"></script>
<script src="{react_dom}"></script>
<script src="{hglib}"></script>
<div id="higlass-{key}" style="width:100%;height:{height}px"></div>
<script>
hglib.viewer(document.getElementById("higlass-{key}"), {conf}, {{bounded: true}});
</script>"#,
        css = HGLIB_CSS,
        react = REACT_JS,
        react_dom = REACT_DOM_JS,
        hglib = HGLIB_JS,
        key = panel_key,
        height = height,
        conf = conf,
    )
}

fn view_locks(kind: &str, uids: &[&str]) -> Value {
    if uids.len() < 2 {
        return empty_locks();
    }
    let lock_uid = format!("{}-lock", kind);
    let by_view: Map<String, Value> = uids
        .iter()
        .map(|uid| (uid.to_string(), json!(lock_uid)))
        .collect();
    let mut lock = Map::new();
    lock.insert("uid".to_string(), json!(lock_uid));
    for uid in uids {
        lock.insert(uid.to_string(), json!([1, 1, 1]));
    }
    let mut dict = Map::new();
    dict.insert(lock_uid, Value::Object(lock));
    json!({"locksByViewUid": by_view, "locksDict": dict})
}

fn empty_locks() -> Value {
    json!({"locksByViewUid": {}, "locksDict": {}})
}

fn cell_type_list(args: &BoundArgs, name: &str) -> Result<Vec<String>, RenderError> {
    match args.get_list(name) {
        Some(list) if !list.is_empty() => Ok(list),
        _ => Err(RenderError::MissingArgument(name.to_string())),
    }
}

fn bar_type(modality: &str) -> &'static str {
    if modality == "Compartment Score" {
        "divergent-bar"
    } else {
        "bar"
    }
}

fn modality_colors(modality: &str) -> Vec<(&'static str, String)> {
    let pairs: &[(&'static str, &str)] = match modality {
        "ATAC CPM" => &[("barFillColor", "#1f77b4")],
        "mCH Frac" => &[("barFillColor", "#16499D")],
        "mCG Frac" => &[("barFillColor", "#36AE37")],
        "Domain Boundary" => &[("barFillColor", "#E71F19")],
        "Compartment Score" => &[
            ("barFillColorTop", "#E71F19"),
            ("barFillColorBottom", "#16499D"),
        ],
        _ => &[],
    };
    pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
