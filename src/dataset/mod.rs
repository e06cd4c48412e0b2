//! Dataset interface consumed by the rendering adapters
//!
//! A dataset is a named source of coordinates, per-observation metadata and
//! observation-by-variable matrices. [`InMemoryDataset`] is the concrete
//! implementation, loaded from a JSON [`DatasetBundle`].

pub mod genome;

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::DatasetError;
pub use genome::{GeneRecord, GenomeBundle, GenomeRef, GenomicRegion};

// ============================================================================
// Values
// ============================================================================

/// Two-column coordinates keyed by observation id
#[derive(Debug, Clone, PartialEq)]
pub struct Coords {
    pub name: String,
    pub points: BTreeMap<String, (f64, f64)>,
}

/// One variable across observations; missing observations are absent
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    Numeric(BTreeMap<String, f64>),
    Categorical(BTreeMap<String, String>),
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(m) => m.len(),
            Self::Categorical(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Build from raw JSON values: all-numeric becomes numeric, otherwise categorical
    fn from_json(name: &str, values: BTreeMap<String, Value>) -> Result<Self, DatasetError> {
        let present: Vec<(String, Value)> =
            values.into_iter().filter(|(_, v)| !v.is_null()).collect();

        if present.iter().all(|(_, v)| v.is_number()) {
            let numeric = present
                .into_iter()
                .filter_map(|(id, v)| v.as_f64().map(|f| (id, f)))
                .collect();
            return Ok(Self::Numeric(numeric));
        }

        present
            .into_iter()
            .map(|(id, v)| match v {
                Value::String(s) => Ok((id, s)),
                Value::Number(n) => Ok((id, n.to_string())),
                Value::Bool(b) => Ok((id, b.to_string())),
                _ => Err(DatasetError::Bundle(format!(
                    "metadata '{}' has a non-scalar value for '{}'",
                    name, id
                ))),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self::Categorical)
    }
}

// ============================================================================
// Dataset trait
// ============================================================================

pub trait Dataset: Send + Sync {
    fn name(&self) -> &str;

    fn coord_names(&self) -> Vec<String>;

    fn metadata_names(&self) -> Vec<String>;

    fn var_set_names(&self) -> Vec<String>;

    fn get_coords(&self, name: &str) -> Result<Arc<Coords>, DatasetError>;

    fn get_metadata(&self, name: &str) -> Result<Arc<Series>, DatasetError>;

    fn get_var_values(&self, set_name: &str, var_name: &str) -> Result<Arc<Series>, DatasetError>;

    /// `chrom:start-end` for a gene name or id
    fn region_for_gene(&self, name: &str) -> Result<String, DatasetError>;

    /// Gene id for a gene name; ids pass through
    fn gene_id(&self, gene: &str) -> Result<String, DatasetError>;

    /// Category -> color for a categorical variable, when the dataset has one
    fn palette(&self, name: &str) -> Option<BTreeMap<String, String>>;

    /// Values behind a scatter color string
    ///
    /// Either a metadata name (`CellSubClass`) or `<var_set>:<gene>`
    /// (`gene_mch:Gad1`), where the gene may be a name or an id.
    fn get_color_values(&self, color: &str) -> Result<Arc<Series>, DatasetError> {
        if self.metadata_names().iter().any(|m| m == color) {
            return self.get_metadata(color);
        }
        match color.split_once(':') {
            Some((set, gene)) if self.var_set_names().iter().any(|s| s == set) => {
                let gene_id = self.gene_id(gene)?;
                self.get_var_values(set, &gene_id)
            }
            Some((set, _)) => Err(DatasetError::UnknownVarSet(set.to_string())),
            None => Err(DatasetError::UnknownMetadata(color.to_string())),
        }
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// On-disk dataset bundle
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetBundle {
    pub cells: CellBundle,
    pub genome: GenomeBundle,
    /// HiGlass track name (`"<cell type> <modality>"`) -> tileset uuid
    #[serde(default)]
    pub tracks: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CellBundle {
    #[serde(default = "default_cell_dataset_name")]
    pub name: String,
    /// coord name -> obs id -> `[x, y]`
    #[serde(default)]
    pub coords: BTreeMap<String, BTreeMap<String, [f64; 2]>>,
    /// metadata name -> obs id -> scalar
    #[serde(default)]
    pub metadata: BTreeMap<String, BTreeMap<String, Value>>,
    /// var set -> var (gene id) -> obs id -> value
    #[serde(default)]
    pub var_sets: BTreeMap<String, BTreeMap<String, BTreeMap<String, Option<f64>>>>,
    /// metadata name -> category -> color
    #[serde(default)]
    pub palettes: BTreeMap<String, BTreeMap<String, String>>,
}

fn default_cell_dataset_name() -> String {
    "cemba_cell".to_string()
}

impl DatasetBundle {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DatasetError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let bundle = Self::from_json_str(&text)?;
        tracing::info!(
            "Loaded dataset bundle {}: {} coords, {} metadata, {} genes, {} tracks",
            path.display(),
            bundle.cells.coords.len(),
            bundle.cells.metadata.len(),
            bundle.genome.genes.len(),
            bundle.tracks.len()
        );
        Ok(bundle)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DatasetError> {
        serde_json::from_str(text).map_err(|e| DatasetError::Bundle(e.to_string()))
    }
}

// ============================================================================
// InMemoryDataset
// ============================================================================

pub struct InMemoryDataset {
    name: String,
    genome: Arc<GenomeRef>,
    coords: BTreeMap<String, Arc<Coords>>,
    metadata: BTreeMap<String, Arc<Series>>,
    var_sets: BTreeMap<String, BTreeMap<String, Arc<Series>>>,
    palettes: BTreeMap<String, BTreeMap<String, String>>,
}

impl InMemoryDataset {
    pub fn new(name: impl Into<String>, genome: Arc<GenomeRef>) -> Self {
        Self {
            name: name.into(),
            genome,
            coords: BTreeMap::new(),
            metadata: BTreeMap::new(),
            var_sets: BTreeMap::new(),
            palettes: BTreeMap::new(),
        }
    }

    pub fn from_bundle(cells: CellBundle, genome: Arc<GenomeRef>) -> Result<Self, DatasetError> {
        let mut dataset = Self::new(cells.name, genome);

        for (name, points) in cells.coords {
            let points = points.into_iter().map(|(id, [x, y])| (id, (x, y))).collect();
            dataset.add_coords(name, points);
        }
        for (name, values) in cells.metadata {
            let series = Series::from_json(&name, values)?;
            dataset.add_metadata(name, series);
        }
        for (set, vars) in cells.var_sets {
            for (var, values) in vars {
                let numeric = values
                    .into_iter()
                    .filter_map(|(id, v)| v.map(|f| (id, f)))
                    .collect();
                dataset.add_var_values(&set, var, Series::Numeric(numeric));
            }
        }
        for (name, palette) in cells.palettes {
            dataset.add_palette(name, palette);
        }
        Ok(dataset)
    }

    pub fn add_coords(&mut self, name: impl Into<String>, points: BTreeMap<String, (f64, f64)>) {
        let name = name.into();
        self.coords
            .insert(name.clone(), Arc::new(Coords { name, points }));
    }

    pub fn add_metadata(&mut self, name: impl Into<String>, series: Series) {
        self.metadata.insert(name.into(), Arc::new(series));
    }

    pub fn add_var_values(&mut self, set_name: &str, var_name: impl Into<String>, series: Series) {
        self.var_sets
            .entry(set_name.to_string())
            .or_default()
            .insert(var_name.into(), Arc::new(series));
    }

    pub fn add_palette(&mut self, name: impl Into<String>, palette: BTreeMap<String, String>) {
        self.palettes.insert(name.into(), palette);
    }

    pub fn genome(&self) -> &Arc<GenomeRef> {
        &self.genome
    }
}

impl Dataset for InMemoryDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn coord_names(&self) -> Vec<String> {
        self.coords.keys().cloned().collect()
    }

    fn metadata_names(&self) -> Vec<String> {
        self.metadata.keys().cloned().collect()
    }

    fn var_set_names(&self) -> Vec<String> {
        self.var_sets.keys().cloned().collect()
    }

    fn get_coords(&self, name: &str) -> Result<Arc<Coords>, DatasetError> {
        self.coords
            .get(name)
            .cloned()
            .ok_or_else(|| DatasetError::UnknownCoords(name.to_string()))
    }

    fn get_metadata(&self, name: &str) -> Result<Arc<Series>, DatasetError> {
        self.metadata
            .get(name)
            .cloned()
            .ok_or_else(|| DatasetError::UnknownMetadata(name.to_string()))
    }

    fn get_var_values(&self, set_name: &str, var_name: &str) -> Result<Arc<Series>, DatasetError> {
        let set = self
            .var_sets
            .get(set_name)
            .ok_or_else(|| DatasetError::UnknownVarSet(set_name.to_string()))?;
        set.get(var_name)
            .cloned()
            .ok_or_else(|| DatasetError::UnknownVariable {
                set: set_name.to_string(),
                var: var_name.to_string(),
            })
    }

    fn region_for_gene(&self, name: &str) -> Result<String, DatasetError> {
        Ok(self.genome.region_for_gene(name)?.to_string())
    }

    fn gene_id(&self, gene: &str) -> Result<String, DatasetError> {
        self.genome.to_gene_id(gene)
    }

    fn palette(&self, name: &str) -> Option<BTreeMap<String, String>> {
        self.palettes.get(name).cloned()
    }
}
