//! Panel spec AST
//!
//! A [`PanelSpec`] is the structured form of one spec line:
//!
//! ```text
//! dataset,plot_type,positional...,key=value...
//! ```
//!
//! Specs are immutable values. They are re-derived from text on every parse
//! and re-serialized through [`PanelSpec::to_spec_string`] for persistence.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Separator for list-valued keyword arguments (`cell_types=CA3 Glut|Sst Gaba`)
pub const LIST_SEPARATOR: char = '|';

// ============================================================================
// Datasets
// ============================================================================

/// Named data sources a panel can draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatasetName {
    /// Single-cell methylome atlas (coordinates, metadata, gene matrices)
    #[serde(rename = "cemba_cell")]
    CembaCell,
    /// Cell type genome browser backed by a HiGlass tile server
    #[serde(rename = "higlass")]
    Higlass,
}

impl DatasetName {
    pub const ALL: [DatasetName; 2] = [DatasetName::CembaCell, DatasetName::Higlass];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetName::CembaCell => "cemba_cell",
            DatasetName::Higlass => "higlass",
        }
    }

    /// Plot types this dataset can render
    pub fn plot_types(&self) -> &'static [PlotType] {
        match self {
            DatasetName::CembaCell => &[PlotType::ContinuousScatter, PlotType::CategoricalScatter],
            DatasetName::Higlass => &[
                PlotType::MultiCellType1d,
                PlotType::MultiCellType2d,
                PlotType::TwoCellTypeDiff,
                PlotType::LoopZoomIn,
            ],
        }
    }

    pub fn supports(&self, plot_type: PlotType) -> bool {
        self.plot_types().contains(&plot_type)
    }
}

impl FromStr for DatasetName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetName::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ParseError::UnknownDataset(s.to_string()))
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Plot types
// ============================================================================

/// Named rendering capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlotType {
    #[serde(rename = "continuous_scatter")]
    ContinuousScatter,
    #[serde(rename = "categorical_scatter")]
    CategoricalScatter,
    #[serde(rename = "multi_cell_type_1d")]
    MultiCellType1d,
    #[serde(rename = "multi_cell_type_2d")]
    MultiCellType2d,
    #[serde(rename = "two_cell_type_diff")]
    TwoCellTypeDiff,
    #[serde(rename = "loop_zoom_in")]
    LoopZoomIn,
}

impl PlotType {
    pub const ALL: [PlotType; 6] = [
        PlotType::ContinuousScatter,
        PlotType::CategoricalScatter,
        PlotType::MultiCellType1d,
        PlotType::MultiCellType2d,
        PlotType::TwoCellTypeDiff,
        PlotType::LoopZoomIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlotType::ContinuousScatter => "continuous_scatter",
            PlotType::CategoricalScatter => "categorical_scatter",
            PlotType::MultiCellType1d => "multi_cell_type_1d",
            PlotType::MultiCellType2d => "multi_cell_type_2d",
            PlotType::TwoCellTypeDiff => "two_cell_type_diff",
            PlotType::LoopZoomIn => "loop_zoom_in",
        }
    }

    /// Human-readable label for panel titles
    pub fn display_name(&self) -> &'static str {
        match self {
            PlotType::ContinuousScatter => "Continuous Scatter",
            PlotType::CategoricalScatter => "Categorical Scatter",
            PlotType::MultiCellType1d => "Multi Cell Type 1D",
            PlotType::MultiCellType2d => "Multi Cell Type 2D",
            PlotType::TwoCellTypeDiff => "Two Cell Type Diff",
            PlotType::LoopZoomIn => "Loop Zoom In",
        }
    }

    /// Genome browser layouts render full-width
    pub fn is_browser(&self) -> bool {
        DatasetName::Higlass.supports(*self)
    }
}

impl FromStr for PlotType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlotType::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParseError::UnknownPlotType(s.to_string()))
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Keyword arguments
// ============================================================================

/// Ordered keyword arguments
///
/// A repeated key keeps its first position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KwArgs {
    entries: Vec<(String, String)>,
}

impl KwArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KwArgs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut kwargs = KwArgs::new();
        for (k, v) in iter {
            kwargs.insert(k, v);
        }
        kwargs
    }
}

impl Serialize for KwArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for KwArgs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KwArgsVisitor;

        impl<'de> Visitor<'de> for KwArgsVisitor {
            type Value = KwArgs;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of string keyword arguments")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<KwArgs, A::Error> {
                let mut kwargs = KwArgs::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    kwargs.insert(k, v);
                }
                Ok(kwargs)
            }
        }

        deserializer.deserialize_map(KwArgsVisitor)
    }
}

// ============================================================================
// PanelSpec
// ============================================================================

/// Structured form of one spec line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSpec {
    pub dataset: DatasetName,
    pub plot_type: PlotType,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub kwargs: KwArgs,
}

impl PanelSpec {
    /// Build a spec, enforcing that the dataset offers the plot type
    pub fn new(
        dataset: DatasetName,
        plot_type: PlotType,
        args: Vec<String>,
        kwargs: KwArgs,
    ) -> Result<Self, ParseError> {
        if !dataset.supports(plot_type) {
            return Err(ParseError::PlotTypeNotInDataset {
                dataset: dataset.to_string(),
                plot_type: plot_type.to_string(),
            });
        }
        Ok(Self {
            dataset,
            plot_type,
            args,
            kwargs,
        })
    }

    /// Canonical spec line: dataset, plot type, positionals, then keywords
    pub fn to_spec_string(&self) -> String {
        let mut fields: Vec<String> = Vec::with_capacity(2 + self.args.len() + self.kwargs.len());
        fields.push(self.dataset.as_str().to_string());
        fields.push(self.plot_type.as_str().to_string());
        fields.extend(self.args.iter().cloned());
        fields.extend(self.kwargs.iter().map(|(k, v)| format!("{}={}", k, v)));
        fields.join(",")
    }
}

impl fmt::Display for PanelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_spec_string())
    }
}
