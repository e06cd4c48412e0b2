//! Case-insensitive alias tables
//!
//! Maps human or LLM-facing labels to the names the datasets and track table
//! use internally. Lookup ignores case and whitespace, so "Cell Subclass",
//! "cellsubclass" and "CellSubClass" resolve alike.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::schemas::{CATEGORICAL_VARIABLES, CONTINUOUS_VARIABLES};

/// Aliases shared by both schemas
const COMMON_ALIASES: [(&str, &str); 3] = [
    ("CellCluster", "CellGroup"),
    ("SubClass", "CellSubClass"),
    ("CellSubclass", "CellSubClass"),
];

/// Scatter color variables -> metadata column names
const SCATTER_ALIASES: [(&str, &str); 5] = [
    ("GlobalOverallmCCCFrac", "mCCCFrac"),
    ("GlobalOverallmCGFrac", "mCGFrac"),
    ("GlobalOverallmCHFrac", "mCHFrac"),
    ("CCFRegionAcronym", "CCF_acronym"),
    ("CCFRegionBroadName", "CCF_broad"),
];

/// Browser modalities -> track table modality labels
const BROWSER_ALIASES: [(&str, &str); 8] = [
    ("ImputeChrom100KMatrix", "Impute 100K"),
    ("ImputeChrom10KMatrix", "Impute 10K"),
    ("RawChrom100KMatrix", "Raw 100K"),
    ("ATAC", "ATAC CPM"),
    ("mCHFrac", "mCH Frac"),
    ("mCGFrac", "mCG Frac"),
    ("DomainBoundaryProba", "Domain Boundary"),
    ("CompartmentScore", "Compartment Score"),
];

static SCATTER_TABLE: Lazy<AliasTable> = Lazy::new(|| {
    let mut table = AliasTable::new();
    // Canonical names resolve to themselves so casing slips are repaired
    for name in CATEGORICAL_VARIABLES.iter().chain(CONTINUOUS_VARIABLES.iter()) {
        table.insert(name, name);
    }
    table.extend(COMMON_ALIASES);
    table.extend(SCATTER_ALIASES);
    table
});

static BROWSER_TABLE: Lazy<AliasTable> = Lazy::new(|| {
    let mut table = AliasTable::new();
    table.extend(COMMON_ALIASES);
    table.extend(BROWSER_ALIASES);
    table
});

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    map: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table applied to scatter-plot arguments
    pub fn scatter() -> &'static AliasTable {
        &SCATTER_TABLE
    }

    /// Table applied to genome-browser arguments
    pub fn browser() -> &'static AliasTable {
        &BROWSER_TABLE
    }

    pub fn insert(&mut self, alias: &str, real: &str) {
        self.map.insert(Self::lookup_key(alias), real.to_string());
    }

    pub fn extend<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) {
        for (alias, real) in pairs {
            self.insert(alias, real);
        }
    }

    /// The real name for `value`, or `value` itself when it has no alias
    pub fn resolve(&self, value: &str) -> String {
        self.map
            .get(&Self::lookup_key(value))
            .cloned()
            .unwrap_or_else(|| value.to_string())
    }

    fn lookup_key(value: &str) -> String {
        value
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    }
}
