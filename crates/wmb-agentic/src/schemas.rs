//! Function-call schemas offered to the LLM
//!
//! Two fixed schemas: one for cell scatter plots, one for HiGlass genome
//! browsers. Variable and modality names are the atlas's own names; the
//! dataset-derived hints (major regions, example cell types) come from
//! [`SchemaContext`].

use serde_json::json;

use crate::llm_client::ToolDefinition;

pub const SCATTER_FUNCTION: &str = "make_cell_scatter_plot";
pub const BROWSER_FUNCTION: &str = "higlass_browser";

pub const SCATTER_REQUIRED: [&str; 3] = ["scatter_type", "color", "coord"];
pub const BROWSER_REQUIRED: [&str; 2] = ["cell_types", "browser_type"];

pub const DEFAULT_REGION: &str = "Gad1";

pub const CATEGORICAL_VARIABLES: [&str; 11] = [
    "CCFRegionAcronym",
    "CCFRegionBroadName",
    "CEMBARegion",
    "CellClass",
    "CellGroup",
    "CellSubClass",
    "DissectionRegion",
    "MajorRegion",
    "Sample",
    "SubRegion",
    "Technology",
];

pub const CONTINUOUS_VARIABLES: [&str; 7] = [
    "Slice",
    "PlateNormCov",
    "FinalmCReads",
    "InputReads",
    "GlobalOverallmCCCFrac",
    "GlobalOverallmCGFrac",
    "GlobalOverallmCHFrac",
];

pub const MODALITIES: [&str; 8] = [
    "ImputeChrom100KMatrix",
    "ImputeChrom10KMatrix",
    "RawChrom100KMatrix",
    "mCHFrac",
    "mCGFrac",
    "ATAC",
    "DomainBoundaryProba",
    "CompartmentScore",
];

pub const MODALITIES_1D: [&str; 5] = [
    "mCHFrac",
    "mCGFrac",
    "ATAC",
    "DomainBoundaryProba",
    "CompartmentScore",
];

pub const MODALITIES_2D: [&str; 3] = [
    "ImputeChrom100KMatrix",
    "ImputeChrom10KMatrix",
    "RawChrom100KMatrix",
];

pub const BROWSER_TYPES: [&str; 4] = [
    "multi_cell_type_1d",
    "multi_cell_type_2d",
    "two_cell_type_diff",
    "loop_zoom_in",
];

/// Dataset-derived hints embedded in schema descriptions
#[derive(Debug, Clone)]
pub struct SchemaContext {
    pub major_regions: Vec<String>,
    pub example_cell_types: Vec<String>,
}

impl Default for SchemaContext {
    fn default() -> Self {
        Self {
            major_regions: ["Isocortex", "HPF", "OLF", "STR", "PAL", "TH", "HY", "MB", "HB", "CB"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            example_cell_types: ["CA3 Glut", "Sst Gaba", "L2/3 IT CTX Glut", "Pvalb Gaba", "Oligo NN"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

pub fn scatter_tool(ctx: &SchemaContext) -> ToolDefinition {
    ToolDefinition {
        name: SCATTER_FUNCTION.to_string(),
        description: "Making tsne or umap scatter plot color by categorical or continous variable on named coordinates."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "coord": {
                    "type": "string",
                    "description": format!(
                        "The coords name can be any one of these regex: \
                         'l1_(tsne|umap)', '\\w+_mr_(tsne|umap)', 'slice\\d+_merfish'. \
                         The 'l1_(tsne|umap)' stand for a global coords for the entire dataset; \
                         The '\\w+_mr_(tsne|umap)' stand for major brain region coords, including these brain regions: \
                         ({:?}); the 'slice\\d+_merfish' stand for MERFISH spatial coords for coronal brain slices.",
                        ctx.major_regions
                    ),
                    "default": "If no coords provided, use 'l1_tsne'; if not clear about which major region coords, \
                                use 'HPF_mr_tsne'; if not clear about which MERFISH coords, use 'slice59_merfish'"
                },
                "color": {
                    "type": "string",
                    "description": format!(
                        "A variable name for scatter color. Categorical names: {:?}; Continuous names: {:?}; \
                         Continuous variable can also be in the form of VALUE_TYPE:GENE_NAME, for example \
                         'mch:Gad1', 'mcg:Foxp2', 'rna:Rorb'. mch stands for gene mCH fraction; \
                         mcg stands for gene mCG fraction; rna stands for gene expression.",
                        CATEGORICAL_VARIABLES, CONTINUOUS_VARIABLES
                    ),
                    "default": "If user isn't clear about color, use the 'CCFRegionAcronym' for MERFISH coords, \
                                and use 'CellSubClass' for other coords"
                },
                "scatter_type": {
                    "type": "string",
                    "description": "Determine the type of coloring variable. This can be infered from the color parameter.",
                    "enum": ["continuous", "categorical"]
                }
            },
            "required": SCATTER_REQUIRED,
        }),
    }
}

pub fn browser_tool(ctx: &SchemaContext) -> ToolDefinition {
    ToolDefinition {
        name: BROWSER_FUNCTION.to_string(),
        description: "Making a cell type HiGlass browser. Each browser can take one or two or multiple cell types."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "cell_types": {
                    "type": "array",
                    "description": "A list of cell types to be plotted in the browser.",
                    "items": {
                        "type": "string",
                        "description": format!(
                            "Cell types names are short terms such as {:?}",
                            ctx.example_cell_types
                        )
                    },
                    "default": ["CA3 Glut", "Sst Gaba"]
                },
                "modalities": {
                    "type": "array",
                    "description": "A list of modalities to be plotted in the browser.",
                    "items": {"type": "string", "enum": MODALITIES}
                },
                "browser_type": {
                    "type": "string",
                    "description": "The type of the browser to be plotted. \
                        The multi_cell_type_1d or _2d browser can fit in multiple cell types. \
                        The two_cell_type_diff browser is for comparing the track difference between two cell types. \
                        The loop_zoom_in browser is for the large-scale and zoom-in view of a single cell type.",
                    "enum": BROWSER_TYPES,
                    "default": "multi_cell_type_2d"
                },
                "region": {
                    "type": "string",
                    "description": "The genome region of the browser, can be CHROM:START-END or a gene name. \
                        For example: chr1:2000000-2100000 or Gad1",
                    "default": DEFAULT_REGION
                }
            },
            "required": ["cell_types", "browser_type", "region"],
        }),
    }
}

/// Both schemas, scatter first
pub fn function_tools(ctx: &SchemaContext) -> Vec<ToolDefinition> {
    vec![scatter_tool(ctx), browser_tool(ctx)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_keys_are_declared_properties() {
        for tool in function_tools(&SchemaContext::default()) {
            let props = tool.parameters["properties"].as_object().unwrap();
            for key in tool.parameters["required"].as_array().unwrap() {
                assert!(props.contains_key(key.as_str().unwrap()), "{}", key);
            }
        }
    }

    #[test]
    fn test_modality_buckets_partition_modalities() {
        for m in MODALITIES {
            let in_1d = MODALITIES_1D.contains(&m);
            let in_2d = MODALITIES_2D.contains(&m);
            assert!(in_1d ^ in_2d, "{} must be in exactly one bucket", m);
        }
    }

    #[test]
    fn test_region_hint_mentions_context() {
        let ctx = SchemaContext {
            major_regions: vec!["TESTREGION".into()],
            example_cell_types: vec![],
        };
        let tool = scatter_tool(&ctx);
        let desc = tool.parameters["properties"]["coord"]["description"]
            .as_str()
            .unwrap();
        assert!(desc.contains("TESTREGION"));
    }
}
