//! Reference genome: gene names, gene regions, chromosome sizes
//!
//! Regions are written `chrom:start-end`. Gene ids carry an optional
//! version suffix (`ENSMUSG00000070880.3`); lookups accept either form.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::DatasetError;

pub const GENE_ID_PREFIX: &str = "ENSMUSG";

/// Fraction of the region length added on each side of a browser domain
pub const DEFAULT_EXTEND_FOLD: f64 = 0.5;
/// Minimum padding on each side of a browser domain, in bp
pub const MIN_EXTEND_BP: f64 = 5000.0;

static REGION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:,\-]+)[:,\-](\d+)[:,\-](\d+)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRecord {
    pub gene_id: String,
    pub gene_name: String,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicRegion {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl GenomicRegion {
    /// Parse `chrom:start-end`; spaces are ignored
    pub fn parse(text: &str) -> Result<Self, DatasetError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let caps = REGION_RE
            .captures(&compact)
            .ok_or_else(|| DatasetError::InvalidRegion(text.to_string()))?;
        let number = |i: usize| -> Result<u64, DatasetError> {
            caps[i]
                .parse()
                .map_err(|_| DatasetError::InvalidRegion(text.to_string()))
        };
        Ok(Self {
            chrom: caps[1].to_string(),
            start: number(2)?,
            end: number(3)?,
        })
    }
}

impl fmt::Display for GenomicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

/// Serialized genome section of a dataset bundle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenomeBundle {
    /// `(chrom, size)` in genome order
    pub chrom_sizes: Vec<(String, u64)>,
    #[serde(default)]
    pub genes: Vec<GeneRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct GenomeRef {
    chrom_sizes: Vec<(String, u64)>,
    genes: Vec<GeneRecord>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
}

impl GenomeRef {
    pub fn new(chrom_sizes: Vec<(String, u64)>, genes: Vec<GeneRecord>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();
        for (idx, gene) in genes.iter().enumerate() {
            by_name.entry(gene.gene_name.clone()).or_insert(idx);
            by_id.insert(gene.gene_id.clone(), idx);
            by_id.entry(base_id(&gene.gene_id).to_string()).or_insert(idx);
        }
        Self {
            chrom_sizes,
            genes,
            by_name,
            by_id,
        }
    }

    pub fn from_bundle(bundle: GenomeBundle) -> Self {
        Self::new(bundle.chrom_sizes, bundle.genes)
    }

    pub fn genes(&self) -> &[GeneRecord] {
        &self.genes
    }

    pub fn chrom_sizes(&self) -> &[(String, u64)] {
        &self.chrom_sizes
    }

    pub fn gene_name_to_id(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(name)
            .map(|&idx| self.genes[idx].gene_id.as_str())
    }

    /// Full gene id for a gene name or id
    pub fn to_gene_id(&self, gene: &str) -> Result<String, DatasetError> {
        let record = self.lookup(gene)?;
        Ok(record.gene_id.clone())
    }

    pub fn region_for_gene(&self, gene: &str) -> Result<GenomicRegion, DatasetError> {
        let record = self.lookup(gene)?;
        Ok(GenomicRegion {
            chrom: record.chrom.clone(),
            start: record.start,
            end: record.end,
        })
    }

    /// Accept either a region string or a gene name / id
    pub fn resolve_region(&self, region_or_gene: &str) -> Result<GenomicRegion, DatasetError> {
        match GenomicRegion::parse(region_or_gene) {
            Ok(region) => Ok(region),
            Err(_) => self
                .region_for_gene(region_or_gene.trim())
                .map_err(|_| DatasetError::InvalidRegion(region_or_gene.to_string())),
        }
    }

    pub fn genome_length(&self) -> u64 {
        self.chrom_sizes.iter().map(|(_, size)| size).sum()
    }

    /// Offset of the chromosome start in concatenated genome coordinates
    pub fn chrom_offset(&self, chrom: &str) -> Result<u64, DatasetError> {
        let mut offset = 0;
        for (name, size) in &self.chrom_sizes {
            if name == chrom {
                return Ok(offset);
            }
            offset += size;
        }
        Err(DatasetError::UnknownChrom(chrom.to_string()))
    }

    /// Global `(start, end)` for a region, padded on both sides
    ///
    /// Padding is `max(len * extend_fold, 5 kb)`; the result is clamped to the genome.
    pub fn region_to_global(
        &self,
        region: &GenomicRegion,
        extend_fold: f64,
    ) -> Result<(f64, f64), DatasetError> {
        let offset = self.chrom_offset(&region.chrom)? as f64;
        let mut start = offset + region.start as f64;
        let mut end = offset + region.end as f64;

        let extend = ((end - start).abs() * extend_fold).max(MIN_EXTEND_BP);
        start -= extend;
        end += extend;
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }

        Ok((start.max(0.0), end.min(self.genome_length() as f64)))
    }

    fn lookup(&self, gene: &str) -> Result<&GeneRecord, DatasetError> {
        let idx = if gene.starts_with(GENE_ID_PREFIX) {
            self.by_id
                .get(gene)
                .or_else(|| self.by_id.get(base_id(gene)))
        } else {
            self.by_name.get(gene)
        };
        idx.map(|&i| &self.genes[i])
            .ok_or_else(|| DatasetError::UnknownGene(gene.to_string()))
    }
}

fn base_id(gene_id: &str) -> &str {
    gene_id.split('.').next().unwrap_or(gene_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genome() -> GenomeRef {
        GenomeRef::new(
            vec![("chr1".into(), 1_000_000), ("chr2".into(), 500_000)],
            vec![GeneRecord {
                gene_id: "ENSMUSG00000070880.3".into(),
                gene_name: "Gad1".into(),
                chrom: "chr2".into(),
                start: 100_000,
                end: 140_000,
            }],
        )
    }

    #[test]
    fn test_parse_region() {
        let region = GenomicRegion::parse("chr1: 2000-3000").unwrap();
        assert_eq!(region.to_string(), "chr1:2000-3000");
        assert!(GenomicRegion::parse("Gad1").is_err());
    }

    #[test]
    fn test_gene_lookup_by_name_and_id() {
        let g = genome();
        assert_eq!(g.gene_name_to_id("Gad1"), Some("ENSMUSG00000070880.3"));
        assert_eq!(g.to_gene_id("ENSMUSG00000070880").unwrap(), "ENSMUSG00000070880.3");
        assert_eq!(g.region_for_gene("Gad1").unwrap().to_string(), "chr2:100000-140000");
        assert!(matches!(g.to_gene_id("Foo1"), Err(DatasetError::UnknownGene(_))));
    }

    #[test]
    fn test_region_to_global_pads_and_offsets() {
        let g = genome();
        let region = g.resolve_region("Gad1").unwrap();
        let (start, end) = g.region_to_global(&region, DEFAULT_EXTEND_FOLD).unwrap();
        // 40 kb region, 20 kb padding, chr2 offset 1 Mb
        assert_eq!(start, 1_080_000.0);
        assert_eq!(end, 1_160_000.0);
    }

    #[test]
    fn test_region_to_global_minimum_padding_and_clamp() {
        let g = genome();
        let region = GenomicRegion::parse("chr1:1000-2000").unwrap();
        let (start, end) = g.region_to_global(&region, DEFAULT_EXTEND_FOLD).unwrap();
        assert_eq!(start, 0.0);
        assert_eq!(end, 7000.0);

        let tail = GenomicRegion::parse("chr2:499000-500000").unwrap();
        let (_, end) = g.region_to_global(&tail, DEFAULT_EXTEND_FOLD).unwrap();
        assert_eq!(end, 1_500_000.0);
    }

    #[test]
    fn test_unknown_chrom() {
        let g = genome();
        let region = GenomicRegion::parse("chrZ:1-2").unwrap();
        assert!(matches!(
            g.region_to_global(&region, 0.5),
            Err(DatasetError::UnknownChrom(_))
        ));
    }
}
