//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use wmb_browser::{BatchPipeline, DatasetBundle, PlotRegistry};

pub const DEMO_BUNDLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/demo_bundle.json");

pub const TILE_SERVER: &str = "http://tiles.test/api/v1";

pub fn demo_registry() -> PlotRegistry {
    let bundle = DatasetBundle::from_path(DEMO_BUNDLE).expect("demo bundle should load");
    PlotRegistry::from_bundle(bundle, TILE_SERVER).expect("demo registry should build")
}

pub fn demo_pipeline() -> BatchPipeline {
    BatchPipeline::new(Arc::new(demo_registry()))
}
