//! WMB browser server
//!
//! Loads the dataset bundle, wires the plot registry and optional LLM
//! translator, and serves the REST API.
//!
//! Usage:
//!   WMB_DATASET_BUNDLE=data/demo_bundle.json cargo run --bin wmb_server
//!
//! The natural-language fallback is enabled when the selected backend's API
//! key (`OPENAI_API_KEY` or `ANTHROPIC_API_KEY`) is set.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Context;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wmb_agentic::{create_llm_client, LlmTranslator, SchemaContext};
use wmb_browser::api::{create_browser_router, BrowserState};
use wmb_browser::session::create_session_store;
use wmb_browser::{BatchPipeline, BrowserConfig, DatasetBundle, PlotRegistry, TrackTable};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wmb_browser=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting WMB browser server");

    let config = BrowserConfig::from_env().context("Failed to load configuration")?;
    let addr = config.socket_addr()?;

    let bundle = DatasetBundle::from_path(&config.dataset_bundle).with_context(|| {
        format!(
            "Failed to load dataset bundle {}",
            config.dataset_bundle.display()
        )
    })?;
    let schema_context = schema_context(&bundle);
    let registry = PlotRegistry::from_bundle(bundle, &config.higlass_server)
        .context("Failed to build plot registry")?;

    let mut pipeline = BatchPipeline::new(Arc::new(registry));
    match create_llm_client(config.llm_backend, config.llm_model.as_deref()) {
        Ok(client) => {
            let translator =
                LlmTranslator::new(client, &schema_context).with_timeout(config.llm_timeout());
            pipeline = pipeline.with_translator(Arc::new(translator));
            tracing::info!("Natural-language fallback enabled");
        }
        Err(e) => {
            tracing::warn!("Natural-language fallback disabled: {}", e);
        }
    }

    let state = BrowserState {
        sessions: create_session_store(),
        pipeline: Arc::new(pipeline),
        config: Arc::new(config),
    };

    // CORS for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_browser_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    tracing::info!("===========================================");
    tracing::info!("  WMB browser running on http://{}", addr);
    tracing::info!("===========================================");
    tracing::info!("API Endpoints:");
    tracing::info!("  /api/catalog                  - Plot types and examples");
    tracing::info!("  /api/sessions                 - Create session");
    tracing::info!("  /api/sessions/:id/panels      - Add panels");
    tracing::info!("  /api/sessions/:id/layout      - Download layout");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Port {} is already in use. Try: lsof -ti:{} | xargs kill -9",
                    addr.port(),
                    addr.port()
                );
            }
            return Err(anyhow::anyhow!("Failed to bind to {}: {}", addr, e));
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        return Err(anyhow::anyhow!("Server error: {}", e));
    }

    Ok(())
}

/// Schema hints from the bundle, falling back to the built-in lists
fn schema_context(bundle: &DatasetBundle) -> SchemaContext {
    let mut ctx = SchemaContext::default();

    let regions: BTreeSet<String> = bundle
        .cells
        .metadata
        .get("MajorRegion")
        .map(|values| {
            values
                .values()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if !regions.is_empty() {
        ctx.major_regions = regions.into_iter().collect();
    }

    let cell_types = TrackTable::new(bundle.tracks.clone()).cell_types();
    if !cell_types.is_empty() {
        ctx.example_cell_types = cell_types.into_iter().take(5).collect();
    }
    ctx
}
