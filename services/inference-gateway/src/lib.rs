//! Serves pre-trained models from a directory over HTTP.

use anyhow::{Context, Result};
use axum::Router;
use gateway_core::GatewayConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub mod api;
pub mod error;
#[cfg(feature = "onnx")] pub mod onnx;
pub mod predictor;
pub mod registry;

pub use error::GatewayError;
pub use predictor::{Batch, ModelLoader, Prediction, Predictor};
pub use registry::{LoadReport, ModelRegistry, SkippedModel};

/// Populates the registry from `model_dir` and wires it into the router.
pub fn build_app(model_dir: &Path, loader: &dyn ModelLoader) -> (Router, LoadReport) {
    let (registry, report) = ModelRegistry::populate(model_dir, loader);
    info!(loaded = report.loaded.len(), skipped = report.skipped.len(), models = ?registry.names(), "model registry ready");
    (api::router(Arc::new(registry)), report)
}

/// Populates the registry once, then serves until Ctrl-C.
pub async fn run(cfg: &GatewayConfig, loader: &dyn ModelLoader) -> Result<()> {
    let (app, _) = build_app(&cfg.model_dir, loader);

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    info!(%addr, "inference gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async { let _ = tokio::signal::ctrl_c().await; })
        .await?;
    info!("shutdown");
    Ok(())
}
