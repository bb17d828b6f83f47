use anyhow::Result;
use gateway_core::{init_tracing, load_config};
use inference_gateway::onnx::OnnxLoader;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = load_config()?;
    init_tracing("inference-gateway", &cfg.log_dir, &cfg.log_level)?;
    info!(?cfg, "config loaded");
    inference_gateway::run(&cfg, &OnnxLoader).await
}
