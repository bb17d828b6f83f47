//! HTTP surface: predict, model listing and health.

use crate::error::GatewayError;
use crate::predictor::{Batch, Prediction};
use crate::registry::ModelRegistry;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, instrument};

#[derive(Clone)]
pub struct AppState {
    registry: Arc<ModelRegistry>,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: Vec<f32>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: Prediction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub available_models: Vec<String>,
}

pub fn router(registry: Arc<ModelRegistry>) -> Router {
    Router::new()
        .route("/predict/:model_name", post(predict))
        .route("/models", get(list_models))
        .route("/health", get(health))
        .with_state(AppState { registry })
        .layer(TraceLayer::new_for_http())
}

#[instrument(skip_all, fields(model = %model_name))]
async fn predict(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, GatewayError> {
    let model = state.registry.lookup(&model_name)?;
    let Json(req) = body?;
    let batch = Batch::single(req.features);
    // inference is CPU-bound and blocking
    let outcome = tokio::task::spawn_blocking(move || model.infer(&batch)).await;
    let prediction = match outcome {
        Ok(Ok(p)) => p,
        Ok(Err(e)) => {
            error!(model = %model_name, error = %format!("{e:#}"), "prediction failed");
            return Err(GatewayError::Inference(format!("{e:#}")));
        }
        Err(join) => {
            error!(model = %model_name, error = %join, "inference task aborted");
            return Err(GatewayError::Inference(join.to_string()));
        }
    };
    Ok(Json(PredictResponse { prediction }))
}

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse { available_models: state.registry.names() })
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
