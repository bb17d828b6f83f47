use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("model directory '{}' does not exist", .0.display())] ModelDirMissing(PathBuf),
    #[error("cannot read model directory '{}': {source}", .dir.display())] ModelDirUnreadable { dir: PathBuf, source: std::io::Error },
    #[error("error loading model '{}': {reason}", .file.display())] Load { file: PathBuf, reason: String },
    #[error("Model '{0}' not found.")] NotFound(String),
    #[error("Prediction failed: {0}")] Inference(String),
    #[error("{detail}")] BadRequest { status: StatusCode, detail: String },
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::BadRequest { status, .. } => *status,
            GatewayError::ModelDirMissing(_)
            | GatewayError::ModelDirUnreadable { .. }
            | GatewayError::Load { .. } | GatewayError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::BadRequest { status: rejection.status(), detail: rejection.body_text() }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_and_status() {
        let e = GatewayError::NotFound("iris".into());
        assert_eq!(e.to_string(), "Model 'iris' not found.");
        assert_eq!(e.status(), StatusCode::NOT_FOUND);
        let e = GatewayError::Inference("shape mismatch".into());
        assert_eq!(e.to_string(), "Prediction failed: shape mismatch");
        assert_eq!(e.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
