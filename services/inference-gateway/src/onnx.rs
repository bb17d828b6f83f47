use crate::predictor::{Batch, ModelLoader, Prediction, Predictor};
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::debug;

pub const ONNX_EXTENSION: &str = "onnx";

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Loads `.onnx` files into optimized tract plans.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxLoader;

impl ModelLoader for OnnxLoader {
    fn extension(&self) -> &str { ONNX_EXTENSION }

    fn load(&self, path: &Path) -> Result<Arc<dyn Predictor>> {
        Ok(Arc::new(OnnxPredictor::load(path)?))
    }
}

pub struct OnnxPredictor {
    plan: OnnxPlan,
}

impl OnnxPredictor {
    pub fn load(path: &Path) -> Result<Self> {
        let plan = tract_onnx::onnx().model_for_path(path)?
            .into_optimized()?
            .into_runnable()?;
        Ok(Self { plan })
    }
}

impl Predictor for OnnxPredictor {
    fn infer(&self, batch: &Batch) -> Result<Prediction> {
        let start = Instant::now();
        let input = Tensor::from_shape(&[batch.rows(), batch.width()], batch.values())?;
        let outputs = self.plan.run(tvec!(input.into()))?;
        let first = outputs.first().ok_or_else(|| anyhow!("model produced no outputs"))?;
        let out = first.cast_to::<f32>()?;
        let view = out.to_array_view::<f32>()?;
        debug!(rows = batch.rows(), elapsed_us = start.elapsed().as_micros() as u64, "onnx inference");
        Prediction::new(view.shape().to_vec(), view.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use prost::Message;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tract_onnx::pb;
    use tract_onnx::pb::tensor_shape_proto::dimension::Value as Dim;

    fn float_tensor(name: &str, dims: &[Dim]) -> pb::ValueInfoProto {
        let dim = dims
            .iter()
            .map(|d| pb::tensor_shape_proto::Dimension { value: Some(d.clone()), ..Default::default() })
            .collect();
        pb::ValueInfoProto {
            name: name.to_string(),
            r#type: Some(pb::TypeProto {
                value: Some(pb::type_proto::Value::TensorType(pb::type_proto::Tensor {
                    elem_type: pb::tensor_proto::DataType::Float as i32,
                    shape: Some(pb::TensorShapeProto { dim }),
                })),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Single `Relu` node mapping input `x` to output `y`, both shaped `dims`.
    fn relu_model(dims: &[Dim]) -> Vec<u8> {
        let graph = pb::GraphProto {
            name: "relu".into(),
            node: vec![pb::NodeProto {
                op_type: "Relu".into(),
                input: vec!["x".into()],
                output: vec!["y".into()],
                ..Default::default()
            }],
            input: vec![float_tensor("x", dims)],
            output: vec![float_tensor("y", dims)],
            ..Default::default()
        };
        pb::ModelProto {
            ir_version: 7,
            opset_import: vec![pb::OperatorSetIdProto { domain: String::new(), version: 13 }],
            graph: Some(graph),
            ..Default::default()
        }
        .encode_to_vec()
    }

    fn write_model(dir: &Path, name: &str, dims: &[Dim]) -> std::path::PathBuf {
        let path = dir.join(format!("{name}.onnx"));
        std::fs::write(&path, relu_model(dims)).unwrap();
        path
    }

    #[test]
    fn fixed_shape_model_infers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), "relu", &[Dim::DimValue(1), Dim::DimValue(3)]);
        let model = OnnxLoader.load(&path).unwrap();
        let out = model.infer(&Batch::single(vec![-1.0, 2.0, 3.0])).unwrap();
        assert_eq!(out.to_nested(), json!([[0.0, 2.0, 3.0]]));
    }

    #[test]
    fn width_mismatch_is_an_inference_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), "relu", &[Dim::DimValue(1), Dim::DimValue(3)]);
        let model = OnnxLoader.load(&path).unwrap();
        assert!(model.infer(&Batch::single(vec![1.0, 2.0])).is_err());
    }

    #[test]
    fn symbolic_batch_dim_loads_and_infers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), "relu", &[Dim::DimParam("N".into()), Dim::DimValue(3)]);
        let model = OnnxLoader.load(&path).unwrap();
        let out = model.infer(&Batch::single(vec![-1.0, 2.0, 3.0])).unwrap();
        assert_eq!(out.to_nested(), json!([[0.0, 2.0, 3.0]]));
    }

    #[tokio::test]
    async fn serves_real_onnx_model_over_http() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), "relu", &[Dim::DimValue(1), Dim::DimValue(3)]);
        let (app, report) = crate::build_app(dir.path(), &OnnxLoader);
        assert_eq!(report.loaded, vec!["relu".to_string()]);

        let call = |features: Value| {
            let app = app.clone();
            async move {
                let req = Request::builder()
                    .method("POST")
                    .uri("/predict/relu")
                    .header("Content-Type", "application/json")
                    .body(Body::from(json!({ "features": features }).to_string()))
                    .unwrap();
                let resp = app.oneshot(req).await.unwrap();
                let status = resp.status();
                let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
                (status, serde_json::from_slice::<Value>(&bytes).unwrap())
            }
        };

        let (status, body) = call(json!([-1.0, 2.0, 3.0])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"prediction": [[0.0, 2.0, 3.0]]}));

        let (status, body) = call(json!([1.0, 2.0])).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("Prediction failed:"));
    }

    #[test]
    fn corrupt_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"definitely not a protobuf model").unwrap();
        assert!(OnnxLoader.load(&path).is_err());
    }

    #[test]
    fn missing_file_fails_to_load() {
        assert!(OnnxLoader.load(Path::new("/no/such/model.onnx")).is_err());
    }

    #[test]
    fn recognizes_onnx_extension() {
        assert_eq!(OnnxLoader.extension(), "onnx");
    }
}
