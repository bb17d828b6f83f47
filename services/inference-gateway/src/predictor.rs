//! The model capability the gateway serves: something that turns a batch of
//! feature rows into an output tensor, and something that produces those from files.

use anyhow::{anyhow, Result};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

pub trait Predictor: Send + Sync {
    fn infer(&self, batch: &Batch) -> Result<Prediction>;
}

/// Deserializes model files of one format into predictors.
pub trait ModelLoader: Send + Sync {
    /// File extension (without the dot) this loader recognizes.
    fn extension(&self) -> &str;
    fn load(&self, path: &Path) -> Result<Arc<dyn Predictor>>;
}

/// Row-major `rows x width` matrix of input features.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    values: Vec<f32>,
    rows: usize,
    width: usize,
}

impl Batch {
    pub fn single(features: Vec<f32>) -> Self {
        let width = features.len();
        Self { values: features, rows: 1, width }
    }

    pub fn rows(&self) -> usize { self.rows }
    pub fn width(&self) -> usize { self.width }
    pub fn values(&self) -> &[f32] { &self.values }
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        (i < self.rows).then(|| &self.values[i * self.width..(i + 1) * self.width])
    }
}

/// Dense output tensor. Serializes as nested JSON arrays following `shape`.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl Prediction {
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(anyhow!("output shape {shape:?} needs {expected} values, got {}", values.len()));
        }
        Ok(Self { shape, values })
    }

    pub fn shape(&self) -> &[usize] { &self.shape }
    pub fn values(&self) -> &[f32] { &self.values }

    pub fn to_nested(&self) -> Value { nest(&self.shape, &self.values) }
}

fn nest(shape: &[usize], values: &[f32]) -> Value {
    match shape.split_first() {
        // rank-0 tensor
        None => values.first().map(|v| Value::from(*v)).unwrap_or(Value::Null),
        Some((&len, rest)) => {
            let stride: usize = rest.iter().product();
            Value::Array((0..len).map(|i| nest(rest, &values[i * stride..(i + 1) * stride])).collect())
        }
    }
}

impl Serialize for Prediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_nested().serialize(serializer)
    }
}
