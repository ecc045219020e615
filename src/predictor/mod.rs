use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ndarray::{Array2, ArrayView2};
use serde::Deserialize;

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::OnnxSequenceModel;

/// A trained one-step sequence model: a `window x features` block of scaled
/// rows in, one scaled channel-0 value out.
pub trait SequenceModel: Send + Sync + fmt::Debug {
    fn predict(&self, window: ArrayView2<'_, f64>) -> Result<f64>;

    /// `(window, features)` the model was trained on, when the artifact
    /// declares it.
    fn input_shape(&self) -> Option<(usize, usize)> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct LinearArtifact {
    window: usize,
    features: usize,
    weights: Vec<Vec<f64>>,
    #[serde(default)]
    bias: f64,
}

/// Dense linear read-out over the full window, stored as JSON.
#[derive(Debug, Clone)]
pub struct LinearSequenceModel {
    weights: Array2<f64>,
    bias: f64,
}

impl LinearSequenceModel {
    pub fn new(weights: Array2<f64>, bias: f64) -> Result<Self> {
        if weights.is_empty() {
            bail!("linear model has no weights");
        }
        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            bail!("linear model weights must be finite");
        }
        Ok(Self { weights, bias })
    }

    pub fn from_json_str(payload: &str) -> Result<Self> {
        let art: LinearArtifact =
            serde_json::from_str(payload).context("failed to parse linear model json")?;
        if art.weights.len() != art.window {
            bail!(
                "linear model declares window {} but has {} weight rows",
                art.window,
                art.weights.len()
            );
        }
        let mut flat = Vec::with_capacity(art.window * art.features);
        for (i, row) in art.weights.iter().enumerate() {
            if row.len() != art.features {
                bail!(
                    "linear model weight row {} has {} values, expected {}",
                    i,
                    row.len(),
                    art.features
                );
            }
            flat.extend_from_slice(row);
        }
        let weights = Array2::from_shape_vec((art.window, art.features), flat)
            .context("linear model weight shape")?;
        Self::new(weights, art.bias)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let payload = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&payload)
            .with_context(|| format!("invalid model {}", path.display()))
    }
}

impl SequenceModel for LinearSequenceModel {
    fn predict(&self, window: ArrayView2<'_, f64>) -> Result<f64> {
        if window.dim() != self.weights.dim() {
            bail!(
                "window shape {:?} does not match model shape {:?}",
                window.dim(),
                self.weights.dim()
            );
        }
        Ok((&window * &self.weights).sum() + self.bias)
    }

    fn input_shape(&self) -> Option<(usize, usize)> {
        Some(self.weights.dim())
    }
}

/// Candidate model files for an instrument code, in lookup order.
pub fn model_artifact_paths(dir: &Path, code: &str) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if cfg!(feature = "onnx") {
        out.push(dir.join(format!("{}_model.onnx", code)));
    }
    out.push(dir.join(format!("{}_model.json", code)));
    out
}

pub fn load_model(path: &Path) -> Result<Box<dyn SequenceModel>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Box::new(LinearSequenceModel::load(path)?)),
        #[cfg(feature = "onnx")]
        Some("onnx") => Ok(Box::new(OnnxSequenceModel::load(path)?)),
        _ => bail!("unsupported model artifact {}", path.display()),
    }
}
