use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use ndarray::{ArrayView2, Axis};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;

use super::SequenceModel;

/// Keras sequence model exported to ONNX. Expects a `[1, window, features]`
/// f32 input and reads the first element of the first output.
pub struct OnnxSequenceModel {
    // ort sessions need exclusive access to run
    session: Mutex<Session>,
    source: String,
}

impl OnnxSequenceModel {
    pub fn load(path: &Path) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_file(path)
            .with_context(|| format!("failed to load onnx model {}", path.display()))?;
        Ok(Self {
            session: Mutex::new(session),
            source: path.display().to_string(),
        })
    }
}

impl std::fmt::Debug for OnnxSequenceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSequenceModel")
            .field("source", &self.source)
            .finish()
    }
}

impl SequenceModel for OnnxSequenceModel {
    fn predict(&self, window: ArrayView2<'_, f64>) -> Result<f64> {
        let input = window.mapv(|v| v as f32).insert_axis(Axis(0));
        let tensor = Value::from_array(input)?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("onnx session lock poisoned"))?;
        let outputs = session.run(ort::inputs![tensor])?;
        let (_, data) = outputs[0].try_extract_tensor::<f32>()?;
        let Some(&y) = data.first() else {
            bail!("onnx model {} returned an empty output", self.source);
        };
        Ok(f64::from(y))
    }
}
