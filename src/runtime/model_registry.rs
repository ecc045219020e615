use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::error::ForecastError;
use crate::model::instrument::Instrument;
use crate::predictor::{load_model, model_artifact_paths, SequenceModel};
use crate::scaler::Scaler;

/// A trained model together with the scaler it was fitted against.
#[derive(Debug)]
pub struct LoadedModel {
    pub model: Box<dyn SequenceModel>,
    pub scaler: Scaler,
}

impl LoadedModel {
    pub fn new(model: Box<dyn SequenceModel>, scaler: Scaler) -> Result<Self> {
        if let Some((_, features)) = model.input_shape() {
            if features != scaler.arity() {
                bail!(
                    "model expects {} features but scaler has {} channels",
                    features,
                    scaler.arity()
                );
            }
        }
        Ok(Self { model, scaler })
    }
}

/// Instrument -> (model, scaler). Built once before serving and never
/// mutated afterwards; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<Instrument, LoadedModel>,
}

impl ModelRegistry {
    /// Load artifacts for every instrument in `instruments`. Instruments with
    /// missing or unusable artifacts are skipped and logged.
    pub fn preload(artifact_dir: &Path, instruments: &[Instrument], window: usize) -> Self {
        tracing::info!(dir = %artifact_dir.display(), "Pre-loading forecast models");
        let mut models = BTreeMap::new();
        for &instrument in instruments {
            match load_artifacts(artifact_dir, instrument, window) {
                Ok(Some(loaded)) => {
                    tracing::info!(instrument = %instrument, "Model loaded");
                    models.insert(instrument, loaded);
                }
                Ok(None) => {
                    tracing::warn!(instrument = %instrument, "Model artifacts missing, skipping");
                }
                Err(e) => {
                    let error = format!("{:#}", e);
                    tracing::error!(instrument = %instrument, error = %error, "Failed to load model");
                }
            }
        }
        tracing::info!(count = models.len(), "Models loaded, registry ready");
        Self { models }
    }

    pub fn from_models(models: impl IntoIterator<Item = (Instrument, LoadedModel)>) -> Self {
        Self {
            models: models.into_iter().collect(),
        }
    }

    pub fn get(&self, instrument: Instrument) -> Result<&LoadedModel, ForecastError> {
        self.models
            .get(&instrument)
            .ok_or(ForecastError::ModelNotLoaded(instrument))
    }

    pub fn contains(&self, instrument: Instrument) -> bool {
        self.models.contains_key(&instrument)
    }

    /// Loaded instruments in code order.
    pub fn instruments(&self) -> Vec<Instrument> {
        self.models.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn load_artifacts(dir: &Path, instrument: Instrument, window: usize) -> Result<Option<LoadedModel>> {
    let code = instrument.code();
    let scaler_path = dir.join(format!("{}_scaler.json", code));
    let Some(model_path) = model_artifact_paths(dir, code)
        .into_iter()
        .find(|p| p.is_file())
    else {
        return Ok(None);
    };
    if !scaler_path.is_file() {
        return Ok(None);
    }

    let scaler = Scaler::load(&scaler_path)?;
    let model = load_model(&model_path)?;
    if let Some((model_window, _)) = model.input_shape() {
        if model_window != window {
            bail!(
                "{} was trained on a {}-day window, configured window is {}",
                model_path.display(),
                model_window,
                window
            );
        }
    }
    LoadedModel::new(model, scaler)
        .with_context(|| format!("artifacts for {} are inconsistent", code))
        .map(Some)
}
