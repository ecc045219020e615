//! Pre-fitted per-channel feature scaling.
//!
//! Scalers are fitted on the training side and exported as JSON; this module
//! only applies them. Both supported kinds reduce to a per-channel affine map
//! `scaled = raw * scale + offset`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use serde::Deserialize;

use crate::error::ForecastError;

/// Fitted parameters as exported by the training pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "default_feature_range")]
        feature_range: (f64, f64),
    },
    Standard {
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    scale: Vec<f64>,
    offset: Vec<f64>,
}

impl Scaler {
    pub fn from_params(params: ScalerParams) -> Result<Self> {
        match params {
            ScalerParams::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
            } => {
                if data_min.len() != data_max.len() {
                    bail!(
                        "min_max scaler has {} minimums but {} maximums",
                        data_min.len(),
                        data_max.len()
                    );
                }
                if hi <= lo {
                    bail!("min_max feature_range ({}, {}) is empty", lo, hi);
                }
                let mut scale = Vec::with_capacity(data_min.len());
                let mut offset = Vec::with_capacity(data_min.len());
                for (&min, &max) in data_min.iter().zip(&data_max) {
                    let s = (hi - lo) / non_zero_range(max - min);
                    scale.push(s);
                    offset.push(lo - min * s);
                }
                Self::from_affine(scale, offset)
            }
            ScalerParams::Standard { mean, scale: std } => {
                if mean.len() != std.len() {
                    bail!(
                        "standard scaler has {} means but {} scales",
                        mean.len(),
                        std.len()
                    );
                }
                let scale: Vec<f64> = std.iter().map(|&s| 1.0 / non_zero_range(s)).collect();
                let offset = mean.iter().zip(&scale).map(|(&m, &s)| -m * s).collect();
                Self::from_affine(scale, offset)
            }
        }
    }

    pub fn from_affine(scale: Vec<f64>, offset: Vec<f64>) -> Result<Self> {
        if scale.is_empty() {
            bail!("scaler has no channels");
        }
        if scale.len() != offset.len() {
            bail!("scaler scale/offset length mismatch");
        }
        if scale
            .iter()
            .chain(&offset)
            .any(|v| !v.is_finite())
            || scale.iter().any(|&s| s == 0.0)
        {
            bail!("scaler parameters must be finite with non-zero scale");
        }
        Ok(Self { scale, offset })
    }

    pub fn from_json_str(payload: &str) -> Result<Self> {
        let params: ScalerParams =
            serde_json::from_str(payload).context("failed to parse scaler json")?;
        Self::from_params(params)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let payload = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&payload).with_context(|| format!("invalid scaler {}", path.display()))
    }

    /// Number of channels the scaler was fitted on.
    pub fn arity(&self) -> usize {
        self.scale.len()
    }

    pub fn transform(&self, raw: &[f64]) -> Result<Vec<f64>, ForecastError> {
        self.check_arity(raw.len())?;
        Ok(raw
            .iter()
            .zip(self.scale.iter().zip(&self.offset))
            .map(|(&x, (&s, &o))| x * s + o)
            .collect())
    }

    pub fn inverse_transform(&self, scaled: &[f64]) -> Result<Vec<f64>, ForecastError> {
        self.check_arity(scaled.len())?;
        Ok(scaled
            .iter()
            .zip(self.scale.iter().zip(&self.offset))
            .map(|(&x, (&s, &o))| (x - o) / s)
            .collect())
    }

    /// Recover a real price from a scaled channel-0 prediction.
    ///
    /// The model only predicts channel 0, but the inverse is defined over a
    /// full row: the prediction is written into channel 0 of a copy of
    /// `template`, the whole row is inverse-transformed, and only channel 0 is
    /// read back. The other inverse-transformed channels are discarded.
    pub fn inverse_primary(&self, scaled_primary: f64, template: &[f64]) -> Result<f64, ForecastError> {
        let mut row = template.to_vec();
        let Some(first) = row.first_mut() else {
            return Err(ForecastError::InternalCompute(
                "inverse template row is empty".to_string(),
            ));
        };
        *first = scaled_primary;
        let restored = self.inverse_transform(&row)?;
        let price = restored[0];
        if !price.is_finite() {
            return Err(ForecastError::InternalCompute(format!(
                "inverse transform produced non-finite price from {}",
                scaled_primary
            )));
        }
        Ok(price)
    }

    /// Forward-transform a block of raw rows into a `rows x arity` matrix.
    pub fn transform_rows<'a, I>(&self, rows: I) -> Result<Array2<f64>, ForecastError>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let mut flat = Vec::new();
        let mut n = 0;
        for row in rows {
            flat.extend(self.transform(row)?);
            n += 1;
        }
        Array2::from_shape_vec((n, self.arity()), flat)
            .map_err(|e| ForecastError::InternalCompute(format!("scaled window shape: {}", e)))
    }

    fn check_arity(&self, got: usize) -> Result<(), ForecastError> {
        if got != self.arity() {
            return Err(ForecastError::InternalCompute(format!(
                "scaler expects {} channels, got {}",
                self.arity(),
                got
            )));
        }
        Ok(())
    }
}

// Constant channels are fitted with a unit range, so they map to the lower
// bound instead of dividing by zero.
fn non_zero_range(r: f64) -> f64 {
    if r.abs() < f64::EPSILON {
        1.0
    } else {
        r
    }
}
