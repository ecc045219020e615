use std::iter::FusedIterator;

use chrono::NaiveDate;
use ndarray::{concatenate, s, Array1, Array2, Axis};

use crate::config::TemplatePolicy;
use crate::error::ForecastError;
use crate::model::point::PredictionPoint;
use crate::predictor::SequenceModel;
use crate::scaler::Scaler;

/// Autoregressive one-day-at-a-time forecaster over a fixed-length window.
#[derive(Debug, Clone, Copy)]
pub struct ForecastEngine {
    window: usize,
    template: TemplatePolicy,
}

impl ForecastEngine {
    pub fn new(window: usize, template: TemplatePolicy) -> Self {
        Self { window, template }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Start a forecast from `seed` (scaled rows, oldest first) covering
    /// `first..=end`. Only the last `window` rows of the seed are used.
    ///
    /// Fails before any inference if the window is zero or the seed is
    /// shorter than the window.
    pub fn forecast<'a>(
        &self,
        model: &'a dyn SequenceModel,
        scaler: &'a Scaler,
        seed: Array2<f64>,
        first: NaiveDate,
        end: NaiveDate,
    ) -> Result<Forecast<'a>, ForecastError> {
        if self.window == 0 {
            return Err(ForecastError::InternalCompute(
                "forecast window must be at least one row".to_string(),
            ));
        }
        if seed.nrows() < self.window {
            return Err(ForecastError::InsufficientHistory {
                required: self.window,
                available: seed.nrows(),
            });
        }
        if seed.ncols() != scaler.arity() {
            return Err(ForecastError::InternalCompute(format!(
                "seed window has {} channels, scaler expects {}",
                seed.ncols(),
                scaler.arity()
            )));
        }
        if seed.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InternalCompute(
                "seed window contains non-finite values".to_string(),
            ));
        }

        let skip = seed.nrows() - self.window;
        let window = seed.slice(s![skip.., ..]).to_owned();
        let template = match self.template {
            TemplatePolicy::Zeros => vec![0.0; window.ncols()],
            TemplatePolicy::LastRow => window.row(window.nrows() - 1).to_vec(),
        };

        Ok(Forecast {
            model,
            scaler,
            window,
            template,
            next_date: first,
            end,
            done: first > end,
        })
    }
}

/// Lazy sequence of predicted points bound to one window snapshot. Each step
/// feeds its prediction back into the window; the sequence stops after `end`
/// or at the first error, and cannot be restarted.
#[derive(Debug)]
pub struct Forecast<'a> {
    model: &'a dyn SequenceModel,
    scaler: &'a Scaler,
    window: Array2<f64>,
    template: Vec<f64>,
    next_date: NaiveDate,
    end: NaiveDate,
    done: bool,
}

impl Forecast<'_> {
    /// Days left to predict.
    pub fn remaining(&self) -> usize {
        if self.done {
            return 0;
        }
        (self.end - self.next_date).num_days().max(0) as usize + 1
    }

    fn step(&mut self) -> Result<PredictionPoint, ForecastError> {
        let rows = self.window.nrows();
        let scaled = self
            .model
            .predict(self.window.view())
            .map_err(|e| ForecastError::InternalCompute(format!("inference failed: {:#}", e)))?;
        if !scaled.is_finite() {
            return Err(ForecastError::InternalCompute(format!(
                "model produced non-finite output for {}",
                self.next_date
            )));
        }

        let price = self.scaler.inverse_primary(scaled, &self.template)?;
        let point = PredictionPoint::predicted(self.next_date, price);

        // Future auxiliary channels are unknown: carry the last row forward
        // and overwrite only the primary channel.
        let mut next_row: Array1<f64> = self.window.row(rows - 1).to_owned();
        next_row[0] = scaled;
        self.window = concatenate(
            Axis(0),
            &[
                self.window.slice(s![1.., ..]),
                next_row.view().insert_axis(Axis(0)),
            ],
        )
        .map_err(|e| ForecastError::InternalCompute(format!("window slide: {}", e)))?;

        Ok(point)
    }
}

impl Iterator for Forecast<'_> {
    type Item = Result<PredictionPoint, ForecastError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(point) => {
                match self.next_date.succ_opt() {
                    Some(next) if next <= self.end => self.next_date = next,
                    _ => self.done = true,
                }
                Some(Ok(point))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

impl FusedIterator for Forecast<'_> {}
