use std::sync::Arc;

use crate::error::ForecastError;
use crate::feature_source::FeatureSource;
use crate::forecast::engine::ForecastEngine;
use crate::model::point::PredictionPoint;
use crate::model::request::ForecastRequest;
use crate::runtime::model_registry::ModelRegistry;

/// Answers a date-range request with stored closes up to the last known
/// date and model predictions after it.
pub struct RangeReconciler<S: FeatureSource> {
    registry: Arc<ModelRegistry>,
    source: S,
    engine: ForecastEngine,
}

impl<S: FeatureSource> RangeReconciler<S> {
    pub fn new(registry: Arc<ModelRegistry>, source: S, engine: ForecastEngine) -> Self {
        Self {
            registry,
            source,
            engine,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Parse raw request fields and reconcile them.
    pub fn reconcile_fields(
        &self,
        instrument: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<PredictionPoint>, ForecastError> {
        let request = ForecastRequest::parse(instrument, start, end)?;
        self.reconcile(&request)
    }

    /// Actual points for `[start, min(end, last_known)]` followed by
    /// predicted points for `(last_known, end]` that fall on or after `start`.
    /// Any failure discards the whole answer.
    pub fn reconcile(&self, request: &ForecastRequest) -> Result<Vec<PredictionPoint>, ForecastError> {
        if request.start > request.end {
            return Err(ForecastError::InvalidRequest(format!(
                "start date {} is after end date {}",
                request.start, request.end
            )));
        }

        let records = self.source.load(request.instrument)?;
        let Some(last_known) = records.last().map(|r| r.date) else {
            return Err(ForecastError::InsufficientHistory {
                required: self.engine.window(),
                available: 0,
            });
        };

        let mut points = Vec::new();
        if request.start <= last_known {
            let hist_end = request.end.min(last_known);
            points.extend(
                records
                    .iter()
                    .filter(|r| r.date >= request.start && r.date <= hist_end)
                    .map(|r| PredictionPoint::actual(r.date, r.close())),
            );
        }
        let actual_count = points.len();

        if request.end > last_known {
            let loaded = self.registry.get(request.instrument)?;
            let window = self.engine.window();
            if records.len() < window {
                return Err(ForecastError::InsufficientHistory {
                    required: window,
                    available: records.len(),
                });
            }
            let tail = &records[records.len() - window..];
            let seed = loaded
                .scaler
                .transform_rows(tail.iter().map(|r| r.features.as_slice()))?;
            let first = last_known.succ_opt().ok_or_else(|| {
                ForecastError::InternalCompute(format!("no calendar day after {}", last_known))
            })?;

            let predicted = self
                .engine
                .forecast(loaded.model.as_ref(), &loaded.scaler, seed, first, request.end)?
                .collect::<Result<Vec<_>, _>>()?;
            points.extend(predicted.into_iter().filter(|p| p.date >= request.start));
        }

        tracing::debug!(
            instrument = %request.instrument,
            start = %request.start,
            end = %request.end,
            last_known = %last_known,
            actual = actual_count,
            predicted = points.len() - actual_count,
            "Reconciled forecast range"
        );
        Ok(points)
    }
}
