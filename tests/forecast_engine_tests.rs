use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use ndarray::{Array2, ArrayView2};
use price_forecast::config::TemplatePolicy;
use price_forecast::forecast::ForecastEngine;
use price_forecast::model::PointKind;
use price_forecast::predictor::SequenceModel;
use price_forecast::scaler::Scaler;
use price_forecast::ForecastError;

const W: usize = 60;

/// Records every window it is asked to predict on and returns a constant.
#[derive(Debug, Default)]
struct RecordingModel {
    seen: Mutex<Vec<Array2<f64>>>,
    output: f64,
}

impl SequenceModel for RecordingModel {
    fn predict(&self, window: ArrayView2<'_, f64>) -> Result<f64> {
        self.seen.lock().expect("lock should not be poisoned").push(window.to_owned());
        Ok(self.output)
    }
}

/// Fails on the n-th call (1-based).
#[derive(Debug)]
struct FailingModel {
    calls: Mutex<usize>,
    fail_on: usize,
}

impl SequenceModel for FailingModel {
    fn predict(&self, _window: ArrayView2<'_, f64>) -> Result<f64> {
        let mut calls = self.calls.lock().expect("lock should not be poisoned");
        *calls += 1;
        if *calls == self.fail_on {
            bail!("tensor shape exploded");
        }
        Ok(0.5)
    }
}

#[derive(Debug)]
struct NanModel;

impl SequenceModel for NanModel {
    fn predict(&self, _window: ArrayView2<'_, f64>) -> Result<f64> {
        Ok(f64::NAN)
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).expect("test date should be valid")
}

fn scaler() -> Scaler {
    Scaler::from_json_str(r#"{"kind":"min_max","data_min":[0.0,0.0,0.0],"data_max":[100.0,1.0,1.0]}"#)
        .expect("scaler fixture should parse")
}

/// Rows 0..n with channel 0 = i/100 and aux channels 0.3, 0.7.
fn seed(rows: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, 3), |(i, c)| match c {
        0 => i as f64 / 100.0,
        1 => 0.3,
        _ => 0.7,
    })
}

#[test]
/// Verifies a seed one row short of the window fails up front and the model
/// is never invoked.
fn short_seed_fails_without_inference() {
    let engine = ForecastEngine::new(W, TemplatePolicy::Zeros);
    let model = RecordingModel::default();
    let scaler = scaler();
    let err = engine
        .forecast(&model, &scaler, seed(W - 1), d(2024, 1, 1), d(2024, 1, 10))
        .unwrap_err();
    assert!(matches!(
        err,
        ForecastError::InsufficientHistory {
            required: W,
            available: 59
        }
    ));
    assert!(model.seen.lock().expect("lock should not be poisoned").is_empty());
}

#[test]
/// Verifies every inference call sees exactly W rows, the window slides by
/// one row per day, the prediction lands in channel 0 and the auxiliary
/// channels are carried forward unchanged.
fn window_slides_and_holds_aux_channels() {
    let engine = ForecastEngine::new(W, TemplatePolicy::Zeros);
    let model = RecordingModel {
        output: 0.9,
        ..Default::default()
    };
    let scaler = scaler();
    let points: Vec<_> = engine
        .forecast(&model, &scaler, seed(W + 5), d(2024, 1, 1), d(2024, 1, 4))
        .expect("forecast should start")
        .collect::<Result<_, _>>()
        .expect("forecast should complete");
    assert_eq!(points.len(), 4);
    assert!(points.iter().all(|p| p.kind == PointKind::Predicted));
    assert!(points.iter().all(|p| (p.price - 90.0).abs() < 1e-9));

    let seen = model.seen.lock().expect("lock should not be poisoned");
    assert_eq!(seen.len(), 4);
    assert!(seen.iter().all(|w| w.dim() == (W, 3)));

    // only the last W rows of an oversized seed are used
    assert!((seen[0][[0, 0]] - 0.05).abs() < 1e-12);
    assert!((seen[0][[W - 1, 0]] - 0.64).abs() < 1e-12);

    // after one step the oldest row is gone and the prediction is appended
    assert!((seen[1][[0, 0]] - 0.06).abs() < 1e-12);
    assert!((seen[1][[W - 1, 0]] - 0.9).abs() < 1e-12);
    assert!((seen[1][[W - 1, 1]] - 0.3).abs() < 1e-12);
    assert!((seen[1][[W - 1, 2]] - 0.7).abs() < 1e-12);

    // by the last step the tail holds three predicted rows
    for row in W - 3..W {
        assert!((seen[3][[row, 0]] - 0.9).abs() < 1e-12);
    }
}

#[test]
fn dates_are_consecutive_calendar_days_through_end() {
    let engine = ForecastEngine::new(W, TemplatePolicy::Zeros);
    let model = RecordingModel::default();
    let scaler = scaler();
    let dates: Vec<NaiveDate> = engine
        .forecast(&model, &scaler, seed(W), d(2023, 12, 30), d(2024, 1, 3))
        .expect("forecast should start")
        .map(|p| p.expect("each step should succeed").date)
        .collect();
    assert_eq!(
        dates,
        vec![
            d(2023, 12, 30),
            d(2023, 12, 31),
            d(2024, 1, 1),
            d(2024, 1, 2),
            d(2024, 1, 3)
        ]
    );
}

#[test]
/// Verifies an inference failure ends the sequence: one error, then nothing.
fn inference_error_aborts_the_sequence() {
    let engine = ForecastEngine::new(W, TemplatePolicy::Zeros);
    let model = FailingModel {
        calls: Mutex::new(0),
        fail_on: 3,
    };
    let scaler = scaler();
    let mut forecast = engine
        .forecast(&model, &scaler, seed(W), d(2024, 1, 1), d(2024, 1, 10))
        .expect("forecast should start");
    assert!(forecast.next().unwrap().is_ok());
    assert!(forecast.next().unwrap().is_ok());
    assert!(matches!(
        forecast.next(),
        Some(Err(ForecastError::InternalCompute(_)))
    ));
    assert!(forecast.next().is_none());
    assert_eq!(*model.calls.lock().expect("lock should not be poisoned"), 3);

    let collected = engine
        .forecast(&model, &scaler, seed(W), d(2024, 1, 1), d(2024, 1, 10))
        .expect("forecast should start")
        .collect::<Result<Vec<_>, _>>();
    assert!(collected.is_ok(), "fail_on already passed, second run succeeds");
}

#[test]
fn non_finite_output_is_internal_compute_error() {
    let engine = ForecastEngine::new(W, TemplatePolicy::Zeros);
    let scaler = scaler();
    let result = engine
        .forecast(&NanModel, &scaler, seed(W), d(2024, 1, 1), d(2024, 1, 2))
        .expect("forecast should start")
        .collect::<Result<Vec<_>, _>>();
    assert!(matches!(result, Err(ForecastError::InternalCompute(_))));
}

#[test]
fn seed_channel_mismatch_is_rejected() {
    let engine = ForecastEngine::new(W, TemplatePolicy::Zeros);
    let model = RecordingModel::default();
    let scaler = scaler();
    let err = engine
        .forecast(&model, &scaler, Array2::zeros((W, 2)), d(2024, 1, 1), d(2024, 1, 2))
        .unwrap_err();
    assert!(matches!(err, ForecastError::InternalCompute(_)));
}

#[test]
/// Verifies the template policy does not change prices for a per-channel
/// scaler, since only channel 0 is read back.
fn template_policy_does_not_affect_per_channel_inverse() {
    let scaler = scaler();
    let model = RecordingModel {
        output: 0.42,
        ..Default::default()
    };
    let zeros: Vec<f64> = ForecastEngine::new(W, TemplatePolicy::Zeros)
        .forecast(&model, &scaler, seed(W), d(2024, 1, 1), d(2024, 1, 3))
        .expect("forecast should start")
        .map(|p| p.expect("each step should succeed").price)
        .collect();
    let last_row: Vec<f64> = ForecastEngine::new(W, TemplatePolicy::LastRow)
        .forecast(&model, &scaler, seed(W), d(2024, 1, 1), d(2024, 1, 3))
        .expect("forecast should start")
        .map(|p| p.expect("each step should succeed").price)
        .collect();
    assert_eq!(zeros, last_row);
    assert!((zeros[0] - 42.0).abs() < 1e-9);
}

#[test]
fn zero_window_is_rejected_instead_of_clamped() {
    let engine = ForecastEngine::new(0, TemplatePolicy::LastRow);
    assert_eq!(engine.window(), 0);
    let model = RecordingModel::default();
    let scaler = scaler();
    let err = engine
        .forecast(&model, &scaler, seed(5), d(2024, 1, 1), d(2024, 1, 2))
        .expect_err("a zero-row window should not start a forecast");
    assert!(matches!(err, ForecastError::InternalCompute(_)));
    assert!(model.seen.lock().expect("lock should not be poisoned").is_empty());
}
