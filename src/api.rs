use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ForecastError;
use crate::feature_source::FeatureSource;
use crate::forecast::RangeReconciler;
use crate::model::point::PredictionPoint;
use crate::model::request::ForecastRequest;

pub struct AppState<S: FeatureSource> {
    pub reconciler: RangeReconciler<S>,
    pub max_horizon_days: u32,
}

impl<S: FeatureSource> AppState<S> {
    pub fn new(reconciler: RangeReconciler<S>, max_horizon_days: u32) -> Self {
        Self {
            reconciler,
            max_horizon_days,
        }
    }

    /// Reject forecasts that reach too far past `today`; each extra day is
    /// one more sequential inference.
    pub fn check_horizon(&self, request: &ForecastRequest, today: NaiveDate) -> Result<(), ForecastError> {
        let ahead = (request.end - today).num_days();
        if ahead > i64::from(self.max_horizon_days) {
            return Err(ForecastError::InvalidRequest(format!(
                "end date {} is {} days ahead, limit is {}",
                request.end, ahead, self.max_horizon_days
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    #[serde(alias = "company")]
    pub instrument: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub models: Vec<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        let status = if e.is_user_correctable() {
            tracing::warn!(kind = ?e.kind(), error = %e, "Forecast request rejected");
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(kind = ?e.kind(), error = %e, "Forecast failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Body printed by the one-shot CLI mode: the point array, or `{error}`.
pub fn render_cli_output(
    result: &Result<Vec<PredictionPoint>, ForecastError>,
) -> serde_json::Result<String> {
    match result {
        Ok(points) => serde_json::to_string_pretty(points),
        Err(e) => serde_json::to_string_pretty(&ErrorResponse {
            error: e.to_string(),
        }),
    }
}

/// POST /predict
pub async fn predict<S: FeatureSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Vec<PredictionPoint>>, ApiError> {
    let Json(body) =
        body.map_err(|rejection| ForecastError::InvalidRequest(rejection.body_text()))?;
    let request = ForecastRequest::parse(&body.instrument, &body.start_date, &body.end_date)?;
    state.check_horizon(&request, chrono::Local::now().date_naive())?;

    let worker = Arc::clone(&state);
    let points = tokio::task::spawn_blocking(move || worker.reconciler.reconcile(&request))
        .await
        .map_err(|e| ApiError::internal(format!("forecast task failed: {}", e)))??;
    Ok(Json(points))
}

/// GET /health
pub async fn health<S: FeatureSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        models: state
            .reconciler
            .registry()
            .instruments()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

pub fn create_router<S: FeatureSource + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/predict", post(predict::<S>))
        .route("/health", get(health::<S>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
