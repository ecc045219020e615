pub mod engine;
pub mod reconciler;

pub use engine::{Forecast, ForecastEngine};
pub use reconciler::RangeReconciler;
