pub mod api;
pub mod config;
pub mod error;
pub mod feature_source;
pub mod forecast;
pub mod model;
pub mod predictor;
pub mod runtime;
pub mod scaler;

pub use error::{ErrorKind, ForecastError};
