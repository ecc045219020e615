pub mod instrument;
pub mod point;
pub mod record;
pub mod request;

pub use instrument::Instrument;
pub use point::{PointKind, PredictionPoint};
pub use record::HistoricalRecord;
pub use request::ForecastRequest;
