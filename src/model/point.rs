use chrono::NaiveDate;
use serde::{Serialize, Serializer};

pub const OUTPUT_DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointKind {
    Actual,
    Predicted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionPoint {
    #[serde(serialize_with = "serialize_day_first")]
    pub date: NaiveDate,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: PointKind,
}

impl PredictionPoint {
    pub fn actual(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            price: round_price(price),
            kind: PointKind::Actual,
        }
    }

    pub fn predicted(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            price: round_price(price),
            kind: PointKind::Predicted,
        }
    }
}

/// Round half away from zero to cents.
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

fn serialize_day_first<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format(OUTPUT_DATE_FORMAT))
}
