use chrono::NaiveDate;

/// One trading day of an instrument's dataset.
///
/// `features[0]` is always the close; the remaining channels are the
/// auxiliary columns in configured order.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub features: Vec<f64>,
}

impl HistoricalRecord {
    pub fn new(date: NaiveDate, features: Vec<f64>) -> Self {
        Self { date, features }
    }

    pub fn close(&self) -> f64 {
        self.features.first().copied().unwrap_or(f64::NAN)
    }

    pub fn arity(&self) -> usize {
        self.features.len()
    }
}

/// Sort ascending by date and keep the first occurrence of each date.
pub fn normalize_records(mut records: Vec<HistoricalRecord>) -> Vec<HistoricalRecord> {
    // stable sort keeps file order among equal dates
    records.sort_by_key(|r| r.date);
    records.dedup_by_key(|r| r.date);
    records
}
