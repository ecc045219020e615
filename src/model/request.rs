use chrono::NaiveDate;

use crate::error::ForecastError;
use crate::model::instrument::Instrument;

/// Day-first formats tried in order; ISO dates are accepted as a fallback.
const REQUEST_DATE_FORMATS: [&str; 4] = ["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastRequest {
    pub instrument: Instrument,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ForecastRequest {
    pub fn new(
        instrument: Instrument,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, ForecastError> {
        if start > end {
            return Err(ForecastError::InvalidRequest(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self {
            instrument,
            start,
            end,
        })
    }

    /// Validate raw request fields. Nothing is loaded or computed here.
    pub fn parse(instrument: &str, start: &str, end: &str) -> Result<Self, ForecastError> {
        let instrument: Instrument = instrument.parse()?;
        let start = parse_request_date(start)?;
        let end = parse_request_date(end)?;
        Self::new(instrument, start, end)
    }
}

pub fn parse_request_date(input: &str) -> Result<NaiveDate, ForecastError> {
    let s = input.trim();
    REQUEST_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| ForecastError::DateParse(s.to_string()))
}
