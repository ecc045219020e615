use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::DataConfig;
use crate::error::ForecastError;
use crate::model::instrument::Instrument;
use crate::model::record::{normalize_records, HistoricalRecord};

/// Loads an instrument's history in ascending date order, one record per date.
pub trait FeatureSource: Send + Sync {
    fn load(&self, instrument: Instrument) -> Result<Vec<HistoricalRecord>, ForecastError>;
}

/// Reads provider "Historical Data" CSV exports from a list of directories.
#[derive(Debug, Clone)]
pub struct CsvFeatureSource {
    cfg: DataConfig,
}

impl CsvFeatureSource {
    pub fn new(cfg: DataConfig) -> Self {
        Self { cfg }
    }

    pub fn candidate_paths(&self, instrument: Instrument) -> Vec<PathBuf> {
        let file_name = self.cfg.file_name_for(instrument);
        self.cfg
            .search_dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .collect()
    }

    /// First existing candidate wins.
    pub fn resolve(&self, instrument: Instrument) -> Result<PathBuf, ForecastError> {
        let candidates = self.candidate_paths(instrument);
        match candidates.iter().find(|p| p.is_file()) {
            Some(p) => Ok(p.clone()),
            None => Err(ForecastError::DataFileNotFound {
                instrument,
                searched: candidates,
            }),
        }
    }

    pub fn read_path(&self, path: &Path) -> Result<Vec<HistoricalRecord>, ForecastError> {
        let malformed = |reason: String| ForecastError::MalformedData {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .map_err(|e| malformed(e.to_string()))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| malformed(e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let column = |name: &str| -> Result<usize, ForecastError> {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| malformed(format!("missing column '{}'", name)))
        };
        let date_idx = column(self.cfg.date_column.as_str())?;
        let feature_idx = self
            .cfg
            .feature_columns
            .iter()
            .map(|c| column(c.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        if feature_idx.is_empty() {
            return Err(malformed("no feature columns configured".to_string()));
        }

        let mut records = Vec::new();
        for (line, row) in reader.records().enumerate() {
            // header is line 1
            let line = line + 2;
            let row = row.map_err(|e| malformed(e.to_string()))?;
            let raw_date = row.get(date_idx).unwrap_or("");
            if raw_date.is_empty() {
                continue;
            }
            let date = parse_dataset_date(raw_date, &self.cfg.date_formats).ok_or_else(|| {
                malformed(format!("line {}: unparseable date '{}'", line, raw_date))
            })?;

            let mut features = Vec::with_capacity(feature_idx.len());
            for (channel, &idx) in feature_idx.iter().enumerate() {
                let raw = row.get(idx).unwrap_or("");
                let value = parse_number(raw).map_err(|e| {
                    malformed(format!(
                        "line {}: column '{}' has unusable value '{}': {}",
                        line, self.cfg.feature_columns[channel], raw, e
                    ))
                })?;
                features.push(value);
            }
            let Some(close) = features[0] else {
                tracing::warn!(path = %path.display(), line, "Skipping row without close price");
                continue;
            };
            let features = std::iter::once(close)
                .chain(features[1..].iter().map(|v| v.unwrap_or(0.0)))
                .collect();
            records.push(HistoricalRecord::new(date, features));
        }

        Ok(normalize_records(records))
    }
}

impl FeatureSource for CsvFeatureSource {
    fn load(&self, instrument: Instrument) -> Result<Vec<HistoricalRecord>, ForecastError> {
        let path = self.resolve(instrument)?;
        let records = self.read_path(&path)?;
        tracing::debug!(
            instrument = %instrument,
            path = %path.display(),
            count = records.len(),
            "Loaded historical records"
        );
        Ok(records)
    }
}

fn parse_dataset_date(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

#[derive(Debug, Error)]
pub enum ParseNumberError {
    #[error(transparent)]
    Invalid(#[from] std::num::ParseFloatError),
    #[error("value is not finite")]
    NonFinite,
}

/// Parse a provider-formatted number: `1,234.5`, `-0.52%`, `2.3M`.
/// Empty cells and `-` are `Ok(None)`. `NaN` and infinities are rejected.
pub fn parse_number(raw: &str) -> Result<Option<f64>, ParseNumberError> {
    let s = raw.trim().replace(',', "");
    if s.is_empty() || s == "-" {
        return Ok(None);
    }
    let s = s.trim_end_matches('%');
    let (digits, multiplier) = match s.char_indices().last() {
        Some((i, 'K' | 'k')) => (&s[..i], 1e3),
        Some((i, 'M' | 'm')) => (&s[..i], 1e6),
        Some((i, 'B' | 'b')) => (&s[..i], 1e9),
        _ => (s, 1.0),
    };
    let value = digits.trim().parse::<f64>()? * multiplier;
    if !value.is_finite() {
        return Err(ParseNumberError::NonFinite);
    }
    Ok(Some(value))
}
