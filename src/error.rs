use std::path::PathBuf;

use thiserror::Error;

use crate::model::instrument::Instrument;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("model for {0} not loaded, check the model artifacts")]
    ModelNotLoaded(Instrument),

    #[error("historical data for {instrument} not found (searched: {})", display_paths(.searched))]
    DataFileNotFound {
        instrument: Instrument,
        searched: Vec<PathBuf>,
    },

    #[error("not enough historical data: need {required} days, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("could not parse date '{0}', expected DD-MM-YYYY")]
    DateParse(String),

    #[error("malformed data in {}: {reason}", .path.display())]
    MalformedData { path: PathBuf, reason: String },

    #[error("internal compute error: {0}")]
    InternalCompute(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ModelNotLoaded,
    DataFileNotFound,
    InsufficientHistory,
    InvalidRequest,
    DateParse,
    MalformedData,
    InternalCompute,
}

impl ErrorKind {
    /// Errors the caller can fix by changing the request; everything else is
    /// an operator problem (missing artifacts, broken data, numeric failures).
    pub fn is_user_correctable(self) -> bool {
        matches!(
            self,
            Self::InvalidRequest
                | Self::DataFileNotFound
                | Self::InsufficientHistory
                | Self::DateParse
        )
    }
}

impl ForecastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelNotLoaded(_) => ErrorKind::ModelNotLoaded,
            Self::DataFileNotFound { .. } => ErrorKind::DataFileNotFound,
            Self::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::DateParse(_) => ErrorKind::DateParse,
            Self::MalformedData { .. } => ErrorKind::MalformedData,
            Self::InternalCompute(_) => ErrorKind::InternalCompute,
        }
    }

    pub fn is_user_correctable(&self) -> bool {
        self.kind().is_user_correctable()
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
