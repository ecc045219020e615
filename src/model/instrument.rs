use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Instruments with a training pipeline behind them. Anything else is
/// rejected at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Instrument {
    Bpcl,
    Hdbk,
    Icbk,
    Infy,
    Itc,
    Mrf,
    Reli,
    Sbi,
    Tcs,
    Vdan,
}

impl Instrument {
    pub const ALL: [Instrument; 10] = [
        Instrument::Bpcl,
        Instrument::Hdbk,
        Instrument::Icbk,
        Instrument::Infy,
        Instrument::Itc,
        Instrument::Mrf,
        Instrument::Reli,
        Instrument::Sbi,
        Instrument::Tcs,
        Instrument::Vdan,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Bpcl => "BPCL",
            Self::Hdbk => "HDBK",
            Self::Icbk => "ICBK",
            Self::Infy => "INFY",
            Self::Itc => "ITC",
            Self::Mrf => "MRF",
            Self::Reli => "RELI",
            Self::Sbi => "SBI",
            Self::Tcs => "TCS",
            Self::Vdan => "VDAN",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Instrument {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|i| i.code() == key)
            .ok_or_else(|| ForecastError::InvalidRequest(format!("unknown instrument '{}'", s.trim())))
    }
}

impl TryFrom<String> for Instrument {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Instrument> for String {
    fn from(value: Instrument) -> Self {
        value.code().to_string()
    }
}
