use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::model::instrument::Instrument;

pub const DEFAULT_WINDOW: usize = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_horizon_days: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5002".to_string(),
            max_horizon_days: 365,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub search_dirs: Vec<PathBuf>,
    pub file_name_template: String,
    pub date_column: String,
    /// First entry is the close / primary channel.
    pub feature_columns: Vec<String>,
    pub date_formats: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            search_dirs: vec![PathBuf::from("data"), PathBuf::from(".")],
            file_name_template: "{code} Historical Data.csv".to_string(),
            date_column: "Date".to_string(),
            feature_columns: ["Price", "Open", "High", "Low", "Vol.", "Change %"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            date_formats: ["%d-%m-%Y", "%m/%d/%Y", "%Y-%m-%d"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DataConfig {
    pub fn file_name_for(&self, instrument: Instrument) -> String {
        self.file_name_template.replace("{code}", instrument.code())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub artifact_dir: PathBuf,
    /// Instrument codes to preload; empty means every known instrument.
    pub instruments: Vec<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("models"),
            instruments: Vec::new(),
        }
    }
}

impl ModelsConfig {
    pub fn preload_instruments(&self) -> Result<Vec<Instrument>> {
        if self.instruments.is_empty() {
            return Ok(Instrument::ALL.to_vec());
        }
        let mut out = Vec::new();
        for code in &self.instruments {
            let inst: Instrument = code
                .parse()
                .with_context(|| format!("models.instruments contains '{}'", code))?;
            if !out.contains(&inst) {
                out.push(inst);
            }
        }
        Ok(out)
    }
}

/// Which scaled row seeds the non-primary channels of the inverse transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplatePolicy {
    #[default]
    Zeros,
    LastRow,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub window: usize,
    pub template: TemplatePolicy,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            template: TemplatePolicy::Zeros,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn config_path() -> PathBuf {
    std::env::var("PF_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config/default.toml"))
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from_path(&config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.forecast.window == 0 {
            bail!("forecast.window must be > 0");
        }
        if self.data.feature_columns.is_empty() {
            bail!("data.feature_columns must name at least the close column");
        }
        if self.data.date_formats.is_empty() {
            bail!("data.date_formats must not be empty");
        }
        if !self.data.file_name_template.contains("{code}") {
            bail!(
                "data.file_name_template '{}' must contain {{code}}",
                self.data.file_name_template
            );
        }
        if self.data.search_dirs.is_empty() {
            bail!("data.search_dirs must not be empty");
        }
        self.models.preload_instruments()?;
        Ok(())
    }
}
