use anyhow::{Context, Result};
use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use scheduling::{BusinessDayConfig, Country, RiskType};
use serde::{Deserialize, Serialize};
use shared_types::DateLocale;
use std::path::{Path, PathBuf};

/// Defaults for `payplan`, read from `config.toml` and `PAYPLAN_*` variables
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PlanConfig {
    pub timezone: String,
    pub country: String,
    pub business_day_mode: bool,
    pub custom_skip_dates: Vec<String>,
    pub paydays: Vec<String>,
    pub min_buffer: Decimal,
    /// Unset means detect from the batch
    pub date_locale: Option<String>,
    /// Unset means every risk type
    pub risk_types: Option<Vec<String>>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            country: "US".to_string(),
            business_day_mode: true,
            custom_skip_dates: Vec::new(),
            paydays: Vec::new(),
            min_buffer: Decimal::ZERO,
            date_locale: None,
            risk_types: None,
        }
    }
}

impl PlanConfig {
    /// Load from `path` (or the default location) layered with the environment.
    /// A missing file leaves the defaults in place.
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

        let builder = Config::builder()
            .add_source(File::from(config_path.clone()).required(false))
            .add_source(
                Environment::with_prefix("PAYPLAN")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("custom_skip_dates")
                    .with_list_parse_key("paydays")
                    .with_list_parse_key("risk_types"),
            )
            .build()?;

        let config: PlanConfig = builder.try_deserialize()?;

        Ok((config, config_path))
    }

    pub fn country(&self) -> Result<Country> {
        self.country
            .parse()
            .with_context(|| format!("Invalid country in config: {:?}", self.country))
    }

    pub fn date_locale(&self) -> Result<Option<DateLocale>> {
        self.date_locale
            .as_deref()
            .map(|locale| locale.parse().map_err(anyhow::Error::msg))
            .transpose()
    }

    pub fn risk_types(&self) -> Result<Option<Vec<RiskType>>> {
        self.risk_types
            .as_ref()
            .map(|types| {
                types
                    .iter()
                    .map(|t| t.parse().map_err(anyhow::Error::msg))
                    .collect::<Result<Vec<RiskType>>>()
            })
            .transpose()
    }

    pub fn business_days(&self) -> Result<BusinessDayConfig> {
        Ok(BusinessDayConfig {
            country: self.country()?,
            custom_skip_dates: self.custom_skip_dates.clone(),
            business_day_mode: self.business_day_mode,
        })
    }
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("payplan").join("config.toml")
    } else {
        PathBuf::from("payplan.toml")
    }
}
