use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

use crate::error::{EtlError, Result};
use crate::models::{Location, LocationRegistry};
use crate::utils::constants::*;
use crate::utils::DailyPolicy;

/// Everything a run needs, loaded once and handed to the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub database: DatabaseSettings,

    #[serde(default)]
    #[validate(nested)]
    pub air_quality: AirQualitySettings,

    #[serde(default)]
    #[validate(nested)]
    pub weather: WeatherSettings,

    #[serde(default)]
    #[validate(nested)]
    pub pipeline: PipelineSettings,

    /// Replaces the built-in registry when non-empty
    #[serde(default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseSettings {
    #[validate(length(min = 1))]
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AirQualitySettings {
    pub api_key: Option<String>,

    #[validate(length(min = 1))]
    pub base_url: String,

    #[validate(length(min = 1))]
    pub index_code: String,

    #[validate(range(min = 1, max = 168))]
    pub page_size: u32,

    #[validate(range(min = 1))]
    pub max_pages: u32,

    #[validate(range(min = 0, max = 30))]
    pub snapshot_max_age_days: i64,

    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for AirQualitySettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: AIR_QUALITY_BASE_URL.to_string(),
            index_code: DEFAULT_AQI_INDEX_CODE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            snapshot_max_age_days: DEFAULT_SNAPSHOT_MAX_AGE_DAYS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// The API key must never end up in logs
impl std::fmt::Debug for AirQualitySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirQualitySettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("index_code", &self.index_code)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("snapshot_max_age_days", &self.snapshot_max_age_days)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AirQualitySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WeatherSettings {
    #[validate(length(min = 1))]
    pub forecast_url: String,

    #[validate(length(min = 1))]
    pub archive_url: String,

    #[validate(range(min = 0))]
    pub archive_lag_days: i64,

    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            forecast_url: WEATHER_FORECAST_URL.to_string(),
            archive_url: WEATHER_ARCHIVE_URL.to_string(),
            archive_lag_days: DEFAULT_ARCHIVE_LAG_DAYS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl WeatherSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineSettings {
    pub daily_policy: DailyPolicy,

    #[validate(range(min = 1, max = 64))]
    pub max_workers: usize,

    /// Pause after each location's fetch, to stay under API rate limits
    pub request_delay_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            daily_policy: DailyPolicy::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            request_delay_ms: 0,
        }
    }
}

impl PipelineSettings {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Settings {
    /// Load settings: defaults, then the TOML file, then `AQ_ETL__*` variables,
    /// then `GOOGLE_API_KEY` / `DATABASE_URL`.
    ///
    /// An explicit `path` must exist; otherwise `aq-etl.toml` is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .set_override_option(
                "air_quality.api_key",
                std::env::var(ENV_GOOGLE_API_KEY).ok(),
            )?
            .set_override_option("database.url", std::env::var(ENV_DATABASE_URL).ok())?;

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from TOML text alone, without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// The configured locations, or the built-in ones when none are configured.
    pub fn registry(&self) -> Result<LocationRegistry> {
        if self.locations.is_empty() {
            LocationRegistry::new(LocationRegistry::default_locations())
        } else {
            LocationRegistry::new(self.locations.clone())
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.air_quality
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}
