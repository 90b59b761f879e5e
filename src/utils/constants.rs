/// Google Air Quality API
pub const AIR_QUALITY_BASE_URL: &str = "https://airquality.googleapis.com/v1";
pub const AIR_QUALITY_HISTORY_PATH: &str = "history:lookup";
pub const AIR_QUALITY_CURRENT_PATH: &str = "currentConditions:lookup";
pub const DEFAULT_AQI_INDEX_CODE: &str = "uaqi";
pub const AIR_QUALITY_EXTRA_COMPUTATIONS: &[&str] = &[
    "POLLUTANT_CONCENTRATION",
    "DOMINANT_POLLUTANT_CONCENTRATION",
    "POLLUTANT_ADDITIONAL_INFO",
    "LOCAL_AQI",
];

/// Open-Meteo APIs
pub const WEATHER_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const WEATHER_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
pub const WEATHER_HOURLY_VARIABLES: &str = "temperature_2m,precipitation,wind_speed_10m";

/// Environment
pub const ENV_PREFIX: &str = "AQ_ETL";
pub const ENV_SEPARATOR: &str = "__";
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const DEFAULT_CONFIG_FILE: &str = "aq-etl.toml";

/// Processing defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://air_quality.sqlite";
pub const DEFAULT_PAGE_SIZE: u32 = 24;
pub const DEFAULT_MAX_PAGES: u32 = 8;
/// A current-conditions snapshot only stands in for the current UTC day
pub const DEFAULT_SNAPSHOT_MAX_AGE_DAYS: i64 = 0;
pub const DEFAULT_ARCHIVE_LAG_DAYS: i64 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_WORKERS: usize = 4;
pub const DEFAULT_BACKFILL_DAYS: u32 = 28;

/// History lookups are limited to the last 30 days
pub const MAX_HISTORY_DAYS: i64 = 30;

/// Open-Meteo archive starts in 1940
pub const MAX_BACKFILL_DAYS: u32 = 366 * 80;
