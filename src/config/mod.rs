pub mod settings;

pub use settings::{AirQualitySettings, DatabaseSettings, PipelineSettings, Settings, WeatherSettings};
