use serde::{Deserialize, Serialize};
use std::fmt;

/// The external API a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    AirQuality,
    Weather,
}

impl Source {
    pub fn display_name(&self) -> &'static str {
        match self {
            Source::AirQuality => "air quality",
            Source::Weather => "weather",
        }
    }

    /// Metrics this source contributes to a unified reading.
    pub fn metrics(&self) -> &'static [Metric] {
        match self {
            Source::AirQuality => AIR_QUALITY_METRICS,
            Source::Weather => WEATHER_METRICS,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How a metric's sub-daily samples reduce to one daily value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Instantaneous or concentration values: arithmetic mean.
    Mean,
    /// Accumulated values: sum.
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    Aqi,
    Pm25,
    Pm10,
    O3,
    No2,
    Co,
    So2,
    TemperatureCelsius,
    PrecipitationMm,
    WindSpeedKmh,
}

pub const AIR_QUALITY_METRICS: &[Metric] = &[
    Metric::Aqi,
    Metric::Pm25,
    Metric::Pm10,
    Metric::O3,
    Metric::No2,
    Metric::Co,
    Metric::So2,
];

pub const WEATHER_METRICS: &[Metric] = &[
    Metric::TemperatureCelsius,
    Metric::PrecipitationMm,
    Metric::WindSpeedKmh,
];

impl Metric {
    pub fn source(&self) -> Source {
        match self {
            Metric::TemperatureCelsius | Metric::PrecipitationMm | Metric::WindSpeedKmh => {
                Source::Weather
            }
            _ => Source::AirQuality,
        }
    }

    pub fn reduction(&self) -> Reduction {
        match self {
            Metric::PrecipitationMm => Reduction::Sum,
            _ => Reduction::Mean,
        }
    }

    /// Column name in `daily_readings`.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::Aqi => "aqi",
            Metric::Pm25 => "pm25",
            Metric::Pm10 => "pm10",
            Metric::O3 => "o3",
            Metric::No2 => "no2",
            Metric::Co => "co",
            Metric::So2 => "so2",
            Metric::TemperatureCelsius => "temperature_celsius",
            Metric::PrecipitationMm => "precipitation_mm",
            Metric::WindSpeedKmh => "wind_speed_kmh",
        }
    }

    /// Pollutant code used by the air quality API.
    pub fn from_pollutant_code(code: &str) -> Option<Self> {
        match code {
            "pm25" => Some(Metric::Pm25),
            "pm10" => Some(Metric::Pm10),
            "o3" => Some(Metric::O3),
            "no2" => Some(Metric::No2),
            "co" => Some(Metric::Co),
            "so2" => Some(Metric::So2),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}
