use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Location, Metric, Resolution};

/// The persisted per-(location, date) record combining both sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UnifiedReading {
    pub location: Location,
    pub date: NaiveDate,

    // Air quality metrics. The index scale depends on the configured index code
    #[validate(range(min = 0.0))]
    pub aqi: Option<f64>,

    #[validate(range(min = 0.0))]
    pub pm25: Option<f64>,

    #[validate(range(min = 0.0))]
    pub pm10: Option<f64>,

    #[validate(range(min = 0.0))]
    pub o3: Option<f64>,

    #[validate(range(min = 0.0))]
    pub no2: Option<f64>,

    #[validate(range(min = 0.0))]
    pub co: Option<f64>,

    #[validate(range(min = 0.0))]
    pub so2: Option<f64>,

    // Weather metrics
    #[validate(range(min = -90.0, max = 60.0))]
    pub temperature_celsius: Option<f64>,

    #[validate(range(min = 0.0))]
    pub precipitation_mm: Option<f64>,

    #[validate(range(min = 0.0))]
    pub wind_speed_kmh: Option<f64>,

    // Resolution of each contributing source; None when the source had no data
    #[serde(skip)]
    pub air_quality_resolution: Option<Resolution>,

    #[serde(skip)]
    pub weather_resolution: Option<Resolution>,
}

impl UnifiedReading {
    /// A reading with every metric null.
    pub fn empty(location: Location, date: NaiveDate) -> Self {
        Self {
            location,
            date,
            aqi: None,
            pm25: None,
            pm10: None,
            o3: None,
            no2: None,
            co: None,
            so2: None,
            temperature_celsius: None,
            precipitation_mm: None,
            wind_speed_kmh: None,
            air_quality_resolution: None,
            weather_resolution: None,
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Aqi => self.aqi,
            Metric::Pm25 => self.pm25,
            Metric::Pm10 => self.pm10,
            Metric::O3 => self.o3,
            Metric::No2 => self.no2,
            Metric::Co => self.co,
            Metric::So2 => self.so2,
            Metric::TemperatureCelsius => self.temperature_celsius,
            Metric::PrecipitationMm => self.precipitation_mm,
            Metric::WindSpeedKmh => self.wind_speed_kmh,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let field = match metric {
            Metric::Aqi => &mut self.aqi,
            Metric::Pm25 => &mut self.pm25,
            Metric::Pm10 => &mut self.pm10,
            Metric::O3 => &mut self.o3,
            Metric::No2 => &mut self.no2,
            Metric::Co => &mut self.co,
            Metric::So2 => &mut self.so2,
            Metric::TemperatureCelsius => &mut self.temperature_celsius,
            Metric::PrecipitationMm => &mut self.precipitation_mm,
            Metric::WindSpeedKmh => &mut self.wind_speed_kmh,
        };
        *field = value;
    }

    pub fn has_air_quality(&self) -> bool {
        self.air_quality_resolution.is_some()
    }

    pub fn has_weather(&self) -> bool {
        self.weather_resolution.is_some()
    }

    /// True when the air quality values come from a single snapshot rather than hourly history.
    pub fn is_snapshot_degraded(&self) -> bool {
        self.air_quality_resolution == Some(Resolution::Snapshot)
    }
}
