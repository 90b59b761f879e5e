use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use super::http::{build_client, send_json};
use super::SourceAdapter;
use crate::config::WeatherSettings;
use crate::error::{FetchError, FetchErrorKind, Result};
use crate::models::{Location, Metric, RawSample, Source, SourceBatch};
use crate::utils::constants::WEATHER_HOURLY_VARIABLES;
use crate::utils::today_utc;

#[derive(Debug, Deserialize)]
pub struct WeatherResponse {
    pub hourly: Option<HourlyData>,
}

/// Open-Meteo hourly block: parallel arrays indexed like `time`.
#[derive(Debug, Deserialize)]
pub struct HourlyData {
    pub time: Vec<String>,
    pub temperature_2m: Option<Vec<Option<f64>>>,
    pub precipitation: Option<Vec<Option<f64>>>,
    pub wind_speed_10m: Option<Vec<Option<f64>>>,
}

impl WeatherResponse {
    /// Samples of the hours that fall on `date`. Null entries are missing
    /// observations and produce no sample.
    pub fn samples_for(&self, date: NaiveDate) -> std::result::Result<Vec<RawSample>, FetchErrorKind> {
        let hourly = self
            .hourly
            .as_ref()
            .ok_or_else(|| FetchErrorKind::MalformedResponse("missing `hourly` block".to_string()))?;

        let timestamps = hourly
            .time
            .iter()
            .map(|t| {
                NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M")
                    .map(|dt| dt.and_utc())
                    .map_err(|e| FetchErrorKind::MalformedResponse(format!("bad time `{}`: {}", t, e)))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let series = [
            (Metric::TemperatureCelsius, "temperature_2m", &hourly.temperature_2m),
            (Metric::PrecipitationMm, "precipitation", &hourly.precipitation),
            (Metric::WindSpeedKmh, "wind_speed_10m", &hourly.wind_speed_10m),
        ];

        let mut samples = Vec::new();
        for (metric, name, values) in series {
            let values = values
                .as_ref()
                .ok_or_else(|| FetchErrorKind::MalformedResponse(format!("missing `hourly.{}`", name)))?;
            if values.len() != timestamps.len() {
                return Err(FetchErrorKind::MalformedResponse(format!(
                    "`hourly.{}` has {} values for {} timestamps",
                    name,
                    values.len(),
                    timestamps.len()
                )));
            }

            for (timestamp, value) in timestamps.iter().zip(values) {
                if timestamp.date_naive() != date {
                    continue;
                }
                if let Some(value) = value {
                    samples.push(RawSample::new(metric, *value, *timestamp));
                }
            }
        }

        Ok(samples)
    }
}

/// Open-Meteo adapter: hourly temperature, precipitation and wind speed.
///
/// Recent dates go to the forecast API, older ones to the historical archive,
/// which lags a few days behind.
pub struct WeatherReader {
    client: reqwest::Client,
    settings: WeatherSettings,
}

impl WeatherReader {
    pub fn new(settings: WeatherSettings) -> Result<Self> {
        let client = build_client(settings.timeout())?;
        Ok(Self { client, settings })
    }

    pub fn endpoint_for(&self, date: NaiveDate, today: NaiveDate) -> &str {
        if (today - date).num_days() > self.settings.archive_lag_days {
            &self.settings.archive_url
        } else {
            &self.settings.forecast_url
        }
    }
}

#[async_trait]
impl SourceAdapter for WeatherReader {
    fn source(&self) -> Source {
        Source::Weather
    }

    async fn fetch(&self, location: &Location, date: NaiveDate) -> std::result::Result<SourceBatch, FetchError> {
        let fail = |kind: FetchErrorKind| FetchError::new(Source::Weather, location.to_string(), date, kind);

        let day = date.format("%Y-%m-%d").to_string();
        let request = self
            .client
            .get(self.endpoint_for(date, today_utc()))
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("start_date", day.clone()),
                ("end_date", day),
                ("hourly", WEATHER_HOURLY_VARIABLES.to_string()),
                ("timezone", "GMT".to_string()),
                ("wind_speed_unit", "kmh".to_string()),
            ]);

        let response: WeatherResponse = send_json(request).await.map_err(fail)?;
        let samples = response.samples_for(date).map_err(fail)?;

        debug!(location = %location, date = %date, samples = samples.len(), "Fetched hourly weather");
        Ok(SourceBatch::hourly(Source::Weather, date, samples))
    }
}
