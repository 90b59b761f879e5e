use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::http::{build_client, send_json};
use super::SourceAdapter;
use crate::config::AirQualitySettings;
use crate::error::{FetchError, FetchErrorKind, Result};
use crate::models::{Location, Metric, RawSample, Source, SourceBatch};
use crate::utils::constants::{
    AIR_QUALITY_CURRENT_PATH, AIR_QUALITY_EXTRA_COMPUTATIONS, AIR_QUALITY_HISTORY_PATH,
    MAX_HISTORY_DAYS,
};
use crate::utils::today_utc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    #[serde(default)]
    pub hours_info: Vec<Conditions>,
    pub next_page_token: Option<String>,
}

/// One observation: an hour of history or the current conditions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conditions {
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub indexes: Vec<AqiIndex>,
    #[serde(default)]
    pub pollutants: Vec<Pollutant>,
}

#[derive(Debug, Deserialize)]
pub struct AqiIndex {
    pub code: String,
    pub aqi: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Pollutant {
    pub code: String,
    pub concentration: Option<Concentration>,
}

#[derive(Debug, Deserialize)]
pub struct Concentration {
    pub value: Option<f64>,
}

impl Conditions {
    /// The composite index matching `index_code` and every known pollutant concentration.
    pub fn to_samples(&self, index_code: &str) -> Vec<RawSample> {
        let mut samples = Vec::new();

        if let Some(aqi) = self
            .indexes
            .iter()
            .find(|index| index.code == index_code)
            .and_then(|index| index.aqi)
        {
            samples.push(RawSample::new(Metric::Aqi, aqi, self.date_time));
        }

        for pollutant in &self.pollutants {
            let metric = match Metric::from_pollutant_code(&pollutant.code) {
                Some(metric) => metric,
                None => continue,
            };
            if let Some(value) = pollutant.concentration.as_ref().and_then(|c| c.value) {
                samples.push(RawSample::new(metric, value, self.date_time));
            }
        }

        samples
    }
}

impl HistoryResponse {
    /// Samples of the hours that fall on `date` (UTC).
    pub fn samples_for(&self, date: NaiveDate, index_code: &str) -> Vec<RawSample> {
        self.hours_info
            .iter()
            .filter(|hour| hour.date_time.date_naive() == date)
            .flat_map(|hour| hour.to_samples(index_code))
            .collect()
    }
}

/// Google Air Quality API adapter.
///
/// Reads hourly history for the target day. Without history access it falls
/// back to a single current-conditions snapshot, but only for recent dates.
pub struct AirQualityReader {
    client: reqwest::Client,
    settings: AirQualitySettings,
}

impl AirQualityReader {
    pub fn new(settings: AirQualitySettings) -> Result<Self> {
        let client = build_client(settings.timeout())?;
        Ok(Self { client, settings })
    }

    fn api_key(&self) -> Option<&str> {
        self.settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Whether a present-day snapshot may stand in for `date`.
    pub fn snapshot_allowed(&self, date: NaiveDate, today: NaiveDate) -> bool {
        let age = (today - date).num_days();
        (0..=self.settings.snapshot_max_age_days).contains(&age)
    }

    async fn fetch_history(
        &self,
        api_key: &str,
        location: &Location,
        date: NaiveDate,
    ) -> std::result::Result<Vec<RawSample>, FetchErrorKind> {
        let mut samples = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 0..self.settings.max_pages {
            let body = history_request(location, date, self.settings.page_size, page_token.as_deref());
            let request = self
                .client
                .post(self.endpoint(AIR_QUALITY_HISTORY_PATH))
                .query(&[("key", api_key)])
                .json(&body);
            let response: HistoryResponse = send_json(request).await?;

            samples.extend(response.samples_for(date, &self.settings.index_code));

            match response.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) if page + 1 < self.settings.max_pages => page_token = Some(token),
                Some(_) => {
                    warn!(
                        location = %location,
                        date = %date,
                        max_pages = self.settings.max_pages,
                        "History truncated at page limit"
                    );
                    break;
                }
                None => break,
            }
        }

        Ok(samples)
    }

    async fn fetch_current(
        &self,
        api_key: &str,
        location: &Location,
    ) -> std::result::Result<Vec<RawSample>, FetchErrorKind> {
        let request = self
            .client
            .post(self.endpoint(AIR_QUALITY_CURRENT_PATH))
            .query(&[("key", api_key)])
            .json(&current_request(location));
        let conditions: Conditions = send_json(request).await?;
        Ok(conditions.to_samples(&self.settings.index_code))
    }
}

#[async_trait]
impl SourceAdapter for AirQualityReader {
    fn source(&self) -> Source {
        Source::AirQuality
    }

    async fn fetch(&self, location: &Location, date: NaiveDate) -> std::result::Result<SourceBatch, FetchError> {
        let fail = |kind: FetchErrorKind| FetchError::new(Source::AirQuality, location.to_string(), date, kind);

        let api_key = self.api_key().ok_or_else(|| fail(FetchErrorKind::MissingApiKey))?;
        let today = today_utc();

        if (today - date).num_days() <= MAX_HISTORY_DAYS {
            match self.fetch_history(api_key, location, date).await {
                Ok(samples) if !samples.is_empty() => {
                    debug!(location = %location, date = %date, samples = samples.len(), "Fetched hourly air quality");
                    return Ok(SourceBatch::hourly(Source::AirQuality, date, samples));
                }
                Ok(_) => debug!(location = %location, date = %date, "No hourly air quality history"),
                Err(FetchErrorKind::HttpStatus { status: 403 | 404, .. }) => {
                    debug!(location = %location, date = %date, "Air quality history endpoint not available")
                }
                Err(kind) => return Err(fail(kind)),
            }
        }

        if !self.snapshot_allowed(date, today) {
            return Err(fail(FetchErrorKind::HistoryUnavailable));
        }

        let samples = self.fetch_current(api_key, location).await.map_err(fail)?;
        warn!(
            location = %location,
            date = %date,
            "Air quality degraded to a single current-conditions snapshot; daily values are approximate"
        );
        Ok(SourceBatch::snapshot(Source::AirQuality, date, samples))
    }
}

fn history_request(location: &Location, date: NaiveDate, page_size: u32, page_token: Option<&str>) -> Value {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = start + chrono::Duration::seconds(86_399);

    let mut body = json!({
        "pageSize": page_size,
        "location": {
            "latitude": location.latitude,
            "longitude": location.longitude,
        },
        "period": {
            "startTime": start.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "endTime": end.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        },
        "extraComputations": AIR_QUALITY_EXTRA_COMPUTATIONS,
    });
    if let Some(token) = page_token {
        body["pageToken"] = json!(token);
    }
    body
}

fn current_request(location: &Location) -> Value {
    json!({
        "location": {
            "latitude": location.latitude,
            "longitude": location.longitude,
        },
        "extraComputations": AIR_QUALITY_EXTRA_COMPUTATIONS,
    })
}
