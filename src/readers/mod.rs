pub mod air_quality_reader;
pub mod http;
pub mod weather_reader;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::FetchError;
use crate::models::{Location, Source, SourceBatch};

pub use air_quality_reader::AirQualityReader;
pub use weather_reader::WeatherReader;

/// One external data source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    /// Sub-daily samples for `location` on `date` (UTC day).
    async fn fetch(&self, location: &Location, date: NaiveDate) -> Result<SourceBatch, FetchError>;
}
