use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Metric, Source};

/// One sub-daily observation as delivered by a source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub metric: Metric,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl RawSample {
    pub fn new(metric: Metric, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric,
            value,
            timestamp,
        }
    }
}

/// Temporal resolution of a batch of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Hourly history covering the target day.
    Hourly,
    /// A single current-conditions observation standing in for the whole day.
    /// Its daily "mean" is that one value, an approximation of full-day data.
    Snapshot,
}

/// Samples one adapter fetched for one (location, date).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBatch {
    pub source: Source,
    pub date: NaiveDate,
    pub resolution: Resolution,
    pub samples: Vec<RawSample>,
}

impl SourceBatch {
    pub fn hourly(source: Source, date: NaiveDate, samples: Vec<RawSample>) -> Self {
        Self {
            source,
            date,
            resolution: Resolution::Hourly,
            samples,
        }
    }

    pub fn snapshot(source: Source, date: NaiveDate, samples: Vec<RawSample>) -> Self {
        Self {
            source,
            date,
            resolution: Resolution::Snapshot,
            samples,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
