use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::{Metric, Resolution, Source};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSummary {
    pub value: f64,
    pub sample_count: usize,
}

/// One source's reduced values for one day.
///
/// Metrics without samples are absent from `values`, never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub source: Source,
    pub date: NaiveDate,
    pub resolution: Resolution,
    pub values: BTreeMap<Metric, MetricSummary>,
}

impl DailySummary {
    pub fn new(source: Source, date: NaiveDate, resolution: Resolution) -> Self {
        Self {
            source,
            date,
            resolution,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).map(|s| s.value)
    }

    pub fn sample_count(&self, metric: Metric) -> usize {
        self.values.get(&metric).map_or(0, |s| s.sample_count)
    }

    pub fn is_snapshot(&self) -> bool {
        self.resolution == Resolution::Snapshot
    }

    /// Metrics of this source that ended up without a value.
    pub fn missing_metrics(&self) -> Vec<Metric> {
        self.source
            .metrics()
            .iter()
            .copied()
            .filter(|m| !self.values.contains_key(m))
            .collect()
    }
}
