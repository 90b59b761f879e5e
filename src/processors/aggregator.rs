use std::collections::BTreeMap;

use crate::error::AggregationError;
use crate::models::{DailySummary, Metric, MetricSummary, Reduction, SourceBatch};

/// Reduces one source's sub-daily samples for one day to a [`DailySummary`].
///
/// Mean-type metrics average their samples, sum-type metrics (precipitation)
/// add them up. A metric with no samples is left out of the summary rather
/// than reported as zero.
///
/// A snapshot batch holds one sample per metric, so its "mean" is that single
/// observation. The summary keeps the batch resolution and per-metric sample
/// counts so the approximation stays visible downstream.
#[derive(Debug, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(
        &self,
        batch: &SourceBatch,
        metrics: &[Metric],
    ) -> Result<DailySummary, AggregationError> {
        if batch.is_empty() {
            return Err(AggregationError::EmptySampleSet);
        }

        let mut totals: BTreeMap<Metric, (f64, usize)> = BTreeMap::new();
        for sample in &batch.samples {
            if !metrics.contains(&sample.metric) || sample.metric.source() != batch.source {
                return Err(AggregationError::UnexpectedMetric {
                    metric: sample.metric,
                    source_name: batch.source,
                });
            }
            if !sample.value.is_finite() {
                return Err(AggregationError::NonFiniteValue {
                    metric: sample.metric,
                    value: sample.value,
                });
            }

            let entry = totals.entry(sample.metric).or_insert((0.0, 0));
            entry.0 += sample.value;
            entry.1 += 1;
        }

        let mut summary = DailySummary::new(batch.source, batch.date, batch.resolution);
        for (metric, (sum, count)) in totals {
            let value = match metric.reduction() {
                Reduction::Mean => sum / count as f64,
                Reduction::Sum => sum,
            };
            summary.values.insert(
                metric,
                MetricSummary {
                    value,
                    sample_count: count,
                },
            );
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawSample, Resolution, Source, AIR_QUALITY_METRICS, WEATHER_METRICS};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn samples(metric: Metric, values: &[f64]) -> Vec<RawSample> {
        values
            .iter()
            .enumerate()
            .map(|(hour, value)| {
                let timestamp = Utc.with_ymd_and_hms(2025, 1, 15, hour as u32, 0, 0).unwrap();
                RawSample::new(metric, *value, timestamp)
            })
            .collect()
    }

    #[test]
    fn test_mean_of_concentrations() {
        let batch = SourceBatch::hourly(
            Source::AirQuality,
            date(),
            samples(Metric::Pm25, &[10.0, 12.0, 14.0]),
        );

        let summary = Aggregator::new().aggregate(&batch, AIR_QUALITY_METRICS).unwrap();

        assert!((summary.get(Metric::Pm25).unwrap() - 12.0).abs() < 1e-9);
        assert_eq!(summary.sample_count(Metric::Pm25), 3);
        assert!(!summary.is_snapshot());
    }

    #[test]
    fn test_sum_of_precipitation_and_mean_of_temperature() {
        let mut all = samples(Metric::PrecipitationMm, &[0.0, 1.5, 0.0]);
        all.extend(samples(Metric::TemperatureCelsius, &[4.0, 6.0, 11.0]));
        let batch = SourceBatch::hourly(Source::Weather, date(), all);

        let summary = Aggregator::new().aggregate(&batch, WEATHER_METRICS).unwrap();

        assert!((summary.get(Metric::PrecipitationMm).unwrap() - 1.5).abs() < 1e-9);
        assert!((summary.get(Metric::TemperatureCelsius).unwrap() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_day_mean_within_tolerance() {
        let values: Vec<f64> = (0..24).map(|h| 0.1 * h as f64 + 3.3).collect();
        let expected = values.iter().sum::<f64>() / values.len() as f64;
        let batch = SourceBatch::hourly(Source::Weather, date(), samples(Metric::WindSpeedKmh, &values));

        let summary = Aggregator::new().aggregate(&batch, WEATHER_METRICS).unwrap();

        assert!((summary.get(Metric::WindSpeedKmh).unwrap() - expected).abs() < 1e-9);
        assert_eq!(summary.sample_count(Metric::WindSpeedKmh), 24);
    }

    #[test]
    fn test_missing_metric_is_absent_not_zero() {
        let batch = SourceBatch::hourly(
            Source::Weather,
            date(),
            samples(Metric::PrecipitationMm, &[0.0, 0.0]),
        );

        let summary = Aggregator::new().aggregate(&batch, WEATHER_METRICS).unwrap();

        // A true zero reading is kept
        assert_eq!(summary.get(Metric::PrecipitationMm), Some(0.0));
        // No samples: absent
        assert_eq!(summary.get(Metric::TemperatureCelsius), None);
        assert_eq!(summary.get(Metric::WindSpeedKmh), None);
        assert_eq!(
            summary.missing_metrics(),
            vec![Metric::TemperatureCelsius, Metric::WindSpeedKmh]
        );
    }

    #[test]
    fn test_snapshot_keeps_single_value_and_resolution() {
        let batch = SourceBatch::snapshot(Source::AirQuality, date(), samples(Metric::Aqi, &[57.0]));

        let summary = Aggregator::new().aggregate(&batch, AIR_QUALITY_METRICS).unwrap();

        assert_eq!(summary.get(Metric::Aqi), Some(57.0));
        assert_eq!(summary.sample_count(Metric::Aqi), 1);
        assert_eq!(summary.resolution, Resolution::Snapshot);
    }

    #[test]
    fn test_empty_batch_is_error() {
        let batch = SourceBatch::hourly(Source::Weather, date(), vec![]);
        let result = Aggregator::new().aggregate(&batch, WEATHER_METRICS);
        assert_eq!(result, Err(AggregationError::EmptySampleSet));
    }

    #[test]
    fn test_non_finite_value_is_error() {
        let batch = SourceBatch::hourly(
            Source::AirQuality,
            date(),
            samples(Metric::O3, &[1.0, f64::NAN]),
        );
        let result = Aggregator::new().aggregate(&batch, AIR_QUALITY_METRICS);
        assert!(matches!(result, Err(AggregationError::NonFiniteValue { metric: Metric::O3, .. })));
    }

    #[test]
    fn test_foreign_metric_is_error() {
        let batch = SourceBatch::hourly(
            Source::AirQuality,
            date(),
            samples(Metric::TemperatureCelsius, &[1.0]),
        );
        let result = Aggregator::new().aggregate(&batch, AIR_QUALITY_METRICS);
        assert!(matches!(result, Err(AggregationError::UnexpectedMetric { .. })));
    }
}
