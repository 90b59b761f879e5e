use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{PipelineSettings, Settings};
use crate::error::{FetchError, Result};
use crate::models::{DailySummary, Location, LocationRegistry, Source, SourceBatch};
use crate::processors::{
    Aggregator, DataMerger, RunReport, SourceFailure, UnitOutcome, UnitResult, UnitStage,
};
use crate::readers::{AirQualityReader, SourceAdapter, WeatherReader};
use crate::utils::progress::ProgressReporter;
use crate::writers::ReadingLoader;

type Fetched = (
    std::result::Result<SourceBatch, FetchError>,
    std::result::Result<SourceBatch, FetchError>,
);

/// Drives every (location, date) unit through fetch, aggregate, merge and load.
///
/// Units are independent: a failure is recorded in the [`RunReport`] and the
/// run moves on. The one exception is a load failure caused by the store being
/// unreachable, which aborts the remaining units.
pub struct Pipeline {
    air_quality: Arc<dyn SourceAdapter>,
    weather: Arc<dyn SourceAdapter>,
    registry: LocationRegistry,
    settings: PipelineSettings,
    aggregator: Aggregator,
    merger: DataMerger,
}

impl Pipeline {
    pub fn new(
        air_quality: Arc<dyn SourceAdapter>,
        weather: Arc<dyn SourceAdapter>,
        registry: LocationRegistry,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            air_quality,
            weather,
            registry,
            settings,
            aggregator: Aggregator::new(),
            merger: DataMerger::new(),
        }
    }

    /// Pipeline wired to the live HTTP adapters.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let air_quality = AirQualityReader::new(settings.air_quality.clone())?;
        let weather = WeatherReader::new(settings.weather.clone())?;

        Ok(Self::new(
            Arc::new(air_quality),
            Arc::new(weather),
            settings.registry()?,
            settings.pipeline.clone(),
        ))
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    pub fn total_units(&self, dates: &[NaiveDate]) -> usize {
        dates.len() * self.registry.len()
    }

    /// Process `dates` in order, and within each date the registry's locations in order.
    pub async fn run(
        &self,
        loader: &dyn ReadingLoader,
        dates: &[NaiveDate],
        progress: &ProgressReporter,
    ) -> RunReport {
        let mut report = RunReport::new(self.total_units(dates));
        let workers = self.settings.max_workers.max(1);

        info!(
            dates = dates.len(),
            locations = self.registry.len(),
            workers,
            "Starting ETL run"
        );

        for &date in dates {
            if report.is_aborted() {
                for location in self.registry.iter() {
                    report.record(UnitResult::skipped(location.to_string(), date));
                    progress.increment(1);
                }
                continue;
            }

            progress.set_message(&format!("{}", date));

            let fetched: Vec<Fetched> = stream::iter(self.registry.iter())
                .map(|location| self.fetch_unit(location, date))
                .buffered(workers)
                .collect()
                .await;

            for (location, (air_quality, weather)) in self.registry.iter().zip(fetched) {
                if report.is_aborted() {
                    report.record(UnitResult::skipped(location.to_string(), date));
                    progress.increment(1);
                    continue;
                }

                let (unit, abort) = self
                    .process_unit(loader, location, date, air_quality, weather)
                    .await;
                report.record(unit);
                if let Some(reason) = abort {
                    warn!(reason = %reason, "Store unreachable, aborting remaining units");
                    report.abort(reason);
                }
                progress.increment(1);
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed(),
            skipped = report.skipped,
            source_failures = report.source_failures.len(),
            snapshots = report.snapshot_units.len(),
            "ETL run finished"
        );

        report
    }

    async fn fetch_unit(&self, location: &Location, date: NaiveDate) -> Fetched {
        debug!(location = %location, date = %date, stage = %UnitStage::Fetching, "Unit transition");

        let fetched = tokio::join!(
            self.air_quality.fetch(location, date),
            self.weather.fetch(location, date)
        );

        let delay = self.settings.request_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        fetched
    }

    /// Aggregate, merge and load one unit whose fetches have completed.
    /// Returns the abort reason alongside the result when the store is unreachable.
    async fn process_unit(
        &self,
        loader: &dyn ReadingLoader,
        location: &Location,
        date: NaiveDate,
        air_quality: std::result::Result<SourceBatch, FetchError>,
        weather: std::result::Result<SourceBatch, FetchError>,
    ) -> (UnitResult, Option<String>) {
        let mut source_failures = Vec::new();
        let finish = |outcome: UnitOutcome, source_failures: Vec<SourceFailure>| {
            debug!(location = %location, date = %date, stage = %outcome.stage(), "Unit finished");
            UnitResult::new(location.to_string(), date, outcome, source_failures)
        };

        let both_fetches_failed = air_quality.is_err() && weather.is_err();

        debug!(location = %location, date = %date, stage = %UnitStage::Aggregating, "Unit transition");
        let air_summary = self.summarize(Source::AirQuality, location, date, air_quality, &mut source_failures);
        let weather_summary = self.summarize(Source::Weather, location, date, weather, &mut source_failures);

        if air_summary.is_none() && weather_summary.is_none() {
            let stage = if both_fetches_failed {
                UnitStage::Fetching
            } else {
                UnitStage::Aggregating
            };
            warn!(location = %location, date = %date, stage = %stage, "No data from either source");
            let outcome = UnitOutcome::Failed {
                stage,
                reason: "no data from either source".to_string(),
            };
            return (finish(outcome, source_failures), None);
        }

        debug!(location = %location, date = %date, stage = %UnitStage::Merging, "Unit transition");
        let reading = self
            .merger
            .merge(location, date, air_summary.as_ref(), weather_summary.as_ref());

        let snapshot = reading.is_snapshot_degraded();
        if snapshot {
            warn!(
                location = %location,
                date = %date,
                "Air quality is a single current-conditions snapshot, not a daily mean"
            );
        }

        debug!(location = %location, date = %date, stage = %UnitStage::Loading, "Unit transition");
        match loader.load(&reading).await {
            Ok(location_id) => {
                let outcome = UnitOutcome::Done { location_id, snapshot };
                (finish(outcome, source_failures), None)
            }
            Err(e) => {
                warn!(error = %e, "Load failed");
                let abort = e.is_connectivity().then(|| e.to_string());
                let outcome = UnitOutcome::Failed {
                    stage: UnitStage::Loading,
                    reason: e.to_string(),
                };
                (finish(outcome, source_failures), abort)
            }
        }
    }

    fn summarize(
        &self,
        source: Source,
        location: &Location,
        date: NaiveDate,
        batch: std::result::Result<SourceBatch, FetchError>,
        failures: &mut Vec<SourceFailure>,
    ) -> Option<DailySummary> {
        let failure = |stage: UnitStage, reason: String| SourceFailure {
            location: location.to_string(),
            date,
            source,
            stage,
            reason,
        };

        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "Source fetch failed");
                failures.push(failure(UnitStage::Fetching, e.kind.to_string()));
                return None;
            }
        };

        match self.aggregator.aggregate(&batch, source.metrics()) {
            Ok(summary) => {
                let missing = summary.missing_metrics();
                if !missing.is_empty() {
                    debug!(
                        location = %location,
                        date = %date,
                        source = %source,
                        missing = ?missing,
                        "Metrics without samples stored as null"
                    );
                }
                Some(summary)
            }
            Err(e) => {
                warn!(location = %location, date = %date, source = %source, error = %e, "Aggregation failed");
                failures.push(failure(UnitStage::Aggregating, e.to_string()));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchErrorKind, LoadError, LoadErrorKind};
    use crate::models::{Metric, RawSample, UnifiedReading};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubAdapter {
        source: Source,
        metric: Metric,
        fail_on: Option<NaiveDate>,
        calls: AtomicUsize,
    }

    impl StubAdapter {
        fn new(source: Source, metric: Metric) -> Self {
            Self {
                source,
                metric,
                fail_on: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        fn source(&self) -> Source {
            self.source
        }

        async fn fetch(
            &self,
            location: &Location,
            date: NaiveDate,
        ) -> std::result::Result<SourceBatch, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(date) {
                return Err(FetchError::new(
                    self.source,
                    location.to_string(),
                    date,
                    FetchErrorKind::HttpStatus {
                        status: 500,
                        body: "boom".to_string(),
                    },
                ));
            }
            let timestamp = Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap());
            Ok(SourceBatch::hourly(
                self.source,
                date,
                vec![RawSample::new(self.metric, 5.0, timestamp)],
            ))
        }
    }

    #[derive(Default)]
    struct MemoryLoader {
        readings: Mutex<Vec<UnifiedReading>>,
        unreachable: bool,
    }

    #[async_trait]
    impl ReadingLoader for MemoryLoader {
        async fn load(&self, reading: &UnifiedReading) -> std::result::Result<i64, LoadError> {
            if self.unreachable {
                return Err(LoadError::new(
                    reading.location.to_string(),
                    reading.date,
                    LoadErrorKind::Connectivity("connection refused".to_string()),
                ));
            }
            let mut readings = self.readings.lock().unwrap();
            readings.push(reading.clone());
            Ok(readings.len() as i64)
        }
    }

    fn registry() -> LocationRegistry {
        LocationRegistry::new(vec![
            Location::new("Atlanta", "US", 33.75, -84.39),
            Location::new("Savannah", "USA", 32.08, -81.09),
        ])
        .unwrap()
    }

    fn dates(n: i64) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        (0..n).map(|i| start + Duration::days(i)).collect()
    }

    fn pipeline(air: StubAdapter, weather: StubAdapter) -> Pipeline {
        Pipeline::new(
            Arc::new(air),
            Arc::new(weather),
            registry(),
            PipelineSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_all_units_loaded_in_order() {
        let pipeline = pipeline(
            StubAdapter::new(Source::AirQuality, Metric::Pm25),
            StubAdapter::new(Source::Weather, Metric::TemperatureCelsius),
        );
        let loader = MemoryLoader::default();

        let report = pipeline.run(&loader, &dates(3), &ProgressReporter::silent()).await;

        assert_eq!(report.total_units, 6);
        assert_eq!(report.succeeded, 6);
        assert!(report.failures.is_empty());

        let readings = loader.readings.lock().unwrap();
        let order: Vec<(String, NaiveDate)> = readings
            .iter()
            .map(|r| (r.location.city.clone(), r.date))
            .collect();
        assert_eq!(order[0], ("Atlanta".to_string(), dates(3)[0]));
        assert_eq!(order[1], ("Savannah".to_string(), dates(3)[0]));
        assert_eq!(order[5], ("Savannah".to_string(), dates(3)[2]));
        assert_eq!(readings[0].pm25, Some(5.0));
        assert_eq!(readings[0].temperature_celsius, Some(5.0));
    }

    #[tokio::test]
    async fn test_source_failure_still_loads_other_source() {
        let mut air = StubAdapter::new(Source::AirQuality, Metric::Pm25);
        air.fail_on = Some(dates(1)[0]);
        let pipeline = pipeline(air, StubAdapter::new(Source::Weather, Metric::WindSpeedKmh));
        let loader = MemoryLoader::default();

        let report = pipeline.run(&loader, &dates(1), &ProgressReporter::silent()).await;

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.source_failures.len(), 2);
        assert_eq!(report.source_failures[0].source, Source::AirQuality);
        assert_eq!(report.source_failures[0].stage, UnitStage::Fetching);

        let readings = loader.readings.lock().unwrap();
        assert!(readings.iter().all(|r| r.pm25.is_none() && r.wind_speed_kmh == Some(5.0)));
    }

    #[tokio::test]
    async fn test_both_sources_failing_fails_unit() {
        let day = dates(2)[1];
        let mut air = StubAdapter::new(Source::AirQuality, Metric::Pm25);
        air.fail_on = Some(day);
        let mut weather = StubAdapter::new(Source::Weather, Metric::TemperatureCelsius);
        weather.fail_on = Some(day);
        let pipeline = pipeline(air, weather);
        let loader = MemoryLoader::default();

        let report = pipeline.run(&loader, &dates(2), &ProgressReporter::silent()).await;

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed(), 2);
        assert!(matches!(
            report.failures[0].outcome,
            UnitOutcome::Failed { stage: UnitStage::Fetching, .. }
        ));
        assert_eq!(loader.readings.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_store_aborts_run() {
        let air = Arc::new(StubAdapter::new(Source::AirQuality, Metric::Pm25));
        let pipeline = Pipeline::new(
            air.clone(),
            Arc::new(StubAdapter::new(Source::Weather, Metric::TemperatureCelsius)),
            registry(),
            PipelineSettings::default(),
        );
        let loader = MemoryLoader {
            unreachable: true,
            ..Default::default()
        };

        let report = pipeline.run(&loader, &dates(3), &ProgressReporter::silent()).await;

        assert!(report.is_aborted());
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped, 5);
        assert_eq!(report.processed(), 6);
        // Later dates are never fetched once aborted
        assert_eq!(air.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_recorded_as_aggregation_failure() {
        struct EmptyAdapter;

        #[async_trait]
        impl SourceAdapter for EmptyAdapter {
            fn source(&self) -> Source {
                Source::AirQuality
            }

            async fn fetch(
                &self,
                _location: &Location,
                date: NaiveDate,
            ) -> std::result::Result<SourceBatch, FetchError> {
                Ok(SourceBatch::hourly(Source::AirQuality, date, vec![]))
            }
        }

        let pipeline = Pipeline::new(
            Arc::new(EmptyAdapter),
            Arc::new(StubAdapter::new(Source::Weather, Metric::PrecipitationMm)),
            registry(),
            PipelineSettings::default(),
        );
        let loader = MemoryLoader::default();

        let report = pipeline.run(&loader, &dates(1), &ProgressReporter::silent()).await;

        assert_eq!(report.succeeded, 2);
        assert!(report
            .source_failures
            .iter()
            .all(|f| f.stage == UnitStage::Aggregating && f.source == Source::AirQuality));
    }
}
