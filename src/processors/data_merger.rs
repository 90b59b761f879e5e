use chrono::NaiveDate;

use crate::models::{DailySummary, Location, Source, UnifiedReading};

/// Joins the air quality and weather summaries of one (location, date).
///
/// The two sources own disjoint metric sets, so merging is a structural
/// union: each summary fills only the fields of its own source and a missing
/// summary leaves its fields null.
pub struct DataMerger;

impl DataMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(
        &self,
        location: &Location,
        date: NaiveDate,
        air_quality: Option<&DailySummary>,
        weather: Option<&DailySummary>,
    ) -> UnifiedReading {
        let mut reading = UnifiedReading::empty(location.clone(), date);

        if let Some(summary) = air_quality {
            Self::apply(&mut reading, summary, Source::AirQuality);
            reading.air_quality_resolution = Some(summary.resolution);
        }

        if let Some(summary) = weather {
            Self::apply(&mut reading, summary, Source::Weather);
            reading.weather_resolution = Some(summary.resolution);
        }

        reading
    }

    fn apply(reading: &mut UnifiedReading, summary: &DailySummary, source: Source) {
        for metric in source.metrics() {
            reading.set(*metric, summary.get(*metric));
        }
    }
}

impl Default for DataMerger {
    fn default() -> Self {
        Self::new()
    }
}
