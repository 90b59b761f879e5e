pub mod location;
pub mod metric;
pub mod reading;
pub mod sample;
pub mod summary;

pub use location::{Location, LocationRegistry};
pub use metric::{Metric, Reduction, Source, AIR_QUALITY_METRICS, WEATHER_METRICS};
pub use reading::UnifiedReading;
pub use sample::{RawSample, Resolution, SourceBatch};
pub use summary::{DailySummary, MetricSummary};
