pub mod aggregator;
pub mod data_merger;
pub mod pipeline;
pub mod run_report;

pub use aggregator::Aggregator;
pub use data_merger::DataMerger;
pub use pipeline::Pipeline;
pub use run_report::{RunReport, SourceFailure, UnitOutcome, UnitResult, UnitStage};
