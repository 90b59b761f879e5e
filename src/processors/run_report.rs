use chrono::NaiveDate;
use std::fmt;

use crate::models::Source;

/// Steps of one (location, date) unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStage {
    Pending,
    Fetching,
    Aggregating,
    Merging,
    Loading,
    Done,
}

impl fmt::Display for UnitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitStage::Pending => "pending",
            UnitStage::Fetching => "fetching",
            UnitStage::Aggregating => "aggregating",
            UnitStage::Merging => "merging",
            UnitStage::Loading => "loading",
            UnitStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Terminal state of a unit.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    /// Row written. `snapshot` marks air quality approximated from a single observation.
    Done { location_id: i64, snapshot: bool },
    Failed { stage: UnitStage, reason: String },
    /// Never attempted because the run was aborted.
    Skipped,
}

impl UnitOutcome {
    /// Stage the unit ended in. A skipped unit never left `Pending`.
    pub fn stage(&self) -> UnitStage {
        match self {
            UnitOutcome::Done { .. } => UnitStage::Done,
            UnitOutcome::Failed { stage, .. } => *stage,
            UnitOutcome::Skipped => UnitStage::Pending,
        }
    }
}

/// One source that produced no summary for a unit. The unit itself may still succeed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub location: String,
    pub date: NaiveDate,
    pub source: Source,
    pub stage: UnitStage,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitResult {
    pub location: String,
    pub date: NaiveDate,
    pub outcome: UnitOutcome,
    pub source_failures: Vec<SourceFailure>,
}

impl UnitResult {
    pub fn new(
        location: String,
        date: NaiveDate,
        outcome: UnitOutcome,
        source_failures: Vec<SourceFailure>,
    ) -> Self {
        Self {
            location,
            date,
            outcome,
            source_failures,
        }
    }

    pub fn skipped(location: String, date: NaiveDate) -> Self {
        Self::new(location, date, UnitOutcome::Skipped, Vec::new())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub total_units: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failures: Vec<UnitResult>,
    pub source_failures: Vec<SourceFailure>,
    pub snapshot_units: Vec<(String, NaiveDate)>,
    pub aborted: Option<String>,
}

impl RunReport {
    pub fn new(total_units: usize) -> Self {
        Self {
            total_units,
            ..Default::default()
        }
    }

    pub fn record(&mut self, unit: UnitResult) {
        self.source_failures.extend(unit.source_failures.iter().cloned());

        match unit.outcome {
            UnitOutcome::Done { snapshot, .. } => {
                self.succeeded += 1;
                if snapshot {
                    self.snapshot_units.push((unit.location, unit.date));
                }
            }
            UnitOutcome::Failed { .. } => self.failures.push(unit),
            UnitOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn abort(&mut self, reason: String) {
        self.aborted = Some(reason);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn processed(&self) -> usize {
        self.succeeded + self.failed() + self.skipped
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== ETL Run Report ===\n");
        summary.push_str(&format!("Total Units: {}\n", self.total_units));
        summary.push_str(&format!(
            "Succeeded: {} ({:.1}%)\n",
            self.succeeded,
            percent(self.succeeded, self.total_units)
        ));
        summary.push_str(&format!(
            "Failed: {} ({:.1}%)\n",
            self.failed(),
            percent(self.failed(), self.total_units)
        ));
        summary.push_str(&format!("Skipped: {}\n", self.skipped));
        summary.push_str(&format!("Source Failures: {}\n", self.source_failures.len()));
        summary.push_str(&format!(
            "Snapshot-Approximated Air Quality: {}\n",
            self.snapshot_units.len()
        ));

        if let Some(reason) = &self.aborted {
            summary.push_str(&format!("\nRun aborted: {}\n", reason));
        }

        if !self.failures.is_empty() {
            summary.push_str("\nFailed Units:\n");
            for unit in &self.failures {
                if let UnitOutcome::Failed { stage, reason } = &unit.outcome {
                    summary.push_str(&format!(
                        "  - {} on {} ({}): {}\n",
                        unit.location, unit.date, stage, reason
                    ));
                }
            }
        }

        if !self.source_failures.is_empty() {
            summary.push_str("\nSource Failures:\n");
            for failure in self.source_failures.iter().take(20) {
                summary.push_str(&format!(
                    "  - {} on {} [{}] ({}): {}\n",
                    failure.location, failure.date, failure.source, failure.stage, failure.reason
                ));
            }
            if self.source_failures.len() > 20 {
                summary.push_str(&format!(
                    "  ... and {} more\n",
                    self.source_failures.len() - 20
                ));
            }
        }

        if !self.snapshot_units.is_empty() {
            summary.push_str("\nSnapshot Units (single observation, not a daily mean):\n");
            for (location, date) in &self.snapshot_units {
                summary.push_str(&format!("  - {} on {}\n", location, date));
            }
        }

        summary
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}
