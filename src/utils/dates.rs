use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};
use crate::utils::constants::MAX_BACKFILL_DAYS;

/// Which day the daily run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DailyPolicy {
    /// The previous UTC day, which has complete hourly data
    #[default]
    Yesterday,
    /// The current UTC day, partial at run time
    Today,
}

/// Current date in UTC, the day boundary both sources are queried with.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// The single target date of a daily run.
pub fn daily_target(policy: DailyPolicy, today: NaiveDate) -> NaiveDate {
    match policy {
        DailyPolicy::Yesterday => today - Duration::days(1),
        DailyPolicy::Today => today,
    }
}

/// The `days` days before `today`, oldest first. Today itself is excluded.
pub fn backfill_days(days: u32, today: NaiveDate) -> Result<Vec<NaiveDate>> {
    if days == 0 {
        return Err(EtlError::InvalidDateRange(
            "backfill needs at least one day".to_string(),
        ));
    }
    if days > MAX_BACKFILL_DAYS {
        return Err(EtlError::InvalidDateRange(format!(
            "{} days exceeds the maximum of {}",
            days, MAX_BACKFILL_DAYS
        )));
    }

    Ok((1..=days as i64)
        .rev()
        .map(|offset| today - Duration::days(offset))
        .collect())
}

/// Every date from `start` to `end` inclusive.
pub fn date_range(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<Vec<NaiveDate>> {
    if start > end {
        return Err(EtlError::InvalidDateRange(format!(
            "start {} is after end {}",
            start, end
        )));
    }
    if end > today {
        return Err(EtlError::InvalidDateRange(format!(
            "end {} is in the future",
            end
        )));
    }

    let days = (end - start).num_days() + 1;
    if days > MAX_BACKFILL_DAYS as i64 {
        return Err(EtlError::InvalidDateRange(format!(
            "{} days exceeds the maximum of {}",
            days, MAX_BACKFILL_DAYS
        )));
    }

    Ok(start.iter_days().take(days as usize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_target() {
        let today = date(2025, 1, 16);
        assert_eq!(daily_target(DailyPolicy::Yesterday, today), date(2025, 1, 15));
        assert_eq!(daily_target(DailyPolicy::Today, today), today);
    }

    #[test]
    fn test_backfill_days_are_oldest_first_and_exclude_today() {
        let today = date(2025, 3, 1);
        let days = backfill_days(30, today).unwrap();

        assert_eq!(days.len(), 30);
        assert_eq!(days[0], date(2025, 1, 30));
        assert_eq!(days[29], date(2025, 2, 28));
        assert!(!days.contains(&today));
    }

    #[test]
    fn test_backfill_rejects_zero_days() {
        assert!(backfill_days(0, date(2025, 3, 1)).is_err());
    }

    #[test]
    fn test_explicit_range_is_inclusive() {
        let today = date(2025, 2, 1);
        let days = date_range(date(2025, 1, 30), date(2025, 2, 1), today).unwrap();
        assert_eq!(days, vec![date(2025, 1, 30), date(2025, 1, 31), date(2025, 2, 1)]);

        let single = date_range(date(2025, 1, 15), date(2025, 1, 15), today).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_invalid_ranges() {
        let today = date(2025, 2, 1);
        assert!(date_range(date(2025, 1, 20), date(2025, 1, 10), today).is_err());
        assert!(date_range(date(2025, 1, 20), date(2025, 2, 2), today).is_err());
    }
}
