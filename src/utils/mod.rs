pub mod constants;
pub mod dates;
pub mod progress;

pub use constants::*;
pub use dates::{backfill_days, daily_target, date_range, today_utc, DailyPolicy};
pub use progress::ProgressReporter;
