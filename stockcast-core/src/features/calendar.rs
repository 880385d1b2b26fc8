//! Calendar decomposition of an observation date.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Day-of-week, day-of-month, month and weekend flag for one date.
///
/// `day_of_week` counts from Monday = 0 to Sunday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFields {
    pub day_of_week: u32,
    pub day_of_month: u32,
    pub month: u32,
    pub is_weekend: bool,
}

impl CalendarFields {
    pub fn from_date(date: NaiveDate) -> Self {
        let weekday = date.weekday();
        Self {
            day_of_week: weekday.num_days_from_monday(),
            day_of_month: date.day(),
            month: date.month(),
            is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
        }
    }
}
