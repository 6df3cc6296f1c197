use chrono::NaiveDate;
use crate::domain::models::schedule::Schedule;
use crate::domain::services::calendar::{add_days, days_between, weekday_index};

/// Lazily walks `[start_date, start_date + horizon_days)` and yields the dates whose
/// weekday is in the schedule's set. Disabled schedules and empty sets yield nothing.
pub fn occurrences(schedule: &Schedule, horizon_days: i64) -> impl Iterator<Item = NaiveDate> + '_ {
    let until = add_days(schedule.start_date, horizon_days.max(0));
    occurrences_between(schedule, schedule.start_date, until)
}

/// Same walk over `[from, until)`, never earlier than the schedule's start date.
pub fn occurrences_between(schedule: &Schedule, from: NaiveDate, until: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
    let first = from.max(schedule.start_date);
    let days = if schedule.enabled && !schedule.weekdays.is_empty() && first < until {
        days_between(first, until)
    } else {
        0
    };

    (0..days)
        .map(move |offset| add_days(first, offset))
        .filter(move |date| schedule.weekdays.contains_index(weekday_index(*date)))
}

pub fn expand_recurrence(schedule: &Schedule, horizon_days: i64) -> Vec<NaiveDate> {
    occurrences(schedule, horizon_days).collect()
}
