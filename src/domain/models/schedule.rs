use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use super::lifecycle::SoftDeletable;

/// Set of weekdays a schedule recurs on, indexed 0 = Sunday .. 6 = Saturday.
///
/// Stored as a 7-bit mask; serialized as a sorted list of day indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

#[derive(Debug)]
pub struct InvalidWeekday(pub i64);

impl fmt::Display for InvalidWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "weekday value {} is outside 0..=6", self.0)
    }
}

impl std::error::Error for InvalidWeekday {}

impl WeekdaySet {
    const ALL_BITS: u8 = 0b0111_1111;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_days(days: &[u8]) -> Result<Self, InvalidWeekday> {
        let mut mask = 0u8;
        for &day in days {
            if day > 6 {
                return Err(InvalidWeekday(day as i64));
            }
            mask |= 1 << day;
        }
        Ok(Self(mask))
    }

    pub fn bits(&self) -> i32 {
        self.0 as i32
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains_index(&self, day: u8) -> bool {
        day <= 6 && self.0 & (1 << day) != 0
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.contains_index(weekday.num_days_from_sunday() as u8)
    }

    pub fn days(&self) -> Vec<u8> {
        (0..=6).filter(|d| self.contains_index(*d)).collect()
    }
}

impl TryFrom<i32> for WeekdaySet {
    type Error = InvalidWeekday;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value < 0 || value > Self::ALL_BITS as i32 {
            return Err(InvalidWeekday(value as i64));
        }
        Ok(Self(value as u8))
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = InvalidWeekday;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_days(&value)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(value: WeekdaySet) -> Self {
        value.days()
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Schedule {
    pub id: String,
    pub activity_id: String,
    pub agency_id: String,
    pub start_date: NaiveDate,
    #[sqlx(try_from = "i32")]
    pub weekdays: WeekdaySet,
    pub full_day: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub capacity: i32,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

pub struct NewScheduleParams {
    pub activity_id: String,
    pub agency_id: String,
    pub start_date: NaiveDate,
    pub weekdays: WeekdaySet,
    pub full_day: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub capacity: i32,
    pub enabled: bool,
}

impl Schedule {
    pub fn new(params: NewScheduleParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            activity_id: params.activity_id,
            agency_id: params.agency_id,
            start_date: params.start_date,
            weekdays: params.weekdays,
            full_day: params.full_day,
            start_time: params.start_time,
            end_time: params.end_time,
            capacity: params.capacity,
            enabled: params.enabled,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    /// Checks the shape invariants a schedule must hold before it is stored.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity < 0 {
            return Err("capacity must not be negative".into());
        }
        if self.full_day {
            return Ok(());
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if start < end => Ok(()),
            (Some(_), Some(_)) => Err("start_time must be before end_time".into()),
            _ => Err("start_time and end_time are required unless full_day is set".into()),
        }
    }

    /// Slot start/end times derived from this schedule. Full-day schedules carry no times.
    pub fn slot_times(&self) -> (Option<NaiveTime>, Option<NaiveTime>) {
        if self.full_day {
            (None, None)
        } else {
            (self.start_time, self.end_time)
        }
    }
}

impl SoftDeletable for Schedule {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}
