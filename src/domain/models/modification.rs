use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::lifecycle::SoftDeletable;
use super::slot::SlotScope;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModificationType {
    ChangeStartTime,
    ChangeCapacity,
    BlockSchedule,
    BlockActivity,
    BlockAll,
}

impl ModificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModificationType::ChangeStartTime => "CHANGE_START_TIME",
            ModificationType::ChangeCapacity => "CHANGE_CAPACITY",
            ModificationType::BlockSchedule => "BLOCK_SCHEDULE",
            ModificationType::BlockActivity => "BLOCK_ACTIVITY",
            ModificationType::BlockAll => "BLOCK_ALL",
        }
    }
}

impl fmt::Display for ModificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModificationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CHANGE_START_TIME" => Ok(ModificationType::ChangeStartTime),
            "CHANGE_CAPACITY" => Ok(ModificationType::ChangeCapacity),
            "BLOCK_SCHEDULE" => Ok(ModificationType::BlockSchedule),
            "BLOCK_ACTIVITY" => Ok(ModificationType::BlockActivity),
            "BLOCK_ALL" => Ok(ModificationType::BlockAll),
            other => Err(AppError::Validation(format!("Unknown modification type {}", other))),
        }
    }
}

/// The slot column a modification overrides. Two live modifications of the same
/// family over intersecting slots cannot coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationFamily {
    Block,
    StartTime,
    Capacity,
}

/// Typed payload of a modification; each variant carries exactly the reference and
/// values its type requires.
#[derive(Debug, Clone, PartialEq)]
pub enum ModificationKind {
    ChangeStartTime {
        schedule_id: String,
        start_time: NaiveTime,
        end_time: Option<NaiveTime>,
    },
    ChangeCapacity {
        schedule_id: String,
        capacity: i32,
    },
    BlockSchedule {
        schedule_id: String,
    },
    BlockActivity {
        activity_id: String,
    },
    BlockAll {
        agency_id: String,
    },
}

impl ModificationKind {
    pub fn modification_type(&self) -> ModificationType {
        match self {
            ModificationKind::ChangeStartTime { .. } => ModificationType::ChangeStartTime,
            ModificationKind::ChangeCapacity { .. } => ModificationType::ChangeCapacity,
            ModificationKind::BlockSchedule { .. } => ModificationType::BlockSchedule,
            ModificationKind::BlockActivity { .. } => ModificationType::BlockActivity,
            ModificationKind::BlockAll { .. } => ModificationType::BlockAll,
        }
    }

    pub fn family(&self) -> ModificationFamily {
        match self {
            ModificationKind::ChangeStartTime { .. } => ModificationFamily::StartTime,
            ModificationKind::ChangeCapacity { .. } => ModificationFamily::Capacity,
            ModificationKind::BlockSchedule { .. }
            | ModificationKind::BlockActivity { .. }
            | ModificationKind::BlockAll { .. } => ModificationFamily::Block,
        }
    }

    pub fn scope(&self) -> SlotScope {
        match self {
            ModificationKind::ChangeStartTime { schedule_id, .. }
            | ModificationKind::ChangeCapacity { schedule_id, .. }
            | ModificationKind::BlockSchedule { schedule_id } => SlotScope::Schedule(schedule_id.clone()),
            ModificationKind::BlockActivity { activity_id } => SlotScope::Activity(activity_id.clone()),
            ModificationKind::BlockAll { agency_id } => SlotScope::Agency(agency_id.clone()),
        }
    }

    pub fn schedule_id(&self) -> Option<&str> {
        match self {
            ModificationKind::ChangeStartTime { schedule_id, .. }
            | ModificationKind::ChangeCapacity { schedule_id, .. }
            | ModificationKind::BlockSchedule { schedule_id } => Some(schedule_id),
            _ => None,
        }
    }

    /// Blocking kinds refuse to coexist with any reservation in range.
    pub fn rejects_reservations(&self) -> bool {
        !matches!(self, ModificationKind::ChangeCapacity { .. })
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct TemporaryModification {
    pub id: String,
    pub agency_id: String,
    pub activity_id: Option<String>,
    pub schedule_id: Option<String>,
    pub kind: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub new_start_time: Option<NaiveTime>,
    pub new_end_time: Option<NaiveTime>,
    pub new_capacity: Option<i32>,
    pub previous_start_time: Option<NaiveTime>,
    pub previous_end_time: Option<NaiveTime>,
    pub previous_capacity: Option<i32>,
    pub reason: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

pub struct NewModificationParams {
    pub agency_id: String,
    pub activity_id: Option<String>,
    pub kind: ModificationKind,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub previous_start_time: Option<NaiveTime>,
    pub previous_end_time: Option<NaiveTime>,
    pub previous_capacity: Option<i32>,
    pub reason: Option<String>,
}

impl TemporaryModification {
    pub fn new(params: NewModificationParams) -> Self {
        let (schedule_id, new_start_time, new_end_time, new_capacity) = match &params.kind {
            ModificationKind::ChangeStartTime { schedule_id, start_time, end_time } => {
                (Some(schedule_id.clone()), Some(*start_time), *end_time, None)
            }
            ModificationKind::ChangeCapacity { schedule_id, capacity } => {
                (Some(schedule_id.clone()), None, None, Some(*capacity))
            }
            ModificationKind::BlockSchedule { schedule_id } => (Some(schedule_id.clone()), None, None, None),
            ModificationKind::BlockActivity { .. } | ModificationKind::BlockAll { .. } => (None, None, None, None),
        };

        let activity_id = match &params.kind {
            ModificationKind::BlockActivity { activity_id } => Some(activity_id.clone()),
            ModificationKind::BlockAll { .. } => None,
            _ => params.activity_id,
        };

        Self {
            id: Uuid::new_v4().to_string(),
            agency_id: params.agency_id,
            activity_id,
            schedule_id,
            kind: params.kind.modification_type().as_str().to_string(),
            date_from: params.date_from,
            date_to: params.date_to,
            new_start_time,
            new_end_time,
            new_capacity,
            previous_start_time: params.previous_start_time,
            previous_end_time: params.previous_end_time,
            previous_capacity: params.previous_capacity,
            reason: params.reason,
            active: false,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn modification_type(&self) -> Result<ModificationType, AppError> {
        self.kind.parse()
    }

    /// Decodes the stored row into its typed kind, enforcing the per-type references.
    pub fn typed_kind(&self) -> Result<ModificationKind, AppError> {
        let missing = |field: &str| {
            AppError::Validation(format!("{} modification requires {}", self.kind, field))
        };

        Ok(match self.modification_type()? {
            ModificationType::ChangeStartTime => ModificationKind::ChangeStartTime {
                schedule_id: self.schedule_id.clone().ok_or_else(|| missing("schedule_id"))?,
                start_time: self.new_start_time.ok_or_else(|| missing("new_start_time"))?,
                end_time: self.new_end_time,
            },
            ModificationType::ChangeCapacity => ModificationKind::ChangeCapacity {
                schedule_id: self.schedule_id.clone().ok_or_else(|| missing("schedule_id"))?,
                capacity: self.new_capacity.ok_or_else(|| missing("new_capacity"))?,
            },
            ModificationType::BlockSchedule => ModificationKind::BlockSchedule {
                schedule_id: self.schedule_id.clone().ok_or_else(|| missing("schedule_id"))?,
            },
            ModificationType::BlockActivity => ModificationKind::BlockActivity {
                activity_id: self.activity_id.clone().ok_or_else(|| missing("activity_id"))?,
            },
            ModificationType::BlockAll => ModificationKind::BlockAll {
                agency_id: self.agency_id.clone(),
            },
        })
    }

    pub fn date_range_overlaps(&self, other: &TemporaryModification) -> bool {
        self.date_from <= other.date_to && other.date_from <= self.date_to
    }

    /// Agency contains activity contains schedule; a missing narrower id means the
    /// whole wider scope.
    pub fn scope_intersects(&self, other: &TemporaryModification) -> bool {
        if self.agency_id != other.agency_id {
            return false;
        }
        match (&self.activity_id, &other.activity_id) {
            (Some(a), Some(b)) if a != b => return false,
            (Some(_), Some(_)) => {}
            _ => return true,
        }
        match (&self.schedule_id, &other.schedule_id) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl SoftDeletable for TemporaryModification {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}
