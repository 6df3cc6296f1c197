use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of a soft-deletable row. The `deleted_at` column is the storage form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    Deleted { at: DateTime<Utc> },
}

pub trait SoftDeletable {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn lifecycle(&self) -> Lifecycle {
        match self.deleted_at() {
            Some(at) => Lifecycle::Deleted { at },
            None => Lifecycle::Active,
        }
    }

    fn is_active(&self) -> bool {
        self.lifecycle() == Lifecycle::Active
    }
}
