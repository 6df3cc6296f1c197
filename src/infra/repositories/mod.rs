// Filter for rows that have not been soft-deleted. Expands to a literal so it can sit inside `concat!`.
macro_rules! live {
    () => {
        "deleted_at IS NULL"
    };
}

/// Rows per multi-value INSERT. Keeps SQLite under its bind parameter limit.
pub const INSERT_CHUNK: usize = 500;

pub mod sqlite_schedule_repo;
pub mod sqlite_slot_repo;
pub mod sqlite_modification_repo;
pub mod sqlite_reservation_repo;

pub mod postgres_schedule_repo;
pub mod postgres_slot_repo;
pub mod postgres_modification_repo;
pub mod postgres_reservation_repo;
