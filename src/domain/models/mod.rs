pub mod lifecycle;
pub mod modification;
pub mod reservation;
pub mod schedule;
pub mod slot;
