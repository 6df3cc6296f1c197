pub mod activity;
pub mod health;
pub mod modification;
pub mod reservation;
pub mod schedule;
