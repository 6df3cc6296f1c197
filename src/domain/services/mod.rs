pub mod calendar;
pub mod capacity;
pub mod modification_engine;
pub mod reconciler;
pub mod recurrence;
pub mod schedule_events;
pub mod slot_generator;
pub mod slot_writer;
