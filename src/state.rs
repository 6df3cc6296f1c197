use std::sync::Arc;
use crate::domain::ports::{
    Clock, ModificationRepository, ReservationRepository, ScheduleRepository, SlotRepository,
};
use crate::domain::services::{
    modification_engine::ModificationEngine,
    reconciler::ScheduleReconciler,
    schedule_events::ScheduleEvents,
    slot_generator::SlotGenerator,
};
use crate::config::Config;

#[derive(Clone)]
pub struct Repositories {
    pub schedules: Arc<dyn ScheduleRepository>,
    pub slots: Arc<dyn SlotRepository>,
    pub modifications: Arc<dyn ModificationRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub schedule_repo: Arc<dyn ScheduleRepository>,
    pub slot_repo: Arc<dyn SlotRepository>,
    pub modification_repo: Arc<dyn ModificationRepository>,
    pub reservation_repo: Arc<dyn ReservationRepository>,
    pub clock: Arc<dyn Clock>,
    pub slot_generator: Arc<SlotGenerator>,
    pub reconciler: Arc<ScheduleReconciler>,
    pub modification_engine: Arc<ModificationEngine>,
    pub schedule_events: Arc<ScheduleEvents>,
}

impl AppState {
    /// Wires the engine services over a set of repositories.
    pub fn new(config: Config, repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        let slot_generator = Arc::new(SlotGenerator::new(
            repos.schedules.clone(),
            repos.slots.clone(),
            clock.clone(),
            config.horizon_days,
        ));
        let modification_engine = Arc::new(ModificationEngine::new(
            repos.schedules.clone(),
            repos.slots.clone(),
            repos.modifications.clone(),
            repos.reservations.clone(),
            clock.clone(),
        ));
        let reconciler = Arc::new(ScheduleReconciler::new(
            repos.slots.clone(),
            slot_generator.clone(),
            modification_engine.clone(),
            clock.clone(),
        ));
        let schedule_events = Arc::new(ScheduleEvents::new(
            repos.schedules.clone(),
            repos.slots.clone(),
            slot_generator.clone(),
            reconciler.clone(),
            clock.clone(),
        ));

        Self {
            config,
            schedule_repo: repos.schedules,
            slot_repo: repos.slots,
            modification_repo: repos.modifications,
            reservation_repo: repos.reservations,
            clock,
            slot_generator,
            reconciler,
            modification_engine,
            schedule_events,
        }
    }
}
