use tracing::{error, warn};

use crate::domain::models::slot::{Slot, SlotUpdate};
use crate::domain::ports::SlotRepository;
use crate::error::AppError;

pub const MAX_CAS_ATTEMPTS: usize = 3;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: usize,
    /// Ids still stale after every attempt.
    pub stale: Vec<String>,
}

fn build_updates<F>(slots: &[Slot], build: &F) -> Vec<SlotUpdate>
where
    F: Fn(&Slot) -> Option<SlotUpdate>,
{
    slots
        .iter()
        .filter_map(|slot| build(slot).filter(|u| u.changes(slot)))
        .collect()
}

/// Writes `build(slot)` for every slot under optimistic concurrency on the
/// capacities, times and blocked flag it was built from. Rows that changed underneath are re-read
/// and rebuilt, up to [`MAX_CAS_ATTEMPTS`] times. `build` returning `None` leaves the
/// slot alone.
pub async fn write_with_retry<F>(
    slot_repo: &dyn SlotRepository,
    slots: &[Slot],
    build: F,
) -> Result<WriteOutcome, AppError>
where
    F: Fn(&Slot) -> Option<SlotUpdate> + Send + Sync,
{
    let mut outcome = WriteOutcome::default();
    let mut pending = build_updates(slots, &build);

    for attempt in 1..=MAX_CAS_ATTEMPTS {
        if pending.is_empty() {
            break;
        }

        let stale = slot_repo.compare_and_update(&pending).await?;
        outcome.written += pending.len() - stale.len();
        if stale.is_empty() {
            break;
        }

        if attempt == MAX_CAS_ATTEMPTS {
            outcome.stale = stale;
            break;
        }

        warn!(attempt, stale = stale.len(), "Slots changed concurrently, retrying");
        let refreshed = slot_repo.find_by_ids(&stale).await?;
        pending = build_updates(&refreshed, &build);
    }

    Ok(outcome)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TolerantOutcome {
    /// Slots that needed a change.
    pub attempted: usize,
    pub written: usize,
}

/// Like [`write_with_retry`] but never fails as a whole: when the batch cannot be
/// written, each slot is tried on its own and failures are logged and skipped.
pub async fn write_each_tolerant<F>(slot_repo: &dyn SlotRepository, slots: &[Slot], build: F) -> TolerantOutcome
where
    F: Fn(&Slot) -> Option<SlotUpdate> + Send + Sync,
{
    let attempted = build_updates(slots, &build).len();

    let written = match write_with_retry(slot_repo, slots, &build).await {
        Ok(outcome) => {
            for id in &outcome.stale {
                warn!(slot_id = %id, "Slot kept changing concurrently, skipped");
            }
            outcome.written
        }
        Err(batch_err) => {
            warn!("Batch slot write failed ({}), falling back to per-slot writes", batch_err);
            let mut written = 0;
            for slot in slots {
                match write_with_retry(slot_repo, std::slice::from_ref(slot), &build).await {
                    Ok(outcome) => {
                        written += outcome.written;
                        if !outcome.stale.is_empty() {
                            warn!(slot_id = %slot.id, "Slot kept changing concurrently, skipped");
                        }
                    }
                    Err(e) => error!(slot_id = %slot.id, "Slot update failed, skipped: {:?}", e),
                }
            }
            written
        }
    };

    TolerantOutcome { attempted, written }
}
