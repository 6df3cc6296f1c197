mod common;

use activity_booking::domain::models::{
    modification::ModificationType,
    reservation::Reservation,
    schedule::{Schedule, WeekdaySet},
};
use activity_booking::domain::services::modification_engine::ModificationInput;
use activity_booking::domain::services::reconciler::{classify_change, ReconciliationResult, ScheduleChange};
use common::{date, schedule_params, time, TestApp, AGENCY};

async fn update(app: &TestApp, previous: &Schedule, edit: impl FnOnce(&mut Schedule)) -> (Schedule, ReconciliationResult) {
    let mut updated = previous.clone();
    edit(&mut updated);
    let saved = app.state.schedule_repo.update(&updated).await.unwrap();
    let result = app.state.schedule_events.on_schedule_updated(previous, &saved).await.unwrap();
    (saved, result)
}

fn modification(modification_type: ModificationType, schedule_id: &str, from: &str, to: &str) -> ModificationInput {
    ModificationInput {
        modification_type,
        schedule_id: Some(schedule_id.to_string()),
        activity_id: None,
        date_from: date(from),
        date_to: date(to),
        new_start_time: None,
        new_end_time: None,
        new_capacity: None,
        current_start_time: None,
        current_end_time: None,
        current_capacity: None,
        reason: None,
    }
}

#[test]
fn test_classify_change() {
    let base = Schedule::new(schedule_params("activity-1", &[1, 3, 5], 10));

    assert_eq!(classify_change(&base, &base), ScheduleChange::Unchanged);

    let mut capacity = base.clone();
    capacity.capacity = 4;
    assert_eq!(classify_change(&base, &capacity), ScheduleChange::CapacityOnly);

    let mut disabled = base.clone();
    disabled.enabled = false;
    assert_eq!(classify_change(&base, &disabled), ScheduleChange::Disabled);
    assert_eq!(classify_change(&disabled, &disabled), ScheduleChange::StillDisabled);
    assert_eq!(classify_change(&disabled, &base), ScheduleChange::Reshaped);

    let mut days = base.clone();
    days.weekdays = WeekdaySet::from_days(&[2]).unwrap();
    days.capacity = 4;
    assert_eq!(classify_change(&base, &days), ScheduleChange::Reshaped);

    let mut times = base.clone();
    times.end_time = Some(time("13:00"));
    assert_eq!(classify_change(&base, &times), ScheduleChange::Reshaped);
}

#[tokio::test]
async fn test_capacity_change_propagates_to_future_slots() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1, 3, 5], 10)).await;
    let reserved = app.slot_on(&schedule.id, "2024-01-12").await;
    app.hold(&reserved.id, 3).await;

    app.clock.set(date("2024-01-10").and_hms_opt(8, 0, 0).unwrap().and_utc());
    let (_, result) = update(&app, &schedule, |s| s.capacity = 6).await;
    assert!(!result.regenerated);
    assert_eq!(result.slots_patched, 8);

    for slot in app.slots(&schedule.id).await {
        if slot.date < date("2024-01-10") {
            assert_eq!((slot.total_capacity, slot.available_capacity), (10, 10), "past slot {} changed", slot.date);
        } else if slot.id == reserved.id {
            assert_eq!((slot.total_capacity, slot.available_capacity), (6, 3));
        } else {
            assert_eq!((slot.total_capacity, slot.available_capacity), (6, 6));
        }
    }
    app.assert_capacity_invariant().await;
}

#[tokio::test]
async fn test_capacity_below_consumed_clamps_to_zero() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1], 10)).await;
    let reserved = app.slot_on(&schedule.id, "2024-01-08").await;
    app.hold(&reserved.id, 8).await;

    update(&app, &schedule, |s| s.capacity = 5).await;

    let slot = app.slot_on(&schedule.id, "2024-01-08").await;
    assert_eq!(slot.id, reserved.id);
    assert_eq!((slot.total_capacity, slot.available_capacity), (5, 0));
    app.assert_capacity_invariant().await;
}

#[tokio::test]
async fn test_disable_blocks_future_slots_without_deleting() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1, 3, 5], 10)).await;
    let reserved = app.slot_on(&schedule.id, "2024-01-17").await;
    app.hold(&reserved.id, 2).await;

    app.clock.set(date("2024-01-10").and_hms_opt(0, 0, 0).unwrap().and_utc());
    let (_, result) = update(&app, &schedule, |s| s.enabled = false).await;
    assert_eq!(result.slots_blocked, 8);
    assert_eq!(result.slots_deleted, 0);

    let slots = app.slots(&schedule.id).await;
    assert_eq!(slots.len(), 12);
    for slot in &slots {
        assert_eq!(slot.blocked, slot.date >= date("2024-01-10"), "slot {}", slot.date);
    }
    let kept = slots.iter().find(|s| s.id == reserved.id).unwrap();
    assert_eq!(kept.consumed(), 2);
}

#[tokio::test]
async fn test_reshape_preserves_reserved_slots() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1, 3, 5], 10)).await;
    let reserved = app.slot_on(&schedule.id, "2024-01-03").await;
    app.hold(&reserved.id, 2).await;

    // Drop Wednesdays and move to the afternoon.
    let (_, result) = update(&app, &schedule, |s| {
        s.weekdays = WeekdaySet::from_days(&[1, 5]).unwrap();
        s.start_time = Some(time("14:00"));
        s.end_time = Some(time("16:00"));
    })
    .await;

    assert!(result.regenerated);
    assert_eq!(result.slots_deleted, 11);
    assert_eq!(result.slots_patched, 1);
    assert_eq!(result.generation.as_ref().unwrap().slots_created, 8);

    let kept = app.slot_on(&schedule.id, "2024-01-03").await;
    assert_eq!(kept.id, reserved.id);
    assert_eq!(kept.consumed(), 2);
    assert_eq!(kept.start_time, Some(time("14:00")));
    assert_eq!(kept.end_time, Some(time("16:00")));
    assert_eq!((kept.total_capacity, kept.available_capacity), (10, 8));

    let slots = app.slots(&schedule.id).await;
    assert_eq!(slots.len(), 9);
    assert!(slots.iter().all(|s| s.start_time == Some(time("14:00"))));
    app.assert_capacity_invariant().await;
}

#[tokio::test]
async fn test_reshape_skips_dates_held_by_reserved_slots() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1], 10)).await;
    let reserved = app.slot_on(&schedule.id, "2024-01-15").await;
    app.hold(&reserved.id, 4).await;

    let (_, result) = update(&app, &schedule, |s| {
        s.start_time = Some(time("09:00"));
        s.capacity = 3;
    })
    .await;

    let generation = result.generation.unwrap();
    assert_eq!(generation.slots_created, 3);
    assert_eq!(generation.slots_skipped, 1);
    assert_eq!(generation.skipped_detail[0].date, date("2024-01-15"));

    let kept = app.slot_on(&schedule.id, "2024-01-15").await;
    assert_eq!(kept.id, reserved.id);
    assert_eq!((kept.total_capacity, kept.available_capacity), (3, 0));
    app.assert_capacity_invariant().await;
}

#[tokio::test]
async fn test_reenable_unblocks_slots() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1, 3, 5], 10)).await;
    let reserved = app.slot_on(&schedule.id, "2024-01-05").await;
    app.hold(&reserved.id, 1).await;

    let (disabled, _) = update(&app, &schedule, |s| s.enabled = false).await;
    assert!(app.slots(&schedule.id).await.iter().all(|s| s.blocked));

    let (_, result) = update(&app, &disabled, |s| s.enabled = true).await;
    assert!(result.regenerated);

    let slots = app.slots(&schedule.id).await;
    assert_eq!(slots.len(), 12);
    assert!(slots.iter().all(|s| !s.blocked));
    assert_eq!(app.slot_on(&schedule.id, "2024-01-05").await.id, reserved.id);
}

#[tokio::test]
async fn test_full_regenerate_covers_past_slots() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1], 10)).await;

    app.clock.set(date("2024-01-10").and_hms_opt(0, 0, 0).unwrap().and_utc());
    let result = app.state.reconciler.reconcile(&schedule, &schedule, true).await.unwrap();

    // Every untouched slot, the past Monday included, is replaced.
    assert_eq!(result.slots_deleted, 4);
    assert_eq!(result.generation.unwrap().slots_created, 4);
}

#[tokio::test]
async fn test_delete_schedule_keeps_reserved_slots_blocked() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1, 3, 5], 10)).await;
    let reserved = app.slot_on(&schedule.id, "2024-01-19").await;
    app.hold(&reserved.id, 2).await;

    let result = app.state.schedule_events.on_schedule_deleted(&schedule).await.unwrap();
    assert_eq!(result.slots_deleted, 11);
    assert_eq!(result.slots_blocked, 1);

    assert!(app.state.schedule_repo.find_by_id(&schedule.id).await.unwrap().is_none());
    let remaining = app.slots(&schedule.id).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, reserved.id);
    assert!(remaining[0].blocked);
    assert_eq!(remaining[0].consumed(), 2);
}

#[tokio::test]
async fn test_reshape_keeps_live_block_on_regenerated_slots() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1, 3, 5], 10)).await;

    let block = app.state.modification_engine
        .create(AGENCY, modification(ModificationType::BlockSchedule, &schedule.id, "2024-01-01", "2024-01-20"))
        .await
        .unwrap();
    assert_eq!(block.slots_affected, 9);

    let (_, result) = update(&app, &schedule, |s| s.start_time = Some(time("09:00"))).await;
    assert!(result.regenerated);
    assert_eq!(result.slots_deleted, 12);
    assert_eq!(result.slots_overlaid, 9);

    let slot = app.slot_on(&schedule.id, "2024-01-03").await;
    assert!(slot.blocked);
    assert_eq!(slot.start_time, Some(time("09:00")));
    assert!(!app.slot_on(&schedule.id, "2024-01-22").await.blocked);

    let reservation = Reservation::new(slot.id.clone(), AGENCY.to_string(), 1);
    assert!(app.state.reservation_repo.hold(&reservation).await.unwrap_err().is_conflict());

    let stored = app.state.modification_repo.find_by_id(&block.modification.id).await.unwrap().unwrap();
    assert!(stored.active);

    // Lifting the block afterwards frees the regenerated slots.
    let reverted = app.state.modification_engine.revert(&block.modification.id).await.unwrap();
    assert_eq!(reverted.slots_affected, 9);
    assert!(app.slots(&schedule.id).await.iter().all(|s| !s.blocked));
}

#[tokio::test]
async fn test_capacity_propagation_keeps_live_capacity_override() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1, 3, 5], 10)).await;

    let mut change = modification(ModificationType::ChangeCapacity, &schedule.id, "2024-01-01", "2024-01-10");
    change.new_capacity = Some(5);
    app.state.modification_engine.create(AGENCY, change).await.unwrap();

    let (_, result) = update(&app, &schedule, |s| s.capacity = 8).await;
    assert_eq!(result.slots_patched, 12);
    assert_eq!(result.slots_overlaid, 5);

    for slot in app.slots(&schedule.id).await {
        let expected = if slot.date <= date("2024-01-10") { 5 } else { 8 };
        assert_eq!((slot.total_capacity, slot.available_capacity), (expected, expected), "slot {}", slot.date);
    }
    app.assert_capacity_invariant().await;
}

#[tokio::test]
async fn test_reenable_keeps_slots_under_live_block() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1, 3, 5], 10)).await;
    app.state.modification_engine
        .create(AGENCY, modification(ModificationType::BlockSchedule, &schedule.id, "2024-01-01", "2024-01-10"))
        .await
        .unwrap();

    let (disabled, _) = update(&app, &schedule, |s| s.enabled = false).await;
    let (_, result) = update(&app, &disabled, |s| s.enabled = true).await;
    assert!(result.regenerated);
    assert_eq!(result.slots_overlaid, 5);

    for slot in app.slots(&schedule.id).await {
        assert_eq!(slot.blocked, slot.date <= date("2024-01-10"), "slot {}", slot.date);
    }
}
