mod common;

use activity_booking::domain::models::{
    reservation::{Reservation, STATUS_CANCELLED, STATUS_CONFIRMED, STATUS_HOLD},
    slot::SlotScope,
};
use activity_booking::error::AppError;
use common::{date, schedule_params, TestApp, AGENCY};

#[tokio::test]
async fn test_hold_decrements_available_capacity() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1], 10)).await;
    let slot = app.slot_on(&schedule.id, "2024-01-08").await;

    let reservation = app.hold(&slot.id, 4).await;
    assert_eq!(reservation.status, STATUS_HOLD);
    assert_eq!(reservation.quantity, 4);

    let slot = app.slot_on(&schedule.id, "2024-01-08").await;
    assert_eq!((slot.total_capacity, slot.available_capacity), (10, 6));
    assert_eq!(slot.consumed(), 4);
}

#[tokio::test]
async fn test_hold_never_oversells() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1], 3)).await;
    let slot = app.slot_on(&schedule.id, "2024-01-08").await;

    app.hold(&slot.id, 2).await;
    let too_many = Reservation::new(slot.id.clone(), AGENCY.to_string(), 2);
    assert!(matches!(app.state.reservation_repo.hold(&too_many).await, Err(AppError::Conflict(_))));

    // The failed hold left neither capacity nor a reservation behind.
    assert_eq!(app.slot_on(&schedule.id, "2024-01-08").await.available_capacity, 1);
    assert!(app.state.reservation_repo.find_by_id(&too_many.id).await.unwrap().is_none());

    app.hold(&slot.id, 1).await;
    assert_eq!(app.slot_on(&schedule.id, "2024-01-08").await.available_capacity, 0);
}

#[tokio::test]
async fn test_hold_requires_matching_agency() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1], 10)).await;
    let slot = app.slot_on(&schedule.id, "2024-01-08").await;

    let foreign = Reservation::new(slot.id.clone(), "agency-2".to_string(), 1);
    assert!(matches!(app.state.reservation_repo.hold(&foreign).await, Err(AppError::Conflict(_))));
    assert_eq!(app.slot_on(&schedule.id, "2024-01-08").await.available_capacity, 10);
}

#[tokio::test]
async fn test_confirm_then_release() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1], 10)).await;
    let slot = app.slot_on(&schedule.id, "2024-01-08").await;
    let reservation = app.hold(&slot.id, 3).await;

    let confirmed = app.state.reservation_repo.confirm(&reservation.id).await.unwrap();
    assert_eq!(confirmed.status, STATUS_CONFIRMED);
    assert!(matches!(app.state.reservation_repo.confirm(&reservation.id).await, Err(AppError::Conflict(_))));

    let released = app.state.reservation_repo.release(&reservation.id).await.unwrap();
    assert_eq!(released.status, STATUS_CANCELLED);
    assert!(!released.is_live());
    assert_eq!(app.slot_on(&schedule.id, "2024-01-08").await.available_capacity, 10);

    assert!(matches!(app.state.reservation_repo.release(&reservation.id).await, Err(AppError::Conflict(_))));
    assert!(matches!(app.state.reservation_repo.confirm(&reservation.id).await, Err(AppError::Conflict(_))));
    assert!(matches!(app.state.reservation_repo.release("missing").await, Err(AppError::NotFound(_))));
    assert!(matches!(app.state.reservation_repo.confirm("missing").await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_release_is_capped_at_total_capacity() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1], 10)).await;
    let slot = app.slot_on(&schedule.id, "2024-01-08").await;
    let reservation = app.hold(&slot.id, 8).await;

    let mut smaller = schedule.clone();
    smaller.capacity = 5;
    let saved = app.state.schedule_repo.update(&smaller).await.unwrap();
    app.state.schedule_events.on_schedule_updated(&schedule, &saved).await.unwrap();
    assert_eq!(app.slot_on(&schedule.id, "2024-01-08").await.available_capacity, 0);

    app.state.reservation_repo.release(&reservation.id).await.unwrap();
    let slot = app.slot_on(&schedule.id, "2024-01-08").await;
    assert_eq!((slot.total_capacity, slot.available_capacity), (5, 5));
    app.assert_capacity_invariant().await;
}

#[tokio::test]
async fn test_count_live_reservations_in_scope() {
    let app = TestApp::new().await;
    let schedule = app.create_schedule(schedule_params("activity-1", &[1, 3, 5], 10)).await;

    let a = app.hold(&app.slot_on(&schedule.id, "2024-01-03").await.id, 1).await;
    let b = app.hold(&app.slot_on(&schedule.id, "2024-01-05").await.id, 2).await;
    app.hold(&app.slot_on(&schedule.id, "2024-01-15").await.id, 1).await;
    app.state.reservation_repo.confirm(&a.id).await.unwrap();
    app.state.reservation_repo.release(&b.id).await.unwrap();

    let repo = &app.state.reservation_repo;
    let scope = SlotScope::Schedule(schedule.id.clone());
    assert_eq!(repo.count_live_in_scope(&scope, date("2024-01-01"), date("2024-01-10")).await.unwrap(), 1);
    assert_eq!(repo.count_live_in_scope(&scope, date("2024-01-01"), date("2024-01-31")).await.unwrap(), 2);

    let activity = SlotScope::Activity("activity-1".to_string());
    assert_eq!(repo.count_live_in_scope(&activity, date("2024-01-15"), date("2024-01-15")).await.unwrap(), 1);

    let agency = SlotScope::Agency("agency-2".to_string());
    assert_eq!(repo.count_live_in_scope(&agency, date("2024-01-01"), date("2024-01-31")).await.unwrap(), 0);
}
