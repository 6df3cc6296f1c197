use activity_booking::{
    api::router::create_router,
    state::AppState,
    config::Config,
    domain::models::{
        reservation::Reservation,
        schedule::{NewScheduleParams, Schedule, WeekdaySet},
        slot::Slot,
    },
    infra::{clock::FixedClock, factory::sqlite_repositories},
};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::sync::Arc;
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    Router,
};
use chrono::{NaiveDate, NaiveTime};
use std::str::FromStr;
use tower::ServiceExt;
use serde_json::Value;

pub const AGENCY: &str = "agency-1";
pub const TEST_HORIZON_DAYS: i64 = 28;

#[allow(dead_code)]
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[allow(dead_code)]
pub fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

/// Monday 2024-01-01, 10:00-12:00, capacity 10.
#[allow(dead_code)]
pub fn schedule_params(activity_id: &str, weekdays: &[u8], capacity: i32) -> NewScheduleParams {
    NewScheduleParams {
        activity_id: activity_id.to_string(),
        agency_id: AGENCY.to_string(),
        start_date: date("2024-01-01"),
        weekdays: WeekdaySet::from_days(weekdays).unwrap(),
        full_day: false,
        start_time: Some(time("10:00")),
        end_time: Some(time("12:00")),
        capacity,
        enabled: true,
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub clock: Arc<FixedClock>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::with_horizon(TEST_HORIZON_DAYS).await
    }

    pub async fn with_horizon(horizon_days: i64) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            horizon_days,
            horizon_refresh_secs: 3600,
            db_max_connections: None,
        };

        let clock = Arc::new(FixedClock::at_date(date("2024-01-01")));
        let state = Arc::new(AppState::new(config, sqlite_repositories(pool.clone()), clock.clone()));
        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            clock,
        }
    }

    /// Stores the schedule and fires the "schedule created" hook, like the API does.
    pub async fn create_schedule(&self, params: NewScheduleParams) -> Schedule {
        let schedule = Schedule::new(params);
        let created = self.state.schedule_repo.create(&schedule).await.unwrap();
        self.state.schedule_events.on_schedule_created(&created).await.unwrap();
        created
    }

    pub async fn slots(&self, schedule_id: &str) -> Vec<Slot> {
        self.state.slot_repo.list_by_schedule(schedule_id, None).await.unwrap()
    }

    pub async fn slot_on(&self, schedule_id: &str, day: &str) -> Slot {
        self.slots(schedule_id)
            .await
            .into_iter()
            .find(|s| s.date == date(day))
            .unwrap_or_else(|| panic!("no slot on {}", day))
    }

    pub async fn hold(&self, slot_id: &str, quantity: i32) -> Reservation {
        let reservation = Reservation::new(slot_id.to_string(), AGENCY.to_string(), quantity);
        self.state.reservation_repo.hold(&reservation).await.unwrap()
    }

    /// Every live slot satisfies `0 <= available <= total`.
    pub async fn assert_capacity_invariant(&self) {
        let rows: Vec<(String, i32, i32)> = sqlx::query_as(
            "SELECT id, total_capacity, available_capacity FROM slots WHERE deleted_at IS NULL"
        )
            .fetch_all(&self.pool)
            .await
            .unwrap();

        for (id, total, available) in rows {
            assert!(
                0 <= available && available <= total,
                "slot {} breaks capacity invariant: total={} available={}",
                id, total, available
            );
        }
    }

    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}
