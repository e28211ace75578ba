use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use chrono::{TimeZone, Utc};
use daily_pulse::api::middleware::{SecurityConfig, OWNER_HEADER};
use daily_pulse::api::{create_router, create_router_with_security, AppState};
use daily_pulse::db::Database;
use daily_pulse::models::*;
use daily_pulse::{Calendar, FixedClock};
use serde_json::json;
use uuid::Uuid;

const TODAY: &str = "2024-06-15";

fn state_for(db: Database) -> AppState {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    AppState::new(db, Arc::new(FixedClock(now)), Calendar::utc())
}

fn state() -> AppState {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    state_for(db)
}

fn setup_with(db: Database) -> TestServer {
    TestServer::new(create_router(state_for(db))).expect("Failed to create test server")
}

fn setup() -> TestServer {
    TestServer::new(create_router(state())).expect("Failed to create test server")
}

fn as_owner(request: TestRequest, owner: Uuid) -> TestRequest {
    request.add_header(
        HeaderName::from_static(OWNER_HEADER),
        HeaderValue::from_str(&owner.to_string()).unwrap(),
    )
}

async fn create_habit(server: &TestServer, owner: Uuid, name: &str) -> Habit {
    as_owner(server.post("/api/v1/habits"), owner)
        .json(&json!({ "name": name }))
        .await
        .json::<Habit>()
}

async fn create_task(server: &TestServer, owner: Uuid, start: &str, end: &str) -> Task {
    as_owner(server.post("/api/v1/tasks"), owner)
        .json(&json!({
            "title": format!("Block {start}"),
            "category": "work",
            "start_time": start,
            "end_time": end,
            "date": TODAY,
        }))
        .await
        .json::<Task>()
}

mod owner_header {
    use super::*;

    #[tokio::test]
    async fn missing_owner_is_unauthorized() {
        let server = setup();
        server
            .get("/api/v1/habits")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_owner_is_unauthorized() {
        let server = setup();
        server
            .get("/api/v1/habits")
            .add_header(
                HeaderName::from_static(OWNER_HEADER),
                HeaderValue::from_static("bob"),
            )
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_needs_no_owner() {
        let server = setup();
        let response = server.get("/api/v1/health").await;
        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok" }));
    }
}

mod habits {
    use super::*;

    #[tokio::test]
    async fn creates_with_default_emoji() {
        let server = setup();
        let owner = Uuid::new_v4();

        let response = as_owner(server.post("/api/v1/habits"), owner)
            .json(&json!({ "name": "Stretch" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let habit: Habit = response.json();
        assert_eq!(habit.emoji, "✅");
        assert_eq!(habit.current_streak, 0);
        assert_eq!(habit.owner_id, owner);
    }

    #[tokio::test]
    async fn rejects_blank_name() {
        let server = setup();
        as_owner(server.post("/api/v1/habits"), Uuid::new_v4())
            .json(&json!({ "name": "   " }))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn toggle_flips_completion_and_streak() {
        let server = setup();
        let owner = Uuid::new_v4();
        let habit = create_habit(&server, owner, "Read").await;
        let path = format!("/api/v1/habits/{}/toggle", habit.id);

        let response = as_owner(server.post(&path), owner).await;
        response.assert_status_ok();
        let on: ToggleOutcome = response.json();
        assert!(on.completed_today);
        assert_eq!(on.habit.current_streak, 1);

        let off: ToggleOutcome = as_owner(server.patch(&path), owner).await.json();
        assert!(!off.completed_today);
        assert_eq!(off.habit.current_streak, 0);
        assert_eq!(off.habit.logs.len(), 1);
    }

    #[tokio::test]
    async fn list_reports_completed_today() {
        let server = setup();
        let owner = Uuid::new_v4();
        let done = create_habit(&server, owner, "Done").await;
        create_habit(&server, owner, "Pending").await;
        as_owner(server.post(&format!("/api/v1/habits/{}/toggle", done.id)), owner).await;

        let habits: Vec<HabitWithStatus> = as_owner(server.get("/api/v1/habits"), owner).await.json();
        assert_eq!(habits.len(), 2);
        for entry in habits {
            assert_eq!(entry.completed_today, entry.habit.id == done.id);
        }
    }

    #[tokio::test]
    async fn other_owners_habits_are_not_found() {
        let server = setup();
        let habit = create_habit(&server, Uuid::new_v4(), "Mine").await;
        let intruder = Uuid::new_v4();

        as_owner(server.post(&format!("/api/v1/habits/{}/toggle", habit.id)), intruder)
            .await
            .assert_status_not_found();
        as_owner(server.delete(&format!("/api/v1/habits/{}", habit.id)), intruder)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn update_and_delete() {
        let server = setup();
        let owner = Uuid::new_v4();
        let habit = create_habit(&server, owner, "Walk").await;
        let path = format!("/api/v1/habits/{}", habit.id);

        let updated: Habit = as_owner(server.put(&path), owner)
            .json(&json!({ "emoji": "🚶" }))
            .await
            .json();
        assert_eq!(updated.name, "Walk");
        assert_eq!(updated.emoji, "🚶");

        as_owner(server.delete(&path), owner)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        as_owner(server.put(&path), owner)
            .json(&json!({ "name": "Gone" }))
            .await
            .assert_status_not_found();
    }
}

mod tasks {
    use super::*;

    #[tokio::test]
    async fn list_requires_date() {
        let server = setup();
        as_owner(server.get("/api/v1/tasks"), Uuid::new_v4())
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn lists_tasks_for_the_requested_day() {
        let server = setup();
        let owner = Uuid::new_v4();
        create_task(&server, owner, "13:00", "14:00").await;
        create_task(&server, owner, "9:00", "10:00").await;

        let tasks: Vec<Task> = as_owner(server.get("/api/v1/tasks"), owner)
            .add_query_param("date", TODAY)
            .await
            .json();
        let starts: Vec<_> = tasks.iter().map(|t| t.start_time.as_str()).collect();
        assert_eq!(starts, vec!["09:00", "13:00"]);

        let other_day: Vec<Task> = as_owner(server.get("/api/v1/tasks"), owner)
            .add_query_param("date", "2024-06-16")
            .await
            .json();
        assert!(other_day.is_empty());
    }

    #[tokio::test]
    async fn overlapping_slot_is_a_conflict() {
        let server = setup();
        let owner = Uuid::new_v4();
        let existing = create_task(&server, owner, "09:00", "10:00").await;

        let response = as_owner(server.post("/api/v1/tasks"), owner)
            .json(&json!({
                "title": "Clash",
                "category": "work",
                "start_time": "09:30",
                "end_time": "10:30",
                "date": TODAY,
            }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        let body: serde_json::Value = response.json();
        assert_eq!(body["conflicting_tasks"][0]["id"], json!(existing.id));
    }

    #[tokio::test]
    async fn back_to_back_slots_are_allowed() {
        let server = setup();
        let owner = Uuid::new_v4();
        create_task(&server, owner, "09:00", "10:00").await;

        as_owner(server.post("/api/v1/tasks"), owner)
            .json(&json!({
                "title": "Next",
                "category": "work",
                "start_time": "10:00",
                "end_time": "11:00",
                "date": TODAY,
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn rejects_end_before_start() {
        let server = setup();
        as_owner(server.post("/api/v1/tasks"), Uuid::new_v4())
            .json(&json!({
                "title": "Backwards",
                "category": "work",
                "start_time": "11:00",
                "end_time": "10:00",
                "date": TODAY,
            }))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn toggle_update_and_delete() {
        let server = setup();
        let owner = Uuid::new_v4();
        let task = create_task(&server, owner, "08:00", "09:00").await;

        let toggled: Task = as_owner(server.patch(&format!("/api/v1/tasks/{}/toggle", task.id)), owner)
            .await
            .json();
        assert!(toggled.completed);

        let path = format!("/api/v1/tasks/{}", task.id);
        let updated: Task = as_owner(server.put(&path), owner)
            .json(&json!({ "title": "Renamed" }))
            .await
            .json();
        assert_eq!(updated.title, "Renamed");
        assert!(updated.completed);

        as_owner(server.delete(&path), owner)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        as_owner(server.get(&path), owner)
            .await
            .assert_status_not_found();
    }
}

mod reviews {
    use super::*;

    #[tokio::test]
    async fn end_day_creates_once_then_returns_existing() {
        let server = setup();
        let owner = Uuid::new_v4();

        let first = as_owner(server.post("/api/v1/reviews/end-day"), owner).await;
        first.assert_status(StatusCode::CREATED);
        let created: DailyReview = first.json();
        assert_eq!(created.day.to_string(), TODAY);

        let second = as_owner(server.post("/api/v1/reviews/end-day"), owner).await;
        second.assert_status_ok();
        let existing: DailyReview = second.json();
        assert_eq!(existing.id, created.id);
    }

    #[tokio::test]
    async fn empty_day_scores_zero() {
        let server = setup();
        let review: DailyReview = as_owner(server.post("/api/v1/reviews/end-day"), Uuid::new_v4())
            .await
            .json();

        assert_eq!(review.tasks_total, 0);
        assert_eq!(review.habits_total, 0);
        assert_eq!(review.productivity_score, 0);
        assert!(!review.ai_comment.is_empty());
    }

    #[tokio::test]
    async fn scores_completed_work() {
        let server = setup();
        let owner = Uuid::new_v4();
        let task = create_task(&server, owner, "08:00", "09:00").await;
        create_task(&server, owner, "10:00", "11:00").await;
        as_owner(server.patch(&format!("/api/v1/tasks/{}/toggle", task.id)), owner).await;
        let habit = create_habit(&server, owner, "Read").await;
        as_owner(server.post(&format!("/api/v1/habits/{}/toggle", habit.id)), owner).await;

        let review: DailyReview = as_owner(server.post("/api/v1/reviews/end-day"), owner)
            .await
            .json();
        assert_eq!((review.tasks_completed, review.tasks_total), (1, 2));
        assert_eq!((review.habits_completed, review.habits_total), (1, 1));
        assert_eq!(review.productivity_score, 70);
    }

    #[tokio::test]
    async fn history_is_per_owner() {
        let server = setup();
        let owner = Uuid::new_v4();
        as_owner(server.post("/api/v1/reviews/end-day"), owner).await;

        let mine: Vec<DailyReview> = as_owner(server.get("/api/v1/reviews"), owner).await.json();
        assert_eq!(mine.len(), 1);

        let theirs: Vec<DailyReview> = as_owner(server.get("/api/v1/reviews"), Uuid::new_v4())
            .await
            .json();
        assert!(theirs.is_empty());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_honours_limit() {
        let db = Database::open_memory().expect("Failed to create database");
        db.migrate().expect("Failed to migrate");
        let owner = Uuid::new_v4();

        for day in [13, 14, 15] {
            let now = Utc.with_ymd_and_hms(2024, 6, day, 20, 0, 0).unwrap();
            let state = AppState::new(db.clone(), Arc::new(FixedClock(now)), Calendar::utc());
            let server = TestServer::new(create_router(state)).unwrap();
            as_owner(server.post("/api/v1/reviews/end-day"), owner)
                .await
                .assert_status(StatusCode::CREATED);
        }

        let server = setup_with(db);
        let latest: Vec<DailyReview> = as_owner(server.get("/api/v1/reviews"), owner)
            .add_query_param("limit", 2)
            .await
            .json();
        let days: Vec<_> = latest.iter().map(|r| r.day.to_string()).collect();
        assert_eq!(days, vec!["2024-06-15", "2024-06-14"]);
    }

    #[tokio::test]
    async fn heatmap_window_excludes_older_days() {
        let db = Database::open_memory().expect("Failed to create database");
        db.migrate().expect("Failed to migrate");
        let owner = Uuid::new_v4();
        let server = setup_with(db);

        let old = as_owner(server.post("/api/v1/tasks"), owner)
            .json(&json!({
                "title": "Last week",
                "category": "work",
                "start_time": "08:00",
                "end_time": "09:00",
                "date": "2024-06-05",
            }))
            .await
            .json::<Task>();
        as_owner(server.patch(&format!("/api/v1/tasks/{}/toggle", old.id)), owner).await;

        let wide: Vec<HeatmapBucket> = as_owner(server.get("/api/v1/reviews/heatmap"), owner)
            .add_query_param("days", 30)
            .await
            .json();
        assert_eq!(wide.len(), 1);

        let narrow: Vec<HeatmapBucket> = as_owner(server.get("/api/v1/reviews/heatmap"), owner)
            .add_query_param("days", 7)
            .await
            .json();
        assert!(narrow.is_empty());
    }

    #[tokio::test]
    async fn heatmap_counts_completed_items() {
        let server = setup();
        let owner = Uuid::new_v4();
        let task = create_task(&server, owner, "08:00", "09:00").await;
        create_task(&server, owner, "09:00", "10:00").await;
        as_owner(server.patch(&format!("/api/v1/tasks/{}/toggle", task.id)), owner).await;
        let habit = create_habit(&server, owner, "Read").await;
        as_owner(server.post(&format!("/api/v1/habits/{}/toggle", habit.id)), owner).await;

        let buckets: Vec<HeatmapBucket> = as_owner(server.get("/api/v1/reviews/heatmap"), owner)
            .add_query_param("days", 30)
            .await
            .json();

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].day.to_string(), TODAY);
        assert_eq!(buckets[0].task_count, 1);
        assert_eq!(buckets[0].habit_count, 1);
        assert_eq!(buckets[0].total, 2);
    }
}

mod api_key {
    use super::*;

    fn secured() -> TestServer {
        let app = create_router_with_security(state(), SecurityConfig::with_api_key("secret"));
        TestServer::new(app).expect("Failed to create test server")
    }

    #[tokio::test]
    async fn rejects_missing_key() {
        let server = secured();
        as_owner(server.get("/api/v1/habits"), Uuid::new_v4())
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_wrong_key() {
        let server = secured();
        as_owner(server.get("/api/v1/habits"), Uuid::new_v4())
            .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer nope"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn accepts_correct_key() {
        let server = secured();
        as_owner(server.get("/api/v1/habits"), Uuid::new_v4())
            .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn health_stays_open() {
        let server = secured();
        server.get("/api/v1/health").await.assert_status_ok();
    }
}
