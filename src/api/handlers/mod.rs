use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::middleware::Owner;
use super::AppState;
use pulse_core::heatmap::{self, DEFAULT_WINDOW_DAYS};
use pulse_core::models::*;
use pulse_core::{review, streak, CalendarDay, Error};

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Map an engine error to a status. Only storage failures are hidden.
fn engine_error(e: Error) -> (StatusCode, String) {
    match e {
        Error::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        Error::Conflict(_) => {
            tracing::warn!("{}", e);
            (StatusCode::CONFLICT, e.to_string())
        }
        Error::InvalidState(msg) => {
            tracing::warn!("Validation error: {}", msg);
            (StatusCode::BAD_REQUEST, msg)
        }
        Error::Storage(e) => internal_error(e),
    }
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

/// Body returned when a task's time slot collides with existing tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConflictResponse {
    pub message: String,
    pub conflicting_tasks: Vec<TaskSlotConflict>,
}

fn slot_conflict(tasks: &[Task]) -> Response {
    tracing::warn!("Rejected task write: {} conflicting tasks", tasks.len());
    (
        StatusCode::CONFLICT,
        Json(SlotConflictResponse {
            message: "Time slot conflicts with existing task".to_string(),
            conflicting_tasks: tasks.iter().map(Into::into).collect(),
        }),
    )
        .into_response()
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Tasks
// ============================================================

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub date: Option<String>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    let date = query.date.ok_or((
        StatusCode::BAD_REQUEST,
        "Date parameter is required (YYYY-MM-DD)".to_string(),
    ))?;
    let day: CalendarDay = date.parse().map_err(engine_error)?;

    state
        .db
        .get_tasks_for_day(owner, day)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_task(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, (StatusCode, String)> {
    state
        .db
        .get_task(owner, id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Task"))
}

pub async fn create_task(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<Task>), Response> {
    let task = Task::new(owner, input, state.clock.now())
        .map_err(|e| engine_error(e).into_response())?;

    let conflicts = state
        .db
        .find_slot_conflicts(owner, task.day, &task.start_time, &task.end_time, None)
        .map_err(|e| internal_error(e).into_response())?;
    if !conflicts.is_empty() {
        return Err(slot_conflict(&conflicts));
    }

    state
        .db
        .create_task(&task)
        .map_err(|e| internal_error(e).into_response())?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTaskInput>,
) -> Result<Json<Task>, Response> {
    let mut task = state
        .db
        .get_task(owner, id)
        .map_err(|e| internal_error(e).into_response())?
        .ok_or_else(|| not_found("Task").into_response())?;

    let before = (task.day, task.start_time.clone(), task.end_time.clone());
    task.apply(input)
        .map_err(|e| engine_error(e).into_response())?;

    // Only a moved slot can create a new collision
    if before != (task.day, task.start_time.clone(), task.end_time.clone()) {
        let conflicts = state
            .db
            .find_slot_conflicts(owner, task.day, &task.start_time, &task.end_time, Some(id))
            .map_err(|e| internal_error(e).into_response())?;
        if !conflicts.is_empty() {
            return Err(slot_conflict(&conflicts));
        }
    }

    if !state
        .db
        .update_task(&task)
        .map_err(|e| internal_error(e).into_response())?
    {
        return Err(not_found("Task").into_response());
    }
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.db.delete_task(owner, id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Task"))
    }
}

pub async fn toggle_task(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, (StatusCode, String)> {
    state
        .db
        .toggle_task(owner, id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Task"))
}

// ============================================================
// Habits
// ============================================================

pub async fn list_habits(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<Vec<HabitWithStatus>>, (StatusCode, String)> {
    let today = state.calendar.today(state.clock.now());
    let habits = state.db.get_habits(owner).map_err(internal_error)?;

    Ok(Json(
        habits
            .into_iter()
            .map(|habit| HabitWithStatus {
                completed_today: habit.completed_on(today),
                habit,
            })
            .collect(),
    ))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(input): Json<CreateHabitInput>,
) -> Result<(StatusCode, Json<Habit>), (StatusCode, String)> {
    let habit = Habit::new(owner, input, state.clock.now()).map_err(engine_error)?;
    state.db.create_habit(&habit).map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(habit)))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateHabitInput>,
) -> Result<Json<Habit>, (StatusCode, String)> {
    let mut habit = state
        .db
        .get_habit(owner, id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Habit"))?;

    habit.apply(input).map_err(engine_error)?;

    if state
        .db
        .update_habit_details(&habit)
        .map_err(internal_error)?
    {
        Ok(Json(habit))
    } else {
        Err(not_found("Habit"))
    }
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.db.delete_habit(owner, id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Habit"))
    }
}

pub async fn toggle_habit(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> Result<Json<ToggleOutcome>, (StatusCode, String)> {
    streak::toggle_habit(&state.db, &state.calendar, owner, id, state.clock.now())
        .map(Json)
        .map_err(engine_error)
}

// ============================================================
// Reviews
// ============================================================

#[derive(Debug, Deserialize)]
pub struct ListReviewsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    /// Trailing window length in days
    pub days: Option<u32>,
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(query): Query<ListReviewsQuery>,
) -> Result<Json<Vec<DailyReview>>, (StatusCode, String)> {
    state
        .db
        .get_reviews(owner, query.limit)
        .map(Json)
        .map_err(internal_error)
}

/// 201 with the new review, or 200 with the one already recorded today.
pub async fn end_day(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<(StatusCode, Json<DailyReview>), (StatusCode, String)> {
    let outcome = review::end_day(&state.db, &state.calendar, owner, state.clock.now())
        .map_err(engine_error)?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.review)))
}

/// Day-ordered buckets for the trailing window.
pub async fn get_heatmap(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(query): Query<HeatmapQuery>,
) -> Result<Json<Vec<HeatmapBucket>>, (StatusCode, String)> {
    let window = query.days.unwrap_or(DEFAULT_WINDOW_DAYS);
    let map = heatmap::heatmap(&state.db, &state.calendar, owner, state.clock.now(), window)
        .map_err(engine_error)?;
    Ok(Json(map.into_values().collect()))
}
