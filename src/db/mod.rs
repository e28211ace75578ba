mod schema;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use pulse_core::models::*;
use pulse_core::store::ProductivityStore;
use pulse_core::CalendarDay;

const TASK_COLUMNS: &str = "id, owner_id, title, description, category, start_time, end_time, day, completed, attachments, created_at";
const HABIT_COLUMNS: &str = "id, owner_id, name, emoji, current_streak, created_at";
const REVIEW_COLUMNS: &str = "id, owner_id, day, tasks_completed, tasks_total, habits_completed, habits_total, productivity_score, ai_comment, created_at";

/// SQLite storage for tasks, habits and daily reviews.
///
/// One connection shared behind a mutex, so statements never interleave.
/// Cloning is cheap and shares the connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "daily-pulse")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("daily-pulse.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Task operations
    // ============================================================

    /// Tasks on one day, ordered by start time.
    pub fn get_tasks_for_day(&self, owner_id: Uuid, day: CalendarDay) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ? AND day = ? ORDER BY start_time"
        ))?;

        let tasks = stmt
            .query_map((owner_id.to_string(), day.to_string()), task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    pub fn get_tasks_in_range(
        &self,
        owner_id: Uuid,
        start: CalendarDay,
        end_exclusive: CalendarDay,
    ) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE owner_id = ? AND day >= ? AND day < ? ORDER BY day, start_time"
        ))?;

        let tasks = stmt
            .query_map(
                (owner_id.to_string(), start.to_string(), end_exclusive.to_string()),
                task_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    pub fn get_task(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND owner_id = ?"),
                (id.to_string(), owner_id.to_string()),
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn create_task(&self, task: &Task) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            &format!(
                "INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            (
                task.id.to_string(),
                task.owner_id.to_string(),
                &task.title,
                &task.description,
                &task.category,
                &task.start_time,
                &task.end_time,
                task.day.to_string(),
                task.completed,
                serde_json::to_string(&task.attachments)?,
                task.created_at.to_rfc3339(),
            ),
        )?;
        Ok(())
    }

    /// Overwrite every mutable column of an existing task.
    pub fn update_task(&self, task: &Task) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE tasks SET title = ?, description = ?, category = ?, start_time = ?,
                 end_time = ?, day = ?, completed = ?, attachments = ?
             WHERE id = ? AND owner_id = ?",
            (
                &task.title,
                &task.description,
                &task.category,
                &task.start_time,
                &task.end_time,
                task.day.to_string(),
                task.completed,
                serde_json::to_string(&task.attachments)?,
                task.id.to_string(),
                task.owner_id.to_string(),
            ),
        )?;
        Ok(rows > 0)
    }

    pub fn toggle_task(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Task>> {
        let rows = {
            let conn = self.conn.lock().expect("database lock poisoned");
            conn.execute(
                "UPDATE tasks SET completed = 1 - completed WHERE id = ? AND owner_id = ?",
                (id.to_string(), owner_id.to_string()),
            )?
        };
        if rows == 0 {
            return Ok(None);
        }
        self.get_task(owner_id, id)
    }

    pub fn delete_task(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM tasks WHERE id = ? AND owner_id = ?",
            (id.to_string(), owner_id.to_string()),
        )?;
        Ok(rows > 0)
    }

    /// Tasks on `day` whose slot overlaps `[start_time, end_time)`.
    pub fn find_slot_conflicts(
        &self,
        owner_id: Uuid,
        day: CalendarDay,
        start_time: &str,
        end_time: &str,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE owner_id = ? AND day = ? AND start_time < ? AND end_time > ? AND id != ?
             ORDER BY start_time"
        ))?;

        let excluded = exclude.map(|id| id.to_string()).unwrap_or_default();
        let tasks = stmt
            .query_map(
                (owner_id.to_string(), day.to_string(), end_time, start_time, excluded),
                task_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    // ============================================================
    // Habit operations
    // ============================================================

    /// All of an owner's habits with their logs, oldest habit first.
    pub fn get_habits(&self, owner_id: Uuid) -> Result<Vec<Habit>> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let mut logs: HashMap<String, Vec<HabitLogEntry>> = HashMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT l.habit_id, l.day, l.completed FROM habit_logs l
                 JOIN habits h ON h.id = l.habit_id
                 WHERE h.owner_id = ? ORDER BY l.day",
            )?;
            let mut rows = stmt.query([owner_id.to_string()])?;
            while let Some(row) = rows.next()? {
                let habit_id: String = row.get(0)?;
                logs.entry(habit_id).or_default().push(HabitLogEntry {
                    day: parse_day(row, 1)?,
                    completed: row.get(2)?,
                });
            }
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {HABIT_COLUMNS} FROM habits WHERE owner_id = ? ORDER BY created_at, name"
        ))?;
        let habits = stmt
            .query_map([owner_id.to_string()], |row| {
                let id: String = row.get(0)?;
                let habit_logs = logs.remove(&id).unwrap_or_default();
                habit_from_row(row, habit_logs)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(habits)
    }

    pub fn get_habit(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Habit>> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let logs = {
            let mut stmt = conn
                .prepare("SELECT day, completed FROM habit_logs WHERE habit_id = ? ORDER BY day")?;
            let mut rows = stmt.query([id.to_string()])?;
            let mut logs = Vec::new();
            while let Some(row) = rows.next()? {
                logs.push(HabitLogEntry {
                    day: parse_day(row, 0)?,
                    completed: row.get(1)?,
                });
            }
            logs
        };

        let habit = conn
            .query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ? AND owner_id = ?"),
                (id.to_string(), owner_id.to_string()),
                |row| habit_from_row(row, logs),
            )
            .optional()?;
        Ok(habit)
    }

    pub fn create_habit(&self, habit: &Habit) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        tx.execute(
            &format!("INSERT INTO habits ({HABIT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"),
            (
                habit.id.to_string(),
                habit.owner_id.to_string(),
                &habit.name,
                &habit.emoji,
                habit.current_streak,
                habit.created_at.to_rfc3339(),
            ),
        )?;
        insert_logs(&tx, habit)?;
        tx.commit()?;
        Ok(())
    }

    /// Name and emoji only. Logs and streak go through [`Self::write_habit`].
    pub fn update_habit_details(&self, habit: &Habit) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE habits SET name = ?, emoji = ? WHERE id = ? AND owner_id = ?",
            (
                &habit.name,
                &habit.emoji,
                habit.id.to_string(),
                habit.owner_id.to_string(),
            ),
        )?;
        Ok(rows > 0)
    }

    /// Replace the habit's streak and log set in one transaction.
    ///
    /// Returns `false` when the habit is gone or belongs to someone else.
    pub fn write_habit(&self, habit: &Habit) -> Result<bool> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE habits SET current_streak = ? WHERE id = ? AND owner_id = ?",
            (
                habit.current_streak,
                habit.id.to_string(),
                habit.owner_id.to_string(),
            ),
        )?;
        if rows == 0 {
            return Ok(false);
        }

        tx.execute(
            "DELETE FROM habit_logs WHERE habit_id = ?",
            [habit.id.to_string()],
        )?;
        insert_logs(&tx, habit)?;
        tx.commit()?;
        Ok(true)
    }

    /// Deletes the habit; its logs go with it via `ON DELETE CASCADE`.
    pub fn delete_habit(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM habits WHERE id = ? AND owner_id = ?",
            (id.to_string(), owner_id.to_string()),
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Review operations
    // ============================================================

    /// Past reviews, most recent day first.
    pub fn get_reviews(&self, owner_id: Uuid, limit: Option<u32>) -> Result<Vec<DailyReview>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM daily_reviews WHERE owner_id = ? ORDER BY day DESC LIMIT ?"
        ))?;

        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(i64::from).unwrap_or(-1);
        let reviews = stmt
            .query_map((owner_id.to_string(), limit), review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reviews)
    }

    pub fn get_review(&self, owner_id: Uuid, day: CalendarDay) -> Result<Option<DailyReview>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let review = conn
            .query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM daily_reviews WHERE owner_id = ? AND day = ?"),
                (owner_id.to_string(), day.to_string()),
                review_from_row,
            )
            .optional()?;
        Ok(review)
    }

    /// Insert a review. `Ok(false)` means the `(owner_id, day)` slot was taken.
    pub fn insert_review(&self, review: &DailyReview) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let result = conn.execute(
            &format!(
                "INSERT INTO daily_reviews ({REVIEW_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            (
                review.id.to_string(),
                review.owner_id.to_string(),
                review.day.to_string(),
                review.tasks_completed,
                review.tasks_total,
                review.habits_completed,
                review.habits_total,
                review.productivity_score,
                &review.ai_comment,
                review.created_at.to_rfc3339(),
            ),
        );

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl ProductivityStore for Database {
    fn list_tasks_for_owner_in_range(
        &self,
        owner_id: Uuid,
        start: CalendarDay,
        end_exclusive: CalendarDay,
    ) -> pulse_core::Result<Vec<Task>> {
        Ok(self.get_tasks_in_range(owner_id, start, end_exclusive)?)
    }

    fn list_habits_for_owner(&self, owner_id: Uuid) -> pulse_core::Result<Vec<Habit>> {
        Ok(self.get_habits(owner_id)?)
    }

    fn find_habit(&self, owner_id: Uuid, habit_id: Uuid) -> pulse_core::Result<Option<Habit>> {
        Ok(self.get_habit(owner_id, habit_id)?)
    }

    fn find_review(
        &self,
        owner_id: Uuid,
        day: CalendarDay,
    ) -> pulse_core::Result<Option<DailyReview>> {
        Ok(self.get_review(owner_id, day)?)
    }

    fn save_habit(&self, habit: &Habit) -> pulse_core::Result<()> {
        if self.write_habit(habit)? {
            Ok(())
        } else {
            Err(pulse_core::Error::not_found("Habit"))
        }
    }

    fn create_review(&self, review: DailyReview) -> pulse_core::Result<DailyReview> {
        if self.insert_review(&review)? {
            tracing::info!(owner = %review.owner_id, day = %review.day, "Daily review created");
            Ok(review)
        } else {
            Err(pulse_core::Error::Conflict(format!(
                "review already exists for {}",
                review.day
            )))
        }
    }
}

fn insert_logs(tx: &rusqlite::Transaction<'_>, habit: &Habit) -> rusqlite::Result<()> {
    let mut stmt =
        tx.prepare("INSERT INTO habit_logs (habit_id, day, completed) VALUES (?, ?, ?)")?;
    for log in &habit.logs {
        stmt.execute((habit.id.to_string(), log.day.to_string(), log.completed))?;
    }
    Ok(())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: parse_uuid(row.get::<_, String>(0)?),
        owner_id: parse_uuid(row.get::<_, String>(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        start_time: row.get(5)?,
        end_time: row.get(6)?,
        day: parse_day(row, 7)?,
        completed: row.get(8)?,
        attachments: serde_json::from_str(&row.get::<_, String>(9)?).unwrap_or_default(),
        created_at: parse_datetime(row.get::<_, String>(10)?),
    })
}

fn habit_from_row(row: &Row<'_>, logs: Vec<HabitLogEntry>) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: parse_uuid(row.get::<_, String>(0)?),
        owner_id: parse_uuid(row.get::<_, String>(1)?),
        name: row.get(2)?,
        emoji: row.get(3)?,
        current_streak: row.get(4)?,
        logs,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<DailyReview> {
    Ok(DailyReview {
        id: parse_uuid(row.get::<_, String>(0)?),
        owner_id: parse_uuid(row.get::<_, String>(1)?),
        day: parse_day(row, 2)?,
        tasks_completed: row.get(3)?,
        tasks_total: row.get(4)?,
        habits_completed: row.get(5)?,
        habits_total: row.get(6)?,
        productivity_score: row.get(7)?,
        ai_comment: row.get(8)?,
        created_at: parse_datetime(row.get::<_, String>(9)?),
    })
}

/// Days are the engine's keys, so a malformed one is an error rather than a default.
fn parse_day(row: &Row<'_>, idx: usize) -> rusqlite::Result<CalendarDay> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: pulse_core::Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
