//! The storage contract the engine runs against.
//!
//! The engine reads raw records and writes back exactly two things: a habit
//! (log set + streak, atomically) and a new daily review. [`MemoryStore`] is a
//! complete in-process implementation; the SQLite adapter lives in the server
//! crate.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::calendar::CalendarDay;
use crate::error::{Error, Result};
use crate::models::{DailyReview, Habit, Task};

pub trait ProductivityStore {
    /// Tasks of `owner` with `start <= day < end_exclusive`.
    fn list_tasks_for_owner_in_range(
        &self,
        owner_id: Uuid,
        start: CalendarDay,
        end_exclusive: CalendarDay,
    ) -> Result<Vec<Task>>;

    /// All habits of `owner`, logs included.
    fn list_habits_for_owner(&self, owner_id: Uuid) -> Result<Vec<Habit>>;

    /// A single habit, only if it belongs to `owner`.
    fn find_habit(&self, owner_id: Uuid, habit_id: Uuid) -> Result<Option<Habit>>;

    fn find_review(&self, owner_id: Uuid, day: CalendarDay) -> Result<Option<DailyReview>>;

    /// Persist the habit's log set and streak in one write.
    fn save_habit(&self, habit: &Habit) -> Result<()>;

    /// Insert a review. Fails with [`Error::Conflict`] if one already exists
    /// for the same owner and day.
    fn create_review(&self, review: DailyReview) -> Result<DailyReview>;
}

#[derive(Debug, Default)]
struct MemoryState {
    tasks: Vec<Task>,
    habits: Vec<Habit>,
    reviews: HashMap<(Uuid, CalendarDay), DailyReview>,
}

/// In-memory store. Every call takes one lock, so each operation is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_task(&self, task: Task) {
        self.lock().tasks.push(task);
    }

    pub fn insert_habit(&self, habit: Habit) {
        self.lock().habits.push(habit);
    }

    /// Number of stored reviews for `owner`, across all days.
    pub fn review_count(&self, owner_id: Uuid) -> usize {
        self.lock()
            .reviews
            .keys()
            .filter(|(owner, _)| *owner == owner_id)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory store lock poisoned")
    }
}

impl ProductivityStore for MemoryStore {
    fn list_tasks_for_owner_in_range(
        &self,
        owner_id: Uuid,
        start: CalendarDay,
        end_exclusive: CalendarDay,
    ) -> Result<Vec<Task>> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .filter(|t| t.owner_id == owner_id && t.day >= start && t.day < end_exclusive)
            .cloned()
            .collect())
    }

    fn list_habits_for_owner(&self, owner_id: Uuid) -> Result<Vec<Habit>> {
        Ok(self
            .lock()
            .habits
            .iter()
            .filter(|h| h.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn find_habit(&self, owner_id: Uuid, habit_id: Uuid) -> Result<Option<Habit>> {
        Ok(self
            .lock()
            .habits
            .iter()
            .find(|h| h.id == habit_id && h.owner_id == owner_id)
            .cloned())
    }

    fn find_review(&self, owner_id: Uuid, day: CalendarDay) -> Result<Option<DailyReview>> {
        Ok(self.lock().reviews.get(&(owner_id, day)).cloned())
    }

    fn save_habit(&self, habit: &Habit) -> Result<()> {
        let mut state = self.lock();
        let slot = state
            .habits
            .iter_mut()
            .find(|h| h.id == habit.id && h.owner_id == habit.owner_id)
            .ok_or_else(|| Error::not_found("Habit"))?;
        *slot = habit.clone();
        Ok(())
    }

    fn create_review(&self, review: DailyReview) -> Result<DailyReview> {
        let mut state = self.lock();
        let key = (review.owner_id, review.day);
        if state.reviews.contains_key(&key) {
            return Err(Error::Conflict(format!(
                "review already exists for {}",
                review.day
            )));
        }
        state.reviews.insert(key, review.clone());
        Ok(review)
    }
}
