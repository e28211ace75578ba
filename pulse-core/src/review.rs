//! End-of-day review aggregation and scoring.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::calendar::{Calendar, CalendarDay};
use crate::error::{Error, Result};
use crate::models::{DailyReview, EndDayOutcome, Habit, Task};
use crate::narrative;
use crate::store::ProductivityStore;

pub const TASK_WEIGHT: f64 = 60.0;
pub const HABIT_WEIGHT: f64 = 40.0;

/// Raw completion counts for one owner and one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewCounts {
    pub tasks_completed: u32,
    pub tasks_total: u32,
    pub habits_completed: u32,
    pub habits_total: u32,
}

impl ReviewCounts {
    /// Count the day's tasks and the habits completed on `day`.
    ///
    /// `tasks` must already be restricted to `day`; `habits` is every habit of
    /// the owner, active today or not.
    pub fn collect(tasks: &[Task], habits: &[Habit], day: CalendarDay) -> Result<Self> {
        Ok(Self {
            tasks_completed: to_count(tasks.iter().filter(|t| t.completed).count(), "tasks")?,
            tasks_total: to_count(tasks.len(), "tasks")?,
            habits_completed: to_count(
                habits.iter().filter(|h| h.completed_on(day)).count(),
                "habits",
            )?,
            habits_total: to_count(habits.len(), "habits")?,
        })
    }

    pub fn task_score(&self) -> f64 {
        weighted(self.tasks_completed, self.tasks_total, TASK_WEIGHT)
    }

    pub fn habit_score(&self) -> f64 {
        weighted(self.habits_completed, self.habits_total, HABIT_WEIGHT)
    }

    /// `round(task_score + habit_score)`, in `0..=100` by construction.
    pub fn productivity_score(&self) -> u8 {
        (self.task_score() + self.habit_score()).round().clamp(0.0, 100.0) as u8
    }

    pub fn comment(&self) -> String {
        narrative::comment(
            self.productivity_score(),
            self.tasks_completed,
            self.tasks_total,
            self.habits_completed,
            self.habits_total,
        )
    }
}

fn to_count(n: usize, what: &str) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::invalid(format!("Too many {what} to review: {n}")))
}

fn weighted(completed: u32, total: u32, weight: f64) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(total) * weight
    }
}

/// Produce the review for `owner` for the day containing `now`.
///
/// Idempotent: an existing review for the day is returned untouched. If a
/// concurrent caller inserts first, the storage conflict is resolved by
/// reading back the winner's review.
pub fn end_day<S: ProductivityStore + ?Sized>(
    store: &S,
    calendar: &Calendar,
    owner_id: Uuid,
    now: DateTime<Utc>,
) -> Result<EndDayOutcome> {
    let today = calendar.today(now);
    let tomorrow = today.succ()?;

    if let Some(review) = store.find_review(owner_id, today)? {
        return Ok(EndDayOutcome {
            review,
            created: false,
        });
    }

    let tasks = store.list_tasks_for_owner_in_range(owner_id, today, tomorrow)?;
    let habits = store.list_habits_for_owner(owner_id)?;
    let counts = ReviewCounts::collect(&tasks, &habits, today)?;

    let review = DailyReview {
        id: Uuid::new_v4(),
        owner_id,
        day: today,
        tasks_completed: counts.tasks_completed,
        tasks_total: counts.tasks_total,
        habits_completed: counts.habits_completed,
        habits_total: counts.habits_total,
        productivity_score: counts.productivity_score(),
        ai_comment: counts.comment(),
        created_at: now,
    };

    match store.create_review(review) {
        Ok(review) => Ok(EndDayOutcome {
            review,
            created: true,
        }),
        Err(Error::Conflict(msg)) => match store.find_review(owner_id, today)? {
            Some(review) => Ok(EndDayOutcome {
                review,
                created: false,
            }),
            None => Err(Error::Conflict(msg)),
        },
        Err(e) => Err(e),
    }
}
