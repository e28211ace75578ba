//! Trailing-window activity heatmap.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::calendar::{Calendar, CalendarDay};
use crate::error::Result;
use crate::models::{Habit, Heatmap, HeatmapBucket, Task};
use crate::store::ProductivityStore;

pub const DEFAULT_WINDOW_DAYS: u32 = 365;

/// Bucket completed tasks and completed habit-log days from `start` onward.
///
/// Only completions create buckets, so the result never holds a zero entry.
pub fn bucketize(tasks: &[Task], habits: &[Habit], start: CalendarDay) -> Heatmap {
    let mut map = Heatmap::new();

    for task in tasks.iter().filter(|t| t.completed && t.day >= start) {
        let bucket = map
            .entry(task.day)
            .or_insert_with(|| HeatmapBucket::empty(task.day));
        bucket.task_count += 1;
        bucket.total += 1;
    }

    let logs = habits.iter().flat_map(|h| h.logs.iter());
    for log in logs.filter(|l| l.completed && l.day >= start) {
        let bucket = map
            .entry(log.day)
            .or_insert_with(|| HeatmapBucket::empty(log.day));
        bucket.habit_count += 1;
        bucket.total += 1;
    }

    map
}

/// Completed activity per day over the `window_days` days before today,
/// through today.
pub fn heatmap<S: ProductivityStore + ?Sized>(
    store: &S,
    calendar: &Calendar,
    owner_id: Uuid,
    now: DateTime<Utc>,
    window_days: u32,
) -> Result<Heatmap> {
    let today = calendar.today(now);
    let start = today.minus_days(window_days)?;

    let tasks = store.list_tasks_for_owner_in_range(owner_id, start, today.succ()?)?;
    // Habit history is scanned in full; the window filter applies per entry.
    let habits = store.list_habits_for_owner(owner_id)?;

    Ok(bucketize(&tasks, &habits, start))
}
