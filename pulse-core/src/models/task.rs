use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::CalendarDay;
use crate::error::{Error, Result};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_CATEGORY_LEN: usize = 50;

/// A time-blocked task on a single day.
///
/// The engine only looks at `owner_id`, `day` and `completed`; the rest is
/// carried for the CRUD surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    /// Free-form, user supplied.
    pub category: String,
    /// `HH:MM`, zero padded.
    pub start_time: String,
    /// `HH:MM`, zero padded.
    pub end_time: String,
    pub day: CalendarDay,
    pub completed: bool,
    /// URLs of attached files.
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(owner_id: Uuid, input: CreateTaskInput, now: DateTime<Utc>) -> Result<Self> {
        let start_time = parse_clock_time(&input.start_time)?;
        let end_time = parse_clock_time(&input.end_time)?;
        ensure_ordered(&start_time, &end_time)?;
        let description = input.description.unwrap_or_default();

        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            title: bounded("Title", &input.title, MAX_TITLE_LEN, true)?,
            description: bounded("Description", &description, MAX_DESCRIPTION_LEN, false)?,
            category: bounded("Category", &input.category, MAX_CATEGORY_LEN, true)?,
            start_time,
            end_time,
            day: input.day,
            completed: false,
            attachments: input.attachments.unwrap_or_default(),
            created_at: now,
        })
    }

    /// Apply a typed partial update after validating every provided field.
    pub fn apply(&mut self, input: UpdateTaskInput) -> Result<()> {
        let mut next = self.clone();
        if let Some(title) = input.title {
            next.title = bounded("Title", &title, MAX_TITLE_LEN, true)?;
        }
        if let Some(description) = input.description {
            next.description = bounded("Description", &description, MAX_DESCRIPTION_LEN, false)?;
        }
        if let Some(category) = input.category {
            next.category = bounded("Category", &category, MAX_CATEGORY_LEN, true)?;
        }
        if let Some(start) = input.start_time {
            next.start_time = parse_clock_time(&start)?;
        }
        if let Some(end) = input.end_time {
            next.end_time = parse_clock_time(&end)?;
        }
        ensure_ordered(&next.start_time, &next.end_time)?;
        if let Some(day) = input.day {
            next.day = day;
        }
        if let Some(completed) = input.completed {
            next.completed = completed;
        }
        if let Some(attachments) = input.attachments {
            next.attachments = attachments;
        }
        *self = next;
        Ok(())
    }

    /// Whether this task's `[start, end)` slot overlaps the given one.
    ///
    /// Times are zero-padded `HH:MM`, so string order is clock order.
    pub fn overlaps(&self, start_time: &str, end_time: &str) -> bool {
        self.start_time.as_str() < end_time && self.end_time.as_str() > start_time
    }
}

fn ensure_ordered(start_time: &str, end_time: &str) -> Result<()> {
    if start_time >= end_time {
        return Err(Error::invalid("End time must be after start time"));
    }
    Ok(())
}

/// Parse `H:MM` or `HH:MM` (00:00–23:59) into its zero-padded form.
pub fn parse_clock_time(s: &str) -> Result<String> {
    let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    let valid = matches!(
        s.split_once(':'),
        Some((h, m)) if (1..=2).contains(&h.len()) && m.len() == 2 && digits(h) && digits(m)
    );
    NaiveTime::parse_from_str(s, "%H:%M")
        .ok()
        .filter(|_| valid)
        .map(|t| t.format("%H:%M").to_string())
        .ok_or_else(|| Error::invalid(format!("Invalid time format '{s}'. Use HH:MM")))
}

fn bounded(field: &str, value: &str, max: usize, required: bool) -> Result<String> {
    let value = value.trim();
    if required && value.is_empty() {
        return Err(Error::invalid(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(Error::invalid(format!("{field} cannot exceed {max} characters")));
    }
    Ok(value.to_string())
}

/// Input for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(alias = "date")]
    pub day: CalendarDay,
    #[serde(default)]
    pub attachments: Option<Vec<String>>,
}

/// Fields a task edit may change. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(alias = "date")]
    pub day: Option<CalendarDay>,
    pub completed: Option<bool>,
    pub attachments: Option<Vec<String>>,
}

/// Minimal view of a task whose slot collides with a requested one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSlotConflict {
    pub id: Uuid,
    pub title: String,
    pub start_time: String,
    pub end_time: String,
}

impl From<&Task> for TaskSlotConflict {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            start_time: task.start_time.clone(),
            end_time: task.end_time.clone(),
        }
    }
}
