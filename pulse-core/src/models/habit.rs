use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::CalendarDay;
use crate::error::{Error, Result};

pub const DEFAULT_HABIT_EMOJI: &str = "✅";
pub const MAX_HABIT_NAME_LEN: usize = 100;

/// One day's completion record for a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitLogEntry {
    pub day: CalendarDay,
    pub completed: bool,
}

/// A recurring habit and its completion history.
///
/// `logs` holds at most one entry per day, ordered by day. `current_streak`
/// is a cache of the streak computed from `logs` at the last toggle; it is
/// only ever written by [`crate::streak::toggle`] together with the log set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub emoji: String,
    pub current_streak: u32,
    pub logs: Vec<HabitLogEntry>,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    /// A fresh habit: no logs, streak 0.
    pub fn new(owner_id: Uuid, input: CreateHabitInput, now: DateTime<Utc>) -> Result<Self> {
        let name = validate_name(&input.name)?;
        let emoji = match input.emoji {
            Some(e) if !e.trim().is_empty() => e.trim().to_string(),
            _ => DEFAULT_HABIT_EMOJI.to_string(),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            emoji,
            current_streak: 0,
            logs: Vec::new(),
            created_at: now,
        })
    }

    pub fn log_for(&self, day: CalendarDay) -> Option<&HabitLogEntry> {
        self.logs.iter().find(|log| log.day == day)
    }

    pub fn completed_on(&self, day: CalendarDay) -> bool {
        self.log_for(day).is_some_and(|log| log.completed)
    }

    /// Apply a name/emoji edit. Logs and streak are untouched.
    pub fn apply(&mut self, input: UpdateHabitInput) -> Result<()> {
        if let Some(name) = input.name {
            self.name = validate_name(&name)?;
        }
        if let Some(emoji) = input.emoji {
            self.emoji = emoji;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid("Habit name is required"));
    }
    if name.chars().count() > MAX_HABIT_NAME_LEN {
        return Err(Error::invalid(format!(
            "Habit name cannot exceed {MAX_HABIT_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Input for creating a habit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHabitInput {
    pub name: String,
    /// Defaults to ✅ when absent or blank.
    #[serde(default)]
    pub emoji: Option<String>,
}

/// The only fields a habit edit may change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateHabitInput {
    pub name: Option<String>,
    pub emoji: Option<String>,
}

/// A habit together with whether it is completed today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitWithStatus {
    #[serde(flatten)]
    pub habit: Habit,
    pub completed_today: bool,
}

/// Result of toggling today's completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleOutcome {
    #[serde(flatten)]
    pub habit: Habit,
    pub completed_today: bool,
}
