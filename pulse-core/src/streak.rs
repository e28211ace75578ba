//! Habit streak tracking.
//!
//! A habit's log has at most one entry per calendar day. Toggling flips
//! today's entry (creating it as completed if missing) and recomputes the
//! cached streak from the log in the same step.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::calendar::{Calendar, CalendarDay};
use crate::error::{Error, Result};
use crate::models::{Habit, HabitLogEntry, ToggleOutcome};
use crate::store::ProductivityStore;

/// Toggle today's completion on `habit` and return the new state of today.
///
/// - Completing today: the streak continues the completed chain ending
///   yesterday, or restarts at 1 when yesterday is missing or incomplete.
/// - Un-completing today: the streak drops to 0, whatever came before.
pub fn toggle(habit: &mut Habit, today: CalendarDay) -> Result<bool> {
    // Fails at the calendar's lower bound, before anything is mutated.
    today.pred()?;

    let completed = match habit.logs.binary_search_by_key(&today, |log| log.day) {
        Ok(idx) => {
            let log = &mut habit.logs[idx];
            log.completed = !log.completed;
            log.completed
        }
        Err(idx) => {
            habit.logs.insert(
                idx,
                HabitLogEntry {
                    day: today,
                    completed: true,
                },
            );
            true
        }
    };

    habit.current_streak = if completed {
        trailing_streak(&habit.logs, today)
    } else {
        0
    };

    Ok(completed)
}

/// Consecutive completed days ending at `today`, inclusive.
///
/// `logs` must be sorted by day with one entry per day.
pub fn trailing_streak(logs: &[HabitLogEntry], today: CalendarDay) -> u32 {
    let mut expected = today;
    let mut streak = 0;

    for log in logs.iter().rev().skip_while(|log| log.day > today) {
        if log.day != expected || !log.completed {
            break;
        }
        streak += 1;
        match expected.pred() {
            Ok(prev) => expected = prev,
            Err(_) => break,
        }
    }

    streak
}

/// Load the caller's habit, toggle today, persist, and report the result.
pub fn toggle_habit<S: ProductivityStore + ?Sized>(
    store: &S,
    calendar: &Calendar,
    owner_id: Uuid,
    habit_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ToggleOutcome> {
    let mut habit = store
        .find_habit(owner_id, habit_id)?
        .ok_or_else(|| Error::not_found("Habit"))?;

    let completed_today = toggle(&mut habit, calendar.today(now))?;
    store.save_habit(&habit)?;

    Ok(ToggleOutcome {
        habit,
        completed_today,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateHabitInput;

    fn day(offset: i64) -> CalendarDay {
        let base = CalendarDay::from_ymd(2024, 6, 15).unwrap();
        if offset >= 0 {
            base.plus_days(offset as u32).unwrap()
        } else {
            base.minus_days((-offset) as u32).unwrap()
        }
    }

    fn habit_with(logs: &[(i64, bool)], streak: u32) -> Habit {
        let mut habit = Habit::new(
            Uuid::new_v4(),
            CreateHabitInput {
                name: "Read".to_string(),
                emoji: None,
            },
            Utc::now(),
        )
        .unwrap();
        habit.logs = logs
            .iter()
            .map(|&(offset, completed)| HabitLogEntry {
                day: day(offset),
                completed,
            })
            .collect();
        habit.current_streak = streak;
        habit
    }

    #[test]
    fn first_completion_starts_streak_at_one() {
        let mut habit = habit_with(&[], 0);
        assert!(toggle(&mut habit, day(0)).unwrap());
        assert_eq!(habit.current_streak, 1);
        assert_eq!(habit.logs.len(), 1);
    }

    #[test]
    fn second_toggle_uncompletes_and_zeroes() {
        let mut habit = habit_with(&[], 0);
        toggle(&mut habit, day(0)).unwrap();
        assert!(!toggle(&mut habit, day(0)).unwrap());
        assert_eq!(habit.current_streak, 0);
        assert_eq!(habit.logs.len(), 1);
        assert!(!habit.logs[0].completed);
    }

    #[test]
    fn continues_chain_from_yesterday() {
        let mut habit = habit_with(&[(-2, true), (-1, true)], 2);
        assert!(toggle(&mut habit, day(0)).unwrap());
        assert_eq!(habit.current_streak, 3);
    }

    #[test]
    fn incomplete_yesterday_restarts_streak() {
        let mut habit = habit_with(&[(-3, true), (-2, true), (-1, false)], 0);
        toggle(&mut habit, day(0)).unwrap();
        assert_eq!(habit.current_streak, 1);
    }

    #[test]
    fn gap_yesterday_restarts_streak() {
        let mut habit = habit_with(&[(-3, true), (-2, true)], 2);
        toggle(&mut habit, day(0)).unwrap();
        assert_eq!(habit.current_streak, 1);
    }

    #[test]
    fn uncompleting_ignores_prior_days() {
        let mut habit = habit_with(&[(-2, true), (-1, true), (0, true)], 3);
        toggle(&mut habit, day(0)).unwrap();
        assert_eq!(habit.current_streak, 0);
    }

    #[test]
    fn logs_stay_sorted_and_unique() {
        let mut habit = habit_with(&[(-5, true), (3, false)], 0);
        toggle(&mut habit, day(0)).unwrap();
        toggle(&mut habit, day(0)).unwrap();
        toggle(&mut habit, day(0)).unwrap();
        let days: Vec<_> = habit.logs.iter().map(|l| l.day).collect();
        assert_eq!(days, vec![day(-5), day(0), day(3)]);
    }

    #[test]
    fn trailing_streak_ignores_future_entries() {
        let logs = [
            HabitLogEntry { day: day(-1), completed: true },
            HabitLogEntry { day: day(0), completed: true },
            HabitLogEntry { day: day(1), completed: true },
        ];
        assert_eq!(trailing_streak(&logs, day(0)), 2);
    }
}
