//! Rule-based end-of-day narrative.
//!
//! Five score bands, checked from the top; the first match picks the
//! template. Optional clauses depend on the task and habit completion
//! percentages. Output is a pure function of the inputs.
//!
//! Clauses are always joined by a single space, so a skipped optional
//! clause leaves two spaces between its neighbours. Stored reviews rely on
//! this exact text.

/// Completion percentage in `0.0..=100.0`; zero when nothing was planned.
pub fn percentage(completed: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(total) * 100.0
    }
}

pub fn comment(
    score: u8,
    tasks_completed: u32,
    tasks_total: u32,
    habits_completed: u32,
    habits_total: u32,
) -> String {
    let task_pct = percentage(tasks_completed, tasks_total);
    let habit_pct = percentage(habits_completed, habits_total);

    let mut parts: Vec<String> = Vec::with_capacity(5);

    if score >= 85 {
        parts.push(format!(
            "🎉 Exceptional work today! You crushed {tasks_completed} out of {tasks_total} tasks ({}%) \
             and maintained {habits_completed} out of {habits_total} habits.",
            task_pct.round() as u32
        ));
        parts.push(
            "You're building incredible momentum - keep this energy flowing into tomorrow!".into(),
        );
        parts.push(format!(
            "Your productivity score of {score}/100 shows outstanding dedication."
        ));
    } else if score >= 70 {
        parts.push(format!(
            "✨ Excellent day! You completed {tasks_completed} out of {tasks_total} tasks \
             and checked off {habits_completed} habits."
        ));
        parts.push(format!("Your {score}/100 score reflects solid progress."));
        parts.push(if habit_pct < 80.0 {
            "Consider focusing a bit more on your daily habits tomorrow to maintain consistency."
                .into()
        } else {
            "Great balance between tasks and habits!".into()
        });
    } else if score >= 55 {
        parts.push(format!(
            "💪 Good effort! You finished {tasks_completed} tasks and {habits_completed} habits \
             today (score: {score}/100)."
        ));
        parts.push(if task_pct < 60.0 {
            "Tomorrow, try breaking down larger tasks into smaller, manageable chunks.".into()
        } else {
            String::new()
        });
        parts.push(if habit_pct < 60.0 {
            "Your habits need a little more attention - small consistent actions build big results!"
                .into()
        } else {
            "Nice work on maintaining your habits!".into()
        });
    } else if score >= 40 {
        parts.push(format!(
            "🌱 It's okay to have challenging days. You completed {tasks_completed} tasks \
             and {habits_completed} habits ({score}/100)."
        ));
        parts.push("Tomorrow is a fresh start with new opportunities.".into());
        parts.push(if tasks_total > 5 {
            "Consider planning fewer, high-priority tasks to avoid overwhelm.".into()
        } else {
            String::new()
        });
        parts.push("Remember: progress over perfection!".into());
    } else {
        parts.push(format!(
            "🌤️ Every journey has tough days - you completed {tasks_completed} tasks \
             and {habits_completed} habits today."
        ));
        parts.push(format!("Don't let a {score}/100 score discourage you."));
        parts.push(
            "Tomorrow, start with just 2-3 essential tasks and 2-3 key habits. \
             Small wins build confidence. You've got this! 💙"
                .into(),
        );
    }

    parts.join(" ")
}
