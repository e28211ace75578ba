use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::CalendarDay;

/// The end-of-day summary for one owner and one day.
///
/// At most one exists per `(owner_id, day)`. Reviews are never recomputed or
/// edited after creation; asking for the same day again returns this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReview {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub day: CalendarDay,
    pub tasks_completed: u32,
    pub tasks_total: u32,
    pub habits_completed: u32,
    pub habits_total: u32,
    /// Weighted score in `0..=100`.
    pub productivity_score: u8,
    /// Rule-generated narrative, see [`crate::narrative`].
    pub ai_comment: String,
    pub created_at: DateTime<Utc>,
}

/// Result of an end-of-day request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndDayOutcome {
    pub review: DailyReview,
    /// `false` when the review already existed and was returned unchanged.
    pub created: bool,
}
