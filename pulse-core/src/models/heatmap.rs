use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarDay;

/// Completed activity on a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapBucket {
    pub day: CalendarDay,
    pub task_count: u32,
    pub habit_count: u32,
    pub total: u32,
}

impl HeatmapBucket {
    pub fn empty(day: CalendarDay) -> Self {
        Self {
            day,
            task_count: 0,
            habit_count: 0,
            total: 0,
        }
    }
}

/// Sparse day → bucket map. Days without completed activity are absent.
pub type Heatmap = BTreeMap<CalendarDay, HeatmapBucket>;
