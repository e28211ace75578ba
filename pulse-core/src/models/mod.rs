//! Domain models for the productivity engine.
//!
//! # Core Concepts
//!
//! - [`Habit`]: a recurring habit with a per-day completion log and a cached
//!   current streak. The streak is only written together with the log set.
//! - [`Task`]: a time-blocked task on one day. The engine reads it; the CRUD
//!   surface owns it.
//! - [`DailyReview`]: the immutable end-of-day summary, unique per owner/day.
//! - [`HeatmapBucket`]: derived per-day activity counts, never persisted.

mod habit;
mod heatmap;
mod review;
mod task;

pub use habit::*;
pub use heatmap::*;
pub use review::*;
pub use task::*;
