//! Daily productivity engine.
//!
//! The temporal core of Daily Pulse: habit streaks, end-of-day reviews and
//! the activity heatmap. Storage is reached only through
//! [`store::ProductivityStore`] and "now" is always passed in, so every
//! operation here is deterministic under test.

pub mod calendar;
pub mod clock;
pub mod error;
pub mod heatmap;
pub mod models;
pub mod narrative;
pub mod review;
pub mod store;
pub mod streak;

pub use calendar::{Calendar, CalendarDay};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
