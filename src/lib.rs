//! Daily Pulse: time-blocked tasks, habit streaks, end-of-day reviews and an
//! activity heatmap.
//!
//! The engine lives in [`pulse_core`]; this crate adds SQLite storage, the
//! HTTP API and configuration.

pub mod api;
pub mod config;
pub mod db;

pub use pulse_core::{
    calendar, clock, heatmap, models, narrative, review, store, streak, Calendar, CalendarDay,
    Clock, Error, FixedClock, SystemClock,
};
