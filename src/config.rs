//! Runtime configuration shared by the CLI subcommands.
//!
//! Every option can come from a `DAILY_PULSE_*` environment variable or the
//! matching command-line flag; the flag wins.

use std::path::PathBuf;

use anyhow::Result;
use chrono::FixedOffset;
use clap::Args;

use crate::db::Database;
use pulse_core::Calendar;

#[derive(Debug, Clone, Args)]
pub struct StorageArgs {
    /// Path to the SQLite database (defaults to the user data directory)
    #[arg(long, env = "DAILY_PULSE_DB")]
    pub db: Option<PathBuf>,
}

impl StorageArgs {
    /// Open the configured database and bring its schema up to date.
    pub fn open(&self) -> Result<Database> {
        let db = match &self.db {
            Some(path) => Database::open(path.clone())?,
            None => Database::open_default()?,
        };
        db.migrate()?;
        Ok(db)
    }
}

#[derive(Debug, Clone, Args)]
pub struct CalendarArgs {
    /// UTC offset that defines calendar days, e.g. `+02:00` (defaults to the host zone)
    #[arg(long, env = "DAILY_PULSE_UTC_OFFSET", value_parser = parse_utc_offset)]
    pub utc_offset: Option<FixedOffset>,
}

impl CalendarArgs {
    pub fn calendar(&self) -> Calendar {
        match self.utc_offset {
            Some(offset) => Calendar::with_offset(offset),
            None => Calendar::Local,
        }
    }
}

/// Parse `Z`, `UTC`, `+HH`, `+HH:MM` or `-HHMM`.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| "invalid offset".to_string());
    }

    let err = || format!("invalid UTC offset '{s}', expected e.g. +02:00");
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(err()),
    };
    if !rest.is_ascii() {
        return Err(err());
    }
    let (hours, minutes) = match (rest.len(), rest.find(':')) {
        (2, None) => (&rest[..2], "00"),
        (4, None) => (&rest[..2], &rest[2..]),
        (5, Some(2)) => (&rest[..2], &rest[3..]),
        _ => return Err(err()),
    };
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(err());
    }
    let hours: i32 = hours.parse().map_err(|_| err())?;
    let minutes: i32 = minutes.parse().map_err(|_| err())?;
    if hours > 23 || minutes > 59 {
        return Err(err());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_offset_forms() {
        assert_eq!(parse_utc_offset("+02:00").unwrap().local_minus_utc(), 7200);
        assert_eq!(parse_utc_offset("-0530").unwrap().local_minus_utc(), -19800);
        assert_eq!(parse_utc_offset("+09").unwrap().local_minus_utc(), 32400);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("utc").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn rejects_malformed_offsets() {
        for bad in ["", "02:00", "+2:0", "+25:00", "+02:75", "+ab:cd"] {
            assert!(parse_utc_offset(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn missing_offset_means_host_zone() {
        let args = CalendarArgs { utc_offset: None };
        assert_eq!(args.calendar(), Calendar::Local);
    }
}
