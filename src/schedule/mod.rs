//! Weekly trading session and cycle cadence.
//!
//! The session runs from `session_open` (e.g. "Sun 22:00") to
//! `weekly_flatten` (e.g. "Fri 21:30") in a fixed-offset session clock.
//! Cycles fire every `cadence_minutes` at `minute_offset` past each slot
//! (:01, :06, ... :56 with the defaults); the weekly flatten fires once at
//! session end.

use crate::config::ScheduleConfig;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Timelike, Utc, Weekday};

const MINUTES_PER_WEEK: i64 = 7 * 24 * 60;

/// A weekday + time of day in the session clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyTime {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl WeeklyTime {
    /// Parse "Sun 22:00".
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.split_whitespace();
        let (Some(day), Some(time), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(anyhow!("expected '<Day> <HH:MM>', got '{value}'"));
        };
        let weekday = day
            .parse::<Weekday>()
            .map_err(|_| anyhow!("unknown weekday '{day}'"))?;
        let time = NaiveTime::parse_from_str(time, "%H:%M")
            .with_context(|| format!("invalid time '{time}'"))?;
        Ok(Self { weekday, time })
    }

    /// Minutes since Monday 00:00.
    fn minute_of_week(&self) -> i64 {
        self.weekday.num_days_from_monday() as i64 * 1440
            + self.time.hour() as i64 * 60
            + self.time.minute() as i64
    }
}

#[derive(Debug, Clone)]
pub struct TradingCalendar {
    offset: FixedOffset,
    open: WeeklyTime,
    close: WeeklyTime,
    cadence_minutes: u32,
    minute_offset: u32,
    heartbeat: std::time::Duration,
}

impl TradingCalendar {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let offset = FixedOffset::east_opt(config.utc_offset_hours * 3600)
            .ok_or_else(|| anyhow!("utc_offset_hours {} out of range", config.utc_offset_hours))?;
        let open = WeeklyTime::parse(&config.session_open).context("session_open")?;
        let close = WeeklyTime::parse(&config.weekly_flatten).context("weekly_flatten")?;
        anyhow::ensure!(open != close, "session_open and weekly_flatten must differ");
        anyhow::ensure!(config.cadence_minutes >= 1, "cadence_minutes must be >= 1");
        anyhow::ensure!(config.heartbeat_minutes >= 1, "heartbeat_minutes must be >= 1");

        Ok(Self {
            offset,
            open,
            close,
            cadence_minutes: config.cadence_minutes,
            minute_offset: config.minute_offset % config.cadence_minutes,
            heartbeat: std::time::Duration::from_secs(config.heartbeat_minutes as u64 * 60),
        })
    }

    fn minute_of_week(&self, at: DateTime<Utc>) -> i64 {
        let local = at.with_timezone(&self.offset);
        local.weekday().num_days_from_monday() as i64 * 1440
            + local.hour() as i64 * 60
            + local.minute() as i64
    }

    fn minute_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        at - Duration::seconds(at.second() as i64) - Duration::nanoseconds(at.nanosecond() as i64)
    }

    /// Whether `at` falls inside the weekly session (close excluded).
    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        let now = self.minute_of_week(at);
        let open = self.open.minute_of_week();
        let close = self.close.minute_of_week();
        if open < close {
            now >= open && now < close
        } else {
            // Session wraps the week boundary
            now >= open || now < close
        }
    }

    /// First cycle time strictly after `after`.
    pub fn next_tick(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let minute_start = self.minute_start(after);
        let cadence = self.cadence_minutes as i64;
        let mut candidate = minute_start + Duration::minutes(1);
        for _ in 0..cadence {
            let minute = candidate.with_timezone(&self.offset).minute() as i64;
            if minute % cadence == self.minute_offset as i64 {
                return candidate;
            }
            candidate += Duration::minutes(1);
        }
        candidate
    }

    /// Next weekly flatten strictly after `after`.
    pub fn next_flatten(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let minute_start = self.minute_start(after);
        let now = self.minute_of_week(after);
        let mut ahead = (self.close.minute_of_week() - now).rem_euclid(MINUTES_PER_WEEK);
        if ahead == 0 {
            // Inside the flatten minute already: that one has fired
            ahead = MINUTES_PER_WEEK;
        }
        minute_start + Duration::minutes(ahead)
    }

    pub fn heartbeat_interval(&self) -> std::time::Duration {
        self.heartbeat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn calendar() -> TradingCalendar {
        TradingCalendar::from_config(&ScheduleConfig::default()).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    // 2024-03-08 is a Friday, 2024-03-10 a Sunday

    #[test]
    fn test_parse_weekly_time() {
        let t = WeeklyTime::parse("Fri 21:30").unwrap();
        assert_eq!(t.weekday, Weekday::Fri);
        assert_eq!(t.time, NaiveTime::from_hms_opt(21, 30, 0).unwrap());
        assert!(WeeklyTime::parse("Friday").is_err());
        assert!(WeeklyTime::parse("Fri 25:00").is_err());
    }

    #[test]
    fn test_session_window() {
        let cal = calendar();
        assert!(cal.is_open(at(2024, 3, 6, 12, 0, 0))); // Wednesday
        assert!(cal.is_open(at(2024, 3, 8, 21, 29, 0)));
        assert!(!cal.is_open(at(2024, 3, 8, 21, 30, 0)));
        assert!(!cal.is_open(at(2024, 3, 9, 12, 0, 0))); // Saturday
        assert!(!cal.is_open(at(2024, 3, 10, 21, 59, 0)));
        assert!(cal.is_open(at(2024, 3, 10, 22, 0, 0)));
    }

    #[test]
    fn test_next_tick_on_offset_minutes() {
        let cal = calendar();
        assert_eq!(cal.next_tick(at(2024, 3, 6, 12, 0, 30)), at(2024, 3, 6, 12, 1, 0));
        assert_eq!(cal.next_tick(at(2024, 3, 6, 12, 1, 0)), at(2024, 3, 6, 12, 6, 0));
        assert_eq!(cal.next_tick(at(2024, 3, 6, 12, 57, 0)), at(2024, 3, 6, 13, 1, 0));
    }

    #[test]
    fn test_next_flatten() {
        let cal = calendar();
        assert_eq!(cal.next_flatten(at(2024, 3, 6, 12, 0, 0)), at(2024, 3, 8, 21, 30, 0));
        // Exactly at the flatten minute: the next one is a week later
        assert_eq!(cal.next_flatten(at(2024, 3, 8, 21, 30, 0)), at(2024, 3, 15, 21, 30, 0));
        assert_eq!(cal.next_flatten(at(2024, 3, 9, 0, 0, 0)), at(2024, 3, 15, 21, 30, 0));
    }

    #[test]
    fn test_utc_offset_shifts_session() {
        let cal = TradingCalendar::from_config(&ScheduleConfig {
            utc_offset_hours: 1,
            ..ScheduleConfig::default()
        })
        .unwrap();
        // 21:00 UTC Sunday is 22:00 in the session clock
        assert!(cal.is_open(at(2024, 3, 10, 21, 0, 0)));
    }

    #[test]
    fn test_rejects_bad_config() {
        let bad = ScheduleConfig {
            session_open: "Someday 22:00".to_string(),
            ..ScheduleConfig::default()
        };
        assert!(TradingCalendar::from_config(&bad).is_err());
    }
}
