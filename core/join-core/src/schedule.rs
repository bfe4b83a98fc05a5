//! Where a scheduled class sits relative to now.
//!
//! The dashboard shows a "starting soon" badge inside a configurable window
//! before class (30 minutes by default) and only offers the join button from
//! then until the class ends. The join endpoint remains the authority; this
//! only decides whether asking it is worthwhile yet.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledClass {
    pub session_id: String,
    pub starts_at: DateTime<Utc>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinWindow {
    Upcoming,
    StartingSoon,
    InProgress,
    Ended,
}

impl JoinWindow {
    pub fn allows_join(&self) -> bool {
        matches!(self, JoinWindow::StartingSoon | JoinWindow::InProgress)
    }
}

impl ScheduledClass {
    pub fn new(
        session_id: impl Into<String>,
        starts_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            starts_at,
            duration,
        }
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + self.duration
    }

    pub fn window(&self, now: DateTime<Utc>, starting_soon: Duration) -> JoinWindow {
        if now >= self.ends_at() {
            JoinWindow::Ended
        } else if now >= self.starts_at {
            JoinWindow::InProgress
        } else if self.starts_at - now <= starting_soon {
            JoinWindow::StartingSoon
        } else {
            JoinWindow::Upcoming
        }
    }

    /// Whole minutes until start, rounded up; zero once the class has begun.
    pub fn minutes_until_start(&self, now: DateTime<Utc>) -> i64 {
        let remaining = self.starts_at - now;
        if remaining <= Duration::zero() {
            return 0;
        }
        let seconds = remaining.num_seconds();
        (seconds + 59) / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("parse")
            .with_timezone(&Utc)
    }

    fn class() -> ScheduledClass {
        ScheduledClass::new("b-1", at("2026-03-02T10:00:00Z"), Duration::minutes(45))
    }

    #[test]
    fn window_boundaries() {
        let class = class();
        let soon = Duration::minutes(30);

        assert_eq!(class.window(at("2026-03-02T09:29:59Z"), soon), JoinWindow::Upcoming);
        assert_eq!(class.window(at("2026-03-02T09:30:00Z"), soon), JoinWindow::StartingSoon);
        assert_eq!(class.window(at("2026-03-02T10:00:00Z"), soon), JoinWindow::InProgress);
        assert_eq!(class.window(at("2026-03-02T10:44:59Z"), soon), JoinWindow::InProgress);
        assert_eq!(class.window(at("2026-03-02T10:45:00Z"), soon), JoinWindow::Ended);
    }

    #[test]
    fn only_soon_and_in_progress_allow_join() {
        assert!(!JoinWindow::Upcoming.allows_join());
        assert!(JoinWindow::StartingSoon.allows_join());
        assert!(JoinWindow::InProgress.allows_join());
        assert!(!JoinWindow::Ended.allows_join());
    }

    #[test]
    fn minutes_until_start_rounds_up() {
        let class = class();
        assert_eq!(class.minutes_until_start(at("2026-03-02T09:58:30Z")), 2);
        assert_eq!(class.minutes_until_start(at("2026-03-02T09:59:00Z")), 1);
        assert_eq!(class.minutes_until_start(at("2026-03-02T10:05:00Z")), 0);
    }

    #[test]
    fn zero_window_skips_starting_soon() {
        let class = class();
        assert_eq!(
            class.window(at("2026-03-02T09:59:00Z"), Duration::zero()),
            JoinWindow::Upcoming
        );
    }
}
