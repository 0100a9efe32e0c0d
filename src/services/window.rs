use chrono::{DateTime, Utc};
use serde::Serialize;

/// The window opens this many minutes before the appointment.
pub const OPENS_BEFORE_MINUTES: i64 = 5;
/// The window closes this many minutes after the appointment.
pub const CLOSES_AFTER_MINUTES: i64 = 30;

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MinutesBreakdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl MinutesBreakdown {
    pub fn from_minutes(total: i64) -> Self {
        let total = total.max(0);
        Self {
            days: total / MINUTES_PER_DAY,
            hours: (total % MINUTES_PER_DAY) / MINUTES_PER_HOUR,
            minutes: total % MINUTES_PER_HOUR,
        }
    }

    pub fn total_minutes(&self) -> i64 {
        self.days * MINUTES_PER_DAY + self.hours * MINUTES_PER_HOUR + self.minutes
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        for (value, unit) in [(self.days, "day"), (self.hours, "hour"), (self.minutes, "minute")] {
            if value > 0 {
                parts.push(plural(value, unit));
            }
        }
        if parts.is_empty() {
            return plural(0, "minute");
        }
        parts.join(", ")
    }
}

fn plural(value: i64, unit: &str) -> String {
    if value == 1 {
        format!("{} {}", value, unit)
    } else {
        format!("{} {}s", value, unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowResult {
    Valid { minutes_into_window: i64 },
    TooEarly { minutes_until: i64, until: MinutesBreakdown },
    TooLate { minutes_late: i64 },
}

impl WindowResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, WindowResult::Valid { .. })
    }

    pub fn message(&self) -> String {
        match self {
            WindowResult::Valid { .. } => "Interview window is active".to_string(),
            WindowResult::TooEarly { until, .. } => {
                format!("Interview window opens in {}", until.describe())
            }
            WindowResult::TooLate { minutes_late } => format!(
                "Interview window closed {} ago",
                plural(*minutes_late, "minute")
            ),
        }
    }
}

/// Whole minutes from the appointment to `now`, rounded toward negative infinity.
pub fn diff_minutes(now: DateTime<Utc>, appointment: DateTime<Utc>) -> i64 {
    (now - appointment).num_milliseconds().div_euclid(60_000)
}

/// Bounds are inclusive: `-5 <= diff <= 30` is inside the window.
pub fn check_window(now: DateTime<Utc>, appointment: DateTime<Utc>) -> WindowResult {
    let diff = diff_minutes(now, appointment);

    if diff < -OPENS_BEFORE_MINUTES {
        let minutes_until = diff.abs();
        return WindowResult::TooEarly {
            minutes_until,
            until: MinutesBreakdown::from_minutes(minutes_until),
        };
    }

    if diff > CLOSES_AFTER_MINUTES {
        return WindowResult::TooLate {
            minutes_late: diff - CLOSES_AFTER_MINUTES,
        };
    }

    WindowResult::Valid {
        minutes_into_window: diff + OPENS_BEFORE_MINUTES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(s: &str) -> DateTime<Utc> {
        crate::utils::time::from_rfc3339(s).unwrap()
    }

    fn appointment() -> DateTime<Utc> {
        at("2024-01-01T10:00:00Z")
    }

    #[test]
    fn whole_window_is_valid_inclusive() {
        for diff in -5..=30 {
            let now = appointment() + Duration::minutes(diff);
            assert_eq!(
                check_window(now, appointment()),
                WindowResult::Valid {
                    minutes_into_window: diff + 5
                },
                "diff {}",
                diff
            );
        }
    }

    #[test]
    fn one_minute_outside_each_bound() {
        let early = check_window(appointment() - Duration::minutes(6), appointment());
        assert!(matches!(early, WindowResult::TooEarly { minutes_until: 6, .. }));

        let late = check_window(appointment() + Duration::minutes(31), appointment());
        assert_eq!(late, WindowResult::TooLate { minutes_late: 1 });
        assert_eq!(late.message(), "Interview window closed 1 minute ago");
    }

    #[test]
    fn fractional_minutes_floor_toward_negative() {
        // 5m30s early floors to -6, which is outside.
        let now = appointment() - Duration::seconds(330);
        assert_eq!(diff_minutes(now, appointment()), -6);
        assert!(!check_window(now, appointment()).is_valid());

        // 30m59s late floors to 30, which is inside.
        let now = appointment() + Duration::seconds(30 * 60 + 59);
        assert_eq!(diff_minutes(now, appointment()), 30);
        assert!(check_window(now, appointment()).is_valid());
    }

    #[test]
    fn long_lead_time_is_decomposed() {
        let now = appointment() - Duration::minutes(1500);
        match check_window(now, appointment()) {
            WindowResult::TooEarly {
                minutes_until,
                until,
            } => {
                assert_eq!(minutes_until, 1500);
                assert_eq!(
                    until,
                    MinutesBreakdown {
                        days: 1,
                        hours: 1,
                        minutes: 0
                    }
                );
                assert_eq!(until.total_minutes(), 1500);
            }
            other => panic!("expected too early, got {:?}", other),
        }
        assert_eq!(
            check_window(now, appointment()).message(),
            "Interview window opens in 1 day, 1 hour"
        );
    }

    #[test]
    fn scenario_timestamps() {
        assert_eq!(
            check_window(at("2024-01-01T09:56:00Z"), appointment()),
            WindowResult::Valid {
                minutes_into_window: 1
            }
        );
        assert!(check_window(at("2024-01-01T09:55:00Z"), appointment()).is_valid());
        assert!(matches!(
            check_window(at("2024-01-01T09:50:00Z"), appointment()),
            WindowResult::TooEarly {
                minutes_until: 10,
                ..
            }
        ));
        assert_eq!(
            check_window(at("2024-01-01T10:31:00Z"), appointment()),
            WindowResult::TooLate { minutes_late: 1 }
        );
    }
}
