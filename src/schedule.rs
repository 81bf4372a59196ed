//! Due-date tracking for backup reminders

use crate::{Error, Result};
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// On-disk and display format of the last backup timestamp (local time)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whole days that must have passed before a backup is due again
pub const DEFAULT_DUE_AFTER_DAYS: i64 = 3;

/// How often the reminder loop re-evaluates the schedule
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Current local time, truncated to whole seconds so it survives a
/// format/parse round trip unchanged.
pub fn now_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| Error::Scheduling {
        reason: format!("Invalid backup date '{}': {}", value, e),
    })
}

/// Serde adapter for an optional timestamp in [`TIMESTAMP_FORMAT`]; `None`
/// is written as `null`.
pub mod backup_date {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(timestamp) => {
                serializer.serialize_str(&timestamp.format(TIMESTAMP_FORMAT).to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(value) => NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT)
                .map(Some)
                .map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

/// Persisted scheduling state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    /// Completion time of the last successful run
    #[serde(rename = "last_backup_date", default, with = "backup_date")]
    pub last_backup: Option<NaiveDateTime>,
}

impl ScheduleState {
    pub fn new(last_backup: Option<NaiveDateTime>) -> Self {
        Self { last_backup }
    }

    /// Record a successful run finishing at `finished_at`.
    ///
    /// The stored timestamp never moves backwards: an earlier value (e.g.
    /// after a clock adjustment) leaves the state untouched.
    pub fn record_success(&mut self, finished_at: NaiveDateTime) -> NaiveDateTime {
        match self.last_backup {
            Some(previous) if previous > finished_at => {
                warn!(
                    "Clock went backwards ({} < {}), keeping previous backup date",
                    format_timestamp(&finished_at),
                    format_timestamp(&previous)
                );
                previous
            }
            _ => {
                self.last_backup = Some(finished_at);
                finished_at
            }
        }
    }

    /// Display form of the last backup date
    pub fn describe(&self) -> String {
        self.last_backup
            .as_ref()
            .map(format_timestamp)
            .unwrap_or_else(|| "never".to_string())
    }
}

/// Whether a reminder should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    NotDue,
    Due,
}

impl fmt::Display for DueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueState::NotDue => write!(f, "not due"),
            DueState::Due => write!(f, "due"),
        }
    }
}

/// Decides whether a new backup is due from the elapsed wall-clock time.
///
/// A backup is due once more than `due_after_days` *whole* days have passed
/// since the last one; the elapsed time is truncated to days before the
/// comparison. A missing timestamp is never due.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleTracker {
    due_after_days: i64,
}

impl Default for ScheduleTracker {
    fn default() -> Self {
        Self {
            due_after_days: DEFAULT_DUE_AFTER_DAYS,
        }
    }
}

impl ScheduleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom threshold in whole days
    pub fn with_due_after_days(mut self, days: i64) -> Self {
        self.due_after_days = days;
        self
    }

    pub fn due_after_days(&self) -> i64 {
        self.due_after_days
    }

    /// Check against the current local time
    pub fn is_due(&self, last_backup: Option<NaiveDateTime>) -> bool {
        self.is_due_at(last_backup, Local::now().naive_local())
    }

    /// Check against an explicit "now"
    pub fn is_due_at(&self, last_backup: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
        let Some(last_backup) = last_backup else {
            return false;
        };

        let elapsed = now.signed_duration_since(last_backup);
        let due = elapsed.num_days() > self.due_after_days;
        debug!(
            "Last backup {} ({} whole days ago), due: {}",
            format_timestamp(&last_backup),
            elapsed.num_days(),
            due
        );
        due
    }

    pub fn state_at(&self, last_backup: Option<NaiveDateTime>, now: NaiveDateTime) -> DueState {
        if self.is_due_at(last_backup, now) {
            DueState::Due
        } else {
            DueState::NotDue
        }
    }

    pub fn state(&self, last_backup: Option<NaiveDateTime>) -> DueState {
        self.state_at(last_backup, Local::now().naive_local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn at(value: &str) -> NaiveDateTime {
        parse_timestamp(value).unwrap()
    }

    #[test]
    fn test_never_backed_up_is_not_due() {
        let tracker = ScheduleTracker::new();
        assert!(!tracker.is_due_at(None, at("2024-05-10 12:00:00")));
        assert!(!tracker.is_due(None));
    }

    #[test]
    fn test_whole_day_boundaries() {
        let tracker = ScheduleTracker::new();
        let last = at("2024-05-01 12:00:00");

        let cases = [
            (ChronoDuration::days(3), false),
            (ChronoDuration::days(3) + ChronoDuration::seconds(1), false),
            (ChronoDuration::days(4) - ChronoDuration::seconds(1), false),
            (ChronoDuration::days(4), true),
            (ChronoDuration::days(30), true),
        ];

        for (elapsed, expected) in cases {
            assert_eq!(
                tracker.is_due_at(Some(last), last + elapsed),
                expected,
                "elapsed {:?}",
                elapsed
            );
        }
    }

    #[test]
    fn test_future_timestamp_is_not_due() {
        let tracker = ScheduleTracker::new();
        let now = at("2024-05-01 12:00:00");
        assert!(!tracker.is_due_at(Some(now + ChronoDuration::days(10)), now));
    }

    #[test]
    fn test_four_days_ago_is_due_now() {
        let tracker = ScheduleTracker::new();
        let last = now_timestamp() - ChronoDuration::days(4);
        assert!(tracker.is_due(Some(last)));
        assert_eq!(tracker.state(Some(last)), DueState::Due);
    }

    #[test]
    fn test_custom_threshold() {
        let tracker = ScheduleTracker::new().with_due_after_days(0);
        let last = at("2024-05-01 12:00:00");
        assert!(!tracker.is_due_at(Some(last), at("2024-05-01 23:59:59")));
        assert!(tracker.is_due_at(Some(last), at("2024-05-02 12:00:00")));
    }

    #[test]
    fn test_record_success_is_monotonic() {
        let mut state = ScheduleState::default();
        assert_eq!(state.describe(), "never");

        let first = at("2024-05-01 12:00:00");
        assert_eq!(state.record_success(first), first);

        let earlier = at("2024-04-01 12:00:00");
        assert_eq!(state.record_success(earlier), first);
        assert_eq!(state.last_backup, Some(first));

        let later = at("2024-05-02 08:30:00");
        state.record_success(later);
        assert_eq!(state.describe(), "2024-05-02 08:30:00");
    }

    #[test]
    fn test_timestamp_format_round_trip() {
        let text = "2024-12-31 23:59:07";
        assert_eq!(format_timestamp(&at(text)), text);
        assert!(parse_timestamp("31/12/2024").is_err());

        let now = now_timestamp();
        assert_eq!(parse_timestamp(&format_timestamp(&now)).unwrap(), now);
    }

    #[test]
    fn test_state_serialization() {
        let state = ScheduleState::new(Some(at("2024-05-01 12:00:00")));
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"last_backup_date":"2024-05-01 12:00:00"}"#);

        let empty: ScheduleState = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.last_backup, None);
        let null: ScheduleState = serde_json::from_str(r#"{"last_backup_date":null}"#).unwrap();
        assert_eq!(null.last_backup, None);
    }
}
