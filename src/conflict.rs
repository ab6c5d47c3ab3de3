//! Overlap detection between a candidate time range and existing
//! commitments, with a symmetric grace buffer.
//!
//! The grace buffer is applied around each *existing* range before the
//! overlap test, so a candidate that starts right after a session still
//! conflicts until the buffer has passed. Detection here is read-then-decide
//! and best-effort under concurrency; the authoritative serialization point
//! is the slot reservation, not this check.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::service::ServiceKind;
use crate::time::{to_time, MINUTES_PER_DAY};

/// Default symmetric grace buffer in minutes.
pub const DEFAULT_GRACE_MINUTES: u16 = 30;

/// A committed or candidate time range on a service's calendar.
///
/// Start and end are minute offsets since midnight in the service's local
/// wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimeRange {
    /// Calendar day of the range.
    pub day: NaiveDate,
    /// Start, minutes since midnight.
    pub start_minute: u16,
    /// End, minutes since midnight (exclusive).
    pub end_minute: u16,
    /// The service whose calendar the range occupies.
    pub service: ServiceKind,
}

impl TimeRange {
    /// Create a range from a start minute and a duration.
    pub fn new(day: NaiveDate, start_minute: u16, duration_minutes: u16, service: ServiceKind) -> Self {
        Self {
            day,
            start_minute,
            end_minute: start_minute + duration_minutes,
            service,
        }
    }

    /// Render as `HH:MM-HH:MM` for conflict explanations.
    pub fn label(&self) -> String {
        let start = to_time(self.start_minute.min(MINUTES_PER_DAY - 1)).unwrap_or_default();
        let end = to_time(self.end_minute.min(MINUTES_PER_DAY - 1)).unwrap_or_default();
        format!("{} {}-{}", self.day, start, end)
    }
}

/// Does `candidate` collide with `existing` once the grace buffer is applied?
///
/// Ranges on different days or different services never conflict. Otherwise
/// `existing` is expanded to `[start - grace, end + grace]` and the candidate
/// conflicts when its start or end falls inside the expanded range, or when
/// it fully contains it.
pub fn conflicts(candidate: &TimeRange, existing: &TimeRange, grace_minutes: u16) -> bool {
    if candidate.day != existing.day || candidate.service != existing.service {
        return false;
    }

    let expanded_start = existing.start_minute.saturating_sub(grace_minutes);
    let expanded_end = existing.end_minute + grace_minutes;

    let start_inside =
        candidate.start_minute >= expanded_start && candidate.start_minute < expanded_end;
    let end_inside = candidate.end_minute > expanded_start && candidate.end_minute <= expanded_end;
    let contains =
        candidate.start_minute <= expanded_start && candidate.end_minute >= expanded_end;

    start_inside || end_inside || contains
}

/// Filter `existing` down to the ranges that conflict with `candidate`.
pub fn find_conflicts(
    candidate: &TimeRange,
    existing: &[TimeRange],
    grace_minutes: u16,
) -> Vec<TimeRange> {
    existing
        .iter()
        .filter(|range| conflicts(candidate, range, grace_minutes))
        .copied()
        .collect()
}

/// Parameters for alternative-slot suggestion.
#[derive(Debug, Clone, Copy)]
pub struct SuggestParams {
    /// Start of the working window, minutes since midnight.
    pub work_start_minute: u16,
    /// End of the working window, minutes since midnight.
    pub work_end_minute: u16,
    /// Candidate start granularity in minutes.
    pub step_minutes: u16,
    /// Maximum number of suggestions returned. UI policy, not correctness.
    pub max_suggestions: usize,
}

impl Default for SuggestParams {
    fn default() -> Self {
        Self {
            work_start_minute: 8 * 60,
            work_end_minute: 20 * 60,
            step_minutes: 30,
            max_suggestions: 5,
        }
    }
}

/// Scan the working window for start minutes whose induced range produces
/// zero conflicts. Returned ascending, capped to `max_suggestions`.
pub fn suggest_slots(
    day: NaiveDate,
    duration_minutes: u16,
    service: ServiceKind,
    existing: &[TimeRange],
    grace_minutes: u16,
    params: &SuggestParams,
) -> Vec<u16> {
    let mut suggestions = Vec::new();
    if params.step_minutes == 0 {
        return suggestions;
    }

    let mut start = params.work_start_minute;
    while start + duration_minutes <= params.work_end_minute {
        let candidate = TimeRange::new(day, start, duration_minutes, service);
        if find_conflicts(&candidate, existing, grace_minutes).is_empty() {
            suggestions.push(start);
            if suggestions.len() >= params.max_suggestions {
                break;
            }
        }
        start += params.step_minutes;
    }

    suggestions
}
