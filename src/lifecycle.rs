use crate::calc::CalcError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Upcoming,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleStatus {
    pub phase: Phase,
    pub remaining_seconds: i64,
}

/// Derive the phase of an exam window at `now`.
///
/// Both window edges count as Active. `now > end` is checked first, so an
/// inverted window (`start >= end`) lands on Ended once its end has passed.
pub fn classify(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> LifecycleStatus {
    if now > end {
        return LifecycleStatus {
            phase: Phase::Ended,
            remaining_seconds: 0,
        };
    }
    if now < start {
        return LifecycleStatus {
            phase: Phase::Upcoming,
            remaining_seconds: 0,
        };
    }
    LifecycleStatus {
        phase: Phase::Active,
        remaining_seconds: (end - now).num_seconds().max(0),
    }
}

pub fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), CalcError> {
    if start < end {
        return Ok(());
    }
    Err(CalcError::new(
        "invalid_time_window",
        "startTime must be earlier than endTime",
    )
    .with_details(json!({
        "startTime": start.to_rfc3339(),
        "endTime": end.to_rfc3339(),
    })))
}

/// Like `classify`, but refuses inverted windows instead of folding them
/// into Ended.
pub fn classify_strict(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<LifecycleStatus, CalcError> {
    validate_window(start, end)?;
    Ok(classify(now, start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn before_start_is_upcoming() {
        let s = classify(at(8, 0), at(9, 0), at(10, 0));
        assert_eq!(s.phase, Phase::Upcoming);
        assert_eq!(s.remaining_seconds, 0);
    }

    #[test]
    fn window_edges_are_active() {
        let start = at(9, 0);
        let end = at(10, 0);
        let at_start = classify(start, start, end);
        assert_eq!(at_start.phase, Phase::Active);
        assert_eq!(at_start.remaining_seconds, 3600);

        let at_end = classify(end, start, end);
        assert_eq!(at_end.phase, Phase::Active);
        assert_eq!(at_end.remaining_seconds, 0);
    }

    #[test]
    fn remaining_seconds_counts_down() {
        let s = classify(at(9, 45), at(9, 0), at(10, 0));
        assert_eq!(s.phase, Phase::Active);
        assert_eq!(s.remaining_seconds, 15 * 60);
    }

    #[test]
    fn after_end_is_ended() {
        let s = classify(at(10, 0) + Duration::seconds(1), at(9, 0), at(10, 0));
        assert_eq!(s.phase, Phase::Ended);
        assert_eq!(s.remaining_seconds, 0);
    }

    #[test]
    fn inverted_window_folds_into_ended() {
        let s = classify(at(9, 30), at(10, 0), at(9, 0));
        assert_eq!(s.phase, Phase::Ended);
        let err = classify_strict(at(9, 30), at(10, 0), at(9, 0)).expect_err("inverted");
        assert_eq!(err.code, "invalid_time_window");
    }

    #[test]
    fn zero_length_window_is_invalid() {
        assert!(validate_window(at(9, 0), at(9, 0)).is_err());
        assert!(validate_window(at(9, 0), at(9, 1)).is_ok());
    }
}
