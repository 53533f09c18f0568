use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::config::Config;
use crate::error::StateError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};

/// Working-hours policy the transitions are judged against.
#[derive(Debug, Clone, Copy)]
pub struct WorkSchedule {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub late_grace: Duration,
    pub half_day: Duration,
}

impl WorkSchedule {
    pub fn from_config(config: &Config) -> Self {
        Self {
            start: config.work_start,
            end: config.work_end,
            late_grace: Duration::minutes(config.late_grace_minutes),
            half_day: Duration::hours(config.half_day_hours),
        }
    }
}

/// Lifecycle of one employee-day. `Completed` covers a finished
/// check-in/out cycle as well as the terminal rows the reconciliation
/// sweep writes (absent, on-leave, anomalous) — none of them accept
/// further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    NoRecord,
    CheckedIn { check_in: NaiveDateTime },
    Completed,
}

impl DayState {
    pub fn from_record(record: Option<&AttendanceRecord>) -> Self {
        match record {
            None => DayState::NoRecord,
            Some(r) => match (r.check_in, r.check_out) {
                (Some(check_in), None) => DayState::CheckedIn { check_in },
                _ => DayState::Completed,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckIn {
    pub time: NaiveDateTime,
    /// Present within the grace window after work start, Late after it.
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOut {
    pub time: NaiveDateTime,
    pub worked: Duration,
    pub early_departure: bool,
    pub status: AttendanceStatus,
}

/// `NoRecord -> CheckedIn`. Repeating the call against an open record
/// answers `AlreadyCheckedIn` instead of minting a duplicate.
pub fn check_in(
    state: DayState,
    now: NaiveDateTime,
    schedule: &WorkSchedule,
) -> Result<CheckIn, StateError> {
    match state {
        DayState::NoRecord => {
            let status = if now.time() <= add_to_time(schedule.start, schedule.late_grace) {
                AttendanceStatus::Present
            } else {
                AttendanceStatus::Late
            };
            Ok(CheckIn { time: now, status })
        }
        DayState::CheckedIn { .. } => Err(StateError::AlreadyCheckedIn),
        DayState::Completed => Err(StateError::AlreadyCompleted),
    }
}

/// `CheckedIn -> Completed`. Worked duration is checkout minus checkin
/// (never negative); leaving before work end flags an early departure,
/// and a session under the half-day threshold downgrades the status.
pub fn check_out(
    state: DayState,
    now: NaiveDateTime,
    schedule: &WorkSchedule,
    check_in_status: AttendanceStatus,
) -> Result<CheckOut, StateError> {
    match state {
        DayState::CheckedIn { check_in } => {
            let worked = (now - check_in).max(Duration::zero());
            let early_departure = now.time() < schedule.end;
            let status = if worked < schedule.half_day {
                AttendanceStatus::HalfDay
            } else {
                check_in_status
            };
            Ok(CheckOut {
                time: now,
                worked,
                early_departure,
                status,
            })
        }
        DayState::NoRecord => Err(StateError::NotCheckedIn),
        DayState::Completed => Err(StateError::AlreadyCompleted),
    }
}

fn add_to_time(t: NaiveTime, d: Duration) -> NaiveTime {
    // NaiveTime addition wraps at midnight, which is fine for a grace
    // window of minutes.
    t + d
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn schedule() -> WorkSchedule {
        WorkSchedule {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            late_grace: Duration::minutes(20),
            half_day: Duration::hours(4),
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn check_in_within_grace_is_present() {
        let out = check_in(DayState::NoRecord, at(8, 15), &schedule()).unwrap();
        assert_eq!(out.status, AttendanceStatus::Present);
    }

    #[test]
    fn check_in_after_grace_is_late() {
        let out = check_in(DayState::NoRecord, at(8, 21), &schedule()).unwrap();
        assert_eq!(out.status, AttendanceStatus::Late);
    }

    #[test]
    fn double_check_in_is_rejected_idempotently() {
        let open = DayState::CheckedIn {
            check_in: at(8, 0),
        };
        assert_eq!(
            check_in(open, at(8, 0), &schedule()).unwrap_err(),
            StateError::AlreadyCheckedIn
        );
        // Same call, same state, same answer, no new record.
        assert_eq!(
            check_in(open, at(8, 0), &schedule()).unwrap_err(),
            StateError::AlreadyCheckedIn
        );
    }

    #[test]
    fn check_in_after_completed_cycle_is_rejected() {
        assert_eq!(
            check_in(DayState::Completed, at(18, 0), &schedule()).unwrap_err(),
            StateError::AlreadyCompleted
        );
    }

    #[test]
    fn check_out_without_check_in_is_rejected() {
        assert_eq!(
            check_out(
                DayState::NoRecord,
                at(17, 0),
                &schedule(),
                AttendanceStatus::Present
            )
            .unwrap_err(),
            StateError::NotCheckedIn
        );
    }

    #[test]
    fn worked_duration_is_exact_difference() {
        let state = DayState::CheckedIn {
            check_in: at(8, 10),
        };
        let out = check_out(state, at(17, 40), &schedule(), AttendanceStatus::Present).unwrap();
        assert_eq!(out.worked, Duration::minutes(9 * 60 + 30));
        assert!(!out.early_departure);
        assert_eq!(out.status, AttendanceStatus::Present);
    }

    #[test]
    fn worked_duration_never_negative() {
        let state = DayState::CheckedIn {
            check_in: at(9, 0),
        };
        let out = check_out(state, at(9, 0), &schedule(), AttendanceStatus::Present).unwrap();
        assert_eq!(out.worked, Duration::zero());
    }

    #[test]
    fn leaving_before_work_end_flags_early_departure() {
        let state = DayState::CheckedIn {
            check_in: at(8, 0),
        };
        let out = check_out(state, at(15, 0), &schedule(), AttendanceStatus::Present).unwrap();
        assert!(out.early_departure);
        assert_eq!(out.status, AttendanceStatus::Present);
    }

    #[test]
    fn short_session_downgrades_to_half_day() {
        let state = DayState::CheckedIn {
            check_in: at(8, 0),
        };
        let out = check_out(state, at(11, 0), &schedule(), AttendanceStatus::Late).unwrap();
        assert_eq!(out.status, AttendanceStatus::HalfDay);
    }

    #[test]
    fn late_status_carries_through_full_day() {
        let state = DayState::CheckedIn {
            check_in: at(9, 0),
        };
        let out = check_out(state, at(17, 30), &schedule(), AttendanceStatus::Late).unwrap();
        assert_eq!(out.status, AttendanceStatus::Late);
    }

    // Random interleavings of check-in/out calls against a single
    // employee-day: at most one open session ever exists, transitions
    // only ever advance, and rejected calls never mutate state.
    #[test]
    fn random_interleavings_keep_single_open_session() {
        let sched = schedule();
        let mut seed: u64 = 0x5eed_cafe;
        let mut rng = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as u32
        };

        for _ in 0..200 {
            let mut state = DayState::NoRecord;
            let mut open_sessions = 0u32;
            let mut minute = 6 * 60; // start the day at 06:00

            for _ in 0..20 {
                minute += (rng() % 45) as i64;
                let now = at(0, 0) + Duration::minutes(minute.min(23 * 60));
                let before = state;

                if rng() % 2 == 0 {
                    match check_in(state, now, &sched) {
                        Ok(ci) => {
                            assert_eq!(before, DayState::NoRecord);
                            open_sessions += 1;
                            state = DayState::CheckedIn { check_in: ci.time };
                        }
                        Err(_) => assert_eq!(state, before),
                    }
                } else {
                    match check_out(state, now, &sched, AttendanceStatus::Present) {
                        Ok(out) => {
                            assert!(matches!(before, DayState::CheckedIn { .. }));
                            assert!(out.worked >= Duration::zero());
                            open_sessions -= 1;
                            state = DayState::Completed;
                        }
                        Err(_) => assert_eq!(state, before),
                    }
                }

                assert!(open_sessions <= 1, "more than one open session");
            }
        }
    }
}
