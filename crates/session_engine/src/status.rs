//! Pure evaluation of what an actor may see and do for one session at one
//! instant.
//!
//! The join window is the closed interval `[start - 15min, start + duration]`.
//! Both boundary instants are joinable; one tick outside either boundary is
//! not. The backend's `cancelled` status always wins; every other backend
//! status is ignored in favour of the time-derived phase until the window
//! has elapsed, at which point attendance decides the ended phase.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use shared::{
    domain::{AttendanceStatus, BackendStatus, Role},
    protocol::{Registration, Session, SessionEntry},
};

use crate::labels::label;

pub const JOIN_WINDOW_LEAD_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    ScheduledFar,
    ScheduledJoinable,
    Live,
    EndedAttended,
    EndedAbsent,
    EndedUnknown,
    Cancelled,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::ScheduledFar,
        Phase::ScheduledJoinable,
        Phase::Live,
        Phase::EndedAttended,
        Phase::EndedAbsent,
        Phase::EndedUnknown,
        Phase::Cancelled,
    ];

    pub const fn index(self) -> usize {
        match self {
            Phase::ScheduledFar => 0,
            Phase::ScheduledJoinable => 1,
            Phase::Live => 2,
            Phase::EndedAttended => 3,
            Phase::EndedAbsent => 4,
            Phase::EndedUnknown => 5,
            Phase::Cancelled => 6,
        }
    }

    pub const fn group(self) -> PhaseGroup {
        match self {
            Phase::ScheduledFar | Phase::ScheduledJoinable => PhaseGroup::Upcoming,
            Phase::Live => PhaseGroup::Live,
            Phase::EndedAttended | Phase::EndedAbsent | Phase::EndedUnknown => PhaseGroup::Ended,
            Phase::Cancelled => PhaseGroup::Cancelled,
        }
    }

    pub const fn color_tag(self) -> ColorTag {
        match self {
            Phase::ScheduledFar => ColorTag::Blue,
            Phase::ScheduledJoinable => ColorTag::Orange,
            Phase::Live | Phase::EndedAttended => ColorTag::Green,
            Phase::EndedAbsent | Phase::Cancelled => ColorTag::Red,
            Phase::EndedUnknown => ColorTag::Gray,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::ScheduledFar => "SCHEDULED_FAR",
            Phase::ScheduledJoinable => "SCHEDULED_JOINABLE",
            Phase::Live => "LIVE",
            Phase::EndedAttended => "ENDED_ATTENDED",
            Phase::EndedAbsent => "ENDED_ABSENT",
            Phase::EndedUnknown => "ENDED_UNKNOWN",
            Phase::Cancelled => "CANCELLED",
        }
    }
}

/// Coarse bucket used by counters and tab filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseGroup {
    Upcoming,
    Live,
    Ended,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTag {
    Green,
    Orange,
    Blue,
    Red,
    Gray,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub phase: Phase,
    pub can_join: bool,
    pub can_register: bool,
    pub show_meeting_link: bool,
    pub minutes_until_start: Option<i64>,
    pub color_tag: ColorTag,
    pub label: &'static str,
}

pub fn evaluate(
    session: &Session,
    registration: &Registration,
    role: Role,
    now: DateTime<Utc>,
) -> DisplayState {
    let attendance = registration.attendance_status;
    let unregistered = attendance == AttendanceStatus::None;
    let start = session.scheduled_at;
    let end = TimeDelta::try_minutes(session.effective_duration_minutes())
        .and_then(|duration| start.checked_add_signed(duration))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let join_opens = start
        .checked_sub_signed(TimeDelta::minutes(JOIN_WINDOW_LEAD_MINUTES))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let (phase, can_join, can_register, minutes_until_start) =
        if session.backend_status == BackendStatus::Cancelled {
            (Phase::Cancelled, false, false, None)
        } else if now < join_opens {
            (
                Phase::ScheduledFar,
                false,
                unregistered,
                Some(minutes_until(start, now)),
            )
        } else if now <= end {
            if now < start {
                (
                    Phase::ScheduledJoinable,
                    true,
                    unregistered,
                    Some(minutes_until(start, now).max(0)),
                )
            } else {
                (Phase::Live, true, false, None)
            }
        } else {
            let phase = match attendance {
                AttendanceStatus::Attended => Phase::EndedAttended,
                AttendanceStatus::Absent => Phase::EndedAbsent,
                AttendanceStatus::None | AttendanceStatus::Registered => Phase::EndedUnknown,
            };
            (phase, false, false, None)
        };

    DisplayState {
        phase,
        can_join,
        can_register,
        show_meeting_link: meeting_link_visible(session, attendance, role, phase),
        minutes_until_start,
        color_tag: phase.color_tag(),
        label: label(phase, role),
    }
}

pub fn evaluate_entry(entry: &SessionEntry, role: Role, now: DateTime<Utc>) -> DisplayState {
    evaluate(&entry.session, &entry.registration, role, now)
}

fn meeting_link_visible(
    session: &Session,
    attendance: AttendanceStatus,
    role: Role,
    phase: Phase,
) -> bool {
    if phase == Phase::Cancelled || session.meeting_url().is_none() {
        return false;
    }
    role.is_staff()
        || matches!(
            attendance,
            AttendanceStatus::Registered | AttendanceStatus::Attended
        )
}

/// Whole minutes until `start`, rounded up.
fn minutes_until(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let delta = start - now;
    let seconds = delta.num_seconds() + i64::from(delta.subsec_nanos() > 0);
    seconds.div_euclid(60) + i64::from(seconds.rem_euclid(60) != 0)
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
