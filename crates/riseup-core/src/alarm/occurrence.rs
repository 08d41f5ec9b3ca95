//! Occurrence calculation.
//!
//! Pure functions of `(alarms, now)`. All times are local wall-clock
//! `NaiveDateTime`s; no timezone handling beyond what the host clock gives.

use chrono::{Datelike, Days, NaiveDateTime};
use serde::Serialize;

use super::definition::AlarmDefinition;

/// Days scanned ahead of today. Eight days (today plus a full week) so that
/// a recurring alarm whose only matching day is today, with today's time
/// already passed, lands on the same weekday next week.
const SCAN_DAYS: u64 = 8;

/// Earliest date-time strictly after `now` at which `alarm` rings.
///
/// Disabled alarms and expired one-shot alarms yield `None`.
pub fn next_occurrence(alarm: &AlarmDefinition, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if !alarm.enabled {
        return None;
    }

    if alarm.is_one_shot() {
        return (alarm.time > now).then_some(alarm.time);
    }

    let time_of_day = alarm.time_of_day();
    let today = now.date();
    (0..SCAN_DAYS)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter(|date| alarm.days.contains(date.weekday()))
        .map(|date| date.and_time(time_of_day))
        .find(|candidate| *candidate > now)
}

/// The soonest occurrence across a set of alarms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Upcoming<'a> {
    pub alarm: &'a AlarmDefinition,
    pub at: NaiveDateTime,
}

/// Soonest occurrence strictly after `now` across all enabled alarms.
///
/// Ties go to the alarm that appears first in `alarms`.
pub fn resolve_next(alarms: &[AlarmDefinition], now: NaiveDateTime) -> Option<Upcoming<'_>> {
    alarms
        .iter()
        .filter(|alarm| alarm.enabled)
        .filter_map(|alarm| next_occurrence(alarm, now).map(|at| Upcoming { alarm, at }))
        .min_by_key(|upcoming| upcoming.at)
}
