//! Property tests for next-occurrence calculation.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use proptest::prelude::*;
use riseup_core::alarm::{AlarmDefinition, DaySet};
use riseup_core::{next_occurrence, resolve_next};

fn datetime() -> impl Strategy<Value = NaiveDateTime> {
    // Any minute of 2024, plus seconds.
    (0i64..366 * 24 * 60, 0u32..60).prop_map(|(minutes, secs)| {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, secs)
            .unwrap()
            + Duration::minutes(minutes)
    })
}

fn recurring_alarm() -> impl Strategy<Value = AlarmDefinition> {
    (1u8..128, datetime()).prop_map(|(mask, time)| {
        let days: Vec<u8> = (0..7).filter(|bit| mask & (1 << bit) != 0).collect();
        AlarmDefinition::new(time, DaySet::from(days))
    })
}

proptest! {
    #[test]
    fn test_recurring_occurrence_is_strictly_after_now(alarm in recurring_alarm(), now in datetime()) {
        let next = next_occurrence(&alarm, now).unwrap();
        prop_assert!(next > now);
        prop_assert!(next - now <= Duration::days(7));
    }

    #[test]
    fn test_recurring_occurrence_matches_day_and_time(alarm in recurring_alarm(), now in datetime()) {
        let next = next_occurrence(&alarm, now).unwrap();
        prop_assert!(alarm.days.contains(next.weekday()));
        prop_assert_eq!(next.hour(), alarm.time.hour());
        prop_assert_eq!(next.minute(), alarm.time.minute());
        prop_assert_eq!(next.second(), 0);
    }

    #[test]
    fn test_no_earlier_matching_slot_is_skipped(alarm in recurring_alarm(), now in datetime()) {
        let next = next_occurrence(&alarm, now).unwrap();
        let mut probe = next - Duration::days(1);
        while probe > now {
            prop_assert!(!alarm.days.contains(probe.weekday()));
            probe -= Duration::days(1);
        }
    }

    #[test]
    fn test_occurrence_is_deterministic(alarm in recurring_alarm(), now in datetime()) {
        prop_assert_eq!(next_occurrence(&alarm, now), next_occurrence(&alarm, now));
    }

    #[test]
    fn test_one_shot_is_its_own_time_or_nothing(time in datetime(), now in datetime()) {
        let alarm = AlarmDefinition::new(time, DaySet::empty());
        let expected = (time > now).then_some(time);
        prop_assert_eq!(next_occurrence(&alarm, now), expected);
    }

    #[test]
    fn test_resolve_next_is_minimum(
        alarms in prop::collection::vec(recurring_alarm(), 0..6),
        now in datetime(),
    ) {
        let minimum = alarms.iter().filter_map(|a| next_occurrence(a, now)).min();
        prop_assert_eq!(resolve_next(&alarms, now).map(|u| u.at), minimum);
    }
}
