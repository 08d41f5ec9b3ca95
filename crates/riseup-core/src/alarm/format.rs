//! Human-readable rendering of alarm fields.

use chrono::{NaiveDateTime, NaiveTime, Weekday};

use super::definition::DaySet;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Summarize a day set: "Every day", "Once", "Weekdays", "Weekends",
/// otherwise the abbreviated names Sunday first.
pub fn format_days(days: DaySet) -> String {
    if days == DaySet::every_day() {
        return "Every day".into();
    }
    if days.is_empty() {
        return "Once".into();
    }
    if days == DaySet::weekdays() {
        return "Weekdays".into();
    }
    if days == DaySet::weekends() {
        return "Weekends".into();
    }
    days.iter()
        .map(|day: Weekday| DAY_NAMES[day.num_days_from_sunday() as usize])
        .collect::<Vec<_>>()
        .join(", ")
}

/// 12-hour clock time, e.g. "7:05 AM".
pub fn format_time(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Time remaining until `at`, e.g. "in 2h 5m". Anything under a minute
/// reads "in less than a minute".
pub fn format_countdown(now: NaiveDateTime, at: NaiveDateTime) -> String {
    let total_min = (at - now).num_minutes();
    if total_min < 1 {
        return "in less than a minute".into();
    }
    let days = total_min / (24 * 60);
    let hours = (total_min % (24 * 60)) / 60;
    let minutes = total_min % 60;
    match (days, hours) {
        (0, 0) => format!("in {minutes}m"),
        (0, _) => format!("in {hours}h {minutes}m"),
        _ => format!("in {days}d {hours}h {minutes}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn named_day_sets() {
        assert_eq!(format_days(DaySet::every_day()), "Every day");
        assert_eq!(format_days(DaySet::empty()), "Once");
        assert_eq!(format_days(DaySet::weekdays()), "Weekdays");
        assert_eq!(format_days(DaySet::weekends()), "Weekends");
    }

    #[test]
    fn arbitrary_day_set_lists_names() {
        let days = DaySet::from_weekdays([Weekday::Fri, Weekday::Mon, Weekday::Wed]);
        assert_eq!(format_days(days), "Mon, Wed, Fri");
    }

    #[test]
    fn twelve_hour_time() {
        assert_eq!(format_time(NaiveTime::from_hms_opt(7, 5, 0).unwrap()), "7:05 AM");
        assert_eq!(format_time(NaiveTime::from_hms_opt(19, 30, 0).unwrap()), "7:30 PM");
    }

    #[test]
    fn countdown() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        assert_eq!(format_countdown(now, now + Duration::seconds(30)), "in less than a minute");
        assert_eq!(format_countdown(now, now + Duration::minutes(42)), "in 42m");
        assert_eq!(format_countdown(now, now + Duration::minutes(125)), "in 2h 5m");
        assert_eq!(
            format_countdown(now, now + Duration::days(6) + Duration::hours(1)),
            "in 6d 1h 0m"
        );
    }
}
