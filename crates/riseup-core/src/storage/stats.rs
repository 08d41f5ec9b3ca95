//! Wake-up statistics.
//!
//! Every dismissed alarm becomes a [`DailyRecord`] (one per calendar day,
//! the latest wins) and updates the running [`AlarmStats`]. Stats are
//! stored at `<data_dir>/stats.toml`.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::repository::Repository;
use crate::alarm::{format_time, Category};
use crate::error::StorageError;

/// Quotes a ringing session is assumed to show.
const QUOTES_PER_SESSION: u32 = 3;

const DEFAULT_AVERAGE_WAKE: &str = "7:00 AM";

fn default_average_wake() -> String {
    DEFAULT_AVERAGE_WAKE.to_string()
}

/// Running totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmStats {
    #[serde(default)]
    pub total_alarms: u32,
    /// Interactions recorded in the last seven days.
    #[serde(default)]
    pub alarms_this_week: u32,
    #[serde(default)]
    pub on_time_wakeups: u32,
    #[serde(default)]
    pub snooze_count: u32,
    #[serde(default = "default_average_wake")]
    pub average_wake_up_time: String,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub favorite_category: Category,
    #[serde(default)]
    pub quotes_shown: u32,
    #[serde(default)]
    pub last_alarm_at: Option<NaiveDateTime>,
}

impl Default for AlarmStats {
    fn default() -> Self {
        Self {
            total_alarms: 0,
            alarms_this_week: 0,
            on_time_wakeups: 0,
            snooze_count: 0,
            average_wake_up_time: default_average_wake(),
            streak_days: 0,
            favorite_category: Category::General,
            quotes_shown: 0,
            last_alarm_at: None,
        }
    }
}

/// One day's wake-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub alarm_time: NaiveDateTime,
    pub woke_at: NaiveDateTime,
    pub snoozes: u32,
    #[serde(default)]
    pub category: Category,
    pub on_time: bool,
}

/// On-disk shape of the stats file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsLedger {
    #[serde(default)]
    pub stats: AlarmStats,
    #[serde(default)]
    pub records: Vec<DailyRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyPerformance {
    pub total_days: u32,
    pub on_time_days: u32,
    /// Rounded on-time share, 0 when there are no records.
    pub percentage: u32,
}

pub struct StatsTracker {
    repo: Repository<StatsLedger>,
}

impl StatsTracker {
    pub fn new(repo: Repository<StatsLedger>) -> Self {
        Self { repo }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn stats(&self) -> &AlarmStats {
        &self.repo.get().stats
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.repo.get().records
    }

    pub fn streak_status(&self) -> String {
        match self.stats().streak_days {
            0 => "No streak".to_string(),
            1 => "1 day streak! Keep it up!".to_string(),
            n @ 2..=6 => format!("{n} day streak!"),
            n @ 7..=29 => format!("{n} day streak! You're on fire!"),
            n => format!("{n} day streak! You're unstoppable!"),
        }
    }

    /// On-time share over records dated within the last seven days.
    pub fn weekly_performance(&self, now: NaiveDateTime) -> WeeklyPerformance {
        let week: Vec<&DailyRecord> = within_week(self.records(), now).collect();
        let total_days = week.len() as u32;
        let on_time_days = week.iter().filter(|r| r.on_time).count() as u32;
        let percentage = if total_days == 0 {
            0
        } else {
            (f64::from(on_time_days) / f64::from(total_days) * 100.0).round() as u32
        };
        WeeklyPerformance {
            total_days,
            on_time_days,
            percentage,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Record a dismissed alarm. Replaces any record already stored for
    /// today and returns the new stats.
    pub fn record_interaction(
        &mut self,
        alarm_time: NaiveDateTime,
        woke_at: NaiveDateTime,
        snoozes: u32,
        category: Category,
        now: NaiveDateTime,
    ) -> Result<AlarmStats, StorageError> {
        let today = now.date();
        let on_time = snoozes == 0;
        let record = DailyRecord {
            date: today,
            alarm_time,
            woke_at,
            snoozes,
            category,
            on_time,
        };

        let stats = self.repo.update(|ledger| {
            ledger.records.retain(|r| r.date != today);
            ledger.records.push(record);

            let stats = &mut ledger.stats;
            stats.streak_days = next_streak(stats.streak_days, stats.last_alarm_at, on_time, today);
            stats.total_alarms += 1;
            stats.on_time_wakeups += u32::from(on_time);
            stats.snooze_count += snoozes;
            stats.quotes_shown += QUOTES_PER_SESSION;
            stats.last_alarm_at = Some(now);

            stats.alarms_this_week = within_week(&ledger.records, now).count() as u32;
            stats.favorite_category = favorite_category(&ledger.records);
            stats.average_wake_up_time =
                average_wake_time(&ledger.records).map_or_else(default_average_wake, format_time);

            stats.clone()
        })?;

        debug!(
            streak = stats.streak_days,
            total = stats.total_alarms,
            on_time,
            "recorded alarm interaction"
        );
        Ok(stats)
    }

    pub fn record_quote_shown(&mut self) -> Result<(), StorageError> {
        self.repo.update(|ledger| ledger.stats.quotes_shown += 1)
    }

    /// Clear stats and every daily record.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.repo.reset()
    }
}

fn next_streak(
    current: u32,
    last: Option<NaiveDateTime>,
    on_time: bool,
    today: NaiveDate,
) -> u32 {
    if !on_time {
        return 0;
    }
    match last.map(|at| at.date()) {
        Some(day) if day == today => current.max(1),
        Some(day) if today.pred_opt() == Some(day) => current + 1,
        _ => 1,
    }
}

fn within_week(records: &[DailyRecord], now: NaiveDateTime) -> impl Iterator<Item = &DailyRecord> {
    let cutoff = now.date() - Duration::days(7);
    records.iter().filter(move |r| r.date >= cutoff)
}

/// Most frequent category; ties go to the earlier entry of
/// [`Category::ALL`].
fn favorite_category(records: &[DailyRecord]) -> Category {
    let mut best = Category::General;
    let mut best_count = 0;
    for category in Category::ALL {
        let count = records.iter().filter(|r| r.category == category).count();
        if count > best_count {
            best = category;
            best_count = count;
        }
    }
    best
}

/// Mean time of day across records.
fn average_wake_time(records: &[DailyRecord]) -> Option<NaiveTime> {
    if records.is_empty() {
        return None;
    }
    let total: u64 = records
        .iter()
        .map(|r| u64::from(r.woke_at.num_seconds_from_midnight()))
        .sum();
    let mean = total / records.len() as u64;
    NaiveTime::from_num_seconds_from_midnight_opt(mean as u32, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn tracker() -> StatsTracker {
        StatsTracker::new(Repository::open(MemoryBackend::new()))
    }

    fn wake(tracker: &mut StatsTracker, day: u32, snoozes: u32, category: Category) -> AlarmStats {
        tracker
            .record_interaction(at(day, 7, 0), at(day, 7, 5), snoozes, category, at(day, 7, 5))
            .unwrap()
    }

    #[test]
    fn defaults() {
        let tracker = tracker();
        assert_eq!(tracker.stats(), &AlarmStats::default());
        assert_eq!(tracker.stats().average_wake_up_time, "7:00 AM");
        assert_eq!(tracker.streak_status(), "No streak");
    }

    #[test]
    fn streak_grows_on_consecutive_days() {
        let mut tracker = tracker();
        assert_eq!(wake(&mut tracker, 1, 0, Category::Work).streak_days, 1);
        assert_eq!(wake(&mut tracker, 2, 0, Category::Work).streak_days, 2);
        assert_eq!(wake(&mut tracker, 3, 0, Category::Work).streak_days, 3);
        assert_eq!(tracker.streak_status(), "3 day streak!");
    }

    #[test]
    fn streak_restarts_after_gap_and_breaks_on_snooze() {
        let mut tracker = tracker();
        wake(&mut tracker, 1, 0, Category::General);
        wake(&mut tracker, 2, 0, Category::General);
        assert_eq!(wake(&mut tracker, 5, 0, Category::General).streak_days, 1);
        assert_eq!(wake(&mut tracker, 6, 2, Category::General).streak_days, 0);
    }

    #[test]
    fn same_day_replaces_record() {
        let mut tracker = tracker();
        wake(&mut tracker, 1, 0, Category::General);
        let stats = wake(&mut tracker, 1, 1, Category::Exercise);
        assert_eq!(tracker.records().len(), 1);
        assert_eq!(tracker.records()[0].snoozes, 1);
        assert_eq!(stats.total_alarms, 2);
        assert_eq!(stats.snooze_count, 1);
        assert_eq!(stats.on_time_wakeups, 1);
        assert_eq!(stats.quotes_shown, 6);
    }

    #[test]
    fn derived_fields() {
        let mut tracker = tracker();
        tracker
            .record_interaction(at(1, 6, 0), at(1, 6, 0), 0, Category::Exercise, at(1, 6, 0))
            .unwrap();
        let stats = tracker
            .record_interaction(at(2, 8, 0), at(2, 8, 0), 0, Category::Exercise, at(2, 8, 0))
            .unwrap();
        assert_eq!(stats.average_wake_up_time, "7:00 AM");
        assert_eq!(stats.favorite_category, Category::Exercise);
        assert_eq!(stats.alarms_this_week, 2);
    }

    #[test]
    fn weekly_performance_ignores_old_records() {
        let mut tracker = tracker();
        wake(&mut tracker, 1, 0, Category::General);
        wake(&mut tracker, 10, 1, Category::General);
        wake(&mut tracker, 11, 0, Category::General);
        let perf = tracker.weekly_performance(at(12, 9, 0));
        assert_eq!(
            perf,
            WeeklyPerformance {
                total_days: 2,
                on_time_days: 1,
                percentage: 50,
            }
        );
        assert_eq!(tracker.weekly_performance(at(30, 9, 0)).percentage, 0);
    }

    #[test]
    fn streak_status_tiers() {
        let mut tracker = tracker();
        for day in 1..=8 {
            wake(&mut tracker, day, 0, Category::General);
        }
        assert_eq!(tracker.streak_status(), "8 day streak! You're on fire!");
    }

    #[test]
    fn quotes_and_reset() {
        let mut tracker = tracker();
        tracker.record_quote_shown().unwrap();
        wake(&mut tracker, 1, 0, Category::General);
        assert_eq!(tracker.stats().quotes_shown, 4);
        tracker.reset().unwrap();
        assert_eq!(tracker.stats(), &AlarmStats::default());
        assert!(tracker.records().is_empty());
    }

    #[test]
    fn ledger_roundtrips_through_toml() {
        let mut tracker = tracker();
        wake(&mut tracker, 1, 0, Category::Meditation);
        let ledger = StatsLedger {
            stats: tracker.stats().clone(),
            records: tracker.records().to_vec(),
        };
        let text = toml::to_string_pretty(&ledger).unwrap();
        let parsed: StatsLedger = toml::from_str(&text).unwrap();
        assert_eq!(parsed, ledger);
    }
}
