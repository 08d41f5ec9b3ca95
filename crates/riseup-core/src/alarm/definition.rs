//! Alarm definitions as owned by the alarm store.
//!
//! Only `id`, `time`, `enabled` and `days` take part in scheduling. The
//! remaining fields are carried through unchanged for the ringing screen.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::ValidationError;

/// Set of weekdays on which a recurring alarm rings.
///
/// Stored as a bitmask indexed from Sunday (bit 0) to Saturday (bit 6),
/// serialized as a list of those indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
pub struct DaySet(u8);

impl DaySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Monday through Friday.
    pub const fn weekdays() -> Self {
        Self(0b0011_1110)
    }

    /// Saturday and Sunday.
    pub const fn weekends() -> Self {
        Self(0b0100_0001)
    }

    pub const fn every_day() -> Self {
        Self(0b0111_1111)
    }

    pub fn from_weekdays<I: IntoIterator<Item = Weekday>>(days: I) -> Self {
        let mut set = Self::empty();
        for day in days {
            set.insert(day);
        }
        set
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_sunday();
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !(1 << day.num_days_from_sunday());
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Days in the set, Sunday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        (0..7u8)
            .filter(move |i| self.0 & (1 << i) != 0)
            .map(weekday_from_sunday_index)
    }
}

fn weekday_from_sunday_index(index: u8) -> Weekday {
    match index {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

impl From<Vec<u8>> for DaySet {
    fn from(indices: Vec<u8>) -> Self {
        let mut set = Self::empty();
        for index in indices {
            if index < 7 {
                set.0 |= 1 << index;
            } else {
                tracing::warn!(index, "ignoring out-of-range day index");
            }
        }
        set
    }
}

impl From<DaySet> for Vec<u8> {
    fn from(set: DaySet) -> Self {
        (0..7u8).filter(|i| set.0 & (1 << i) != 0).collect()
    }
}

impl FromStr for DaySet {
    type Err = ValidationError;

    /// Parses `weekdays`, `weekends`, `daily`, `once` or a comma-separated
    /// list of day names (`mon,wed,fri`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "once" | "none" => return Ok(Self::empty()),
            "weekdays" => return Ok(Self::weekdays()),
            "weekends" => return Ok(Self::weekends()),
            "daily" | "every-day" | "everyday" => return Ok(Self::every_day()),
            _ => {}
        }
        let mut set = Self::empty();
        for part in s.split(',') {
            let day = part
                .trim()
                .parse::<Weekday>()
                .map_err(|_| ValidationError::InvalidDay(part.trim().to_string()))?;
            set.insert(day);
        }
        Ok(set)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Exercise,
    Meditation,
    #[default]
    General,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Work,
        Category::Exercise,
        Category::Meditation,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Exercise => "exercise",
            Category::Meditation => "meditation",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "category".into(),
                message: format!("'{s}' is not one of work, exercise, meditation, general"),
            })
    }
}

/// How hard the alarm is to dismiss. Picks the dismissal challenge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ValidationError::InvalidValue {
                field: "difficulty".into(),
                message: format!("'{other}' is not one of easy, medium, hard"),
            }),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_volume() -> f32 {
    0.8
}
fn default_fade_in_secs() -> u32 {
    30
}
fn default_snooze_duration_min() -> u32 {
    9
}
fn default_max_snoozes() -> u32 {
    3
}

/// A single alarm as persisted by the alarm store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmDefinition {
    /// Stable across edits.
    pub id: String,
    /// Local wall-clock time. Only hour and minute matter for recurring
    /// alarms; one-shot alarms use the full date-time.
    pub time: NaiveDateTime,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Empty for a one-shot alarm.
    #[serde(default)]
    pub days: DaySet,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub sound_file: String,
    #[serde(default)]
    pub motivational_message: String,
    /// 0.0 ..= 1.0
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_fade_in_secs")]
    pub fade_in_secs: u32,
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
    #[serde(default)]
    pub snooze_enabled: bool,
    #[serde(default = "default_snooze_duration_min")]
    pub snooze_duration_min: u32,
    #[serde(default = "default_max_snoozes")]
    pub max_snoozes: u32,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl AlarmDefinition {
    /// Create an enabled alarm with a fresh id and default payload.
    pub fn new(time: NaiveDateTime, days: DaySet) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            time,
            enabled: true,
            days,
            label: String::new(),
            sound_file: catalog::DEFAULT_SOUND.to_string(),
            motivational_message: String::new(),
            volume: default_volume(),
            fade_in_secs: default_fade_in_secs(),
            vibration_enabled: true,
            snooze_enabled: false,
            snooze_duration_min: default_snooze_duration_min(),
            max_snoozes: default_max_snoozes(),
            category: Category::General,
            difficulty: Difficulty::Easy,
        }
    }

    /// The alarm created when the store is empty: 07:00 on weekdays.
    pub fn new_default(now: NaiveDateTime) -> Self {
        let seven = NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default();
        let mut alarm = Self::new(now.date().and_time(seven), DaySet::weekdays());
        alarm.label = "Wake Up!".to_string();
        alarm.motivational_message = catalog::random_quote(&mut rand::thread_rng()).to_string();
        alarm
    }

    pub fn is_one_shot(&self) -> bool {
        self.days.is_empty()
    }

    /// Hour and minute of the alarm with seconds cleared.
    pub fn time_of_day(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.time.hour(), self.time.minute(), 0).unwrap_or_default()
    }

    /// Whether the ringing screen should offer a snooze action.
    pub fn offers_snooze(&self, snoozes_used: u32) -> bool {
        self.snooze_enabled && snoozes_used < self.max_snoozes
    }

    /// Label for display, falling back to a generic name.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            "Alarm"
        } else {
            &self.label
        }
    }
}
