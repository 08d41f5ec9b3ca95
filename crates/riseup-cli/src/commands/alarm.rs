use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Subcommand};
use riseup_core::alarm::{format_countdown, format_days, format_time};
use riseup_core::catalog::SOUND_OPTIONS;
use riseup_core::storage::{self, AlarmStore};
use riseup_core::{
    resolve_next, AlarmDefinition, Category, DaySet, Difficulty, Settings, ValidationError,
};

#[derive(Subcommand)]
pub enum AlarmAction {
    /// List all alarms
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an alarm
    Add {
        /// Time of day (HH:MM, 24-hour)
        #[arg(long)]
        time: String,
        #[command(flatten)]
        fields: AlarmFields,
    },
    /// Edit an existing alarm
    Edit {
        /// Alarm ID
        id: String,
        /// Time of day (HH:MM, 24-hour)
        #[arg(long)]
        time: Option<String>,
        #[command(flatten)]
        fields: AlarmFields,
    },
    /// Enable or disable an alarm
    Toggle {
        /// Alarm ID
        id: String,
    },
    /// Delete an alarm
    Delete {
        /// Alarm ID
        id: String,
    },
    /// Print the next alarm to ring as JSON
    Next,
}

#[derive(Args)]
pub struct AlarmFields {
    /// Date for a one-time alarm (YYYY-MM-DD). Defaults to the next time
    /// the given time of day comes around.
    #[arg(long)]
    date: Option<String>,
    /// Repeat days: "mon,wed,fri", "weekdays", "weekends", "daily" or "once"
    #[arg(long)]
    days: Option<String>,
    /// Label shown when ringing
    #[arg(long)]
    label: Option<String>,
    /// Message shown when ringing
    #[arg(long)]
    message: Option<String>,
    /// work, exercise, meditation or general
    #[arg(long)]
    category: Option<String>,
    /// easy, medium or hard
    #[arg(long)]
    difficulty: Option<String>,
    /// Sound file name
    #[arg(long)]
    sound: Option<String>,
    /// Volume between 0 and 1
    #[arg(long)]
    volume: Option<f32>,
    /// Offer snoozing while ringing
    #[arg(long)]
    snooze: Option<bool>,
    /// Snooze length in minutes
    #[arg(long)]
    snooze_minutes: Option<u32>,
    /// Snoozes allowed per ring
    #[arg(long)]
    max_snoozes: Option<u32>,
}

fn parse_time(s: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| ValidationError::InvalidTime(s.into()))
}

fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(s.into()))
}

/// Date-time stored for the alarm. Recurring alarms only use the time of
/// day; one-time alarms without a date get the next matching instant.
fn resolve_time(
    time: NaiveTime,
    date: Option<NaiveDate>,
    days: DaySet,
    now: NaiveDateTime,
) -> NaiveDateTime {
    if let Some(date) = date {
        return date.and_time(time);
    }
    let today = now.date().and_time(time);
    if days.is_empty() && today <= now {
        today + chrono::Duration::days(1)
    } else {
        today
    }
}

/// Seed a new alarm with the user's configured defaults.
fn apply_settings(alarm: &mut AlarmDefinition, settings: &Settings) {
    alarm.snooze_enabled = settings.snooze_enabled;
    alarm.snooze_duration_min = settings.snooze_duration_min;
    alarm.fade_in_secs = settings.fade_in_secs;
    alarm.vibration_enabled = settings.vibration_enabled;
    alarm.volume = settings.sound_volume as f32;
}

impl AlarmFields {
    /// Apply every field that was given, leaving the rest as they are.
    fn apply(
        &self,
        alarm: &mut AlarmDefinition,
        time: Option<NaiveTime>,
        now: NaiveDateTime,
    ) -> Result<(), ValidationError> {
        if let Some(days) = &self.days {
            alarm.days = days.parse()?;
        }
        let date = self.date.as_deref().map(parse_date).transpose()?;
        if time.is_some() || date.is_some() || self.days.is_some() {
            let time = time.unwrap_or_else(|| alarm.time_of_day());
            alarm.time = resolve_time(time, date, alarm.days, now);
        }
        if let Some(label) = &self.label {
            alarm.label = label.clone();
        }
        if let Some(message) = &self.message {
            alarm.motivational_message = message.clone();
        }
        if let Some(category) = &self.category {
            alarm.category = category.parse::<Category>()?;
        }
        if let Some(difficulty) = &self.difficulty {
            alarm.difficulty = difficulty.parse::<Difficulty>()?;
        }
        if let Some(sound) = &self.sound {
            if !SOUND_OPTIONS.iter().any(|o| o.file == sound.as_str()) {
                return Err(ValidationError::InvalidValue {
                    field: "sound".into(),
                    message: format!("unknown sound '{sound}'"),
                });
            }
            alarm.sound_file = sound.clone();
        }
        if let Some(volume) = self.volume {
            if !(0.0..=1.0).contains(&volume) {
                return Err(ValidationError::InvalidValue {
                    field: "volume".into(),
                    message: "must be between 0 and 1".into(),
                });
            }
            alarm.volume = volume;
        }
        if let Some(snooze) = self.snooze {
            alarm.snooze_enabled = snooze;
        }
        if let Some(minutes) = self.snooze_minutes {
            alarm.snooze_duration_min = minutes;
        }
        if let Some(max) = self.max_snoozes {
            alarm.max_snoozes = max;
        }
        Ok(())
    }
}

fn open_store(now: NaiveDateTime) -> Result<AlarmStore, Box<dyn std::error::Error>> {
    let store = storage::open_alarm_store()?;
    store.load(now)?;
    Ok(store)
}

pub fn run(action: AlarmAction) -> Result<(), Box<dyn std::error::Error>> {
    let now = Local::now().naive_local();
    let store = open_store(now)?;

    match action {
        AlarmAction::List { json } => {
            let alarms = store.alarms()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&alarms)?);
            } else if alarms.is_empty() {
                println!("no alarms");
            } else {
                for alarm in &alarms {
                    println!(
                        "{}  {:>8}  {:<20}  {:<3}  {}",
                        alarm.id,
                        format_time(alarm.time_of_day()),
                        format_days(alarm.days),
                        if alarm.enabled { "on" } else { "off" },
                        alarm.display_label(),
                    );
                }
            }
        }
        AlarmAction::Add { time, fields } => {
            let time = parse_time(&time)?;
            let days = match &fields.days {
                Some(days) => days.parse::<DaySet>()?,
                None => DaySet::empty(),
            };
            let mut alarm = AlarmDefinition::new(now.date().and_time(time), days);
            apply_settings(&mut alarm, storage::open_settings()?.get());
            fields.apply(&mut alarm, Some(time), now)?;
            let alarm = store.add(alarm)?;
            println!("{}", serde_json::to_string_pretty(&alarm)?);
        }
        AlarmAction::Edit { id, time, fields } => {
            let mut alarm = store.get(&id)?;
            let time = time.as_deref().map(parse_time).transpose()?;
            fields.apply(&mut alarm, time, now)?;
            store.update(alarm.clone())?;
            println!("{}", serde_json::to_string_pretty(&alarm)?);
        }
        AlarmAction::Toggle { id } => {
            let enabled = store.toggle(&id)?;
            println!("{id} {}", if enabled { "enabled" } else { "disabled" });
        }
        AlarmAction::Delete { id } => {
            store.delete(&id)?;
            println!("deleted {id}");
        }
        AlarmAction::Next => {
            let alarms = store.alarms()?;
            let next = resolve_next(&alarms, now).map(|upcoming| {
                serde_json::json!({
                    "alarm_id": upcoming.alarm.id,
                    "label": upcoming.alarm.display_label(),
                    "at": upcoming.at,
                    "countdown": format_countdown(now, upcoming.at),
                })
            });
            println!("{}", serde_json::to_string_pretty(&next)?);
        }
    }
    Ok(())
}
