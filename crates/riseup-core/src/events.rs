use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::scheduler::EvaluationTrigger;

/// Every scheduler state change produces an Event.
/// The CLI prints them; the presentation layer can subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Idle -> Ringing.
    AlarmTriggered {
        alarm_id: String,
        label: String,
        scheduled_for: NaiveDateTime,
        trigger: EvaluationTrigger,
        at: NaiveDateTime,
    },
    /// Ringing -> Idle.
    AlarmDismissed {
        alarm_id: String,
        rang_for_secs: i64,
        at: NaiveDateTime,
    },
    /// An occurrence came due while nothing was evaluating and is now
    /// outside the firing window. It will not ring.
    OccurrenceMissed {
        alarm_id: String,
        scheduled_for: NaiveDateTime,
        late_by_secs: i64,
        at: NaiveDateTime,
    },
    /// The soonest upcoming occurrence changed (or disappeared).
    NextAlarmChanged {
        alarm_id: Option<String>,
        next_at: Option<NaiveDateTime>,
        at: NaiveDateTime,
    },
    StateSnapshot {
        ringing: bool,
        active_alarm_id: Option<String>,
        next_alarm_id: Option<String>,
        next_at: Option<NaiveDateTime>,
        at: NaiveDateTime,
    },
}

impl Event {
    /// Short machine name, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::AlarmTriggered { .. } => "AlarmTriggered",
            Event::AlarmDismissed { .. } => "AlarmDismissed",
            Event::OccurrenceMissed { .. } => "OccurrenceMissed",
            Event::NextAlarmChanged { .. } => "NextAlarmChanged",
            Event::StateSnapshot { .. } => "StateSnapshot",
        }
    }
}
