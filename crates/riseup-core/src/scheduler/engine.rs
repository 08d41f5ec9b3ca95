//! Alarm triggering state machine.
//!
//! Like the rest of the core this is a synchronous state machine with no
//! internal threads or timers: the host calls [`AlarmScheduler::evaluate`]
//! on every tick and passes in the current time.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --(occurrence due within the firing window)--> Ringing
//! Ringing --(dismiss)--> Idle
//! ```
//!
//! ## Firing window
//!
//! An occurrence `t` rings only if it is evaluated at some `now` with
//! `0 <= now - t < 60s`. Occurrences that come due while nothing evaluates
//! (process suspended, ticks missed) and are more than a minute old by the
//! next evaluation are reported as missed and never ring.
//!
//! The scheduler remembers the instant of its last evaluation (the
//! watermark). Only occurrences strictly after the watermark are
//! considered, so an occurrence that has already rung and been dismissed
//! cannot ring again for the same slot.
//!
//! A watermark ahead of `now` means the host clock went backwards. It is
//! pulled back to the start of the firing window so occurrences between
//! the corrected time and the old watermark still ring; the last slot that
//! rang is remembered separately and never rings twice.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::alarm::{next_occurrence, resolve_next, AlarmDefinition, Upcoming};
use crate::error::StorageError;
use crate::events::Event;

/// Interval between periodic evaluations.
pub const CHECK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// How late an occurrence may be evaluated and still ring, in seconds.
pub const FIRING_WINDOW_SECS: i64 = 60;

pub fn firing_window() -> Duration {
    Duration::seconds(FIRING_WINDOW_SECS)
}

/// Read access to the current alarm collection.
pub trait AlarmSource {
    /// Snapshot of all alarms. An error means the collection is
    /// temporarily unreadable.
    fn snapshot(&self) -> Result<Vec<AlarmDefinition>, StorageError>;
}

impl AlarmSource for [AlarmDefinition] {
    fn snapshot(&self) -> Result<Vec<AlarmDefinition>, StorageError> {
        Ok(self.to_vec())
    }
}

impl AlarmSource for Vec<AlarmDefinition> {
    fn snapshot(&self) -> Result<Vec<AlarmDefinition>, StorageError> {
        Ok(self.clone())
    }
}

/// What caused an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationTrigger {
    /// First check when the scheduler starts.
    Activation,
    /// Fixed-interval tick.
    Periodic,
    /// Host came back to the foreground.
    Foreground,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ringing {
    pub alarm: AlarmDefinition,
    /// The occurrence that rang.
    pub scheduled_for: NaiveDateTime,
    /// When the scheduler entered Ringing.
    pub since: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    Ringing(Ringing),
}

/// The soonest upcoming occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextTrigger {
    pub alarm_id: String,
    pub label: String,
    pub at: NaiveDateTime,
}

impl From<Upcoming<'_>> for NextTrigger {
    fn from(upcoming: Upcoming<'_>) -> Self {
        Self {
            alarm_id: upcoming.alarm.id.clone(),
            label: upcoming.alarm.label.clone(),
            at: upcoming.at,
        }
    }
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SchedulerView {
    pub is_ringing: bool,
    pub active_alarm: Option<AlarmDefinition>,
    pub next_trigger: Option<NextTrigger>,
}

/// Core scheduler state machine.
#[derive(Debug, Clone, Default)]
pub struct AlarmScheduler {
    state: SchedulerState,
    next: Option<NextTrigger>,
    /// Instant of the last successful evaluation. `None` before the first.
    watermark: Option<NaiveDateTime>,
    /// Alarm id and occurrence of the last slot that rang.
    last_rung: Option<(String, NaiveDateTime)>,
}

impl AlarmScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn is_ringing(&self) -> bool {
        matches!(self.state, SchedulerState::Ringing(_))
    }

    pub fn active_alarm(&self) -> Option<&AlarmDefinition> {
        match &self.state {
            SchedulerState::Ringing(ringing) => Some(&ringing.alarm),
            SchedulerState::Idle => None,
        }
    }

    pub fn next_trigger(&self) -> Option<&NextTrigger> {
        self.next.as_ref()
    }

    pub fn next_trigger_time(&self) -> Option<NaiveDateTime> {
        self.next.as_ref().map(|n| n.at)
    }

    pub fn view(&self) -> SchedulerView {
        SchedulerView {
            is_ringing: self.is_ringing(),
            active_alarm: self.active_alarm().cloned(),
            next_trigger: self.next.clone(),
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: NaiveDateTime) -> Event {
        Event::StateSnapshot {
            ringing: self.is_ringing(),
            active_alarm_id: self.active_alarm().map(|a| a.id.clone()),
            next_alarm_id: self.next.as_ref().map(|n| n.alarm_id.clone()),
            next_at: self.next_trigger_time(),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Run one evaluation tick.
    ///
    /// Triggers the soonest occurrence that is due within the firing
    /// window (unless something is already ringing) and refreshes the next
    /// trigger time.
    pub fn evaluate<S>(&mut self, source: &S, now: NaiveDateTime, trigger: EvaluationTrigger) -> Vec<Event>
    where
        S: AlarmSource + ?Sized,
    {
        let mut events = Vec::new();
        let Some(alarms) = read_alarms(source) else {
            // Treat as empty this tick; the watermark stays put so the
            // next successful tick still sees anything that came due.
            self.publish_next(None, now, &mut events);
            return events;
        };

        if self.is_ringing() {
            debug!(?trigger, "alarm already ringing, not checking for new triggers");
            self.publish_next(resolve_next(&alarms, now), now, &mut events);
            return events;
        }

        let window = firing_window();
        let watermark = match self.watermark {
            Some(w) if w > now => {
                warn!(
                    watermark = %w,
                    %now,
                    back_by_secs = (w - now).num_seconds(),
                    "clock moved backwards, rewinding watermark"
                );
                now - window
            }
            Some(w) => w,
            None => now - window,
        };
        let window_start = watermark.max(now - window);
        let candidates: Vec<AlarmDefinition> = alarms
            .iter()
            .filter(|alarm| !self.already_rang(alarm, window_start))
            .cloned()
            .collect();

        if watermark < window_start {
            // Every skipped slot is reported, one event each.
            for alarm in &alarms {
                let mut from = watermark;
                while let Some(due) = next_occurrence(alarm, from).filter(|d| *d <= window_start) {
                    from = due;
                    if self.is_last_rung(&alarm.id, due) {
                        continue;
                    }
                    let late_by = now - due;
                    warn!(
                        alarm_id = %alarm.id,
                        scheduled_for = %due,
                        late_by_secs = late_by.num_seconds(),
                        "occurrence missed the firing window, dropping"
                    );
                    events.push(Event::OccurrenceMissed {
                        alarm_id: alarm.id.clone(),
                        scheduled_for: due,
                        late_by_secs: late_by.num_seconds(),
                        at: now,
                    });
                }
            }
        }

        if let Some(due) = resolve_next(&candidates, window_start).filter(|u| u.at <= now) {
            info!(
                alarm_id = %due.alarm.id,
                label = %due.alarm.label,
                scheduled_for = %due.at,
                ?trigger,
                "alarm triggered"
            );
            events.push(Event::AlarmTriggered {
                alarm_id: due.alarm.id.clone(),
                label: due.alarm.label.clone(),
                scheduled_for: due.at,
                trigger,
                at: now,
            });
            self.last_rung = Some((due.alarm.id.clone(), due.at));
            self.state = SchedulerState::Ringing(Ringing {
                alarm: due.alarm.clone(),
                scheduled_for: due.at,
                since: now,
            });
        }

        self.watermark = Some(now);
        self.publish_next(resolve_next(&alarms, now), now, &mut events);
        events
    }

    /// Recompute the next trigger after the alarm collection changed.
    ///
    /// Never triggers; that is left to the next evaluation.
    pub fn alarms_changed<S>(&mut self, source: &S, now: NaiveDateTime) -> Vec<Event>
    where
        S: AlarmSource + ?Sized,
    {
        let mut events = Vec::new();
        let alarms = read_alarms(source).unwrap_or_default();
        self.publish_next(resolve_next(&alarms, now), now, &mut events);
        events
    }

    /// Stop the ringing alarm and recompute the next trigger.
    ///
    /// A no-op while idle.
    pub fn dismiss<S>(&mut self, source: &S, now: NaiveDateTime) -> Vec<Event>
    where
        S: AlarmSource + ?Sized,
    {
        let SchedulerState::Ringing(ringing) = std::mem::take(&mut self.state) else {
            debug!("dismiss while idle, ignoring");
            return Vec::new();
        };

        let rang_for_secs = (now - ringing.since).num_seconds();
        info!(alarm_id = %ringing.alarm.id, rang_for_secs, "alarm dismissed");
        self.watermark = Some(self.watermark.map_or(now, |w| w.max(now)));

        let mut events = vec![Event::AlarmDismissed {
            alarm_id: ringing.alarm.id,
            rang_for_secs,
            at: now,
        }];
        let alarms = read_alarms(source).unwrap_or_default();
        self.publish_next(resolve_next(&alarms, now), now, &mut events);
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn is_last_rung(&self, alarm_id: &str, at: NaiveDateTime) -> bool {
        self.last_rung
            .as_ref()
            .is_some_and(|(id, rung)| id == alarm_id && *rung == at)
    }

    /// Whether the alarm's next slot after `after` is the one that last rang.
    fn already_rang(&self, alarm: &AlarmDefinition, after: NaiveDateTime) -> bool {
        next_occurrence(alarm, after).is_some_and(|at| self.is_last_rung(&alarm.id, at))
    }

    fn publish_next(
        &mut self,
        upcoming: Option<Upcoming<'_>>,
        now: NaiveDateTime,
        events: &mut Vec<Event>,
    ) {
        let next = upcoming.map(NextTrigger::from);
        if next == self.next {
            return;
        }
        debug!(next = ?next.as_ref().map(|n| n.at), "next alarm changed");
        events.push(Event::NextAlarmChanged {
            alarm_id: next.as_ref().map(|n| n.alarm_id.clone()),
            next_at: next.as_ref().map(|n| n.at),
            at: now,
        });
        self.next = next;
    }
}

fn read_alarms<S: AlarmSource + ?Sized>(source: &S) -> Option<Vec<AlarmDefinition>> {
    match source.snapshot() {
        Ok(alarms) => Some(alarms),
        Err(e) => {
            warn!(error = %e, "alarm collection unreadable, treating as empty");
            None
        }
    }
}
