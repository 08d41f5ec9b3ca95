//! Foreground alarm runner.
//!
//! Runs the scheduler runtime and prints every scheduler event and ringing
//! notice to stdout as one JSON object per line. Reads commands from stdin:
//!
//! - `fg` / `bg`: report lifecycle transitions (`fg` also re-reads the
//!   alarm file)
//! - `status`: print the scheduler view
//! - `quit`: stop
//!
//! While an alarm rings, other lines feed its dismissal challenge (`tap`,
//! `shake`, `swipe <fraction>`, or a number for arithmetic) and `snooze`
//! snoozes it when the alarm allows.
//!
//! Alarms edited by other `riseup` invocations are picked up by re-reading
//! the alarm file every `--reload` seconds.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use clap::Args;
use rand::rngs::ThreadRng;
use riseup_core::catalog::random_category_quote;
use riseup_core::challenge::{Challenge, ChallengeInput, Progress};
use riseup_core::scheduler::{AppLifecycle, Clock, LifecycleNotifier, RuntimeOptions, SystemClock};
use riseup_core::storage::{self, AlarmStore, StatsTracker};
use riseup_core::{AlarmDefinition, Event, SchedulerHandle, SchedulerRuntime, SchedulerView};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between periodic checks
    #[arg(long, default_value_t = 60)]
    interval: u64,
    /// Seconds between re-reads of the alarm file
    #[arg(long, default_value_t = 5)]
    reload: u64,
}

/// Output that does not come from the scheduler itself.
#[derive(Serialize)]
#[serde(tag = "type")]
enum Notice<'a> {
    Ringing {
        alarm_id: &'a str,
        label: &'a str,
        message: &'a str,
        sound: &'a str,
        volume: f32,
        prompt: String,
        snooze_available: bool,
    },
    Challenge {
        prompt: String,
        progress: Progress,
    },
    Quote {
        text: &'a str,
    },
    Snoozed {
        alarm_id: &'a str,
        until: NaiveDateTime,
        snoozes: u32,
    },
    WakeRecorded {
        alarm_id: &'a str,
        snoozes: u32,
        streak_days: u32,
        streak_status: String,
    },
    View {
        view: &'a SchedulerView,
    },
    Error {
        message: String,
    },
}

fn emit<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// The alarm currently demanding attention.
struct Ring {
    alarm: AlarmDefinition,
    scheduled_for: NaiveDateTime,
    challenge: Challenge,
    snoozes: u32,
    /// The scheduler still reports this alarm as ringing.
    held_by_scheduler: bool,
    snoozed_until: Option<Instant>,
}

enum Flow {
    Continue,
    Quit,
}

enum Command {
    Lifecycle(AppLifecycle),
    Status,
    Quit,
    Snooze,
    Input(ChallengeInput),
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let word = parts.next()?.to_ascii_lowercase();
    let command = match word.as_str() {
        "fg" | "foreground" => Command::Lifecycle(AppLifecycle::Foreground),
        "bg" | "background" => Command::Lifecycle(AppLifecycle::Background),
        "status" => Command::Status,
        "quit" | "exit" | "q" => Command::Quit,
        "snooze" => Command::Snooze,
        "tap" | "awake" => Command::Input(ChallengeInput::Tap),
        "shake" => Command::Input(ChallengeInput::Shake),
        "swipe" => {
            let fraction: f64 = parts.next()?.parse().ok()?;
            Command::Input(ChallengeInput::Swipe {
                translation: fraction,
                track_width: 1.0,
            })
        }
        other => Command::Input(ChallengeInput::Answer(other.parse().ok()?)),
    };
    Some(command)
}

struct Watcher {
    handle: SchedulerHandle,
    store: Arc<AlarmStore>,
    lifecycle: LifecycleNotifier,
    clock: Arc<dyn Clock>,
    stats: StatsTracker,
    rng: ThreadRng,
    ring: Option<Ring>,
    quote_every: Duration,
    next_quote: Instant,
}

impl Watcher {
    fn is_ringing(&self) -> bool {
        self.ring.as_ref().is_some_and(|r| r.snoozed_until.is_none())
    }

    fn snooze_deadline(&self) -> Option<Instant> {
        self.ring.as_ref().and_then(|r| r.snoozed_until)
    }

    fn on_event(&mut self, event: Event) -> Result<(), Box<dyn std::error::Error>> {
        emit(&event)?;
        let Event::AlarmTriggered { scheduled_for, .. } = event else {
            return Ok(());
        };
        let Some(alarm) = self.handle.view().active_alarm else {
            return Ok(());
        };
        if let Some(previous) = self.ring.take() {
            warn!(alarm_id = %previous.alarm.id, "snoozed alarm replaced by a new one");
        }
        let challenge = Challenge::for_difficulty(alarm.difficulty, &mut self.rng);
        self.ring = Some(Ring {
            alarm,
            scheduled_for,
            challenge,
            snoozes: 0,
            held_by_scheduler: true,
            snoozed_until: None,
        });
        self.announce()
    }

    fn announce(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(ring) = &self.ring else {
            return Ok(());
        };
        let alarm = &ring.alarm;
        let message = if alarm.motivational_message.is_empty() {
            random_category_quote(alarm.category, &mut self.rng)
        } else {
            alarm.motivational_message.as_str()
        };
        emit(&Notice::Ringing {
            alarm_id: &alarm.id,
            label: alarm.display_label(),
            message,
            sound: &alarm.sound_file,
            volume: alarm.volume,
            prompt: ring.challenge.prompt(),
            snooze_available: alarm.offers_snooze(ring.snoozes),
        })?;
        self.next_quote = Instant::now() + self.quote_every;
        Ok(())
    }

    fn on_quote_due(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.next_quote = Instant::now() + self.quote_every;
        let Some(ring) = &self.ring else {
            return Ok(());
        };
        let text = random_category_quote(ring.alarm.category, &mut self.rng);
        emit(&Notice::Quote { text })?;
        if let Err(e) = self.stats.record_quote_shown() {
            warn!(error = %e, "failed to record shown quote");
        }
        Ok(())
    }

    fn on_snooze_over(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(ring) = self.ring.as_mut() {
            ring.snoozed_until = None;
            ring.challenge = Challenge::for_difficulty(ring.alarm.difficulty, &mut self.rng);
        }
        self.announce()
    }

    async fn on_line(&mut self, line: &str) -> Result<Flow, Box<dyn std::error::Error>> {
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        let Some(command) = parse_command(line) else {
            emit(&Notice::Error {
                message: format!("unrecognised input: {line}"),
            })?;
            return Ok(Flow::Continue);
        };

        match command {
            Command::Lifecycle(state) => {
                if state == AppLifecycle::Foreground {
                    self.reload_alarms();
                }
                self.lifecycle.notify(state);
            }
            Command::Status => emit(&Notice::View {
                view: &self.handle.view(),
            })?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Snooze => self.snooze().await?,
            Command::Input(input) => self.feed_challenge(input).await?,
        }
        Ok(Flow::Continue)
    }

    /// Pick up alarm edits made by other processes. The scheduler
    /// recomputes through the store's change notification.
    fn reload_alarms(&self) {
        match self.store.reload() {
            Ok(true) => debug!("alarm file changed, reloaded"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "failed to re-read alarms, keeping current ones"),
        }
    }

    async fn snooze(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let available = self
            .ring
            .as_ref()
            .is_some_and(|r| r.snoozed_until.is_none() && r.alarm.offers_snooze(r.snoozes));
        if !available {
            return emit(&Notice::Error {
                message: "snooze is not available".into(),
            });
        }
        self.release_scheduler().await?;

        let now = self.clock.now();
        let Some(ring) = self.ring.as_mut() else {
            return Ok(());
        };
        let minutes = u64::from(ring.alarm.snooze_duration_min.max(1));
        let delay = Duration::from_secs(minutes * 60);
        ring.snoozes += 1;
        ring.snoozed_until = Some(Instant::now() + delay);
        emit(&Notice::Snoozed {
            alarm_id: &ring.alarm.id,
            until: now + chrono::Duration::minutes(minutes as i64),
            snoozes: ring.snoozes,
        })
    }

    async fn feed_challenge(&mut self, input: ChallengeInput) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_ringing() {
            return emit(&Notice::Error {
                message: "no alarm is ringing".into(),
            });
        }
        let Some(ring) = self.ring.as_mut() else {
            return Ok(());
        };
        let progress = ring.challenge.evaluate(input, &mut self.rng);
        if !progress.is_completed() {
            return emit(&Notice::Challenge {
                prompt: ring.challenge.prompt(),
                progress,
            });
        }

        self.release_scheduler().await?;
        let Some(ring) = self.ring.take() else {
            return Ok(());
        };
        let now = self.clock.now();
        let stats = self.stats.record_interaction(
            ring.scheduled_for,
            now,
            ring.snoozes,
            ring.alarm.category,
            now,
        )?;
        emit(&Notice::WakeRecorded {
            alarm_id: &ring.alarm.id,
            snoozes: ring.snoozes,
            streak_days: stats.streak_days,
            streak_status: self.stats.streak_status(),
        })
    }

    /// Dismiss the scheduler's ringing state if this ring still holds it.
    async fn release_scheduler(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let held = self.ring.as_ref().is_some_and(|r| r.held_by_scheduler);
        if held {
            self.handle.dismiss().await?;
            if let Some(ring) = self.ring.as_mut() {
                ring.held_by_scheduler = false;
            }
        }
        Ok(())
    }
}

pub fn run(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(watch(args))
}

async fn watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(storage::open_alarm_store()?);
    store.load(clock.now())?;
    let settings = storage::open_settings()?.get().clone();

    let lifecycle = LifecycleNotifier::new();
    let options = RuntimeOptions {
        check_interval: Duration::from_secs(args.interval.max(1)),
        ..RuntimeOptions::default()
    };
    let handle = SchedulerRuntime::spawn(Arc::clone(&store), Arc::clone(&clock), &lifecycle, options);
    let mut events = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let quote_every = Duration::from_secs(u64::from(settings.quote_interval_secs.max(1)));
    let mut reload = time::interval(Duration::from_secs(args.reload.max(1)));
    reload.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    reload.tick().await;

    let mut watcher = Watcher {
        handle,
        store,
        lifecycle,
        clock,
        stats: storage::open_stats()?,
        rng: rand::thread_rng(),
        ring: None,
        quote_every,
        next_quote: Instant::now() + quote_every,
    };

    // Print everything up to the activation snapshot before taking input.
    loop {
        match events.recv().await {
            Ok(event) => {
                let activated = matches!(event, Event::StateSnapshot { .. });
                watcher.on_event(event)?;
                if activated {
                    break;
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return Ok(()),
        }
    }

    loop {
        let ringing = watcher.is_ringing();
        let snooze_deadline = watcher.snooze_deadline();
        let next_quote = watcher.next_quote;

        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => watcher.on_event(event)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event output lagged"),
                Err(RecvError::Closed) => break,
            },

            _ = time::sleep_until(next_quote), if ringing => watcher.on_quote_due()?,

            _ = reload.tick() => watcher.reload_alarms(),

            _ = time::sleep_until(snooze_deadline.unwrap_or(next_quote)), if snooze_deadline.is_some() => {
                watcher.on_snooze_over()?;
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if let Flow::Quit = watcher.on_line(line.trim()).await? {
                    break;
                }
            }
        }
    }

    watcher.handle.shutdown().await;
    Ok(())
}
