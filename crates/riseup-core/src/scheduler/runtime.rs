//! Async host for the scheduler state machine.
//!
//! One tokio task owns the [`AlarmScheduler`] and evaluates it when:
//!
//! - the task starts (activation),
//! - the periodic check interval elapses,
//! - the host reports it came back to the foreground.
//!
//! Alarm store changes only recompute the next trigger. Dismissals arrive
//! as commands through the [`SchedulerHandle`]. Every evaluation runs to
//! completion before the next input is looked at, so there is no
//! concurrent access to the state machine.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use super::clock::Clock;
use super::engine::{AlarmScheduler, EvaluationTrigger, SchedulerView, CHECK_INTERVAL};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::storage::AlarmStore;

/// Host application lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycle {
    Foreground,
    Background,
}

/// Broadcasts lifecycle transitions to running schedulers.
#[derive(Debug, Clone)]
pub struct LifecycleNotifier {
    tx: broadcast::Sender<AppLifecycle>,
}

impl LifecycleNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Report a transition. Returns how many schedulers received it.
    pub fn notify(&self, state: AppLifecycle) -> usize {
        self.tx.send(state).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppLifecycle> {
        self.tx.subscribe()
    }

    /// Number of live subscriptions.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LifecycleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    pub check_interval: std::time::Duration,
    /// Events buffered per subscriber before slow subscribers lag.
    pub event_capacity: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            check_interval: CHECK_INTERVAL,
            event_capacity: 64,
        }
    }
}

enum Command {
    Dismiss(oneshot::Sender<SchedulerView>),
    Shutdown,
}

pub struct SchedulerRuntime;

impl SchedulerRuntime {
    /// Start the scheduler task on the current tokio runtime.
    ///
    /// The store should already be loaded; an unloaded store reads as an
    /// empty alarm set until it is.
    pub fn spawn(
        store: Arc<AlarmStore>,
        clock: Arc<dyn Clock>,
        lifecycle: &LifecycleNotifier,
        options: RuntimeOptions,
    ) -> SchedulerHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(SchedulerView::default());
        let (events_tx, _) = broadcast::channel(options.event_capacity.max(1));

        let inputs = Inputs {
            lifecycle: lifecycle.subscribe(),
            changes: store.subscribe(),
            commands: commands_rx,
        };
        let worker = Worker {
            scheduler: AlarmScheduler::new(),
            store,
            clock,
            view: view_tx,
            events: events_tx.clone(),
        };
        let task = tokio::spawn(run(worker, inputs, options.check_interval));

        SchedulerHandle {
            commands: commands_tx,
            view: view_rx,
            events: events_tx,
            task: Some(task),
        }
    }
}

/// Owner-side handle to a running scheduler. Dropping it stops the task.
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<SchedulerView>,
    events: broadcast::Sender<Event>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Latest published view.
    pub fn view(&self) -> SchedulerView {
        self.view.borrow().clone()
    }

    /// A receiver that is notified whenever the view changes.
    pub fn watch(&self) -> watch::Receiver<SchedulerView> {
        self.view.clone()
    }

    /// Events published from now on. Earlier events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the ringing alarm. Returns the view after the dismissal.
    pub async fn dismiss(&self) -> Result<SchedulerView> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Dismiss(reply_tx))
            .map_err(|_| CoreError::RuntimeStopped)?;
        reply_rx.await.map_err(|_| CoreError::RuntimeStopped)
    }

    /// Stop the task and wait for it to exit. Releases the lifecycle and
    /// store subscriptions.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "scheduler task ended abnormally");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Inputs {
    lifecycle: broadcast::Receiver<AppLifecycle>,
    changes: watch::Receiver<u64>,
    commands: mpsc::UnboundedReceiver<Command>,
}

struct Worker {
    scheduler: AlarmScheduler,
    store: Arc<AlarmStore>,
    clock: Arc<dyn Clock>,
    view: watch::Sender<SchedulerView>,
    events: broadcast::Sender<Event>,
}

impl Worker {
    fn evaluate(&mut self, trigger: EvaluationTrigger) {
        let now = self.clock.now();
        debug!(?trigger, %now, "evaluating alarms");
        let events = self.scheduler.evaluate(self.store.as_ref(), now, trigger);
        self.publish(events);
    }

    fn alarms_changed(&mut self) {
        let now = self.clock.now();
        let events = self.scheduler.alarms_changed(self.store.as_ref(), now);
        self.publish(events);
    }

    fn dismiss(&mut self) -> SchedulerView {
        let now = self.clock.now();
        let events = self.scheduler.dismiss(self.store.as_ref(), now);
        self.publish(events);
        self.scheduler.view()
    }

    /// Update the view first so subscribers reacting to an event see the
    /// state it describes.
    fn publish(&mut self, events: Vec<Event>) {
        let view = self.scheduler.view();
        self.view.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }
}

async fn run(mut worker: Worker, inputs: Inputs, check_interval: std::time::Duration) {
    let Inputs {
        mut lifecycle,
        mut changes,
        mut commands,
    } = inputs;
    let mut lifecycle_open = true;
    let mut changes_open = true;

    let mut interval = time::interval(check_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;
    worker.evaluate(EvaluationTrigger::Activation);
    let now = worker.clock.now();
    let _ = worker.events.send(worker.scheduler.snapshot(now));

    loop {
        tokio::select! {
            _ = interval.tick() => worker.evaluate(EvaluationTrigger::Periodic),

            msg = lifecycle.recv(), if lifecycle_open => match msg {
                Ok(AppLifecycle::Foreground) => worker.evaluate(EvaluationTrigger::Foreground),
                Ok(AppLifecycle::Background) => debug!("host moved to background"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "lifecycle notifications lagged, evaluating");
                    worker.evaluate(EvaluationTrigger::Foreground);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("lifecycle notifier dropped");
                    lifecycle_open = false;
                }
            },

            changed = changes.changed(), if changes_open => match changed {
                Ok(()) => {
                    changes.borrow_and_update();
                    worker.alarms_changed();
                }
                Err(_) => {
                    debug!("alarm store dropped");
                    changes_open = false;
                }
            },

            cmd = commands.recv() => match cmd {
                Some(Command::Dismiss(reply)) => {
                    let view = worker.dismiss();
                    let _ = reply.send(view);
                }
                Some(Command::Shutdown) | None => break,
            },
        }
    }

    debug!("scheduler runtime stopped");
}
