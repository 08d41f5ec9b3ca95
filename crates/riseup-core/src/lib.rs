//! # Riseup Core Library
//!
//! This library provides the core logic for the Riseup alarm clock. All
//! operations are available through the `riseup` CLI; any graphical front
//! end is meant to be a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Alarm**: alarm definitions and the pure next-occurrence math
//! - **Scheduler**: a wall-clock state machine that decides when an alarm
//!   rings, plus a tokio task that drives it on a fixed interval, on
//!   foreground transitions and on alarm store changes
//! - **Storage**: TOML-backed alarm store, settings and wake-up statistics
//! - **Challenge**: the task the user completes to dismiss a ringing alarm
//!
//! ## Key Components
//!
//! - [`AlarmScheduler`]: Core scheduler state machine
//! - [`SchedulerRuntime`]: Async host for the scheduler
//! - [`AlarmStore`]: Alarm persistence with change notification
//! - [`Settings`]: Application settings management

pub mod alarm;
pub mod catalog;
pub mod challenge;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod storage;

pub use alarm::{next_occurrence, resolve_next, AlarmDefinition, Category, DaySet, Difficulty};
pub use challenge::{Challenge, ChallengeInput, ChallengeKind, MathProblem, Progress};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use scheduler::{
    AlarmScheduler, AppLifecycle, Clock, EvaluationTrigger, LifecycleNotifier, SchedulerHandle,
    SchedulerRuntime, SchedulerView, SystemClock,
};
pub use storage::{AlarmStore, Repository, Settings, StatsTracker};
