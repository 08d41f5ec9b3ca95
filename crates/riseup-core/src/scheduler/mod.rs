mod clock;
mod engine;
mod runtime;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    firing_window, AlarmScheduler, AlarmSource, EvaluationTrigger, NextTrigger, Ringing,
    SchedulerState, SchedulerView, CHECK_INTERVAL, FIRING_WINDOW_SECS,
};
pub use runtime::{
    AppLifecycle, LifecycleNotifier, RuntimeOptions, SchedulerHandle, SchedulerRuntime,
};
