mod definition;
mod format;
mod occurrence;

pub use definition::{AlarmDefinition, Category, DaySet, Difficulty};
pub use format::{format_countdown, format_days, format_time};
pub use occurrence::{next_occurrence, resolve_next, Upcoming};
