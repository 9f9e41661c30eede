pub mod duration;
mod engine;

pub use duration::{clamp_minutes, DurationInput, DEFAULT_MINUTES, DEFAULT_PRESETS, MAX_MINUTES, MIN_MINUTES};
pub use engine::{format_clock, PrimaryLabel, TimerEngine, TimerState, TimerStatus};
