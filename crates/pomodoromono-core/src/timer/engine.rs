//! Timer engine implementation.
//!
//! The timer engine is a decrementing state machine. It does not use
//! internal threads - the owner is responsible for calling `tick()` once per
//! cadence period while the engine is running (see [`crate::session`]).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused | Finished) -> Running
//!   ^_______________ reset / duration change ______|
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(25);
//! engine.start();
//! // Once per second:
//! engine.tick(); // Returns Some(Event::TimerCompleted) when time runs out
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::duration::{clamp_minutes, DEFAULT_MINUTES};
use crate::events::Event;
use crate::observer::{Observers, Subscription};
use crate::progress::ProgressSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Countdown reached zero while running.
    Finished,
}

/// What listeners receive on every transition and tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub remaining_seconds: u64,
    pub total_seconds: u64,
    pub is_running: bool,
    pub has_finished: bool,
}

impl TimerStatus {
    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot::map(self.remaining_seconds, self.total_seconds, self.has_finished)
    }
}

/// Label for the single main button, derived from state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryLabel {
    Start,
    Pause,
    Resume,
    Restart,
}

impl PrimaryLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimaryLabel::Start => "Start focus",
            PrimaryLabel::Pause => "Pause",
            PrimaryLabel::Resume => "Resume focus",
            PrimaryLabel::Restart => "Restart focus",
        }
    }
}

impl std::fmt::Display for PrimaryLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core timer engine.
///
/// Owns the countdown exclusively. Progress mapping and animation read from
/// it but never write back.
#[derive(Debug)]
pub struct TimerEngine {
    state: TimerState,
    total_secs: u64,
    remaining_secs: u64,
    observers: Observers<TimerStatus>,
}

impl TimerEngine {
    /// Create an idle engine for `minutes` (clamped to the selectable range).
    pub fn new(minutes: u32) -> Self {
        Self::with_total_secs(u64::from(clamp_minutes(minutes)) * 60)
    }

    /// Create an idle engine with an exact duration in seconds.
    pub fn with_total_secs(total_secs: u64) -> Self {
        Self {
            state: TimerState::Idle,
            total_secs,
            remaining_secs: total_secs,
            observers: Observers::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn has_finished(&self) -> bool {
        self.state == TimerState::Finished
    }

    pub fn status(&self) -> TimerStatus {
        TimerStatus {
            remaining_seconds: self.remaining_secs,
            total_seconds: self.total_secs,
            is_running: self.is_running(),
            has_finished: self.has_finished(),
        }
    }

    /// 1.0 .. 0.0 fraction of the duration still remaining.
    pub fn ratio(&self) -> f64 {
        self.progress().ratio
    }

    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot::map(self.remaining_secs, self.total_secs, self.has_finished())
    }

    pub fn primary_label(&self) -> PrimaryLabel {
        if self.is_running() {
            PrimaryLabel::Pause
        } else if self.remaining_secs == 0 {
            PrimaryLabel::Restart
        } else if self.remaining_secs == self.total_secs {
            PrimaryLabel::Start
        } else {
            PrimaryLabel::Resume
        }
    }

    /// Remaining time as `MM:SS`.
    pub fn clock_display(&self) -> String {
        format_clock(self.remaining_secs)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
            is_running: self.is_running(),
            has_finished: self.has_finished(),
            clock: self.clock_display(),
            progress: self.progress(),
            at: Utc::now(),
        }
    }

    /// Register a listener for every transition and tick.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<TimerStatus>
    where
        F: Fn(&TimerStatus) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }

    pub fn observers(&self) -> &Observers<TimerStatus> {
        &self.observers
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Running => None, // Already running.
            TimerState::Paused => self.resume(),
            TimerState::Finished => self.restart(),
            TimerState::Idle if self.remaining_secs == 0 => self.restart(),
            TimerState::Idle => {
                self.state = TimerState::Running;
                self.emit(Event::TimerStarted {
                    total_secs: self.total_secs,
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Running => {
                self.state = TimerState::Paused;
                self.emit(Event::TimerPaused {
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    pub fn resume(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Paused => {
                self.state = TimerState::Running;
                self.emit(Event::TimerResumed {
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Rewind to the full duration and run.
    pub fn restart(&mut self) -> Option<Event> {
        self.remaining_secs = self.total_secs;
        self.state = TimerState::Running;
        self.emit(Event::TimerRestarted {
            total_secs: self.total_secs,
            at: Utc::now(),
        })
    }

    /// Stop and rewind to the full duration.
    pub fn reset_to_full(&mut self) -> Option<Event> {
        self.state = TimerState::Idle;
        self.remaining_secs = self.total_secs;
        self.emit(Event::TimerReset {
            total_secs: self.total_secs,
            at: Utc::now(),
        })
    }

    /// Switch to a new duration. Always a full reset into `Idle`.
    pub fn set_duration_minutes(&mut self, minutes: u32) -> Option<Event> {
        let minutes = clamp_minutes(minutes);
        self.total_secs = u64::from(minutes) * 60;
        self.remaining_secs = self.total_secs;
        self.state = TimerState::Idle;
        self.emit(Event::DurationChanged {
            minutes,
            total_secs: self.total_secs,
            at: Utc::now(),
        })
    }

    /// What the main button does right now.
    pub fn primary_action(&mut self) -> Option<Event> {
        if self.remaining_secs == 0 {
            self.restart()
        } else if self.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Advance one cadence unit. Returns `Some(Event::TimerCompleted)` when
    /// the countdown runs out; ignored unless running.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        if self.remaining_secs <= 1 {
            self.remaining_secs = 0;
            self.state = TimerState::Finished;
            return self.emit(Event::TimerCompleted {
                total_secs: self.total_secs,
                at: Utc::now(),
            });
        }
        self.remaining_secs -= 1;
        self.observers.notify(&self.status());
        None
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn emit(&self, event: Event) -> Option<Event> {
        self.observers.notify(&self.status());
        Some(event)
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MINUTES)
    }
}

/// Format seconds as `MM:SS`; minutes grow past two digits when needed.
pub fn format_clock(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn start_pause_resume() {
        let mut engine = TimerEngine::default();
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.remaining_secs(), engine.total_secs());

        assert!(engine.start().is_some());
        assert_eq!(engine.state(), TimerState::Running);

        assert!(engine.pause().is_some());
        assert_eq!(engine.state(), TimerState::Paused);

        assert!(engine.resume().is_some());
        assert_eq!(engine.state(), TimerState::Running);
    }

    #[test]
    fn repeated_commands_are_noops() {
        let mut engine = TimerEngine::default();
        assert!(engine.pause().is_none());
        assert!(engine.resume().is_none());
        engine.start();
        assert!(engine.start().is_none());
        engine.pause();
        assert!(engine.pause().is_none());
        assert_eq!(engine.state(), TimerState::Paused);
    }

    #[test]
    fn three_ticks_on_twenty_five_minutes() {
        let mut engine = TimerEngine::new(25);
        assert_eq!(engine.total_secs(), 1500);
        engine.start();
        for _ in 0..3 {
            assert!(engine.tick().is_none());
        }
        assert_eq!(engine.remaining_secs(), 1497);
        assert!((engine.ratio() - 0.998).abs() < 1e-9);
    }

    #[test]
    fn sixty_ticks_finish_one_minute() {
        let mut engine = TimerEngine::with_total_secs(60);
        engine.start();
        for _ in 0..59 {
            assert!(engine.tick().is_none());
            assert!(engine.is_running());
        }
        let done = engine.tick();
        assert!(matches!(done, Some(Event::TimerCompleted { total_secs: 60, .. })));
        assert_eq!(engine.state(), TimerState::Finished);
        assert_eq!(engine.remaining_secs(), 0);
        assert!(!engine.is_running());
        assert!(engine.has_finished());
    }

    #[test]
    fn ticks_are_ignored_unless_running() {
        let mut engine = TimerEngine::with_total_secs(10);
        engine.tick();
        assert_eq!(engine.remaining_secs(), 10);
        engine.start();
        engine.tick();
        engine.pause();
        engine.tick();
        assert_eq!(engine.remaining_secs(), 9);
    }

    #[test]
    fn start_after_finish_restarts() {
        let mut engine = TimerEngine::with_total_secs(2);
        engine.start();
        engine.tick();
        engine.tick();
        assert!(engine.has_finished());

        let event = engine.start();
        assert!(matches!(event, Some(Event::TimerRestarted { .. })));
        assert_eq!(engine.remaining_secs(), 2);
        assert!(engine.is_running());
        assert!(!engine.has_finished());
    }

    #[test]
    fn duration_change_resets_to_idle() {
        let mut engine = TimerEngine::default();
        engine.start();
        engine.tick();
        let event = engine.set_duration_minutes(45);
        assert!(matches!(
            event,
            Some(Event::DurationChanged {
                minutes: 45,
                total_secs: 2700,
                ..
            })
        ));
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.remaining_secs(), 2700);
        assert!(!engine.is_running());
        assert!(!engine.has_finished());
    }

    #[test]
    fn duration_change_after_finish_clears_flag() {
        let mut engine = TimerEngine::with_total_secs(1);
        engine.start();
        engine.tick();
        assert!(engine.has_finished());
        engine.set_duration_minutes(15);
        assert!(!engine.has_finished());
        assert_eq!(engine.remaining_secs(), 900);
    }

    #[test]
    fn reset_to_full_rewinds() {
        let mut engine = TimerEngine::with_total_secs(30);
        engine.start();
        engine.tick();
        engine.tick();
        engine.reset_to_full();
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.remaining_secs(), 30);
    }

    #[test]
    fn primary_action_follows_state() {
        let mut engine = TimerEngine::with_total_secs(3);
        assert_eq!(engine.primary_label(), PrimaryLabel::Start);

        engine.primary_action();
        assert!(engine.is_running());
        assert_eq!(engine.primary_label(), PrimaryLabel::Pause);

        engine.tick();
        engine.primary_action();
        assert_eq!(engine.state(), TimerState::Paused);
        assert_eq!(engine.primary_label(), PrimaryLabel::Resume);

        engine.primary_action();
        engine.tick();
        engine.tick();
        assert!(engine.has_finished());
        assert_eq!(engine.primary_label(), PrimaryLabel::Restart);

        engine.primary_action();
        assert!(engine.is_running());
        assert_eq!(engine.remaining_secs(), 3);
    }

    #[test]
    fn zero_total_has_zero_ratio() {
        let engine = TimerEngine::with_total_secs(0);
        assert_eq!(engine.ratio(), 0.0);
    }

    #[test]
    fn clock_display_pads_minutes_and_seconds() {
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(14400), "240:00");
    }

    #[test]
    fn listeners_see_every_tick_and_transition() {
        let mut engine = TimerEngine::with_total_secs(3);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = engine.subscribe(move |s| sink.lock().unwrap().push(*s));

        engine.start();
        engine.tick();
        engine.start(); // no-op, no notification
        engine.tick();
        engine.tick();

        let seen = seen.lock().unwrap();
        let remaining: Vec<u64> = seen.iter().map(|s| s.remaining_seconds).collect();
        assert_eq!(remaining, vec![3, 2, 1, 0]);
        let last = seen.last().unwrap();
        assert!(!last.is_running);
        assert!(last.has_finished);
    }

    #[test]
    fn cancelled_listener_stops_receiving() {
        let mut engine = TimerEngine::with_total_secs(10);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let mut sub = engine.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        engine.start();
        sub.cancel();
        engine.tick();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let engine = TimerEngine::default();
        match engine.snapshot() {
            Event::StateSnapshot {
                state,
                remaining_secs,
                clock,
                progress,
                ..
            } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(remaining_secs, 25 * 60);
                assert_eq!(clock, "25:00");
                assert_eq!(progress.scale, 1.0);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
