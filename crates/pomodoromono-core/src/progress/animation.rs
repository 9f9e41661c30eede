//! Eased transitions between progress ratios.
//!
//! The driver is time-injected: callers pass the sampling instant, so the
//! curve is reproducible under a paused clock. The frame loop that samples it
//! lives in [`crate::session`].

use std::time::Duration;
use tokio::time::Instant;

/// Default length of one interpolation.
pub const ANIMATION_WINDOW: Duration = Duration::from_millis(520);
/// Target changes smaller than this snap instead of animating.
pub const SNAP_THRESHOLD: f64 = 0.0005;

/// Cubic ease-out: fast start, decelerating into the target.
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug, Clone, Copy)]
struct Tween {
    start: f64,
    target: f64,
    started_at: Instant,
}

/// Smooths jumps in a value toward its latest target.
///
/// At most one interpolation is in flight; a new target replaces it and
/// starts from wherever the old one had got to.
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    current: f64,
    target: f64,
    window: Duration,
    tween: Option<Tween>,
}

impl AnimationDriver {
    pub fn new(initial: f64) -> Self {
        Self::with_window(initial, ANIMATION_WINDOW)
    }

    pub fn with_window(initial: f64, window: Duration) -> Self {
        Self {
            current: initial,
            target: initial,
            window,
            tween: None,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    /// Aim at `target`. Returns `true` when an interpolation was started,
    /// `false` when the change was small enough to snap.
    pub fn set_target(&mut self, target: f64, now: Instant) -> bool {
        self.sample(now);
        self.target = target;
        if (target - self.current).abs() < SNAP_THRESHOLD {
            self.current = target;
            self.tween = None;
            return false;
        }
        self.tween = Some(Tween {
            start: self.current,
            target,
            started_at: now,
        });
        true
    }

    /// Advance the interpolation to `now` and return the current value.
    pub fn sample(&mut self, now: Instant) -> f64 {
        let Some(tween) = self.tween else {
            return self.current;
        };
        let t = if self.window.is_zero() {
            1.0
        } else {
            now.saturating_duration_since(tween.started_at).as_secs_f64()
                / self.window.as_secs_f64()
        };
        if t >= 1.0 {
            self.current = tween.target;
            self.tween = None;
        } else {
            self.current = tween.start + (tween.target - tween.start) * ease_out_cubic(t);
        }
        self.current
    }

    /// Drop the in-flight interpolation, freezing at the current value.
    pub fn cancel(&mut self) {
        self.tween = None;
    }
}
