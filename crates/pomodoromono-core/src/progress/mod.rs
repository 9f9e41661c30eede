//! Visual side of the timer: ratio to arc geometry, and eased transitions.

pub mod animation;
pub mod mapper;

pub use animation::{ease_out_cubic, AnimationDriver, ANIMATION_WINDOW, SNAP_THRESHOLD};
pub use mapper::ProgressSnapshot;
