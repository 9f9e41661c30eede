//! # Pomodoromono Core Library
//!
//! This library provides the core logic for the Pomodoromono focus timer:
//! a single countdown driving a radial progress indicator. The CLI binary is
//! a thin presentation layer over the same core.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A decrementing state machine; the owner invokes
//!   `tick()` once per cadence period
//! - **Duration validation**: free-text minutes normalized and clamped
//! - **Progress**: pure ratio-to-geometry mapping plus an eased animation driver
//! - **Session**: tokio task owning one engine, its cadence and its frame loop
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`ProgressSnapshot`]: Visual parameters for the radial indicator
//! - [`AnimationDriver`]: Cubic ease-out smoothing of ratio jumps
//! - [`FocusSession`]: Async runtime with the external invocation contract
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod observer;
pub mod progress;
pub mod session;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use observer::{Observers, Subscription};
pub use progress::{AnimationDriver, ProgressSnapshot};
pub use session::{Control, FocusSession, SessionHandle, SessionOptions, SessionView};
pub use storage::Config;
pub use timer::{DurationInput, PrimaryLabel, TimerEngine, TimerState, TimerStatus};
