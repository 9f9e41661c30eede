//! Async focus session.
//!
//! A [`FocusSession`] is a single tokio task that owns one [`TimerEngine`],
//! the custom-duration buffer and one [`AnimationDriver`]. Everything that
//! mutates them arrives as a `Command` on one channel and is applied in
//! order, so the session has a single control timeline.
//!
//! Two recurring activities feed that channel: the tick cadence and the
//! animation frame loop. Each is a `Ticker` whose commands carry the
//! generation they were armed with. Cancelling bumps the generation and
//! aborts the task inside the same command that caused it, so a tick already
//! queued behind a pause or reset is recognized as stale and dropped.
//!
//! ```ignore
//! let session = FocusSession::spawn(SessionOptions::default());
//! let _sub = session.on_change(|s| println!("{}", s.remaining_seconds));
//! session.start().await?;
//! ```

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::observer::{Observers, Subscription};
use crate::progress::{AnimationDriver, ProgressSnapshot, ANIMATION_WINDOW};
use crate::storage::Config;
use crate::timer::{
    clamp_minutes, DurationInput, PrimaryLabel, TimerEngine, TimerStatus, DEFAULT_MINUTES,
    DEFAULT_PRESETS,
};

/// Floor for cadence and frame periods; tokio intervals reject zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// How a session is set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Duration the session starts with.
    pub minutes: u32,
    /// Minute values accepted by [`SessionHandle::select_preset`].
    pub presets: Vec<u32>,
    /// Cadence period. Each tick removes one second from the countdown
    /// regardless of this value.
    pub tick_period: Duration,
    pub animation_window: Duration,
    pub frame_period: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            minutes: DEFAULT_MINUTES,
            presets: DEFAULT_PRESETS.to_vec(),
            tick_period: Duration::from_secs(1),
            animation_window: ANIMATION_WINDOW,
            frame_period: Duration::from_millis(16),
        }
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            minutes: config.timer.default_minutes,
            presets: config.timer.presets.clone(),
            tick_period: config.tick_period(),
            animation_window: config.animation_window(),
            frame_period: config.frame_period(),
        }
    }
}

/// Control entry points, each enacting one engine transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Start,
    Pause,
    Resume,
    Restart,
    ResetToFull,
    PrimaryAction,
}

/// Everything the session task reacts to.
#[derive(Debug)]
enum Command {
    Control {
        control: Control,
        reply: oneshot::Sender<Option<Event>>,
    },
    SelectPreset {
        minutes: u32,
        reply: oneshot::Sender<Option<Event>>,
    },
    EditCustom {
        text: String,
        reply: oneshot::Sender<String>,
    },
    SubmitCustom {
        text: String,
        reply: oneshot::Sender<Option<Event>>,
    },
    Describe {
        reply: oneshot::Sender<SessionView>,
    },
    Tick {
        generation: u64,
    },
    Frame {
        generation: u64,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Presentation-ready view of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub status: TimerStatus,
    pub clock: String,
    pub label: PrimaryLabel,
    pub custom_duration: String,
    /// The preset menu, in configured order.
    pub presets: Vec<u32>,
    /// Minutes of the duration currently loaded, whether it came from a
    /// preset or from typed input.
    pub selected_minutes: u32,
    /// The preset matching `selected_minutes`, if any.
    pub active_preset: Option<u32>,
    pub snapshot: Event,
}

/// A recurring task that feeds tagged commands back into the session.
#[derive(Debug, Default)]
struct Ticker {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Cancel any outstanding task, then start a fresh one.
    fn arm(
        &mut self,
        period: Duration,
        commands: &mpsc::WeakUnboundedSender<Command>,
        make: fn(u64) -> Command,
    ) {
        self.cancel();
        let period = period.max(MIN_PERIOD);
        let generation = self.generation;
        let commands = commands.clone();
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(tx) = commands.upgrade() else { break };
                if tx.send(make(generation)).is_err() {
                    break;
                }
            }
        }));
    }

    /// Abort the task and invalidate anything it already queued.
    fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.is_armed() && generation == self.generation
    }
}

struct SessionActor {
    engine: TimerEngine,
    presets: Vec<u32>,
    input: DurationInput,
    animation: AnimationDriver,
    cadence: Ticker,
    frames: Ticker,
    tick_period: Duration,
    frame_period: Duration,
    commands: mpsc::WeakUnboundedSender<Command>,
    animated_tx: watch::Sender<ProgressSnapshot>,
    _publisher: Subscription<TimerStatus>,
}

impl SessionActor {
    fn new(
        options: &SessionOptions,
        commands: mpsc::WeakUnboundedSender<Command>,
        status_tx: watch::Sender<TimerStatus>,
        animated_tx: watch::Sender<ProgressSnapshot>,
    ) -> Self {
        let engine = TimerEngine::new(options.minutes);
        // Registered first, so the watch is fresh before any user listener runs.
        let publisher = engine.subscribe(move |status| {
            status_tx.send_replace(*status);
        });
        let animation = AnimationDriver::with_window(engine.ratio(), options.animation_window);
        animated_tx.send_replace(engine.progress());
        Self {
            input: DurationInput::from_minutes(clamp_minutes(options.minutes)),
            engine,
            presets: options.presets.iter().copied().map(clamp_minutes).collect(),
            animation,
            cadence: Ticker::default(),
            frames: Ticker::default(),
            tick_period: options.tick_period,
            frame_period: options.frame_period,
            commands,
            animated_tx,
            _publisher: publisher,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut shutdown_reply = None;
        while let Some(command) = rx.recv().await {
            if let ControlFlow::Break(reply) = self.handle(command) {
                shutdown_reply = Some(reply);
                break;
            }
        }
        // Closed before acknowledging, so handles see `is_closed()` once
        // `shutdown` resolves.
        drop(rx);
        self.teardown();
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    fn handle(&mut self, command: Command) -> ControlFlow<oneshot::Sender<()>> {
        match command {
            Command::Control { control, reply } => {
                let event = self.control(control);
                let _ = reply.send(event);
            }
            Command::SelectPreset { minutes, reply } => {
                let event = self.select_preset(minutes);
                let _ = reply.send(event);
            }
            Command::EditCustom { text, reply } => {
                if let Err(e) = self.input.edit(&text) {
                    debug!(error = %e, "custom duration edit rejected");
                }
                let _ = reply.send(self.input.as_str().to_string());
            }
            Command::SubmitCustom { text, reply } => {
                let event = self.submit_custom(&text);
                let _ = reply.send(event);
            }
            Command::Describe { reply } => {
                let _ = reply.send(self.view());
            }
            Command::Tick { generation } => self.on_tick(generation),
            Command::Frame { generation } => self.on_frame(generation),
            Command::Shutdown { reply } => return ControlFlow::Break(reply),
        }
        ControlFlow::Continue(())
    }

    fn control(&mut self, control: Control) -> Option<Event> {
        let event = match control {
            Control::Start => self.engine.start(),
            Control::Pause => self.engine.pause(),
            Control::Resume => self.engine.resume(),
            Control::Restart => self.engine.restart(),
            Control::ResetToFull => self.engine.reset_to_full(),
            Control::PrimaryAction => self.engine.primary_action(),
        };
        self.after_transition(event)
    }

    fn change_duration(&mut self, minutes: u32) -> Option<Event> {
        let minutes = clamp_minutes(minutes);
        self.input.sync_to(minutes);
        let event = self.engine.set_duration_minutes(minutes);
        self.after_transition(event)
    }

    fn select_preset(&mut self, minutes: u32) -> Option<Event> {
        if !self.presets.contains(&minutes) {
            debug!(minutes, presets = ?self.presets, "not a configured preset");
            return None;
        }
        self.change_duration(minutes)
    }

    fn selected_minutes(&self) -> u32 {
        u32::try_from(self.engine.total_secs() / 60).unwrap_or(u32::MAX)
    }

    fn submit_custom(&mut self, text: &str) -> Option<Event> {
        if let Err(e) = self.input.edit(text) {
            debug!(error = %e, "custom duration rejected");
            return None;
        }
        match self.input.commit() {
            Ok(minutes) => self.change_duration(minutes),
            Err(e) => {
                debug!(error = %e, "custom duration rejected");
                None
            }
        }
    }

    /// Align the cadence with the engine and retarget the animation.
    fn after_transition(&mut self, event: Option<Event>) -> Option<Event> {
        if !self.engine.is_running() {
            self.cadence.cancel();
        } else if event.as_ref().is_some_and(Event::starts_countdown) {
            self.cadence
                .arm(self.tick_period, &self.commands, |generation| Command::Tick {
                    generation,
                });
        }
        if let Some(ref event) = event {
            info!(?event, "timer transition");
        }
        self.retarget();
        event
    }

    fn on_tick(&mut self, generation: u64) {
        if !self.cadence.is_current(generation) {
            debug!(generation, "dropping stale tick");
            return;
        }
        if let Some(event) = self.engine.tick() {
            self.cadence.cancel();
            info!(?event, "timer finished");
        }
        self.retarget();
    }

    fn on_frame(&mut self, generation: u64) {
        if !self.frames.is_current(generation) {
            return;
        }
        self.animation.sample(Instant::now());
        self.publish_animated();
        if !self.animation.is_animating() {
            self.frames.cancel();
        }
    }

    fn retarget(&mut self) {
        if self.animation.set_target(self.engine.ratio(), Instant::now()) {
            if !self.frames.is_armed() {
                self.frames
                    .arm(self.frame_period, &self.commands, |generation| Command::Frame {
                        generation,
                    });
            }
        } else {
            self.frames.cancel();
        }
        self.publish_animated();
    }

    fn publish_animated(&self) {
        self.animated_tx.send_replace(ProgressSnapshot::from_ratio(
            self.animation.current(),
            self.engine.has_finished(),
        ));
    }

    fn view(&self) -> SessionView {
        SessionView {
            status: self.engine.status(),
            clock: self.engine.clock_display(),
            label: self.engine.primary_label(),
            custom_duration: self.input.as_str().to_string(),
            presets: self.presets.clone(),
            selected_minutes: self.selected_minutes(),
            active_preset: Some(self.selected_minutes()).filter(|m| self.presets.contains(m)),
            snapshot: self.engine.snapshot(),
        }
    }

    fn teardown(&mut self) {
        self.cadence.cancel();
        self.frames.cancel();
        self.animation.cancel();
        self.engine.observers().close();
        info!("focus session torn down");
    }
}

/// Spawns focus sessions.
pub struct FocusSession;

impl FocusSession {
    /// Start a session task on the current tokio runtime.
    ///
    /// The task lives until [`SessionHandle::shutdown`] is called or every
    /// handle has been dropped.
    pub fn spawn(options: SessionOptions) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine_total = u64::from(clamp_minutes(options.minutes)) * 60;
        let (status_tx, status_rx) = watch::channel(TimerStatus {
            remaining_seconds: engine_total,
            total_seconds: engine_total,
            is_running: false,
            has_finished: false,
        });
        let (animated_tx, animated_rx) = watch::channel(ProgressSnapshot::from_ratio(1.0, false));
        let actor = SessionActor::new(&options, tx.downgrade(), status_tx, animated_tx);
        let observers = actor.engine.observers().clone();
        tokio::spawn(actor.run(rx));
        SessionHandle {
            commands: tx,
            status: status_rx,
            animated: animated_rx,
            observers,
        }
    }
}

/// Cloneable front door to a running session.
///
/// Control calls resolve once the session has applied them.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<TimerStatus>,
    animated: watch::Receiver<ProgressSnapshot>,
    observers: Observers<TimerStatus>,
}

impl SessionHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| CoreError::SessionClosed)?;
        rx.await.map_err(|_| CoreError::SessionClosed)
    }

    pub async fn control(&self, control: Control) -> Result<Option<Event>> {
        self.request(|reply| Command::Control { control, reply })
            .await
    }

    pub async fn start(&self) -> Result<Option<Event>> {
        self.control(Control::Start).await
    }

    pub async fn pause(&self) -> Result<Option<Event>> {
        self.control(Control::Pause).await
    }

    pub async fn resume(&self) -> Result<Option<Event>> {
        self.control(Control::Resume).await
    }

    pub async fn restart(&self) -> Result<Option<Event>> {
        self.control(Control::Restart).await
    }

    pub async fn reset_to_full(&self) -> Result<Option<Event>> {
        self.control(Control::ResetToFull).await
    }

    pub async fn primary_action(&self) -> Result<Option<Event>> {
        self.control(Control::PrimaryAction).await
    }

    /// Switch to a preset duration (full reset, no text parsing).
    ///
    /// Values outside the configured presets are ignored and yield `Ok(None)`.
    pub async fn select_preset(&self, minutes: u32) -> Result<Option<Event>> {
        self.request(|reply| Command::SelectPreset { minutes, reply })
            .await
    }

    /// Update the custom-duration buffer; returns the buffer afterwards,
    /// unchanged when the edit was rejected.
    pub async fn edit_custom_duration(&self, text: &str) -> Result<String> {
        let text = text.to_string();
        self.request(|reply| Command::EditCustom { text, reply })
            .await
    }

    /// Normalize, validate and commit a typed duration. Rejected input
    /// leaves the session untouched and yields `Ok(None)`.
    pub async fn submit_custom_duration(&self, text: &str) -> Result<Option<Event>> {
        let text = text.to_string();
        self.request(|reply| Command::SubmitCustom { text, reply })
            .await
    }

    pub async fn describe(&self) -> Result<SessionView> {
        self.request(|reply| Command::Describe { reply }).await
    }

    /// Register a listener for every transition and tick.
    ///
    /// After shutdown the returned subscription is already inactive.
    pub fn on_change<F>(&self, listener: F) -> Subscription<TimerStatus>
    where
        F: Fn(&TimerStatus) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }

    pub fn status(&self) -> TimerStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<TimerStatus> {
        self.status.clone()
    }

    pub fn progress_snapshot(&self) -> ProgressSnapshot {
        self.status.borrow().progress()
    }

    /// The animation driver's current interpolated snapshot.
    pub fn animated_snapshot(&self) -> ProgressSnapshot {
        *self.animated.borrow()
    }

    pub fn watch_animated(&self) -> watch::Receiver<ProgressSnapshot> {
        self.animated.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Tear the session down: cadence and frame loop stop, listeners are
    /// dropped. Further calls return [`CoreError::SessionClosed`].
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerState;

    fn actor() -> (SessionActor, mpsc::UnboundedSender<Command>, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(TimerStatus {
            remaining_seconds: 0,
            total_seconds: 0,
            is_running: false,
            has_finished: false,
        });
        let (animated_tx, _) = watch::channel(ProgressSnapshot::from_ratio(1.0, false));
        let actor = SessionActor::new(&SessionOptions::default(), tx.downgrade(), status_tx, animated_tx);
        (actor, tx, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn stale_tick_after_pause_is_dropped() {
        let (mut actor, _tx, _rx) = actor();
        actor.control(Control::Start);
        let armed_with = actor.cadence.generation;
        actor.on_tick(armed_with);
        assert_eq!(actor.engine.remaining_secs(), 1499);

        actor.control(Control::Pause);
        actor.on_tick(armed_with);
        assert_eq!(actor.engine.remaining_secs(), 1499);
        assert_eq!(actor.engine.state(), TimerState::Paused);
        assert!(!actor.cadence.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_tick_cannot_resurrect_reset() {
        let (mut actor, _tx, _rx) = actor();
        actor.control(Control::Start);
        let armed_with = actor.cadence.generation;
        actor.control(Control::ResetToFull);
        actor.control(Control::Start);
        actor.on_tick(armed_with);
        assert_eq!(actor.engine.remaining_secs(), 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_start_keeps_one_cadence() {
        let (mut actor, _tx, _rx) = actor();
        actor.control(Control::Start);
        let generation = actor.cadence.generation;
        actor.control(Control::Start);
        actor.control(Control::Start);
        assert_eq!(actor.cadence.generation, generation);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_replaces_prior_cadence() {
        let (mut actor, _tx, _rx) = actor();
        actor.control(Control::Start);
        let first = actor.cadence.generation;
        actor.control(Control::Pause);
        actor.control(Control::Resume);
        assert!(actor.cadence.is_current(actor.cadence.generation));
        assert!(!actor.cadence.is_current(first));
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_ratio_does_not_arm_frames() {
        let (mut actor, _tx, _rx) = actor();
        actor.change_duration(45);
        assert!(!actor.frames.is_armed());
        assert!(!actor.animation.is_animating());
    }

    #[tokio::test(start_paused = true)]
    async fn ratio_jump_arms_frames() {
        let (mut actor, _tx, _rx) = actor();
        actor.control(Control::Start);
        for _ in 0..600 {
            actor.engine.tick();
        }
        actor.retarget();
        tokio::time::advance(Duration::from_secs(1)).await;
        actor.control(Control::ResetToFull);
        assert!(actor.animation.is_animating());
        assert!(actor.frames.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_syncs_buffer_to_clamped_value() {
        let (mut actor, _tx, _rx) = actor();
        assert!(actor.submit_custom("0").is_some());
        assert_eq!(actor.input.as_str(), "1");
        assert_eq!(actor.engine.total_secs(), 60);

        assert!(actor.submit_custom("1234").is_none());
        assert_eq!(actor.input.as_str(), "1");
        assert!(actor.submit_custom("").is_none());
        assert_eq!(actor.engine.total_secs(), 60);
    }

    #[test]
    fn options_carry_configured_presets() {
        let mut config = Config::default();
        config.set("timer.presets", "[5, 50]").unwrap();
        let options = SessionOptions::from(&config);
        assert_eq!(options.presets, vec![5, 50]);
        assert_eq!(options.minutes, 25);
    }

    #[tokio::test(start_paused = true)]
    async fn select_preset_ignores_unlisted_minutes() {
        let (mut actor, _tx, _rx) = actor();
        assert!(actor.select_preset(7).is_none());
        assert_eq!(actor.engine.total_secs(), 1500);

        assert!(actor.select_preset(45).is_some());
        let view = actor.view();
        assert_eq!(view.selected_minutes, 45);
        assert_eq!(view.active_preset, Some(45));
        assert_eq!(view.custom_duration, "45");
    }

    #[tokio::test(start_paused = true)]
    async fn custom_minutes_clear_active_preset() {
        let (mut actor, _tx, _rx) = actor();
        assert!(actor.submit_custom("40").is_some());
        let view = actor.view();
        assert_eq!(view.selected_minutes, 40);
        assert_eq!(view.active_preset, None);
        assert_eq!(view.presets, vec![15, 25, 45]);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_everything() {
        let (mut actor, _tx, _rx) = actor();
        let _sub = actor.engine.subscribe(|_| {});
        actor.control(Control::Start);
        actor.teardown();
        assert!(!actor.cadence.is_armed());
        assert!(!actor.frames.is_armed());
        assert!(actor.engine.observers().is_empty());
        assert!(!actor.engine.subscribe(|_| {}).is_active());
    }
}
