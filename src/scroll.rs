//! Gaze-to-scroll controller.
//!
//! Consumes gaze samples, classifies each into a directional edge zone,
//! applies a dwell-time gate, and drives continuous scrolling of the
//! target viewport while the gate is open.
//!
//! The phase machine is explicit: the periodic ticker is owned by the
//! `Scrolling` variant, so "a ticker exists iff a direction has been
//! continuously observed for at least the dwell delay" holds by
//! construction.

use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::{ConfigPatch, ScrollConfig};
use crate::engine::{GazeEngine, GazeSample, GazeSubscription};
use crate::error::EngineError;
use crate::viewport::Viewport;

/// Scroll tick cadence in milliseconds (~60 Hz).
pub const SCROLL_TICK_MS: f64 = 16.0;

/// Delay after which overlay suppression is re-asserted once, countering
/// the engine's own re-enablement.
pub const OVERLAY_REASSERT_MS: f64 = 10_000.0;

// ── Direction ──────────────────────────────────────────────

/// A latched scroll direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }

    /// Scroll delta for one tick of the given magnitude.
    pub fn delta(&self, amount: f64) -> (f64, f64) {
        match self {
            Self::Left => (-amount, 0.0),
            Self::Right => (amount, 0.0),
            Self::Up => (0.0, -amount),
            Self::Down => (0.0, amount),
        }
    }
}

/// Classify a gaze position against the configured edge zones.
///
/// Horizontal zones are evaluated before vertical; a sample outside both
/// a horizontal and a vertical threshold yields the horizontal
/// direction. The order is fixed, not configurable.
pub fn classify(x: f64, y: f64, config: &ScrollConfig) -> Option<Direction> {
    let zones = &config.zones;

    if config.direction.includes_horizontal() {
        if x < zones.left {
            return Some(Direction::Left);
        }
        if x > zones.right {
            return Some(Direction::Right);
        }
    }

    if config.direction.includes_vertical() {
        if y < zones.top {
            return Some(Direction::Up);
        }
        if y > zones.bottom {
            return Some(Direction::Down);
        }
    }

    None
}

// ── Ticker ─────────────────────────────────────────────────

/// Periodic scroll cadence. Best-effort: late pumps catch up, but ticks
/// never fire ahead of time.
#[derive(Debug, Clone)]
pub struct ScrollTicker {
    next_due_ms: f64,
}

impl ScrollTicker {
    pub fn new(started_ms: f64) -> Self {
        Self {
            next_due_ms: started_ms + SCROLL_TICK_MS,
        }
    }

    /// Number of ticks elapsed up to `now_ms`.
    pub fn due_ticks(&mut self, now_ms: f64) -> u32 {
        let mut ticks = 0;
        while self.next_due_ms <= now_ms {
            ticks += 1;
            self.next_due_ms += SCROLL_TICK_MS;
        }
        ticks
    }
}

// ── Phase ──────────────────────────────────────────────────

/// Controller phase. `Scrolling` owns the ticker; destroying the variant
/// destroys the cadence.
#[derive(Debug)]
pub enum ScrollPhase {
    /// Not tracking.
    Idle,
    /// Tracking, no zone triggered.
    Watching,
    /// Direction latched, dwell not yet elapsed. No timer: the gate is a
    /// timestamp comparison.
    Dwelling { direction: Direction, since_ms: f64 },
    /// Dwell elapsed; periodic scroll emission running.
    Scrolling {
        direction: Direction,
        ticker: ScrollTicker,
    },
}

impl ScrollPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Watching => "watching",
            Self::Dwelling { .. } => "dwelling",
            Self::Scrolling { .. } => "scrolling",
        }
    }

    /// The latched direction, if any.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::Dwelling { direction, .. } | Self::Scrolling { direction, .. } => {
                Some(*direction)
            }
            _ => None,
        }
    }

    pub fn is_scrolling(&self) -> bool {
        matches!(self, Self::Scrolling { .. })
    }
}

// ── Hooks ──────────────────────────────────────────────────

/// Lifecycle callbacks invoked on scroll start/end, per direction.
#[derive(Default)]
pub struct ScrollHooks {
    pub on_scroll_start: Option<Box<dyn FnMut(Direction) + Send>>,
    pub on_scroll_end: Option<Box<dyn FnMut(Direction) + Send>>,
}

impl ScrollHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

// ── Events ─────────────────────────────────────────────────

/// Transitions reported by the controller (for logging and the demo;
/// hooks fire regardless).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollEvent {
    /// A new direction was latched; the dwell clock restarted.
    DirectionLatched { direction: Direction, at_ms: f64 },
    /// The dwell gate opened; periodic scrolling began.
    ScrollStarted { direction: Direction },
    /// Periodic scrolling stopped.
    ScrollEnded { direction: Direction },
}

// ── Controller ─────────────────────────────────────────────

/// The gaze-direction-to-scroll controller.
pub struct EyeScrollController {
    config: ScrollConfig,
    hooks: ScrollHooks,
    phase: ScrollPhase,
    active: bool,
    engine: Option<Arc<dyn GazeEngine>>,
    subscription: Option<GazeSubscription>,
    inbox: Option<Receiver<(Option<GazeSample>, f64)>>,
    viewport: Arc<Mutex<dyn Viewport + Send>>,
    overlay_reassert_at: Option<f64>,
}

impl EyeScrollController {
    pub fn new(
        viewport: Arc<Mutex<dyn Viewport + Send>>,
        config: ScrollConfig,
        hooks: ScrollHooks,
    ) -> Self {
        Self {
            config,
            hooks,
            phase: ScrollPhase::Idle,
            active: false,
            engine: None,
            subscription: None,
            inbox: None,
            viewport,
            overlay_reassert_at: None,
        }
    }

    /// Wire the engine: install a gaze listener feeding this
    /// controller's inbox, replacing any previous registration.
    pub fn attach_engine(&mut self, engine: Arc<dyn GazeEngine>) {
        let (tx, rx) = mpsc::channel();
        let subscription = engine.set_gaze_listener(Box::new(move |sample, timestamp_ms| {
            let _ = tx.send((sample, timestamp_ms));
        }));
        self.subscription = Some(subscription);
        self.inbox = Some(rx);
        self.engine = Some(engine);
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn phase(&self) -> &ScrollPhase {
        &self.phase
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// Begin tracking. Requires an attached engine; calls the engine's
    /// `begin` on every invocation, flipping the active flag only after
    /// it succeeds. Idempotent at the controller level.
    pub fn start(&mut self, now_ms: f64) -> Result<(), EngineError> {
        let engine = self.engine.clone().ok_or(EngineError::Missing)?;
        engine.begin()?;

        engine.show_video_preview(false);
        engine.show_prediction_points(false);
        // The engine re-enables its overlays on its own shortly after
        // begin; suppress once more after a fixed delay.
        self.overlay_reassert_at = Some(now_ms + OVERLAY_REASSERT_MS);

        if !self.active {
            self.active = true;
            self.phase = ScrollPhase::Watching;
            info!("eye scrolling started");
        }
        Ok(())
    }

    /// Stop tracking. Cancels the cadence synchronously, fires the
    /// scroll-end hook for any latched direction, signals the engine to
    /// end. Always safe.
    pub fn stop(&mut self) {
        self.active = false;
        if let Some(direction) = self.take_scrolling() {
            self.fire_scroll_end(direction);
        }
        self.phase = ScrollPhase::Idle;
        if let Some(engine) = &self.engine {
            engine.end();
        }
        info!("eye scrolling stopped");
    }

    /// Shallow-merge a config update. In-flight dwell/scroll state is
    /// not reset.
    pub fn update_config(&mut self, patch: &ConfigPatch) {
        patch.apply(&mut self.config);
    }

    /// Process one gaze reading. `None` readings (tracker has no
    /// estimate) are ignored; direction loss is signalled by a sample
    /// classifying into the central dead zone.
    pub fn handle_sample(
        &mut self,
        sample: Option<GazeSample>,
        timestamp_ms: f64,
    ) -> Option<ScrollEvent> {
        if !self.active {
            return None;
        }
        let sample = sample?;

        match classify(sample.x, sample.y, &self.config) {
            Some(direction) => {
                let mut event = None;

                if self.phase.direction() != Some(direction) {
                    // The only branch that resets the dwell clock. A
                    // ticker cannot survive a direction it has held for
                    // zero milliseconds.
                    if let Some(old) = self.take_scrolling() {
                        self.fire_scroll_end(old);
                    }
                    debug!(direction = direction.as_str(), at_ms = timestamp_ms, "direction latched");
                    self.phase = ScrollPhase::Dwelling {
                        direction,
                        since_ms: timestamp_ms,
                    };
                    event = Some(ScrollEvent::DirectionLatched {
                        direction,
                        at_ms: timestamp_ms,
                    });
                }

                let open = match &self.phase {
                    ScrollPhase::Dwelling { direction, since_ms }
                        if timestamp_ms - since_ms >= self.config.delay_ms =>
                    {
                        Some(*direction)
                    }
                    _ => None,
                };
                if let Some(direction) = open {
                    self.fire_scroll_start(direction);
                    self.phase = ScrollPhase::Scrolling {
                        direction,
                        ticker: ScrollTicker::new(timestamp_ms),
                    };
                    event = Some(ScrollEvent::ScrollStarted { direction });
                }

                event
            }
            None => {
                let ended = self.take_scrolling();
                if !matches!(self.phase, ScrollPhase::Idle) {
                    self.phase = ScrollPhase::Watching;
                }
                match ended {
                    Some(direction) => {
                        self.fire_scroll_end(direction);
                        Some(ScrollEvent::ScrollEnded { direction })
                    }
                    None => None,
                }
            }
        }
    }

    /// Apply elapsed scroll ticks and the deferred overlay
    /// re-suppression. Returns the number of deltas applied. A stale
    /// call after `stop()` applies nothing: no `Scrolling` phase, no
    /// ticker.
    pub fn advance(&mut self, now_ms: f64) -> u32 {
        if let Some(at) = self.overlay_reassert_at {
            if now_ms >= at {
                self.overlay_reassert_at = None;
                if let Some(engine) = &self.engine {
                    engine.show_video_preview(false);
                    engine.show_prediction_points(false);
                    debug!("overlay suppression re-asserted");
                }
            }
        }

        let (direction, ticks) = match &mut self.phase {
            ScrollPhase::Scrolling { direction, ticker } => (*direction, ticker.due_ticks(now_ms)),
            _ => return 0,
        };
        if ticks == 0 {
            return 0;
        }

        let amount = self.config.scroll_amount * self.config.sensitivity;
        let (dx, dy) = direction.delta(amount);
        let mut viewport = self.viewport.lock().unwrap();
        for _ in 0..ticks {
            viewport.scroll_by(dx, dy);
        }
        ticks
    }

    /// Drain queued gaze readings in arrival order, then apply elapsed
    /// ticks. The single entry point for the cooperative event loop.
    pub fn pump(&mut self, now_ms: f64) -> u32 {
        loop {
            let received = match &self.inbox {
                Some(rx) => rx.try_recv().ok(),
                None => None,
            };
            match received {
                Some((sample, timestamp_ms)) => {
                    self.handle_sample(sample, timestamp_ms);
                }
                None => break,
            }
        }
        self.advance(now_ms)
    }

    /// Tear down: ticker, listener subscription, engine end signal — in
    /// that order. Safe on a controller that was never started.
    pub fn destroy(&mut self) {
        if let Some(direction) = self.take_scrolling() {
            self.fire_scroll_end(direction);
        }
        self.phase = ScrollPhase::Idle;
        self.active = false;
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if let Some(engine) = self.engine.take() {
            engine.end();
        }
        self.inbox = None;
    }

    /// If scrolling, drop the ticker and return the direction it served.
    fn take_scrolling(&mut self) -> Option<Direction> {
        if self.phase.is_scrolling() {
            let old = std::mem::replace(&mut self.phase, ScrollPhase::Watching);
            if let ScrollPhase::Scrolling { direction, .. } = old {
                return Some(direction);
            }
        }
        None
    }

    fn fire_scroll_start(&mut self, direction: Direction) {
        debug!(direction = direction.as_str(), "scroll started");
        if let Some(hook) = self.hooks.on_scroll_start.as_mut() {
            hook(direction);
        }
    }

    fn fire_scroll_end(&mut self, direction: Direction) {
        debug!(direction = direction.as_str(), "scroll ended");
        if let Some(hook) = self.hooks.on_scroll_end.as_mut() {
            hook(direction);
        }
    }
}

// ── Tests ──────────────────────────────────────────────────
