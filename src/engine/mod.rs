//! External gaze engine capability surface.
//!
//! The engine is consumed, never implemented, by the scroll core: a
//! narrow trait mirroring the tracker's begin/end lifecycle, listener
//! registration, and overlay-suppression toggles. Listener registration
//! returns a `GazeSubscription` guard; registering a new listener
//! replaces the previous one, and a stale guard detaches nothing.

use std::sync::{Arc, Mutex, Weak};

use crate::error::EngineError;

pub mod loader;
pub mod simulated;

pub use loader::{EngineLoader, EngineProvider, LoaderOptions};
pub use simulated::{SimulatedEngine, SimulatedProvider};

// ── Gaze sample ────────────────────────────────────────────

/// A single gaze reading in viewport pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
}

impl GazeSample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Callback invoked with each gaze reading (or `None` when the tracker
/// has no estimate) and a monotonic millisecond timestamp.
pub type GazeListener = Box<dyn FnMut(Option<GazeSample>, f64) + Send>;

// ── Engine trait ───────────────────────────────────────────

/// Capability trait over the external eye-tracking engine.
pub trait GazeEngine: Send + Sync {
    /// Start gaze estimation. Fails when the camera or its permission is
    /// unavailable.
    fn begin(&self) -> Result<(), EngineError>;

    /// Stop gaze estimation. Synchronous, always safe to call.
    fn end(&self);

    /// Install the gaze listener, replacing any previous one. The
    /// returned guard detaches the listener on drop or explicit
    /// `unsubscribe`, but only while it is still the active
    /// registration.
    fn set_gaze_listener(&self, listener: GazeListener) -> GazeSubscription;

    /// Toggle the engine's own camera preview overlay.
    fn show_video_preview(&self, show: bool);

    /// Toggle the engine's prediction-point overlay.
    fn show_prediction_points(&self, show: bool);

    /// Whether the engine has finished initializing. Polled by the
    /// loader during the readiness grace period.
    fn is_ready(&self) -> bool;
}

// ── Listener slot ──────────────────────────────────────────

/// Shared single-listener slot for engine implementations.
///
/// Holds at most one listener; installs bump an epoch so that guards
/// from superseded registrations become inert.
pub struct ListenerSlot {
    inner: Mutex<SlotInner>,
}

struct SlotInner {
    epoch: u64,
    listener: Option<GazeListener>,
}

impl ListenerSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(SlotInner {
                epoch: 0,
                listener: None,
            }),
        })
    }

    /// Install a listener, replacing the previous one.
    pub fn install(self: &Arc<Self>, listener: GazeListener) -> GazeSubscription {
        let mut inner = self.inner.lock().unwrap();
        inner.epoch += 1;
        inner.listener = Some(listener);
        GazeSubscription {
            slot: Arc::downgrade(self),
            epoch: inner.epoch,
        }
    }

    /// Deliver a reading to the active listener, if any.
    pub fn emit(&self, sample: Option<GazeSample>, timestamp_ms: f64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(listener) = inner.listener.as_mut() {
            listener(sample, timestamp_ms);
        }
    }

    /// Whether a listener is currently installed.
    pub fn has_listener(&self) -> bool {
        self.inner.lock().unwrap().listener.is_some()
    }

    fn detach(&self, epoch: u64) {
        let mut inner = self.inner.lock().unwrap();
        if inner.epoch == epoch {
            inner.listener = None;
        }
    }
}

// ── Subscription guard ─────────────────────────────────────

/// Handle to an installed gaze listener. Dropping (or calling
/// `unsubscribe`) removes the listener iff this guard still names the
/// active registration.
pub struct GazeSubscription {
    slot: Weak<ListenerSlot>,
    epoch: u64,
}

impl GazeSubscription {
    /// Explicitly detach the listener.
    pub fn unsubscribe(self) {
        // Drop impl does the work.
    }

    /// Whether this guard still names the active registration.
    pub fn is_active(&self) -> bool {
        self.slot
            .upgrade()
            .map(|slot| slot.inner.lock().unwrap().epoch == self.epoch)
            .unwrap_or(false)
    }
}

impl Drop for GazeSubscription {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.upgrade() {
            slot.detach(self.epoch);
        }
    }
}
