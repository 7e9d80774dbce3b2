//! Simulated gaze engine for development, the headless demo, and tests.
//!
//! Forwards readings pushed by a gaze feed to the installed listener and
//! records lifecycle calls so tests can assert against them.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::{GazeEngine, GazeListener, GazeSample, GazeSubscription, ListenerSlot};
use crate::engine::loader::EngineProvider;
use crate::error::EngineError;

/// In-process engine stand-in. Readings are injected via `emit`.
pub struct SimulatedEngine {
    slot: Arc<ListenerSlot>,
    ready: AtomicBool,
    running: AtomicBool,
    fail_begin: Option<String>,
    begin_calls: AtomicU32,
    end_calls: AtomicU32,
    video_preview: AtomicBool,
    prediction_points: AtomicBool,
}

impl SimulatedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: ListenerSlot::new(),
            ready: AtomicBool::new(true),
            running: AtomicBool::new(false),
            fail_begin: None,
            begin_calls: AtomicU32::new(0),
            end_calls: AtomicU32::new(0),
            // The engine's own overlays default to visible.
            video_preview: AtomicBool::new(true),
            prediction_points: AtomicBool::new(true),
        })
    }

    /// An engine that never signals readiness (loader grace-period tests).
    pub fn never_ready() -> Arc<Self> {
        let engine = Self::new();
        engine.ready.store(false, Ordering::SeqCst);
        engine
    }

    /// An engine whose `begin` fails with the given reason.
    pub fn failing_begin(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            slot: ListenerSlot::new(),
            ready: AtomicBool::new(true),
            running: AtomicBool::new(false),
            fail_begin: Some(reason.to_string()),
            begin_calls: AtomicU32::new(0),
            end_calls: AtomicU32::new(0),
            video_preview: AtomicBool::new(true),
            prediction_points: AtomicBool::new(true),
        })
    }

    /// Push a reading to the installed listener.
    pub fn emit(&self, sample: Option<GazeSample>, timestamp_ms: f64) {
        self.slot.emit(sample, timestamp_ms);
    }

    /// Simulate the engine re-enabling its own overlays (the real
    /// tracker does this some time after `begin`).
    pub fn reenable_overlays(&self) {
        self.video_preview.store(true, Ordering::SeqCst);
        self.prediction_points.store(true, Ordering::SeqCst);
        debug!("simulated engine re-enabled its overlays");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn begin_calls(&self) -> u32 {
        self.begin_calls.load(Ordering::SeqCst)
    }

    pub fn end_calls(&self) -> u32 {
        self.end_calls.load(Ordering::SeqCst)
    }

    pub fn video_preview_shown(&self) -> bool {
        self.video_preview.load(Ordering::SeqCst)
    }

    pub fn prediction_points_shown(&self) -> bool {
        self.prediction_points.load(Ordering::SeqCst)
    }
}

impl GazeEngine for SimulatedEngine {
    fn begin(&self) -> Result<(), EngineError> {
        self.begin_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.fail_begin {
            return Err(EngineError::Start(reason.clone()));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn end(&self) {
        self.end_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    fn set_gaze_listener(&self, listener: GazeListener) -> GazeSubscription {
        self.slot.install(listener)
    }

    fn show_video_preview(&self, show: bool) {
        self.video_preview.store(show, Ordering::SeqCst);
    }

    fn show_prediction_points(&self, show: bool) {
        self.prediction_points.store(show, Ordering::SeqCst);
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

// ── Provider ───────────────────────────────────────────────

/// Provisions `SimulatedEngine` instances for the loader.
pub struct SimulatedProvider {
    fail_with: Option<String>,
    never_ready: bool,
    provisions: AtomicU32,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            never_ready: false,
            provisions: AtomicU32::new(0),
        }
    }

    /// A provider whose provisioning always fails.
    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            never_ready: false,
            provisions: AtomicU32::new(0),
        }
    }

    /// A provider whose engines never become ready.
    pub fn never_ready() -> Self {
        Self {
            fail_with: None,
            never_ready: true,
            provisions: AtomicU32::new(0),
        }
    }

    /// How many engines this provider has provisioned.
    pub fn provisions(&self) -> u32 {
        self.provisions.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineProvider for SimulatedProvider {
    fn provision(&self) -> Result<Arc<dyn GazeEngine>, EngineError> {
        if let Some(reason) = &self.fail_with {
            return Err(EngineError::Load(reason.clone()));
        }
        self.provisions.fetch_add(1, Ordering::SeqCst);
        info!("provisioning simulated gaze engine");
        let engine = if self.never_ready {
            SimulatedEngine::never_ready()
        } else {
            SimulatedEngine::new()
        };
        Ok(engine)
    }
}
