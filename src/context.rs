//! Integration context — the owning provider and its subscriber handles.
//!
//! `EyeScrollProvider::mount` runs the whole init sequence (engine
//! acquisition, listener wiring, control surface, optional auto-start),
//! absorbing failures into the `error` field: a failed init never takes
//! the host application down. Direct `start()` calls, by contrast,
//! propagate their error to the caller.
//!
//! A process-wide accessor (`EyeScrollHandle::current`) resolves the
//! active provider and fails loudly when none is mounted.

use std::sync::{Arc, Mutex, Weak};

use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::{ConfigPatch, ScrollConfig};
use crate::engine::{EngineLoader, EngineProvider};
use crate::error::{ContextError, EngineError};
use crate::scroll::{Direction, EyeScrollController, ScrollHooks};
use crate::surface::{ControlSurface, SurfaceHost};
use crate::viewport::Viewport;

/// The active provider, if any. Set on mount, cleared on teardown.
static ACTIVE: Mutex<Option<Weak<ProviderCore>>> = Mutex::new(None);

/// The registry above is process-wide; tests that mount providers hold
/// this to serialize against each other.
#[cfg(test)]
pub(crate) fn registry_guard() -> std::sync::MutexGuard<'static, ()> {
    static REGISTRY_GUARD: Mutex<()> = Mutex::new(());
    REGISTRY_GUARD
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Default)]
struct ContextShared {
    is_tracking: bool,
    is_loading: bool,
    error: Option<String>,
}

/// State shared between the provider and its handles.
pub struct ProviderCore {
    controller: Mutex<EyeScrollController>,
    shared: Arc<Mutex<ContextShared>>,
    clock: Arc<dyn Clock>,
}

impl ProviderCore {
    fn start(&self) -> Result<(), EngineError> {
        let now_ms = self.clock.monotonic_millis();
        self.controller.lock().unwrap().start(now_ms)?;
        self.shared.lock().unwrap().is_tracking = true;
        Ok(())
    }

    fn stop(&self) {
        self.controller.lock().unwrap().stop();
        self.shared.lock().unwrap().is_tracking = false;
    }

    fn update_config(&self, patch: &ConfigPatch) {
        self.controller.lock().unwrap().update_config(patch);
    }

    fn is_tracking(&self) -> bool {
        self.shared.lock().unwrap().is_tracking
    }

    fn is_loading(&self) -> bool {
        self.shared.lock().unwrap().is_loading
    }

    fn error(&self) -> Option<String> {
        self.shared.lock().unwrap().error.clone()
    }
}

// ── Provider ───────────────────────────────────────────────

/// Owns the controller, the control surface, and the active-provider
/// registration.
pub struct EyeScrollProvider {
    core: Arc<ProviderCore>,
    surface: Option<ControlSurface>,
}

impl EyeScrollProvider {
    /// Mount a provider: acquire the engine, wire the listener, mount
    /// the control surface, optionally auto-start. Initialization
    /// failures land in `error()`; the provider is returned regardless.
    pub fn mount(
        viewport: Arc<Mutex<dyn Viewport + Send>>,
        host: Arc<dyn SurfaceHost>,
        config: ScrollConfig,
        user_hooks: ScrollHooks,
        clock: Arc<dyn Clock>,
        loader: &EngineLoader,
        engine_provider: &dyn EngineProvider,
    ) -> Self {
        let shared = Arc::new(Mutex::new(ContextShared {
            is_tracking: false,
            is_loading: true,
            error: None,
        }));
        let hooks = Self::wrap_hooks(user_hooks, shared.clone());

        let show_controls = config.show_controls;
        let auto_start = config.auto_start;
        let controller = EyeScrollController::new(viewport, config.clone(), hooks);
        let core = Arc::new(ProviderCore {
            controller: Mutex::new(controller),
            shared: shared.clone(),
            clock,
        });

        let mut surface = None;
        let acquired = if config.auto_inject_engine || config.engine_cdn {
            loader.acquire(engine_provider, false)
        } else {
            loader.existing().ok_or(EngineError::Missing)
        };
        match acquired {
            Ok(engine) => {
                core.controller.lock().unwrap().attach_engine(engine);
                if show_controls {
                    surface = Some(ControlSurface::mount(host));
                }
                if auto_start {
                    if let Err(err) = core.start() {
                        warn!("auto-start failed: {err}");
                        shared.lock().unwrap().error = Some(err.to_string());
                    }
                }
            }
            Err(err) => {
                warn!("eyescroll initialization failed: {err}");
                shared.lock().unwrap().error = Some(err.to_string());
            }
        }
        shared.lock().unwrap().is_loading = false;

        *ACTIVE.lock().unwrap() = Some(Arc::downgrade(&core));
        info!("eyescroll provider mounted");

        Self { core, surface }
    }

    fn wrap_hooks(mut user: ScrollHooks, shared: Arc<Mutex<ContextShared>>) -> ScrollHooks {
        let mut user_start = user.on_scroll_start.take();
        let start_shared = shared.clone();
        let mut user_end = user.on_scroll_end.take();

        ScrollHooks {
            on_scroll_start: Some(Box::new(move |direction: Direction| {
                if let Some(hook) = user_start.as_mut() {
                    hook(direction);
                }
                start_shared.lock().unwrap().is_tracking = true;
            })),
            on_scroll_end: Some(Box::new(move |direction: Direction| {
                if let Some(hook) = user_end.as_mut() {
                    hook(direction);
                }
                shared.lock().unwrap().is_tracking = false;
            })),
        }
    }

    /// A cloneable subscriber handle bound to this provider.
    pub fn handle(&self) -> EyeScrollHandle {
        EyeScrollHandle {
            core: self.core.clone(),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.core.is_tracking()
    }

    pub fn is_loading(&self) -> bool {
        self.core.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.core.error()
    }

    /// Start tracking. Errors propagate to the caller.
    pub fn start(&self) -> Result<(), EngineError> {
        self.core.start()
    }

    /// Stop tracking. Always safe.
    pub fn stop(&self) {
        self.core.stop();
    }

    pub fn update_config(&self, patch: &ConfigPatch) {
        self.core.update_config(patch);
    }

    /// The control-surface click path: toggle the controller, swapping
    /// visuals only after the start outcome is known; a failed start
    /// leaves the button idle. Returns the new tracking state.
    pub fn toggle(&mut self) -> Result<bool, EngineError> {
        let active = self.core.controller.lock().unwrap().is_active();
        if active {
            self.core.stop();
            if let Some(surface) = &mut self.surface {
                surface.set_active(false);
            }
            return Ok(false);
        }
        match self.core.start() {
            Ok(()) => {
                if let Some(surface) = &mut self.surface {
                    surface.set_active(true);
                }
                Ok(true)
            }
            Err(err) => {
                if let Some(surface) = &mut self.surface {
                    surface.set_active(false);
                }
                Err(err)
            }
        }
    }

    /// Drive the cooperative loop: drain gaze readings and apply due
    /// scroll ticks. Returns the number of deltas applied.
    pub fn pump(&self) -> u32 {
        let now_ms = self.core.clock.monotonic_millis();
        self.core.controller.lock().unwrap().pump(now_ms)
    }

    pub fn surface_mut(&mut self) -> Option<&mut ControlSurface> {
        self.surface.as_mut()
    }

    /// Explicit teardown; also runs on drop.
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        // Defined order: ticker, listener subscription, engine end
        // signal, then the control-surface node.
        self.core.controller.lock().unwrap().destroy();
        if let Some(mut surface) = self.surface.take() {
            surface.unmount();
        }
        let mut active = ACTIVE.lock().unwrap();
        let ours = Arc::downgrade(&self.core);
        if let Some(current) = &*active {
            if Weak::ptr_eq(current, &ours) {
                *active = None;
            }
        }
        info!("eyescroll provider unmounted");
    }
}

impl Drop for EyeScrollProvider {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ── Handle ─────────────────────────────────────────────────

/// Subscriber view of the context: state plus operations.
#[derive(Clone)]
pub struct EyeScrollHandle {
    core: Arc<ProviderCore>,
}

impl EyeScrollHandle {
    /// Resolve the active provider. Calling this with no mounted
    /// provider is a programming error and fails with a descriptive
    /// message rather than returning defaults.
    pub fn current() -> Result<Self, ContextError> {
        ACTIVE
            .lock()
            .unwrap()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|core| Self { core })
            .ok_or(ContextError::NoActiveProvider)
    }

    pub fn is_tracking(&self) -> bool {
        self.core.is_tracking()
    }

    pub fn is_loading(&self) -> bool {
        self.core.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.core.error()
    }

    pub fn start(&self) -> Result<(), EngineError> {
        self.core.start()
    }

    pub fn stop(&self) {
        self.core.stop();
    }

    pub fn update_config(&self, patch: &ConfigPatch) {
        self.core.update_config(patch);
    }
}
