//! Engine loader — a process-lifetime registry owning the single shared
//! engine instance.
//!
//! One provision per process at a time: concurrent `acquire` calls block
//! on the in-flight load and share its outcome. A failed load is sticky
//! until a forced reload, matching the upstream tracker-injection
//! behavior. The registry records whether it provisioned the engine
//! itself or was handed a pre-existing one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::GazeEngine;
use crate::error::EngineError;

/// Provisions a fresh engine instance on the loader's behalf.
pub trait EngineProvider: Send + Sync {
    fn provision(&self) -> Result<Arc<dyn GazeEngine>, EngineError>;
}

/// Loader tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    /// Maximum time to wait for a provisioned engine to signal readiness.
    pub grace_ms: u64,
    /// Readiness poll interval.
    pub poll_interval_ms: u64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            grace_ms: 3000,
            poll_interval_ms: 20,
        }
    }
}

enum RegistryState {
    Empty,
    Loading,
    Ready(Arc<dyn GazeEngine>),
    Failed(String),
}

/// The engine registry. Use `EngineLoader::global()` for the shared
/// process-wide instance; construct fresh instances for isolated tests.
pub struct EngineLoader {
    state: Mutex<RegistryState>,
    cond: Condvar,
    injected: AtomicBool,
    options: LoaderOptions,
}

impl EngineLoader {
    pub fn new() -> Self {
        Self::with_options(LoaderOptions::default())
    }

    pub fn with_options(options: LoaderOptions) -> Self {
        Self {
            state: Mutex::new(RegistryState::Empty),
            cond: Condvar::new(),
            injected: AtomicBool::new(false),
            options,
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static EngineLoader {
        static GLOBAL: OnceLock<EngineLoader> = OnceLock::new();
        GLOBAL.get_or_init(EngineLoader::new)
    }

    /// Acquire the shared engine, provisioning it on first use.
    ///
    /// With `force_reload`, any existing engine is torn down (`end()`)
    /// and a fresh provision runs even after a sticky failure.
    pub fn acquire(
        &self,
        provider: &dyn EngineProvider,
        force_reload: bool,
    ) -> Result<Arc<dyn GazeEngine>, EngineError> {
        {
            let mut state = self.state.lock().unwrap();
            loop {
                match &*state {
                    RegistryState::Ready(engine) if !force_reload => {
                        return Ok(engine.clone());
                    }
                    RegistryState::Failed(reason) if !force_reload => {
                        return Err(EngineError::Load(reason.clone()));
                    }
                    RegistryState::Loading => {
                        state = self.cond.wait(state).unwrap();
                        // Re-examine the settled outcome. A forced caller
                        // queued behind another load takes that outcome
                        // too rather than reloading twice.
                        match &*state {
                            RegistryState::Ready(engine) => return Ok(engine.clone()),
                            RegistryState::Failed(reason) => {
                                return Err(EngineError::Load(reason.clone()));
                            }
                            _ => continue,
                        }
                    }
                    _ => break,
                }
            }

            if let RegistryState::Ready(old) = &*state {
                info!("forced reload: tearing down existing gaze engine");
                old.end();
            }
            *state = RegistryState::Loading;
        }

        let outcome = self.provision_and_wait_ready(provider);

        let mut state = self.state.lock().unwrap();
        let result = match outcome {
            Ok(engine) => {
                *state = RegistryState::Ready(engine.clone());
                self.injected.store(true, Ordering::SeqCst);
                info!("gaze engine loaded");
                Ok(engine)
            }
            Err(err) => {
                warn!("gaze engine load failed: {err}");
                *state = RegistryState::Failed(err.to_string());
                Err(err)
            }
        };
        self.cond.notify_all();
        result
    }

    fn provision_and_wait_ready(
        &self,
        provider: &dyn EngineProvider,
    ) -> Result<Arc<dyn GazeEngine>, EngineError> {
        let engine = provider.provision()?;

        let deadline = Instant::now() + Duration::from_millis(self.options.grace_ms);
        while !engine.is_ready() {
            if Instant::now() >= deadline {
                return Err(EngineError::Load(format!(
                    "engine never signalled readiness within {}ms",
                    self.options.grace_ms
                )));
            }
            std::thread::sleep(Duration::from_millis(self.options.poll_interval_ms));
        }
        Ok(engine)
    }

    /// Register a host-provided engine (auto-injection disabled path).
    /// Does not set the injected marker.
    pub fn register_existing(&self, engine: Arc<dyn GazeEngine>) {
        let mut state = self.state.lock().unwrap();
        *state = RegistryState::Ready(engine);
        self.cond.notify_all();
    }

    /// The engine currently held by the registry, if any.
    pub fn existing(&self) -> Option<Arc<dyn GazeEngine>> {
        match &*self.state.lock().unwrap() {
            RegistryState::Ready(engine) => Some(engine.clone()),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(&*self.state.lock().unwrap(), RegistryState::Ready(_))
    }

    /// Whether the registry provisioned the engine itself, as opposed to
    /// being handed a pre-existing one.
    pub fn injected_by_loader(&self) -> bool {
        self.injected.load(Ordering::SeqCst)
    }

    /// Drop any held engine and clear the injected marker.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        *state = RegistryState::Empty;
        self.injected.store(false, Ordering::SeqCst);
        self.cond.notify_all();
    }
}

impl Default for EngineLoader {
    fn default() -> Self {
        Self::new()
    }
}
