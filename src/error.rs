//! Error taxonomy for engine acquisition, engine start, and context access.

use thiserror::Error;

/// Errors surfaced by the engine loader and the scroll controller.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Engine provisioning failed or the engine never signalled readiness
    /// within the loader's grace period.
    #[error("failed to load gaze engine: {0}")]
    Load(String),

    /// Auto-injection is disabled and no pre-registered engine was found.
    #[error("gaze engine not found; register one or enable auto-injection")]
    Missing,

    /// The engine's begin call failed (camera or permission unavailable).
    #[error("failed to start gaze engine: {0}")]
    Start(String),
}

/// Errors surfaced by the integration context accessor.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    /// `EyeScrollHandle::current()` was called with no mounted provider.
    #[error("no active eyescroll provider; acquire a handle from a mounted EyeScrollProvider")]
    NoActiveProvider,
}
