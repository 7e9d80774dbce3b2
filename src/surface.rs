//! Control surface — the single toggle affordance reflecting tracking
//! state.
//!
//! Rendering is delegated to a `SurfaceHost`; the surface itself only
//! owns the node's visual state. Exactly one node exists per mounted
//! provider and it is removed on teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Idle button background (calm tone).
pub const IDLE_BACKGROUND: &str = "#AFDDFF";
/// Active button background ("recording" tone).
pub const ACTIVE_BACKGROUND: &str = "#FF6363";
/// Hover scale transform.
pub const HOVER_SCALE: f64 = 1.1;
/// Resting scale.
pub const REST_SCALE: f64 = 1.0;

/// Opaque node handle issued by a host.
pub type NodeId = u64;

/// Visual state of the toggle button.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonVisual {
    pub background: &'static str,
    pub scale: f64,
}

impl ButtonVisual {
    pub fn idle() -> Self {
        Self {
            background: IDLE_BACKGROUND,
            scale: REST_SCALE,
        }
    }
}

/// Where control-surface nodes are mounted.
pub trait SurfaceHost: Send + Sync {
    fn mount(&self, visual: &ButtonVisual) -> NodeId;
    fn update(&self, id: NodeId, visual: &ButtonVisual);
    fn remove(&self, id: NodeId);
    /// Number of currently mounted nodes.
    fn node_count(&self) -> usize;
}

/// In-memory host used by the headless runtime and tests.
pub struct MemoryHost {
    nodes: Mutex<HashMap<NodeId, ButtonVisual>>,
    next_id: AtomicU64,
}

impl MemoryHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nodes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Visual of a mounted node, if present.
    pub fn visual(&self, id: NodeId) -> Option<ButtonVisual> {
        self.nodes.lock().unwrap().get(&id).copied()
    }
}

impl SurfaceHost for MemoryHost {
    fn mount(&self, visual: &ButtonVisual) -> NodeId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.nodes.lock().unwrap().insert(id, *visual);
        debug!(id, "control surface mounted");
        id
    }

    fn update(&self, id: NodeId, visual: &ButtonVisual) {
        if let Some(node) = self.nodes.lock().unwrap().get_mut(&id) {
            *node = *visual;
        }
    }

    fn remove(&self, id: NodeId) {
        self.nodes.lock().unwrap().remove(&id);
        debug!(id, "control surface removed");
    }

    fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }
}

// ── Control surface ────────────────────────────────────────

/// The toggle affordance. Owns exactly one mounted node for its
/// lifetime; `unmount` (or drop) removes it.
pub struct ControlSurface {
    host: Arc<dyn SurfaceHost>,
    node: Option<NodeId>,
    visual: ButtonVisual,
}

impl ControlSurface {
    /// Mount the toggle on the given host in the idle state.
    pub fn mount(host: Arc<dyn SurfaceHost>) -> Self {
        let visual = ButtonVisual::idle();
        let node = host.mount(&visual);
        Self {
            host,
            node: Some(node),
            visual,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.node.is_some()
    }

    pub fn visual(&self) -> ButtonVisual {
        self.visual
    }

    /// Swap between the idle and active backgrounds.
    pub fn set_active(&mut self, active: bool) {
        self.visual.background = if active {
            ACTIVE_BACKGROUND
        } else {
            IDLE_BACKGROUND
        };
        self.push();
    }

    /// Purely presentational hover affordance.
    pub fn hover_enter(&mut self) {
        self.visual.scale = HOVER_SCALE;
        self.push();
    }

    pub fn hover_leave(&mut self) {
        self.visual.scale = REST_SCALE;
        self.push();
    }

    /// Remove the node. Idempotent.
    pub fn unmount(&mut self) {
        if let Some(id) = self.node.take() {
            self.host.remove(id);
        }
    }

    fn push(&self) {
        if let Some(id) = self.node {
            self.host.update(id, &self.visual);
        }
    }
}

impl Drop for ControlSurface {
    fn drop(&mut self) {
        self.unmount();
    }
}
