//! Scroll configuration — direction mode, edge zones, defaults, and
//! shallow merge updates.
//!
//! All fields have defaults derived from the target viewport; a
//! `ConfigPatch` only overrides the fields it explicitly sets, so user
//! values survive partial updates.

use serde::{Deserialize, Serialize};

// ── Direction mode ─────────────────────────────────────────

/// Which scroll axes gaze classification considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionMode {
    Horizontal,
    Vertical,
    Both,
}

impl DirectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
            Self::Both => "both",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "horizontal" => Some(Self::Horizontal),
            "vertical" => Some(Self::Vertical),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn includes_horizontal(&self) -> bool {
        matches!(self, Self::Horizontal | Self::Both)
    }

    pub fn includes_vertical(&self) -> bool {
        matches!(self, Self::Vertical | Self::Both)
    }
}

// ── Edge zones ─────────────────────────────────────────────

/// Directional trigger thresholds in viewport pixel coordinates.
///
/// `middle` is accepted in the option surface for compatibility but is
/// not read by classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zones {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub middle: f64,
}

impl Zones {
    /// Default thresholds for a viewport: 25%/75% of width and height.
    pub fn for_viewport(width: f64, height: f64) -> Self {
        Self {
            left: width * 0.25,
            right: width * 0.75,
            top: height * 0.25,
            bottom: height * 0.75,
            middle: 100.0,
        }
    }
}

/// Partial zone update; unset fields keep their current values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ZonesPatch {
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub middle: Option<f64>,
}

impl ZonesPatch {
    pub fn apply(&self, zones: &mut Zones) {
        if let Some(v) = self.left {
            zones.left = v;
        }
        if let Some(v) = self.right {
            zones.right = v;
        }
        if let Some(v) = self.top {
            zones.top = v;
        }
        if let Some(v) = self.bottom {
            zones.bottom = v;
        }
        if let Some(v) = self.middle {
            zones.middle = v;
        }
    }
}

// ── Scroll config ──────────────────────────────────────────

/// Full controller configuration. Immutable per controller instance
/// except via `ConfigPatch::apply`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Multiplier applied to every scroll delta.
    pub sensitivity: f64,
    /// Dwell delay: milliseconds a direction must be held before
    /// scrolling begins.
    pub delay_ms: f64,
    /// Base scroll step magnitude in pixels per tick.
    pub scroll_amount: f64,
    /// Axes considered by classification.
    pub direction: DirectionMode,
    /// Edge-zone thresholds.
    pub zones: Zones,
    /// Whether to mount the control-surface toggle.
    pub show_controls: bool,
    /// Whether the provider starts tracking immediately after init.
    pub auto_start: bool,
    /// Whether the loader may fetch the engine from its default source.
    pub engine_cdn: bool,
    /// Whether the loader may provision the engine at all; when false a
    /// pre-registered engine is required.
    pub auto_inject_engine: bool,
}

impl ScrollConfig {
    /// Defaults for a viewport of the given size.
    pub fn for_viewport(width: f64, height: f64) -> Self {
        Self {
            sensitivity: 1.0,
            delay_ms: 1000.0,
            scroll_amount: 50.0,
            direction: DirectionMode::Both,
            zones: Zones::for_viewport(width, height),
            show_controls: true,
            auto_start: false,
            engine_cdn: true,
            auto_inject_engine: true,
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self::for_viewport(1920.0, 1080.0)
    }
}

// ── Config patch ───────────────────────────────────────────

/// Shallow merge update: every field optional, unset fields never
/// override the live configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    pub sensitivity: Option<f64>,
    pub delay_ms: Option<f64>,
    pub scroll_amount: Option<f64>,
    pub direction: Option<DirectionMode>,
    pub zones: Option<ZonesPatch>,
    pub show_controls: Option<bool>,
    pub auto_start: Option<bool>,
    pub engine_cdn: Option<bool>,
    pub auto_inject_engine: Option<bool>,
}

impl ConfigPatch {
    pub fn apply(&self, config: &mut ScrollConfig) {
        if let Some(v) = self.sensitivity {
            config.sensitivity = v;
        }
        if let Some(v) = self.delay_ms {
            config.delay_ms = v;
        }
        if let Some(v) = self.scroll_amount {
            config.scroll_amount = v;
        }
        if let Some(v) = self.direction {
            config.direction = v;
        }
        if let Some(zones) = &self.zones {
            zones.apply(&mut config.zones);
        }
        if let Some(v) = self.show_controls {
            config.show_controls = v;
        }
        if let Some(v) = self.auto_start {
            config.auto_start = v;
        }
        if let Some(v) = self.engine_cdn {
            config.engine_cdn = v;
        }
        if let Some(v) = self.auto_inject_engine {
            config.auto_inject_engine = v;
        }
    }

    /// Parse a patch from JSON (the config-file format).
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
