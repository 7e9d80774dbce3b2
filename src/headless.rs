//! Headless runtime — drives the full stack with a simulated engine and
//! a scripted gaze feed. Used by the demo binary and by CI smoke runs;
//! no tracking hardware required.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::ScrollConfig;
use crate::context::EyeScrollProvider;
use crate::engine::{EngineLoader, SimulatedEngine, SimulatedProvider};
use crate::gaze_feed::{GazeFeed, GazeStep, ScriptedFeed};
use crate::scroll::ScrollHooks;
use crate::surface::MemoryHost;
use crate::viewport::{BoundedViewport, Viewport};

/// Which scripted feed the runtime loops over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPattern {
    /// Bottom dwell, recenter, right dwell, recenter.
    Sweep,
    /// Stare at the bottom edge.
    Bottom,
}

impl FeedPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sweep => "sweep",
            Self::Bottom => "bottom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sweep" => Some(Self::Sweep),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    fn build(&self, width: f64, height: f64, delay_ms: f64) -> ScriptedFeed {
        match self {
            Self::Sweep => ScriptedFeed::sweep(width, height, delay_ms),
            Self::Bottom => ScriptedFeed::bottom(width, height, 50),
        }
    }
}

/// Headless run configuration.
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    /// Viewport width in pixels.
    pub width: f64,
    /// Viewport height in pixels.
    pub height: f64,
    /// Exit after this many seconds; `None` runs until the feed loop is
    /// interrupted externally.
    pub exit_after_s: Option<u64>,
    /// Pump interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Scripted gaze pattern.
    pub pattern: FeedPattern,
    /// Controller configuration.
    pub config: ScrollConfig,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            exit_after_s: Some(10),
            poll_interval_ms: 16,
            pattern: FeedPattern::Sweep,
            config: ScrollConfig::for_viewport(1280.0, 720.0),
        }
    }
}

/// Parse a "WxH" resolution string.
pub fn parse_resolution(s: &str) -> Option<(f64, f64)> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return None;
    }
    let w = parts[0].parse::<f64>().ok()?;
    let h = parts[1].parse::<f64>().ok()?;
    if w > 0.0 && h > 0.0 {
        Some((w, h))
    } else {
        None
    }
}

/// Run the headless loop to completion.
pub fn run(options: HeadlessOptions) -> anyhow::Result<()> {
    info!(
        width = options.width,
        height = options.height,
        pattern = options.pattern.as_str(),
        "starting headless eyescroll run"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let viewport = Arc::new(Mutex::new(BoundedViewport::new(
        options.width,
        options.height,
        options.width * 4.0,
        options.height * 8.0,
    )));
    let host = MemoryHost::new();
    let loader = EngineLoader::new();

    // Register the simulated engine up front so the demo keeps a typed
    // handle for emitting scripted readings.
    let engine = SimulatedEngine::new();
    loader.register_existing(engine.clone());

    let provider = EyeScrollProvider::mount(
        viewport.clone(),
        host,
        options.config.clone(),
        ScrollHooks::new(),
        clock.clone(),
        &loader,
        &SimulatedProvider::new(),
    );
    if let Some(error) = provider.error() {
        anyhow::bail!("initialization failed: {error}");
    }
    provider
        .start()
        .map_err(|err| anyhow::anyhow!("start failed: {err}"))?;

    let delay_ms = options.config.delay_ms;
    let mut feed = options
        .pattern
        .build(options.width, options.height, delay_ms);
    let started = Instant::now();
    let mut last_status = Instant::now();

    loop {
        match feed.next_step() {
            Some(GazeStep::Wait { ms }) => {
                thread::sleep(Duration::from_millis(ms as u64));
            }
            Some(step) => {
                if let Some(reading) = step.reading() {
                    engine.emit(reading, clock.monotonic_millis());
                }
            }
            None => {
                // Loop the pattern for the remainder of the run.
                feed = options
                    .pattern
                    .build(options.width, options.height, delay_ms);
            }
        }

        let applied = provider.pump();
        if applied > 0 {
            debug!(ticks = applied, "scroll deltas applied");
        }

        if last_status.elapsed() >= Duration::from_secs(1) {
            last_status = Instant::now();
            let vp = viewport.lock().unwrap();
            info!(
                tracking = provider.is_tracking(),
                scroll_left = vp.scroll_left(),
                scroll_top = vp.scroll_top(),
                "status"
            );
        }

        if let Some(exit_after_s) = options.exit_after_s {
            if started.elapsed() >= Duration::from_secs(exit_after_s) {
                break;
            }
        }

        thread::sleep(Duration::from_millis(options.poll_interval_ms));
    }

    {
        let vp = viewport.lock().unwrap();
        info!(
            scroll_left = vp.scroll_left(),
            scroll_top = vp.scroll_top(),
            "headless run complete"
        );
    }
    provider.unmount();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("1920x1080"), Some((1920.0, 1080.0)));
        assert_eq!(parse_resolution("640x480"), Some((640.0, 480.0)));
        assert_eq!(parse_resolution("1920"), None);
        assert_eq!(parse_resolution("axb"), None);
        assert_eq!(parse_resolution("0x1080"), None);
        assert_eq!(parse_resolution("1920x1080x60"), None);
    }

    #[test]
    fn test_pattern_roundtrip() {
        assert_eq!(FeedPattern::from_str("sweep"), Some(FeedPattern::Sweep));
        assert_eq!(FeedPattern::from_str("bottom"), Some(FeedPattern::Bottom));
        assert_eq!(FeedPattern::from_str("spiral"), None);
        assert_eq!(FeedPattern::Sweep.as_str(), "sweep");
    }

    #[test]
    fn test_short_headless_run_scrolls() {
        let _guard = crate::context::registry_guard();
        let mut config = ScrollConfig::for_viewport(640.0, 480.0);
        // Short dwell so the one-second run reaches the scroll phase.
        config.delay_ms = 100.0;
        let options = HeadlessOptions {
            width: 640.0,
            height: 480.0,
            exit_after_s: Some(1),
            poll_interval_ms: 5,
            pattern: FeedPattern::Bottom,
            config,
        };
        run(options).unwrap();
    }
}
