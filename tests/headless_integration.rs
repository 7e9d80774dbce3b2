//! Headless integration tests for the eyescroll stack.
//!
//! These drive the full provider → controller → viewport pipeline with a
//! simulated engine, scripted gaze readings, and a manually advanced
//! clock. No tracking hardware, no display.

use std::sync::{Arc, Mutex, MutexGuard};

use eyescroll::clock::TestClock;
use eyescroll::config::{ConfigPatch, DirectionMode, ScrollConfig};
use eyescroll::context::{EyeScrollHandle, EyeScrollProvider};
use eyescroll::engine::loader::LoaderOptions;
use eyescroll::engine::{EngineLoader, GazeSample, SimulatedEngine, SimulatedProvider};
use eyescroll::scroll::{Direction, ScrollHooks};
use eyescroll::surface::{MemoryHost, SurfaceHost, ACTIVE_BACKGROUND, IDLE_BACKGROUND};
use eyescroll::viewport::{BoundedViewport, Viewport};

/// The active-provider registry is process-wide; tests that mount
/// providers serialize on this.
fn registry_guard() -> MutexGuard<'static, ()> {
    static GUARD: Mutex<()> = Mutex::new(());
    GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Stack {
    provider: EyeScrollProvider,
    engine: Arc<SimulatedEngine>,
    viewport: Arc<Mutex<BoundedViewport>>,
    host: Arc<MemoryHost>,
    clock: Arc<TestClock>,
}

fn mount_stack(config: ScrollConfig, hooks: ScrollHooks) -> Stack {
    let viewport = Arc::new(Mutex::new(BoundedViewport::new(
        1000.0, 800.0, 10_000.0, 10_000.0,
    )));
    let host = MemoryHost::new();
    let clock = Arc::new(TestClock::new());
    let loader = EngineLoader::with_options(LoaderOptions {
        grace_ms: 50,
        poll_interval_ms: 5,
    });
    let engine = SimulatedEngine::new();
    loader.register_existing(engine.clone());

    let provider = EyeScrollProvider::mount(
        viewport.clone(),
        host.clone(),
        config,
        hooks,
        clock.clone(),
        &loader,
        &SimulatedProvider::new(),
    );
    Stack {
        provider,
        engine,
        viewport,
        host,
        clock,
    }
}

fn recording_hooks(log: Arc<Mutex<Vec<String>>>) -> ScrollHooks {
    let start_log = log.clone();
    ScrollHooks {
        on_scroll_start: Some(Box::new(move |direction: Direction| {
            start_log
                .lock()
                .unwrap()
                .push(format!("start:{}", direction.as_str()));
        })),
        on_scroll_end: Some(Box::new(move |direction: Direction| {
            log.lock()
                .unwrap()
                .push(format!("end:{}", direction.as_str()));
        })),
    }
}

// ── Dwell gating scenario ───────────────────────────────────

#[test]
fn test_vertical_dwell_scenario() {
    let _guard = registry_guard();
    let mut config = ScrollConfig::for_viewport(1000.0, 800.0);
    config.direction = DirectionMode::Vertical;
    config.delay_ms = 500.0;

    let log = Arc::new(Mutex::new(Vec::new()));
    let stack = mount_stack(config, recording_hooks(log.clone()));
    // Scroll down first so upward motion is observable.
    stack.viewport.lock().unwrap().scroll_by(0.0, 2000.0);
    stack.provider.start().unwrap();

    // Samples at y=10 (top zone): t=0, t=400, t=600.
    stack.engine.emit(Some(GazeSample::new(500.0, 10.0)), 0.0);
    stack.provider.pump();
    stack.clock.set_millis(400.0);
    stack.engine.emit(Some(GazeSample::new(500.0, 10.0)), 400.0);
    stack.provider.pump();

    // No scroll before t = 500.
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(stack.viewport.lock().unwrap().scroll_top(), 2000.0);

    // Scroll begins at the t=600 sample.
    stack.clock.set_millis(600.0);
    stack.engine.emit(Some(GazeSample::new(500.0, 10.0)), 600.0);
    stack.provider.pump();
    assert_eq!(log.lock().unwrap().as_slice(), ["start:up"]);

    // Ticks accrue once the cadence comes due.
    stack.clock.set_millis(700.0);
    stack.provider.pump();
    let scrolled_to = stack.viewport.lock().unwrap().scroll_top();
    assert!(scrolled_to < 2000.0, "expected upward scroll, at {scrolled_to}");
}

#[test]
fn test_sensitivity_update_doubles_next_delta() {
    let _guard = registry_guard();
    let mut config = ScrollConfig::for_viewport(1000.0, 800.0);
    config.delay_ms = 100.0;

    let stack = mount_stack(config, ScrollHooks::new());
    stack.provider.start().unwrap();
    let handle = EyeScrollHandle::current().unwrap();

    stack.engine.emit(Some(GazeSample::new(500.0, 700.0)), 0.0);
    stack.engine.emit(Some(GazeSample::new(500.0, 700.0)), 100.0);
    stack.clock.set_millis(116.0);
    stack.provider.pump();
    assert_eq!(stack.viewport.lock().unwrap().scroll_top(), 50.0);

    handle.update_config(&ConfigPatch {
        sensitivity: Some(2.0),
        ..Default::default()
    });

    stack.clock.set_millis(132.0);
    stack.provider.pump();
    assert_eq!(stack.viewport.lock().unwrap().scroll_top(), 150.0);
}

#[test]
fn test_direction_loss_halts_and_reports_once() {
    let _guard = registry_guard();
    let mut config = ScrollConfig::for_viewport(1000.0, 800.0);
    config.delay_ms = 100.0;

    let log = Arc::new(Mutex::new(Vec::new()));
    let stack = mount_stack(config, recording_hooks(log.clone()));
    stack.provider.start().unwrap();

    stack.engine.emit(Some(GazeSample::new(900.0, 400.0)), 0.0);
    stack.engine.emit(Some(GazeSample::new(900.0, 400.0)), 100.0);
    stack.clock.set_millis(148.0);
    stack.provider.pump();
    let scrolled = stack.viewport.lock().unwrap().scroll_left();
    assert!(scrolled > 0.0);

    // Gaze returns to the dead zone: emission halts immediately.
    stack.engine.emit(Some(GazeSample::new(500.0, 400.0)), 150.0);
    stack.clock.set_millis(1000.0);
    stack.provider.pump();
    assert_eq!(stack.viewport.lock().unwrap().scroll_left(), scrolled);
    assert_eq!(
        log.lock().unwrap().as_slice(),
        ["start:right", "end:right"]
    );
}

#[test]
fn test_stop_then_stray_pumps_apply_nothing() {
    let _guard = registry_guard();
    let mut config = ScrollConfig::for_viewport(1000.0, 800.0);
    config.delay_ms = 100.0;

    let stack = mount_stack(config, ScrollHooks::new());
    stack.provider.start().unwrap();

    stack.engine.emit(Some(GazeSample::new(500.0, 700.0)), 0.0);
    stack.engine.emit(Some(GazeSample::new(500.0, 700.0)), 100.0);
    stack.clock.set_millis(116.0);
    stack.provider.pump();
    let scrolled = stack.viewport.lock().unwrap().scroll_top();
    assert!(scrolled > 0.0);

    stack.provider.stop();
    assert!(!stack.provider.is_tracking());

    // Any number of stray pumps later, nothing more is applied.
    for ms in [132.0, 500.0, 5_000.0] {
        stack.clock.set_millis(ms);
        assert_eq!(stack.provider.pump(), 0);
    }
    assert_eq!(stack.viewport.lock().unwrap().scroll_top(), scrolled);
}

// ── Context / lifecycle ─────────────────────────────────────

#[test]
fn test_handle_outside_provider_fails_loudly() {
    let _guard = registry_guard();
    let err = match EyeScrollHandle::current() {
        Err(err) => err,
        Ok(_) => panic!("expected no active provider"),
    };
    assert!(err.to_string().contains("no active eyescroll provider"));
}

#[test]
fn test_three_mount_unmount_cycles_leave_no_nodes() {
    let _guard = registry_guard();
    let host = MemoryHost::new();
    let viewport = Arc::new(Mutex::new(BoundedViewport::new(
        1000.0, 800.0, 10_000.0, 10_000.0,
    )));
    let loader = EngineLoader::with_options(LoaderOptions {
        grace_ms: 50,
        poll_interval_ms: 5,
    });
    let engine_provider = SimulatedProvider::new();

    for _ in 0..3 {
        let provider = EyeScrollProvider::mount(
            viewport.clone(),
            host.clone(),
            ScrollConfig::for_viewport(1000.0, 800.0),
            ScrollHooks::new(),
            Arc::new(TestClock::new()),
            &loader,
            &engine_provider,
        );
        assert_eq!(host.node_count(), 1);
        provider.unmount();
        assert_eq!(host.node_count(), 0);
    }
    assert_eq!(engine_provider.provisions(), 1);
    assert!(EyeScrollHandle::current().is_err());
}

#[test]
fn test_toggle_reflects_start_outcome() {
    let _guard = registry_guard();
    let config = ScrollConfig::for_viewport(1000.0, 800.0);
    let mut stack = mount_stack(config, ScrollHooks::new());

    assert!(stack.provider.toggle().unwrap());
    assert_eq!(stack.host.visual(1).unwrap().background, ACTIVE_BACKGROUND);
    assert!(stack.provider.is_tracking());
    assert_eq!(stack.engine.begin_calls(), 1);

    assert!(!stack.provider.toggle().unwrap());
    assert_eq!(stack.host.visual(1).unwrap().background, IDLE_BACKGROUND);
    assert_eq!(stack.engine.end_calls(), 1);
}

#[test]
fn test_overlay_suppression_reasserted_after_ten_seconds() {
    let _guard = registry_guard();
    let stack = mount_stack(ScrollConfig::for_viewport(1000.0, 800.0), ScrollHooks::new());
    stack.provider.start().unwrap();
    assert!(!stack.engine.video_preview_shown());

    // The engine re-enables its overlays on its own; the controller
    // counters once, ten seconds after start.
    stack.engine.reenable_overlays();
    stack.clock.set_millis(9_000.0);
    stack.provider.pump();
    assert!(stack.engine.video_preview_shown());

    stack.clock.set_millis(10_000.0);
    stack.provider.pump();
    assert!(!stack.engine.video_preview_shown());
    assert!(!stack.engine.prediction_points_shown());
}

#[test]
fn test_unmount_mid_scroll_tears_down_cleanly() {
    let _guard = registry_guard();
    let mut config = ScrollConfig::for_viewport(1000.0, 800.0);
    config.delay_ms = 100.0;

    let log = Arc::new(Mutex::new(Vec::new()));
    let stack = mount_stack(config, recording_hooks(log.clone()));
    stack.provider.start().unwrap();

    stack.engine.emit(Some(GazeSample::new(500.0, 700.0)), 0.0);
    stack.engine.emit(Some(GazeSample::new(500.0, 700.0)), 100.0);
    stack.clock.set_millis(116.0);
    stack.provider.pump();

    let engine = stack.engine.clone();
    let host = stack.host.clone();
    stack.provider.unmount();

    assert_eq!(engine.end_calls(), 1);
    assert_eq!(host.node_count(), 0);
    assert_eq!(log.lock().unwrap().as_slice(), ["start:down", "end:down"]);

    // Post-teardown emissions go nowhere.
    engine.emit(Some(GazeSample::new(500.0, 700.0)), 200.0);
}

// ── Loader ──────────────────────────────────────────────────

#[test]
fn test_loader_shared_across_mounts_and_force_reload() {
    let loader = EngineLoader::with_options(LoaderOptions {
        grace_ms: 50,
        poll_interval_ms: 5,
    });
    let provider = SimulatedProvider::new();

    let first = loader.acquire(&provider, false).unwrap();
    let again = loader.acquire(&provider, false).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(provider.provisions(), 1);
    assert!(loader.injected_by_loader());

    // Forced reload provisions a fresh engine and ends the old one.
    let reloaded = loader.acquire(&provider, true).unwrap();
    assert!(!Arc::ptr_eq(&first, &reloaded));
    assert_eq!(provider.provisions(), 2);
}

// ── CLI smoke ───────────────────────────────────────────────

#[test]
fn test_cli_version() {
    assert_cmd::Command::cargo_bin("eyescroll")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(format!("eyescroll {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_headless_run_with_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eyescroll.json");
    std::fs::write(&path, r#"{"delay_ms": 100.0, "scroll_amount": 25.0}"#).unwrap();

    assert_cmd::Command::cargo_bin("eyescroll")
        .unwrap()
        .args([
            "--resolution",
            "640x480",
            "--pattern",
            "bottom",
            "--exit-after",
            "1",
            "--poll-interval",
            "5",
            "--config",
        ])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_cli_rejects_bad_resolution() {
    assert_cmd::Command::cargo_bin("eyescroll")
        .unwrap()
        .args(["--resolution", "bogus"])
        .assert()
        .failure();
}
