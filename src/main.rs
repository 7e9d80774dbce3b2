//! eyescroll — gaze-driven scroll engine, headless demo binary.

use clap::Parser;
use tracing::info;

use eyescroll::config::{ConfigPatch, DirectionMode, ScrollConfig};
use eyescroll::headless::{self, FeedPattern, HeadlessOptions};

#[derive(Parser, Debug)]
#[command(name = "eyescroll", about = "Gaze-driven scroll engine (headless demo)")]
struct Cli {
    /// Viewport resolution (WxH)
    #[arg(long, default_value = "1280x720")]
    resolution: String,

    /// Exit after N seconds
    #[arg(long, default_value = "10")]
    exit_after: u64,

    /// Pump interval in milliseconds
    #[arg(long, default_value = "16")]
    poll_interval: u64,

    /// Scripted gaze pattern: sweep or bottom
    #[arg(long, default_value = "sweep")]
    pattern: String,

    /// JSON config file (partial; unset fields keep their defaults)
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Dwell delay in milliseconds
    #[arg(long)]
    delay_ms: Option<f64>,

    /// Scroll sensitivity multiplier
    #[arg(long)]
    sensitivity: Option<f64>,

    /// Base scroll step in pixels per tick
    #[arg(long)]
    scroll_amount: Option<f64>,

    /// Direction mode: horizontal, vertical, or both
    #[arg(long)]
    direction: Option<String>,

    /// Do not mount the control-surface toggle
    #[arg(long)]
    no_controls: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("eyescroll {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eyescroll=info".into()),
        )
        .init();

    let (width, height) = headless::parse_resolution(&cli.resolution)
        .ok_or_else(|| anyhow::anyhow!("invalid resolution: {}", cli.resolution))?;

    let pattern = FeedPattern::from_str(&cli.pattern)
        .ok_or_else(|| anyhow::anyhow!("invalid pattern: {}", cli.pattern))?;

    let mut config = ScrollConfig::for_viewport(width, height);

    if let Some(path) = &cli.config {
        let text = std::fs::read_to_string(path)?;
        let patch = ConfigPatch::from_json(&text)?;
        patch.apply(&mut config);
        info!(path = %path.display(), "applied config file");
    }

    let direction = match cli.direction.as_deref() {
        Some(s) => Some(
            DirectionMode::from_str(s)
                .ok_or_else(|| anyhow::anyhow!("invalid direction mode: {s}"))?,
        ),
        None => None,
    };
    let flags = ConfigPatch {
        delay_ms: cli.delay_ms,
        sensitivity: cli.sensitivity,
        scroll_amount: cli.scroll_amount,
        direction,
        show_controls: cli.no_controls.then_some(false),
        ..Default::default()
    };
    flags.apply(&mut config);

    headless::run(HeadlessOptions {
        width,
        height,
        exit_after_s: Some(cli.exit_after),
        poll_interval_ms: cli.poll_interval,
        pattern,
        config,
    })
}
