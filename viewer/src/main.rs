//! Orrery Viewer - terminal client for a remote physics simulation.
//!
//! Prefills a playout buffer over `GET /data`, keeps it topped up from the
//! `GET /stream` event stream, and renders interpolated frames at a steady
//! rate either on a terminal canvas or as log lines (`--headless`).

mod headless;
mod http;
mod sse;

use anyhow::{Context, Result};
use clap::Parser;
use orrery_core::dashboard::{spawn_input, TerminalRenderer};
use orrery_core::{
    runtime, BufferConfig, Catalog, ClockConfig, Command, ControllerStats, Orrery, PlaybackConfig, SessionConfig,
    TrailConfig,
};
use orrery_env::{stream_channel, OrreryContext, SnapshotTransport, TokioContext};
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use headless::LogRenderer;
use http::HttpTransport;

/// Orrery Viewer CLI
#[derive(Parser, Debug)]
#[command(name = "orrery-viewer")]
#[command(about = "Watch a remote physics simulation streamed as snapshots", long_about = None)]
struct Args {
    /// Base URL of the simulation service
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    server: String,

    /// Body catalog (JSON array); when given, a new run is started with the selection
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Bodies to simulate (default: Sun, Earth, Mars)
    #[arg(long, num_args = 1..)]
    select: Vec<String>,

    /// Target frames per second
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Snapshots to keep buffered
    #[arg(long, default_value = "10")]
    buffer_size: usize,

    /// Hard limit on buffered snapshots
    #[arg(long, default_value = "20")]
    max_buffer: usize,

    /// Simulation seconds advanced per frame
    #[arg(long, default_value = "86400")]
    render_step: f64,

    /// Points kept per body trail
    #[arg(long, default_value = "1000")]
    trail_length: usize,

    /// Wait before reconnecting a failed stream (ms)
    #[arg(long, default_value = "1000")]
    reconnect_ms: u64,

    /// Log frames instead of drawing them
    #[arg(long)]
    headless: bool,

    /// Write logs to this file (terminal mode logs nothing without it)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            buffer: BufferConfig {
                target_size: self.buffer_size,
                hard_ceiling: self.max_buffer,
                render_step: self.render_step,
                ..BufferConfig::default()
            },
            clock: ClockConfig {
                fps: self.fps,
                ..ClockConfig::default()
            },
            session: SessionConfig {
                reconnect_delay: Duration::from_millis(self.reconnect_ms),
            },
            trails: TrailConfig {
                capacity: self.trail_length,
                ..TrailConfig::default()
            },
            ..PlaybackConfig::default()
        }
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };

    if let Some(path) = &args.log_file {
        let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else if args.headless {
        let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Starts playback: a fresh run when a catalog is given, otherwise
/// whatever the service is already simulating.
async fn start<C: OrreryContext, T: SnapshotTransport>(orrery: &mut Orrery<C, T>, args: &Args) -> Result<()> {
    match &args.catalog {
        Some(path) => {
            let catalog = Catalog::load(path).with_context(|| format!("loading catalog {}", path.display()))?;
            let selection = catalog.select(args.select.as_slice())?;
            let labels: Vec<&str> = selection.iter().map(|b| b.label.as_str()).collect();
            info!("Starting run with {}", labels.join(", "));
            orrery.begin_run(&selection).await?;
        }
        None => orrery.start().await,
    }
    Ok(())
}

async fn run(args: Args) -> Result<ControllerStats> {
    let ctx = TokioContext::shared();
    let transport = Arc::new(HttpTransport::new(&args.server)?);
    let (sink, events) = stream_channel();
    let (commands_tx, commands) = mpsc::unbounded_channel();
    let mut config = args.playback_config();

    info!("Orrery Viewer v{} -> {}", env!("CARGO_PKG_VERSION"), args.server);

    if args.headless {
        let mut orrery = Orrery::new(ctx, transport, sink, config);
        start(&mut orrery, &args).await?;

        let shutdown = commands_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown.send(Command::Shutdown);
            }
        });

        let mut renderer = LogRenderer::new(args.fps as u64);
        let stats = runtime::run(&mut orrery, events, commands, &mut renderer).await?;
        drop(commands_tx);
        Ok(stats)
    } else {
        let mut renderer = TerminalRenderer::stdout().context("taking over the terminal")?;
        config.surface = renderer.surface()?;

        let mut orrery = Orrery::new(ctx, transport, sink, config);
        let _input = spawn_input(commands_tx.clone());
        start(&mut orrery, &args).await?;

        let stats = runtime::run(&mut orrery, events, commands, &mut renderer).await;
        if let Err(e) = renderer.restore() {
            warn!("Failed to restore terminal: {}", e);
        }
        drop(commands_tx);
        Ok(stats?)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let stats = runtime.block_on(run(args))?;

    info!(
        "Viewer exited: {} frames, {} starved, {} snapshots admitted, {} dropped",
        stats.frames,
        stats.starved_frames,
        stats.admitted,
        stats.malformed + stats.rejected
    );
    Ok(())
}
