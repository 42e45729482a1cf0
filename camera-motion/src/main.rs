//! Camera Motion - headless runner
//!
//! Runs the full orchestration (drift, cycling, transitions, frame pacing)
//! against a synthetic test pattern, logging telemetry once per second.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;

use camera_motion::storage::SharedBlobStore;
use camera_motion::telemetry::{init_logging, LogConfig};
use camera_motion::{
    run_session, DiscardSink, FileBlobStore, MemoryBlobStore, MotionSession, PassthroughKernel,
    SessionOptions, TestPatternSource, TokioClock,
};

#[derive(Debug, Parser)]
#[command(name = "camera-motion", version, about = "Headless camera motion orchestration")]
struct Args {
    /// Frame width in pixels
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 20)]
    fps: u32,

    /// Do not cycle presets automatically
    #[arg(long)]
    no_cycle: bool,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    seconds: Option<u64>,

    /// Emit JSON log lines
    #[arg(long)]
    log_json: bool,

    /// Write logs to this file as well
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Keep presets and settings in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Seed for preset selection and drift
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_config = LogConfig {
        json_format: args.log_json,
        file_path: args.log_file.clone(),
        ..LogConfig::default()
    };
    let _log_guard = init_logging(&log_config).map_err(|e| anyhow!(e))?;

    if args.fps == 0 {
        anyhow::bail!("--fps must be at least 1");
    }

    let blobs: SharedBlobStore = if args.ephemeral {
        Rc::new(MemoryBlobStore::new())
    } else {
        let store = FileBlobStore::in_config_dir().context("locating config directory")?;
        tracing::info!(dir = %store.dir().display(), "Using blob store");
        Rc::new(store)
    };

    let options = SessionOptions {
        frame_interval: Duration::from_secs(1) / args.fps,
        seed: args.seed,
        ..SessionOptions::default()
    };
    let mut session = MotionSession::new(
        Rc::new(TokioClock),
        blobs,
        PassthroughKernel::factory(),
        &options,
    );
    session.start(
        Box::new(TestPatternSource::new(args.width, args.height)),
        Box::new(DiscardSink::new()),
        !args.no_cycle,
    );

    let limit = args.seconds.map(Duration::from_secs);
    let shutdown = async move {
        let deadline = async {
            match limit {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        let interrupted = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            _ = interrupted => tracing::info!("Ctrl-C received, shutting down"),
            _ = deadline => tracing::info!("Run time elapsed, shutting down"),
        }
    };
    run_session(&mut session, shutdown).await;

    let stats = session.pacer().stats();
    tracing::info!(
        frames = stats.frames_presented,
        avg_compute_ms = stats.compute.avg_ms,
        "Finished"
    );
    Ok(())
}
