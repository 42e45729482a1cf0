//! Adaptive frame pacer
//!
//! Each tick captures a frame, runs the kernel with the live parameters,
//! presents the result and schedules the next tick so that compute time is
//! absorbed into the frame interval:
//!
//! ```text
//! delay = max(0, target_interval - compute_time)
//! ```
//!
//! A slow kernel therefore makes the next tick fire sooner instead of
//! drifting the long-run rate, and a delay is never negative.

use std::time::{Duration, Instant};

use crate::frame::{FrameSink, FrameSource};
use crate::kernel::{KernelFactory, MotionKernel};
use crate::params::LiveParams;
use crate::scheduler::{ScheduledTask, SharedClock};
use crate::telemetry::{ComputeStats, ComputeTimer, FpsCounter};

/// Default frame interval (20 fps)
pub const TARGET_FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Delay before the next tick given the time the current one took
pub fn next_delay(target: Duration, elapsed: Duration) -> Duration {
    target.saturating_sub(elapsed)
}

/// Published pacer telemetry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacerStats {
    /// Frames per second over the last full second
    pub fps: u32,
    /// Kernel time of the last successful tick
    pub last_compute_time: Duration,
    /// Rolling compute-time statistics
    pub compute: ComputeStats,
    /// Frames written to the sink this session
    pub frames_presented: u64,
    /// Message of the last kernel failure, cleared by the next success
    pub error: Option<String>,
}

struct PacerSession {
    source: Box<dyn FrameSource>,
    sink: Box<dyn FrameSink>,
    kernel: Option<Box<dyn MotionKernel>>,
    output: Vec<u8>,
    width: u32,
    height: u32,
}

/// Self-rescheduling kernel loop
pub struct FramePacer {
    live: LiveParams,
    clock: SharedClock,
    factory: KernelFactory,
    target_interval: Duration,
    session: Option<PacerSession>,
    task: ScheduledTask,
    fps: FpsCounter,
    compute: ComputeTimer,
    frames_presented: u64,
    error: Option<String>,
}

impl FramePacer {
    pub fn new(live: LiveParams, clock: SharedClock, factory: KernelFactory) -> Self {
        Self {
            live,
            clock,
            factory,
            target_interval: TARGET_FRAME_INTERVAL,
            session: None,
            task: ScheduledTask::new(),
            fps: FpsCounter::new(),
            compute: ComputeTimer::new(),
            frames_presented: 0,
            error: None,
        }
    }

    /// Use a different target interval
    pub fn with_target_interval(mut self, interval: Duration) -> Self {
        self.target_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn target_interval(&self) -> Duration {
        self.target_interval
    }

    /// Check if the loop is running
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Check if the running session has a kernel
    pub fn has_kernel(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.kernel.is_some())
    }

    pub fn stats(&self) -> PacerStats {
        PacerStats {
            fps: self.fps.fps(),
            last_compute_time: self.compute.last().unwrap_or_default(),
            compute: self.compute.stats(),
            frames_presented: self.frames_presented,
            error: self.error.clone(),
        }
    }

    /// When the next tick is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.task.deadline()
    }

    /// Begin pacing frames from `source` into `sink`
    ///
    /// Any previous session is stopped and its kernel released before the
    /// new kernel is created. If the kernel cannot be created the loop still
    /// runs, skipping kernel invocation.
    pub fn start(&mut self, source: Box<dyn FrameSource>, sink: Box<dyn FrameSink>) {
        self.stop();

        let (width, height) = source.dimensions();
        let kernel = match (self.factory)(width, height) {
            Ok(kernel) => {
                self.error = None;
                Some(kernel)
            }
            Err(e) => {
                tracing::error!(width, height, "Failed to create kernel: {}", e);
                self.error = Some(e.to_string());
                None
            }
        };
        let output = vec![0; kernel.as_ref().map_or(0, |k| k.buffer_size())];

        self.session = Some(PacerSession {
            source,
            sink,
            kernel,
            output,
            width,
            height,
        });
        self.fps.reset();
        self.compute.clear();
        self.frames_presented = 0;
        self.task.arm_at(self.clock.now());
        tracing::info!(
            width,
            height,
            interval_ms = self.target_interval.as_millis() as u64,
            "Frame pacer started"
        );
    }

    /// Halt the loop and release the kernel; safe when never started
    pub fn stop(&mut self) {
        self.task.cancel();
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Some(kernel) = session.kernel.as_mut() {
            kernel.reset_state();
        }
        tracing::info!(frames = self.frames_presented, "Frame pacer stopped");
    }

    /// Run the tick if it is due; returns true if it ran
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now();
        if !self.task.fire_if_due(now) {
            return false;
        }
        self.tick();
        true
    }

    fn tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let Some(frame) = session.source.capture() else {
            self.task.arm_after(self.clock.now(), self.target_interval);
            return;
        };

        let started = self.clock.now();
        match session.kernel.as_mut() {
            Some(kernel) => {
                let params = self.live.snapshot();
                match kernel.process_frame(frame, &mut session.output, &params) {
                    Ok(()) => {
                        if self.error.take().is_some() {
                            tracing::info!("Kernel recovered");
                        }
                        session
                            .sink
                            .present(&session.output, session.width, session.height);
                        self.frames_presented += 1;
                    }
                    Err(e) => {
                        if self.error.is_none() {
                            tracing::warn!("Kernel failed, skipping frame: {}", e);
                        }
                        self.error = Some(e.to_string());
                    }
                }
            }
            None => {
                tracing::error!("No kernel available, skipping frame");
            }
        }

        let finished = self.clock.now();
        let elapsed = finished.saturating_duration_since(started);
        if self.error.is_none() && session.kernel.is_some() {
            self.compute.record(elapsed);
            self.fps.tick(finished);
        }

        self.task
            .arm_after(finished, next_delay(self.target_interval, elapsed));
    }
}

impl Drop for FramePacer {
    fn drop(&mut self) {
        self.stop();
    }
}
