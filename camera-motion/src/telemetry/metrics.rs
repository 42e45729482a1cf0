//! Frame rate and compute-time metrics
//!
//! Both collectors take timestamps from the caller so they follow whatever
//! clock drives the pacer.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Compute-time statistics over the recent window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputeStats {
    /// Average compute time in milliseconds
    pub avg_ms: f64,
    /// Minimum compute time in milliseconds
    pub min_ms: f64,
    /// Maximum compute time in milliseconds
    pub max_ms: f64,
    /// 95th percentile compute time
    pub p95_ms: f64,
    /// Number of samples in the statistics
    pub sample_count: usize,
}

/// Frames-per-second counter rolled over once per elapsed second
///
/// Frames are counted from the first tick; the published value is the count
/// of ticks after the window opened, updated when a full second has passed.
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    window_start: Option<Instant>,
    frames: u32,
    fps: u32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame at `now`; returns true when `fps` was republished
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return false;
        };
        self.frames += 1;
        if now.saturating_duration_since(start) < Duration::from_secs(1) {
            return false;
        }
        self.fps = self.frames;
        self.frames = 0;
        self.window_start = Some(now);
        true
    }

    /// Last published frames per second
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Rolling window of kernel compute times
#[derive(Debug, Clone)]
pub struct ComputeTimer {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

impl Default for ComputeTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeTimer {
    /// Keep the last 100 samples (5 seconds at 20 fps)
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.samples.push_back(elapsed);
        if self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Most recent sample
    pub fn last(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn stats(&self) -> ComputeStats {
        if self.samples.is_empty() {
            return ComputeStats::default();
        }

        let mut times: Vec<f64> = self
            .samples
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        times.sort_by(f64::total_cmp);

        let sum: f64 = times.iter().sum();
        ComputeStats {
            avg_ms: sum / times.len() as f64,
            min_ms: times.first().copied().unwrap_or(0.0),
            max_ms: times.last().copied().unwrap_or(0.0),
            p95_ms: percentile(&times, 0.95),
            sample_count: times.len(),
        }
    }
}

/// Nearest-rank percentile of an ascending slice
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p) as usize;
    sorted[idx]
}
