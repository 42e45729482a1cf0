//! Telemetry and logging infrastructure
//!
//! Provides structured logging with tracing and pacer metrics.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig};
pub use metrics::{ComputeStats, ComputeTimer, FpsCounter};
