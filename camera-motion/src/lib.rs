//! Camera Motion Library
//!
//! Orchestration for a live camera motion effect: presets and their
//! persistence, eased cross-fades between parameter sets, autonomous preset
//! cycling, ambient drift of the movement angle, and an adaptive frame pacer
//! feeding an external pixel kernel.
//!
//! Everything runs on one thread. Components share the live parameter set
//! through [`LiveParams`] and expose `poll`/`next_deadline` so a driver (see
//! [`session::run_session`]) can sleep until the next timer is due.

pub mod automation;
pub mod frame;
pub mod kernel;
pub mod pacer;
pub mod params;
pub mod presets;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod storage;
pub mod telemetry;
pub mod transition;

pub use automation::AmbientDrift;
pub use frame::{DiscardSink, FrameSink, FrameSource, TestPatternSource};
pub use kernel::{KernelError, KernelFactory, MotionKernel, PassthroughKernel};
pub use pacer::{FramePacer, PacerStats};
pub use params::{FieldId, LiveParams, MoveType, ParameterSet, ToleranceTable, WaveAxis};
pub use presets::{Preset, PresetId, PresetOrchestrator, PresetStore, PresetUpdate};
pub use scheduler::{Clock, ManualClock, SharedClock, TokioClock};
pub use session::{run_session, MotionSession, SessionOptions};
pub use settings::MotionSettings;
pub use storage::{BlobStore, FileBlobStore, MemoryBlobStore, StorageError};
pub use transition::TransitionEngine;
