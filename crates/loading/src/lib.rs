//! Tripaint loading - background mesh ingestion
//!
//! This crate turns files into fully built mesh stores off the controlling
//! thread:
//! - [`pipeline::LoadingPipeline`] - Four ordered stages with a single in-flight slot
//! - [`progress::GeometryProgress`] - Atomic per-stage progress for pollers
//! - [`pool`] - Worker pool capability (minimum two workers)
//! - [`controller`] - Continuations queued back onto the controlling thread
//! - [`formats`] - OBJ, STL and PLY readers
//! - [`project`] - Saved project encode/decode

pub mod controller;
pub mod error;
pub mod formats;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod project;

pub use controller::{ControllerHandle, ControllerQueue, ControllerTask};
pub use error::{FormatError, LoadError, PoolError};
pub use formats::{PROJECT_EXTENSION, RawMesh, SourceFormat};
pub use pipeline::{LoadOutcome, LoadSource, LoadTicket, LoadedMesh, LoadingPipeline, run_stages};
pub use pool::{Executor, Task, WorkerPool};
pub use progress::{GeometryProgress, LoadVerdict, ProgressSnapshot, Stage};
pub use project::{ProjectFile, SaveError, save_project};
