//! Job execution pipeline.
//!
//! Owns everything with a lifecycle: job-scoped artifact storage, the
//! pluggable executors that turn inputs into an output, and the
//! [`registry::JobRegistry`] that schedules them and tracks their state.

pub mod artifacts;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod mock;
pub mod registry;
pub mod upload;

pub use artifacts::{ArtifactRole, ArtifactStore};
pub use error::PipelineError;
pub use executor::{ExecutionContext, ExecutorError, ExecutorSet, JobExecutor};
pub use registry::{JobRegistry, ResultArtifact, ResultLocation};
pub use upload::Upload;
