//! Unified job execution interface.
//!
//! Defines [`JobExecutor`], the strategy every processing backend
//! implements, and [`ExecutorSet`], which binds each [`Variant`] to one.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use modellab_core::job::JobInputs;
use modellab_core::types::JobId;
use modellab_core::variant::Variant;

use crate::artifacts::ArtifactStore;
use crate::mock::MockExecutor;

/// Everything an executor may touch while running one job.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub job_id: JobId,
    pub inputs: &'a JobInputs,
    pub variant: Variant,
    /// Where the output must be published (via `write_output`).
    pub artifacts: &'a ArtifactStore,
}

/// Errors that end a job in the `Failed` state.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command failed with exit code {exit_code}: {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    #[error("Command produced no output at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("Execution timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Executor panicked: {0}")]
    Panicked(String),

    #[error("Execution was cancelled")]
    Cancelled,
}

/// A processing backend.
///
/// Implementations produce exactly one output artifact through
/// [`ArtifactStore::write_output`] and return its path, or fail. The
/// registry calls `execute` once per job and records the returned value
/// as the job's only completion signal.
#[async_trait]
pub trait JobExecutor: Send + Sync + fmt::Debug {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<PathBuf, ExecutorError>;
}

/// Total mapping from variant to executor.
#[derive(Debug, Clone)]
pub struct ExecutorSet {
    executors: [Arc<dyn JobExecutor>; 3],
}

impl ExecutorSet {
    /// Bind every variant to the same executor.
    pub fn uniform(executor: Arc<dyn JobExecutor>) -> Self {
        Self {
            executors: [
                Arc::clone(&executor),
                Arc::clone(&executor),
                executor,
            ],
        }
    }

    /// Every variant backed by a [`MockExecutor`] with the given delay.
    pub fn mock(delay: Duration) -> Self {
        Self::uniform(Arc::new(MockExecutor::new(delay)))
    }

    /// Rebind one variant.
    pub fn with(mut self, variant: Variant, executor: Arc<dyn JobExecutor>) -> Self {
        self.executors[slot(variant)] = executor;
        self
    }

    pub fn get(&self, variant: Variant) -> Arc<dyn JobExecutor> {
        Arc::clone(&self.executors[slot(variant)])
    }
}

fn slot(variant: Variant) -> usize {
    match variant {
        Variant::Model1 => 0,
        Variant::Model2 => 1,
        Variant::Model3 => 2,
    }
}
