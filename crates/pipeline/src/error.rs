use std::path::PathBuf;

use modellab_core::error::CoreError;
use modellab_core::job::JobStatus;
use modellab_core::types::JobId;

use crate::artifacts::ArtifactRole;

/// Errors surfaced synchronously by the pipeline to its callers.
///
/// Failures that happen inside a running job never show up here; they are
/// recorded on the job as `Failed`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Rejected input (wraps the core validation error).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Artifact read/write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No job was ever registered under this id (or it has been evicted).
    #[error("Unknown job {0}")]
    UnknownJob(JobId),

    /// The job exists but has no result to serve.
    #[error("Job {job_id} is not ready (status: {})", .status.label())]
    NotReady { job_id: JobId, status: JobStatus },

    /// The job finished but its output artifact is gone.
    #[error("Result artifact for job {job_id} is missing at {}", .path.display())]
    MissingArtifact { job_id: JobId, path: PathBuf },

    /// A staged upload was submitted without one of its inputs.
    #[error("Upload {job_id} is missing its {role} artifact")]
    IncompleteUpload { job_id: JobId, role: ArtifactRole },
}
