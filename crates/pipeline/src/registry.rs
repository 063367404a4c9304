//! In-memory job registry.
//!
//! [`JobRegistry`] is the single source of truth for job existence and
//! state. Submissions insert a `Pending` record and spawn a supervised
//! task that runs the variant's executor; that task's completion is the
//! only writer of a job's state after creation.
//!
//! Reads (`status`, `result_location`, `snapshot`) take a short read lock
//! on a `std::sync::RwLock` and never await. The completion path updates
//! state, result and timestamps under a single write lock, so no reader can
//! observe `Finished` without the result path being set.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use modellab_core::job::{Job, JobInputs, JobSnapshot, JobStatus};
use modellab_core::types::{new_job_id, JobId};
use modellab_core::variant::Variant;
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::artifacts::{ArtifactRole, ArtifactStore};
use crate::error::PipelineError;
use crate::executor::{ExecutionContext, ExecutorError, ExecutorSet, JobExecutor};
use crate::upload::Upload;

type JobMap = Arc<RwLock<HashMap<JobId, Job>>>;

/// Where a job's result can be found, if anywhere yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultLocation {
    /// The job finished; the output artifact is at this path.
    Ready(PathBuf),
    /// No result to serve. Carries the current status (`Unknown` included).
    NotReady(JobStatus),
}

/// An opened result artifact, ready to stream.
#[derive(Debug)]
pub struct ResultArtifact {
    pub job_id: JobId,
    pub path: PathBuf,
    pub file: tokio::fs::File,
    pub len: u64,
}

pub struct JobRegistry {
    jobs: JobMap,
    artifacts: Arc<ArtifactStore>,
    executors: ExecutorSet,
    execution_timeout: Option<Duration>,
    tracker: TaskTracker,
}

impl JobRegistry {
    pub fn new(artifacts: Arc<ArtifactStore>, executors: ExecutorSet) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            artifacts,
            executors,
            execution_timeout: None,
            tracker: TaskTracker::new(),
        }
    }

    /// Fail jobs whose executor runs longer than `timeout`. `None` (the
    /// default) lets an executor run forever.
    pub fn with_execution_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.execution_timeout = timeout;
        self
    }

    pub fn artifacts(&self) -> &Arc<ArtifactStore> {
        &self.artifacts
    }

    /// Reserve a job id and start staging its inputs.
    pub fn begin_upload(&self) -> Upload {
        Upload::new(Arc::clone(&self.artifacts))
    }

    /// Register a job over already-persisted inputs and start it.
    ///
    /// Returns as soon as the `Pending` record is visible; the executor
    /// runs in the background.
    pub fn submit(&self, inputs: JobInputs, variant: Variant) -> JobId {
        let job_id = new_job_id();
        self.schedule(job_id, inputs, variant);
        job_id
    }

    /// Register a job over a fully staged upload, reusing its id.
    ///
    /// An incomplete upload is discarded and no job is created.
    pub async fn submit_upload(
        &self,
        mut upload: Upload,
        variant: Variant,
    ) -> Result<JobId, PipelineError> {
        match upload.inputs() {
            Ok(inputs) => {
                let job_id = upload.job_id();
                upload.release();
                self.schedule(job_id, inputs, variant);
                Ok(job_id)
            }
            Err(e) => {
                upload.discard().await;
                Err(e)
            }
        }
    }

    /// Stage both input streams and submit them as one job.
    ///
    /// If either write fails nothing is registered and any staged bytes
    /// are removed, including when this future is dropped mid-write.
    pub async fn submit_streams<V, A>(
        &self,
        video: &mut V,
        audio: &mut A,
        variant: Variant,
    ) -> Result<JobId, PipelineError>
    where
        V: AsyncRead + Unpin + ?Sized,
        A: AsyncRead + Unpin + ?Sized,
    {
        let mut upload = self.begin_upload();
        if let Err(e) = upload.write(ArtifactRole::InputVideo, video).await {
            upload.discard().await;
            return Err(e);
        }
        if let Err(e) = upload.write(ArtifactRole::InputAudio, audio).await {
            upload.discard().await;
            return Err(e);
        }
        self.submit_upload(upload, variant).await
    }

    /// Current state of a job; `Unknown` if it was never submitted.
    pub fn status(&self, job_id: JobId) -> JobStatus {
        read_jobs(&self.jobs)
            .get(&job_id)
            .map_or(JobStatus::Unknown, |job| job.state().into())
    }

    /// Output artifact of a finished job.
    pub fn result_location(&self, job_id: JobId) -> ResultLocation {
        let jobs = read_jobs(&self.jobs);
        match jobs.get(&job_id) {
            Some(job) => match job.result() {
                Some(path) => ResultLocation::Ready(path.clone()),
                None => ResultLocation::NotReady(job.state().into()),
            },
            None => ResultLocation::NotReady(JobStatus::Unknown),
        }
    }

    /// Open a finished job's output for streaming.
    pub async fn fetch_result(&self, job_id: JobId) -> Result<ResultArtifact, PipelineError> {
        let path = match self.result_location(job_id) {
            ResultLocation::Ready(path) => path,
            ResultLocation::NotReady(JobStatus::Unknown) => {
                return Err(PipelineError::UnknownJob(job_id));
            }
            ResultLocation::NotReady(status) => {
                return Err(PipelineError::NotReady { job_id, status });
            }
        };

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!(
                    job_id = %job_id,
                    path = %path.display(),
                    "Finished job has no result artifact",
                );
                return Err(PipelineError::MissingArtifact { job_id, path });
            }
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();

        Ok(ResultArtifact {
            job_id,
            path,
            file,
            len,
        })
    }

    pub fn snapshot(&self, job_id: JobId) -> Option<JobSnapshot> {
        read_jobs(&self.jobs).get(&job_id).map(Job::snapshot)
    }

    /// Number of jobs currently tracked.
    pub fn len(&self) -> usize {
        read_jobs(&self.jobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of jobs whose executor has not completed yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Drop terminal jobs completed more than `retention` ago and delete
    /// their artifacts. Pending jobs are never evicted. Returns how many
    /// jobs were removed.
    pub async fn evict_expired(&self, retention: Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
            return 0;
        };

        let expired: Vec<JobId> = {
            let mut jobs = write_jobs(&self.jobs);
            let ids: Vec<JobId> = jobs
                .values()
                .filter(|job| job.completed_at().is_some_and(|at| at < cutoff))
                .map(Job::id)
                .collect();
            for id in &ids {
                jobs.remove(id);
            }
            ids
        };

        for job_id in &expired {
            if let Err(e) = self.artifacts.remove_job(*job_id).await {
                tracing::warn!(job_id = %job_id, error = %e, "Failed to remove expired artifacts");
            }
        }
        expired.len()
    }

    /// Wait for every running job to complete.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    fn schedule(&self, job_id: JobId, inputs: JobInputs, variant: Variant) {
        let job = Job::new(job_id, inputs.clone(), variant, Utc::now());
        let previous = write_jobs(&self.jobs).insert(job_id, job);
        debug_assert!(previous.is_none(), "job id {job_id} reused");

        tracing::info!(job_id = %job_id, variant = %variant, "Job submitted");

        let span = tracing::info_span!("job", job_id = %job_id, variant = %variant);
        self.tracker.spawn(
            run_job(
                Arc::clone(&self.jobs),
                Arc::clone(&self.artifacts),
                self.executors.get(variant),
                job_id,
                inputs,
                variant,
                self.execution_timeout,
            )
            .instrument(span),
        );
    }
}

/// Supervise one execution and deliver its single completion signal.
async fn run_job(
    jobs: JobMap,
    artifacts: Arc<ArtifactStore>,
    executor: Arc<dyn JobExecutor>,
    job_id: JobId,
    inputs: JobInputs,
    variant: Variant,
    timeout: Option<Duration>,
) {
    let handle = tokio::spawn(
        async move {
            executor
                .execute(ExecutionContext {
                    job_id,
                    inputs: &inputs,
                    variant,
                    artifacts: &artifacts,
                })
                .await
        }
        .in_current_span(),
    );

    let outcome = join_execution(handle, timeout).await;
    complete(&jobs, job_id, outcome);
}

async fn join_execution(
    mut handle: JoinHandle<Result<PathBuf, ExecutorError>>,
    timeout: Option<Duration>,
) -> Result<PathBuf, ExecutorError> {
    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_elapsed) => {
                handle.abort();
                return Err(ExecutorError::Timeout(limit));
            }
        },
        None => handle.await,
    };

    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(ExecutorError::Panicked(panic_message(e.into_panic()))),
        Err(_) => Err(ExecutorError::Cancelled),
    }
}

fn complete(jobs: &JobMap, job_id: JobId, outcome: Result<PathBuf, ExecutorError>) {
    let now = Utc::now();
    let mut guard = write_jobs(jobs);
    let Some(job) = guard.get_mut(&job_id) else {
        tracing::warn!("Job record vanished before completion");
        return;
    };

    let transition = match &outcome {
        Ok(path) => job.finish(path.clone(), now),
        Err(e) => job.fail(e.to_string(), now),
    };
    drop(guard);

    match (transition, outcome) {
        (Err(e), _) => tracing::error!(error = %e, "Duplicate completion signal ignored"),
        (Ok(()), Ok(path)) => tracing::info!(result = %path.display(), "Job finished"),
        (Ok(()), Err(e)) => tracing::warn!(error = %e, "Job failed"),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn read_jobs(jobs: &RwLock<HashMap<JobId, Job>>) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
    jobs.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_jobs(jobs: &RwLock<HashMap<JobId, Job>>) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
    jobs.write().unwrap_or_else(PoisonError::into_inner)
}
