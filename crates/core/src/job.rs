//! Job record and its state machine.
//!
//! ```text
//! Pending ──► Finished
//!    └──────► Failed
//! ```
//!
//! Both terminal states are final; nothing moves a job back to `Pending`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{JobId, Timestamp};
use crate::variant::Variant;

/// Lifecycle state stored on a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Finished,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Answer to a status query. `Unknown` is a lookup result, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Finished,
    Failed,
    Unknown,
}

impl JobStatus {
    /// Label used by the polling API (`pending` is reported as `processing`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "processing",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl From<JobState> for JobStatus {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Pending => Self::Pending,
            JobState::Finished => Self::Finished,
            JobState::Failed => Self::Failed,
        }
    }
}

/// References to a job's persisted input artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInputs {
    pub video: PathBuf,
    pub audio: PathBuf,
}

/// Returned when a transition is attempted on a job that already finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("job {id} is already {state:?}")]
pub struct AlreadyTerminal {
    pub id: JobId,
    pub state: JobState,
}

/// One unit of submitted work.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    state: JobState,
    inputs: JobInputs,
    variant: Variant,
    created_at: Timestamp,
    completed_at: Option<Timestamp>,
    result: Option<PathBuf>,
    error: Option<String>,
}

impl Job {
    /// Create a `Pending` job.
    pub fn new(id: JobId, inputs: JobInputs, variant: Variant, created_at: Timestamp) -> Self {
        Self {
            id,
            state: JobState::Pending,
            inputs,
            variant,
            created_at,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn inputs(&self) -> &JobInputs {
        &self.inputs
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    /// Output artifact; `Some` only once `Finished`.
    pub fn result(&self) -> Option<&PathBuf> {
        self.result.as_ref()
    }

    /// Failure message; `Some` only once `Failed`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `Pending -> Finished`. The result path and state change together.
    pub fn finish(&mut self, result: PathBuf, at: Timestamp) -> Result<(), AlreadyTerminal> {
        self.ensure_pending()?;
        self.result = Some(result);
        self.completed_at = Some(at);
        self.state = JobState::Finished;
        Ok(())
    }

    /// `Pending -> Failed`.
    pub fn fail(&mut self, error: impl Into<String>, at: Timestamp) -> Result<(), AlreadyTerminal> {
        self.ensure_pending()?;
        self.error = Some(error.into());
        self.completed_at = Some(at);
        self.state = JobState::Failed;
        Ok(())
    }

    /// Serializable copy of the record.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            state: self.state,
            variant: self.variant,
            video: self.inputs.video.clone(),
            audio: self.inputs.audio.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }

    fn ensure_pending(&self) -> Result<(), AlreadyTerminal> {
        if self.state.is_terminal() {
            return Err(AlreadyTerminal {
                id: self.id,
                state: self.state,
            });
        }
        Ok(())
    }
}

/// Flat, serializable view of a job. Also the layout a durable backend
/// would persist per job id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub state: JobState,
    pub variant: Variant,
    pub video: PathBuf,
    pub audio: PathBuf,
    pub result: Option<PathBuf>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}
