//! Staging area for a job's inputs.
//!
//! An [`Upload`] reserves a job id before any job exists so input streams
//! can be written to their final, id-derived locations as they arrive.
//! It is either handed to [`crate::JobRegistry::submit_upload`] or
//! [`discard`](Upload::discard)ed when the request is rejected. An upload
//! dropped without either (the request future was cancelled mid-stream)
//! removes its staged files in the background.

use std::path::PathBuf;
use std::sync::Arc;

use modellab_core::job::JobInputs;
use modellab_core::types::{new_job_id, JobId};
use modellab_core::validation::AudioFormat;
use tokio::io::AsyncRead;

use crate::artifacts::{ArtifactRole, ArtifactStore};
use crate::error::PipelineError;

#[derive(Debug)]
pub struct Upload {
    job_id: JobId,
    store: Arc<ArtifactStore>,
    video: Option<PathBuf>,
    audio: Option<PathBuf>,
    /// Cleared once the files belong to a job or have been deleted.
    owns_files: bool,
}

impl Upload {
    /// Reserve a fresh job id in `store`.
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self {
            job_id: new_job_id(),
            store,
            video: None,
            audio: None,
            owns_files: true,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Stream one input. Writing the same role twice replaces the first.
    pub async fn write<R>(
        &mut self,
        role: ArtifactRole,
        reader: &mut R,
    ) -> Result<PathBuf, PipelineError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = self.store.write_input(self.job_id, role, reader).await?;
        match role {
            ArtifactRole::InputVideo => self.video = Some(path.clone()),
            ArtifactRole::InputAudio => self.audio = Some(path.clone()),
            ArtifactRole::OutputVideo => {}
        }
        Ok(path)
    }

    /// Stream the audio input of a known format; the stored file keeps the
    /// format's extension.
    pub async fn write_audio<R>(
        &mut self,
        format: AudioFormat,
        reader: &mut R,
    ) -> Result<PathBuf, PipelineError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = self.store.write_audio(self.job_id, format, reader).await?;
        self.audio = Some(path.clone());
        Ok(path)
    }

    /// Both inputs, or the first one still missing.
    pub fn inputs(&self) -> Result<JobInputs, PipelineError> {
        let missing = |role| PipelineError::IncompleteUpload {
            job_id: self.job_id,
            role,
        };
        let video = self.video.clone().ok_or_else(|| missing(ArtifactRole::InputVideo))?;
        let audio = self.audio.clone().ok_or_else(|| missing(ArtifactRole::InputAudio))?;
        Ok(JobInputs { video, audio })
    }

    /// Delete everything staged so far.
    pub async fn discard(mut self) {
        self.owns_files = false;
        if let Err(e) = self.store.remove_job(self.job_id).await {
            tracing::warn!(job_id = %self.job_id, error = %e, "Failed to discard staged upload");
        }
    }

    /// Hand the staged files over to a registered job.
    pub(crate) fn release(&mut self) {
        self.owns_files = false;
    }
}

impl Drop for Upload {
    fn drop(&mut self) {
        if !self.owns_files {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(job_id = %self.job_id, "Abandoned upload left on disk, no runtime");
            return;
        };

        let store = Arc::clone(&self.store);
        let job_id = self.job_id;
        tracing::debug!(job_id = %job_id, "Removing abandoned upload");
        runtime.spawn(async move {
            if let Err(e) = store.remove_job(job_id).await {
                tracing::warn!(job_id = %job_id, error = %e, "Failed to remove abandoned upload");
            }
        });
    }
}
