//! Job-scoped artifact storage on the local filesystem.
//!
//! Every artifact lives at a location that is a pure function of
//! `(job id, role)`:
//!
//! ```text
//! <root>/<job-id>/input.mp4      input.video
//! <root>/<job-id>/input.audio    input.audio (format unknown)
//! <root>/<job-id>/input.wav      input.audio (wav)
//! <root>/<job-id>/input.mp3      input.audio (mp3)
//! <root>/<job-id>/output.mp4     output.video
//! ```
//!
//! Writes stream into a hidden `.part` file in the job directory and are
//! renamed into place only once complete, so readers never observe a
//! partially written artifact.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use modellab_core::types::JobId;
use modellab_core::validation::AudioFormat;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// The part an artifact plays in a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactRole {
    InputVideo,
    InputAudio,
    OutputVideo,
}

impl ArtifactRole {
    /// Role name (`input.video`, `input.audio`, `output.video`).
    pub fn name(self) -> &'static str {
        match self {
            Self::InputVideo => "input.video",
            Self::InputAudio => "input.audio",
            Self::OutputVideo => "output.video",
        }
    }

    /// File name inside the job directory. Audio of a known format is
    /// stored under [`ArtifactStore::audio_path`] instead.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::InputVideo => "input.mp4",
            Self::InputAudio => "input.audio",
            Self::OutputVideo => "output.mp4",
        }
    }

    pub fn is_input(self) -> bool {
        !matches!(self, Self::OutputVideo)
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Filesystem-backed artifact store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if it does not exist yet.
    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every artifact of one job.
    pub fn job_dir(&self, job_id: JobId) -> PathBuf {
        self.root.join(job_id.to_string())
    }

    /// Canonical location of an artifact. Does not touch the filesystem.
    pub fn path_for(&self, job_id: JobId, role: ArtifactRole) -> PathBuf {
        self.job_dir(job_id).join(role.file_name())
    }

    /// Location of an audio input whose format is known.
    pub fn audio_path(&self, job_id: JobId, format: AudioFormat) -> PathBuf {
        self.job_dir(job_id).join(audio_file_name(format))
    }

    /// Stream an input artifact to its canonical location.
    pub async fn write_input<R>(
        &self,
        job_id: JobId,
        role: ArtifactRole,
        reader: &mut R,
    ) -> io::Result<PathBuf>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if !role.is_input() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{role} is not an input role"),
            ));
        }
        self.write_atomic(job_id, role, role.file_name(), reader).await
    }

    /// Stream an audio input, keeping its format's extension.
    pub async fn write_audio<R>(
        &self,
        job_id: JobId,
        format: AudioFormat,
        reader: &mut R,
    ) -> io::Result<PathBuf>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let file_name = audio_file_name(format);
        self.write_atomic(job_id, ArtifactRole::InputAudio, &file_name, reader)
            .await
    }

    /// Stream the result artifact to its canonical location.
    pub async fn write_output<R>(&self, job_id: JobId, reader: &mut R) -> io::Result<PathBuf>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let role = ArtifactRole::OutputVideo;
        self.write_atomic(job_id, role, role.file_name(), reader).await
    }

    /// Location of an artifact if it has been written.
    pub async fn resolve(&self, job_id: JobId, role: ArtifactRole) -> Option<PathBuf> {
        let path = self.path_for(job_id, role);
        match fs::try_exists(&path).await {
            Ok(true) => Some(path),
            _ => None,
        }
    }

    /// Delete a job's directory and everything in it. Missing directories
    /// are not an error.
    pub async fn remove_job(&self, job_id: JobId) -> io::Result<()> {
        match fs::remove_dir_all(self.job_dir(job_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn write_atomic<R>(
        &self,
        job_id: JobId,
        role: ArtifactRole,
        file_name: &str,
        reader: &mut R,
    ) -> io::Result<PathBuf>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let dir = self.job_dir(job_id);
        fs::create_dir_all(&dir).await?;

        let dest = dir.join(file_name);
        let part = dir.join(format!(
            ".{}.{}.part",
            file_name,
            uuid::Uuid::new_v4().simple()
        ));

        match copy_into(&part, reader).await {
            Ok(bytes) => {
                if let Err(e) = fs::rename(&part, &dest).await {
                    let _ = fs::remove_file(&part).await;
                    return Err(e);
                }
                tracing::debug!(job_id = %job_id, role = %role, bytes, "Artifact written");
                Ok(dest)
            }
            Err(e) => {
                let _ = fs::remove_file(&part).await;
                tracing::warn!(job_id = %job_id, role = %role, error = %e, "Artifact write failed");
                Err(e)
            }
        }
    }
}

fn audio_file_name(format: AudioFormat) -> String {
    format!("input.{}", format.extension())
}

/// Copy `reader` into a new file at `path` in fixed-size chunks and flush
/// it to disk. Returns the number of bytes written.
async fn copy_into<R>(path: &Path, reader: &mut R) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = fs::File::create(path).await?;
    let bytes = tokio::io::copy(reader, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(bytes)
}
