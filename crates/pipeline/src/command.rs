//! Executor that shells out to an external inference program.
//!
//! The program is invoked as
//!
//! ```text
//! <program> <args..> --face <video> --audio <audio> --outfile <scratch>
//! ```
//!
//! which matches the command-line convention of the common lip-sync
//! inference scripts. On success the scratch file is published as the
//! job's output through the artifact store.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::executor::{ExecutionContext, ExecutorError, JobExecutor};

/// Maximum stderr kept in a failure message (4 KiB, tail end).
const MAX_STDERR_BYTES: usize = 4 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace-separated command line. Returns `None` when blank.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl JobExecutor for CommandExecutor {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<PathBuf, ExecutorError> {
        let scratch = ctx
            .artifacts
            .job_dir(ctx.job_id)
            .join(format!("scratch-{}.mp4", ctx.variant));

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--face")
            .arg(&ctx.inputs.video)
            .arg("--audio")
            .arg(&ctx.inputs.audio)
            .arg("--outfile")
            .arg(&scratch)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(
            job_id = %ctx.job_id,
            program = %self.program,
            "Running inference command",
        );
        let output = cmd.output().await?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&scratch).await;
            return Err(ExecutorError::CommandFailed {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: stderr_tail(&output.stderr),
            });
        }

        let mut file = match tokio::fs::File::open(&scratch).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExecutorError::MissingOutput(scratch));
            }
            Err(e) => return Err(e.into()),
        };
        let path = ctx.artifacts.write_output(ctx.job_id, &mut file).await?;
        drop(file);

        if let Err(e) = tokio::fs::remove_file(&scratch).await {
            tracing::debug!(job_id = %ctx.job_id, error = %e, "Scratch file not removed");
        }
        Ok(path)
    }
}

/// Last [`MAX_STDERR_BYTES`] of stderr, lossily decoded and trimmed.
fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(MAX_STDERR_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}
