//! Stand-in executor used until a real model is wired in.
//!
//! Waits a fixed delay, then publishes a small placeholder MP4 header as
//! the result. Enough to exercise the state machine and the download path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::executor::{ExecutionContext, ExecutorError, JobExecutor};

/// 24-byte `ftyp` box: not a playable video, but sniffed as MP4.
pub const PLACEHOLDER_MP4: &[u8] = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom";

/// Default simulated processing time.
pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct MockExecutor {
    delay: Duration,
    payload: Arc<[u8]>,
}

impl MockExecutor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            payload: Arc::from(PLACEHOLDER_MP4),
        }
    }

    /// Replace the placeholder bytes.
    pub fn with_payload(mut self, payload: impl Into<Arc<[u8]>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_DELAY)
    }
}

#[async_trait]
impl JobExecutor for MockExecutor {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<PathBuf, ExecutorError> {
        tracing::debug!(
            job_id = %ctx.job_id,
            variant = %ctx.variant,
            delay_ms = self.delay.as_millis() as u64,
            "Mock execution started",
        );
        tokio::time::sleep(self.delay).await;

        let mut reader: &[u8] = &self.payload;
        let path = ctx.artifacts.write_output(ctx.job_id, &mut reader).await?;
        Ok(path)
    }
}
