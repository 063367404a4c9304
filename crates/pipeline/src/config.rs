use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use modellab_core::variant::Variant;

use crate::artifacts::ArtifactStore;
use crate::command::CommandExecutor;
use crate::executor::ExecutorSet;
use crate::mock::DEFAULT_MOCK_DELAY;
use crate::registry::JobRegistry;

/// Default interval between retention sweeps.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Job pipeline configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory for job artifacts.
    pub upload_dir: PathBuf,
    /// Simulated processing time of the mock executor.
    pub mock_delay: Duration,
    /// Per-job execution limit. `None` means unlimited.
    pub job_timeout: Option<Duration>,
    /// How long finished and failed jobs are kept. `None` keeps them for
    /// the lifetime of the process.
    pub retention: Option<Duration>,
    /// How often the retention sweeper runs.
    pub sweep_interval: Duration,
    /// External inference commands, per variant. Unbound variants use the mock.
    pub commands: Vec<(Variant, CommandExecutor)>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("/tmp/uploads"),
            mock_delay: DEFAULT_MOCK_DELAY,
            job_timeout: None,
            retention: None,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            commands: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default         |
    /// |---------------------------|-----------------|
    /// | `UPLOAD_DIR`              | `/tmp/uploads`  |
    /// | `MOCK_DELAY_MS`           | `2000`          |
    /// | `JOB_TIMEOUT_SECS`        | unset           |
    /// | `JOB_RETENTION_SECS`      | unset           |
    /// | `JOB_SWEEP_INTERVAL_SECS` | `300`           |
    /// | `MODEL1_COMMAND` etc.     | unset           |
    pub fn from_env() -> Self {
        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp/uploads"));

        let mock_delay_ms: u64 = std::env::var("MOCK_DELAY_MS")
            .ok()
            .map(|v| v.parse().expect("MOCK_DELAY_MS must be a valid u64"))
            .unwrap_or(DEFAULT_MOCK_DELAY.as_millis() as u64);

        let job_timeout = optional_secs("JOB_TIMEOUT_SECS");
        let retention = optional_secs("JOB_RETENTION_SECS");

        let sweep_interval =
            sweep_interval_from(std::env::var("JOB_SWEEP_INTERVAL_SECS").ok().as_deref());

        let commands = Variant::ALL
            .into_iter()
            .filter_map(|variant| {
                let key = format!("{}_COMMAND", variant.name().to_ascii_uppercase());
                let line = std::env::var(key).ok()?;
                CommandExecutor::from_command_line(&line).map(|exec| (variant, exec))
            })
            .collect();

        Self {
            upload_dir,
            mock_delay: Duration::from_millis(mock_delay_ms),
            job_timeout,
            retention,
            sweep_interval,
            commands,
        }
    }

    /// Mock executors for every variant, overridden by configured commands.
    pub fn executors(&self) -> ExecutorSet {
        self.commands.iter().fold(
            ExecutorSet::mock(self.mock_delay),
            |set, (variant, exec)| set.with(*variant, Arc::new(exec.clone())),
        )
    }

    /// Build the registry this configuration describes.
    pub fn build_registry(&self) -> JobRegistry {
        let store = Arc::new(ArtifactStore::new(&self.upload_dir));
        JobRegistry::new(store, self.executors()).with_execution_timeout(self.job_timeout)
    }
}

/// Parse an optional whole-seconds duration.
fn optional_secs(key: &str) -> Option<Duration> {
    std::env::var(key).ok().map(|v| parse_secs(key, &v))
}

fn parse_secs(key: &str, value: &str) -> Duration {
    let secs: u64 = value
        .parse()
        .unwrap_or_else(|_| panic!("{key} must be a valid u64"));
    Duration::from_secs(secs)
}

/// Sweep interval from its raw env value. A timer cannot tick every zero
/// seconds, so zero is rejected at startup.
fn sweep_interval_from(raw: Option<&str>) -> Duration {
    let interval = raw.map_or(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS), |v| {
        parse_secs("JOB_SWEEP_INTERVAL_SECS", v)
    });
    assert!(
        !interval.is_zero(),
        "JOB_SWEEP_INTERVAL_SECS must be greater than zero"
    );
    interval
}
