use std::sync::Arc;

use modellab_pipeline::JobRegistry;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job registry; the only owner of job state.
    pub registry: Arc<JobRegistry>,
}
