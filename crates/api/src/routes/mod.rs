pub mod health;
pub mod processing;

use axum::Router;

use crate::state::AppState;

/// Build the job route tree.
///
/// Route hierarchy:
///
/// ```text
/// /process                 submit video + audio (POST, multipart)
/// /process/                same, trailing-slash form
/// /status/{task_id}        job status (GET)
/// /result/{task_id}        poll status or download result (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(processing::router())
}
