use axum::routing::{get, post};
use axum::Router;

use crate::handlers::processing;
use crate::state::AppState;

/// Mount submission, status and result routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/process", post(processing::process_media))
        .route("/process/", post(processing::process_media))
        .route("/status/{task_id}", get(processing::get_status))
        .route("/result/{task_id}", get(processing::get_result))
}
