use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use modellab_core::error::CoreError;
use modellab_pipeline::PipelineError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`PipelineError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `modellab_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An error from the job pipeline.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Pipeline(err) => classify_pipeline_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
    }
}

/// Classify a pipeline error into an HTTP status, error code, and message.
///
/// - Unknown jobs map to 404.
/// - A finished job whose artifact is gone maps to 404 with its own code,
///   so it can be told apart from an unknown id.
/// - IO failures map to 500 with a sanitized message.
fn classify_pipeline_error(err: &PipelineError) -> (StatusCode, &'static str, String) {
    match err {
        PipelineError::Core(core) => classify_core_error(core),
        PipelineError::UnknownJob(id) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Task with id {id} not found"),
        ),
        PipelineError::NotReady { status, .. } => (
            StatusCode::CONFLICT,
            "NOT_READY",
            format!("Task is {}", status.label()),
        ),
        PipelineError::MissingArtifact { .. } => (
            StatusCode::NOT_FOUND,
            "RESULT_MISSING",
            "Result file not found.".to_string(),
        ),
        PipelineError::IncompleteUpload { role, .. } => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("Missing required upload: {role}"),
        ),
        PipelineError::Io(e) => {
            tracing::error!(error = %e, "Artifact IO error");
            internal()
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use modellab_core::job::JobStatus;
    use modellab_core::types::new_job_id;

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn validation_maps_to_400() {
        let err = AppError::Core(CoreError::Validation("bad".into()));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_job_maps_to_404() {
        let err = AppError::Pipeline(PipelineError::UnknownJob(new_job_id()));
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn missing_artifact_maps_to_404() {
        let err = AppError::Pipeline(PipelineError::MissingArtifact {
            job_id: new_job_id(),
            path: "/tmp/gone.mp4".into(),
        });
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn not_ready_maps_to_409() {
        let err = AppError::Pipeline(PipelineError::NotReady {
            job_id: new_job_id(),
            status: JobStatus::Pending,
        });
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn io_error_is_sanitized_500() {
        let err = AppError::Pipeline(PipelineError::Io(std::io::Error::other("disk full")));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
