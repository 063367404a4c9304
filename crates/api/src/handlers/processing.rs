//! Handlers for job submission, status polling and result download.
//!
//! Uploads are streamed field by field straight into the job's artifact
//! directory; nothing is buffered whole in memory. Validation (variant and
//! content types) happens before a field is written, and any rejected
//! request discards what it staged without creating a job.

use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::TryStreamExt;
use modellab_core::error::CoreError;
use modellab_core::job::{JobSnapshot, JobStatus};
use modellab_core::types::{JobId, Timestamp};
use modellab_core::validation::{
    parse_job_id, validate_audio_content_type, validate_video_content_type,
};
use modellab_core::variant::Variant;
use modellab_pipeline::{ArtifactRole, PipelineError, ResultArtifact, Upload};
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field carrying the input video.
const VIDEO_FIELD: &str = "video_file";

/// Multipart field carrying the input audio.
const AUDIO_FIELD: &str = "audio_file";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProcessParams {
    pub model_choice: Option<String>,
}

/// Body of a successful submission.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub task_id: JobId,
}

/// Body returned by `/result` while no file can be served.
#[derive(Debug, Serialize)]
pub struct ResultStatusResponse {
    /// `processing` or `failed`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Client-facing view of a job (no server paths).
#[derive(Debug, Serialize)]
pub struct TaskStatus {
    pub task_id: JobId,
    pub status: &'static str,
    pub model_choice: Variant,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub error: Option<String>,
}

impl From<JobSnapshot> for TaskStatus {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            task_id: snapshot.id,
            status: JobStatus::from(snapshot.state).label(),
            model_choice: snapshot.variant,
            created_at: snapshot.created_at,
            completed_at: snapshot.completed_at,
            error: snapshot.error,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /process/?model_choice={model1|model2|model3}
///
/// Accepts a multipart body with `video_file` (mp4) and `audio_file`
/// (wav/mp3), stages both and schedules processing. Returns 202 with the
/// task id as soon as the job is registered.
pub async fn process_media(
    State(state): State<AppState>,
    Query(params): Query<ProcessParams>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ProcessResponse>)> {
    let raw_variant = params
        .model_choice
        .ok_or_else(|| CoreError::Validation("model_choice is required".into()))?;
    let variant = Variant::from_name(&raw_variant)?;

    let mut upload = state.registry.begin_upload();
    if let Err(e) = stage_fields(&mut upload, &mut multipart).await {
        upload.discard().await;
        return Err(e);
    }

    let task_id = state.registry.submit_upload(upload, variant).await?;
    tracing::info!(task_id = %task_id, variant = %variant, "Processing task accepted");

    Ok((StatusCode::ACCEPTED, Json(ProcessResponse { task_id })))
}

/// GET /status/{task_id}
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<DataResponse<TaskStatus>>> {
    let job_id = parse_job_id(&task_id)?;
    let snapshot = state
        .registry
        .snapshot(job_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Task",
            id: job_id,
        }))?;
    Ok(Json(DataResponse {
        data: snapshot.into(),
    }))
}

/// GET /result/{task_id}
///
/// - Still processing: `{"status": "processing"}`.
/// - Failed: `{"status": "failed", "error": ...}`.
/// - Finished: streams the resulting mp4 as an attachment.
/// - Unknown id, or finished without a file on disk: 404.
pub async fn get_result(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Response> {
    let job_id = parse_job_id(&task_id)?;

    match state.registry.fetch_result(job_id).await {
        Ok(artifact) => stream_artifact(artifact),
        Err(PipelineError::NotReady { status, .. }) => {
            let error = match status {
                JobStatus::Failed => state.registry.snapshot(job_id).and_then(|s| s.error),
                _ => None,
            };
            let body = ResultStatusResponse {
                status: status.label(),
                error,
            };
            Ok(Json(body).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate and stream every known multipart field into `upload`, then
/// check that both inputs arrived. Unknown fields are skipped.
async fn stage_fields(upload: &mut Upload, multipart: &mut Multipart) -> AppResult<()> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        // `None` for the video, the validated format for the audio.
        let audio_format = match field.name() {
            Some(VIDEO_FIELD) => {
                validate_video_content_type(field.content_type())?;
                None
            }
            Some(AUDIO_FIELD) => Some(validate_audio_content_type(field.content_type())?),
            _ => continue,
        };

        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        tokio::pin!(reader);
        let written = match audio_format {
            Some(format) => upload.write_audio(format, &mut reader).await,
            None => upload.write(ArtifactRole::InputVideo, &mut reader).await,
        };
        written.map_err(classify_upload_error)?;
    }

    upload.inputs().map_err(|e| match e {
        PipelineError::IncompleteUpload { role, .. } => {
            AppError::Core(CoreError::Validation(format!(
                "Missing required '{}' field",
                field_name(role)
            )))
        }
        other => other.into(),
    })?;
    Ok(())
}

/// A read error caused by the client's multipart stream is a bad request;
/// anything else (disk full, permissions) is ours.
fn classify_upload_error(err: PipelineError) -> AppError {
    if let PipelineError::Io(io) = &err {
        let from_client = io
            .get_ref()
            .is_some_and(|inner| inner.downcast_ref::<MultipartError>().is_some());
        if from_client {
            return AppError::BadRequest(format!("Failed to read upload: {io}"));
        }
    }
    err.into()
}

fn field_name(role: ArtifactRole) -> &'static str {
    match role {
        ArtifactRole::InputVideo => VIDEO_FIELD,
        ArtifactRole::InputAudio => AUDIO_FIELD,
        ArtifactRole::OutputVideo => "output",
    }
}

fn stream_artifact(artifact: ResultArtifact) -> AppResult<Response> {
    let disposition = format!(
        "attachment; filename=\"{}_lipsynced.mp4\"",
        artifact.job_id
    );
    let stream = ReaderStream::new(artifact.file);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, artifact.len.to_string())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
