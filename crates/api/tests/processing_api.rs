//! Integration tests for submission, status polling and result download.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{audio, body_bytes, body_json, get, multipart_body, post_multipart, video, Part};
use modellab_core::types::new_job_id;
use modellab_core::variant::Variant;
use modellab_pipeline::command::CommandExecutor;
use modellab_pipeline::mock::PLACEHOLDER_MP4;

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn process_returns_202_with_task_id() {
    let app = common::build_test_app();
    let body = multipart_body(&[video(b"video bytes"), audio(b"audio bytes")]);

    let response = post_multipart(&app, "/process/?model_choice=model2", body).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    let task_id = json["task_id"].as_str().expect("task_id must be a string");
    assert!(task_id.parse::<modellab_core::types::JobId>().is_ok());
    assert_eq!(app.registry.len(), 1);
}

#[tokio::test]
async fn process_without_trailing_slash_is_accepted() {
    let app = common::build_test_app();
    let body = multipart_body(&[video(b"v"), audio(b"a")]);

    let response = post_multipart(&app, "/process?model_choice=model1", body).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn inputs_are_stored_under_task_directory() {
    let app = common::build_test_app_with(|mut config| {
        config.pipeline.mock_delay = Duration::from_secs(60);
        config
    });

    let task_id = common::submit(&app, Variant::Model3).await;

    let job_dir = app.dir.path().join(task_id.to_string());
    assert_eq!(std::fs::read(job_dir.join("input.mp4")).unwrap(), b"fake video");
    assert_eq!(std::fs::read(job_dir.join("input.wav")).unwrap(), b"fake audio");
}

#[tokio::test]
async fn unknown_model_choice_is_rejected() {
    let app = common::build_test_app();
    let body = multipart_body(&[video(b"v"), audio(b"a")]);

    let response = post_multipart(&app, "/process/?model_choice=model9", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(app.registry.is_empty());
}

#[tokio::test]
async fn missing_model_choice_is_rejected() {
    let app = common::build_test_app();
    let body = multipart_body(&[video(b"v"), audio(b"a")]);

    let response = post_multipart(&app, "/process/", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.registry.is_empty());
}

#[tokio::test]
async fn wrong_video_type_creates_no_job() {
    let app = common::build_test_app();
    let body = multipart_body(&[
        Part {
            name: "video_file",
            filename: "face.avi",
            content_type: "video/x-msvideo",
            data: b"v",
        },
        audio(b"a"),
    ]);

    let response = post_multipart(&app, "/process/?model_choice=model1", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid video format. Only mp4 allowed.");
    assert!(app.registry.is_empty());
}

#[tokio::test]
async fn wrong_audio_type_discards_staged_video() {
    let app = common::build_test_app();
    let body = multipart_body(&[
        video(b"v"),
        Part {
            name: "audio_file",
            filename: "voice.ogg",
            content_type: "audio/ogg",
            data: b"a",
        },
    ]);

    let response = post_multipart(&app, "/process/?model_choice=model1", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid audio format. Only wav or mp3 allowed.");
    assert!(app.registry.is_empty());
    assert_eq!(std::fs::read_dir(app.dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn mp3_audio_is_accepted() {
    let app = common::build_test_app();
    let body = multipart_body(&[
        video(b"v"),
        Part {
            name: "audio_file",
            filename: "voice.mp3",
            content_type: "audio/mpeg",
            data: b"a",
        },
    ]);

    let response = post_multipart(&app, "/process/?model_choice=model1", body).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    let task_id = json["task_id"].as_str().unwrap();
    let audio_path = app.dir.path().join(task_id).join("input.mp3");
    assert_eq!(std::fs::read(audio_path).unwrap(), b"a");
}

#[tokio::test]
async fn missing_audio_file_is_rejected() {
    let app = common::build_test_app();
    let body = multipart_body(&[video(b"v")]);

    let response = post_multipart(&app, "/process/?model_choice=model1", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Missing required 'audio_file' field");
    assert!(app.registry.is_empty());
    assert_eq!(std::fs::read_dir(app.dir.path()).unwrap().count(), 0);
}

// ---------------------------------------------------------------------------
// Polling and download
// ---------------------------------------------------------------------------

#[tokio::test]
async fn result_reports_processing_while_pending() {
    let app = common::build_test_app_with(|mut config| {
        config.pipeline.mock_delay = Duration::from_secs(60);
        config
    });
    let task_id = common::submit(&app, Variant::Model1).await;

    let response = get(&app, &format!("/result/{task_id}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "processing");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn finished_result_streams_mp4_attachment() {
    let app = common::build_test_app();
    let task_id = common::submit(&app, Variant::Model2).await;

    let response = common::wait_until_done(&app, task_id).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("content-type").unwrap(), "video/mp4");
    assert_eq!(
        headers.get("content-disposition").unwrap().to_str().unwrap(),
        format!("attachment; filename=\"{task_id}_lipsynced.mp4\"")
    );
    assert_eq!(
        headers.get("content-length").unwrap().to_str().unwrap(),
        PLACEHOLDER_MP4.len().to_string()
    );
    assert_eq!(body_bytes(response).await, PLACEHOLDER_MP4);
}

#[tokio::test]
async fn finished_result_with_missing_file_is_404() {
    let app = common::build_test_app();
    let task_id = common::submit(&app, Variant::Model1).await;
    app.registry.drain().await;

    let output = app.dir.path().join(task_id.to_string()).join("output.mp4");
    std::fs::remove_file(output).unwrap();

    let response = get(&app, &format!("/result/{task_id}")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Result file not found.");
}

#[cfg(unix)]
#[tokio::test]
async fn failed_task_reports_error_on_result_and_status() {
    let app = common::build_test_app_with(|mut config| {
        let failing = CommandExecutor::new(
            "sh",
            vec!["-c".into(), "echo 'no face detected' >&2; exit 1".into()],
        );
        config.pipeline.commands = vec![(Variant::Model1, failing)];
        config
    });
    let task_id = common::submit(&app, Variant::Model1).await;

    let response = common::wait_until_done(&app, task_id).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "failed");
    let error = json["error"].as_str().expect("failed result carries an error");
    assert!(error.contains("no face detected"), "{error}");

    let json = body_json(get(&app, &format!("/status/{task_id}")).await).await;
    assert_eq!(json["data"]["status"], "failed");
    assert_eq!(json["data"]["error"], error);
    assert!(json["data"]["completed_at"].is_string());
}

#[tokio::test]
async fn result_for_unknown_task_is_404() {
    let app = common::build_test_app();

    let response = get(&app, &format!("/result/{}", new_job_id())).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_task_id_is_400() {
    let app = common::build_test_app();

    let response = get(&app, "/result/not-a-uuid").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_endpoint_tracks_lifecycle() {
    let app = common::build_test_app();
    let task_id = common::submit(&app, Variant::Model3).await;
    app.registry.drain().await;

    let response = get(&app, &format!("/status/{task_id}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["task_id"], task_id.to_string());
    assert_eq!(json["data"]["status"], "finished");
    assert_eq!(json["data"]["model_choice"], "model3");
    assert!(json["data"]["completed_at"].is_string());
}

#[tokio::test]
async fn status_for_unknown_task_is_404() {
    let app = common::build_test_app();

    let response = get(&app, &format!("/status/{}", new_job_id())).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_tasks_complete_independently() {
    let app = common::build_test_app();

    let first = common::submit(&app, Variant::Model1).await;
    let second = common::submit(&app, Variant::Model2).await;
    assert_ne!(first, second);

    for task_id in [first, second] {
        let response = common::wait_until_done(&app, task_id).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, PLACEHOLDER_MP4);
    }
}
