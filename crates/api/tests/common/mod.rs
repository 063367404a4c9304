#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use modellab_api::config::ServerConfig;
use modellab_api::router::build_app_router;
use modellab_api::state::AppState;
use modellab_core::types::JobId;
use modellab_core::variant::Variant;
use modellab_pipeline::config::PipelineConfig;
use modellab_pipeline::JobRegistry;

pub const BOUNDARY: &str = "modellab-test-boundary";

/// A router over a registry whose artifacts live in a temporary directory.
///
/// The directory is removed when the `TestApp` is dropped.
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<JobRegistry>,
    pub dir: TempDir,
}

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout, and mock executors with no delay.
pub fn test_config(upload_dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        max_upload_bytes: 16 * 1024 * 1024,
        pipeline: PipelineConfig {
            upload_dir: upload_dir.to_path_buf(),
            mock_delay: Duration::ZERO,
            ..PipelineConfig::default()
        },
    }
}

/// Build the full application router the same way `main.rs` does.
pub fn build_test_app() -> TestApp {
    build_test_app_with(|config| config)
}

/// Like [`build_test_app`], letting the caller adjust the configuration.
pub fn build_test_app_with(adjust: impl FnOnce(ServerConfig) -> ServerConfig) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = adjust(test_config(dir.path()));
    let registry = Arc::new(config.pipeline.build_registry());

    let state = AppState {
        config: Arc::new(config.clone()),
        registry: Arc::clone(&registry),
    };

    TestApp {
        router: build_app_router(state, &config),
        registry,
        dir,
    }
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn post_multipart(app: &TestApp, uri: &str, body: Vec<u8>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// One file part of a multipart form.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

pub fn video(data: &[u8]) -> Part<'_> {
    Part {
        name: "video_file",
        filename: "face.mp4",
        content_type: "video/mp4",
        data,
    }
}

pub fn audio(data: &[u8]) -> Part<'_> {
    Part {
        name: "audio_file",
        filename: "voice.wav",
        content_type: "audio/wav",
        data,
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, part.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Submit a valid video and audio pair and return the task id.
pub async fn submit(app: &TestApp, variant: Variant) -> JobId {
    let body = multipart_body(&[video(b"fake video"), audio(b"fake audio")]);
    let response = post_multipart(app, &format!("/process/?model_choice={variant}"), body).await;
    assert_eq!(response.status(), axum::http::StatusCode::ACCEPTED);
    let json = body_json(response).await;
    json["task_id"].as_str().unwrap().parse().unwrap()
}

/// Poll `/result` until the task is no longer processing.
pub async fn wait_until_done(app: &TestApp, task_id: JobId) -> Response<Body> {
    for _ in 0..200 {
        let response = get(app, &format!("/result/{task_id}")).await;
        let is_json = response
            .headers()
            .get("content-type")
            .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
        if !is_json {
            return response;
        }
        let json = body_json(response).await;
        if json["status"] != "processing" {
            return get(app, &format!("/result/{task_id}")).await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} did not complete in time");
}
