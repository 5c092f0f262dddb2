//! HttpJobApi against an in-process mock analysis server
//!
//! The mock records what it receives so tests can check the wire format.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use fretboard_ingest::client::{ApiError, HttpJobApi, JobApi};
use fretboard_ingest::models::{JobStatus, Preferences, SourceRef};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn process_youtube(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.requests.lock().unwrap().push(body);
    Json(json!({"job_id": "yt-1", "status": "pending"}))
}

async fn upload_audio(State(state): State<MockState>, mut multipart: Multipart) -> Json<Value> {
    let mut received = serde_json::Map::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            received.insert("file_name".into(), json!(field.file_name()));
            received.insert("content_type".into(), json!(field.content_type()));
            let bytes = field.bytes().await.unwrap();
            received.insert("size".into(), json!(bytes.len()));
        } else {
            received.insert(name, json!(field.text().await.unwrap()));
        }
    }
    state.requests.lock().unwrap().push(Value::Object(received));
    Json(json!({
        "job_id": "up-1",
        "status": "completed",
        "results": {"song_id": "cached-song", "chords": []}
    }))
}

async fn status(Path(job_id): Path<String>) -> impl IntoResponse {
    match job_id.as_str() {
        "yt-1" => (
            StatusCode::OK,
            Json(json!({
                "status": "processing",
                "progress_percentage": 42.0,
                "current_step": "Detecting chords"
            })),
        )
            .into_response(),
        "garbled" => (StatusCode::OK, "not json").into_response(),
        _ => (StatusCode::NOT_FOUND, "job not found").into_response(),
    }
}

async fn results(Path(job_id): Path<String>) -> Json<Value> {
    Json(json!({"song_id": format!("song-for-{}", job_id), "chords": []}))
}

async fn start_mock_server() -> (SocketAddr, MockState) {
    let state = MockState::default();
    let app = Router::new()
        .route("/api/process-youtube", post(process_youtube))
        .route("/api/upload-audio", post(upload_audio))
        .route("/api/status/:job_id", get(status))
        .route("/api/results/:job_id", get(results))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

fn client(addr: SocketAddr) -> HttpJobApi {
    HttpJobApi::new(&format!("http://{}/", addr), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_submit_youtube_sends_json_body() {
    let (addr, state) = start_mock_server().await;
    let api = client(addr);
    let source = SourceRef::youtube("https://www.youtube.com/watch?v=abc123").unwrap();

    let response = api
        .submit(&source, &Preferences::new(Some("G"), Some(4)))
        .await
        .unwrap();

    assert_eq!(response.job_id.as_deref(), Some("yt-1"));
    assert_eq!(response.status, Some(JobStatus::Pending));
    assert!(response.results.is_none());

    let requests = state.requests.lock().unwrap();
    assert_eq!(
        requests[0],
        json!({
            "youtube_url": "https://www.youtube.com/watch?v=abc123",
            "target_key": "G",
            "difficulty_level": 4
        })
    );
}

#[tokio::test]
async fn test_submit_upload_sends_multipart() {
    let (addr, state) = start_mock_server().await;
    let api = client(addr);
    let source = SourceRef::upload("demo.mp3", vec![7u8; 1024]).unwrap();

    let response = api.submit(&source, &Preferences::default()).await.unwrap();

    assert_eq!(response.status, Some(JobStatus::Completed));
    assert_eq!(response.results.unwrap()["song_id"], "cached-song");

    let requests = state.requests.lock().unwrap();
    let upload = &requests[0];
    assert_eq!(upload["file_name"], "demo.mp3");
    assert_eq!(upload["content_type"], "audio/mpeg");
    assert_eq!(upload["size"], 1024);
    assert_eq!(upload["target_key"], "C");
    assert_eq!(upload["difficulty_level"], "3");
}

#[tokio::test]
async fn test_status_decodes_progress() {
    let (addr, _) = start_mock_server().await;
    let api = client(addr);

    let status = api.status("yt-1").await.unwrap();

    assert_eq!(status.status, JobStatus::Processing);
    assert_eq!(status.progress_percentage, Some(42.0));
    assert_eq!(status.current_step.as_deref(), Some("Detecting chords"));
}

#[tokio::test]
async fn test_results_returns_raw_payload() {
    let (addr, _) = start_mock_server().await;
    let api = client(addr);

    let payload = api.results("job-9").await.unwrap();

    assert_eq!(payload["song_id"], "song-for-job-9");
}

#[tokio::test]
async fn test_non_success_status_maps_to_status_error() {
    let (addr, _) = start_mock_server().await;
    let api = client(addr);

    let result = api.status("unknown-job").await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::Status(404, "job not found".to_string())
    );
}

#[tokio::test]
async fn test_undecodable_body_maps_to_parse_error() {
    let (addr, _) = start_mock_server().await;
    let api = client(addr);

    let result = api.status("garbled").await;

    assert!(matches!(result, Err(ApiError::Parse(_))));
}

#[tokio::test]
async fn test_unreachable_server_maps_to_network_error() {
    // Bind and release a port so nothing is listening on it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client(addr).status("yt-1").await;

    assert!(matches!(result, Err(ApiError::Network(_))));
}
