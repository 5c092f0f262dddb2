//! Job submission integration tests

mod helpers;

use fretboard_ingest::client::{ApiError, SubmitResponse};
use fretboard_ingest::models::{JobStatus, Preferences};
use fretboard_ingest::services::{JobSubmitter, Submission};
use fretboard_ingest::IngestError;
use helpers::{completed_immediately, pending, song_payload, youtube, ScriptedApi};
use std::sync::Arc;

const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

#[tokio::test]
async fn test_pending_submission_returns_job_id() {
    let api = Arc::new(ScriptedApi::new().submit_ok(pending("job-42")));
    let submitter = JobSubmitter::new(api.clone());

    let submission = submitter
        .submit(&youtube(URL), &Preferences::default())
        .await
        .unwrap();

    assert_eq!(
        submission,
        Submission::Pending {
            job_id: "job-42".to_string()
        }
    );
    assert_eq!(submission.job_id(), Some("job-42"));
}

#[tokio::test]
async fn test_cache_hit_returns_result_directly() {
    let payload = song_payload("song-7", 2);
    let api = Arc::new(ScriptedApi::new().submit_ok(completed_immediately("job-7", payload.clone())));
    let submitter = JobSubmitter::new(api.clone());

    let submission = submitter
        .submit(&youtube(URL), &Preferences::default())
        .await
        .unwrap();

    match submission {
        Submission::Completed { job_id, result } => {
            assert_eq!(job_id.as_deref(), Some("job-7"));
            assert_eq!(result, payload);
        }
        other => panic!("expected Completed, got {:?}", other),
    }
    assert_eq!(api.status_calls(), 0);
}

#[tokio::test]
async fn test_preferences_forwarded() {
    let api = Arc::new(ScriptedApi::new().submit_ok(pending("job-1")));
    let submitter = JobSubmitter::new(api.clone());
    let preferences = Preferences::new(Some("G"), Some(5));

    submitter.submit(&youtube(URL), &preferences).await.unwrap();

    let submitted = api.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].0, format!("url:{}", URL));
    assert_eq!(submitted[0].1, preferences);
}

#[tokio::test]
async fn test_missing_job_id_is_submission_error() {
    let api = Arc::new(ScriptedApi::new().submit_ok(SubmitResponse::default()));
    let submitter = JobSubmitter::new(api);

    let result = submitter
        .submit(&youtube(URL), &Preferences::default())
        .await;

    assert!(matches!(result, Err(IngestError::Submission(_))));
}

#[tokio::test]
async fn test_blank_job_id_is_submission_error() {
    let api = Arc::new(ScriptedApi::new().submit_ok(SubmitResponse {
        job_id: Some("   ".to_string()),
        ..Default::default()
    }));
    let submitter = JobSubmitter::new(api);

    let result = submitter
        .submit(&youtube(URL), &Preferences::default())
        .await;

    assert!(matches!(result, Err(IngestError::Submission(_))));
}

#[tokio::test]
async fn test_transport_error_is_submission_error() {
    let api = Arc::new(
        ScriptedApi::new().submit_err(ApiError::Status(503, "Service Unavailable".to_string())),
    );
    let submitter = JobSubmitter::new(api.clone());

    let result = submitter
        .submit(&youtube(URL), &Preferences::default())
        .await;

    match result {
        Err(IngestError::Submission(detail)) => assert!(detail.contains("503")),
        other => panic!("expected Submission error, got {:?}", other),
    }
    // Never retried
    assert_eq!(api.submit_calls(), 1);
}

#[tokio::test]
async fn test_rejected_submission_is_processing_failure() {
    let api = Arc::new(ScriptedApi::new().submit_ok(SubmitResponse {
        job_id: Some("job-9".to_string()),
        status: Some(JobStatus::Failed),
        results: None,
        error: Some("Video is private".to_string()),
    }));
    let submitter = JobSubmitter::new(api);

    let result = submitter
        .submit(&youtube(URL), &Preferences::default())
        .await;

    assert_eq!(
        result,
        Err(IngestError::ProcessingFailed("Video is private".to_string()))
    );
}

#[tokio::test]
async fn test_completed_without_results_falls_back_to_polling() {
    let api = Arc::new(ScriptedApi::new().submit_ok(SubmitResponse {
        job_id: Some("job-3".to_string()),
        status: Some(JobStatus::Completed),
        results: None,
        error: None,
    }));
    let submitter = JobSubmitter::new(api);

    let submission = submitter
        .submit(&youtube(URL), &Preferences::default())
        .await
        .unwrap();

    assert_eq!(
        submission,
        Submission::Pending {
            job_id: "job-3".to_string()
        }
    );
}
