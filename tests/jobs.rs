//! Integration tests for export-job and audit-query orchestration

mod common;

use chrono::{TimeZone, Utc};
use common::{connected_client, MockPlatform};
use futures_util::StreamExt;
use genesys_bulk_client::{Error, TimeRange};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// A same-year range, entirely in the past relative to the mock's default
/// availability date.
fn range(start_day: u32, end_day: u32) -> TimeRange {
    let start = Utc.with_ymd_and_hms(2024, 1, start_day, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, end_day, 0, 0, 0).unwrap();
    TimeRange::new(start, end).unwrap()
}

/// A range spanning the given number of days from a fixed origin.
fn range_days(days: i64) -> TimeRange {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    TimeRange::new(start, start + chrono::Duration::days(days)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn job_polled_through_queued_and_pending_to_fulfilled() {
    let mock = Arc::new(MockPlatform::new());
    mock.script_job_states(&["QUEUED", "PENDING", "FULFILLED"]);
    mock.script_result_pages(vec![json!({ "conversations": [{ "conversationId": "c-1" }] })]);
    let client = connected_client(mock.clone()).await;

    let batches: Vec<_> = client
        .conversation_details(range(1, 2))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].as_ref().unwrap().len(), 1);
    assert_eq!(mock.submits(), 1);
    assert_eq!(mock.deletes(), 1, "fulfilled job must be cleaned up");
}

#[tokio::test(start_paused = true)]
async fn failed_job_surfaces_error_after_cleanup() {
    let mock = Arc::new(MockPlatform::new());
    mock.script_job_states(&["QUEUED", "FAILED"]);
    let client = connected_client(mock.clone()).await;

    let mut stream = client.user_details(range(1, 2)).await.unwrap();
    let first = stream.next().await.unwrap();

    assert!(matches!(first, Err(Error::JobFailed { .. })));
    assert_eq!(mock.deletes(), 1, "failed job must still be deleted");
    assert!(stream.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn unknown_job_state_is_a_hard_error() {
    let mock = Arc::new(MockPlatform::new());
    mock.script_job_states(&["IN_LIMBO"]);
    let client = connected_client(mock.clone()).await;

    let mut stream = client.conversation_details(range(1, 2)).await.unwrap();
    let first = stream.next().await.unwrap();

    assert!(matches!(first, Err(Error::UnexpectedJobState { .. })));
    assert_eq!(mock.deletes(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_and_expired_jobs_map_to_their_errors() {
    let mock = Arc::new(MockPlatform::new());
    mock.script_job_states(&["CANCELLED"]);
    let client = connected_client(mock.clone()).await;
    let mut stream = client.conversation_details(range(1, 2)).await.unwrap();
    assert!(matches!(
        stream.next().await.unwrap(),
        Err(Error::JobCancelled { .. })
    ));

    mock.script_job_states(&["EXPIRED"]);
    let mut stream = client.conversation_details(range(1, 2)).await.unwrap();
    assert!(matches!(
        stream.next().await.unwrap(),
        Err(Error::JobExpired { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn results_drained_through_cursor_pages() {
    let mock = Arc::new(MockPlatform::new());
    mock.script_result_pages(vec![
        json!({ "conversations": [{ "conversationId": "c-1" }], "cursor": "p2" }),
        json!({ "conversations": [{ "conversationId": "c-2" }], "cursor": "p3" }),
        json!({ "conversations": [{ "conversationId": "c-3" }] }),
    ]);
    let client = connected_client(mock.clone()).await;

    let batches: Vec<_> = client
        .conversation_details(range(1, 2))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(batches.len(), 3);
    let total: usize = batches.iter().map(|b| b.as_ref().unwrap().len()).sum();
    assert_eq!(total, 3);
    assert_eq!(mock.deletes(), 1, "delete once, after the final page");
}

#[tokio::test(start_paused = true)]
async fn long_range_is_chunked_into_consecutive_jobs() {
    // 65 days at the default 30 days per job: three chunks, three jobs,
    // each submitted only after the previous one's cleanup.
    let mock = Arc::new(MockPlatform::new());
    let client = connected_client(mock.clone()).await;

    let batches: Vec<_> = client
        .user_details(range_days(65))
        .await
        .unwrap()
        .collect()
        .await;

    assert!(batches.iter().all(Result::is_ok));
    assert_eq!(mock.submits(), 3);
    assert_eq!(mock.deletes(), 3);
    let ids = mock.deleted_ids.lock().unwrap().clone();
    assert_eq!(ids, vec!["job-1", "job-2", "job-3"]);
}

#[tokio::test(start_paused = true)]
async fn export_refused_when_start_is_past_availability() {
    let mock = Arc::new(MockPlatform {
        availability: "2023-06-01T00:00:00.000Z".to_string(),
        ..MockPlatform::new()
    });
    let client = connected_client(mock.clone()).await;

    match client.conversation_details(range(1, 2)).await {
        Err(Error::DataUnavailable { .. }) => {}
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("export must be refused"),
    }
    assert_eq!(mock.submits(), 0, "nothing may be submitted");
}

#[tokio::test(start_paused = true)]
async fn abandoned_stream_still_deletes_its_job() {
    let mock = Arc::new(MockPlatform::new());
    mock.script_result_pages(vec![
        json!({ "conversations": [{ "conversationId": "c-1" }], "cursor": "p2" }),
        json!({ "conversations": [{ "conversationId": "c-2" }] }),
    ]);
    let client = connected_client(mock.clone()).await;

    let mut stream = client.conversation_details(range(1, 2)).await.unwrap();
    // Pull one page, leaving the drain unfinished, then walk away.
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(mock.deletes(), 0);
    drop(stream);

    // The deletion runs on a spawned task.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(mock.deletes(), 1);
}

#[tokio::test(start_paused = true)]
async fn audit_query_runs_to_completion() {
    let mock = Arc::new(MockPlatform::new());
    mock.script_audit_states(&["Queued", "Running", "Succeeded"]);
    mock.script_result_pages(vec![json!({ "entities": [{ "id": "a-1" }, { "id": "a-2" }] })]);
    let client = connected_client(mock.clone()).await;

    let batches: Vec<_> = client
        .audit_events(range(1, 2), "ContactCenter", None)
        .unwrap()
        .collect()
        .await;

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].as_ref().unwrap().len(), 2);
    assert_eq!(mock.deletes(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_audit_query_maps_to_job_failed() {
    let mock = Arc::new(MockPlatform::new());
    mock.script_audit_states(&["Failed"]);
    let client = connected_client(mock.clone()).await;

    let mut stream = client
        .audit_events(range(1, 2), "ContactCenter", None)
        .unwrap();
    assert!(matches!(
        stream.next().await.unwrap(),
        Err(Error::JobFailed { .. })
    ));
    assert_eq!(mock.deletes(), 1);
}

#[tokio::test(start_paused = true)]
async fn audit_submissions_respect_the_minimum_gap() {
    // 90 days at the audit chunk size of 31 days: three queries. Waits are
    // computed from the server-reported start of the previous query, so
    // consecutive submissions land at least a minute apart on the clock
    // that drives the sleeps.
    let mock = Arc::new(MockPlatform::new());
    let client = connected_client(mock.clone()).await;

    let batches: Vec<_> = client
        .audit_events(range_days(90), "ContactCenter", Some("User"))
        .unwrap()
        .collect()
        .await;

    assert!(batches.iter().all(Result::is_ok));
    let instants = mock.audit_submit_instants.lock().unwrap().clone();
    assert_eq!(instants.len(), 3);
    for pair in instants.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= Duration::from_secs(59),
            "submissions only {gap:?} apart"
        );
    }
}

#[tokio::test]
async fn empty_service_name_is_rejected() {
    let mock = Arc::new(MockPlatform::new());
    let client = connected_client(mock).await;
    assert!(matches!(
        client.audit_events(range(1, 2), "", None),
        Err(Error::InvalidArgument { name: "service_name", .. })
    ));
}
