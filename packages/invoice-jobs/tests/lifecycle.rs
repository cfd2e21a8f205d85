//! End-to-end lifecycle tests against the scripted mock portal.
//!
//! All tests run on paused tokio time, so interval-driven polling is
//! deterministic and instant.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use invoice_jobs::testing::MockPortal;
use invoice_jobs::{
    CaptchaChallenge, CaptchaError, JobClient, JobId, JobInput, JobPhase, JobSnapshot,
};

fn client_for(portal: &MockPortal) -> JobClient {
    JobClient::new(
        Arc::new(portal.clone()),
        Arc::new(portal.clone()),
        Arc::new(portal.clone()),
    )
}

fn input() -> JobInput {
    JobInput::new("1".repeat(44))
}

#[tokio::test(start_paused = true)]
async fn polls_until_terminal_then_stops() {
    let portal = MockPortal::new();
    let id = JobId::new("job-1");
    portal.push_create_ok(id.clone());
    portal.push_snapshot(JobSnapshot::new(id.clone(), JobPhase::Running));
    portal.push_snapshot(JobSnapshot::new(id.clone(), JobPhase::Running));
    portal.push_snapshot(JobSnapshot::completed(id.clone(), json!({"total": 7})));

    let client = client_for(&portal);
    client.create(input()).await.unwrap();

    let mut updates = client.subscribe();
    updates.wait_for(|s| s.is_completed()).await.unwrap();
    assert_eq!(portal.fetch_call_count(), 3);

    // Terminal phase reached: no further polls are ever scheduled.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(portal.fetch_call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn at_most_one_fetch_in_flight() {
    let portal = MockPortal::new();
    portal.hold_fetches();

    let client = client_for(&portal);
    client.create(input()).await.unwrap();

    // Many intervals elapse while the first fetch is still outstanding; the
    // scheduler must wait for it rather than piling up requests.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(portal.fetch_call_count(), 1);
    assert_eq!(portal.fetches_in_flight(), 1);

    // Once it settles, polling carries on one request at a time.
    portal.push_snapshot(JobSnapshot::completed(
        client.job_id().unwrap(),
        json!("done"),
    ));
    portal.release_fetch();

    let mut updates = client.subscribe();
    updates.wait_for(|s| s.is_completed()).await.unwrap();
    assert_eq!(portal.fetch_call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_updates_even_if_fetch_later_resolves() {
    let portal = MockPortal::new();
    portal.hold_fetches();
    portal.push_snapshot(JobSnapshot::completed(JobId::new("job-1"), json!("late")));

    let client = client_for(&portal);
    let id = client.create(input()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(portal.fetches_in_flight(), 1);

    client.cancel().await;

    // Release the held response after cancellation completed.
    portal.release_fetch();
    tokio::time::sleep(Duration::from_secs(10)).await;

    let state = client.state();
    assert_eq!(state.job_id, Some(id));
    assert_eq!(state.phase(), Some(JobPhase::Created));
    assert!(!state.is_completed());
    assert_eq!(portal.fetch_call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn second_create_abandons_first_job() {
    let portal = MockPortal::new();
    portal.hold_fetches();
    portal.push_create_ok("job-a");
    portal.push_create_ok("job-b");

    let client = client_for(&portal);
    client.create(input()).await.unwrap();
    assert_eq!(client.job_id(), Some(JobId::new("job-a")));

    client.create(input()).await.unwrap();
    assert_eq!(client.job_id(), Some(JobId::new("job-b")));
    assert_eq!(portal.create_call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn captcha_round_trip() {
    let portal = MockPortal::new();
    let id = JobId::new("job-1");
    portal.push_create_ok(id.clone());
    portal.push_snapshot(JobSnapshot::new(id.clone(), JobPhase::Running));
    portal.push_snapshot(JobSnapshot::awaiting_verification(
        id.clone(),
        CaptchaChallenge::new("c-42", "aW1hZ2U=").with_content_type("image/png"),
    ));

    let client = client_for(&portal);
    client.create(input()).await.unwrap();

    let mut updates = client.subscribe();
    updates
        .wait_for(|s| s.is_awaiting_verification())
        .await
        .unwrap();
    assert_eq!(client.state().challenge().unwrap().id, "c-42");

    // Polling paused on the challenge; nothing happens until it is resolved.
    let paused_at = portal.fetch_call_count();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(portal.fetch_call_count(), paused_at);

    portal.push_snapshot(JobSnapshot::completed(id.clone(), json!({"receipt": "R"})));
    client.resolve_captcha("123").await.unwrap();
    assert_eq!(portal.captcha_calls(), vec![(id, "123".to_string())]);

    let state = updates.wait_for(|s| s.is_completed()).await.unwrap().clone();
    assert_eq!(state.result(), Some(&json!({"receipt": "R"})));
    assert!(state.challenge().is_none() && state.error().is_none());

    let done_at = portal.fetch_call_count();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(portal.fetch_call_count(), done_at);
}

#[tokio::test(start_paused = true)]
async fn resolve_captcha_rejected_outside_verification() {
    let portal = MockPortal::new();
    let client = client_for(&portal);
    client.create(input()).await.unwrap();

    let mut updates = client.subscribe();
    updates.wait_for(|s| s.is_processing()).await.unwrap();

    let err = client.resolve_captcha("123").await.unwrap_err();
    assert!(matches!(err, CaptchaError::NotAwaitingVerification));
    assert!(portal.captcha_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_captcha_submission_keeps_job_paused() {
    let portal = MockPortal::new();
    let id = JobId::new("job-1");
    portal.push_create_ok(id.clone());
    portal.push_snapshot(JobSnapshot::awaiting_verification(
        id.clone(),
        CaptchaChallenge::new("c-1", "aW1n"),
    ));
    portal.push_captcha_err("wrong solution");

    let client = client_for(&portal);
    client.create(input()).await.unwrap();

    let mut updates = client.subscribe();
    updates
        .wait_for(|s| s.is_awaiting_verification())
        .await
        .unwrap();

    let err = client.resolve_captcha("000").await.unwrap_err();
    assert!(matches!(err, CaptchaError::Submit(_)));

    // Still paused; polling has not resumed.
    assert!(client.state().is_awaiting_verification());
    let count = portal.fetch_call_count();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(portal.fetch_call_count(), count);

    // A second attempt with a scripted success resumes observation.
    portal.push_snapshot(JobSnapshot::completed(id, json!("done")));
    client.resolve_captcha("123").await.unwrap();
    updates.wait_for(|s| s.is_completed()).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_create_leaves_id_unset_and_is_retryable() {
    let portal = MockPortal::new();
    portal.push_create_err("rate limited");
    portal.push_create_ok("job-2");

    let client = client_for(&portal);
    let err = client.create(input()).await.unwrap_err();
    assert!(err.to_string().contains("rate limited"));
    assert_eq!(client.job_id(), None);
    assert_eq!(portal.fetch_call_count(), 0);

    // Retry is simply calling create again.
    let id = client.create(input()).await.unwrap();
    assert_eq!(id, JobId::new("job-2"));
    assert_eq!(client.job_id(), Some(id));
}

#[tokio::test(start_paused = true)]
async fn transient_fetch_failures_do_not_touch_snapshot() {
    let portal = MockPortal::new();
    let id = JobId::new("job-1");
    portal.push_create_ok(id.clone());
    portal.push_fetch_err("portal unreachable");
    portal.push_fetch_err("portal unreachable");
    portal.push_snapshot(JobSnapshot::new(id.clone(), JobPhase::Running));
    portal.push_snapshot(JobSnapshot::completed(id.clone(), json!("done")));

    let client = client_for(&portal);
    client.create(input()).await.unwrap();

    let mut updates = client.subscribe();
    let state = updates
        .wait_for(|s| s.fetch_error.is_some())
        .await
        .unwrap()
        .clone();
    // The failure is auxiliary; the last good snapshot (the creation
    // placeholder) is untouched.
    assert_eq!(state.phase(), Some(JobPhase::Created));
    assert!(state.fetch_error.unwrap().contains("portal unreachable"));

    let state = updates
        .wait_for(|s| s.phase() == Some(JobPhase::Running))
        .await
        .unwrap()
        .clone();
    assert!(state.fetch_error.is_none());

    updates.wait_for(|s| s.is_completed()).await.unwrap();
    assert_eq!(portal.fetch_call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn attach_resumes_existing_job() {
    let portal = MockPortal::new();
    let id = JobId::new("job-persisted");
    portal.push_snapshot(JobSnapshot::completed(id.clone(), json!("done")));

    let client = client_for(&portal);
    client.attach(id.clone()).await;
    assert_eq!(client.job_id(), Some(id.clone()));
    assert_eq!(portal.create_call_count(), 0);

    let mut updates = client.subscribe();
    updates.wait_for(|s| s.is_completed()).await.unwrap();
    assert_eq!(portal.fetch_call_count(), 1);
}
