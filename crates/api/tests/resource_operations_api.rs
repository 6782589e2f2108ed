//! Integration tests for `/v1/files/actions/`.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, get, send, session_for, token_for, FakeQueue};
use serde_json::{json, Value};

fn copy_request(session_id: &str, targets: &[&str]) -> Value {
    json!({
        "session_id": session_id,
        "task_id": "default_task_id",
        "operator": "alice",
        "operation": "copy",
        "project_code": "project1",
        "payload": {
            "targets": targets.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>(),
            "source": "folder-src",
            "destination": "folder-dst",
        },
    })
}

// ---------------------------------------------------------------------------
// Test: accepted operation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn copy_is_accepted_and_queued() {
    let app = common::build_test_app();
    let session = session_for("alice");
    let token = token_for("alice");

    let response = send(
        &app,
        Method::POST,
        "/v1/files/actions/",
        Some(copy_request(&session, &["file-1"])),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = body_json(response).await;
    let info = json["operation_info"].as_array().unwrap();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0]["status"], "RUNNING");
    assert_eq!(info[0]["action_type"], "data_transfer");
    assert_eq!(info[0]["target_names"], json!(["file-1.txt"]));

    {
        let sent = app.queue.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event_type, "folder_copy");
        assert_eq!(sent[0].payload["access_token"], token.as_str());
    }

    let response = get(&app, &format!("/v1/task-stream/static/?session_id={session}")).await;
    assert_eq!(body_json(response).await["total"], 1);
}

#[tokio::test]
async fn operation_requires_authentication() {
    let app = common::build_test_app();

    let response = send(
        &app,
        Method::POST,
        "/v1/files/actions/",
        Some(copy_request(&session_for("alice"), &["file-1"])),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.queue.sent.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: rejected operations leave no trace
// ---------------------------------------------------------------------------

#[tokio::test]
async fn archived_target_is_rejected_before_anything_is_written() {
    let app = common::build_test_app();
    let session = session_for("alice");

    let response = send(
        &app,
        Method::POST,
        "/v1/files/actions/",
        Some(copy_request(&session, &["file-1", "file-archived"])),
        Some(&token_for("alice")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, &format!("/v1/task-stream/static/?session_id={session}")).await;
    assert_eq!(body_json(response).await["total"], 0);
    assert!(app.queue.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_item_returns_404() {
    let app = common::build_test_app();

    let response = send(
        &app,
        Method::POST,
        "/v1/files/actions/",
        Some(copy_request(&session_for("alice"), &["file-missing"])),
        Some(&token_for("alice")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn copy_without_destination_is_rejected() {
    let app = common::build_test_app();
    let mut request = copy_request(&session_for("alice"), &["file-1"]);
    request["payload"]
        .as_object_mut()
        .unwrap()
        .remove("destination");

    let response = send(
        &app,
        Method::POST,
        "/v1/files/actions/",
        Some(request),
        Some(&token_for("alice")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: queue failure is recorded
// ---------------------------------------------------------------------------

#[tokio::test]
async fn queue_failure_marks_job_failed() {
    let app = common::build_test_app_with_queue(FakeQueue {
        fail: true,
        ..Default::default()
    });
    let session = session_for("alice");

    let mut request = copy_request(&session, &["file-1", "file-2"]);
    request["operation"] = json!("delete");

    let response = send(
        &app,
        Method::POST,
        "/v1/files/actions/",
        Some(request),
        Some(&token_for("alice")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = get(&app, &format!("/v1/task-stream/static/?session_id={session}")).await;
    let json = body_json(response).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["stream_info"][0]["status"], "RUNNING");
    assert_eq!(json["stream_info"][1]["status"], "FAILED");
    assert_eq!(json["stream_info"][1]["target_type"], "batch");
    assert_eq!(
        json["stream_info"][0]["job_id"],
        json["stream_info"][1]["job_id"]
    );
}
