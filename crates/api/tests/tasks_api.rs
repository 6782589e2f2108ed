//! Integration tests for `/v1/tasks/`.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_json, get, post_json, put_json, session_for};
use serde_json::{json, Value};

fn new_job(session_id: &str, job_id: &str) -> Value {
    json!({
        "session_id": session_id,
        "job_id": job_id,
        "source": "project1/raw/a.txt",
        "action": "data_upload",
        "code": "project1",
        "operator": "admin",
    })
}

// ---------------------------------------------------------------------------
// Test: create, list, update, delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn job_lifecycle() {
    let app = common::build_test_app();
    let session = session_for("admin");

    let response = post_json(&app, "/v1/tasks/", new_job(&session, "job-1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "task_status": "SUCCEED" }));

    let response = get(&app, &format!("/v1/tasks/?session_id={session}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let tasks = json["task_info"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["job_id"], "job-1");
    assert_eq!(tasks[0]["status"], "INIT");
    assert_eq!(tasks[0]["label"], "Container");

    let response = put_json(
        &app,
        "/v1/tasks/",
        json!({
            "session_id": session,
            "job_id": "job-1",
            "status": "SUCCEED",
            "progress": 100,
            "add_payload": { "zip_path": "/tmp/a.zip" },
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["task_info"]["status"], "SUCCEED");
    assert_eq!(json["task_info"]["progress"], 100);
    assert_eq!(json["task_info"]["payload"]["zip_path"], "/tmp/a.zip");

    let response = delete_json(&app, "/v1/tasks/", json!({ "session_id": session })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, &format!("/v1/tasks/?session_id={session}")).await;
    assert_eq!(body_json(response).await["task_info"], json!([]));
}

// ---------------------------------------------------------------------------
// Test: duplicates and missing jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_job_returns_409() {
    let app = common::build_test_app();
    let session = session_for("admin");

    post_json(&app, "/v1/tasks/", new_job(&session, "job-1")).await;
    let response = post_json(&app, "/v1/tasks/", new_job(&session, "job-1")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"]["code"], "ALREADY_EXISTS");
}

#[tokio::test]
async fn update_of_missing_job_returns_404() {
    let app = common::build_test_app();

    let response = put_json(
        &app,
        "/v1/tasks/",
        json!({ "session_id": session_for("admin"), "job_id": "nope", "status": "FAILED" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: query filters narrow the listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listing_filters_by_job_id() {
    let app = common::build_test_app();
    let session = session_for("admin");

    post_json(&app, "/v1/tasks/", new_job(&session, "job-1")).await;
    post_json(&app, "/v1/tasks/", new_job(&session, "job-2")).await;

    let response = get(&app, &format!("/v1/tasks/?session_id={session}")).await;
    assert_eq!(body_json(response).await["task_info"].as_array().unwrap().len(), 2);

    let response = get(&app, &format!("/v1/tasks/?session_id={session}&job_id=job-2")).await;
    let json = body_json(response).await;
    let tasks = json["task_info"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["job_id"], "job-2");
}

#[tokio::test]
async fn listing_without_session_id_is_rejected() {
    let app = common::build_test_app();
    let response = get(&app, "/v1/tasks/").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
